use std::collections::{HashMap, HashSet};

use crate::core::error::{Error, Result};
use crate::render::canvas::Canvas;
use crate::render::host::BlockRenderer;

/// Tracks every live canvas for one host-server lifetime.
///
/// An explicitly constructed context object, not a global: it is created
/// at server start, torn down at server stop, and mutated only from the
/// world thread, so it needs no internal locking.
#[derive(Default)]
pub struct CanvasRegistry {
    canvases: HashMap<String, Canvas>,
    ids: HashSet<String>,
}

impl CanvasRegistry {
    pub fn new() -> Self {
        CanvasRegistry::default()
    }

    /// Inserts unconditionally; a prior entry under the same id is
    /// replaced (last writer wins).
    pub fn add(&mut self, id: impl Into<String>, canvas: Canvas) {
        let id = id.into();
        self.ids.insert(id.clone());
        self.canvases.insert(id, canvas);
    }

    pub fn get(&self, id: &str) -> Option<&Canvas> {
        self.canvases.get(id)
    }

    pub fn len(&self) -> usize {
        self.canvases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.canvases.is_empty()
    }

    /// Snapshot of known ids, sorted for stable enumeration; feeds
    /// autocompletion on the command surface.
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.ids.iter().cloned().collect();
        ids.sort();
        ids
    }

    /// Renders the canvas registered under `id`.
    pub fn render(&mut self, id: &str, renderer: &mut dyn BlockRenderer) -> Result<()> {
        let canvas = self
            .canvases
            .get_mut(id)
            .ok_or_else(|| Error::CanvasNotFound(id.to_string()))?;
        canvas.render(renderer)
    }

    /// Destroys and forgets the canvas registered under `id`. A missing id
    /// is reported, not fatal: no state changes and `false` comes back.
    pub fn remove(&mut self, id: &str, renderer: &mut dyn BlockRenderer) -> Result<bool> {
        let Some(mut canvas) = self.canvases.remove(id) else {
            log::warn!("canvas {id} not found");
            return Ok(false);
        };
        self.ids.remove(id);
        canvas.destroy(renderer)?;
        Ok(true)
    }

    /// Tears down every registered canvas; used at server stop. Failures
    /// are logged per canvas so one bad entry cannot strand the rest.
    pub fn destroy_all(&mut self, renderer: &mut dyn BlockRenderer) {
        for (id, mut canvas) in self.canvases.drain() {
            if let Err(e) = canvas.destroy(renderer) {
                log::warn!("canvas {id} teardown failed: {e}");
            }
        }
        self.ids.clear();
    }
}
