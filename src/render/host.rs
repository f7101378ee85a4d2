use serde::{Deserialize, Serialize};

use crate::core::color::Color;

/// Identifier assigned by the host renderer when a block is placed.
/// Only valid between placement and removal.
pub type BlockId = u64;

/// A position in world space.
#[derive(Clone, Copy, Default, PartialEq, Debug, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Vec3 { x, y, z }
    }

    pub fn offset_x(self, dx: f64) -> Self {
        Vec3 {
            x: self.x + dx,
            ..self
        }
    }
}

/// The narrow contract the layout engine and canvas lifecycle depend on.
/// Spawning and removing a visual block is the host's business; the
/// pipeline only ever sees the returned identifiers.
///
/// All calls must come from the single world-mutation thread.
pub trait BlockRenderer {
    fn place_block(&mut self, pos: Vec3, scale: f32, color: Color, run_length: u32) -> BlockId;
    fn remove_block(&mut self, id: BlockId);
}

/// One captured `place_block` call.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct Placement {
    pub id: BlockId,
    pub pos: Vec3,
    pub scale: f32,
    pub color: Color,
    pub run_length: u32,
}

/// Captures every placement and removal. Backs the test suite and the
/// CLI's dry-run reporting.
#[derive(Default)]
pub struct RecordingRenderer {
    next_id: BlockId,
    pub placements: Vec<Placement>,
    pub removals: Vec<BlockId>,
}

impl RecordingRenderer {
    pub fn new() -> Self {
        RecordingRenderer::default()
    }

    /// Ids that were placed but never removed.
    pub fn live_blocks(&self) -> usize {
        self.placements.len() - self.removals.len()
    }
}

impl BlockRenderer for RecordingRenderer {
    fn place_block(&mut self, pos: Vec3, scale: f32, color: Color, run_length: u32) -> BlockId {
        let id = self.next_id;
        self.next_id += 1;
        self.placements.push(Placement {
            id,
            pos,
            scale,
            color,
            run_length,
        });
        id
    }

    fn remove_block(&mut self, id: BlockId) {
        self.removals.push(id);
    }
}

/// Logs placements and removals instead of talking to a real world.
/// Stands in for the host renderer when running from the command line.
#[derive(Default)]
pub struct LogRenderer {
    next_id: BlockId,
    placed: u64,
    removed: u64,
}

impl LogRenderer {
    pub fn new() -> Self {
        LogRenderer::default()
    }

    pub fn placed(&self) -> u64 {
        self.placed
    }

    pub fn removed(&self) -> u64 {
        self.removed
    }
}

impl BlockRenderer for LogRenderer {
    fn place_block(&mut self, pos: Vec3, scale: f32, color: Color, run_length: u32) -> BlockId {
        let id = self.next_id;
        self.next_id += 1;
        self.placed += 1;
        log::debug!(
            "place block {id} at ({:.3}, {:.3}, {:.3}) scale {scale} color #{:06x} run {run_length}",
            pos.x,
            pos.y,
            pos.z,
            color.rgb()
        );
        id
    }

    fn remove_block(&mut self, id: BlockId) {
        self.removed += 1;
        log::debug!("remove block {id}");
    }
}
