use std::fs::{self, File};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::graph::GraphKind;
use crate::render::host::Vec3;

/// The durable record of a compiled canvas, written once at build time.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CanvasMetadata {
    pub id: String,
    pub width: u32,
    pub height: u32,
    pub origin: Vec3,
    pub pixel_scale: f32,
    pub graph_kind: GraphKind,
    pub block_count: usize,
    pub created_at: DateTime<Utc>,
}

/// Writes `<dir>/<id>.json`, creating the directory if needed.
pub fn persist(metadata: &CanvasMetadata, dir: &Path) -> Result<()> {
    fs::create_dir_all(dir)
        .with_context(|| format!("creating save directory {}", dir.display()))?;
    let path = dir.join(format!("{}.json", metadata.id));
    let file = File::create(&path).with_context(|| format!("creating {}", path.display()))?;
    serde_json::to_writer_pretty(file, metadata)
        .with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}

/// Per-install location for canvas metadata.
pub fn default_save_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("pixelboard")
        .join("canvases")
}

/// Ids of every canvas persisted under `dir`.
pub fn list_saved(dir: &Path) -> Result<Vec<String>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let mut ids = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| format!("reading {}", dir.display()))? {
        let path = entry?.path();
        if path.extension().and_then(|e| e.to_str()) == Some("json") {
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                ids.push(stem.to_string());
            }
        }
    }
    ids.sort();
    Ok(ids)
}

/// Deletes the persisted record for `id`; false when there was none.
pub fn remove_saved(dir: &Path, id: &str) -> Result<bool> {
    let path = dir.join(format!("{id}.json"));
    if !path.exists() {
        return Ok(false);
    }
    fs::remove_file(&path).with_context(|| format!("removing {}", path.display()))?;
    Ok(true)
}
