use std::path::PathBuf;

use crate::core::color::Color;
use crate::core::error::{Error, Result};
use crate::core::graph::{GraphKind, PixelGraph};
use crate::core::pixel::Direction;
use crate::render::host::{BlockId, BlockRenderer, Vec3};
use crate::utils::serializer::{self, CanvasMetadata};

/// World-space constants of the layout. The defaults match the host
/// renderer's glyph geometry: one unscaled pixel occupies 0.2 world units,
/// and stretching a block by one run unit shifts its visual center by
/// 0.0875 world units per scale.
#[derive(Clone, Copy, Debug)]
pub struct LayoutConfig {
    pub pixel_footprint: f32,
    pub stretch_per_unit: f32,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        LayoutConfig {
            pixel_footprint: 0.2,
            stretch_per_unit: 0.0875,
        }
    }
}

/// One placed rendering unit covering a maximal horizontal run of
/// equal-colored pixels. The host assigns its id at placement time.
#[derive(Clone, Debug)]
pub struct CanvasBlock {
    pos: Vec3,
    scale: f32,
    color: Color,
    run_length: u32,
    id: Option<BlockId>,
}

impl CanvasBlock {
    fn new(pos: Vec3, scale: f32, color: Color) -> Self {
        CanvasBlock {
            pos,
            scale,
            color,
            run_length: 1,
            id: None,
        }
    }

    fn extend(&mut self) {
        self.run_length += 1;
    }

    pub fn pos(&self) -> Vec3 {
        self.pos
    }

    pub fn color(&self) -> Color {
        self.color
    }

    pub fn run_length(&self) -> u32 {
        self.run_length
    }

    pub fn id(&self) -> Option<BlockId> {
        self.id
    }

    /// Where the stretched block is actually placed: the run-start cursor
    /// shifted along the stretch axis to keep the run visually anchored.
    pub fn placement_pos(&self, config: &LayoutConfig) -> Vec3 {
        let offset = config.stretch_per_unit * (self.run_length - 1) as f32 * self.scale;
        self.pos.offset_x(offset as f64)
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum CanvasState {
    Built,
    Rendered,
    Destroyed,
}

/// One compiled image: a grid of blocks in world space, tracked through
/// the Built -> Rendered -> Destroyed lifecycle. Immutable once built
/// except for that state transition.
pub struct Canvas {
    id: String,
    width: u32,
    height: u32,
    origin: Vec3,
    pixel_scale: f32,
    kind: GraphKind,
    config: LayoutConfig,
    /// `None` where a pixel merged into the block to its left.
    blocks: Vec<Vec<Option<CanvasBlock>>>,
    placed: Vec<BlockId>,
    state: CanvasState,
}

impl Canvas {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn origin(&self) -> Vec3 {
        self.origin
    }

    pub fn pixel_scale(&self) -> f32 {
        self.pixel_scale
    }

    pub fn state(&self) -> CanvasState {
        self.state
    }

    /// Number of blocks the layout produced; runs collapse several pixels
    /// into one block, so this is at most width x height.
    pub fn block_count(&self) -> usize {
        self.blocks
            .iter()
            .map(|row| row.iter().filter(|b| b.is_some()).count())
            .sum()
    }

    pub fn block_at(&self, x: u32, y: u32) -> Result<Option<&CanvasBlock>> {
        let row = self
            .blocks
            .get(y as usize)
            .ok_or(Error::OutOfBounds {
                x,
                y,
                width: self.width,
                height: self.height,
            })?;
        match row.get(x as usize) {
            Some(cell) => Ok(cell.as_ref()),
            None => Err(Error::OutOfBounds {
                x,
                y,
                width: self.width,
                height: self.height,
            }),
        }
    }

    pub fn metadata(&self) -> CanvasMetadata {
        CanvasMetadata {
            id: self.id.clone(),
            width: self.width,
            height: self.height,
            origin: self.origin,
            pixel_scale: self.pixel_scale,
            graph_kind: self.kind,
            block_count: self.block_count(),
            created_at: chrono::Utc::now(),
        }
    }

    /// Places every block into the host world, in row-major order, and
    /// records the assigned ids. A second render call is rejected.
    pub fn render(&mut self, renderer: &mut dyn BlockRenderer) -> Result<()> {
        match self.state {
            CanvasState::Built => {}
            CanvasState::Rendered => return Err(Error::AlreadyRendered),
            CanvasState::Destroyed => return Err(Error::AlreadyDestroyed),
        }

        let config = self.config;
        for row in &mut self.blocks {
            for block in row.iter_mut().flatten() {
                let id = renderer.place_block(
                    block.placement_pos(&config),
                    block.scale,
                    block.color,
                    block.run_length,
                );
                block.id = Some(id);
                self.placed.push(id);
            }
        }
        self.state = CanvasState::Rendered;
        log::info!("canvas {} rendered with {} blocks", self.id, self.placed.len());
        Ok(())
    }

    /// Removes every placed block from the host world. Destroying a canvas
    /// that was never rendered removes nothing but still transitions; a
    /// second destroy is rejected.
    pub fn destroy(&mut self, renderer: &mut dyn BlockRenderer) -> Result<()> {
        if self.state == CanvasState::Destroyed {
            return Err(Error::AlreadyDestroyed);
        }
        for id in self.placed.drain(..) {
            renderer.remove_block(id);
        }
        self.state = CanvasState::Destroyed;
        log::info!("canvas {} destroyed", self.id);
        Ok(())
    }
}

/// Assembles a Canvas from a pixel grid, validating dimensions up front
/// and laying out blocks with horizontal-run merging.
pub struct CanvasBuilder {
    width: u32,
    height: u32,
    origin: Vec3,
    pixel_scale: f32,
    config: LayoutConfig,
    graph: Option<PixelGraph>,
    save_dir: Option<PathBuf>,
}

impl Default for CanvasBuilder {
    fn default() -> Self {
        CanvasBuilder {
            width: 0,
            height: 0,
            origin: Vec3::default(),
            pixel_scale: 1.0,
            config: LayoutConfig::default(),
            graph: None,
            save_dir: None,
        }
    }
}

impl CanvasBuilder {
    pub fn new() -> Self {
        CanvasBuilder::default()
    }

    pub fn width(mut self, width: u32) -> Self {
        self.width = width;
        self
    }

    pub fn height(mut self, height: u32) -> Self {
        self.height = height;
        self
    }

    pub fn origin(mut self, origin: Vec3) -> Self {
        self.origin = origin;
        self
    }

    pub fn pixel_scale(mut self, pixel_scale: f32) -> Self {
        self.pixel_scale = pixel_scale;
        self
    }

    pub fn config(mut self, config: LayoutConfig) -> Self {
        self.config = config;
        self
    }

    /// Directory where the canvas metadata is persisted at build time.
    /// Persistence is fire-and-forget; failures are logged, never raised.
    pub fn save_dir(mut self, dir: PathBuf) -> Self {
        self.save_dir = Some(dir);
        self
    }

    /// Attaches the processed pixel grid. Canvas dimensions must already be
    /// set and must agree with the grid's.
    pub fn graph(mut self, graph: PixelGraph) -> Result<Self> {
        if self.width == 0 || self.height == 0 {
            return Err(Error::DimensionsUnset);
        }
        if graph.width() != self.width || graph.height() != self.height {
            return Err(Error::DimensionMismatch {
                image_width: graph.width(),
                image_height: graph.height(),
                canvas_width: self.width,
                canvas_height: self.height,
            });
        }
        self.graph = Some(graph);
        Ok(self)
    }

    /// Fills the canvas with random noise, primarily for testing the
    /// render path without an input image.
    pub fn noise(mut self) -> Result<Self> {
        let graph = PixelGraph::noise(self.width, self.height)?;
        self.graph = Some(graph);
        Ok(self)
    }

    pub fn build(self) -> Result<Canvas> {
        if self.width == 0 || self.height == 0 {
            return Err(Error::InvalidDimensions {
                width: self.width,
                height: self.height,
            });
        }
        if self.pixel_scale <= 0.0 {
            return Err(Error::InvalidScale(self.pixel_scale));
        }
        let graph = self.graph.ok_or(Error::MissingGraph)?;

        let blocks = layout(&graph, self.origin, self.pixel_scale, &self.config)?;
        let canvas = Canvas {
            id: format!("{:032x}", rand::random::<u128>()),
            width: self.width,
            height: self.height,
            origin: self.origin,
            pixel_scale: self.pixel_scale,
            kind: graph.kind(),
            config: self.config,
            blocks,
            placed: Vec::new(),
            state: CanvasState::Built,
        };
        log::info!(
            "canvas {} built: {}x{} {} grid compiled to {} blocks",
            canvas.id,
            canvas.width,
            canvas.height,
            canvas.kind,
            canvas.block_count()
        );

        if let Some(dir) = &self.save_dir {
            if let Err(e) = serializer::persist(&canvas.metadata(), dir) {
                log::error!("failed to persist canvas {}: {e}", canvas.id);
            }
        }
        Ok(canvas)
    }
}

/// Walks the grid row by row, emitting one block per maximal horizontal run.
/// A pixel with a LEFT link extends the run's block instead of spawning a
/// new one; the cursor still advances one footprint per pixel either way.
fn layout(
    graph: &PixelGraph,
    origin: Vec3,
    pixel_scale: f32,
    config: &LayoutConfig,
) -> Result<Vec<Vec<Option<CanvasBlock>>>> {
    let step = (config.pixel_footprint * pixel_scale) as f64;
    let mut blocks = Vec::with_capacity(graph.height() as usize);

    for y in 0..graph.height() {
        let row_len = graph.row_len(y)?;
        let mut row: Vec<Option<CanvasBlock>> = Vec::with_capacity(row_len);
        let mut cursor = Vec3::new(origin.x, origin.y - step * y as f64, origin.z);
        let mut run_start: Option<usize> = None;

        for x in 0..row_len {
            let pixel = graph.pixel_at(x as u32, y)?;
            if pixel.connections().is_connected_in(Direction::Left) {
                if let Some(block) = run_start.and_then(|i| row[i].as_mut()) {
                    block.extend();
                }
                row.push(None);
            } else {
                row.push(Some(CanvasBlock::new(cursor, pixel_scale, pixel.color())));
                run_start = Some(x);
            }
            cursor.x += step;
        }
        blocks.push(row);
    }
    Ok(blocks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::host::RecordingRenderer;
    use image::RgbImage;

    fn bitmap(rows: &[&[u32]]) -> RgbImage {
        let height = rows.len() as u32;
        let width = rows[0].len() as u32;
        RgbImage::from_fn(width, height, |x, y| {
            let rgb = rows[y as usize][x as usize];
            image::Rgb([(rgb >> 16) as u8, (rgb >> 8) as u8, rgb as u8])
        })
    }

    fn built(rows: &[&[u32]], rle: bool) -> Canvas {
        let img = bitmap(rows);
        let graph = if rle {
            PixelGraph::run_length(&img)
        } else {
            PixelGraph::raw(&img)
        };
        CanvasBuilder::new()
            .width(img.width())
            .height(img.height())
            .pixel_scale(1.0)
            .graph(graph)
            .unwrap()
            .build()
            .unwrap()
    }

    #[test]
    fn raw_grid_places_one_block_per_pixel() {
        let mut canvas = built(&[&[0xFF0000, 0xFF0000], &[0xFF0000, 0xFF0000]], false);
        assert_eq!(canvas.block_count(), 4);

        let mut renderer = RecordingRenderer::new();
        canvas.render(&mut renderer).unwrap();
        assert_eq!(renderer.placements.len(), 4);
        assert!(renderer.placements.iter().all(|p| p.run_length == 1));
    }

    #[test]
    fn solid_rle_rows_collapse_to_one_block_per_row() {
        let mut canvas = built(
            &[
                &[0xAA0000, 0xAA0000, 0xAA0000],
                &[0xAA0000, 0xAA0000, 0xAA0000],
            ],
            true,
        );
        assert_eq!(canvas.block_count(), 2);

        let mut renderer = RecordingRenderer::new();
        canvas.render(&mut renderer).unwrap();
        assert_eq!(renderer.placements.len(), 2);
        for p in &renderer.placements {
            assert_eq!(p.run_length, 3);
        }
        // rows step down by one footprint
        assert_eq!(renderer.placements[0].pos.y, 0.0);
        assert!((renderer.placements[1].pos.y + 0.2).abs() < 1e-9);
    }

    #[test]
    fn two_pixel_run_is_one_stretched_block() {
        let mut canvas = built(&[&[0xFF0000, 0xFF0000]], true);
        assert_eq!(canvas.block_count(), 1);

        let mut renderer = RecordingRenderer::new();
        canvas.render(&mut renderer).unwrap();
        let p = &renderer.placements[0];
        assert_eq!(p.run_length, 2);
        // run start at the origin, shifted by one stretch unit
        assert!((p.pos.x - 0.0875).abs() < 1e-6);
        assert_eq!(p.pos.y, 0.0);
    }

    #[test]
    fn merged_pixels_leave_null_cells() {
        let canvas = built(&[&[0x00FF00, 0x00FF00, 0x0000FF]], true);
        assert!(canvas.block_at(0, 0).unwrap().is_some());
        assert!(canvas.block_at(1, 0).unwrap().is_none());
        let tail = canvas.block_at(2, 0).unwrap().unwrap();
        assert_eq!(tail.run_length(), 1);
        assert!(canvas.block_at(0, 1).is_err());
    }

    #[test]
    fn isolated_pixels_get_their_own_blocks() {
        let mut canvas = built(&[&[0x010101, 0x020202, 0x030303]], true);
        assert_eq!(canvas.block_count(), 3);
        let mut renderer = RecordingRenderer::new();
        canvas.render(&mut renderer).unwrap();
        let xs: Vec<f64> = renderer.placements.iter().map(|p| p.pos.x).collect();
        assert!((xs[0] - 0.0).abs() < 1e-9);
        assert!((xs[1] - 0.2).abs() < 1e-9);
        assert!((xs[2] - 0.4).abs() < 1e-9);
    }

    #[test]
    fn cursor_advances_past_merged_pixels() {
        // run of two, then a different color: third block sits two steps out
        let mut canvas = built(&[&[0xFF0000, 0xFF0000, 0x0000FF]], true);
        let mut renderer = RecordingRenderer::new();
        canvas.render(&mut renderer).unwrap();
        assert_eq!(renderer.placements.len(), 2);
        assert!((renderer.placements[1].pos.x - 0.4).abs() < 1e-9);
    }

    #[test]
    fn scale_multiplies_footprint_and_offset() {
        let img = bitmap(&[&[0xFF0000, 0xFF0000]]);
        let mut canvas = CanvasBuilder::new()
            .width(2)
            .height(1)
            .pixel_scale(5.0)
            .graph(PixelGraph::run_length(&img))
            .unwrap()
            .build()
            .unwrap();
        let mut renderer = RecordingRenderer::new();
        canvas.render(&mut renderer).unwrap();
        let p = &renderer.placements[0];
        assert_eq!(p.scale, 5.0);
        assert!((p.pos.x - 0.0875 * 5.0).abs() < 1e-5);
    }

    #[test]
    fn builder_rejects_invalid_arguments() {
        let img = bitmap(&[&[0xFF0000]]);

        // zero width fails before any block is placed
        let err = CanvasBuilder::new()
            .width(0)
            .height(1)
            .graph(PixelGraph::raw(&img));
        assert!(matches!(err, Err(Error::DimensionsUnset)));

        let err = CanvasBuilder::new().width(0).height(1).build();
        assert!(matches!(err, Err(Error::InvalidDimensions { .. })));

        let err = CanvasBuilder::new()
            .width(1)
            .height(1)
            .pixel_scale(0.0)
            .graph(PixelGraph::raw(&img))
            .unwrap()
            .build();
        assert!(matches!(err, Err(Error::InvalidScale(_))));

        let err = CanvasBuilder::new()
            .width(2)
            .height(2)
            .graph(PixelGraph::raw(&img));
        assert!(matches!(err, Err(Error::DimensionMismatch { .. })));

        let err = CanvasBuilder::new().width(1).height(1).build();
        assert!(matches!(err, Err(Error::MissingGraph)));
    }

    #[test]
    fn lifecycle_rejects_double_transitions() {
        let mut canvas = built(&[&[0xFF0000]], false);
        let mut renderer = RecordingRenderer::new();

        assert_eq!(canvas.state(), CanvasState::Built);
        canvas.render(&mut renderer).unwrap();
        assert_eq!(canvas.state(), CanvasState::Rendered);
        assert_eq!(canvas.render(&mut renderer), Err(Error::AlreadyRendered));

        canvas.destroy(&mut renderer).unwrap();
        assert_eq!(canvas.state(), CanvasState::Destroyed);
        assert_eq!(canvas.destroy(&mut renderer), Err(Error::AlreadyDestroyed));
        assert_eq!(canvas.render(&mut renderer), Err(Error::AlreadyDestroyed));
    }

    #[test]
    fn destroy_removes_exactly_the_placed_blocks() {
        let mut canvas = built(&[&[0xFF0000, 0x00FF00], &[0x0000FF, 0xFFFFFF]], true);
        let mut renderer = RecordingRenderer::new();
        canvas.render(&mut renderer).unwrap();
        let placed: Vec<_> = renderer.placements.iter().map(|p| p.id).collect();

        canvas.destroy(&mut renderer).unwrap();
        assert_eq!(renderer.removals, placed);
        assert_eq!(renderer.live_blocks(), 0);
    }

    #[test]
    fn destroying_a_never_rendered_canvas_removes_nothing() {
        let mut canvas = built(&[&[0xFF0000]], false);
        let mut renderer = RecordingRenderer::new();
        canvas.destroy(&mut renderer).unwrap();
        assert!(renderer.removals.is_empty());
        assert_eq!(canvas.state(), CanvasState::Destroyed);
    }

    #[test]
    fn noise_canvas_builds_and_renders() {
        let mut canvas = CanvasBuilder::new()
            .width(4)
            .height(4)
            .noise()
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(canvas.block_count(), 16);
        let mut renderer = RecordingRenderer::new();
        canvas.render(&mut renderer).unwrap();
        assert_eq!(renderer.placements.len(), 16);
    }

    #[test]
    fn build_persists_metadata_when_a_save_dir_is_set() {
        let dir = tempfile::tempdir().unwrap();
        let img = bitmap(&[&[0xFF0000, 0xFF0000]]);
        let canvas = CanvasBuilder::new()
            .width(2)
            .height(1)
            .save_dir(dir.path().to_path_buf())
            .graph(PixelGraph::run_length(&img))
            .unwrap()
            .build()
            .unwrap();

        let path = dir.path().join(format!("{}.json", canvas.id()));
        let json = std::fs::read_to_string(path).unwrap();
        let meta: CanvasMetadata = serde_json::from_str(&json).unwrap();
        assert_eq!(meta.id, canvas.id());
        assert_eq!((meta.width, meta.height), (2, 1));
        assert_eq!(meta.block_count, 1);
        assert_eq!(meta.graph_kind, GraphKind::RunLength);
    }
}
