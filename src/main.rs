mod core;
mod render;
mod utils;

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Result;
use clap::{Args, Parser, Subcommand, ValueEnum};
use image::RgbImage;

use crate::core::acquire;
use crate::core::graph::{self, PixelGraph, Resampling};
use crate::core::quantize::MedianCut;
use crate::render::canvas::{Canvas, CanvasBuilder};
use crate::render::host::{LogRenderer, Vec3};
use crate::render::world::WorldLoop;
use crate::utils::serializer;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Mode {
    /// One block per pixel, no run merging
    Raw,
    /// Merge horizontal runs of equal-colored pixels
    Rle,
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Mode::Raw => write!(f, "raw"),
            Mode::Rle => write!(f, "rle"),
        }
    }
}

#[derive(Args, Clone, Copy)]
struct OriginArgs {
    /// World X of the canvas's top-left corner
    #[arg(long, default_value_t = 0.0)]
    x: f64,
    /// World Y of the canvas's top-left corner
    #[arg(long, default_value_t = 0.0)]
    y: f64,
    /// World Z of the canvas's top-left corner
    #[arg(long, default_value_t = 0.0)]
    z: f64,
}

impl OriginArgs {
    fn vec3(self) -> Vec3 {
        Vec3::new(self.x, self.y, self.z)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Render a canvas filled with random noise
    Noise {
        width: u32,
        height: u32,
        #[arg(short, long, default_value_t = 1.0)]
        scale: f32,
        #[command(flatten)]
        origin: OriginArgs,
    },
    /// Compile an image into blocks and render it at the given size
    Image {
        input: PathBuf,
        #[arg(long)]
        width: u32,
        #[arg(long)]
        height: u32,
        #[arg(short, long, default_value_t = 1.0)]
        scale: f32,
        #[arg(short, long, value_enum, default_value_t = Mode::Rle)]
        mode: Mode,
        /// Median-cut palette depth (palette size is 2^depth)
        #[arg(short, long)]
        quantize: Option<u32>,
        /// Acquisition timeout in seconds
        #[arg(long, default_value_t = 60)]
        timeout: u64,
        #[command(flatten)]
        origin: OriginArgs,
    },
    /// Render an image scaled by a factor of its source dimensions
    Resize {
        input: PathBuf,
        factor: f32,
        #[arg(short, long, default_value_t = 1.0)]
        scale: f32,
        #[arg(short, long, value_enum, default_value_t = Mode::Rle)]
        mode: Mode,
        #[arg(short, long)]
        quantize: Option<u32>,
        #[arg(long, default_value_t = 60)]
        timeout: u64,
        #[command(flatten)]
        origin: OriginArgs,
    },
    /// List persisted canvas ids
    List,
    /// Remove a canvas by id
    Remove { id: String },
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Noise {
            width,
            height,
            scale,
            origin,
        } => render_noise(width, height, scale, origin.vec3()),
        Commands::Image {
            input,
            width,
            height,
            scale,
            mode,
            quantize,
            timeout,
            origin,
        } => {
            let bitmap = fetch(&input, timeout)?;
            let bitmap = graph::resample(&bitmap, width, height, Resampling::Bilinear)?;
            let graph = build_graph(&bitmap, mode, quantize)?;
            present(compile(graph, scale, origin.vec3())?)
        }
        Commands::Resize {
            input,
            factor,
            scale,
            mode,
            quantize,
            timeout,
            origin,
        } => {
            let bitmap = fetch(&input, timeout)?;
            let bitmap = scale_by_factor(&bitmap, factor)?;
            let graph = build_graph(&bitmap, mode, quantize)?;
            present(compile(graph, scale, origin.vec3())?)
        }
        Commands::List => list_canvases(),
        Commands::Remove { id } => remove_canvas(&id),
    }
}

fn fetch(input: &Path, timeout_secs: u64) -> Result<RgbImage> {
    let bitmap = acquire::acquire(input, Duration::from_secs(timeout_secs))?;
    log::info!(
        "acquired {} ({}x{})",
        input.display(),
        bitmap.width(),
        bitmap.height()
    );
    Ok(bitmap)
}

fn scale_by_factor(bitmap: &RgbImage, factor: f32) -> Result<RgbImage> {
    if factor <= 0.0 {
        return Err(crate::core::error::Error::InvalidFactor(factor).into());
    }
    let width = (bitmap.width() as f32 * factor).round() as u32;
    let height = (bitmap.height() as f32 * factor).round() as u32;
    Ok(graph::resample(bitmap, width, height, Resampling::Bilinear)?)
}

fn build_graph(bitmap: &RgbImage, mode: Mode, quantize: Option<u32>) -> Result<PixelGraph> {
    let mut graph = match mode {
        Mode::Raw => PixelGraph::raw(bitmap),
        Mode::Rle => PixelGraph::run_length(bitmap),
    };
    if let Some(depth) = quantize {
        let palette = MedianCut::new(depth)?.apply(&mut graph)?;
        log::info!("palette reduced to {} colors", palette.len());
    }
    Ok(graph)
}

fn compile(graph: PixelGraph, scale: f32, origin: Vec3) -> Result<Canvas> {
    let canvas = CanvasBuilder::new()
        .width(graph.width())
        .height(graph.height())
        .pixel_scale(scale)
        .origin(origin)
        .save_dir(serializer::default_save_dir())
        .graph(graph)?
        .build()?;
    Ok(canvas)
}

fn render_noise(width: u32, height: u32, scale: f32, origin: Vec3) -> Result<()> {
    let canvas = CanvasBuilder::new()
        .width(width)
        .height(height)
        .pixel_scale(scale)
        .origin(origin)
        .save_dir(serializer::default_save_dir())
        .noise()?
        .build()?;
    present(canvas)
}

/// Hands the built canvas to the world loop for the Rendered transition,
/// then stops the loop, which tears the canvas back down.
fn present(canvas: Canvas) -> Result<()> {
    let pixels = canvas.width() as u64 * canvas.height() as u64;
    let blocks = canvas.block_count();
    let id = canvas.id().to_string();

    let world = WorldLoop::spawn(Box::new(LogRenderer::new()));
    let handle = world.handle();
    let task_id = id.clone();
    handle.call(move |ctx| {
        ctx.registry.add(task_id.clone(), canvas);
        ctx.registry.render(&task_id, ctx.renderer.as_mut())
    })??;

    println!("canvas {id}: {pixels} pixels compiled into {blocks} blocks");
    world.shutdown();
    Ok(())
}

fn list_canvases() -> Result<()> {
    let ids = serializer::list_saved(&serializer::default_save_dir())?;
    if ids.is_empty() {
        println!("no canvases");
        return Ok(());
    }
    for id in ids {
        println!("{id}");
    }
    Ok(())
}

fn remove_canvas(id: &str) -> Result<()> {
    if serializer::remove_saved(&serializer::default_save_dir(), id)? {
        println!("canvas {id} removed");
    } else {
        println!("canvas {id} not found");
    }
    Ok(())
}
