use fast_image_resize as fir;
use fast_image_resize::images::Image as FirImage;
use image::RgbImage;
use rand::Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::core::color::Color;
use crate::core::error::{Error, Result};
use crate::core::pixel::{Direction, ImagePixel};

/// How a pixel grid was built. Raw grids carry no links; run-length grids
/// link equal-colored horizontal neighbors so the layout engine can merge
/// them into stretched blocks.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GraphKind {
    Raw,
    #[serde(rename = "rle")]
    RunLength,
}

impl std::fmt::Display for GraphKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GraphKind::Raw => write!(f, "raw"),
            GraphKind::RunLength => write!(f, "rle"),
        }
    }
}

/// Resampling filter for the optional pre-resize step.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Resampling {
    Nearest,
    Bilinear,
}

/// A width x height grid of pixels built from a bitmap.
///
/// Rows are exposed through `row_len` and `pixel_at` so consumers stay
/// agnostic of the underlying row representation.
#[derive(Clone, Debug)]
pub struct PixelGraph {
    width: u32,
    height: u32,
    kind: GraphKind,
    rows: Vec<Vec<ImagePixel>>,
}

impl PixelGraph {
    /// One pixel per source pixel, no links populated.
    pub fn raw(image: &RgbImage) -> Self {
        PixelGraph {
            width: image.width(),
            height: image.height(),
            kind: GraphKind::Raw,
            rows: extract_rows(image),
        }
    }

    /// Scans each row left to right and links every pixel to its immediate
    /// predecessor when their colors match. Vertical links are never set.
    pub fn run_length(image: &RgbImage) -> Self {
        let mut graph = PixelGraph {
            width: image.width(),
            height: image.height(),
            kind: GraphKind::RunLength,
            rows: extract_rows(image),
        };
        graph.link_rows();
        graph
    }

    /// A raw grid of uniformly random colors, used for test canvases.
    pub fn noise(width: u32, height: u32) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(Error::InvalidDimensions { width, height });
        }
        let mut rng = rand::thread_rng();
        let rows = (0..height)
            .map(|_| {
                (0..width)
                    .map(|_| {
                        ImagePixel::new(Color::from([
                            rng.gen::<u8>(),
                            rng.gen::<u8>(),
                            rng.gen::<u8>(),
                        ]))
                    })
                    .collect()
            })
            .collect();
        Ok(PixelGraph {
            width,
            height,
            kind: GraphKind::Raw,
            rows,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn kind(&self) -> GraphKind {
        self.kind
    }

    /// Number of pixels stored for row `y`. Run-length representations may
    /// store fewer entries than the declared width.
    pub fn row_len(&self, y: u32) -> Result<usize> {
        self.check_bounds(0, y)?;
        Ok(self.rows[y as usize].len())
    }

    pub fn pixel_at(&self, x: u32, y: u32) -> Result<&ImagePixel> {
        self.check_bounds(x, y)?;
        Ok(&self.rows[y as usize][x as usize])
    }

    pub fn pixel_at_mut(&mut self, x: u32, y: u32) -> Result<&mut ImagePixel> {
        self.check_bounds(x, y)?;
        Ok(&mut self.rows[y as usize][x as usize])
    }

    /// All pixel colors in row-major order. Order is irrelevant to the
    /// quantizer, which only partitions the color population.
    pub fn flatten_colors(&self) -> Vec<Color> {
        self.rows
            .iter()
            .flat_map(|row| row.iter().map(|px| px.color()))
            .collect()
    }

    /// Reassigns every pixel to its nearest palette entry, breaking distance
    /// ties in favor of the earliest entry. Recoloring drops each pixel's
    /// links, so run-length graphs must have them rebuilt afterwards.
    pub fn remap_colors(&mut self, palette: &[Color]) {
        if palette.is_empty() {
            return;
        }
        self.rows.par_iter_mut().for_each(|row| {
            for px in row.iter_mut() {
                px.set_color(nearest_entry(palette, px.color()));
            }
        });
    }

    /// Clears every connection and re-derives links for the graph's own
    /// representation kind.
    pub fn rebuild_links(&mut self) {
        for row in &mut self.rows {
            for px in row.iter_mut() {
                px.connections_mut().clear();
            }
        }
        if self.kind == GraphKind::RunLength {
            self.link_rows();
        }
    }

    fn link_rows(&mut self) {
        for (y, row) in self.rows.iter_mut().enumerate() {
            for x in 1..row.len() {
                if row[x].color() == row[x - 1].color() {
                    let (cx, cy) = (x as u32, y as u32);
                    row[x - 1].connections_mut().set(Direction::Right, (cx, cy));
                    row[x].connections_mut().set(Direction::Left, (cx - 1, cy));
                }
            }
        }
    }

    fn check_bounds(&self, x: u32, y: u32) -> Result<()> {
        if x >= self.width || y >= self.height {
            return Err(Error::OutOfBounds {
                x,
                y,
                width: self.width,
                height: self.height,
            });
        }
        Ok(())
    }
}

fn extract_rows(image: &RgbImage) -> Vec<Vec<ImagePixel>> {
    (0..image.height())
        .map(|y| {
            (0..image.width())
                .map(|x| ImagePixel::new(Color::from(image.get_pixel(x, y).0)))
                .collect()
        })
        .collect()
}

fn nearest_entry(palette: &[Color], color: Color) -> Color {
    let mut best = palette[0];
    let mut best_distance = color.distance(best);
    for &entry in &palette[1..] {
        let d = color.distance(entry);
        if d < best_distance {
            best = entry;
            best_distance = d;
        }
    }
    best
}

/// Resizes a bitmap before pixel extraction so the resulting graph matches
/// the canvas dimensions it will feed.
pub fn resample(image: &RgbImage, width: u32, height: u32, sampling: Resampling) -> Result<RgbImage> {
    if width == 0 || height == 0 {
        return Err(Error::InvalidDimensions { width, height });
    }
    if (width, height) == image.dimensions() {
        return Ok(image.clone());
    }

    let src = FirImage::from_vec_u8(
        image.width(),
        image.height(),
        image.as_raw().clone(),
        fir::PixelType::U8x3,
    )
    .map_err(|e| Error::Resample(e.to_string()))?;
    let mut dst = FirImage::new(width, height, fir::PixelType::U8x3);

    let alg = match sampling {
        Resampling::Nearest => fir::ResizeAlg::Nearest,
        Resampling::Bilinear => fir::ResizeAlg::Convolution(fir::FilterType::Bilinear),
    };
    let options = fir::ResizeOptions::new().resize_alg(alg);
    fir::Resizer::new()
        .resize(&src, &mut dst, Some(&options))
        .map_err(|e| Error::Resample(e.to_string()))?;

    RgbImage::from_raw(width, height, dst.buffer().to_vec())
        .ok_or_else(|| Error::Resample("resized buffer has unexpected length".into()))
}
