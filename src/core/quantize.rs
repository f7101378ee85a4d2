use crate::core::color::{Color, ColorChannel};
use crate::core::error::{Error, Result};
use crate::core::graph::PixelGraph;

/// Caps the palette at 2^16 entries; deeper cuts serve no display purpose.
const MAX_DEPTH: u32 = 16;

/// Median-cut color reduction.
///
/// A depth of `d` produces a palette of exactly 2^d colors (duplicates
/// included) by recursively splitting the color population along the
/// channel with the greatest value range.
#[derive(Clone, Copy, Debug)]
pub struct MedianCut {
    depth: u32,
}

impl MedianCut {
    pub fn new(depth: u32) -> Result<Self> {
        if depth > MAX_DEPTH {
            return Err(Error::DepthTooLarge(depth));
        }
        Ok(MedianCut { depth })
    }

    pub fn depth(&self) -> u32 {
        self.depth
    }

    /// Builds the reduced palette without touching the graph.
    pub fn palette(&self, graph: &PixelGraph) -> Result<Vec<Color>> {
        let mut colors = graph.flatten_colors();
        if colors.is_empty() {
            return Err(Error::EmptyGraph);
        }
        let mut palette = Vec::with_capacity(1usize << self.depth);
        partition(&mut colors, 0, self.depth, &mut palette)?;
        Ok(palette)
    }

    /// Quantizes the graph in place: every pixel is remapped to the nearest
    /// palette entry and links are re-derived for the graph's own
    /// representation kind. Returns the palette that was applied.
    pub fn apply(&self, graph: &mut PixelGraph) -> Result<Vec<Color>> {
        let palette = self.palette(graph)?;
        graph.remap_colors(&palette);
        graph.rebuild_links();
        Ok(palette)
    }
}

/// Recursive range-split over an index range of the flattened colors.
/// Each leaf contributes one palette entry, in left-to-right order.
fn partition(colors: &mut [Color], depth: u32, max_depth: u32, palette: &mut Vec<Color>) -> Result<()> {
    if colors.is_empty() {
        // The source population ran out before reaching the leaf depth.
        return Err(Error::PaletteUnderflow(depth));
    }
    if depth == max_depth {
        palette.push(average_color(colors));
        return Ok(());
    }

    let channel = widest_channel(colors);
    colors.sort_by_key(|c| c.channel(channel));

    let mid = colors.len() / 2;
    let (left, right) = colors.split_at_mut(mid);
    partition(left, depth + 1, max_depth, palette)?;
    partition(right, depth + 1, max_depth, palette)
}

/// The channel with the greatest max-min range, ties resolved in
/// red > green > blue priority order.
fn widest_channel(colors: &[Color]) -> ColorChannel {
    let mut widest = ColorChannel::Red;
    let mut widest_range = 0;
    for channel in ColorChannel::ALL {
        let mut min = u32::MAX;
        let mut max = 0;
        for c in colors {
            let v = c.channel(channel);
            min = min.min(v);
            max = max.max(v);
        }
        let range = max.saturating_sub(min);
        if range > widest_range {
            widest = channel;
            widest_range = range;
        }
    }
    widest
}

/// Integer-truncated per-channel mean. Callers guarantee a non-empty slice.
fn average_color(colors: &[Color]) -> Color {
    let count = colors.len() as u64;
    let (mut r, mut g, mut b) = (0u64, 0u64, 0u64);
    for c in colors {
        r += c.red() as u64;
        g += c.green() as u64;
        b += c.blue() as u64;
    }
    Color::from([(r / count) as u8, (g / count) as u8, (b / count) as u8])
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;

    fn color(rgb: u32) -> Color {
        Color::new(rgb).unwrap()
    }

    fn graph_of(rows: &[&[u32]]) -> PixelGraph {
        let height = rows.len() as u32;
        let width = rows[0].len() as u32;
        let img = RgbImage::from_fn(width, height, |x, y| {
            let rgb = rows[y as usize][x as usize];
            image::Rgb([(rgb >> 16) as u8, (rgb >> 8) as u8, rgb as u8])
        });
        PixelGraph::run_length(&img)
    }

    #[test]
    fn depth_zero_yields_the_global_average() {
        let graph = graph_of(&[&[0x000000, 0x0000FF], &[0x00FF00, 0xFF0000]]);
        let palette = MedianCut::new(0).unwrap().palette(&graph).unwrap();
        // each channel sums to 255 over four pixels, truncating to 63
        assert_eq!(palette, vec![color(0x3F3F3F)]);
    }

    #[test]
    fn palette_size_is_two_to_the_depth() {
        let rows: Vec<u32> = (0..16).map(|i| (i * 16) << 16 | (255 - i * 16)).collect();
        let graph = graph_of(&[rows.as_slice()]);
        for depth in 0..=3 {
            let palette = MedianCut::new(depth).unwrap().palette(&graph).unwrap();
            assert_eq!(palette.len(), 1 << depth);
        }
    }

    #[test]
    fn splits_along_the_widest_channel() {
        // red spans the full range, green and blue are constant
        let graph = graph_of(&[&[0x00_10_10, 0x40_10_10, 0xC0_10_10, 0xFF_10_10]]);
        let palette = MedianCut::new(1).unwrap().palette(&graph).unwrap();
        assert_eq!(palette.len(), 2);
        // left leaf averages {0x00, 0x40}, right leaf {0xC0, 0xFF}
        assert_eq!(palette[0], color(0x20_10_10));
        assert_eq!(palette[1], color(0xDF_10_10));
    }

    #[test]
    fn channel_range_ties_prefer_red_first() {
        // red and blue both span 0..=255; red must win the tie
        let colors = vec![color(0x00_00_FF), color(0xFF_00_00)];
        assert_eq!(widest_channel(&colors), ColorChannel::Red);
    }

    #[test]
    fn apply_remaps_pixels_and_rebuilds_runs() {
        // two near-black pixels and two near-white pixels in one row
        let graph_rows: &[&[u32]] = &[&[0x050505, 0x0A0A0A, 0xF0F0F0, 0xFAFAFA]];
        let mut graph = graph_of(graph_rows);
        let palette = MedianCut::new(1).unwrap().apply(&mut graph).unwrap();
        assert_eq!(palette.len(), 2);

        // both halves collapse to their average, re-linking each pair
        assert_eq!(graph.pixel_at(0, 0).unwrap().color(), graph.pixel_at(1, 0).unwrap().color());
        assert_eq!(graph.pixel_at(2, 0).unwrap().color(), graph.pixel_at(3, 0).unwrap().color());
        assert!(graph
            .pixel_at(1, 0)
            .unwrap()
            .connections()
            .is_connected_in(crate::core::pixel::Direction::Left));
        assert!(!graph
            .pixel_at(2, 0)
            .unwrap()
            .connections()
            .is_connected_in(crate::core::pixel::Direction::Left));
    }

    #[test]
    fn repeated_application_keeps_the_palette_size() {
        let graph_rows: Vec<u32> = (0..32).map(|i| i * 8 + ((i * 3) << 8)).collect();
        let mut graph = graph_of(&[graph_rows.as_slice()]);
        let quantizer = MedianCut::new(2).unwrap();
        let first = quantizer.apply(&mut graph).unwrap();
        let second = quantizer.apply(&mut graph).unwrap();
        assert_eq!(first.len(), second.len());
    }

    #[test]
    fn underflow_and_depth_validation() {
        assert!(matches!(MedianCut::new(17), Err(Error::DepthTooLarge(17))));

        // one pixel cannot feed a four-leaf cut
        let graph = graph_of(&[&[0x123456]]);
        assert!(matches!(
            MedianCut::new(2).unwrap().palette(&graph),
            Err(Error::PaletteUnderflow(_))
        ));
    }
}
