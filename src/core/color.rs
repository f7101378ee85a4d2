use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::error::{Error, Result};

/// A 24-bit RGB color packed as 0xRRGGBB.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color(u32);

/// The three channels of the RGB color model, in the fixed priority
/// order used to break ties during quantization.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ColorChannel {
    Red,
    Green,
    Blue,
}

impl ColorChannel {
    pub const ALL: [ColorChannel; 3] = [ColorChannel::Red, ColorChannel::Green, ColorChannel::Blue];
}

impl fmt::Display for ColorChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColorChannel::Red => write!(f, "red"),
            ColorChannel::Green => write!(f, "green"),
            ColorChannel::Blue => write!(f, "blue"),
        }
    }
}

impl Color {
    /// Builds a color from a packed 0xRRGGBB value. Values with bits above
    /// the low 24 are rejected.
    pub fn new(rgb: u32) -> Result<Self> {
        if rgb > 0xFF_FF_FF {
            return Err(Error::PackedOutOfRange(rgb));
        }
        Ok(Color(rgb))
    }

    /// Builds a color from individual channel values, each 0-255.
    pub fn from_channels(red: u32, green: u32, blue: u32) -> Result<Self> {
        for (name, value) in [("red", red), ("green", green), ("blue", blue)] {
            if value > 255 {
                return Err(Error::ChannelOutOfRange {
                    channel: name,
                    value,
                });
            }
        }
        Ok(Color((red << 16) | (green << 8) | blue))
    }

    pub fn rgb(self) -> u32 {
        self.0
    }

    pub fn red(self) -> u32 {
        (self.0 >> 16) & 0xFF
    }

    pub fn green(self) -> u32 {
        (self.0 >> 8) & 0xFF
    }

    pub fn blue(self) -> u32 {
        self.0 & 0xFF
    }

    pub fn channel(self, channel: ColorChannel) -> u32 {
        match channel {
            ColorChannel::Red => self.red(),
            ColorChannel::Green => self.green(),
            ColorChannel::Blue => self.blue(),
        }
    }

    /// Replaces the packed value in place.
    pub fn set_rgb(&mut self, rgb: u32) -> Result<()> {
        if rgb > 0xFF_FF_FF {
            return Err(Error::PackedOutOfRange(rgb));
        }
        self.0 = rgb;
        Ok(())
    }

    /// Squared Euclidean distance between two colors, summed over the
    /// channels. Not perceptual; used as the quantization palette metric.
    pub fn distance(self, other: Color) -> u32 {
        ColorChannel::ALL
            .iter()
            .map(|&c| {
                let d = self.channel(c) as i32 - other.channel(c) as i32;
                (d * d) as u32
            })
            .sum()
    }
}

/// Byte channels are always in range, so no validation applies.
impl From<[u8; 3]> for Color {
    fn from(c: [u8; 3]) -> Self {
        Color(((c[0] as u32) << 16) | ((c[1] as u32) << 8) | c[2] as u32)
    }
}

impl fmt::Debug for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Color(#{:06x})", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_extraction() {
        let c = Color::new(0x12_34_56).unwrap();
        assert_eq!(c.red(), 0x12);
        assert_eq!(c.green(), 0x34);
        assert_eq!(c.blue(), 0x56);
        assert_eq!(c.channel(ColorChannel::Green), 0x34);
    }

    #[test]
    fn from_channels_matches_packed() {
        let a = Color::from_channels(0xAB, 0xCD, 0xEF).unwrap();
        let b = Color::new(0xAB_CD_EF).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn rejects_out_of_range_channel() {
        assert_eq!(
            Color::from_channels(256, 0, 0),
            Err(Error::ChannelOutOfRange {
                channel: "red",
                value: 256
            })
        );
        assert!(Color::from_channels(0, 300, 0).is_err());
    }

    #[test]
    fn rejects_out_of_range_packed() {
        assert_eq!(
            Color::new(0x1_00_00_00),
            Err(Error::PackedOutOfRange(0x1_00_00_00))
        );
        let mut c = Color::new(0).unwrap();
        assert!(c.set_rgb(u32::MAX).is_err());
        assert_eq!(c.rgb(), 0);
    }

    #[test]
    fn distance_is_zero_on_self_and_symmetric() {
        let a = Color::new(0x11_22_33).unwrap();
        let b = Color::new(0x44_55_66).unwrap();
        assert_eq!(a.distance(a), 0);
        assert_eq!(a.distance(b), b.distance(a));
    }

    #[test]
    fn distance_is_squared_euclidean() {
        let black = Color::new(0x00_00_00).unwrap();
        let white = Color::new(0xFF_FF_FF).unwrap();
        assert_eq!(black.distance(white), 3 * 255 * 255);

        let a = Color::from_channels(10, 20, 30).unwrap();
        let b = Color::from_channels(13, 16, 30).unwrap();
        assert_eq!(a.distance(b), 9 + 16);
    }
}
