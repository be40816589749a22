//! RGBA color type shared by backends, shapes and the glyph cache

use serde::{Deserialize, Serialize};

/// 8-bit per channel RGBA color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Color {
    /// Red channel
    pub r: u8,
    /// Green channel
    pub g: u8,
    /// Blue channel
    pub b: u8,
    /// Alpha channel (255 = opaque)
    pub a: u8,
}

impl Color {
    /// Opaque white
    pub const WHITE: Self = Self::rgb(255, 255, 255);
    /// Opaque black
    pub const BLACK: Self = Self::rgb(0, 0, 0);
    /// Opaque red
    pub const RED: Self = Self::rgb(255, 0, 0);
    /// Opaque green
    pub const GREEN: Self = Self::rgb(0, 255, 0);
    /// Opaque blue
    pub const BLUE: Self = Self::rgb(0, 0, 255);
    /// Fully transparent black
    pub const TRANSPARENT: Self = Self::rgba(0, 0, 0, 0);

    /// Create an opaque color
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// Create a color with alpha
    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Pack into a `u32` as `0xRRGGBBAA`
    pub const fn to_u32(self) -> u32 {
        u32::from_be_bytes([self.r, self.g, self.b, self.a])
    }

    /// Unpack from `0xRRGGBBAA`
    pub const fn from_u32(packed: u32) -> Self {
        let [r, g, b, a] = packed.to_be_bytes();
        Self { r, g, b, a }
    }

    /// Same color with its alpha scaled by a coverage value (0-255)
    pub fn with_coverage(self, coverage: u8) -> Self {
        let a = (u16::from(self.a) * u16::from(coverage) + 127) / 255;
        Self { a: a as u8, ..self }
    }

    /// Source-over blend of `self` on top of `dst`
    pub fn blend_over(self, dst: Self) -> Self {
        match self.a {
            255 => self,
            0 => dst,
            alpha => {
                let sa = u16::from(alpha);
                let inv = 255 - sa;
                let mix = |s: u8, d: u8| ((u16::from(s) * sa + u16::from(d) * inv + 127) / 255) as u8;
                let out_a = sa + (u16::from(dst.a) * inv + 127) / 255;
                Self {
                    r: mix(self.r, dst.r),
                    g: mix(self.g, dst.g),
                    b: mix(self.b, dst.b),
                    a: out_a.min(255) as u8,
                }
            }
        }
    }
}
