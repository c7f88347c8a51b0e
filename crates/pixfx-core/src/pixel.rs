//! Normalized float pixel.
//!
//! Every filter operates on [`Pixel`] values: straight (unpremultiplied)
//! RGBA with each channel nominally in `[0, 1]`. Intermediate math may
//! leave that range; [`Pixel::clamped`] brings it back before packing.
//!
//! # Example
//!
//! ```rust
//! use pixfx_core::Pixel;
//!
//! let p = Pixel::new(1.2, 0.5, -0.1, 1.0).clamped();
//! assert_eq!(p, Pixel::new(1.0, 0.5, 0.0, 1.0));
//! ```

use std::ops::{Add, AddAssign, Mul};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Straight-alpha RGBA pixel with `f32` channels.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Pixel {
    /// Red
    pub r: f32,
    /// Green
    pub g: f32,
    /// Blue
    pub b: f32,
    /// Alpha
    pub a: f32,
}

impl Pixel {
    /// Fully transparent black; the value of every out-of-bounds read.
    pub const TRANSPARENT: Self = Self::new(0.0, 0.0, 0.0, 0.0);
    /// Opaque black.
    pub const BLACK: Self = Self::new(0.0, 0.0, 0.0, 1.0);
    /// Opaque white.
    pub const WHITE: Self = Self::new(1.0, 1.0, 1.0, 1.0);

    /// Creates a pixel from its four channels.
    #[inline]
    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Opaque gray with all color channels set to `v`.
    #[inline]
    pub const fn gray(v: f32) -> Self {
        Self::new(v, v, v, 1.0)
    }

    /// Clamps every channel to `[0, 1]`.
    #[inline]
    pub fn clamped(self) -> Self {
        Self::new(
            self.r.clamp(0.0, 1.0),
            self.g.clamp(0.0, 1.0),
            self.b.clamp(0.0, 1.0),
            self.a.clamp(0.0, 1.0),
        )
    }

    /// Applies `f` to the color channels, leaving alpha untouched.
    #[inline]
    pub fn map_rgb(self, f: impl Fn(f32) -> f32) -> Self {
        Self::new(f(self.r), f(self.g), f(self.b), self.a)
    }

    /// Channels as `[r, g, b, a]`.
    #[inline]
    pub const fn to_array(self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }

    /// Builds a pixel from `[r, g, b, a]`.
    #[inline]
    pub const fn from_array(c: [f32; 4]) -> Self {
        Self::new(c[0], c[1], c[2], c[3])
    }

    /// Largest absolute channel difference to `other`.
    #[inline]
    pub fn max_diff(self, other: Self) -> f32 {
        (self.r - other.r)
            .abs()
            .max((self.g - other.g).abs())
            .max((self.b - other.b).abs())
            .max((self.a - other.a).abs())
    }
}

impl Add for Pixel {
    type Output = Self;

    #[inline]
    fn add(self, o: Self) -> Self {
        Self::new(self.r + o.r, self.g + o.g, self.b + o.b, self.a + o.a)
    }
}

impl AddAssign for Pixel {
    #[inline]
    fn add_assign(&mut self, o: Self) {
        *self = *self + o;
    }
}

impl Mul<f32> for Pixel {
    type Output = Self;

    #[inline]
    fn mul(self, k: f32) -> Self {
        Self::new(self.r * k, self.g * k, self.b * k, self.a * k)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamped() {
        let p = Pixel::new(-0.5, 0.25, 2.0, 1.5).clamped();
        assert_eq!(p, Pixel::new(0.0, 0.25, 1.0, 1.0));
    }

    #[test]
    fn test_map_rgb_keeps_alpha() {
        let p = Pixel::new(0.2, 0.4, 0.6, 0.5).map_rgb(|x| 1.0 - x);
        assert!((p.r - 0.8).abs() < 1e-6);
        assert!((p.b - 0.4).abs() < 1e-6);
        assert_eq!(p.a, 0.5);
    }

    #[test]
    fn test_weighted_sum() {
        let mut acc = Pixel::TRANSPARENT;
        acc += Pixel::WHITE * 0.25;
        acc += Pixel::BLACK * 0.75;
        assert!((acc.r - 0.25).abs() < 1e-6);
        assert!((acc.a - 1.0).abs() < 1e-6);
    }
}
