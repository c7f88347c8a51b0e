//! Point sampling at fractional coordinates.
//!
//! Coordinates are absolute and continuous, with pixel `(i, j)` centered at
//! `(i, j)`. Neighbors outside the source read as transparent, so edges
//! fade out instead of smearing.
//!
//! Filtering happens on alpha-weighted color; a transparent neighbor
//! contributes coverage but no color.

use pixfx_core::{Pixel, PixelSource};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Sampling method for arbitrary-angle rotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Interpolation {
    /// Closest pixel.
    Nearest,
    /// 2x2 neighborhood, linear weights.
    #[default]
    Bilinear,
    /// 4x4 neighborhood, Keys cubic with `a = -0.75`.
    Bicubic,
}

/// Keys cubic convolution kernel.
#[inline]
pub(crate) fn keys_cubic(x: f32, a: f32) -> f32 {
    let x = x.abs();
    if x <= 1.0 {
        ((a + 2.0) * x - (a + 3.0)) * x * x + 1.0
    } else if x < 2.0 {
        ((a * x - 5.0 * a) * x + 8.0 * a) * x - 4.0 * a
    } else {
        0.0
    }
}

/// Samples `src` at `(x, y)`.
pub fn sample(src: &dyn PixelSource, x: f32, y: f32, interp: Interpolation) -> Pixel {
    match interp {
        Interpolation::Nearest => src.pixel(x.round() as i32, y.round() as i32),
        Interpolation::Bilinear => {
            let (x0, y0) = (x.floor(), y.floor());
            let (fx, fy) = (x - x0, y - y0);
            let (xi, yi) = (x0 as i32, y0 as i32);
            let wx = [1.0 - fx, fx];
            let wy = [1.0 - fy, fy];
            blend((0..2).flat_map(|j| {
                (0..2).map(move |i| (src.pixel(xi + i, yi + j), wx[i as usize] * wy[j as usize]))
            }))
        }
        Interpolation::Bicubic => {
            let (x1, y1) = (x.floor(), y.floor());
            let (xi, yi) = (x1 as i32, y1 as i32);
            let mut wx = [0.0; 4];
            let mut wy = [0.0; 4];
            for k in 0..4 {
                let d = k as f32 - 1.0;
                wx[k] = keys_cubic(x - x1 - d, -0.75);
                wy[k] = keys_cubic(y - y1 - d, -0.75);
            }
            blend((0..4).flat_map(|j| {
                (0..4).map(move |i| (src.pixel(xi + i - 1, yi + j - 1), wx[i as usize] * wy[j as usize]))
            }))
        }
    }
}

/// Alpha-weighted sum of `(pixel, weight)` taps.
fn blend(taps: impl Iterator<Item = (Pixel, f32)>) -> Pixel {
    let mut acc = Premul::default();
    for (p, w) in taps {
        acc.add(p, w);
    }
    acc.resolve()
}

/// Accumulator for weighted sums of straight-alpha pixels.
///
/// Color is weighted by alpha so transparent taps add coverage only.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct Premul([f32; 4]);

impl Premul {
    #[inline]
    pub(crate) fn add(&mut self, p: Pixel, w: f32) {
        let wa = w * p.a;
        self.0[0] += p.r * wa;
        self.0[1] += p.g * wa;
        self.0[2] += p.b * wa;
        self.0[3] += wa;
    }

    #[inline]
    pub(crate) fn resolve(self) -> Pixel {
        let [r, g, b, a] = self.0;
        if a <= 1e-6 {
            return Pixel::TRANSPARENT;
        }
        Pixel::new(r / a, g / a, b / a, a).clamped()
    }
}
