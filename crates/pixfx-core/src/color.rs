//! RGB color model conversions.
//!
//! All functions take and return normalized components. Hue is expressed
//! as a fraction of a full turn in `[0, 1)`. For achromatic input
//! (`max == min`) hue and saturation are reported as `0`.
//!
//! # Example
//!
//! ```rust
//! use pixfx_core::color::{hsl_to_rgb, rgb_to_hsl};
//!
//! let (h, s, l) = rgb_to_hsl(1.0, 0.0, 0.0);
//! assert_eq!((h, s, l), (0.0, 1.0, 0.5));
//! let (r, g, b) = hsl_to_rgb(h, s, l);
//! assert!((r - 1.0).abs() < 1e-6 && g.abs() < 1e-6 && b.abs() < 1e-6);
//! ```

const ONE_THIRD: f32 = 1.0 / 3.0;
const TWO_THIRDS: f32 = 2.0 / 3.0;
const ONE_SIXTH: f32 = 1.0 / 6.0;

/// Rec. 601 luma weights used for grayscale conversion.
pub const LUMA_WEIGHTS: [f32; 3] = [0.299, 0.587, 0.114];

/// Rec. 601 luma of an RGB triple.
#[inline]
pub fn luma(r: f32, g: f32, b: f32) -> f32 {
    LUMA_WEIGHTS[0] * r + LUMA_WEIGHTS[1] * g + LUMA_WEIGHTS[2] * b
}

/// Hue of a chromatic triple, as a fraction of a turn.
#[inline]
fn hue(r: f32, g: f32, b: f32, max: f32, d: f32) -> f32 {
    let h = if max == r {
        let h = (g - b) / d;
        if g < b { h + 6.0 } else { h }
    } else if max == g {
        (b - r) / d + 2.0
    } else {
        (r - g) / d + 4.0
    };
    h * ONE_SIXTH
}

/// Converts RGB to hue, saturation, lightness.
pub fn rgb_to_hsl(r: f32, g: f32, b: f32) -> (f32, f32, f32) {
    let min = r.min(g).min(b);
    let max = r.max(g).max(b);
    let l = (min + max) * 0.5;
    if min == max {
        return (0.0, 0.0, l);
    }

    let d = max - min;
    let s = if l <= 0.0 || l >= 1.0 {
        0.0
    } else if l <= 0.5 {
        d / (2.0 * l)
    } else {
        d / (2.0 - 2.0 * l)
    };
    (hue(r, g, b, max, d), s, l)
}

/// Converts hue, saturation, lightness to RGB.
pub fn hsl_to_rgb(h: f32, s: f32, l: f32) -> (f32, f32, f32) {
    let q = if l < 0.5 { l * (1.0 + s) } else { l + s - l * s };
    let p = 2.0 * l - q;

    let channel = |t: f32| {
        let t = if t < 0.0 {
            t + 1.0
        } else if t > 1.0 {
            t - 1.0
        } else {
            t
        };
        if t < ONE_SIXTH {
            p + (q - p) * 6.0 * t
        } else if t < 0.5 {
            q
        } else if t < TWO_THIRDS {
            p + (q - p) * (TWO_THIRDS - t) * 6.0
        } else {
            p
        }
    };

    (channel(h + ONE_THIRD), channel(h), channel(h - ONE_THIRD))
}

/// Converts RGB to hue, saturation, value.
pub fn rgb_to_hsv(r: f32, g: f32, b: f32) -> (f32, f32, f32) {
    let min = r.min(g).min(b);
    let max = r.max(g).max(b);
    let s = if max <= 0.0 { 0.0 } else { (max - min) / max };
    if min == max {
        return (0.0, s, max);
    }
    (hue(r, g, b, max, max - min), s, max)
}

/// Converts hue, saturation, value to RGB.
///
/// Hue outside `[0, 1)` wraps around.
pub fn hsv_to_rgb(h: f32, s: f32, v: f32) -> (f32, f32, f32) {
    let h6 = h.rem_euclid(1.0) * 6.0;
    let sector = h6.floor();
    let f = h6 - sector;

    let p = v * (1.0 - s);
    let q = v * (1.0 - s * f);
    let t = v * (1.0 - s * (1.0 - f));

    match sector as i32 % 6 {
        0 => (v, t, p),
        1 => (q, v, p),
        2 => (p, v, t),
        3 => (p, q, v),
        4 => (t, p, v),
        _ => (v, p, q),
    }
}
