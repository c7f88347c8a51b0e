//! Whole-pixel color filters.
//!
//! Unlike [channel filters](crate::channel), these see all three color
//! channels at once: grayscale, sepia, HSL/HSV adjustments, color balance,
//! colorize and user pixel functions. Alpha is never changed.
//!
//! Hue is given in degrees, everything else in percent. Hue shifts wrap
//! around the color wheel; saturation, lightness and value saturate at
//! their limits.
//!
//! # Example
//!
//! ```rust
//! use pixfx_core::Pixel;
//! use pixfx_ops::color::ColorFilter;
//!
//! let gray = ColorFilter::grayscale();
//! let p = gray.eval(Pixel::new(1.0, 0.0, 0.0, 1.0));
//! assert!((p.r - 0.299).abs() < 1e-6);
//! ```

use std::fmt;
use std::sync::Arc;

use pixfx_core::color::{hsl_to_rgb, hsv_to_rgb, luma, rgb_to_hsl, rgb_to_hsv};
use pixfx_core::{Parallelism, Pixel, PixelBuffer, PixelSource};
use tracing::trace;

use crate::filter::{Filter, MergeCount, apply_pointwise};

/// User pixel function.
#[derive(Clone)]
pub struct PixelFn(Arc<dyn Fn(Pixel) -> Pixel + Send + Sync>);

impl PixelFn {
    /// Wraps `f`.
    pub fn new(f: impl Fn(Pixel) -> Pixel + Send + Sync + 'static) -> Self {
        Self(Arc::new(f))
    }
}

impl fmt::Debug for PixelFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PixelFn(..)")
    }
}

impl PartialEq for PixelFn {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

/// Color filter parameters.
#[derive(Debug, Clone, PartialEq)]
pub enum ColorKind {
    /// Rec.601 luma.
    Grayscale,
    /// Sepia tone strength in percent, `[0, 100]`.
    Sepia(f32),
    /// HSL shift.
    Hsl {
        /// Degrees, `[-360, 360]`.
        hue: f32,
        /// Percent, `[-100, 100]`.
        saturation: f32,
        /// Percent, `[-100, 100]`.
        lightness: f32,
    },
    /// HSV (HSB) shift.
    Hsv {
        /// Degrees, `[-360, 360]`.
        hue: f32,
        /// Percent, `[-100, 100]`.
        saturation: f32,
        /// Percent, `[-100, 100]`.
        value: f32,
    },
    /// Per-channel gain in percent, each `[-100, 500]`.
    ColorBalance {
        /// Red change.
        red: f32,
        /// Green change.
        green: f32,
        /// Blue change.
        blue: f32,
    },
    /// Replace hue and saturation, blended by `percentage`.
    Colorize {
        /// Degrees, wrapped into `[0, 360)`.
        hue: f32,
        /// Percent, `[0, 100]`.
        saturation: f32,
        /// Percent, `[0, 100]`.
        percentage: f32,
    },
    /// User function.
    Custom(PixelFn),
}

impl ColorKind {
    fn name(&self) -> &'static str {
        match self {
            Self::Grayscale => "grayscale",
            Self::Sepia(_) => "sepia",
            Self::Hsl { .. } => "hsl",
            Self::Hsv { .. } => "hsv",
            Self::ColorBalance { .. } => "color_balance",
            Self::Colorize { .. } => "colorize",
            Self::Custom(_) => "custom",
        }
    }
}

/// A pixel-to-pixel color operation.
#[derive(Debug, Clone)]
pub struct ColorFilter {
    kind: ColorKind,
    merges: MergeCount,
}

impl ColorFilter {
    fn with_kind(kind: ColorKind) -> Self {
        Self {
            kind,
            merges: MergeCount::ONE,
        }
    }

    /// Grayscale conversion. Never skips.
    pub fn grayscale() -> Self {
        Self::with_kind(ColorKind::Grayscale)
    }

    /// Sepia tone, `pct` clamped to `[0, 100]`. `None` for 0.
    pub fn sepia(pct: f32) -> Option<Self> {
        let pct = pct.clamp(0.0, 100.0);
        (pct != 0.0).then(|| Self::with_kind(ColorKind::Sepia(pct)))
    }

    /// HSL shift. `None` when all three are 0.
    pub fn hsl(hue: f32, saturation: f32, lightness: f32) -> Option<Self> {
        let (hue, saturation, lightness) = clamp_shift(hue, saturation, lightness);
        (hue != 0.0 || saturation != 0.0 || lightness != 0.0).then(|| {
            Self::with_kind(ColorKind::Hsl {
                hue,
                saturation,
                lightness,
            })
        })
    }

    /// HSV shift. `None` when all three are 0.
    pub fn hsv(hue: f32, saturation: f32, value: f32) -> Option<Self> {
        let (hue, saturation, value) = clamp_shift(hue, saturation, value);
        (hue != 0.0 || saturation != 0.0 || value != 0.0).then(|| {
            Self::with_kind(ColorKind::Hsv {
                hue,
                saturation,
                value,
            })
        })
    }

    /// Per-channel gain. `None` when all three are 0.
    pub fn color_balance(red: f32, green: f32, blue: f32) -> Option<Self> {
        let red = red.clamp(-100.0, 500.0);
        let green = green.clamp(-100.0, 500.0);
        let blue = blue.clamp(-100.0, 500.0);
        (red != 0.0 || green != 0.0 || blue != 0.0)
            .then(|| Self::with_kind(ColorKind::ColorBalance { red, green, blue }))
    }

    /// Colorize. `None` for a 0 percentage.
    pub fn colorize(hue: f32, saturation: f32, percentage: f32) -> Option<Self> {
        let hue = hue.rem_euclid(360.0);
        let saturation = saturation.clamp(0.0, 100.0);
        let percentage = percentage.clamp(0.0, 100.0);
        (percentage != 0.0).then(|| {
            Self::with_kind(ColorKind::Colorize {
                hue,
                saturation,
                percentage,
            })
        })
    }

    /// User pixel function.
    pub fn custom(f: PixelFn) -> Self {
        Self::with_kind(ColorKind::Custom(f))
    }

    /// Current parameters.
    pub fn kind(&self) -> &ColorKind {
        &self.kind
    }

    /// Computes the filtered pixel.
    pub fn eval(&self, p: Pixel) -> Pixel {
        let out = match &self.kind {
            ColorKind::Grayscale => {
                let v = luma(p.r, p.g, p.b);
                Pixel::new(v, v, v, p.a)
            }
            ColorKind::Sepia(pct) => sepia_tone(p, pct.clamp(0.0, 100.0) / 100.0),
            ColorKind::Hsl {
                hue,
                saturation,
                lightness,
            } => {
                let (dh, ds, dl) = normalize_shift(*hue, *saturation, *lightness);
                let (h, s, l) = rgb_to_hsl(p.r, p.g, p.b);
                let (r, g, b) = hsl_to_rgb(
                    (h + dh).rem_euclid(1.0),
                    (s + ds).clamp(0.0, 1.0),
                    (l + dl).clamp(0.0, 1.0),
                );
                Pixel::new(r, g, b, p.a)
            }
            ColorKind::Hsv {
                hue,
                saturation,
                value,
            } => {
                let (dh, ds, dv) = normalize_shift(*hue, *saturation, *value);
                let (h, s, v) = rgb_to_hsv(p.r, p.g, p.b);
                let (r, g, b) = hsv_to_rgb(
                    (h + dh).rem_euclid(1.0),
                    (s + ds).clamp(0.0, 1.0),
                    (v + dv).clamp(0.0, 1.0),
                );
                Pixel::new(r, g, b, p.a)
            }
            ColorKind::ColorBalance { red, green, blue } => {
                let gain = |pct: f32| 1.0 + pct.clamp(-100.0, 500.0) / 100.0;
                Pixel::new(p.r * gain(*red), p.g * gain(*green), p.b * gain(*blue), p.a)
            }
            ColorKind::Colorize {
                hue,
                saturation,
                percentage,
            } => {
                let k = percentage / 100.0;
                let (_, _, l) = rgb_to_hsl(p.r, p.g, p.b);
                let (r, g, b) = hsl_to_rgb(hue / 360.0, saturation / 100.0, l);
                Pixel::new(p.r + (r - p.r) * k, p.g + (g - p.g) * k, p.b + (b - p.b) * k, p.a)
            }
            ColorKind::Custom(f) => (f.0)(p),
        };
        out.clamped()
    }

    /// `true` when the filter leaves every pixel unchanged.
    pub fn skip(&self) -> bool {
        match &self.kind {
            ColorKind::Sepia(pct) => *pct == 0.0,
            ColorKind::Hsl {
                hue,
                saturation,
                lightness,
            } => *hue == 0.0 && *saturation == 0.0 && *lightness == 0.0,
            ColorKind::Hsv {
                hue,
                saturation,
                value,
            } => *hue == 0.0 && *saturation == 0.0 && *value == 0.0,
            ColorKind::ColorBalance { red, green, blue } => *red == 0.0 && *green == 0.0 && *blue == 0.0,
            ColorKind::Grayscale | ColorKind::Colorize { .. } | ColorKind::Custom(_) => false,
        }
    }

    /// Same kind, excluding colorize and custom functions.
    pub fn can_merge(&self, other: &ColorFilter) -> bool {
        matches!(
            (&self.kind, &other.kind),
            (ColorKind::Grayscale, ColorKind::Grayscale)
                | (ColorKind::Sepia(_), ColorKind::Sepia(_))
                | (ColorKind::Hsl { .. }, ColorKind::Hsl { .. })
                | (ColorKind::Hsv { .. }, ColorKind::Hsv { .. })
                | (ColorKind::ColorBalance { .. }, ColorKind::ColorBalance { .. })
        )
    }

    /// Adds `other`'s parameters; grayscale only counts.
    pub fn merge(mut self, other: &ColorFilter) -> Result<Self, Self> {
        if !self.can_merge(other) {
            return Err(self);
        }
        self.combine(other, 1.0);
        self.merges = self.merges.inc();
        Ok(self)
    }

    /// Subtracts `other`'s parameters. `Ok(None)` once nothing is left.
    pub fn undo(mut self, other: &ColorFilter) -> Result<Option<Self>, Self> {
        if !self.can_merge(other) {
            return Err(self);
        }
        self.combine(other, -1.0);
        self.merges = self.merges.dec();
        if self.merges.is_exhausted() || self.skip() {
            return Ok(None);
        }
        Ok(Some(self))
    }

    fn combine(&mut self, other: &ColorFilter, sign: f32) {
        match (&mut self.kind, &other.kind) {
            (ColorKind::Sepia(a), ColorKind::Sepia(b)) => *a += sign * b,
            (
                ColorKind::Hsl {
                    hue: a0,
                    saturation: a1,
                    lightness: a2,
                },
                ColorKind::Hsl {
                    hue: b0,
                    saturation: b1,
                    lightness: b2,
                },
            )
            | (
                ColorKind::Hsv {
                    hue: a0,
                    saturation: a1,
                    value: a2,
                },
                ColorKind::Hsv {
                    hue: b0,
                    saturation: b1,
                    value: b2,
                },
            )
            | (
                ColorKind::ColorBalance {
                    red: a0,
                    green: a1,
                    blue: a2,
                },
                ColorKind::ColorBalance {
                    red: b0,
                    green: b1,
                    blue: b2,
                },
            ) => {
                *a0 += sign * b0;
                *a1 += sign * b1;
                *a2 += sign * b2;
            }
            _ => {}
        }
    }

    /// Applies the filter to every pixel of `src`.
    pub fn apply(&self, dst: &mut PixelBuffer, src: &dyn PixelSource, par: Parallelism) {
        let (width, height) = dst.bounds().size();
        trace!(kind = self.kind.name(), width, height, "ColorFilter::apply");
        apply_pointwise(dst, src, par, |p| self.eval(p));
    }
}

fn clamp_shift(hue: f32, a: f32, b: f32) -> (f32, f32, f32) {
    (hue.clamp(-360.0, 360.0), a.clamp(-100.0, 100.0), b.clamp(-100.0, 100.0))
}

/// Degrees and percents to unit fractions.
fn normalize_shift(hue: f32, a: f32, b: f32) -> (f32, f32, f32) {
    let (hue, a, b) = clamp_shift(hue, a, b);
    (hue / 360.0, a / 100.0, b / 100.0)
}

fn sepia_tone(p: Pixel, k: f32) -> Pixel {
    let r = p.r * (1.0 - 0.607 * k) + p.g * 0.769 * k + p.b * 0.189 * k;
    let g = p.r * 0.349 * k + p.g * (1.0 - 0.314 * k) + p.b * 0.168 * k;
    let b = p.r * 0.272 * k + p.g * 0.534 * k + p.b * (1.0 - 0.869 * k);
    Pixel::new(r, g, b, p.a)
}

/// Grayscale conversion.
pub fn grayscale() -> Filter {
    Filter::Color(ColorFilter::grayscale())
}

/// Sepia tone, see [`ColorFilter::sepia`].
pub fn sepia(pct: f32) -> Option<Filter> {
    ColorFilter::sepia(pct).map(Filter::Color)
}

/// HSL shift, see [`ColorFilter::hsl`].
pub fn hsl(hue: f32, saturation: f32, lightness: f32) -> Option<Filter> {
    ColorFilter::hsl(hue, saturation, lightness).map(Filter::Color)
}

/// HSV shift, see [`ColorFilter::hsv`].
pub fn hsv(hue: f32, saturation: f32, value: f32) -> Option<Filter> {
    ColorFilter::hsv(hue, saturation, value).map(Filter::Color)
}

/// Per-channel gain, see [`ColorFilter::color_balance`].
pub fn color_balance(red: f32, green: f32, blue: f32) -> Option<Filter> {
    ColorFilter::color_balance(red, green, blue).map(Filter::Color)
}

/// Colorize, see [`ColorFilter::colorize`].
pub fn colorize(hue: f32, saturation: f32, percentage: f32) -> Option<Filter> {
    ColorFilter::colorize(hue, saturation, percentage).map(Filter::Color)
}

/// User pixel function.
pub fn pixel_fn(f: impl Fn(Pixel) -> Pixel + Send + Sync + 'static) -> Filter {
    Filter::Color(ColorFilter::custom(PixelFn::new(f)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    const ORANGE: Pixel = Pixel::new(0.9, 0.5, 0.2, 1.0);

    #[test]
    fn test_neutral_constructors() {
        assert!(ColorFilter::sepia(0.0).is_none());
        assert!(ColorFilter::hsl(0.0, 0.0, 0.0).is_none());
        assert!(ColorFilter::hsv(0.0, 0.0, 0.0).is_none());
        assert!(ColorFilter::color_balance(0.0, 0.0, 0.0).is_none());
        assert!(ColorFilter::colorize(120.0, 50.0, 0.0).is_none());
        assert!(!ColorFilter::grayscale().skip());
    }

    #[test]
    fn test_grayscale_gray_unchanged() {
        let g = ColorFilter::grayscale();
        let p = g.eval(Pixel::gray(0.5));
        assert_abs_diff_eq!(p.r, 0.5, epsilon = 1e-6);
        assert_abs_diff_eq!(p.b, 0.5, epsilon = 1e-6);
    }

    #[test]
    fn test_sepia_full() {
        let s = ColorFilter::sepia(100.0).unwrap();
        let p = s.eval(Pixel::new(0.2, 0.2, 0.2, 1.0));
        assert_abs_diff_eq!(p.r, 0.2 * (0.393 + 0.769 + 0.189), epsilon = 1e-5);
        assert_abs_diff_eq!(p.b, 0.2 * (0.272 + 0.534 + 0.131), epsilon = 1e-5);
    }

    #[test]
    fn test_hue_shift_wraps() {
        let full = ColorFilter::hsl(360.0, 0.0, 0.0).unwrap();
        let p = full.eval(ORANGE);
        assert!(p.max_diff(ORANGE) < 1e-4);

        let red = Pixel::new(1.0, 0.0, 0.0, 1.0);
        let p = ColorFilter::hsv(-120.0, 0.0, 0.0).unwrap().eval(red);
        assert!(p.max_diff(Pixel::new(0.0, 0.0, 1.0, 1.0)) < 1e-4);
    }

    #[test]
    fn test_hue_shifts_compose() {
        let a = ColorFilter::hsl(40.0, 0.0, 0.0).unwrap();
        let b = ColorFilter::hsl(100.0, 0.0, 0.0).unwrap();
        let seq = b.eval(a.eval(ORANGE));
        let merged = a.merge(&b).unwrap().eval(ORANGE);
        assert!(seq.max_diff(merged) < 1e-4);
    }

    #[test]
    fn test_merge_undo_restores() {
        let a = ColorFilter::hsv(10.0, 20.0, -5.0).unwrap();
        let b = ColorFilter::hsv(-30.0, 5.0, 15.0).unwrap();
        let m = a.clone().merge(&b).unwrap();
        assert_eq!(
            m.kind(),
            &ColorKind::Hsv {
                hue: -20.0,
                saturation: 25.0,
                value: 10.0
            }
        );
        let back = m.undo(&b).unwrap().unwrap();
        assert_eq!(back.kind(), a.kind());
    }

    #[test]
    fn test_grayscale_merge_counts() {
        let g = ColorFilter::grayscale();
        let m = g.clone().merge(&g).unwrap().merge(&g).unwrap();
        let m = m.undo(&g).unwrap().unwrap().undo(&g).unwrap().unwrap();
        assert!(m.undo(&g).unwrap().is_none());
    }

    #[test]
    fn test_colorize_never_merges() {
        let c = ColorFilter::colorize(200.0, 60.0, 50.0).unwrap();
        assert!(!c.can_merge(&c));
        assert!(!c.skip());
        let p = c.eval(Pixel::gray(0.5));
        // lightness is kept, so the blue-ish tint stays centered on 0.5
        assert!(p.b > p.r);
        assert!(p.r < 0.5 && p.b > 0.5);
    }

    #[test]
    fn test_color_balance() {
        let f = ColorFilter::color_balance(100.0, -50.0, 0.0).unwrap();
        let p = f.eval(Pixel::new(0.3, 0.4, 0.5, 0.7));
        assert_abs_diff_eq!(p.r, 0.6, epsilon = 1e-6);
        assert_abs_diff_eq!(p.g, 0.2, epsilon = 1e-6);
        assert_abs_diff_eq!(p.b, 0.5, epsilon = 1e-6);
        assert_eq!(p.a, 0.7);
        assert_eq!(ColorFilter::color_balance(900.0, 0.0, 0.0).unwrap().eval(Pixel::gray(0.5)).r, 1.0);
    }

    #[test]
    fn test_custom_is_clamped() {
        let f = ColorFilter::custom(PixelFn::new(|p| Pixel::new(p.r * 4.0, -1.0, p.b, p.a)));
        let p = f.eval(Pixel::gray(0.5));
        assert_eq!((p.r, p.g), (1.0, 0.0));
    }
}
