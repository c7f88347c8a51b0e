//! Per-channel filters.
//!
//! A channel filter is a curve `f: [0, 1] -> [0, 1]` applied identically to
//! red, green and blue. Alpha passes through untouched.
//!
//! # Curves
//!
//! | kind                 | curve                                        | LUT |
//! |----------------------|----------------------------------------------|-----|
//! | brightness `p`       | `x(1+b)` for `b < 0`, else `x + (1-x)b`      | no  |
//! | contrast `p`         | `tan((k+1)pi/4)(x - 0.5) + 0.5`              | no  |
//! | gamma `g`            | `x^(1/g)`                                    | yes |
//! | invert               | `1 - x`                                      | yes |
//! | brightness+contrast  | `(1+c)(x - 0.5) + 0.5 + b`                   | no  |
//! | custom               | user function                                | opt |
//!
//! Percentages are normalized by 100. Every curve clamps its result.
//!
//! # Merging
//!
//! Filters of the same kind merge by adding their parameters; invert
//! toggles. Parameters accumulate unclamped so undo restores them exactly;
//! clamping happens when the curve is evaluated.
//!
//! # Example
//!
//! ```rust
//! use pixfx_ops::channel::ChannelFilter;
//!
//! let f = ChannelFilter::brightness(100.0).unwrap();
//! assert_eq!(f.eval(0.3), 1.0);
//! assert!(ChannelFilter::brightness(0.0).is_none());
//! ```

use std::f64::consts::FRAC_PI_4;
use std::fmt;
use std::sync::Arc;

use pixfx_core::{Parallelism, PixelBuffer, PixelSource};
use tracing::trace;

use crate::filter::{Filter, MergeCount, apply_pointwise};
use crate::lut::{Lut, LutCache, worth_building};

/// Smallest gamma the curve evaluates with.
pub const MIN_GAMMA: f32 = 1e-5;

/// User channel function with its LUT preference.
#[derive(Clone)]
pub struct ChannelFn {
    f: Arc<dyn Fn(f32) -> f32 + Send + Sync>,
    use_lut: bool,
}

impl ChannelFn {
    /// Wraps `f`. With `use_lut` the function may be replaced by a table
    /// on large images, so it should be smooth enough for nearest lookup.
    pub fn new(f: impl Fn(f32) -> f32 + Send + Sync + 'static, use_lut: bool) -> Self {
        Self {
            f: Arc::new(f),
            use_lut,
        }
    }

    #[inline]
    fn call(&self, x: f32) -> f32 {
        (self.f)(x)
    }
}

impl fmt::Debug for ChannelFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChannelFn").field("use_lut", &self.use_lut).finish_non_exhaustive()
    }
}

impl PartialEq for ChannelFn {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.f, &other.f) && self.use_lut == other.use_lut
    }
}

/// Channel filter parameters.
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelKind {
    /// Brightness change in percent, `[-100, 100]`.
    Brightness(f32),
    /// Contrast change in percent, `[-100, 100]`.
    Contrast(f32),
    /// Gamma exponent, positive.
    Gamma(f32),
    /// Inversion state.
    Invert(bool),
    /// Linear brightness and contrast in percent, both `[-100, 100]`.
    BrightnessContrast {
        /// Brightness offset.
        brightness: f32,
        /// Contrast gain.
        contrast: f32,
    },
    /// User function.
    Custom(ChannelFn),
}

impl ChannelKind {
    fn name(&self) -> &'static str {
        match self {
            Self::Brightness(_) => "brightness",
            Self::Contrast(_) => "contrast",
            Self::Gamma(_) => "gamma",
            Self::Invert(_) => "invert",
            Self::BrightnessContrast { .. } => "brightness_contrast",
            Self::Custom(_) => "custom",
        }
    }
}

/// A per-channel curve with a lazily built lookup table.
#[derive(Debug, Clone)]
pub struct ChannelFilter {
    kind: ChannelKind,
    merges: MergeCount,
    lut: LutCache,
}

impl ChannelFilter {
    fn with_kind(kind: ChannelKind) -> Self {
        Self {
            kind,
            merges: MergeCount::ONE,
            lut: LutCache::new(),
        }
    }

    /// Brightness change in percent, clamped to `[-100, 100]`.
    /// `None` for 0.
    pub fn brightness(pct: f32) -> Option<Self> {
        let pct = pct.clamp(-100.0, 100.0);
        (pct != 0.0).then(|| Self::with_kind(ChannelKind::Brightness(pct)))
    }

    /// Contrast change in percent, clamped to `[-100, 100]`.
    /// `None` for 0.
    pub fn contrast(pct: f32) -> Option<Self> {
        let pct = pct.clamp(-100.0, 100.0);
        (pct != 0.0).then(|| Self::with_kind(ChannelKind::Contrast(pct)))
    }

    /// Gamma correction `x^(1/gamma)`. `None` for 1.
    pub fn gamma(gamma: f32) -> Option<Self> {
        let gamma = gamma.max(MIN_GAMMA);
        (gamma != 1.0).then(|| Self::with_kind(ChannelKind::Gamma(gamma)))
    }

    /// Negative image.
    pub fn invert() -> Self {
        Self::with_kind(ChannelKind::Invert(true))
    }

    /// Linear brightness/contrast, both in percent and clamped to
    /// `[-100, 100]`. `None` when both are 0.
    pub fn brightness_contrast(brightness: f32, contrast: f32) -> Option<Self> {
        let brightness = brightness.clamp(-100.0, 100.0);
        let contrast = contrast.clamp(-100.0, 100.0);
        (brightness != 0.0 || contrast != 0.0).then(|| {
            Self::with_kind(ChannelKind::BrightnessContrast {
                brightness,
                contrast,
            })
        })
    }

    /// User channel function.
    pub fn custom(f: ChannelFn) -> Self {
        Self::with_kind(ChannelKind::Custom(f))
    }

    /// Current parameters.
    pub fn kind(&self) -> &ChannelKind {
        &self.kind
    }

    /// Whether large images go through a lookup table.
    pub fn use_lut(&self) -> bool {
        match &self.kind {
            ChannelKind::Gamma(_) | ChannelKind::Invert(_) => true,
            ChannelKind::Custom(f) => f.use_lut,
            _ => false,
        }
    }

    /// Evaluates the curve at `x`.
    pub fn eval(&self, x: f32) -> f32 {
        Curve::new(&self.kind).eval(x)
    }

    /// `true` when the curve is the identity.
    pub fn skip(&self) -> bool {
        match &self.kind {
            ChannelKind::Brightness(p) | ChannelKind::Contrast(p) => *p == 0.0,
            ChannelKind::Gamma(g) => *g == 1.0,
            ChannelKind::Invert(on) => !on,
            ChannelKind::BrightnessContrast {
                brightness,
                contrast,
            } => *brightness == 0.0 && *contrast == 0.0,
            ChannelKind::Custom(_) => false,
        }
    }

    /// Same kind and not a custom function.
    pub fn can_merge(&self, other: &ChannelFilter) -> bool {
        matches!(
            (&self.kind, &other.kind),
            (ChannelKind::Brightness(_), ChannelKind::Brightness(_))
                | (ChannelKind::Contrast(_), ChannelKind::Contrast(_))
                | (ChannelKind::Gamma(_), ChannelKind::Gamma(_))
                | (ChannelKind::Invert(_), ChannelKind::Invert(_))
                | (ChannelKind::BrightnessContrast { .. }, ChannelKind::BrightnessContrast { .. })
        )
    }

    /// Adds `other`'s parameters.
    pub fn merge(mut self, other: &ChannelFilter) -> Result<Self, Self> {
        if !self.can_merge(other) {
            return Err(self);
        }
        self.combine(other, 1.0);
        self.merges = self.merges.inc();
        Ok(self)
    }

    /// Subtracts `other`'s parameters. `Ok(None)` once nothing is left.
    pub fn undo(mut self, other: &ChannelFilter) -> Result<Option<Self>, Self> {
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

    fn combine(&mut self, other: &ChannelFilter, sign: f32) {
        match (&mut self.kind, &other.kind) {
            (ChannelKind::Brightness(a), ChannelKind::Brightness(b))
            | (ChannelKind::Contrast(a), ChannelKind::Contrast(b))
            | (ChannelKind::Gamma(a), ChannelKind::Gamma(b)) => *a += sign * b,
            (ChannelKind::Invert(a), ChannelKind::Invert(b)) => *a ^= *b,
            (
                ChannelKind::BrightnessContrast {
                    brightness,
                    contrast,
                },
                ChannelKind::BrightnessContrast {
                    brightness: b,
                    contrast: c,
                },
            ) => {
                *brightness += sign * b;
                *contrast += sign * c;
            }
            _ => {}
        }
        self.lut.clear();
    }

    /// Applies the curve to every color channel of `src`.
    pub fn apply(&self, dst: &mut PixelBuffer, src: &dyn PixelSource, par: Parallelism) {
        let (width, height) = dst.bounds().size();
        let map = self.mapper(src);
        trace!(kind = self.kind.name(), width, height, lut = map.is_lut(), "ChannelFilter::apply");
        apply_pointwise(dst, src, par, |p| p.map_rgb(|c| map.eval(c)));
    }

    /// Picks table lookup or direct evaluation for `src`.
    pub(crate) fn mapper(&self, src: &dyn PixelSource) -> ChannelMap<'_> {
        let curve = Curve::new(&self.kind);
        let depth = src.depth();
        if self.use_lut() && worth_building(src.bounds(), depth) {
            ChannelMap::Lut(self.lut.get_or_build(depth, |x| curve.eval(x)))
        } else {
            ChannelMap::Curve(curve)
        }
    }
}

/// Channel function ready to run over one source.
pub(crate) enum ChannelMap<'a> {
    Lut(&'a Lut),
    Curve(Curve),
}

impl ChannelMap<'_> {
    #[inline]
    pub(crate) fn eval(&self, x: f32) -> f32 {
        match self {
            Self::Lut(lut) => lut.lookup(x),
            Self::Curve(curve) => curve.eval(x),
        }
    }

    fn is_lut(&self) -> bool {
        matches!(self, Self::Lut(_))
    }
}

/// A channel curve with its constants resolved.
#[derive(Clone)]
pub(crate) enum Curve {
    Brightness(f32),
    Contrast(f64),
    Gamma(f32),
    Invert(bool),
    Linear { gain: f32, offset: f32 },
    Custom(ChannelFn),
}

impl Curve {
    fn new(kind: &ChannelKind) -> Self {
        match kind {
            ChannelKind::Brightness(p) => Self::Brightness(p.clamp(-100.0, 100.0) / 100.0),
            ChannelKind::Contrast(p) => {
                let k = f64::from(p.clamp(-100.0, 100.0)) / 100.0;
                Self::Contrast(((k + 1.0) * FRAC_PI_4).tan())
            }
            ChannelKind::Gamma(g) => Self::Gamma(1.0 / g.max(MIN_GAMMA)),
            ChannelKind::Invert(on) => Self::Invert(*on),
            ChannelKind::BrightnessContrast {
                brightness,
                contrast,
            } => Self::Linear {
                gain: 1.0 + contrast.clamp(-100.0, 100.0) / 100.0,
                offset: brightness.clamp(-100.0, 100.0) / 100.0,
            },
            ChannelKind::Custom(f) => Self::Custom(f.clone()),
        }
    }

    #[inline]
    fn eval(&self, x: f32) -> f32 {
        let y = match self {
            Self::Brightness(b) if *b < 0.0 => x * (1.0 + b),
            Self::Brightness(b) => x + (1.0 - x) * b,
            Self::Contrast(slope) => ((f64::from(x) - 0.5) * slope + 0.5) as f32,
            Self::Gamma(inv) => x.max(0.0).powf(*inv),
            Self::Invert(true) => 1.0 - x,
            Self::Invert(false) => x,
            Self::Linear { gain, offset } => gain * (x - 0.5) + 0.5 + offset,
            Self::Custom(f) => f.call(x),
        };
        y.clamp(0.0, 1.0)
    }
}

/// Brightness change in percent, see [`ChannelFilter::brightness`].
pub fn brightness(pct: f32) -> Option<Filter> {
    ChannelFilter::brightness(pct).map(Filter::Channel)
}

/// Contrast change in percent, see [`ChannelFilter::contrast`].
pub fn contrast(pct: f32) -> Option<Filter> {
    ChannelFilter::contrast(pct).map(Filter::Channel)
}

/// Gamma correction, see [`ChannelFilter::gamma`].
pub fn gamma(gamma: f32) -> Option<Filter> {
    ChannelFilter::gamma(gamma).map(Filter::Channel)
}

/// Negative image.
pub fn invert() -> Filter {
    Filter::Channel(ChannelFilter::invert())
}

/// Linear brightness/contrast, see [`ChannelFilter::brightness_contrast`].
pub fn brightness_contrast(brightness: f32, contrast: f32) -> Option<Filter> {
    ChannelFilter::brightness_contrast(brightness, contrast).map(Filter::Channel)
}

/// User channel function applied to red, green and blue.
pub fn channel_fn(f: impl Fn(f32) -> f32 + Send + Sync + 'static, use_lut: bool) -> Filter {
    Filter::Channel(ChannelFilter::custom(ChannelFn::new(f, use_lut)))
}
