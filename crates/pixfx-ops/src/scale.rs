//! Relative resize.
//!
//! [`ScaleFilter`] multiplies the input size by per-axis factors. Two
//! merge modes exist:
//!
//! | mode                     | merge            | undo             |
//! |--------------------------|------------------|------------------|
//! | [`ScaleMode::Multiply`]  | factors multiply | factors divide   |
//! | [`ScaleMode::Add`]       | factors add      | factors subtract |
//!
//! Only scales of the same mode merge. In both modes the most recent
//! kernel is the one used, and undo brings back the kernel it replaced.

use pixfx_core::{Parallelism, PixelBuffer, PixelSource, Rect};
use tracing::trace;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::filter::{Filter, MergeCount};
use crate::resize::{MIN_FILTER_SCALE, ResampleKernel, resample};

/// Smallest scale factor applied.
pub const MIN_SCALE: f32 = 1e-4;

/// How merged scale factors combine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ScaleMode {
    /// Factors multiply.
    #[default]
    Multiply,
    /// Factors add, so repeated small steps grow or shrink linearly.
    Add,
}

#[derive(Debug, Clone, PartialEq)]
struct Sampling {
    kernel: ResampleKernel,
    filter_scale: (f32, f32),
}

/// Scale by relative factors.
#[derive(Debug, Clone, PartialEq)]
pub struct ScaleFilter {
    factors: (f32, f32),
    mode: ScaleMode,
    sampling: Sampling,
    previous: Vec<Sampling>,
    merges: MergeCount,
}

impl ScaleFilter {
    /// Multiplicative scale by `(sx, sy)`, each at least [`MIN_SCALE`].
    /// `None` for `(1, 1)`.
    pub fn new(sx: f32, sy: f32, kernel: ResampleKernel) -> Option<Self> {
        Self::with_mode((sx.max(MIN_SCALE), sy.max(MIN_SCALE)), ScaleMode::Multiply, kernel)
    }

    /// Additive scale by `(sx, sy)`. `None` for `(1, 1)`.
    ///
    /// Factors are kept as given so that merged steps sum exactly; they are
    /// clamped to [`MIN_SCALE`] only when computing bounds.
    pub fn additive(sx: f32, sy: f32, kernel: ResampleKernel) -> Option<Self> {
        Self::with_mode((sx, sy), ScaleMode::Add, kernel)
    }

    fn with_mode(factors: (f32, f32), mode: ScaleMode, kernel: ResampleKernel) -> Option<Self> {
        (factors != (1.0, 1.0)).then(|| Self {
            factors,
            mode,
            sampling: Sampling {
                kernel,
                filter_scale: (1.0, 1.0),
            },
            previous: Vec::new(),
            merges: MergeCount::ONE,
        })
    }

    /// Sets the per-axis kernel stretch, each at least [`MIN_FILTER_SCALE`].
    pub fn with_filter_scale(mut self, x: f32, y: f32) -> Self {
        self.sampling.filter_scale = (x.max(MIN_FILTER_SCALE), y.max(MIN_FILTER_SCALE));
        self
    }

    /// Accumulated `(sx, sy)`.
    pub fn factors(&self) -> (f32, f32) {
        self.factors
    }

    /// Merge mode.
    pub fn mode(&self) -> ScaleMode {
        self.mode
    }

    /// Kernel in use.
    pub fn kernel(&self) -> &ResampleKernel {
        &self.sampling.kernel
    }

    /// Kernel stretch in use.
    pub fn filter_scale(&self) -> (f32, f32) {
        self.sampling.filter_scale
    }

    /// `true` for unit factors.
    pub fn skip(&self) -> bool {
        self.factors == (1.0, 1.0)
    }

    /// `round(w * sx) x round(h * sy)`, same origin as `src`.
    pub fn bounds(&self, src: Rect) -> Rect {
        let width = (src.width as f32 * self.factors.0.max(MIN_SCALE)).round() as u32;
        let height = (src.height as f32 * self.factors.1.max(MIN_SCALE)).round() as u32;
        src.with_size(width, height)
    }

    /// `true` when both scales use the same mode.
    pub fn can_merge(&self, other: &ScaleFilter) -> bool {
        self.mode == other.mode
    }

    /// Combines factors per the mode; `other`'s kernel takes over.
    ///
    /// Returns `self` unchanged in `Err` when the modes differ.
    pub fn merge(mut self, other: &ScaleFilter) -> Result<Self, Self> {
        if !self.can_merge(other) {
            return Err(self);
        }
        self.factors = match self.mode {
            ScaleMode::Multiply => (self.factors.0 * other.factors.0, self.factors.1 * other.factors.1),
            ScaleMode::Add => (self.factors.0 + other.factors.0, self.factors.1 + other.factors.1),
        };
        let replaced = std::mem::replace(&mut self.sampling, other.sampling.clone());
        self.previous.push(replaced);
        self.merges = self.merges.inc();
        Ok(self)
    }

    /// Removes `other`'s factors and restores the replaced kernel.
    ///
    /// Returns `self` unchanged in `Err` when the modes differ.
    pub fn undo(mut self, other: &ScaleFilter) -> Result<Option<Self>, Self> {
        if !self.can_merge(other) {
            return Err(self);
        }
        self.factors = match self.mode {
            ScaleMode::Multiply => (self.factors.0 / other.factors.0, self.factors.1 / other.factors.1),
            ScaleMode::Add => (self.factors.0 - other.factors.0, self.factors.1 - other.factors.1),
        };
        if let Some(prev) = self.previous.pop() {
            self.sampling = prev;
        }
        self.merges = self.merges.dec();
        Ok((!self.merges.is_exhausted() && !self.skip()).then_some(self))
    }

    /// Resamples `src` to the size of `dst`.
    pub fn apply(&self, dst: &mut PixelBuffer, src: &dyn PixelSource, par: Parallelism) {
        trace!(sx = self.factors.0, sy = self.factors.1, mode = ?self.mode, "ScaleFilter::apply");
        resample(dst, src, &self.sampling.kernel, self.sampling.filter_scale, par);
    }
}

/// Multiplicative scale by `(sx, sy)` with `kernel`; `None` for `(1, 1)`.
pub fn scale(sx: f32, sy: f32, kernel: ResampleKernel) -> Option<Filter> {
    ScaleFilter::new(sx, sy, kernel).map(Filter::Scale)
}

/// Additive scale by `(sx, sy)` with `kernel`; `None` for `(1, 1)`.
pub fn scale_additive(sx: f32, sy: f32, kernel: ResampleKernel) -> Option<Filter> {
    ScaleFilter::additive(sx, sy, kernel).map(Filter::Scale)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use pixfx_core::{Pixel, PixelLayout};

    #[test]
    fn test_neutral_is_none() {
        assert!(ScaleFilter::new(1.0, 1.0, ResampleKernel::Box).is_none());
        assert!(ScaleFilter::new(1.0, 2.0, ResampleKernel::Box).is_some());
        let tiny = ScaleFilter::new(-3.0, 0.0, ResampleKernel::Box).unwrap();
        assert_eq!(tiny.factors(), (MIN_SCALE, MIN_SCALE));
    }

    #[test]
    fn test_bounds() {
        let s = ScaleFilter::new(0.5, 1.5, ResampleKernel::Bilinear).unwrap();
        assert_eq!(s.bounds(Rect::new(4, 4, 101, 10)), Rect::new(4, 4, 51, 15));
    }

    #[test]
    fn test_merge_undo() {
        let a = ScaleFilter::new(2.0, 2.0, ResampleKernel::Box).unwrap();
        let b = ScaleFilter::new(0.25, 0.5, ResampleKernel::Lanczos3).unwrap().with_filter_scale(2.0, 2.0);
        let m = a.clone().merge(&b).unwrap();
        assert_eq!(m.factors(), (0.5, 1.0));
        assert_eq!(m.kernel(), &ResampleKernel::Lanczos3);
        assert_eq!(m.filter_scale(), (2.0, 2.0));

        let back = m.undo(&b).unwrap().unwrap();
        assert_eq!(back.factors(), (2.0, 2.0));
        assert_eq!(back.kernel(), &ResampleKernel::Box);
        assert_eq!(back.filter_scale(), (1.0, 1.0));
        assert!(back.undo(&a).unwrap().is_none());
    }

    #[test]
    fn test_inverse_factors_skip() {
        let a = ScaleFilter::new(2.0, 0.5, ResampleKernel::Box).unwrap();
        let b = ScaleFilter::new(0.5, 2.0, ResampleKernel::Box).unwrap();
        assert!(a.merge(&b).unwrap().skip());
    }

    #[test]
    fn test_additive_merge_undo() {
        let a = ScaleFilter::additive(1.5, 1.5, ResampleKernel::Box).unwrap();
        let b = ScaleFilter::additive(0.25, -0.5, ResampleKernel::Bilinear).unwrap();
        assert_eq!(a.mode(), ScaleMode::Add);
        let m = a.clone().merge(&b).unwrap();
        assert_eq!(m.factors(), (1.75, 1.0));
        assert_eq!(m.kernel(), &ResampleKernel::Bilinear);
        assert_eq!(m.bounds(Rect::from_size(100, 10)), Rect::from_size(175, 10));

        let back = m.undo(&b).unwrap().unwrap();
        assert_eq!(back.factors(), (1.5, 1.5));
        assert_eq!(back.kernel(), &ResampleKernel::Box);
        assert!(back.undo(&a).unwrap().is_none());
        assert!(ScaleFilter::additive(1.0, 1.0, ResampleKernel::Box).is_none());
    }

    #[test]
    fn test_additive_clamps_at_bounds() {
        let a = ScaleFilter::additive(0.5, 2.0, ResampleKernel::Box).unwrap();
        let b = ScaleFilter::additive(-1.0, 0.0, ResampleKernel::Box).unwrap();
        let m = a.merge(&b).unwrap();
        assert_eq!(m.factors(), (-0.5, 2.0));
        assert_eq!(m.bounds(Rect::from_size(20000, 5)), Rect::from_size(2, 10));
    }

    #[test]
    fn test_modes_do_not_mix() {
        let mul = ScaleFilter::new(2.0, 2.0, ResampleKernel::Box).unwrap();
        let add = ScaleFilter::additive(0.5, 0.5, ResampleKernel::Box).unwrap();
        assert!(!mul.can_merge(&add));
        let mul = mul.merge(&add).unwrap_err();
        assert_eq!(mul.factors(), (2.0, 2.0));
        assert!(add.undo(&mul).is_err());

        let f = scale(2.0, 2.0, ResampleKernel::Box).unwrap();
        assert!(!f.can_merge(&scale_additive(0.5, 0.5, ResampleKernel::Box).unwrap()));
        assert!(f.can_merge(&scale(0.5, 1.0, ResampleKernel::Box).unwrap()));
    }

    #[test]
    fn test_apply_doubles() {
        let src = PixelBuffer::filled(PixelLayout::RgbaF32, Rect::from_size(3, 3), Pixel::gray(0.3));
        let s = ScaleFilter::new(2.0, 2.0, ResampleKernel::Mitchell).unwrap();
        let mut dst = PixelBuffer::new(PixelLayout::RgbaF32, s.bounds(src.bounds()));
        s.apply(&mut dst, &src, Parallelism::Auto);
        assert_eq!(dst.bounds().size(), (6, 6));
        assert_abs_diff_eq!(dst.pixel(5, 5).r, 0.3, epsilon = 1e-5);
    }
}
