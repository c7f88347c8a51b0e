//! The filter algebra.
//!
//! Every operation in this crate is a variant of the closed [`Filter`] enum.
//! A filter knows two things: the output rectangle for a given input
//! rectangle ([`Filter::bounds`]) and how to compute the output pixels
//! ([`Filter::apply`]).
//!
//! On top of that, filters of compatible kinds fold together:
//!
//! - [`Filter::merge`] combines `self` followed by `other` into one filter
//! - [`Filter::undo`] removes a previously merged `other` again
//! - [`Filter::skip`] reports that applying the filter changes nothing
//!
//! Merge and undo consume the accumulator and hand it back, unchanged, in
//! the `Err` arm when the kinds are incompatible.
//!
//! # Compatibility
//!
//! | accumulator       | accepts                                      |
//! |-------------------|----------------------------------------------|
//! | `Channel`         | `Channel` of the same kind (not custom)      |
//! | `Color`           | `Color` of the same kind (not custom/colorize) |
//! | `Transform`       | any `Transform`                              |
//! | `Rotate`          | `Rotate`, quarter-turn `Transform`           |
//! | `CropRect`        | `CropRect`                                   |
//! | `Scale`           | `Scale` of the same mode                     |
//! | `Combine*`        | same combination with slot-wise compatible members |
//!
//! # Example
//!
//! ```rust
//! use pixfx_ops::{brightness, Filter};
//!
//! let a = brightness(20.0).unwrap();
//! let b = brightness(-20.0).unwrap();
//! let merged = a.merge(&b).unwrap();
//! assert!(merged.skip());
//! ```

use std::fmt;
use std::sync::Arc;

use pixfx_core::{Parallelism, Pixel, PixelBuffer, PixelSource, Rect, for_each_band};

use crate::channel::ChannelFilter;
use crate::color::ColorFilter;
use crate::combine::{Combine, CombineChannel, CombineColor};
use crate::crop::{CropEllipse, CropRect};
use crate::resize::ResizeFilter;
use crate::rotate::RotateFilter;
use crate::scale::ScaleFilter;
use crate::transform::TransformFilter;

/// User-defined filter plugged into a pipeline.
///
/// Custom filters never merge and never skip.
pub trait CustomFilter: fmt::Debug + Send + Sync {
    /// Output rectangle for an input rectangle.
    fn bounds(&self, src: Rect) -> Rect;

    /// Writes the result for `src` into `dst`.
    fn apply(&self, dst: &mut PixelBuffer, src: &dyn PixelSource, par: Parallelism);
}

/// One image operation.
#[derive(Debug, Clone)]
pub enum Filter {
    /// Per-channel curve (brightness, contrast, gamma, invert, ...).
    Channel(ChannelFilter),
    /// Whole-pixel color operation (grayscale, sepia, HSL, ...).
    Color(ColorFilter),
    /// Flip, transpose or quarter-turn rotation.
    Transform(TransformFilter),
    /// Arbitrary-angle rotation.
    Rotate(RotateFilter),
    /// Relative rectangular crop.
    CropRect(CropRect),
    /// Relative elliptical crop.
    CropEllipse(CropEllipse),
    /// Relative resize.
    Scale(ScaleFilter),
    /// Absolute resize.
    Resize(ResizeFilter),
    /// Several channel curves in one pass.
    CombineChannel(CombineChannel),
    /// Several color operations in one pass.
    CombineColor(CombineColor),
    /// Several arbitrary filters as one mergeable unit.
    Combine(Combine),
    /// User-defined filter.
    Custom(Arc<dyn CustomFilter>),
}

impl Filter {
    /// Output rectangle for an input rectangle.
    pub fn bounds(&self, src: Rect) -> Rect {
        match self {
            Self::Channel(_) | Self::Color(_) | Self::CombineChannel(_) | Self::CombineColor(_) => {
                src
            }
            Self::Transform(f) => f.bounds(src),
            Self::Rotate(f) => f.bounds(src),
            Self::CropRect(f) => f.bounds(src),
            Self::CropEllipse(f) => f.bounds(src),
            Self::Scale(f) => f.bounds(src),
            Self::Resize(f) => f.bounds(src),
            Self::Combine(f) => f.bounds(src),
            Self::Custom(f) => f.bounds(src),
        }
    }

    /// Computes the filter over `src` and writes the result into `dst`.
    ///
    /// `dst` should be sized by [`Filter::bounds`]; pixels are matched by
    /// their offset from each buffer's origin.
    pub fn apply(&self, dst: &mut PixelBuffer, src: &dyn PixelSource, par: Parallelism) {
        match self {
            Self::Channel(f) => f.apply(dst, src, par),
            Self::Color(f) => f.apply(dst, src, par),
            Self::Transform(f) => f.apply(dst, src, par),
            Self::Rotate(f) => f.apply(dst, src, par),
            Self::CropRect(f) => f.apply(dst, src, par),
            Self::CropEllipse(f) => f.apply(dst, src, par),
            Self::Scale(f) => f.apply(dst, src, par),
            Self::Resize(f) => f.apply(dst, src, par),
            Self::CombineChannel(f) => f.apply(dst, src, par),
            Self::CombineColor(f) => f.apply(dst, src, par),
            Self::Combine(f) => f.apply(dst, src, par),
            Self::Custom(f) => f.apply(dst, src, par),
        }
    }

    /// Returns `true` when applying the filter leaves every pixel unchanged.
    ///
    /// A skipping filter also leaves bounds unchanged.
    pub fn skip(&self) -> bool {
        match self {
            Self::Channel(f) => f.skip(),
            Self::Color(f) => f.skip(),
            Self::Transform(f) => f.skip(),
            Self::Rotate(f) => f.skip(),
            Self::CropRect(f) => f.skip(),
            Self::Scale(f) => f.skip(),
            Self::CombineChannel(f) => f.skip(),
            Self::CombineColor(f) => f.skip(),
            Self::Combine(f) => f.skip(),
            Self::CropEllipse(_) | Self::Resize(_) | Self::Custom(_) => false,
        }
    }

    /// Returns `false` for kinds that never take part in merge or undo:
    /// elliptical crops, absolute resizes and custom filters.
    pub fn is_merging(&self) -> bool {
        !matches!(self, Self::CropEllipse(_) | Self::Resize(_) | Self::Custom(_))
    }

    /// Returns `true` if [`merge`](Filter::merge) would accept `other`.
    pub fn can_merge(&self, other: &Filter) -> bool {
        match (self, other) {
            (Self::Channel(a), Self::Channel(b)) => a.can_merge(b),
            (Self::Color(a), Self::Color(b)) => a.can_merge(b),
            (Self::Transform(_), Self::Transform(_)) => true,
            (Self::Rotate(_), Self::Rotate(_)) => true,
            (Self::Rotate(_), Self::Transform(t)) => t.transformer().quarter_turns().is_some(),
            (Self::CropRect(_), Self::CropRect(_)) => true,
            (Self::Scale(a), Self::Scale(b)) => a.can_merge(b),
            (Self::CombineChannel(a), Self::CombineChannel(b)) => a.can_merge(b),
            (Self::CombineColor(a), Self::CombineColor(b)) => a.can_merge(b),
            (Self::Combine(a), Self::Combine(b)) => a.can_merge(b),
            _ => false,
        }
    }

    /// Folds `other` into `self`, producing a filter equivalent to applying
    /// `self` then `other`.
    ///
    /// Returns `self` unchanged in `Err` when the kinds are incompatible.
    pub fn merge(self, other: &Filter) -> Result<Filter, Filter> {
        match (self, other) {
            (Self::Channel(a), Self::Channel(b)) => a.merge(b).map(Self::Channel).map_err(Self::Channel),
            (Self::Color(a), Self::Color(b)) => a.merge(b).map(Self::Color).map_err(Self::Color),
            (Self::Transform(a), Self::Transform(b)) => Ok(Self::Transform(a.merge(b))),
            (Self::Rotate(a), Self::Rotate(b)) => Ok(Self::Rotate(a.merge(b))),
            (Self::Rotate(a), Self::Transform(t)) => a
                .merge_transform(t.transformer())
                .map(Self::Rotate)
                .map_err(Self::Rotate),
            (Self::CropRect(a), Self::CropRect(b)) => Ok(Self::CropRect(a.merge(b))),
            (Self::Scale(a), Self::Scale(b)) => a.merge(b).map(Self::Scale).map_err(Self::Scale),
            (Self::CombineChannel(a), Self::CombineChannel(b)) => {
                a.merge(b).map(Self::CombineChannel).map_err(Self::CombineChannel)
            }
            (Self::CombineColor(a), Self::CombineColor(b)) => {
                a.merge(b).map(Self::CombineColor).map_err(Self::CombineColor)
            }
            (Self::Combine(a), Self::Combine(b)) => a.merge(b).map(Self::Combine).map_err(Self::Combine),
            (s, _) => Err(s),
        }
    }

    /// Returns `true` if [`undo`](Filter::undo) would accept `other`.
    pub fn can_undo(&self, other: &Filter) -> bool {
        match (self, other) {
            (Self::CombineChannel(a), Self::CombineChannel(b)) => a.can_undo(b),
            (Self::CombineColor(a), Self::CombineColor(b)) => a.can_undo(b),
            (Self::Combine(a), Self::Combine(b)) => a.can_undo(b),
            _ => self.can_merge(other),
        }
    }

    /// Removes a previously merged `other` from `self`.
    ///
    /// `Ok(None)` means nothing is left and the filter should be dropped.
    /// Returns `self` unchanged in `Err` when the kinds are incompatible.
    pub fn undo(self, other: &Filter) -> Result<Option<Filter>, Filter> {
        match (self, other) {
            (Self::Channel(a), Self::Channel(b)) => {
                a.undo(b).map(|f| f.map(Self::Channel)).map_err(Self::Channel)
            }
            (Self::Color(a), Self::Color(b)) => a.undo(b).map(|f| f.map(Self::Color)).map_err(Self::Color),
            (Self::Transform(a), Self::Transform(b)) => Ok(a.undo(b).map(Self::Transform)),
            (Self::Rotate(a), Self::Rotate(b)) => Ok(a.undo(b).map(Self::Rotate)),
            (Self::Rotate(a), Self::Transform(t)) => a
                .undo_transform(t.transformer())
                .map(|f| f.map(Self::Rotate))
                .map_err(Self::Rotate),
            (Self::CropRect(a), Self::CropRect(b)) => Ok(a.undo(b).map(Self::CropRect)),
            (Self::Scale(a), Self::Scale(b)) => a.undo(b).map(|f| f.map(Self::Scale)).map_err(Self::Scale),
            (Self::CombineChannel(a), Self::CombineChannel(b)) => a
                .undo(b)
                .map(|f| f.map(Self::CombineChannel))
                .map_err(Self::CombineChannel),
            (Self::CombineColor(a), Self::CombineColor(b)) => a
                .undo(b)
                .map(|f| f.map(Self::CombineColor))
                .map_err(Self::CombineColor),
            (Self::Combine(a), Self::Combine(b)) => {
                a.undo(b).map(|f| f.map(Self::Combine)).map_err(Self::Combine)
            }
            (s, _) => Err(s),
        }
    }

    /// Short kind name, for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Channel(_) => "channel",
            Self::Color(_) => "color",
            Self::Transform(_) => "transform",
            Self::Rotate(_) => "rotate",
            Self::CropRect(_) => "crop_rect",
            Self::CropEllipse(_) => "crop_ellipse",
            Self::Scale(_) => "scale",
            Self::Resize(_) => "resize",
            Self::CombineChannel(_) => "combine_channel",
            Self::CombineColor(_) => "combine_color",
            Self::Combine(_) => "combine",
            Self::Custom(_) => "custom",
        }
    }
}

impl<T: CustomFilter + 'static> From<Arc<T>> for Filter {
    fn from(f: Arc<T>) -> Self {
        Self::Custom(f)
    }
}

/// Writes `f(src pixel)` for every destination pixel, matching pixels by
/// their offset from each buffer's origin.
pub(crate) fn apply_pointwise<F>(dst: &mut PixelBuffer, src: &dyn PixelSource, par: Parallelism, f: F)
where
    F: Fn(Pixel) -> Pixel + Sync + Send,
{
    let dst_y = dst.bounds().min_y();
    let src_y = src.bounds().min_y();
    for_each_band(dst, par, |band| {
        let mut row = Vec::new();
        for y in band.rows() {
            src.read_row(src_y + (y - dst_y), &mut row);
            row.iter_mut().for_each(|p| *p = f(*p));
            band.set_row(y, &row);
        }
    });
}

/// Tracks how many filters have been folded into an accumulator.
///
/// Undo reports "drop me" once every merged contribution, including the
/// original one, has been removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct MergeCount(u32);

impl MergeCount {
    pub(crate) const ONE: Self = Self(1);

    #[inline]
    pub(crate) fn inc(self) -> Self {
        Self(self.0.saturating_add(1))
    }

    #[inline]
    pub(crate) fn dec(self) -> Self {
        Self(self.0.saturating_sub(1))
    }

    #[inline]
    pub(crate) fn is_exhausted(self) -> bool {
        self.0 == 0
    }
}

impl Default for MergeCount {
    fn default() -> Self {
        Self::ONE
    }
}
