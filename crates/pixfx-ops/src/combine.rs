//! Combination filters.
//!
//! A combination holds an ordered list of optional slots and runs them as
//! a unit. Two combinations merge slot by slot when they have the same
//! number of slots and every pair of occupied slots merges; an empty slot
//! adopts the other side's filter.
//!
//! | type               | members         | execution                         |
//! |--------------------|-----------------|-----------------------------------|
//! | [`CombineChannel`] | channel filters | one pass, one LUT per slot        |
//! | [`CombineColor`]   | color filters   | one pass                          |
//! | [`Combine`]        | any filter      | nested pipeline                   |
//!
//! # Example
//!
//! ```rust
//! use pixfx_ops::channel::ChannelFilter;
//! use pixfx_ops::combine::CombineChannel;
//!
//! let c = CombineChannel::new(vec![
//!     ChannelFilter::gamma(2.2),
//!     None,
//!     Some(ChannelFilter::invert()),
//! ])
//! .unwrap();
//! assert_eq!(c.slots().len(), 3);
//! ```

use pixfx_core::{Parallelism, PixelBuffer, PixelSource, Rect};
use tracing::trace;

use crate::channel::{ChannelFilter, ChannelMap};
use crate::color::ColorFilter;
use crate::filter::{Filter, MergeCount, apply_pointwise};
use crate::list::run_stages;

/// Merge surface shared by every slot type.
trait Member: Clone + Sized {
    fn can_merge(&self, other: &Self) -> bool;
    fn can_undo(&self, other: &Self) -> bool {
        self.can_merge(other)
    }
    fn merge(self, other: &Self) -> Result<Self, Self>;
    fn undo(self, other: &Self) -> Result<Option<Self>, Self>;
    fn skip(&self) -> bool;
}

impl Member for ChannelFilter {
    fn can_merge(&self, other: &Self) -> bool {
        ChannelFilter::can_merge(self, other)
    }
    fn merge(self, other: &Self) -> Result<Self, Self> {
        ChannelFilter::merge(self, other)
    }
    fn undo(self, other: &Self) -> Result<Option<Self>, Self> {
        ChannelFilter::undo(self, other)
    }
    fn skip(&self) -> bool {
        ChannelFilter::skip(self)
    }
}

impl Member for ColorFilter {
    fn can_merge(&self, other: &Self) -> bool {
        ColorFilter::can_merge(self, other)
    }
    fn merge(self, other: &Self) -> Result<Self, Self> {
        ColorFilter::merge(self, other)
    }
    fn undo(self, other: &Self) -> Result<Option<Self>, Self> {
        ColorFilter::undo(self, other)
    }
    fn skip(&self) -> bool {
        ColorFilter::skip(self)
    }
}

impl Member for Filter {
    fn can_merge(&self, other: &Self) -> bool {
        Filter::can_merge(self, other)
    }
    fn can_undo(&self, other: &Self) -> bool {
        Filter::can_undo(self, other)
    }
    fn merge(self, other: &Self) -> Result<Self, Self> {
        Filter::merge(self, other)
    }
    fn undo(self, other: &Self) -> Result<Option<Self>, Self> {
        Filter::undo(self, other)
    }
    fn skip(&self) -> bool {
        Filter::skip(self)
    }
}

/// Slot list with merge bookkeeping.
#[derive(Debug, Clone)]
struct Slots<T> {
    slots: Vec<Option<T>>,
    merges: MergeCount,
}

impl<T: Member> Slots<T> {
    fn new(slots: Vec<Option<T>>) -> Option<Self> {
        slots.iter().any(Option::is_some).then(|| Self {
            slots,
            merges: MergeCount::ONE,
        })
    }

    /// Occupied, non-skipping slots in order.
    fn active(&self) -> impl Iterator<Item = &T> {
        self.slots.iter().flatten().filter(|f| !f.skip())
    }

    fn skip(&self) -> bool {
        self.active().next().is_none()
    }

    fn can_merge(&self, other: &Self) -> bool {
        self.slots.len() == other.slots.len()
            && self.slots.iter().zip(&other.slots).all(|pair| match pair {
                (Some(a), Some(b)) => a.can_merge(b),
                _ => true,
            })
    }

    fn can_undo(&self, other: &Self) -> bool {
        self.slots.len() == other.slots.len()
            && self.slots.iter().zip(&other.slots).all(|pair| match pair {
                (Some(a), Some(b)) => a.can_undo(b),
                (None, Some(_)) => false,
                _ => true,
            })
    }

    fn merge(mut self, other: &Self) -> Result<Self, Self> {
        if !self.can_merge(other) {
            return Err(self);
        }
        for (slot, theirs) in self.slots.iter_mut().zip(&other.slots) {
            let Some(theirs) = theirs else { continue };
            *slot = Some(match slot.take() {
                Some(ours) => ours.merge(theirs).unwrap_or_else(|ours| ours),
                None => theirs.clone(),
            });
        }
        self.merges = self.merges.inc();
        Ok(self)
    }

    fn undo(mut self, other: &Self) -> Result<Option<Self>, Self> {
        if !self.can_undo(other) {
            return Err(self);
        }
        for (slot, theirs) in self.slots.iter_mut().zip(&other.slots) {
            let Some(theirs) = theirs else { continue };
            *slot = match slot.take() {
                Some(ours) => ours.undo(theirs).unwrap_or_else(Some),
                None => None,
            };
        }
        self.merges = self.merges.dec();
        Ok((!self.merges.is_exhausted() && !self.skip()).then_some(self))
    }
}

macro_rules! combination {
    ($name:ident, $member:ty) => {
        impl $name {
            /// Builds the combination. `None` when every slot is empty.
            pub fn new(slots: Vec<Option<$member>>) -> Option<Self> {
                Slots::new(slots).map(Self)
            }

            /// Slots in application order.
            pub fn slots(&self) -> &[Option<$member>] {
                &self.0.slots
            }

            /// `true` when every slot is empty or skips.
            pub fn skip(&self) -> bool {
                self.0.skip()
            }

            /// Same slot count and pairwise-mergeable occupied slots.
            pub fn can_merge(&self, other: &Self) -> bool {
                self.0.can_merge(&other.0)
            }

            /// Like [`can_merge`](Self::can_merge), and every slot of
            /// `other` has a counterpart to undo from.
            pub fn can_undo(&self, other: &Self) -> bool {
                self.0.can_undo(&other.0)
            }

            /// Merges `other` slot by slot.
            pub fn merge(self, other: &Self) -> Result<Self, Self> {
                self.0.merge(&other.0).map(Self).map_err(Self)
            }

            /// Undoes `other` slot by slot. Slots whose filter is used up
            /// become empty; `Ok(None)` once nothing is left.
            pub fn undo(self, other: &Self) -> Result<Option<Self>, Self> {
                self.0
                    .undo(&other.0)
                    .map(|s| s.map(Self))
                    .map_err(Self)
            }
        }
    };
}

/// Channel filters applied in a single pass.
#[derive(Debug, Clone)]
pub struct CombineChannel(Slots<ChannelFilter>);

combination!(CombineChannel, ChannelFilter);

impl CombineChannel {
    /// Runs every active slot over each color channel. Slots that
    /// support it go through their own lookup table.
    pub fn apply(&self, dst: &mut PixelBuffer, src: &dyn PixelSource, par: Parallelism) {
        let maps: Vec<ChannelMap<'_>> = self.0.active().map(|f| f.mapper(src)).collect();
        let (width, height) = dst.bounds().size();
        trace!(width, height, stages = maps.len(), "CombineChannel::apply");
        apply_pointwise(dst, src, par, |p| {
            maps.iter().fold(p, |p, map| p.map_rgb(|c| map.eval(c)))
        });
    }
}

/// Color filters applied in a single pass.
#[derive(Debug, Clone)]
pub struct CombineColor(Slots<ColorFilter>);

combination!(CombineColor, ColorFilter);

impl CombineColor {
    /// Runs every active slot on each pixel.
    pub fn apply(&self, dst: &mut PixelBuffer, src: &dyn PixelSource, par: Parallelism) {
        let members: Vec<&ColorFilter> = self.0.active().collect();
        let (width, height) = dst.bounds().size();
        trace!(width, height, stages = members.len(), "CombineColor::apply");
        apply_pointwise(dst, src, par, |p| members.iter().fold(p, |p, f| f.eval(p)));
    }
}

/// Arbitrary filters run as a nested pipeline.
#[derive(Debug, Clone)]
pub struct Combine(Slots<Filter>);

combination!(Combine, Filter);

impl Combine {
    /// Bounds folded over the active slots.
    pub fn bounds(&self, src: Rect) -> Rect {
        self.0.active().fold(src, |r, f| f.bounds(r))
    }

    /// Runs the active slots one after another.
    pub fn apply(&self, dst: &mut PixelBuffer, src: &dyn PixelSource, par: Parallelism) {
        let stages: Vec<&Filter> = self.0.active().collect();
        trace!(stages = stages.len(), "Combine::apply");
        run_stages(&stages, dst, src, par);
    }
}

/// Channel filters in one pass; `None` when every slot is empty.
pub fn combine_channels(slots: Vec<Option<ChannelFilter>>) -> Option<Filter> {
    CombineChannel::new(slots).map(Filter::CombineChannel)
}

/// Color filters in one pass; `None` when every slot is empty.
pub fn combine_colors(slots: Vec<Option<ColorFilter>>) -> Option<Filter> {
    CombineColor::new(slots).map(Filter::CombineColor)
}

/// Any filters as a nested pipeline; `None` when every slot is empty.
pub fn combine(slots: Vec<Option<Filter>>) -> Option<Filter> {
    Combine::new(slots).map(Filter::Combine)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Transformer, brightness, gamma, invert, transform};
    use approx::assert_abs_diff_eq;
    use pixfx_core::{Pixel, PixelLayout};

    fn gray(v: f32) -> PixelBuffer {
        PixelBuffer::filled(PixelLayout::RgbaF32, Rect::from_size(4, 4), Pixel::gray(v))
    }

    #[test]
    fn test_empty_is_none() {
        assert!(CombineChannel::new(vec![]).is_none());
        assert!(CombineColor::new(vec![None, None]).is_none());
        assert!(combine(vec![None]).is_none());
    }

    #[test]
    fn test_channel_one_pass_matches_sequence() {
        let c = CombineChannel::new(vec![ChannelFilter::gamma(2.0), None, Some(ChannelFilter::invert())]).unwrap();
        let src = gray(0.25);
        let mut dst = PixelBuffer::new(PixelLayout::RgbaF32, src.bounds());
        c.apply(&mut dst, &src, Parallelism::Sequential);
        assert_abs_diff_eq!(dst.pixel(1, 1).r, 0.5, epsilon = 1e-5);
        assert_eq!(dst.pixel(1, 1).a, 1.0);
    }

    #[test]
    fn test_color_one_pass() {
        let c = CombineColor::new(vec![Some(ColorFilter::grayscale()), ColorFilter::color_balance(100.0, 0.0, 0.0)])
            .unwrap();
        let src = PixelBuffer::filled(PixelLayout::RgbaF32, Rect::from_size(2, 2), Pixel::new(0.2, 0.2, 0.2, 1.0));
        let mut dst = PixelBuffer::new(PixelLayout::RgbaF32, src.bounds());
        c.apply(&mut dst, &src, Parallelism::Auto);
        let p = dst.pixel(0, 0);
        assert_abs_diff_eq!(p.r, 0.4, epsilon = 1e-5);
        assert_abs_diff_eq!(p.g, 0.2, epsilon = 1e-5);
    }

    #[test]
    fn test_merge_fills_empty_slots() {
        let a = CombineChannel::new(vec![ChannelFilter::brightness(10.0), None]).unwrap();
        let b = CombineChannel::new(vec![ChannelFilter::brightness(20.0), Some(ChannelFilter::invert())]).unwrap();
        let m = a.clone().merge(&b).unwrap();
        assert_eq!(
            m.slots()[0].as_ref().map(|f| f.kind().clone()),
            Some(crate::channel::ChannelKind::Brightness(30.0))
        );
        assert!(m.slots()[1].is_some());

        let back = m.undo(&b).unwrap().unwrap();
        assert!(back.slots()[1].is_none());
        assert!(back.undo(&a).unwrap().is_none());
    }

    #[test]
    fn test_merge_rejects_mismatch() {
        let a = CombineChannel::new(vec![ChannelFilter::brightness(10.0)]).unwrap();
        let b = CombineChannel::new(vec![ChannelFilter::brightness(10.0), None]).unwrap();
        let c = CombineChannel::new(vec![ChannelFilter::gamma(2.0)]).unwrap();
        assert!(!a.can_merge(&b));
        assert!(!a.can_merge(&c));
        assert!(a.merge(&c).is_err());
    }

    #[test]
    fn test_generic_pipeline() {
        let c = Combine::new(vec![transform(Transformer::Rotate90), Some(invert()), brightness(0.0)]).unwrap();
        let src = PixelBuffer::from_fn(PixelLayout::RgbaF32, Rect::from_size(3, 2), |x, _| Pixel::gray(x as f32 / 2.0));
        let out_bounds = c.bounds(src.bounds());
        assert_eq!(out_bounds.size(), (2, 3));
        let mut dst = PixelBuffer::new(PixelLayout::RgbaF32, out_bounds);
        c.apply(&mut dst, &src, Parallelism::Sequential);
        let mut values: Vec<f32> = (0..3).map(|y| dst.pixel(0, y).r).collect();
        values.sort_by(f32::total_cmp);
        assert_eq!(values, vec![0.0, 0.5, 1.0]);
    }

    #[test]
    fn test_generic_merge_and_skip() {
        let a = Combine::new(vec![gamma(2.0), transform(Transformer::FlipH)]).unwrap();
        let b = Combine::new(vec![None, transform(Transformer::FlipH)]).unwrap();
        let m = a.merge(&b).unwrap();
        assert!(!m.skip());
        assert_eq!(m.bounds(Rect::from_size(5, 7)), Rect::from_size(5, 7));
        let only_flips = Combine::new(vec![transform(Transformer::FlipH)])
            .unwrap()
            .merge(&Combine::new(vec![transform(Transformer::FlipH)]).unwrap())
            .unwrap();
        assert!(only_flips.skip());
    }
}
