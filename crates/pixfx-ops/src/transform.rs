//! Lossless geometric transforms: flips, transposes and quarter turns.
//!
//! The eight [`Transformer`]s form the symmetry group of the rectangle
//! (the dihedral group of order 8). Each one is stored as a signed
//! permutation of the axes: an optional swap of x and y followed by an
//! optional mirror along each destination axis. Composition and inversion
//! are then a handful of XORs and the merge table is total.
//!
//! # Example
//!
//! ```rust
//! use pixfx_ops::Transformer;
//!
//! let t = Transformer::Rotate90.merge(Transformer::FlipH);
//! assert_eq!(t, Transformer::Transpose);
//! assert_eq!(Transformer::FlipH.recreate(t), Transformer::Rotate90);
//! ```

use pixfx_core::{Parallelism, PixelBuffer, PixelSource, Rect, for_each_band};
use tracing::trace;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::filter::{Filter, MergeCount};

/// One of the eight rectangle symmetries. Rotations are clockwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Transformer {
    /// No change.
    #[default]
    Identity,
    /// Mirror left to right.
    FlipH,
    /// Mirror top to bottom.
    FlipV,
    /// Mirror along the main diagonal.
    Transpose,
    /// Mirror along the anti-diagonal.
    Transverse,
    /// Quarter turn clockwise.
    Rotate90,
    /// Half turn.
    Rotate180,
    /// Quarter turn counter-clockwise.
    Rotate270,
}

impl Transformer {
    /// All members, identity first.
    pub const ALL: [Transformer; 8] = [
        Self::Identity,
        Self::FlipH,
        Self::FlipV,
        Self::Transpose,
        Self::Transverse,
        Self::Rotate90,
        Self::Rotate180,
        Self::Rotate270,
    ];

    /// `(swap, flip_x, flip_y)`.
    const fn parts(self) -> (bool, bool, bool) {
        match self {
            Self::Identity => (false, false, false),
            Self::FlipH => (false, true, false),
            Self::FlipV => (false, false, true),
            Self::Transpose => (true, false, false),
            Self::Transverse => (true, true, true),
            Self::Rotate90 => (true, true, false),
            Self::Rotate180 => (false, true, true),
            Self::Rotate270 => (true, false, true),
        }
    }

    const fn from_parts(swap: bool, flip_x: bool, flip_y: bool) -> Self {
        match (swap, flip_x, flip_y) {
            (false, false, false) => Self::Identity,
            (false, true, false) => Self::FlipH,
            (false, false, true) => Self::FlipV,
            (false, true, true) => Self::Rotate180,
            (true, false, false) => Self::Transpose,
            (true, true, true) => Self::Transverse,
            (true, true, false) => Self::Rotate90,
            (true, false, true) => Self::Rotate270,
        }
    }

    /// Maps a source coordinate pair to its destination axes.
    ///
    /// Returns the (possibly swapped) pair plus whether the destination x
    /// and y must be mirrored against the destination extent.
    #[inline]
    pub fn transform<T>(self, x: T, y: T) -> (T, T, bool, bool) {
        let (swap, fx, fy) = self.parts();
        if swap { (y, x, fx, fy) } else { (x, y, fx, fy) }
    }

    /// `true` if width and height trade places.
    #[inline]
    pub const fn swaps_axes(self) -> bool {
        self.parts().0
    }

    /// The transformer equivalent to `self` followed by `next`.
    pub const fn merge(self, next: Transformer) -> Transformer {
        let (sa, fxa, fya) = self.parts();
        let (sb, fxb, fyb) = next.parts();
        let (a1, a2) = if sb { (fya, fxa) } else { (fxa, fya) };
        Self::from_parts(sa ^ sb, fxb ^ a1, fyb ^ a2)
    }

    /// The transformer that undoes `self`.
    pub const fn inverse(self) -> Transformer {
        let (s, fx, fy) = self.parts();
        if s {
            Self::from_parts(s, fy, fx)
        } else {
            Self::from_parts(s, fx, fy)
        }
    }

    /// Recovers `prev` from `prev.merge(self)`.
    pub const fn recreate(self, merged: Transformer) -> Transformer {
        merged.merge(self.inverse())
    }

    /// Clockwise quarter turns for the pure rotations.
    pub const fn quarter_turns(self) -> Option<u8> {
        match self {
            Self::Rotate90 => Some(1),
            Self::Rotate180 => Some(2),
            Self::Rotate270 => Some(3),
            _ => None,
        }
    }

    /// Rotation by `turns` clockwise quarter turns, modulo 4.
    pub const fn from_quarter_turns(turns: u8) -> Transformer {
        match turns % 4 {
            1 => Self::Rotate90,
            2 => Self::Rotate180,
            3 => Self::Rotate270,
            _ => Self::Identity,
        }
    }

    /// Output bounds: same origin, axes swapped when needed.
    pub fn bounds(self, src: Rect) -> Rect {
        if self.swaps_axes() {
            src.transposed()
        } else {
            src
        }
    }

    /// Writes the transformed `src` into `dst`.
    ///
    /// Every destination row is one source row or one source column,
    /// read in a single batch.
    pub fn apply(self, dst: &mut PixelBuffer, src: &dyn PixelSource, par: Parallelism) {
        let dst_bounds = dst.bounds();
        let src_bounds = src.bounds();
        let (swap, fx, fy) = self.parts();
        trace!(transformer = ?self, width = dst_bounds.width, height = dst_bounds.height, "Transformer::apply");

        let height = dst_bounds.height as i32;
        for_each_band(dst, par, |band| {
            let mut line = Vec::new();
            for y in band.rows() {
                let v = y - dst_bounds.min_y();
                let v = if fy { height - 1 - v } else { v };
                if swap {
                    src.read_column(src_bounds.min_x() + v, &mut line);
                } else {
                    src.read_row(src_bounds.min_y() + v, &mut line);
                }
                if fx {
                    line.reverse();
                }
                band.set_row(y, &line);
            }
        });
    }
}

/// Filter applying a [`Transformer`].
#[derive(Debug, Clone, PartialEq)]
pub struct TransformFilter {
    transformer: Transformer,
    merges: MergeCount,
}

impl TransformFilter {
    /// `None` for the identity.
    pub fn new(transformer: Transformer) -> Option<Self> {
        (transformer != Transformer::Identity).then_some(Self {
            transformer,
            merges: MergeCount::ONE,
        })
    }

    /// Accumulated transformer.
    pub fn transformer(&self) -> Transformer {
        self.transformer
    }

    /// See [`Transformer::bounds`].
    pub fn bounds(&self, src: Rect) -> Rect {
        self.transformer.bounds(src)
    }

    /// `true` when the accumulated transformer is the identity.
    pub fn skip(&self) -> bool {
        self.transformer == Transformer::Identity
    }

    /// Composes `other` after `self`.
    pub fn merge(self, other: &TransformFilter) -> Self {
        Self {
            transformer: self.transformer.merge(other.transformer),
            merges: self.merges.inc(),
        }
    }

    /// Removes a previously merged `other`. `None` once nothing is left.
    pub fn undo(self, other: &TransformFilter) -> Option<Self> {
        let undone = Self {
            transformer: other.transformer.recreate(self.transformer),
            merges: self.merges.dec(),
        };
        (!undone.merges.is_exhausted() && !undone.skip()).then_some(undone)
    }

    /// See [`Transformer::apply`].
    pub fn apply(&self, dst: &mut PixelBuffer, src: &dyn PixelSource, par: Parallelism) {
        self.transformer.apply(dst, src, par);
    }
}

/// Filter for `transformer`; `None` for the identity.
pub fn transform(transformer: Transformer) -> Option<Filter> {
    TransformFilter::new(transformer).map(Filter::Transform)
}

/// Mirror left to right.
pub fn flip_h() -> Filter {
    Filter::Transform(TransformFilter {
        transformer: Transformer::FlipH,
        merges: MergeCount::ONE,
    })
}

/// Mirror top to bottom.
pub fn flip_v() -> Filter {
    Filter::Transform(TransformFilter {
        transformer: Transformer::FlipV,
        merges: MergeCount::ONE,
    })
}

/// Quarter turn clockwise.
pub fn rotate90() -> Filter {
    Filter::Transform(TransformFilter {
        transformer: Transformer::Rotate90,
        merges: MergeCount::ONE,
    })
}

/// Half turn.
pub fn rotate180() -> Filter {
    Filter::Transform(TransformFilter {
        transformer: Transformer::Rotate180,
        merges: MergeCount::ONE,
    })
}

/// Quarter turn counter-clockwise.
pub fn rotate270() -> Filter {
    Filter::Transform(TransformFilter {
        transformer: Transformer::Rotate270,
        merges: MergeCount::ONE,
    })
}
