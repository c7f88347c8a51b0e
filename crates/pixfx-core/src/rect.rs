//! Rectangles describing buffer bounds.
//!
//! Filters report their output geometry as a [`Rect`] computed from the
//! input rectangle, and buffers carry one as their bounds. The origin may be
//! non-zero; pixel coordinates are absolute.
//!
//! # Coordinate System
//!
//! ```text
//! (0,0) ────────► X
//!   │
//!   │   ┌──────────┐
//!   │   │  Buffer  │
//!   │   │  Bounds  │
//!   │   └──────────┘
//!   ▼
//!   Y
//! ```
//!
//! # Usage
//!
//! ```rust
//! use pixfx_core::Rect;
//!
//! let rect = Rect::new(10, 20, 100, 50);
//! assert!(rect.contains(15, 25));
//! assert!(!rect.contains(-1, 25));
//! assert_eq!(rect.right(), 110);
//! ```

use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A rectangle defined by origin (x, y) and dimensions (width, height).
///
/// # Invariants
///
/// - A rectangle with zero width or height is empty and contains no pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Rect {
    /// X coordinate of the left edge (inclusive)
    pub x: u32,
    /// Y coordinate of the top edge (inclusive)
    pub y: u32,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

impl Rect {
    /// Creates a new rectangle with the given origin and dimensions.
    #[inline]
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Creates a rectangle at the origin.
    ///
    /// # Example
    ///
    /// ```rust
    /// use pixfx_core::Rect;
    ///
    /// let r = Rect::from_size(64, 32);
    /// assert_eq!((r.x, r.y), (0, 0));
    /// ```
    #[inline]
    pub const fn from_size(width: u32, height: u32) -> Self {
        Self::new(0, 0, width, height)
    }

    /// Returns the X coordinate one past the right edge, saturating at `u32::MAX`.
    #[inline]
    pub const fn right(&self) -> u32 {
        self.x.saturating_add(self.width)
    }

    /// Returns the Y coordinate one past the bottom edge, saturating at `u32::MAX`.
    #[inline]
    pub const fn bottom(&self) -> u32 {
        self.y.saturating_add(self.height)
    }

    /// Number of pixels covered.
    #[inline]
    pub const fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// Returns `true` if the rectangle covers no pixels.
    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Returns `(width, height)`.
    #[inline]
    pub const fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Same origin, new dimensions.
    #[inline]
    pub const fn with_size(self, width: u32, height: u32) -> Self {
        Self::new(self.x, self.y, width, height)
    }

    /// Same dimensions with width and height exchanged.
    #[inline]
    pub const fn transposed(self) -> Self {
        Self::new(self.x, self.y, self.height, self.width)
    }

    /// Returns `true` if the absolute pixel coordinate lies inside.
    ///
    /// Takes signed coordinates so that inverse-mapped sample positions
    /// left of or above the origin are simply reported as outside.
    #[inline]
    pub fn contains(&self, x: i32, y: i32) -> bool {
        let (x, y) = (i64::from(x), i64::from(y));
        x >= i64::from(self.x)
            && y >= i64::from(self.y)
            && x < i64::from(self.right())
            && y < i64::from(self.bottom())
    }

    /// Offset of an absolute coordinate from the origin, if inside.
    #[inline]
    pub fn local(&self, x: i32, y: i32) -> Option<(usize, usize)> {
        if self.contains(x, y) {
            Some((
                (i64::from(x) - i64::from(self.x)) as usize,
                (i64::from(y) - i64::from(self.y)) as usize,
            ))
        } else {
            None
        }
    }

    /// Signed left edge, for iterating absolute coordinates.
    ///
    /// Edges past `i32::MAX` clamp to it, so the signed ranges stay ordered
    /// and columns beyond it are never visited.
    #[inline]
    pub fn min_x(&self) -> i32 {
        to_signed(self.x)
    }

    /// Signed top edge, for iterating absolute coordinates.
    #[inline]
    pub fn min_y(&self) -> i32 {
        to_signed(self.y)
    }

    /// Signed exclusive right edge.
    #[inline]
    pub fn max_x(&self) -> i32 {
        to_signed(self.right())
    }

    /// Signed exclusive bottom edge.
    #[inline]
    pub fn max_y(&self) -> i32 {
        to_signed(self.bottom())
    }
}

#[inline]
fn to_signed(v: u32) -> i32 {
    i32::try_from(v).unwrap_or(i32::MAX)
}

impl fmt::Display for Rect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Rect({}, {}, {}x{})",
            self.x, self.y, self.width, self.height
        )
    }
}
