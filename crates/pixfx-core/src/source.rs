//! Read access to pixels.
//!
//! [`PixelSource`] is the read half of the pixel model. Filters take their
//! input as `&dyn PixelSource`, so anything from a [`PixelBuffer`] to a
//! caller-defined image can feed a pipeline.
//!
//! Images that can only report premultiplied 16-bit RGBA implement the
//! narrower [`ColorImage`] trait and are wrapped in [`ColorAdapter`].
//!
//! # Example
//!
//! ```rust
//! use pixfx_core::{ColorAdapter, ColorImage, PixelSource, Rect, SampleDepth};
//!
//! struct Checker;
//!
//! impl ColorImage for Checker {
//!     fn bounds(&self) -> Rect {
//!         Rect::from_size(8, 8)
//!     }
//!     fn rgba16(&self, x: u32, y: u32) -> [u16; 4] {
//!         if (x + y) % 2 == 0 { [0xffff; 4] } else { [0, 0, 0, 0xffff] }
//!     }
//! }
//!
//! let src = ColorAdapter::new(Checker);
//! assert_eq!(src.depth(), SampleDepth::Other);
//! assert_eq!(src.pixel(0, 0).r, 1.0);
//! assert_eq!(src.pixel(1, 0).r, 0.0);
//! ```
//!
//! [`PixelBuffer`]: crate::buffer::PixelBuffer

use crate::format::SampleDepth;
use crate::pixel::Pixel;
use crate::rect::Rect;

/// Random read access to straight-alpha pixels.
///
/// Implementations must return [`Pixel::TRANSPARENT`] for coordinates
/// outside [`bounds`](PixelSource::bounds) and must never panic on them.
pub trait PixelSource: Sync {
    /// Absolute bounds of the readable area.
    fn bounds(&self) -> Rect;

    /// Precision class, used to size lookup tables.
    fn depth(&self) -> SampleDepth;

    /// Pixel at an absolute coordinate.
    fn pixel(&self, x: i32, y: i32) -> Pixel;

    /// Replaces `out` with row `y`, left edge to right edge.
    fn read_row(&self, y: i32, out: &mut Vec<Pixel>) {
        let b = self.bounds();
        out.clear();
        out.extend((b.min_x()..b.max_x()).map(|x| self.pixel(x, y)));
    }

    /// Replaces `out` with column `x`, top edge to bottom edge.
    fn read_column(&self, x: i32, out: &mut Vec<Pixel>) {
        let b = self.bounds();
        out.clear();
        out.extend((b.min_y()..b.max_y()).map(|y| self.pixel(x, y)));
    }
}

impl<T: PixelSource + ?Sized> PixelSource for &T {
    #[inline]
    fn bounds(&self) -> Rect {
        (**self).bounds()
    }

    #[inline]
    fn depth(&self) -> SampleDepth {
        (**self).depth()
    }

    #[inline]
    fn pixel(&self, x: i32, y: i32) -> Pixel {
        (**self).pixel(x, y)
    }

    fn read_row(&self, y: i32, out: &mut Vec<Pixel>) {
        (**self).read_row(y, out)
    }

    fn read_column(&self, x: i32, out: &mut Vec<Pixel>) {
        (**self).read_column(x, out)
    }
}

/// Minimal interface for foreign images.
///
/// Values are premultiplied 16-bit RGBA. `rgba16` is only called with
/// coordinates inside `bounds`.
pub trait ColorImage: Sync {
    /// Absolute bounds.
    fn bounds(&self) -> Rect;

    /// Premultiplied `[r, g, b, a]` at an absolute coordinate.
    fn rgba16(&self, x: u32, y: u32) -> [u16; 4];
}

/// Adapts a [`ColorImage`] into a [`PixelSource`].
#[derive(Debug, Clone)]
pub struct ColorAdapter<T> {
    inner: T,
}

impl<T: ColorImage> ColorAdapter<T> {
    /// Wraps `inner`.
    pub fn new(inner: T) -> Self {
        Self { inner }
    }

    /// Returns the wrapped image.
    pub fn into_inner(self) -> T {
        self.inner
    }
}

impl<T: ColorImage> PixelSource for ColorAdapter<T> {
    fn bounds(&self) -> Rect {
        self.inner.bounds()
    }

    fn depth(&self) -> SampleDepth {
        SampleDepth::Other
    }

    fn pixel(&self, x: i32, y: i32) -> Pixel {
        if !self.inner.bounds().contains(x, y) {
            return Pixel::TRANSPARENT;
        }
        let [r, g, b, a] = self.inner.rgba16(x as u32, y as u32).map(f32::from);
        if a == 0.0 {
            Pixel::TRANSPARENT
        } else if a == 65535.0 {
            Pixel::new(r / 65535.0, g / 65535.0, b / 65535.0, 1.0)
        } else {
            Pixel::new(r / a, g / a, b / a, a / 65535.0)
        }
    }
}
