//! Packed pixel storage.
//!
//! [`PixelBuffer`] owns interleaved samples in one of the
//! [`PixelLayout`] encodings and converts between them and [`Pixel`]
//! on every access. Filters never see the packed form.
//!
//! # Conversion rules
//!
//! Reading:
//! - Premultiplied layouts divide color by alpha. Zero alpha yields
//!   [`Pixel::TRANSPARENT`]; full alpha takes the plain scaling path.
//! - Gray layouts read as opaque `{v, v, v, 1}`.
//! - Anything outside the bounds reads as [`Pixel::TRANSPARENT`].
//!
//! Writing:
//! - Channels are clamped to `[0, 1]`, scaled and rounded to nearest.
//! - Premultiplied layouts multiply color by alpha first.
//! - Gray layouts store Rec. 601 luma multiplied by alpha.
//! - Writes outside the bounds are ignored.
//!
//! # Parallel writes
//!
//! [`PixelBuffer::bands`] splits the rows into disjoint [`RowBand`]
//! views which can be filled from different threads.
//!
//! # Example
//!
//! ```rust
//! use pixfx_core::{Pixel, PixelBuffer, PixelLayout, PixelSource, Rect};
//!
//! let mut buf = PixelBuffer::new(PixelLayout::Rgba8, Rect::from_size(4, 4));
//! buf.set(1, 1, Pixel::new(1.0, 0.0, 0.0, 0.5));
//! assert_eq!(buf.as_u8().unwrap()[20..24], [128, 0, 0, 128]);
//!
//! let p = buf.pixel(1, 1);
//! assert!((p.r - 1.0).abs() < 1e-6);
//! assert_eq!(buf.pixel(9, 9), Pixel::TRANSPARENT);
//! ```

use std::ops::Range;

use crate::color::luma;
use crate::error::{Error, Result};
use crate::format::{PixelLayout, SampleDepth};
use crate::parallel::{Parallelism, for_each_band};
use crate::pixel::Pixel;
use crate::rect::Rect;
use crate::source::PixelSource;

/// Storage scalar of a packed layout.
trait Sample: Copy + Default + Send + Sync {
    /// Value representing full intensity.
    const SCALE: f32;
    fn to_f32(self) -> f32;
    /// Clamps to `[0, SCALE]` and rounds to nearest.
    fn quantize(v: f32) -> Self;
}

impl Sample for u8 {
    const SCALE: f32 = 255.0;

    #[inline]
    fn to_f32(self) -> f32 {
        f32::from(self)
    }

    #[inline]
    fn quantize(v: f32) -> Self {
        v.clamp(0.0, Self::SCALE).round() as u8
    }
}

impl Sample for u16 {
    const SCALE: f32 = 65535.0;

    #[inline]
    fn to_f32(self) -> f32 {
        f32::from(self)
    }

    #[inline]
    fn quantize(v: f32) -> Self {
        v.clamp(0.0, Self::SCALE).round() as u16
    }
}

impl Sample for f32 {
    const SCALE: f32 = 1.0;

    #[inline]
    fn to_f32(self) -> f32 {
        self
    }

    #[inline]
    fn quantize(v: f32) -> Self {
        v.clamp(0.0, 1.0)
    }
}

#[inline]
fn decode<T: Sample>(layout: PixelLayout, px: &[T]) -> Pixel {
    if layout.is_gray() {
        return Pixel::gray(px[0].to_f32() / T::SCALE);
    }

    let [r, g, b, a] = [px[0].to_f32(), px[1].to_f32(), px[2].to_f32(), px[3].to_f32()];
    if layout.is_premultiplied() {
        if a == 0.0 {
            return Pixel::TRANSPARENT;
        }
        if a == T::SCALE {
            return Pixel::new(r / T::SCALE, g / T::SCALE, b / T::SCALE, 1.0);
        }
        return Pixel::new(r / a, g / a, b / a, a / T::SCALE);
    }
    Pixel::new(r / T::SCALE, g / T::SCALE, b / T::SCALE, a / T::SCALE)
}

#[inline]
fn encode<T: Sample>(layout: PixelLayout, p: Pixel, out: &mut [T]) {
    let p = p.clamped();
    if layout.is_gray() {
        out[0] = T::quantize(luma(p.r, p.g, p.b) * p.a * T::SCALE);
        return;
    }

    let k = if layout.is_premultiplied() {
        p.a * T::SCALE
    } else {
        T::SCALE
    };
    out[0] = T::quantize(p.r * k);
    out[1] = T::quantize(p.g * k);
    out[2] = T::quantize(p.b * k);
    out[3] = T::quantize(p.a * T::SCALE);
}

#[derive(Debug, Clone, PartialEq)]
enum Samples {
    U8(Vec<u8>),
    U16(Vec<u16>),
    F32(Vec<f32>),
}

impl Samples {
    fn zeroed(depth: SampleDepth, len: usize) -> Self {
        match depth {
            SampleDepth::Eight => Self::U8(vec![0; len]),
            SampleDepth::Sixteen => Self::U16(vec![0; len]),
            SampleDepth::Other => Self::F32(vec![0.0; len]),
        }
    }
}

enum SamplesMut<'a> {
    U8(&'a mut [u8]),
    U16(&'a mut [u16]),
    F32(&'a mut [f32]),
}

/// Owned 2D pixel storage with a layout and absolute bounds.
#[derive(Debug, Clone, PartialEq)]
pub struct PixelBuffer {
    layout: PixelLayout,
    bounds: Rect,
    samples: Samples,
}

fn sample_len(layout: PixelLayout, bounds: Rect) -> Result<usize> {
    (bounds.width as usize)
        .checked_mul(bounds.height as usize)
        .and_then(|n| n.checked_mul(layout.channels()))
        .ok_or_else(|| Error::invalid_dimensions(bounds.width, bounds.height, "sample count overflow"))
}

impl PixelBuffer {
    /// Allocates a zeroed (fully transparent) buffer.
    ///
    /// # Panics
    ///
    /// Panics if `width * height * channels` overflows `usize`.
    pub fn new(layout: PixelLayout, bounds: Rect) -> Self {
        let len = (bounds.width as usize) * (bounds.height as usize) * layout.channels();
        Self {
            layout,
            bounds,
            samples: Samples::zeroed(layout.depth(), len),
        }
    }

    /// Allocates a buffer and fills every pixel with `pixel`.
    pub fn filled(layout: PixelLayout, bounds: Rect, pixel: Pixel) -> Self {
        Self::from_fn(layout, bounds, |_, _| pixel)
    }

    /// Allocates a buffer and fills it from a function of absolute coordinates.
    pub fn from_fn(layout: PixelLayout, bounds: Rect, f: impl Fn(i32, i32) -> Pixel) -> Self {
        let mut buf = Self::new(layout, bounds);
        let mut band = buf.as_band();
        for y in bounds.min_y()..bounds.max_y() {
            for x in bounds.min_x()..bounds.max_x() {
                band.set(x, y, f(x, y));
            }
        }
        buf
    }

    /// Wraps 8-bit samples.
    pub fn from_u8(layout: PixelLayout, bounds: Rect, data: Vec<u8>) -> Result<Self> {
        Self::check(layout, bounds, SampleDepth::Eight, "u8", data.len())?;
        Ok(Self {
            layout,
            bounds,
            samples: Samples::U8(data),
        })
    }

    /// Wraps 16-bit samples.
    pub fn from_u16(layout: PixelLayout, bounds: Rect, data: Vec<u16>) -> Result<Self> {
        Self::check(layout, bounds, SampleDepth::Sixteen, "u16", data.len())?;
        Ok(Self {
            layout,
            bounds,
            samples: Samples::U16(data),
        })
    }

    /// Wraps float samples. Only valid for [`PixelLayout::RgbaF32`].
    pub fn from_f32(layout: PixelLayout, bounds: Rect, data: Vec<f32>) -> Result<Self> {
        Self::check(layout, bounds, SampleDepth::Other, "f32", data.len())?;
        Ok(Self {
            layout,
            bounds,
            samples: Samples::F32(data),
        })
    }

    fn check(
        layout: PixelLayout,
        bounds: Rect,
        depth: SampleDepth,
        sample: &'static str,
        got: usize,
    ) -> Result<()> {
        if layout.depth() != depth {
            return Err(Error::sample_type(layout, sample));
        }
        let expected = sample_len(layout, bounds)?;
        if expected != got {
            return Err(Error::sample_count(
                layout,
                bounds.width,
                bounds.height,
                expected,
                got,
            ));
        }
        Ok(())
    }

    /// Storage layout.
    #[inline]
    pub fn layout(&self) -> PixelLayout {
        self.layout
    }

    /// Width in pixels.
    #[inline]
    pub fn width(&self) -> u32 {
        self.bounds.width
    }

    /// Height in pixels.
    #[inline]
    pub fn height(&self) -> u32 {
        self.bounds.height
    }

    /// Raw 8-bit samples, if this is an 8-bit layout.
    pub fn as_u8(&self) -> Option<&[u8]> {
        match &self.samples {
            Samples::U8(v) => Some(v),
            _ => None,
        }
    }

    /// Raw 16-bit samples, if this is a 16-bit layout.
    pub fn as_u16(&self) -> Option<&[u16]> {
        match &self.samples {
            Samples::U16(v) => Some(v),
            _ => None,
        }
    }

    /// Raw float samples, if this is a float layout.
    pub fn as_f32(&self) -> Option<&[f32]> {
        match &self.samples {
            Samples::F32(v) => Some(v),
            _ => None,
        }
    }

    /// Writes one pixel. Out-of-bounds writes are ignored.
    #[inline]
    pub fn set(&mut self, x: i32, y: i32, p: Pixel) {
        self.as_band().set(x, y, p);
    }

    /// Writes a row starting at the left edge. Extra pixels are ignored.
    pub fn set_row(&mut self, y: i32, row: &[Pixel]) {
        self.as_band().set_row(y, row);
    }

    /// Decodes every pixel in row-major order.
    pub fn to_pixels(&self) -> Vec<Pixel> {
        let mut out = Vec::with_capacity(self.bounds.area() as usize);
        let mut row = Vec::new();
        for y in self.bounds.min_y()..self.bounds.max_y() {
            self.read_row(y, &mut row);
            out.extend_from_slice(&row);
        }
        out
    }

    /// Overwrites this buffer with `src`, pixel for pixel relative to each
    /// origin. Pixels outside `src` become transparent.
    pub fn copy_from(&mut self, src: &dyn PixelSource, par: Parallelism) {
        let dst_bounds = self.bounds;
        let src_bounds = src.bounds();
        for_each_band(self, par, |band| {
            for y in band.rows() {
                let sy = src_bounds.min_y() + (y - dst_bounds.min_y());
                for x in dst_bounds.min_x()..dst_bounds.max_x() {
                    let sx = src_bounds.min_x() + (x - dst_bounds.min_x());
                    band.set(x, y, src.pixel(sx, sy));
                }
            }
        });
    }

    /// Mutable view over every row.
    pub fn as_band(&mut self) -> RowBand<'_> {
        let height = self.bounds.height as usize;
        self.bands(&[0..height]).remove(0)
    }

    /// Splits the buffer into disjoint row views.
    ///
    /// `ranges` are row offsets from the top edge and must be ascending
    /// and non-overlapping.
    ///
    /// # Panics
    ///
    /// Panics if a range extends past the last row.
    pub fn bands(&mut self, ranges: &[Range<usize>]) -> Vec<RowBand<'_>> {
        let stride = self.bounds.width as usize * self.layout.channels();
        let layout = self.layout;
        let bounds = self.bounds;
        let band_rect = |r: &Range<usize>| {
            Rect::new(
                bounds.x,
                bounds.y + r.start as u32,
                bounds.width,
                (r.end - r.start) as u32,
            )
        };

        match &mut self.samples {
            Samples::U8(v) => split_rows(v, stride, ranges)
                .into_iter()
                .zip(ranges)
                .map(|(s, r)| RowBand::new(layout, band_rect(r), SamplesMut::U8(s)))
                .collect(),
            Samples::U16(v) => split_rows(v, stride, ranges)
                .into_iter()
                .zip(ranges)
                .map(|(s, r)| RowBand::new(layout, band_rect(r), SamplesMut::U16(s)))
                .collect(),
            Samples::F32(v) => split_rows(v, stride, ranges)
                .into_iter()
                .zip(ranges)
                .map(|(s, r)| RowBand::new(layout, band_rect(r), SamplesMut::F32(s)))
                .collect(),
        }
    }

    #[inline]
    fn offset(&self, x: i32, y: i32) -> Option<usize> {
        self.bounds.local(x, y).map(|(lx, ly)| {
            (ly * self.bounds.width as usize + lx) * self.layout.channels()
        })
    }
}

fn split_rows<'a, T>(mut data: &'a mut [T], stride: usize, ranges: &[Range<usize>]) -> Vec<&'a mut [T]> {
    let mut out = Vec::with_capacity(ranges.len());
    let mut consumed = 0;
    for r in ranges {
        let (_, rest) = std::mem::take(&mut data).split_at_mut((r.start - consumed) * stride);
        let (band, rest) = rest.split_at_mut((r.end - r.start) * stride);
        out.push(band);
        data = rest;
        consumed = r.end;
    }
    out
}

impl PixelSource for PixelBuffer {
    #[inline]
    fn bounds(&self) -> Rect {
        self.bounds
    }

    #[inline]
    fn depth(&self) -> SampleDepth {
        self.layout.depth()
    }

    #[inline]
    fn pixel(&self, x: i32, y: i32) -> Pixel {
        let Some(i) = self.offset(x, y) else {
            return Pixel::TRANSPARENT;
        };
        let n = self.layout.channels();
        match &self.samples {
            Samples::U8(v) => decode(self.layout, &v[i..i + n]),
            Samples::U16(v) => decode(self.layout, &v[i..i + n]),
            Samples::F32(v) => decode(self.layout, &v[i..i + n]),
        }
    }

    fn read_row(&self, y: i32, out: &mut Vec<Pixel>) {
        out.clear();
        let Some(start) = self.offset(self.bounds.min_x(), y) else {
            out.resize(self.bounds.width as usize, Pixel::TRANSPARENT);
            return;
        };
        let n = self.layout.channels();
        let end = start + self.bounds.width as usize * n;
        let layout = self.layout;
        match &self.samples {
            Samples::U8(v) => out.extend(v[start..end].chunks_exact(n).map(|px| decode(layout, px))),
            Samples::U16(v) => out.extend(v[start..end].chunks_exact(n).map(|px| decode(layout, px))),
            Samples::F32(v) => out.extend(v[start..end].chunks_exact(n).map(|px| decode(layout, px))),
        }
    }

    fn read_column(&self, x: i32, out: &mut Vec<Pixel>) {
        out.clear();
        let Some(start) = self.offset(x, self.bounds.min_y()) else {
            out.resize(self.bounds.height as usize, Pixel::TRANSPARENT);
            return;
        };
        let n = self.layout.channels();
        let stride = self.bounds.width as usize * n;
        let layout = self.layout;
        // One chunk per row; each starts at this column's sample.
        match &self.samples {
            Samples::U8(v) => out.extend(v[start..].chunks(stride).map(|row| decode(layout, &row[..n]))),
            Samples::U16(v) => out.extend(v[start..].chunks(stride).map(|row| decode(layout, &row[..n]))),
            Samples::F32(v) => out.extend(v[start..].chunks(stride).map(|row| decode(layout, &row[..n]))),
        }
    }
}

/// Mutable view over a contiguous run of full-width rows.
///
/// Coordinates are absolute, as for the owning buffer.
pub struct RowBand<'a> {
    layout: PixelLayout,
    bounds: Rect,
    samples: SamplesMut<'a>,
}

impl<'a> RowBand<'a> {
    fn new(layout: PixelLayout, bounds: Rect, samples: SamplesMut<'a>) -> Self {
        Self {
            layout,
            bounds,
            samples,
        }
    }

    /// Rows covered by this band.
    #[inline]
    pub fn bounds(&self) -> Rect {
        self.bounds
    }

    /// Absolute row coordinates covered by this band.
    #[inline]
    pub fn rows(&self) -> Range<i32> {
        self.bounds.min_y()..self.bounds.max_y()
    }

    /// Writes one pixel. Coordinates outside the band are ignored.
    #[inline]
    pub fn set(&mut self, x: i32, y: i32, p: Pixel) {
        let Some((lx, ly)) = self.bounds.local(x, y) else {
            return;
        };
        let n = self.layout.channels();
        let i = (ly * self.bounds.width as usize + lx) * n;
        match &mut self.samples {
            SamplesMut::U8(v) => encode(self.layout, p, &mut v[i..i + n]),
            SamplesMut::U16(v) => encode(self.layout, p, &mut v[i..i + n]),
            SamplesMut::F32(v) => encode(self.layout, p, &mut v[i..i + n]),
        }
    }

    /// Writes a row starting at the left edge.
    pub fn set_row(&mut self, y: i32, row: &[Pixel]) {
        let x0 = self.bounds.min_x();
        for (x, p) in (x0..self.bounds.max_x()).zip(row) {
            self.set(x, y, *p);
        }
    }
}
