//! Cropping in relative coordinates.
//!
//! Both crops take positions and sizes as fractions of the input size, so
//! the same filter works for any resolution and composes under
//! [`Filter::merge`](crate::Filter::merge).
//!
//! - [`CropRect`] - keeps an axis-aligned window, nested crops merge
//! - [`CropEllipse`] - keeps the bounding box of an ellipse and clears
//!   everything outside it, with anti-aliased edges

use pixfx_core::{Parallelism, Pixel, PixelBuffer, PixelSource, Rect, for_each_band};
use tracing::trace;

use crate::filter::{Filter, MergeCount};

/// Subsamples per axis used to estimate ellipse coverage.
const COVERAGE_GRID: usize = 4;

/// Rectangular crop.
#[derive(Debug, Clone, PartialEq)]
pub struct CropRect {
    x: f32,
    y: f32,
    width: f32,
    height: f32,
    merges: MergeCount,
}

impl CropRect {
    /// Window at `(x, y)` of size `(width, height)`, all in `[0, 1]`.
    ///
    /// The size is trimmed so the window stays inside the frame. `None`
    /// for the full frame.
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Option<Self> {
        let x = x.clamp(0.0, 1.0);
        let y = y.clamp(0.0, 1.0);
        let width = width.clamp(0.0, 1.0 - x);
        let height = height.clamp(0.0, 1.0 - y);
        let crop = Self {
            x,
            y,
            width,
            height,
            merges: MergeCount::ONE,
        };
        (!crop.skip()).then_some(crop)
    }

    /// `(x, y, width, height)` relative to the input.
    pub fn window(&self) -> (f32, f32, f32, f32) {
        (self.x, self.y, self.width, self.height)
    }

    /// `true` for the full frame.
    pub fn skip(&self) -> bool {
        self.x == 0.0 && self.y == 0.0 && self.width == 1.0 && self.height == 1.0
    }

    /// `floor(w * width) x floor(h * height)`, same origin as `src`.
    pub fn bounds(&self, src: Rect) -> Rect {
        let width = (src.width as f32 * self.width).floor() as u32;
        let height = (src.height as f32 * self.height).floor() as u32;
        src.with_size(width, height)
    }

    /// Crops the window of this crop by `other`.
    pub fn merge(mut self, other: &CropRect) -> Self {
        self.x += other.x * self.width;
        self.y += other.y * self.height;
        self.width *= other.width;
        self.height *= other.height;
        self.merges = self.merges.inc();
        self
    }

    /// Reverses [`merge`](CropRect::merge). `None` once nothing is left.
    ///
    /// A zero-sized `other` cannot be divided out and leaves the size as is.
    pub fn undo(mut self, other: &CropRect) -> Option<Self> {
        if other.width > 0.0 {
            self.width /= other.width;
        }
        if other.height > 0.0 {
            self.height /= other.height;
        }
        self.x -= other.x * self.width;
        self.y -= other.y * self.height;
        self.merges = self.merges.dec();
        (!self.merges.is_exhausted() && !self.skip()).then_some(self)
    }

    /// Copies the window out of `src`.
    pub fn apply(&self, dst: &mut PixelBuffer, src: &dyn PixelSource, par: Parallelism) {
        let sb = src.bounds();
        let x0 = sb.min_x() + (sb.width as f32 * self.x).floor() as i32;
        let y0 = sb.min_y() + (sb.height as f32 * self.y).floor() as i32;
        let db = dst.bounds();
        trace!(x0, y0, width = db.width, height = db.height, "CropRect::apply");

        for_each_band(dst, par, |band| {
            let mut row = Vec::with_capacity(db.width as usize);
            for y in band.rows() {
                let sy = y0 + (y - db.min_y());
                row.clear();
                row.extend((0..db.width as i32).map(|x| src.pixel(x0 + x, sy)));
                band.set_row(y, &row);
            }
        });
    }
}

/// Elliptical crop.
#[derive(Debug, Clone, PartialEq)]
pub struct CropEllipse {
    cx: f32,
    cy: f32,
    rx: f32,
    ry: f32,
}

impl CropEllipse {
    /// Ellipse centered at `(cx, cy)` with radii `(rx, ry)`, all in `[0, 1]`.
    ///
    /// `None` when the ellipse contains all four corners of the frame.
    pub fn new(cx: f32, cy: f32, rx: f32, ry: f32) -> Option<Self> {
        let crop = Self {
            cx: cx.clamp(0.0, 1.0),
            cy: cy.clamp(0.0, 1.0),
            rx: rx.clamp(0.0, 1.0),
            ry: ry.clamp(0.0, 1.0),
        };
        let covers_frame = [(0.0, 0.0), (1.0, 0.0), (0.0, 1.0), (1.0, 1.0)]
            .iter()
            .all(|&(x, y)| crop.contains(x, y));
        (!covers_frame).then_some(crop)
    }

    fn contains(&self, x: f32, y: f32) -> bool {
        if self.rx <= 0.0 || self.ry <= 0.0 {
            return false;
        }
        let dx = (x - self.cx) / self.rx;
        let dy = (y - self.cy) / self.ry;
        dx * dx + dy * dy <= 1.0
    }

    /// Relative extents `(left, top, right, bottom)` of the clipped box.
    fn extents(&self) -> (f32, f32, f32, f32) {
        let left = self.cx - self.rx.min(self.cx);
        let top = self.cy - self.ry.min(self.cy);
        let right = self.cx + self.rx.min(1.0 - self.cx);
        let bottom = self.cy + self.ry.min(1.0 - self.cy);
        (left, top, right, bottom)
    }

    /// Bounding box of the ellipse clipped to the frame, same origin as `src`.
    pub fn bounds(&self, src: Rect) -> Rect {
        let (left, top, right, bottom) = self.extents();
        let width = (src.width as f32 * (right - left)).round() as u32;
        let height = (src.height as f32 * (bottom - top)).round() as u32;
        src.with_size(width, height)
    }

    /// Copies the box and scales alpha by ellipse coverage.
    pub fn apply(&self, dst: &mut PixelBuffer, src: &dyn PixelSource, par: Parallelism) {
        let sb = src.bounds();
        let (w, h) = (sb.width as f32, sb.height as f32);
        let (left, top, _, _) = self.extents();
        let x0 = sb.min_x() + (left * w).round() as i32;
        let y0 = sb.min_y() + (top * h).round() as i32;

        // ellipse in destination pixel units
        let cx = (self.cx - left) * w;
        let cy = (self.cy - top) * h;
        let rx = self.rx * w;
        let ry = self.ry * h;
        let db = dst.bounds();
        trace!(x0, y0, width = db.width, height = db.height, "CropEllipse::apply");

        let step = 1.0 / COVERAGE_GRID as f32;
        let coverage = |u: f32, v: f32| -> f32 {
            if rx <= 0.0 || ry <= 0.0 {
                return 0.0;
            }
            let mut inside = 0;
            for j in 0..COVERAGE_GRID {
                let dy = (v + (j as f32 + 0.5) * step - cy) / ry;
                for i in 0..COVERAGE_GRID {
                    let dx = (u + (i as f32 + 0.5) * step - cx) / rx;
                    if dx * dx + dy * dy <= 1.0 {
                        inside += 1;
                    }
                }
            }
            inside as f32 / (COVERAGE_GRID * COVERAGE_GRID) as f32
        };

        for_each_band(dst, par, |band| {
            let mut row = Vec::with_capacity(db.width as usize);
            for y in band.rows() {
                let v = y - db.min_y();
                row.clear();
                row.extend((0..db.width as i32).map(|u| {
                    let k = coverage(u as f32, v as f32);
                    if k == 0.0 {
                        return Pixel::TRANSPARENT;
                    }
                    let p = src.pixel(x0 + u, y0 + v);
                    Pixel { a: p.a * k, ..p }
                }));
                band.set_row(y, &row);
            }
        });
    }
}

/// Rectangular crop, see [`CropRect::new`].
pub fn crop_rect(x: f32, y: f32, width: f32, height: f32) -> Option<Filter> {
    CropRect::new(x, y, width, height).map(Filter::CropRect)
}

/// Elliptical crop, see [`CropEllipse::new`].
pub fn crop_ellipse(cx: f32, cy: f32, rx: f32, ry: f32) -> Option<Filter> {
    CropEllipse::new(cx, cy, rx, ry).map(Filter::CropEllipse)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use pixfx_core::PixelLayout;

    fn indexed(w: u32, h: u32) -> PixelBuffer {
        PixelBuffer::from_fn(PixelLayout::RgbaF32, Rect::from_size(w, h), |x, y| {
            Pixel::new(x as f32 / 100.0, y as f32 / 100.0, 0.0, 1.0)
        })
    }

    #[test]
    fn test_full_frame_is_none() {
        assert!(CropRect::new(0.0, 0.0, 1.0, 1.0).is_none());
        assert!(CropRect::new(-1.0, -1.0, 5.0, 5.0).is_none());
        assert!(CropEllipse::new(0.5, 0.5, 1.0, 1.0).is_none());
        assert!(CropEllipse::new(0.5, 0.5, 0.5, 0.5).is_some());
    }

    #[test]
    fn test_rect_bounds() {
        let c = CropRect::new(0.5, 0.5, 0.5, 0.5).unwrap();
        assert_eq!(c.bounds(Rect::from_size(100, 100)).size(), (50, 50));
        // size trimmed to the frame
        let c = CropRect::new(0.75, 0.0, 0.5, 1.0).unwrap();
        assert_eq!(c.window(), (0.75, 0.0, 0.25, 1.0));
        assert_eq!(c.bounds(Rect::from_size(10, 10)).size(), (2, 10));
    }

    #[test]
    fn test_rect_apply() {
        let src = indexed(10, 10);
        let c = CropRect::new(0.2, 0.3, 0.5, 0.5).unwrap();
        let mut dst = PixelBuffer::new(PixelLayout::RgbaF32, c.bounds(src.bounds()));
        c.apply(&mut dst, &src, Parallelism::Sequential);
        let p = dst.pixel(0, 0);
        assert_abs_diff_eq!(p.r, 0.02, epsilon = 1e-6);
        assert_abs_diff_eq!(p.g, 0.03, epsilon = 1e-6);
        let p = dst.pixel(4, 4);
        assert_abs_diff_eq!(p.r, 0.06, epsilon = 1e-6);
    }

    #[test]
    fn test_nested_crops_merge() {
        let src = indexed(40, 40);
        let a = CropRect::new(0.5, 0.0, 0.5, 1.0).unwrap();
        let b = CropRect::new(0.5, 0.5, 0.5, 0.5).unwrap();

        let mut mid = PixelBuffer::new(PixelLayout::RgbaF32, a.bounds(src.bounds()));
        a.apply(&mut mid, &src, Parallelism::Sequential);
        let mut seq = PixelBuffer::new(PixelLayout::RgbaF32, b.bounds(mid.bounds()));
        b.apply(&mut seq, &mid, Parallelism::Sequential);

        let m = a.clone().merge(&b);
        assert_eq!(m.window(), (0.75, 0.5, 0.25, 0.5));
        let mut one = PixelBuffer::new(PixelLayout::RgbaF32, m.bounds(src.bounds()));
        m.apply(&mut one, &src, Parallelism::Sequential);
        assert_eq!(seq.to_pixels(), one.to_pixels());

        let back = m.undo(&b).unwrap();
        assert_eq!(back.window(), a.window());
        assert!(back.undo(&a).is_none());
    }

    #[test]
    fn test_ellipse_bounds_clipped() {
        let e = CropEllipse::new(0.2, 0.5, 0.4, 0.25).unwrap();
        // left edge clipped at 0, right edge at 0.6
        assert_eq!(e.bounds(Rect::from_size(100, 100)).size(), (60, 50));
    }

    #[test]
    fn test_ellipse_apply() {
        let src = PixelBuffer::filled(PixelLayout::RgbaF32, Rect::from_size(20, 20), Pixel::WHITE);
        let e = CropEllipse::new(0.5, 0.5, 0.5, 0.5).unwrap();
        let mut dst = PixelBuffer::new(PixelLayout::RgbaF32, e.bounds(src.bounds()));
        e.apply(&mut dst, &src, Parallelism::Sequential);
        assert_eq!(dst.bounds().size(), (20, 20));
        assert_eq!(dst.pixel(10, 10).a, 1.0);
        assert_eq!(dst.pixel(0, 0).a, 0.0);
        let edge = dst.pixel(2, 3).a;
        assert!(edge > 0.0 && edge < 1.0, "edge alpha {edge}");
    }
}
