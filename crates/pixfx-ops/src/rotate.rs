//! Rotation by an arbitrary angle around the image center.
//!
//! Angles are in radians, positive clockwise on screen (the same sense as
//! [`Transformer::Rotate90`]). The output grows to the rotated bounding
//! box; uncovered corners are transparent.
//!
//! Angles that land on a multiple of a quarter turn are executed by the
//! matching [`Transformer`], so they stay lossless.

use std::f32::consts::{FRAC_PI_2, TAU};

use pixfx_core::{Parallelism, PixelBuffer, PixelSource, Rect, for_each_band};
use tracing::trace;

use crate::filter::{Filter, MergeCount};
use crate::interp::{Interpolation, sample};
use crate::transform::Transformer;

const ANGLE_EPSILON: f32 = 1e-5;

/// Wraps `angle` into `[0, 2pi)`, snapping values within rounding noise of
/// a full turn to 0.
pub fn normalize_angle(angle: f32) -> f32 {
    let a = angle.rem_euclid(TAU);
    if a < ANGLE_EPSILON || TAU - a < ANGLE_EPSILON { 0.0 } else { a }
}

/// Rotation filter.
#[derive(Debug, Clone, PartialEq)]
pub struct RotateFilter {
    angle: f32,
    interpolation: Interpolation,
    /// Interpolation in effect before each merged rotation.
    previous: Vec<Interpolation>,
    merges: MergeCount,
}

impl RotateFilter {
    /// `None` when `angle` is a whole number of turns.
    pub fn new(angle: f32, interpolation: Interpolation) -> Option<Self> {
        let angle = normalize_angle(angle);
        (angle != 0.0).then(|| Self {
            angle,
            interpolation,
            previous: Vec::new(),
            merges: MergeCount::ONE,
        })
    }

    /// Accumulated angle in `[0, 2pi)`.
    pub fn angle(&self) -> f32 {
        self.angle
    }

    /// Interpolation of the most recently merged rotation.
    pub fn interpolation(&self) -> Interpolation {
        self.interpolation
    }

    /// The equivalent transformer when the angle is a quarter-turn multiple.
    pub fn as_transformer(&self) -> Option<Transformer> {
        let turns = self.angle / FRAC_PI_2;
        let k = turns.round();
        ((turns - k).abs() * FRAC_PI_2 < ANGLE_EPSILON).then(|| Transformer::from_quarter_turns(k as u8))
    }

    /// `true` for a zero angle.
    pub fn skip(&self) -> bool {
        self.angle == 0.0
    }

    /// Bounding box of the rotated image, same origin as `src`.
    pub fn bounds(&self, src: Rect) -> Rect {
        if let Some(t) = self.as_transformer() {
            return t.bounds(src);
        }
        let (sin, cos) = self.angle.sin_cos();
        let (w, h) = (src.width as f32, src.height as f32);
        let width = (w * cos.abs() + h * sin.abs()).round() as u32;
        let height = (w * sin.abs() + h * cos.abs()).round() as u32;
        src.with_size(width, height)
    }

    /// Adds `other`'s angle; its interpolation takes over.
    pub fn merge(mut self, other: &RotateFilter) -> Self {
        self.angle = normalize_angle(self.angle + other.angle);
        self.previous.push(self.interpolation);
        self.interpolation = other.interpolation;
        self.merges = self.merges.inc();
        self
    }

    /// Removes `other`'s angle and restores the interpolation it replaced.
    pub fn undo(mut self, other: &RotateFilter) -> Option<Self> {
        self.angle = normalize_angle(self.angle - other.angle);
        if let Some(prev) = self.previous.pop() {
            self.interpolation = prev;
        }
        self.merges = self.merges.dec();
        self.into_remaining()
    }

    /// Adds a quarter-turn transformer. Any other transformer is refused.
    pub fn merge_transform(mut self, t: Transformer) -> Result<Self, Self> {
        let Some(turns) = t.quarter_turns() else {
            return Err(self);
        };
        self.angle = normalize_angle(self.angle + f32::from(turns) * FRAC_PI_2);
        self.merges = self.merges.inc();
        Ok(self)
    }

    /// Removes a quarter-turn transformer.
    pub fn undo_transform(mut self, t: Transformer) -> Result<Option<Self>, Self> {
        let Some(turns) = t.quarter_turns() else {
            return Err(self);
        };
        self.angle = normalize_angle(self.angle - f32::from(turns) * FRAC_PI_2);
        self.merges = self.merges.dec();
        Ok(self.into_remaining())
    }

    fn into_remaining(self) -> Option<Self> {
        (!self.merges.is_exhausted() && !self.skip()).then_some(self)
    }

    /// Renders the rotation of `src` into `dst`.
    pub fn apply(&self, dst: &mut PixelBuffer, src: &dyn PixelSource, par: Parallelism) {
        if self.skip() {
            dst.copy_from(src, par);
            return;
        }
        if let Some(t) = self.as_transformer() {
            trace!(transformer = ?t, "RotateFilter::apply quarter turn");
            t.apply(dst, src, par);
            return;
        }

        let dst_bounds = dst.bounds();
        let src_bounds = src.bounds();
        let interp = self.interpolation;
        trace!(
            angle = self.angle,
            ?interp,
            width = dst_bounds.width,
            height = dst_bounds.height,
            "RotateFilter::apply"
        );

        let (sin, cos) = self.angle.sin_cos();
        let half_dw = dst_bounds.width as f32 / 2.0;
        let half_dh = dst_bounds.height as f32 / 2.0;
        // source pixel centers sit at integer coordinates
        let cx = src_bounds.min_x() as f32 + src_bounds.width as f32 / 2.0 - 0.5;
        let cy = src_bounds.min_y() as f32 + src_bounds.height as f32 / 2.0 - 0.5;

        for_each_band(dst, par, |band| {
            let mut row = Vec::with_capacity(dst_bounds.width as usize);
            for y in band.rows() {
                let yc = (y - dst_bounds.min_y()) as f32 + 0.5 - half_dh;
                row.clear();
                row.extend((0..dst_bounds.width).map(|x| {
                    let xc = x as f32 + 0.5 - half_dw;
                    let sx = cos * xc + sin * yc + cx;
                    let sy = -sin * xc + cos * yc + cy;
                    sample(src, sx, sy, interp)
                }));
                band.set_row(y, &row);
            }
        });
    }
}

/// Rotation by `angle` radians clockwise; `None` for whole turns.
pub fn rotate(angle: f32, interpolation: Interpolation) -> Option<Filter> {
    RotateFilter::new(angle, interpolation).map(Filter::Rotate)
}

/// Rotation by `degrees` clockwise; `None` for whole turns.
pub fn rotate_degrees(degrees: f32, interpolation: Interpolation) -> Option<Filter> {
    rotate(degrees.to_radians(), interpolation)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use pixfx_core::{Pixel, PixelLayout};
    use std::f32::consts::{FRAC_PI_4, PI};

    fn render(f: &RotateFilter, src: &PixelBuffer) -> PixelBuffer {
        let mut dst = PixelBuffer::new(PixelLayout::RgbaF32, f.bounds(src.bounds()));
        f.apply(&mut dst, src, Parallelism::Sequential);
        dst
    }

    #[test]
    fn test_normalize_angle() {
        assert_eq!(normalize_angle(TAU), 0.0);
        assert_eq!(normalize_angle(-TAU), 0.0);
        assert_abs_diff_eq!(normalize_angle(-FRAC_PI_2), 3.0 * FRAC_PI_2, epsilon = 1e-6);
        assert!(RotateFilter::new(0.0, Interpolation::Nearest).is_none());
        assert!(RotateFilter::new(2.0 * TAU, Interpolation::Nearest).is_none());
    }

    #[test]
    fn test_bounds() {
        let r = RotateFilter::new(FRAC_PI_2, Interpolation::Bilinear).unwrap();
        assert_eq!(r.bounds(Rect::from_size(100, 60)).size(), (60, 100));
        let r = RotateFilter::new(FRAC_PI_4, Interpolation::Bilinear).unwrap();
        assert_eq!(r.bounds(Rect::from_size(10, 10)).size(), (14, 14));
        let r = RotateFilter::new(PI, Interpolation::Bilinear).unwrap();
        assert_eq!(r.bounds(Rect::new(5, 5, 30, 20)), Rect::new(5, 5, 30, 20));
    }

    #[test]
    fn test_quarter_turn_is_lossless() {
        let src = PixelBuffer::from_fn(PixelLayout::RgbaF32, Rect::from_size(3, 2), |x, y| {
            Pixel::gray((y * 3 + x) as f32 / 10.0)
        });
        let r = RotateFilter::new(FRAC_PI_2, Interpolation::Bicubic).unwrap();
        assert_eq!(r.as_transformer(), Some(Transformer::Rotate90));
        let mut expected = PixelBuffer::new(PixelLayout::RgbaF32, Rect::from_size(2, 3));
        Transformer::Rotate90.apply(&mut expected, &src, Parallelism::Sequential);
        assert_eq!(render(&r, &src).to_pixels(), expected.to_pixels());
    }

    #[test]
    fn test_merge_with_transformer() {
        let r = RotateFilter::new(0.3, Interpolation::Nearest).unwrap();
        let m = r.clone().merge_transform(Transformer::Rotate270).unwrap();
        assert_abs_diff_eq!(m.angle(), 0.3 + 3.0 * FRAC_PI_2, epsilon = 1e-5);
        assert!(m.clone().merge_transform(Transformer::FlipH).is_err());
        let back = m.undo_transform(Transformer::Rotate270).unwrap().unwrap();
        assert_abs_diff_eq!(back.angle(), 0.3, epsilon = 1e-5);
    }

    #[test]
    fn test_merge_undo_restores_interpolation() {
        let a = RotateFilter::new(0.5, Interpolation::Nearest).unwrap();
        let b = RotateFilter::new(0.25, Interpolation::Bicubic).unwrap();
        let m = a.clone().merge(&b);
        assert_eq!(m.interpolation(), Interpolation::Bicubic);
        assert_abs_diff_eq!(m.angle(), 0.75, epsilon = 1e-6);
        let back = m.undo(&b).unwrap();
        assert_eq!(back.interpolation(), Interpolation::Nearest);
        assert_abs_diff_eq!(back.angle(), 0.5, epsilon = 1e-6);
        assert!(back.undo(&a).is_none());
    }

    #[test]
    fn test_opposite_rotations_cancel() {
        let a = RotateFilter::new(1.0, Interpolation::Bilinear).unwrap();
        let b = RotateFilter::new(-1.0, Interpolation::Bilinear).unwrap();
        assert!(a.merge(&b).skip());
    }

    #[test]
    fn test_center_is_preserved() {
        // odd-sized uniform image keeps its center pixel under any angle
        let src = PixelBuffer::filled(PixelLayout::RgbaF32, Rect::from_size(9, 9), Pixel::gray(0.25));
        for interp in [Interpolation::Nearest, Interpolation::Bilinear, Interpolation::Bicubic] {
            let r = RotateFilter::new(0.4, interp).unwrap();
            let out = render(&r, &src);
            let b = out.bounds();
            let p = out.pixel(b.width as i32 / 2, b.height as i32 / 2);
            assert!(p.max_diff(Pixel::gray(0.25)) < 1e-4, "{interp:?}");
            // corners fall outside the source
            assert_eq!(out.pixel(0, 0).a, 0.0);
        }
    }
}
