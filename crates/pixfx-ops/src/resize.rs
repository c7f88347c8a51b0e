//! Separable resampling.
//!
//! Resizing runs as two one-dimensional convolutions: rows first into a
//! float temporary of `dst_width x src_height`, then columns into the
//! destination. An axis whose length does not change is not convolved at
//! all, and the [`Nearest`](ResampleKernel::Nearest) kernel maps indices
//! directly.
//!
//! # Kernels
//!
//! | kernel          | support | notes                            |
//! |-----------------|---------|----------------------------------|
//! | `Nearest`       | 0       | index mapping, no convolution    |
//! | `Box`           | 0.5     | area average when downscaling    |
//! | `Bilinear`      | 1       | triangle                         |
//! | `Bicubic`       | 2       | Keys, `a = -0.5`                 |
//! | `BicubicSharp`  | 2       | Keys, `a = -0.75`                |
//! | `BSpline`       | 2       | cubic B-spline, no overshoot     |
//! | `Mitchell`      | 2       | Mitchell-Netravali `B = C = 1/3` |
//! | `CatmullRom`    | 2       | `B = 0, C = 1/2`                 |
//! | `LanczosN`      | N       | windowed sinc, N = 3, 4, 6, 12   |
//! | `Custom`        | any     | caller-supplied [`CustomKernel`] |
//!
//! When shrinking, the kernel is stretched by the inverse scale so every
//! source pixel contributes. The per-axis `filter_scale` stretches it
//! further (blurrier) or narrows it (sharper).
//!
//! # Example
//!
//! ```rust
//! use pixfx_core::{Parallelism, Pixel, PixelBuffer, PixelLayout, PixelSource, Rect};
//! use pixfx_ops::resize::{resample, ResampleKernel};
//!
//! let src = PixelBuffer::filled(PixelLayout::Nrgba8, Rect::from_size(8, 8), Pixel::gray(0.5));
//! let mut dst = PixelBuffer::new(PixelLayout::Nrgba8, Rect::from_size(3, 5));
//! resample(&mut dst, &src, &ResampleKernel::Lanczos3, (1.0, 1.0), Parallelism::Auto);
//! assert!((dst.pixel(1, 2).r - 0.5).abs() < 0.01);
//! ```

use std::f32::consts::PI;
use std::fmt;
use std::sync::Arc;

use pixfx_core::{Parallelism, Pixel, PixelBuffer, PixelLayout, PixelSource, Rect, for_each_band};
use tracing::{debug, trace};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::filter::Filter;
use crate::interp::{Premul, keys_cubic};

/// Smallest accepted `filter_scale`.
pub const MIN_FILTER_SCALE: f32 = 0.01;

/// User-supplied resampling kernel.
///
/// `kernel` should be even and zero outside `[-support, support]`. A
/// support of 0 selects nearest-index mapping and never calls `kernel`.
#[derive(Clone)]
pub struct CustomKernel {
    kernel: Arc<dyn Fn(f32) -> f32 + Send + Sync>,
    support: f32,
}

impl CustomKernel {
    /// Wraps `kernel` with half-width `support` (negative values become 0).
    pub fn new(kernel: impl Fn(f32) -> f32 + Send + Sync + 'static, support: f32) -> Self {
        Self {
            kernel: Arc::new(kernel),
            support: support.max(0.0),
        }
    }

    /// Half-width of the non-zero region.
    #[inline]
    pub fn support(&self) -> f32 {
        self.support
    }

    /// Evaluates the kernel at `x`.
    #[inline]
    pub fn weight(&self, x: f32) -> f32 {
        (self.kernel)(x)
    }
}

impl fmt::Debug for CustomKernel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomKernel").field("support", &self.support).finish_non_exhaustive()
    }
}

/// Equal when both wrap the same closure with the same support.
impl PartialEq for CustomKernel {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.kernel, &other.kernel) && self.support == other.support
    }
}

/// Resampling kernel catalog.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ResampleKernel {
    /// Closest source pixel.
    Nearest,
    /// Unit box.
    Box,
    /// Triangle.
    Bilinear,
    /// Keys cubic, `a = -0.5`.
    #[default]
    Bicubic,
    /// Keys cubic, `a = -0.75`.
    BicubicSharp,
    /// Cubic B-spline.
    BSpline,
    /// Mitchell-Netravali, `B = C = 1/3`.
    Mitchell,
    /// Catmull-Rom, `B = 0, C = 1/2`.
    CatmullRom,
    /// Lanczos, 3 lobes.
    Lanczos3,
    /// Lanczos, 4 lobes.
    Lanczos4,
    /// Lanczos, 6 lobes.
    Lanczos6,
    /// Lanczos, 12 lobes.
    Lanczos12,
    /// Caller-supplied kernel. Not serializable.
    #[cfg_attr(feature = "serde", serde(skip))]
    Custom(CustomKernel),
}

impl ResampleKernel {
    /// Every built-in kernel, cheapest first.
    pub const ALL: [ResampleKernel; 12] = [
        Self::Nearest,
        Self::Box,
        Self::Bilinear,
        Self::Bicubic,
        Self::BicubicSharp,
        Self::BSpline,
        Self::Mitchell,
        Self::CatmullRom,
        Self::Lanczos3,
        Self::Lanczos4,
        Self::Lanczos6,
        Self::Lanczos12,
    ];

    /// Half-width of the non-zero region.
    #[inline]
    pub fn support(&self) -> f32 {
        match self {
            Self::Custom(k) => k.support(),
            Self::Nearest => 0.0,
            Self::Box => 0.5,
            Self::Bilinear => 1.0,
            Self::Bicubic | Self::BicubicSharp | Self::BSpline | Self::Mitchell | Self::CatmullRom => 2.0,
            Self::Lanczos3 => 3.0,
            Self::Lanczos4 => 4.0,
            Self::Lanczos6 => 6.0,
            Self::Lanczos12 => 12.0,
        }
    }

    /// Evaluates the kernel at `x`.
    #[inline]
    pub fn weight(&self, x: f32) -> f32 {
        match self {
            Self::Custom(k) => k.weight(x),
            Self::Nearest | Self::Box => box_weight(x),
            Self::Bilinear => bilinear_weight(x),
            Self::Bicubic => keys_cubic(x, -0.5),
            Self::BicubicSharp => keys_cubic(x, -0.75),
            Self::BSpline => bspline_weight(x),
            Self::Mitchell => mitchell_weight(x, 1.0 / 3.0, 1.0 / 3.0),
            Self::CatmullRom => mitchell_weight(x, 0.0, 0.5),
            Self::Lanczos3 => lanczos_weight(x, 3.0),
            Self::Lanczos4 => lanczos_weight(x, 4.0),
            Self::Lanczos6 => lanczos_weight(x, 6.0),
            Self::Lanczos12 => lanczos_weight(x, 12.0),
        }
    }
}

#[inline]
fn box_weight(x: f32) -> f32 {
    if x.abs() < 0.5 { 1.0 } else { 0.0 }
}

#[inline]
fn bilinear_weight(x: f32) -> f32 {
    let ax = x.abs();
    if ax < 1.0 { 1.0 - ax } else { 0.0 }
}

#[inline]
fn bspline_weight(x: f32) -> f32 {
    let ax = x.abs();
    if ax < 1.0 {
        0.5 * ax * ax * ax - ax * ax + 2.0 / 3.0
    } else if ax < 2.0 {
        let t = 2.0 - ax;
        t * t * t / 6.0
    } else {
        0.0
    }
}

/// Mitchell-Netravali cubic family.
#[inline]
fn mitchell_weight(x: f32, b: f32, c: f32) -> f32 {
    let ax = x.abs();
    if ax < 1.0 {
        ((12.0 - 9.0 * b - 6.0 * c) * ax * ax * ax + (-18.0 + 12.0 * b + 6.0 * c) * ax * ax + (6.0 - 2.0 * b))
            / 6.0
    } else if ax < 2.0 {
        ((-b - 6.0 * c) * ax * ax * ax
            + (6.0 * b + 30.0 * c) * ax * ax
            + (-12.0 * b - 48.0 * c) * ax
            + (8.0 * b + 24.0 * c))
            / 6.0
    } else {
        0.0
    }
}

#[inline]
fn lanczos_weight(x: f32, a: f32) -> f32 {
    let ax = x.abs();
    if ax < 1e-8 {
        1.0
    } else if ax < a {
        let pi_x = PI * ax;
        let pi_x_a = pi_x / a;
        (pi_x.sin() / pi_x) * (pi_x_a.sin() / pi_x_a)
    } else {
        0.0
    }
}

/// One source sample feeding a destination sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tap {
    /// Source index along the axis, from the leading edge.
    pub index: usize,
    /// Normalized weight.
    pub weight: f32,
}

/// Per-destination source windows for one axis.
///
/// Each window's weights sum to 1.
#[derive(Debug, Clone, PartialEq)]
pub struct Contributions {
    windows: Vec<Vec<Tap>>,
}

impl Contributions {
    /// Builds the windows for resizing `src_len` samples to `dst_len`.
    ///
    /// # Panics
    ///
    /// Panics if `src_len` is 0.
    pub fn new(src_len: usize, dst_len: usize, kernel: &ResampleKernel, filter_scale: f32) -> Self {
        assert!(src_len > 0, "cannot resample an empty axis");
        let delta = dst_len as f64 / src_len as f64;
        let last = src_len - 1;

        let support = f64::from(kernel.support());
        if support <= 0.0 {
            let windows = (0..dst_len)
                .map(|i| {
                    let index = (((i as f64 + 0.5) / delta).floor() as usize).min(last);
                    vec![Tap { index, weight: 1.0 }]
                })
                .collect();
            return Self { windows };
        }

        let scale = delta.min(1.0);
        let filter_scale = f64::from(filter_scale.max(MIN_FILTER_SCALE));
        let radius = support / scale * filter_scale;

        let windows = (0..dst_len)
            .map(|i| {
                let center = (i as f64 + 0.5) / delta - 0.5;
                let left = (center - radius).floor().max(0.0) as usize;
                let right = ((center + radius).ceil().max(0.0) as usize).min(last);

                let mut taps: Vec<Tap> = (left..=right)
                    .filter_map(|j| {
                        let x = (center - j as f64) * scale / filter_scale;
                        let weight = kernel.weight(x as f32);
                        (weight != 0.0).then_some(Tap { index: j, weight })
                    })
                    .collect();

                let sum: f32 = taps.iter().map(|t| t.weight).sum();
                if taps.is_empty() || sum.abs() < 1e-6 {
                    let index = (center.round().max(0.0) as usize).min(last);
                    return vec![Tap { index, weight: 1.0 }];
                }
                taps.iter_mut().for_each(|t| t.weight /= sum);
                taps
            })
            .collect();
        Self { windows }
    }

    /// Number of destination samples.
    pub fn len(&self) -> usize {
        self.windows.len()
    }

    /// `true` when the destination axis is empty.
    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }

    /// Window for destination sample `i`.
    pub fn get(&self, i: usize) -> &[Tap] {
        &self.windows[i]
    }

    /// Every window in destination order.
    pub fn iter(&self) -> impl Iterator<Item = &[Tap]> {
        self.windows.iter().map(Vec::as_slice)
    }
}

/// Resizes `src` to fill `dst`.
///
/// `filter_scale` is the per-axis kernel stretch `(x, y)`, 1 for none.
pub fn resample(
    dst: &mut PixelBuffer,
    src: &dyn PixelSource,
    kernel: &ResampleKernel,
    filter_scale: (f32, f32),
    par: Parallelism,
) {
    let sb = src.bounds();
    let db = dst.bounds();
    trace!(
        src_width = sb.width,
        src_height = sb.height,
        width = db.width,
        height = db.height,
        ?kernel,
        "resample"
    );

    if sb.size() == db.size() {
        debug!("Same size, copying");
        dst.copy_from(src, par);
        return;
    }
    if sb.is_empty() {
        for_each_band(dst, par, |band| {
            let row = vec![Pixel::TRANSPARENT; db.width as usize];
            for y in band.rows() {
                band.set_row(y, &row);
            }
        });
        return;
    }

    let horizontal = sb.width != db.width;
    let vertical = sb.height != db.height;

    match (horizontal, vertical) {
        (true, false) => {
            let cx = Contributions::new(sb.width as usize, db.width as usize, kernel, filter_scale.0);
            resample_rows(dst, src, &cx, par);
        }
        (false, true) => {
            let cy = Contributions::new(sb.height as usize, db.height as usize, kernel, filter_scale.1);
            resample_columns(dst, src, &cy, par);
        }
        _ => {
            let cx = Contributions::new(sb.width as usize, db.width as usize, kernel, filter_scale.0);
            let cy = Contributions::new(sb.height as usize, db.height as usize, kernel, filter_scale.1);
            let mut tmp = PixelBuffer::new(PixelLayout::RgbaF32, Rect::new(sb.x, sb.y, db.width, sb.height));
            resample_rows(&mut tmp, src, &cx, par);
            resample_columns(dst, &tmp, &cy, par);
        }
    }
}

/// Convolves every row of `src` into the matching row of `dst`.
fn resample_rows(dst: &mut PixelBuffer, src: &dyn PixelSource, cx: &Contributions, par: Parallelism) {
    let db = dst.bounds();
    let sy0 = src.bounds().min_y();
    for_each_band(dst, par, |band| {
        let mut line = Vec::new();
        let mut out = Vec::with_capacity(cx.len());
        for y in band.rows() {
            src.read_row(sy0 + (y - db.min_y()), &mut line);
            out.clear();
            out.extend(cx.iter().map(|taps| {
                let mut acc = Premul::default();
                for t in taps {
                    acc.add(line[t.index], t.weight);
                }
                acc.resolve()
            }));
            band.set_row(y, &out);
        }
    });
}

/// Convolves the columns of `src` into `dst`, one destination row at a time.
fn resample_columns(dst: &mut PixelBuffer, src: &dyn PixelSource, cy: &Contributions, par: Parallelism) {
    let db = dst.bounds();
    let sy0 = src.bounds().min_y();
    let width = db.width as usize;
    for_each_band(dst, par, |band| {
        let mut line = Vec::new();
        let mut acc = vec![Premul::default(); width];
        let mut out = Vec::with_capacity(width);
        for y in band.rows() {
            acc.iter_mut().for_each(|a| *a = Premul::default());
            for t in cy.get((y - db.min_y()) as usize) {
                src.read_row(sy0 + t.index as i32, &mut line);
                for (a, p) in acc.iter_mut().zip(&line) {
                    a.add(*p, t.weight);
                }
            }
            out.clear();
            out.extend(acc.iter().map(|a| a.resolve()));
            band.set_row(y, &out);
        }
    });
}

/// Resize to an absolute size.
#[derive(Debug, Clone, PartialEq)]
pub struct ResizeFilter {
    width: u32,
    height: u32,
    kernel: ResampleKernel,
    filter_scale: (f32, f32),
}

impl ResizeFilter {
    /// Resize to `width x height` with `kernel`.
    pub fn new(width: u32, height: u32, kernel: ResampleKernel) -> Self {
        Self {
            width,
            height,
            kernel,
            filter_scale: (1.0, 1.0),
        }
    }

    /// Sets the per-axis kernel stretch, clamped to at least
    /// [`MIN_FILTER_SCALE`].
    pub fn with_filter_scale(mut self, x: f32, y: f32) -> Self {
        self.filter_scale = (x.max(MIN_FILTER_SCALE), y.max(MIN_FILTER_SCALE));
        self
    }

    /// Target size.
    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Resampling kernel.
    pub fn kernel(&self) -> &ResampleKernel {
        &self.kernel
    }

    /// `width x height`, same origin as `src`.
    pub fn bounds(&self, src: Rect) -> Rect {
        src.with_size(self.width, self.height)
    }

    /// See [`resample`].
    pub fn apply(&self, dst: &mut PixelBuffer, src: &dyn PixelSource, par: Parallelism) {
        resample(dst, src, &self.kernel, self.filter_scale, par);
    }
}

/// Resize to `width x height`.
pub fn resize(width: u32, height: u32, kernel: ResampleKernel) -> Filter {
    Filter::Resize(ResizeFilter::new(width, height, kernel))
}
