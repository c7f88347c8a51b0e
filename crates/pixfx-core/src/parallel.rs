//! Row-band parallelism.
//!
//! Every filter writes its destination through [`for_each_band`]: the
//! destination rows are split into at most `workers` contiguous,
//! non-overlapping bands and each band is filled by the same closure.
//! With the `parallel` feature the bands run on the Rayon pool and are
//! joined before returning. Output never depends on the split because
//! each destination pixel is computed independently.
//!
//! # Example
//!
//! ```rust
//! use pixfx_core::parallel::split_range;
//!
//! assert_eq!(split_range(0, 10, 3), vec![0..4, 4..7, 7..10]);
//! assert_eq!(split_range(0, 2, 8), vec![0..1, 1..2]);
//! ```

use std::ops::Range;

#[cfg(feature = "parallel")]
use rayon::prelude::*;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::buffer::{PixelBuffer, RowBand};

/// Degree of parallelism for a filter application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Parallelism {
    /// Single band on the calling thread.
    Sequential,
    /// One band per Rayon worker thread.
    #[default]
    Auto,
    /// A fixed number of bands.
    Workers(usize),
}

impl Parallelism {
    /// Number of bands to split a destination into.
    ///
    /// Always 1 when the `parallel` feature is disabled.
    pub fn workers(self) -> usize {
        if !cfg!(feature = "parallel") {
            return 1;
        }
        match self {
            Self::Sequential => 1,
            Self::Auto => available_workers(),
            Self::Workers(n) => n.max(1),
        }
    }
}

impl From<bool> for Parallelism {
    fn from(parallel: bool) -> Self {
        if parallel { Self::Auto } else { Self::Sequential }
    }
}

#[cfg(feature = "parallel")]
fn available_workers() -> usize {
    rayon::current_num_threads()
}

#[cfg(not(feature = "parallel"))]
fn available_workers() -> usize {
    1
}

/// Splits `start..end` into `min(parts, end - start)` contiguous ranges.
///
/// The first `len % n` ranges are one element longer than the rest.
/// An empty input yields no ranges.
pub fn split_range(start: usize, end: usize, parts: usize) -> Vec<Range<usize>> {
    let len = end.saturating_sub(start);
    let n = parts.max(1).min(len);
    if n == 0 {
        return Vec::new();
    }

    let div = len / n;
    let rem = len % n;
    let mut out = Vec::with_capacity(n);
    let mut lo = start;
    for i in 0..n {
        let hi = lo + div + usize::from(i < rem);
        out.push(lo..hi);
        lo = hi;
    }
    out
}

/// Runs `f` over disjoint row bands of `dst`.
pub fn for_each_band<F>(dst: &mut PixelBuffer, par: Parallelism, f: F)
where
    F: Fn(&mut RowBand<'_>) + Sync + Send,
{
    let rows = dst.height() as usize;
    let ranges = split_range(0, rows, par.workers());
    trace!(rows, bands = ranges.len(), "for_each_band");

    let bands = dst.bands(&ranges);
    run_bands(bands, &f);
}

#[cfg(feature = "parallel")]
fn run_bands<F>(bands: Vec<RowBand<'_>>, f: &F)
where
    F: Fn(&mut RowBand<'_>) + Sync + Send,
{
    if bands.len() <= 1 {
        bands.into_iter().for_each(|mut b| f(&mut b));
        return;
    }
    bands.into_par_iter().for_each(|mut b| f(&mut b));
}

#[cfg(not(feature = "parallel"))]
fn run_bands<F>(bands: Vec<RowBand<'_>>, f: &F)
where
    F: Fn(&mut RowBand<'_>) + Sync + Send,
{
    bands.into_iter().for_each(|mut b| f(&mut b));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Pixel, PixelLayout, PixelSource, Rect};

    #[test]
    fn test_split_range_even() {
        assert_eq!(split_range(0, 8, 4), vec![0..2, 2..4, 4..6, 6..8]);
    }

    #[test]
    fn test_split_range_remainder() {
        let r = split_range(3, 13, 4);
        assert_eq!(r, vec![3..6, 6..9, 9..11, 11..13]);
        assert_eq!(r.iter().map(|r| r.len()).sum::<usize>(), 10);
    }

    #[test]
    fn test_split_range_degenerate() {
        assert!(split_range(5, 5, 4).is_empty());
        assert_eq!(split_range(0, 3, 0), vec![0..3]);
        assert_eq!(split_range(0, 3, 10).len(), 3);
    }

    #[test]
    fn test_from_bool() {
        assert_eq!(Parallelism::from(true), Parallelism::Auto);
        assert_eq!(Parallelism::from(false), Parallelism::Sequential);
        assert_eq!(Parallelism::Sequential.workers(), 1);
    }

    #[test]
    fn test_band_output_independent_of_workers() {
        let bounds = Rect::new(0, 2, 7, 13);
        let fill = |par| {
            let mut buf = PixelBuffer::new(PixelLayout::Rgba16, bounds);
            for_each_band(&mut buf, par, |band| {
                for y in band.rows() {
                    for x in 0..7 {
                        band.set(x, y, Pixel::gray((x + y) as f32 / 20.0));
                    }
                }
            });
            buf
        };
        let seq = fill(Parallelism::Sequential);
        let par = fill(Parallelism::Workers(5));
        assert_eq!(seq, par);
        assert!((seq.pixel(6, 14).r - 1.0).abs() < 1e-6);
    }
}
