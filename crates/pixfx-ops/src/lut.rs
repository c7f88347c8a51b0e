//! Lookup tables for per-channel functions.
//!
//! A channel function `f: [0, 1] -> [0, 1]` is sampled at `n` evenly spaced
//! points and later evaluated by nearest-index lookup. The table size is
//! chosen from the source's [`SampleDepth`] so that every representable
//! input value has its own entry.
//!
//! Building a table costs `n` evaluations, so it only pays off once the
//! image needs more than `2n` of them (three channels per pixel), see
//! [`worth_building`].
//!
//! # Example
//!
//! ```rust
//! use pixfx_ops::lut::Lut;
//!
//! let lut = Lut::build(256, |x| 1.0 - x);
//! assert_eq!(lut.len(), 256);
//! assert!((lut.lookup(0.25) - 0.75).abs() < 1.0 / 255.0);
//! ```

use std::fmt;
use std::sync::OnceLock;

use pixfx_core::{Rect, SampleDepth};
use tracing::debug;

/// A sampled 1D function over `[0, 1]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Lut {
    table: Vec<f32>,
}

impl Lut {
    /// Samples `f` at `i / (size - 1)` for `i` in `0..size`.
    ///
    /// # Panics
    ///
    /// Panics if `size < 2`.
    pub fn build(size: usize, f: impl Fn(f32) -> f32) -> Self {
        assert!(size >= 2, "lookup table needs at least two entries");
        let q = 1.0 / (size - 1) as f32;
        let table = (0..size).map(|i| f(i as f32 * q)).collect();
        Self { table }
    }

    /// Number of entries.
    #[inline]
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// Always `false`; tables have at least two entries.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Nearest-entry lookup. Input is clamped to `[0, 1]`.
    #[inline]
    pub fn lookup(&self, x: f32) -> f32 {
        let n = (self.table.len() - 1) as f32;
        let i = (x.clamp(0.0, 1.0) * n).round() as usize;
        self.table[i]
    }
}

/// Returns `true` when a table for `depth` is cheaper than direct
/// evaluation over every color channel of `bounds`.
#[inline]
pub fn worth_building(bounds: Rect, depth: SampleDepth) -> bool {
    bounds.area() * 3 > 2 * depth.lut_size() as u64
}

/// Lazily built tables for one channel function, one slot per table size.
///
/// Cloning yields an empty cache: a cloned filter is usually about to be
/// merged, which changes its function.
#[derive(Default)]
pub struct LutCache {
    narrow: OnceLock<Lut>,
    wide: OnceLock<Lut>,
}

impl LutCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the table for `depth`, building it from `f` on first use.
    pub fn get_or_build(&self, depth: SampleDepth, f: impl Fn(f32) -> f32) -> &Lut {
        let slot = match depth {
            SampleDepth::Eight => &self.narrow,
            SampleDepth::Sixteen | SampleDepth::Other => &self.wide,
        };
        slot.get_or_init(|| {
            let size = depth.lut_size();
            debug!(size, "Building channel lookup table");
            Lut::build(size, f)
        })
    }

    /// Drops every built table.
    pub fn clear(&mut self) {
        self.narrow = OnceLock::new();
        self.wide = OnceLock::new();
    }
}

impl Clone for LutCache {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl fmt::Debug for LutCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LutCache")
            .field("narrow", &self.narrow.get().map(Lut::len))
            .field("wide", &self.wide.get().map(Lut::len))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_endpoints() {
        let lut = Lut::build(256, |x| x * x);
        assert_eq!(lut.lookup(0.0), 0.0);
        assert_eq!(lut.lookup(1.0), 1.0);
        assert_eq!(lut.lookup(2.0), 1.0);
        assert_eq!(lut.lookup(-1.0), 0.0);
    }

    #[test]
    fn test_worth_building() {
        // 8-bit: threshold is 512 evaluations, i.e. more than 170 pixels
        assert!(!worth_building(Rect::from_size(10, 17), SampleDepth::Eight));
        assert!(worth_building(Rect::from_size(10, 18), SampleDepth::Eight));
        assert!(!worth_building(Rect::from_size(100, 100), SampleDepth::Sixteen));
        assert!(worth_building(Rect::from_size(256, 256), SampleDepth::Other));
    }

    #[test]
    fn test_cache_builds_once_per_size() {
        let cache = LutCache::new();
        let a = cache.get_or_build(SampleDepth::Eight, |x| x).len();
        let b = cache.get_or_build(SampleDepth::Sixteen, |x| x).len();
        assert_eq!((a, b), (256, 65536));
        // second call must not rebuild with the new function
        assert_eq!(cache.get_or_build(SampleDepth::Eight, |_| 0.5).lookup(1.0), 1.0);
        assert_eq!(cache.get_or_build(SampleDepth::Other, |_| 0.5).lookup(1.0), 1.0);
    }

    #[test]
    fn test_clone_is_empty() {
        let cache = LutCache::new();
        cache.get_or_build(SampleDepth::Eight, |x| x);
        let copy = cache.clone();
        assert_eq!(copy.get_or_build(SampleDepth::Eight, |_| 0.25).lookup(0.9), 0.25);
    }
}
