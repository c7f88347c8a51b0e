//! Error types for pixfx-core.
//!
//! Filters never fail: bad parameters are clamped and out-of-bounds pixel
//! access resolves to a transparent pixel. The only fallible surface is
//! wrapping caller-provided sample storage into a [`PixelBuffer`].
//!
//! # Usage
//!
//! ```rust
//! use pixfx_core::{PixelBuffer, PixelLayout, Rect};
//!
//! let err = PixelBuffer::from_u8(PixelLayout::Rgba8, Rect::from_size(2, 2), vec![0; 3])
//!     .unwrap_err();
//! assert!(err.is_length_error());
//! ```
//!
//! # Used By
//!
//! - [`crate::buffer::PixelBuffer`] - Raw sample construction
//!
//! [`PixelBuffer`]: crate::buffer::PixelBuffer

use thiserror::Error;

use crate::format::PixelLayout;

/// Result type alias using [`Error`] as the error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while building pixel buffers from raw samples.
#[derive(Debug, Error)]
pub enum Error {
    /// Sample vector length does not match `width * height * channels`.
    #[error("sample count mismatch for {width}x{height} {layout}: expected {expected}, got {got}")]
    SampleCount {
        /// Buffer layout
        layout: PixelLayout,
        /// Buffer width
        width: u32,
        /// Buffer height
        height: u32,
        /// Expected sample count
        expected: usize,
        /// Provided sample count
        got: usize,
    },

    /// Sample type does not match the layout (e.g. `u16` samples for `Rgba8`).
    #[error("{layout} does not store {sample} samples")]
    SampleType {
        /// Buffer layout
        layout: PixelLayout,
        /// Name of the provided sample type
        sample: &'static str,
    },

    /// Buffer dimensions overflow `usize` sample indexing.
    #[error("invalid dimensions: {width}x{height} ({reason})")]
    InvalidDimensions {
        /// Requested width
        width: u32,
        /// Requested height
        height: u32,
        /// Reason why dimensions are invalid
        reason: String,
    },
}

impl Error {
    /// Creates an [`Error::SampleCount`] error.
    #[inline]
    pub fn sample_count(
        layout: PixelLayout,
        width: u32,
        height: u32,
        expected: usize,
        got: usize,
    ) -> Self {
        Self::SampleCount {
            layout,
            width,
            height,
            expected,
            got,
        }
    }

    /// Creates an [`Error::SampleType`] error.
    #[inline]
    pub fn sample_type(layout: PixelLayout, sample: &'static str) -> Self {
        Self::SampleType { layout, sample }
    }

    /// Creates an [`Error::InvalidDimensions`] error.
    #[inline]
    pub fn invalid_dimensions(width: u32, height: u32, reason: impl Into<String>) -> Self {
        Self::InvalidDimensions {
            width,
            height,
            reason: reason.into(),
        }
    }

    /// Returns `true` if the sample vector had the wrong length.
    #[inline]
    pub fn is_length_error(&self) -> bool {
        matches!(self, Self::SampleCount { .. })
    }

    /// Returns `true` if the sample vector had the wrong element type.
    #[inline]
    pub fn is_type_error(&self) -> bool {
        matches!(self, Self::SampleType { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_count_message() {
        let err = Error::sample_count(PixelLayout::Rgba8, 4, 2, 32, 30);
        let msg = err.to_string();
        assert!(msg.contains("4x2"));
        assert!(msg.contains("32"));
        assert!(msg.contains("30"));
        assert!(err.is_length_error());
        assert!(!err.is_type_error());
    }

    #[test]
    fn test_sample_type_message() {
        let err = Error::sample_type(PixelLayout::Gray16, "u8");
        assert!(err.to_string().contains("u8"));
        assert!(err.is_type_error());
    }
}
