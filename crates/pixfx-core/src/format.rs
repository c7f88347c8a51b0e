//! Pixel buffer layouts and sample depth classes.
//!
//! # Types
//!
//! - [`PixelLayout`] - Storage encoding of a [`PixelBuffer`](crate::PixelBuffer)
//! - [`SampleDepth`] - Precision class used to size lookup tables
//!
//! # Usage
//!
//! ```rust
//! use pixfx_core::format::{PixelLayout, SampleDepth};
//!
//! let layout = PixelLayout::Rgba8;
//! assert!(layout.is_premultiplied());
//! assert_eq!(layout.depth(), SampleDepth::Eight);
//! assert_eq!(layout.depth().lut_size(), 256);
//! ```

use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Precision class of a pixel source.
///
/// Only consulted by per-channel filters to decide how large a lookup
/// table must be to reproduce every representable input value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SampleDepth {
    /// 8 bits per channel.
    Eight,
    /// 16 bits per channel.
    Sixteen,
    /// Float or unknown storage.
    #[default]
    Other,
}

impl SampleDepth {
    /// Number of lookup table entries needed for this depth.
    ///
    /// 256 for 8-bit sources, 65536 for everything else.
    #[inline]
    pub const fn lut_size(self) -> usize {
        match self {
            Self::Eight => 256,
            Self::Sixteen | Self::Other => 65536,
        }
    }
}

/// Storage encoding of a pixel buffer.
///
/// Integer layouts are stored row-major with interleaved channels.
/// Premultiplied layouts store color scaled by alpha.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum PixelLayout {
    /// 8-bit RGBA, premultiplied alpha.
    Rgba8,
    /// 16-bit RGBA, premultiplied alpha.
    Rgba16,
    /// 8-bit RGBA, straight alpha.
    Nrgba8,
    /// 16-bit RGBA, straight alpha.
    Nrgba16,
    /// 8-bit luminance, opaque.
    Gray8,
    /// 16-bit luminance, opaque.
    Gray16,
    /// 32-bit float RGBA, straight alpha.
    #[default]
    RgbaF32,
}

impl PixelLayout {
    /// Interleaved samples per pixel.
    #[inline]
    pub const fn channels(self) -> usize {
        match self {
            Self::Gray8 | Self::Gray16 => 1,
            _ => 4,
        }
    }

    /// Returns `true` for layouts that store color multiplied by alpha.
    #[inline]
    pub const fn is_premultiplied(self) -> bool {
        matches!(self, Self::Rgba8 | Self::Rgba16)
    }

    /// Returns `true` for single-channel luminance layouts.
    #[inline]
    pub const fn is_gray(self) -> bool {
        matches!(self, Self::Gray8 | Self::Gray16)
    }

    /// Precision class of this layout.
    #[inline]
    pub const fn depth(self) -> SampleDepth {
        match self {
            Self::Rgba8 | Self::Nrgba8 | Self::Gray8 => SampleDepth::Eight,
            Self::Rgba16 | Self::Nrgba16 | Self::Gray16 => SampleDepth::Sixteen,
            Self::RgbaF32 => SampleDepth::Other,
        }
    }

    /// Name of the sample type backing this layout.
    #[inline]
    pub const fn sample_name(self) -> &'static str {
        match self.depth() {
            SampleDepth::Eight => "u8",
            SampleDepth::Sixteen => "u16",
            SampleDepth::Other => "f32",
        }
    }
}

impl fmt::Display for PixelLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Rgba8 => "RGBA8",
            Self::Rgba16 => "RGBA16",
            Self::Nrgba8 => "NRGBA8",
            Self::Nrgba16 => "NRGBA16",
            Self::Gray8 => "Gray8",
            Self::Gray16 => "Gray16",
            Self::RgbaF32 => "RGBA32F",
        };
        f.write_str(name)
    }
}
