//! # pixfx-core
//!
//! Pixel model shared by every pixfx crate.
//!
//! # Overview
//!
//! - [`Pixel`] - Straight-alpha float RGBA, the only value filters compute with
//! - [`PixelBuffer`] - Packed storage in one of the [`PixelLayout`] encodings
//! - [`PixelSource`] - Read access, implemented by buffers and [`ColorAdapter`]
//! - [`Rect`] - Bounds of buffers and filter results
//! - [`color`] - HSL/HSV conversions and luma
//! - [`parallel`] - Row-band splitting over the Rayon pool
//!
//! # Example
//!
//! ```rust
//! use pixfx_core::{Pixel, PixelBuffer, PixelLayout, PixelSource, Rect};
//!
//! let buf = PixelBuffer::filled(PixelLayout::Nrgba8, Rect::from_size(4, 4), Pixel::gray(0.5));
//! let p = buf.pixel(2, 2);
//! assert!((p.r - 0.5).abs() < 0.01);
//! ```
//!
//! # Features
//!
//! - `parallel` (default) - Run row bands on the Rayon pool
//! - `serde` - Serialize/Deserialize for configuration types

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod buffer;
pub mod color;
mod error;
pub mod format;
pub mod parallel;
pub mod pixel;
pub mod rect;
pub mod source;

pub use buffer::{PixelBuffer, RowBand};
pub use error::{Error, Result};
pub use format::{PixelLayout, SampleDepth};
pub use parallel::{Parallelism, for_each_band, split_range};
pub use pixel::Pixel;
pub use rect::Rect;
pub use source::{ColorAdapter, ColorImage, PixelSource};
