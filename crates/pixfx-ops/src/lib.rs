//! # pixfx-ops
//!
//! Image filters that compose and fold.
//!
//! Each filter declares the output rectangle it produces from an input
//! rectangle and fills a destination buffer from a read-only source.
//! Consecutive compatible filters merge into one, so a [`FilterList`]
//! built from many small edits runs as few passes as possible.
//!
//! # Modules
//!
//! - [`filter`] - The [`Filter`] enum and the merge/undo algebra
//! - [`list`] - [`FilterList`], the self-folding pipeline
//! - [`channel`] - Brightness, contrast, gamma, invert, custom curves
//! - [`color`] - Grayscale, sepia, HSL/HSV, balance, colorize
//! - [`lut`] - Lookup tables for channel curves
//! - [`transform`] - Flips, transposes and quarter turns
//! - [`rotate`] - Arbitrary-angle rotation
//! - [`crop`] - Rectangular and elliptical crops
//! - [`resize`] - Separable resampling kernels and the [`ResizeFilter`](resize::ResizeFilter)
//! - [`scale`] - Relative resize, multiplicative or additive
//! - [`combine`] - Several filters fused into one
//! - [`interp`] - Point sampling
//!
//! # Example
//!
//! ```rust
//! use pixfx_core::{Parallelism, Pixel, PixelBuffer, PixelLayout, PixelSource, Rect};
//! use pixfx_ops::{FilterList, ResampleKernel, brightness, grayscale, resize};
//!
//! let src = PixelBuffer::filled(PixelLayout::Rgba8, Rect::from_size(8, 8), Pixel::gray(0.5));
//!
//! let mut list = FilterList::new();
//! list.add(grayscale());
//! list.add(brightness(10.0));
//! list.add(resize(4, 4, ResampleKernel::Lanczos3));
//!
//! let mut dst = PixelBuffer::new(PixelLayout::Rgba8, list.bounds(src.bounds()));
//! list.apply(&mut dst, &src, Parallelism::Auto);
//! assert_eq!(dst.bounds().size(), (4, 4));
//! ```
//!
//! # Features
//!
//! - `parallel` (default) - Row bands run on the Rayon pool
//! - `serde` - Serialize/Deserialize for built-in kernels, scale modes, interpolation and transformers

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod channel;
pub mod color;
pub mod combine;
pub mod crop;
pub mod filter;
pub mod interp;
pub mod list;
pub mod lut;
pub mod resize;
pub mod rotate;
pub mod scale;
pub mod transform;

pub use channel::{brightness, brightness_contrast, channel_fn, contrast, gamma, invert};
pub use color::{color_balance, colorize, grayscale, hsl, hsv, pixel_fn, sepia};
pub use combine::{combine, combine_channels, combine_colors};
pub use crop::{crop_ellipse, crop_rect};
pub use filter::{CustomFilter, Filter};
pub use interp::Interpolation;
pub use list::FilterList;
pub use resize::{CustomKernel, ResampleKernel, resize};
pub use rotate::{rotate, rotate_degrees};
pub use scale::{ScaleMode, scale, scale_additive};
pub use transform::{Transformer, flip_h, flip_v, rotate90, rotate180, rotate270, transform};
