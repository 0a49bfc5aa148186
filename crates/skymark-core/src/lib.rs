//! Core types for ceiling landmark localization.
//!
//! This crate holds the raster side of the pipeline: an owned/borrowed
//! 8-bit image pair, the band-pass and threshold primitives used to find
//! marker dots, and the unit-square frame that relates a marker's three
//! corner dots to its code grid. It has no notion of identities or poses.

mod filter;
mod frame;
mod image;
mod logger;

pub use filter::{band_pass, box_filter, bright_pixels, subtract_saturating, BandPassParams};
pub use frame::UnitSquareFrame;
pub use image::{GrayImage, GrayImageView, ImageError};

#[cfg(feature = "tracing")]
pub use logger::init_tracing;

pub use logger::{init_with_level, level_from_verbosity};
