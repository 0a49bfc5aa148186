//! Landmark detection pipeline.
//!
//! This module wires together band-pass filtering, bright-spot extraction,
//! landmark clustering, corner search and identity decoding.

mod error;
mod params;
mod pipeline;
mod result;

pub use error::DetectError;
pub use params::DetectorParams;
pub use pipeline::LandmarkDetector;
pub use result::LandmarkDetection;
