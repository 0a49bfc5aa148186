//! High-level facade for the `skymark-*` workspace.
//!
//! This crate provides:
//! - re-exports of the detector and pose estimator crates
//! - a JSON [`LocalizerConfig`] and the [`Localizer`] that runs detection and
//!   pose estimation frame by frame
//! - (feature `image`) helpers that turn `image` crate buffers into detector
//!   views
//!
//! ## Quickstart
//!
//! ```no_run
//! use skymark::{frame, Localizer, LocalizerConfig};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = LocalizerConfig::load_json("localizer.json")?;
//! let mut localizer = Localizer::from_config(&config, None)?;
//!
//! let img = frame::load_gray8("frame_0001.png")?;
//! let result = localizer.process_frame(&frame::gray_view(&img), 1.0 / 30.0)?;
//! println!("{:?}", result.pose);
//! # Ok(())
//! # }
//! ```
//!
//! ## API map
//! - `skymark::core`: image buffers, band-pass filtering, unit-square frames, logging.
//! - `skymark::detect`: dot extraction, clustering, corner search, identity decoding.
//! - `skymark::localize`: landmark maps, camera model, robust pose estimation.
//! - `skymark::frame` (feature `image`): `image::GrayImage` helpers.

pub use skymark_core as core;
pub use skymark_detect as detect;
pub use skymark_localize as localize;

pub use skymark_detect::{DetectorParams, LandmarkDetector, LandmarkObservation};
pub use skymark_localize::{
    CameraIntrinsics, EgoPose, EstimatorParams, LandmarkMap, PoseEstimator, UpdateOutcome,
};

mod io;
mod localizer;

pub use io::{ConfigError, LocalizerConfig};
pub use localizer::{FrameResult, Localizer, LocalizerError};

#[cfg(feature = "image")]
pub mod frame;
