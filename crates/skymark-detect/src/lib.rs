//! Ceiling landmark detection.
//!
//! A landmark is a square grid of retro-reflective dots mounted on the
//! ceiling. Three grid corners are always lit and fix the landmark's
//! orientation; the remaining cells encode its identity (see [`code`]).
//!
//! Detection of a frame runs in stages:
//!
//! 1. [`PointExtractor`] band-passes the image, thresholds it and reduces
//!    each bright spot to its centroid.
//! 2. [`SpatialClusterer`] groups the centroids into landmark candidates and
//!    drops groups with an implausible number of dots.
//! 3. [`find_corner_hypotheses`] searches each candidate for the triangle of
//!    corner dots.
//! 4. [`IdentityDecoder`] reads each hypothesis's identity and claims it from
//!    the frame's [`IdPool`].
//!
//! [`LandmarkDetector`] runs all four.
//!
//! ```no_run
//! use skymark_core::GrayImageView;
//! use skymark_detect::{DetectorParams, LandmarkDetector};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let pixels = vec![0u8; 640 * 480];
//! let image = GrayImageView::new(640, 480, &pixels)?;
//! let detector = LandmarkDetector::new(DetectorParams::default(), [0x0242, 0x0470]);
//! for landmark in detector.detect(&image)? {
//!     println!("{:?} at {:?}", landmark.identity, landmark.corners[1]);
//! }
//! # Ok(())
//! # }
//! ```

mod cluster;
pub mod code;
mod corners;
mod decode;
mod detector;
mod extract;
mod types;

pub use cluster::{ClusterParams, SpatialClusterer};
pub use corners::{
    find_corner_hypotheses, score_triangle, wind_corners, CornerScoreWeights, CornerSearchParams,
    CornerSelection,
};
pub use decode::{
    backward_identity, forward_identity, DecodeParams, IdPool, IdentityDecoder, SampleSource,
};
pub use detector::{DetectError, DetectorParams, LandmarkDetection, LandmarkDetector};
pub use extract::{centroid, ExtractorParams, PointExtractor};
pub use types::{Cluster, LandmarkObservation};
