//! Camera pose estimation against a map of ceiling landmarks.
//!
//! A [`LandmarkMap`] holds every landmark's pose and dot layout. The
//! [`PoseEstimator`] takes the identified observations of each frame,
//! matches their three corner dots to the map and refines the camera pose
//! with a Cauchy-robust `tiny_solver` Levenberg-Marquardt solve over the
//! reprojection error.
//!
//! Conventions:
//! - The camera pose is camera-to-world: a world point `p` is seen at
//!   `R^T (p - t)` in the camera frame.
//! - The camera looks along its +z axis; landmarks hang above it, so a
//!   valid camera height is at least one metre below the lowest dot.
//!
//! ```no_run
//! use nalgebra::Isometry3;
//! use skymark_localize::{
//!     CameraIntrinsics, EstimatorParams, LandmarkMap, MapLandmark, PoseEstimator,
//! };
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let map = LandmarkMap::from_landmarks([MapLandmark::from_identity(
//!     0x0042,
//!     Isometry3::translation(0.0, 0.0, 2.5),
//!     0.1,
//! )?])?;
//! let camera = CameraIntrinsics::new(500.0, 500.0, 320.0, 240.0);
//! let mut estimator = PoseEstimator::new(&map, camera, EstimatorParams::default());
//! estimator.update(&[], 0.033)?;
//! println!("{:?}", estimator.pose());
//! # Ok(())
//! # }
//! ```

mod camera;
mod error;
mod estimator;
mod map;
mod pose;
mod problem;
pub mod solver;

pub use camera::CameraIntrinsics;
pub use error::{LocalizeError, MapError};
pub use estimator::{EstimatorParams, PoseEstimator, TrackingState, UpdateOutcome};
pub use map::{
    expected_point_count, LandmarkMap, MapFile, MapFileEntry, MapLandmark, WorldLandmark,
    WorldMap,
};
pub use pose::EgoPose;
pub use problem::{OrientationManifold, PoseProblem, ReprojectionResidual};
pub use solver::{solve, SolveOptions, SolveReport};
