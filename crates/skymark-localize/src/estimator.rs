//! Frame-by-frame camera pose estimation from identified landmarks.

use crate::problem::{OrientationManifold, PoseProblem, ReprojectionResidual};
use crate::solver::{self, SolveOptions, SolveReport};
use crate::{CameraIntrinsics, EgoPose, LandmarkMap, LocalizeError, WorldMap};
use nalgebra::Point2;
use serde::{Deserialize, Serialize};
use skymark_detect::LandmarkObservation;

#[cfg(feature = "tracing")]
use tracing::instrument;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct EstimatorParams {
    /// Keep the camera on the floor plane: `z = 0`, yaw only.
    pub planar: bool,
    /// Cauchy loss scale in pixels; corner residuals well above it are
    /// treated as outliers.
    pub loss_scale: f64,
    pub solver: SolveOptions,
}

impl Default for EstimatorParams {
    fn default() -> Self {
        Self {
            planar: false,
            loss_scale: 3.0,
            solver: SolveOptions::default(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackingState {
    /// No landmark seen yet; the pose is the default.
    Uninitialized,
    Tracking,
}

/// Result of a successful [`PoseEstimator::update`].
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum UpdateOutcome {
    /// Nothing identified in the frame; the pose was left alone.
    Skipped,
    /// The pose was re-estimated.
    Solved(SolveReport),
}

/// Camera pose tracker.
///
/// Every update rebuilds the reprojection problem from the frame's
/// observations (three corner residuals per landmark) and refines the
/// previous pose with tiny-solver's Levenberg-Marquardt. The camera height
/// is kept at least one metre below the lowest landmark point.
///
/// In planar mode the camera sits at `z = 0` and the height bound is not
/// applied; see [`PoseEstimator::floor_above_height_bound`].
#[derive(Clone, Debug)]
pub struct PoseEstimator {
    params: EstimatorParams,
    map: WorldMap,
    z_upper_bound: f64,
    problem: PoseProblem,
    pose: EgoPose,
    state: TrackingState,
    last_report: Option<SolveReport>,
}

impl PoseEstimator {
    /// Transform the map into the world frame and start uninitialized.
    pub fn new(map: &LandmarkMap, camera: CameraIntrinsics, params: EstimatorParams) -> Self {
        let map = map.to_world();
        let z_upper_bound = map.z_upper_bound();
        let mut pose = EgoPose::default();
        pose.position.z = pose.position.z.min(z_upper_bound);

        log::debug!(
            "pose estimator: {} landmarks, z <= {z_upper_bound:.3}, planar={}",
            map.len(),
            params.planar
        );
        if params.planar && z_upper_bound < 0.0 {
            log::warn!("planar camera at z = 0 sits above the height bound {z_upper_bound:.3}");
        }

        Self {
            problem: PoseProblem::new(camera, params.loss_scale),
            params,
            map,
            z_upper_bound,
            pose,
            state: TrackingState::Uninitialized,
            last_report: None,
        }
    }

    #[inline]
    pub fn params(&self) -> &EstimatorParams {
        &self.params
    }

    #[inline]
    pub fn pose(&self) -> &EgoPose {
        &self.pose
    }

    #[inline]
    pub fn state(&self) -> TrackingState {
        self.state
    }

    #[inline]
    pub fn world_map(&self) -> &WorldMap {
        &self.map
    }

    #[inline]
    pub fn z_upper_bound(&self) -> f64 {
        self.z_upper_bound
    }

    /// Whether planar mode pins the camera above the map's height bound,
    /// i.e. some landmark hangs less than one metre above the floor.
    pub fn floor_above_height_bound(&self) -> bool {
        self.params.planar && self.z_upper_bound < 0.0
    }

    /// Report of the most recent solve.
    #[inline]
    pub fn last_report(&self) -> Option<&SolveReport> {
        self.last_report.as_ref()
    }

    /// Corner residuals in the current problem.
    #[inline]
    pub fn residual_count(&self) -> usize {
        self.problem.residual_count()
    }

    /// Refine the pose from one frame of observations.
    ///
    /// Unidentified observations are ignored; a frame without identified
    /// observations is a no-op. Every observation is checked against the
    /// map before anything changes, so an error leaves the estimator exactly
    /// as it was. The solver's best result is committed whatever its
    /// quality; when it returns nothing the pose stays put and
    /// [`SolveReport::converged`] is `false`.
    ///
    /// `dt` is the time since the previous frame; no motion model uses it
    /// yet.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "info", skip(self, observations), fields(n = observations.len()))
    )]
    pub fn update(
        &mut self,
        observations: &[LandmarkObservation],
        dt: f64,
    ) -> Result<UpdateOutcome, LocalizeError> {
        log::trace!("update with {} observations, dt={dt:.4}", observations.len());

        let mut residuals = Vec::with_capacity(3 * observations.len());
        let mut seed = (0.0, 0.0, 0usize);
        for obs in observations {
            let Some(id) = obs.identity else {
                log::trace!("skipping unidentified observation");
                continue;
            };
            let Some(landmark) = self.map.get(id) else {
                log::warn!("landmark {id} is not in the map; frame dropped");
                return Err(LocalizeError::UnknownLandmark { id });
            };
            if landmark.points.len() != obs.point_count() {
                log::warn!(
                    "landmark {id}: {} observed points, map has {}; frame dropped",
                    obs.point_count(),
                    landmark.points.len()
                );
                return Err(LocalizeError::PointCountMismatch {
                    id,
                    observed: obs.point_count(),
                    expected: landmark.points.len(),
                });
            }
            for (corner, world_point) in obs.corners.iter().zip(&landmark.points) {
                residuals.push(ReprojectionResidual {
                    observed: Point2::new(corner.x as f64, corner.y as f64),
                    world_point: *world_point,
                });
            }
            seed.0 += landmark.position.x;
            seed.1 += landmark.position.y;
            seed.2 += 1;
        }

        if residuals.is_empty() {
            return Ok(UpdateOutcome::Skipped);
        }

        if self.state == TrackingState::Uninitialized {
            let n = seed.2 as f64;
            self.pose.position.x = seed.0 / n;
            self.pose.position.y = seed.1 / n;
            if self.params.planar {
                self.pose = self.pose.to_planar();
                self.problem.set_planar();
            }
            self.state = TrackingState::Tracking;
            log::debug!(
                "tracking started at ({:.3}, {:.3})",
                self.pose.position.x,
                self.pose.position.y
            );
        }

        self.problem.replace_residuals(residuals);
        self.problem.set_z_upper_bound(self.z_upper_bound);
        let manifold = if self.params.planar {
            OrientationManifold::Yaw
        } else {
            OrientationManifold::UnitQuaternion
        };
        self.problem.set_orientation_manifold(manifold);

        let (pose, report) = solver::solve(&self.problem, &self.pose, &self.params.solver);
        if !report.converged {
            log::debug!(
                "pose solve failed over {} corners; cost {:.3e}",
                report.residual_blocks,
                report.initial_cost
            );
        }
        self.pose = pose;
        self.last_report = Some(report.clone());
        Ok(UpdateOutcome::Solved(report))
    }
}
