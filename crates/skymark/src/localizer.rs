use crate::io::{ConfigError, LocalizerConfig};
use serde::{Deserialize, Serialize};
use skymark_core::GrayImageView;
use skymark_detect::{DetectError, DetectorParams, LandmarkDetector, LandmarkObservation};
use skymark_localize::{
    CameraIntrinsics, EgoPose, EstimatorParams, LandmarkMap, LocalizeError, PoseEstimator,
    UpdateOutcome,
};
use std::path::Path;

#[cfg(feature = "tracing")]
use tracing::instrument;

#[derive(thiserror::Error, Debug)]
pub enum LocalizerError {
    #[error(transparent)]
    Detect(#[from] DetectError),
    #[error(transparent)]
    Localize(#[from] LocalizeError),
}

/// What one frame produced.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FrameResult {
    pub observations: Vec<LandmarkObservation>,
    pub outcome: UpdateOutcome,
    /// Pose after the update.
    pub pose: EgoPose,
}

/// Detector and pose estimator for a single camera.
///
/// The detector only reports identities that are in the map.
#[derive(Clone, Debug)]
pub struct Localizer {
    detector: LandmarkDetector,
    estimator: PoseEstimator,
}

impl Localizer {
    pub fn new(
        map: &LandmarkMap,
        camera: CameraIntrinsics,
        detector: DetectorParams,
        estimator: EstimatorParams,
    ) -> Self {
        Self {
            detector: LandmarkDetector::new(detector, map.ids()),
            estimator: PoseEstimator::new(map, camera, estimator),
        }
    }

    /// Build from a config; a relative `map_path` is resolved against
    /// `base_dir`.
    pub fn from_config(
        config: &LocalizerConfig,
        base_dir: Option<&Path>,
    ) -> Result<Self, ConfigError> {
        let map = config.load_map(base_dir)?;
        log::info!("loaded map with {} landmarks", map.len());
        Ok(Self::new(
            &map,
            config.camera,
            config.detector.clone(),
            config.estimator.clone(),
        ))
    }

    #[inline]
    pub fn detector(&self) -> &LandmarkDetector {
        &self.detector
    }

    #[inline]
    pub fn estimator(&self) -> &PoseEstimator {
        &self.estimator
    }

    /// Detect landmarks in `image` and update the pose with them.
    ///
    /// On error the pose is unchanged.
    #[cfg_attr(
        feature = "tracing",
        instrument(
            level = "info",
            skip(self, image),
            fields(width = image.width, height = image.height)
        )
    )]
    pub fn process_frame(
        &mut self,
        image: &GrayImageView<'_>,
        dt: f64,
    ) -> Result<FrameResult, LocalizerError> {
        let observations = self.detector.detect(image)?;
        let outcome = self.estimator.update(&observations, dt)?;
        Ok(FrameResult {
            observations,
            outcome,
            pose: *self.estimator.pose(),
        })
    }
}
