//! JSON configuration for a [`Localizer`](crate::Localizer).

use serde::{Deserialize, Serialize};
use skymark_detect::DetectorParams;
use skymark_localize::{CameraIntrinsics, EstimatorParams, LandmarkMap, MapError, MapFile};
use std::{
    fs,
    path::{Path, PathBuf},
};

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Map(#[from] MapError),
    #[error("configuration names neither `map` nor `map_path`")]
    MissingMap,
}

/// Everything needed to localize one camera.
///
/// The landmark map is either inline (`map`) or in a separate map file
/// (`map_path`); the inline map wins when both are given. `detector` and
/// `estimator` fall back to their defaults and may be partial.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalizerConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub map: Option<MapFile>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub map_path: Option<String>,
    pub camera: CameraIntrinsics,
    #[serde(default)]
    pub detector: DetectorParams,
    #[serde(default)]
    pub estimator: EstimatorParams,
}

impl LocalizerConfig {
    pub fn new(map: &LandmarkMap, camera: CameraIntrinsics) -> Self {
        Self {
            map: Some(MapFile::from(map)),
            map_path: None,
            camera,
            detector: DetectorParams::default(),
            estimator: EstimatorParams::default(),
        }
    }

    /// Load a JSON config from disk.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Write this config to disk as pretty JSON.
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Build the landmark map. A relative `map_path` is taken relative to
    /// `base_dir` when one is given.
    pub fn load_map(&self, base_dir: Option<&Path>) -> Result<LandmarkMap, ConfigError> {
        if let Some(map) = &self.map {
            return Ok(map.build()?);
        }
        let Some(path) = &self.map_path else {
            return Err(ConfigError::MissingMap);
        };
        let path = match base_dir {
            Some(dir) if Path::new(path).is_relative() => dir.join(path),
            _ => PathBuf::from(path),
        };
        Ok(LandmarkMap::load_json(path)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_sections_fall_back_to_defaults() {
        let raw = r#"{
            "map_path": "ceiling.json",
            "camera": { "fx": 500.0, "fy": 500.0, "cx": 320.0, "cy": 240.0 },
            "detector": { "extractor": { "threshold": 35 } },
            "estimator": { "planar": true }
        }"#;
        let cfg: LocalizerConfig = serde_json::from_str(raw).unwrap();
        assert_eq!(cfg.detector.extractor.threshold, 35);
        assert_eq!(cfg.detector.landmarks.max_points, 9);
        assert!(cfg.estimator.planar);
        assert_eq!(cfg.estimator.loss_scale, 3.0);
        assert!(cfg.map.is_none());
    }

    #[test]
    fn missing_map_is_reported() {
        let cfg = LocalizerConfig {
            map: None,
            map_path: None,
            camera: CameraIntrinsics::new(1.0, 1.0, 0.0, 0.0),
            detector: DetectorParams::default(),
            estimator: EstimatorParams::default(),
        };
        assert!(matches!(cfg.load_map(None), Err(ConfigError::MissingMap)));
    }
}
