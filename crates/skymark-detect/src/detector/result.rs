use crate::{Cluster, LandmarkObservation};
use nalgebra::Point2;
use serde::{Deserialize, Serialize};
use skymark_core::GrayImage;

/// Detection output with the pipeline's intermediate products.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LandmarkDetection {
    /// Identified landmarks, each identity at most once.
    pub landmarks: Vec<LandmarkObservation>,
    /// Bright-spot centroids.
    pub points: Vec<Point2<f32>>,
    /// Point clusters that passed the size filter.
    pub clusters: Vec<Cluster>,
    /// Corner hypotheses before decoding.
    pub hypotheses: Vec<LandmarkObservation>,
    /// Band-passed frame.
    #[serde(skip)]
    pub filtered: Option<GrayImage>,
}
