use nalgebra::Point2;
use serde::{Deserialize, Serialize};

/// A landmark seen in one frame.
///
/// `corners` are ordered `[H1, S, H2]` with the right-angle apex `S` in the
/// middle and `cross(H1 - S, H2 - S) >= 0`. Before decoding `identity` is
/// `None`; a decoded observation carries the identity it claimed from the
/// frame's identity pool.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LandmarkObservation {
    pub corners: [Point2<f32>; 3],
    pub id_points: Vec<Point2<f32>>,
    pub identity: Option<u16>,
}

impl LandmarkObservation {
    /// Undecoded observation.
    pub fn new(corners: [Point2<f32>; 3], id_points: Vec<Point2<f32>>) -> Self {
        Self {
            corners,
            id_points,
            identity: None,
        }
    }

    /// Corners followed by id points; the order map points are stored in.
    pub fn point_count(&self) -> usize {
        self.corners.len() + self.id_points.len()
    }
}

/// Group of nearby points produced by the spatial clusterer.
pub type Cluster = Vec<Point2<f32>>;
