//! Online single-pass spatial clustering.
//!
//! Points are visited in input order. Each point joins the first cluster,
//! searched from the most recently created one backwards, that already
//! holds a member within `radius`; otherwise it starts a new cluster.

use crate::Cluster;
use nalgebra::{distance_squared, Point2};
use serde::{Deserialize, Serialize};

/// Clustering radius and size filter.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterParams {
    /// Maximum distance (inclusive) from a member for a point to join.
    pub radius: f32,
    /// Smallest cluster kept after filtering.
    pub min_points: usize,
    /// Largest cluster kept after filtering.
    pub max_points: usize,
}

impl Default for ClusterParams {
    fn default() -> Self {
        Self {
            radius: 40.0,
            min_points: 5,
            max_points: 9,
        }
    }
}

#[derive(Clone, Debug)]
pub struct SpatialClusterer {
    params: ClusterParams,
}

impl SpatialClusterer {
    pub fn new(params: ClusterParams) -> Self {
        Self { params }
    }

    #[inline]
    pub fn params(&self) -> &ClusterParams {
        &self.params
    }

    /// Cluster and drop groups outside `[min_points, max_points]`.
    pub fn cluster(&self, points: &[Point2<f32>]) -> Vec<Cluster> {
        let mut clusters = self.assign(points);
        let before = clusters.len();
        clusters.retain(|c| c.len() >= self.params.min_points && c.len() <= self.params.max_points);
        if clusters.len() != before {
            log::trace!(
                "dropped {} of {} clusters outside [{}, {}] points",
                before - clusters.len(),
                before,
                self.params.min_points,
                self.params.max_points
            );
        }
        clusters
    }

    /// Cluster without the size filter; every input point lands in exactly
    /// one output cluster.
    pub fn assign(&self, points: &[Point2<f32>]) -> Vec<Cluster> {
        let r2 = self.params.radius * self.params.radius;
        let mut clusters: Vec<Cluster> = Vec::new();

        for &p in points {
            let home = clusters
                .iter_mut()
                .rev()
                .find(|c| c.iter().any(|q| distance_squared(q, &p) <= r2));
            match home {
                Some(cluster) => cluster.push(p),
                None => clusters.push(vec![p]),
            }
        }
        clusters
    }
}
