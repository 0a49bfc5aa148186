//! Corner hypotheses for a landmark cluster.
//!
//! Every point of a cluster is tried as the right-angle apex `S` with every
//! unordered pair of other points as the leg ends `{H1, H2}`. Triples whose
//! legs are not both shorter than `hypotenuse_tolerance * |H1 - H2|` are
//! rejected outright; the rest are scored by
//!
//! ```text
//! score = w_len * perimeter - w_proj * |a.b| / (|a| |b|) - w_diff * ||a| - |b||
//! ```
//!
//! with `a = H1 - S`, `b = H2 - S`. Large, square, isosceles triangles win.

use crate::{Cluster, LandmarkObservation};
use nalgebra::{Point2, Vector2};
use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Relative weights of the three score terms.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct CornerScoreWeights {
    /// Reward for the triangle perimeter (pixels).
    pub length_triangle: f32,
    /// Penalty for the normalized projection of one leg onto the other.
    pub projected_secant: f32,
    /// Penalty for the leg length difference (pixels).
    pub secant_length_diff: f32,
}

impl Default for CornerScoreWeights {
    fn default() -> Self {
        Self {
            length_triangle: 1.0,
            projected_secant: 50.0,
            secant_length_diff: 1.0,
        }
    }
}

/// How many hypotheses survive per cluster.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum CornerSelection {
    /// Keep only the highest-scoring triple.
    BestOnly,
    /// Keep every triple scoring within `cutoff` of the best, best first,
    /// at most `max_hypotheses` of them.
    NearBest { cutoff: f32, max_hypotheses: usize },
}

impl Default for CornerSelection {
    fn default() -> Self {
        Self::BestOnly
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct CornerSearchParams {
    pub hypotenuse_tolerance: f32,
    pub weights: CornerScoreWeights,
    pub selection: CornerSelection,
}

impl Default for CornerSearchParams {
    fn default() -> Self {
        Self {
            hypotenuse_tolerance: 0.9,
            weights: CornerScoreWeights::default(),
            selection: CornerSelection::default(),
        }
    }
}

#[derive(Clone, Copy, Debug)]
struct Triple {
    apex: usize,
    h1: usize,
    h2: usize,
    score: f32,
}

/// Score of the triangle with apex `s` and leg ends `h1`, `h2`, or `None`
/// when the hypotenuse check rejects it.
pub fn score_triangle(
    s: Point2<f32>,
    h1: Point2<f32>,
    h2: Point2<f32>,
    params: &CornerSearchParams,
) -> Option<f32> {
    let a: Vector2<f32> = h1 - s;
    let b: Vector2<f32> = h2 - s;
    let la = a.norm();
    let lb = b.norm();
    let hyp = (h2 - h1).norm();

    let max_leg = params.hypotenuse_tolerance * hyp;
    if la > max_leg || lb > max_leg || la <= f32::EPSILON || lb <= f32::EPSILON {
        return None;
    }

    let w = &params.weights;
    let projection = a.dot(&b).abs() / (la * lb);
    Some(
        w.length_triangle * (la + lb + hyp)
            - w.projected_secant * projection
            - w.secant_length_diff * (la - lb).abs(),
    )
}

/// Order `[h1, s, h2]` so that `cross(h1 - s, h2 - s) >= 0`.
pub fn wind_corners(s: Point2<f32>, h1: Point2<f32>, h2: Point2<f32>) -> [Point2<f32>; 3] {
    let a = h1 - s;
    let b = h2 - s;
    if a.perp(&b) < 0.0 {
        [h2, s, h1]
    } else {
        [h1, s, h2]
    }
}

/// Enumerate, score and select corner hypotheses for one cluster.
///
/// Clusters with fewer than three points produce nothing. The result is
/// deterministic for a given point order; equal scores keep enumeration
/// order.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "trace", skip(cluster, params), fields(points = cluster.len()))
)]
pub fn find_corner_hypotheses(
    cluster: &Cluster,
    params: &CornerSearchParams,
) -> Vec<LandmarkObservation> {
    let n = cluster.len();
    if n < 3 {
        return Vec::new();
    }

    let mut triples = Vec::new();
    for apex in 0..n {
        for h1 in 0..n {
            if h1 == apex {
                continue;
            }
            for h2 in (h1 + 1)..n {
                if h2 == apex {
                    continue;
                }
                if let Some(score) =
                    score_triangle(cluster[apex], cluster[h1], cluster[h2], params)
                {
                    triples.push(Triple {
                        apex,
                        h1,
                        h2,
                        score,
                    });
                }
            }
        }
    }

    let selected = select(triples, &params.selection);
    selected
        .into_iter()
        .map(|t| {
            let corners = wind_corners(cluster[t.apex], cluster[t.h1], cluster[t.h2]);
            let id_points = cluster
                .iter()
                .enumerate()
                .filter(|&(k, _)| k != t.apex && k != t.h1 && k != t.h2)
                .map(|(_, p)| *p)
                .collect();
            LandmarkObservation::new(corners, id_points)
        })
        .collect()
}

fn select(mut triples: Vec<Triple>, selection: &CornerSelection) -> Vec<Triple> {
    match selection {
        CornerSelection::BestOnly => {
            let mut best: Option<Triple> = None;
            for t in triples {
                if best.map_or(true, |b| t.score > b.score) {
                    best = Some(t);
                }
            }
            best.into_iter().collect()
        }
        CornerSelection::NearBest {
            cutoff,
            max_hypotheses,
        } => {
            let Some(best) = triples.iter().map(|t| t.score).reduce(f32::max) else {
                return Vec::new();
            };
            let floor = best - (1.0 - cutoff) * best.abs();
            triples.retain(|t| t.score >= floor);
            triples.sort_by(|a, b| b.score.total_cmp(&a.score));
            triples.truncate(*max_hypotheses);
            triples
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Points on a unit grid scaled by `s` and shifted by `(ox, oy)`.
    fn grid(cells: &[(f32, f32)], s: f32, ox: f32, oy: f32) -> Cluster {
        cells
            .iter()
            .map(|&(i, j)| Point2::new(ox + s * i, oy + s * j))
            .collect()
    }

    #[test]
    fn finds_the_right_angle_apex() {
        let cluster = grid(
            &[(1.0, 0.0), (0.0, 3.0), (2.0, 1.0), (0.0, 0.0), (3.0, 0.0)],
            20.0,
            100.0,
            100.0,
        );
        let hyps = find_corner_hypotheses(&cluster, &CornerSearchParams::default());
        assert_eq!(hyps.len(), 1);
        let h = &hyps[0];
        assert_eq!(h.corners[1], Point2::new(100.0, 100.0));
        assert_eq!(h.corners[0], Point2::new(160.0, 100.0));
        assert_eq!(h.corners[2], Point2::new(100.0, 160.0));
        assert_eq!(
            h.id_points,
            vec![Point2::new(120.0, 100.0), Point2::new(140.0, 120.0)]
        );
        assert!(h.identity.is_none());
    }

    #[test]
    fn winding_is_independent_of_leg_order() {
        let s = Point2::new(10.0, 10.0);
        let a = Point2::new(40.0, 12.0);
        let b = Point2::new(8.0, 41.0);
        let w1 = wind_corners(s, a, b);
        let w2 = wind_corners(s, b, a);
        assert_eq!(w1, w2);
        let cross = (w1[0] - w1[1]).perp(&(w1[2] - w1[1]));
        assert!(cross >= 0.0);
    }

    #[test]
    fn obtuse_leg_is_rejected() {
        let params = CornerSearchParams::default();
        // apex is not the widest angle: one leg is longer than the hypotenuse
        let s = Point2::new(0.0, 0.0);
        let h1 = Point2::new(30.0, 0.0);
        let h2 = Point2::new(30.0, 30.0);
        assert!(score_triangle(s, h1, h2, &params).is_none());
        assert!(score_triangle(h1, s, h2, &params).is_some());
    }

    #[test]
    fn small_clusters_yield_nothing() {
        let cluster = grid(&[(0.0, 0.0), (1.0, 0.0)], 10.0, 0.0, 0.0);
        assert!(find_corner_hypotheses(&cluster, &CornerSearchParams::default()).is_empty());
    }

    #[test]
    fn repeated_runs_are_identical() {
        let cluster = grid(
            &[(0.0, 0.0), (3.0, 0.0), (0.0, 3.0), (1.0, 1.0), (2.0, 2.0), (1.0, 2.0)],
            15.0,
            5.0,
            7.0,
        );
        let params = CornerSearchParams {
            selection: CornerSelection::NearBest {
                cutoff: 0.8,
                max_hypotheses: 5,
            },
            ..CornerSearchParams::default()
        };
        let first = find_corner_hypotheses(&cluster, &params);
        let second = find_corner_hypotheses(&cluster, &params);
        assert!(!first.is_empty());
        assert_eq!(first, second);
    }

    #[test]
    fn near_best_keeps_symmetric_ties() {
        // A lit (3, 3) cell makes two equally good right isosceles triangles.
        let cluster = grid(
            &[(0.0, 0.0), (3.0, 0.0), (0.0, 3.0), (3.0, 3.0), (1.0, 2.0)],
            10.0,
            50.0,
            50.0,
        );
        let best_only = find_corner_hypotheses(&cluster, &CornerSearchParams::default());
        assert_eq!(best_only.len(), 1);

        let params = CornerSearchParams {
            selection: CornerSelection::NearBest {
                cutoff: 1.0,
                max_hypotheses: 10,
            },
            ..CornerSearchParams::default()
        };
        let near_best = find_corner_hypotheses(&cluster, &params);
        assert_eq!(near_best.len(), 4);
        assert_eq!(near_best[0], best_only[0]);

        let capped = CornerSearchParams {
            selection: CornerSelection::NearBest {
                cutoff: 1.0,
                max_hypotheses: 2,
            },
            ..CornerSearchParams::default()
        };
        assert_eq!(find_corner_hypotheses(&cluster, &capped).len(), 2);
    }
}
