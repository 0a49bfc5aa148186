//! Identity decoding against a per-frame pool of valid identities.
//!
//! Decoding runs in two passes over a frame's hypotheses. The forward pass
//! maps each id point into the unit square spanned by the corners and sums
//! the bits of the cells they land in. Hypotheses that fail it get a
//! backward pass: every code cell is projected into the image and the
//! pixel there is compared to a brightness threshold. A decoded identity
//! is only accepted if it can still be claimed from the pool, so an
//! identity is reported at most once per frame.

use crate::code::{cell_bit, cell_center, code_cells, quantize};
use crate::LandmarkObservation;
use nalgebra::Point2;
use serde::{Deserialize, Serialize};
use skymark_core::{GrayImageView, UnitSquareFrame};
use std::collections::BTreeSet;

/// Image sampled by the backward pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SampleSource {
    #[default]
    Raw,
    Filtered,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct DecodeParams {
    /// Intensity a projected cell center must exceed to count as lit.
    pub backward_threshold: u8,
    pub sample_source: SampleSource,
}

impl Default for DecodeParams {
    fn default() -> Self {
        Self {
            backward_threshold: 128,
            sample_source: SampleSource::Raw,
        }
    }
}

/// Identities that may still be claimed in the current frame.
#[derive(Clone, Debug, Default)]
pub struct IdPool {
    remaining: BTreeSet<u16>,
}

impl IdPool {
    pub fn new(ids: impl IntoIterator<Item = u16>) -> Self {
        Self {
            remaining: ids.into_iter().collect(),
        }
    }

    /// Remove `id` from the pool; `false` if it was not available.
    pub fn claim(&mut self, id: u16) -> bool {
        self.remaining.remove(&id)
    }

    pub fn contains(&self, id: u16) -> bool {
        self.remaining.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.remaining.len()
    }

    pub fn is_empty(&self) -> bool {
        self.remaining.is_empty()
    }
}

#[derive(Clone, Debug)]
pub struct IdentityDecoder {
    params: DecodeParams,
}

impl IdentityDecoder {
    pub fn new(params: DecodeParams) -> Self {
        Self { params }
    }

    #[inline]
    pub fn params(&self) -> &DecodeParams {
        &self.params
    }

    /// Decode a frame's hypotheses.
    ///
    /// Forward decoding runs on every hypothesis first; backward decoding
    /// then runs, in order, on the ones that failed. Forward-decoded
    /// observations come first in the output, each group in input order.
    pub fn decode_all(
        &self,
        hypotheses: Vec<LandmarkObservation>,
        image: &GrayImageView<'_>,
        pool: &mut IdPool,
    ) -> Vec<LandmarkObservation> {
        let mut decoded = Vec::with_capacity(hypotheses.len());
        let mut pending = Vec::new();

        for mut obs in hypotheses {
            match forward_identity(&obs) {
                Some(id) if pool.claim(id) => {
                    obs.identity = Some(id);
                    decoded.push(obs);
                }
                _ => pending.push(obs),
            }
        }
        let forward = decoded.len();

        for mut obs in pending {
            if self.decode_backward(&mut obs, image, pool) {
                decoded.push(obs);
            } else {
                log::trace!("unidentified hypothesis at {:?}", obs.corners[1]);
            }
        }

        log::debug!(
            "decoded {} landmarks ({} forward, {} backward)",
            decoded.len(),
            forward,
            decoded.len() - forward
        );
        decoded
    }

    /// Backward-decode one observation in place.
    ///
    /// On success the identity is set and `id_points` are replaced by the
    /// projected centers of the lit cells.
    pub fn decode_backward(
        &self,
        obs: &mut LandmarkObservation,
        image: &GrayImageView<'_>,
        pool: &mut IdPool,
    ) -> bool {
        let threshold = self.params.backward_threshold;
        let Some((id, points)) = backward_identity(&obs.corners, image, threshold) else {
            return false;
        };
        if !pool.claim(id) {
            return false;
        }
        obs.identity = Some(id);
        obs.id_points = points;
        true
    }
}

/// Identity implied by an observation's id points, or `None` for
/// degenerate corners.
///
/// Points landing on a reserved corner cell add that cell's bit, which no
/// valid identity carries.
pub fn forward_identity(obs: &LandmarkObservation) -> Option<u16> {
    let frame = UnitSquareFrame::from_corners(&obs.corners)?;
    let id = obs.id_points.iter().fold(0u16, |acc, &p| {
        let local = frame.to_local(p);
        acc.wrapping_add(cell_bit(quantize(local.x), quantize(local.y)))
    });
    Some(id)
}

/// Identity read by sampling the image at every code cell center.
///
/// Returns the identity and the image positions of the lit cells, or
/// `None` if the corners are degenerate or a cell center falls outside
/// the image.
pub fn backward_identity(
    corners: &[Point2<f32>; 3],
    image: &GrayImageView<'_>,
    threshold: u8,
) -> Option<(u16, Vec<Point2<f32>>)> {
    let frame = UnitSquareFrame::from_corners(corners)?;
    let mut id = 0u16;
    let mut points = Vec::new();
    for (i, j) in code_cells() {
        let p = frame.to_image(cell_center(i, j));
        let value = image.get_nearest(p)?;
        if value > threshold {
            id |= cell_bit(i, j);
            points.push(p);
        }
    }
    Some((id, points))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::code::{identity_cells, CORNER_CELLS};
    use skymark_core::GrayImage;

    /// Image positions of a marker with apex at `origin` and cell pitch
    /// `pitch` (x to the right, y down).
    fn marker(id: u16, origin: Point2<f32>, pitch: f32) -> LandmarkObservation {
        let at = |(i, j): (usize, usize)| {
            Point2::new(origin.x + pitch * i as f32, origin.y + pitch * j as f32)
        };
        LandmarkObservation::new(
            CORNER_CELLS.map(at),
            identity_cells(id).into_iter().map(at).collect(),
        )
    }

    fn render(width: usize, height: usize, markers: &[&LandmarkObservation]) -> GrayImage {
        let mut img = GrayImage::new(width, height);
        for m in markers {
            for p in m.corners.iter().chain(&m.id_points) {
                img.fill_disk(*p, 3.0, 255);
            }
        }
        img
    }

    #[test]
    fn forward_decodes_exact_grid() {
        let id = cell_bit(1, 0) | cell_bit(2, 1) | cell_bit(3, 3);
        let obs = marker(id, Point2::new(40.0, 40.0), 20.0);
        assert_eq!(forward_identity(&obs), Some(id));
    }

    #[test]
    fn forward_tolerates_small_offsets() {
        let id = cell_bit(2, 0) | cell_bit(1, 2);
        let mut obs = marker(id, Point2::new(40.0, 40.0), 20.0);
        for p in obs.id_points.iter_mut() {
            p.x += 4.0;
            p.y -= 3.0;
        }
        assert_eq!(forward_identity(&obs), Some(id));
    }

    #[test]
    fn backward_recovers_identity_without_id_points() {
        let id = cell_bit(1, 1) | cell_bit(2, 2) | cell_bit(3, 3);
        let truth = marker(id, Point2::new(30.0, 30.0), 25.0);
        let img = render(140, 140, &[&truth]);

        let mut obs = LandmarkObservation::new(truth.corners, Vec::new());
        let mut pool = IdPool::new([id, 7 << 4]);
        let decoder = IdentityDecoder::new(DecodeParams::default());
        assert!(decoder.decode_backward(&mut obs, &img.view(), &mut pool));
        assert_eq!(obs.identity, Some(id));
        assert_eq!(obs.id_points, truth.id_points);
        assert!(!pool.contains(id));
    }

    #[test]
    fn backward_fails_when_grid_leaves_image() {
        let obs = marker(cell_bit(1, 1), Point2::new(5.0, 5.0), 30.0);
        let img = GrayImage::new(60, 60);
        assert!(backward_identity(&obs.corners, &img.view(), 128).is_none());
    }

    #[test]
    fn identity_is_claimed_once_per_frame() {
        let id = cell_bit(1, 0) | cell_bit(1, 1);
        let a = marker(id, Point2::new(20.0, 20.0), 15.0);
        let b = marker(id, Point2::new(120.0, 20.0), 15.0);
        let img = render(200, 100, &[&a, &b]);

        let decoder = IdentityDecoder::new(DecodeParams::default());
        let mut pool = IdPool::new([id]);
        let out = decoder.decode_all(vec![a.clone(), b], &img.view(), &mut pool);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].corners, a.corners);
        assert!(pool.is_empty());
    }

    #[test]
    fn forward_failures_fall_back_to_backward() {
        let id_a = cell_bit(2, 0) | cell_bit(1, 1);
        let id_b = cell_bit(1, 2) | cell_bit(3, 1);
        let a = marker(id_a, Point2::new(20.0, 20.0), 15.0);
        let b = marker(id_b, Point2::new(120.0, 20.0), 15.0);
        let img = render(200, 100, &[&a, &b]);

        // `b` lost its id points, so only the image can identify it
        let b_bare = LandmarkObservation::new(b.corners, Vec::new());
        let decoder = IdentityDecoder::new(DecodeParams::default());
        let mut pool = IdPool::new([id_a, id_b]);
        let out = decoder.decode_all(vec![b_bare, a.clone()], &img.view(), &mut pool);

        assert_eq!(out.len(), 2);
        assert_eq!(out[0].identity, Some(id_a));
        assert_eq!(out[1].identity, Some(id_b));
        assert_eq!(out[1].id_points, b.id_points);
    }

    #[test]
    fn unknown_identity_is_dropped() {
        let obs = marker(cell_bit(2, 2), Point2::new(20.0, 20.0), 15.0);
        let img = GrayImage::new(100, 100);
        let decoder = IdentityDecoder::new(DecodeParams::default());
        let mut pool = IdPool::new([cell_bit(1, 1)]);
        assert!(decoder.decode_all(vec![obs], &img.view(), &mut pool).is_empty());
        assert_eq!(pool.len(), 1);
    }
}
