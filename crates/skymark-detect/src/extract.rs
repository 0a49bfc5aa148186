use crate::{ClusterParams, SpatialClusterer};
use nalgebra::Point2;
use serde::{Deserialize, Serialize};
use skymark_core::{band_pass, bright_pixels, BandPassParams, GrayImage, GrayImageView};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Bright-spot extraction parameters.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorParams {
    pub band_pass: BandPassParams,
    /// Filtered intensity a pixel must exceed to count as bright.
    pub threshold: u8,
    /// Grouping of bright pixels into spots.
    pub pixel_clusters: ClusterParams,
}

impl Default for ExtractorParams {
    fn default() -> Self {
        Self {
            band_pass: BandPassParams::default(),
            threshold: 20,
            pixel_clusters: ClusterParams {
                radius: 3.0,
                min_points: 1,
                max_points: 1000,
            },
        }
    }
}

/// Turns a grayscale frame into bright-spot centroids.
#[derive(Clone, Debug)]
pub struct PointExtractor {
    params: ExtractorParams,
    clusterer: SpatialClusterer,
}

impl PointExtractor {
    pub fn new(params: ExtractorParams) -> Self {
        let clusterer = SpatialClusterer::new(params.pixel_clusters.clone());
        Self { params, clusterer }
    }

    #[inline]
    pub fn params(&self) -> &ExtractorParams {
        &self.params
    }

    /// Band-pass filter a frame.
    pub fn filter(&self, image: &GrayImageView<'_>) -> GrayImage {
        band_pass(image, &self.params.band_pass)
    }

    /// Centroids of the bright spots of an already filtered frame.
    ///
    /// Pixels are thresholded and clustered up front; centroids are
    /// computed as the iterator is consumed.
    #[cfg_attr(
        feature = "tracing",
        instrument(
            level = "debug",
            skip(self, filtered),
            fields(width = filtered.width, height = filtered.height)
        )
    )]
    pub fn extract(&self, filtered: &GrayImageView<'_>) -> impl Iterator<Item = Point2<f32>> {
        let pixels = bright_pixels(filtered, self.params.threshold);
        let spots = self.clusterer.cluster(&pixels);
        log::debug!("{} bright pixels in {} spots", pixels.len(), spots.len());
        spots.into_iter().filter_map(|spot| centroid(&spot))
    }
}

/// Mean position of a point set, `None` when empty.
pub fn centroid(points: &[Point2<f32>]) -> Option<Point2<f32>> {
    if points.is_empty() {
        return None;
    }
    let n = points.len() as f64;
    let (sx, sy) = points
        .iter()
        .fold((0.0f64, 0.0f64), |(sx, sy), p| (sx + p.x as f64, sy + p.y as f64));
    Some(Point2::new((sx / n) as f32, (sy / n) as f32))
}
