use super::{DetectError, DetectorParams, LandmarkDetection};
use crate::{
    find_corner_hypotheses, IdPool, IdentityDecoder, LandmarkObservation, PointExtractor,
    SampleSource, SpatialClusterer,
};
use skymark_core::GrayImageView;

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Finds and identifies ceiling landmarks in grayscale frames.
#[derive(Clone, Debug)]
pub struct LandmarkDetector {
    params: DetectorParams,
    valid_ids: Vec<u16>,
    extractor: PointExtractor,
    clusterer: SpatialClusterer,
    decoder: IdentityDecoder,
}

impl LandmarkDetector {
    /// Create a detector accepting only the given identities.
    pub fn new(params: DetectorParams, valid_ids: impl IntoIterator<Item = u16>) -> Self {
        let mut valid_ids: Vec<u16> = valid_ids.into_iter().collect();
        valid_ids.sort_unstable();
        valid_ids.dedup();

        Self {
            extractor: PointExtractor::new(params.extractor.clone()),
            clusterer: SpatialClusterer::new(params.landmarks.clone()),
            decoder: IdentityDecoder::new(params.decode.clone()),
            params,
            valid_ids,
        }
    }

    #[inline]
    pub fn params(&self) -> &DetectorParams {
        &self.params
    }

    /// Identities the detector may report, ascending.
    #[inline]
    pub fn valid_ids(&self) -> &[u16] {
        &self.valid_ids
    }

    /// Identified landmarks of one frame.
    pub fn detect(
        &self,
        image: &GrayImageView<'_>,
    ) -> Result<Vec<LandmarkObservation>, DetectError> {
        Ok(self.run(image, false)?.landmarks)
    }

    /// Identified landmarks together with every intermediate product.
    pub fn detect_with_diagnostics(
        &self,
        image: &GrayImageView<'_>,
    ) -> Result<LandmarkDetection, DetectError> {
        self.run(image, true)
    }

    #[cfg_attr(
        feature = "tracing",
        instrument(
            level = "info",
            skip(self, image),
            fields(width = image.width, height = image.height)
        )
    )]
    fn run(
        &self,
        image: &GrayImageView<'_>,
        keep_intermediate: bool,
    ) -> Result<LandmarkDetection, DetectError> {
        image.validate()?;

        let filtered = self.extractor.filter(image);
        let points: Vec<_> = self.extractor.extract(&filtered.view()).collect();
        let clusters = self.clusterer.cluster(&points);

        let mut hypotheses: Vec<LandmarkObservation> = clusters
            .iter()
            .flat_map(|c| find_corner_hypotheses(c, &self.params.corners))
            .collect();

        log::debug!(
            "{} points, {} landmark clusters, {} corner hypotheses",
            points.len(),
            clusters.len(),
            hypotheses.len()
        );

        let sample_view = match self.params.decode.sample_source {
            SampleSource::Raw => *image,
            SampleSource::Filtered => filtered.view(),
        };
        let to_decode = if keep_intermediate {
            hypotheses.clone()
        } else {
            std::mem::take(&mut hypotheses)
        };
        let mut pool = IdPool::new(self.valid_ids.iter().copied());
        let landmarks = self.decoder.decode_all(to_decode, &sample_view, &mut pool);

        if !keep_intermediate {
            return Ok(LandmarkDetection {
                landmarks,
                points: Vec::new(),
                clusters: Vec::new(),
                hypotheses: Vec::new(),
                filtered: None,
            });
        }

        Ok(LandmarkDetection {
            landmarks,
            points,
            clusters,
            hypotheses,
            filtered: Some(filtered),
        })
    }
}
