use crate::{ClusterParams, CornerSearchParams, DecodeParams, ExtractorParams};
use serde::{Deserialize, Serialize};

/// Configuration for the landmark detector.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorParams {
    /// Band-pass, threshold and pixel grouping.
    pub extractor: ExtractorParams,
    /// Grouping of extracted points into landmark candidates.
    ///
    /// `min_points`/`max_points` bound the number of dots a landmark may
    /// show: three corners plus its lit code cells.
    pub landmarks: ClusterParams,
    pub corners: CornerSearchParams,
    pub decode: DecodeParams,
}
