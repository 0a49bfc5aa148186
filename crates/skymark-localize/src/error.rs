/// Errors returned by [`PoseEstimator::update`](crate::PoseEstimator::update).
///
/// Either error aborts the whole update: no residual is replaced and the
/// pose is left as it was.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum LocalizeError {
    #[error("landmark {id}: observed {observed} points but the map stores {expected}")]
    PointCountMismatch {
        id: u16,
        observed: usize,
        expected: usize,
    },

    #[error("landmark {id} is not in the map")]
    UnknownLandmark { id: u16 },
}

/// Errors raised while building or loading a landmark map.
#[derive(thiserror::Error, Debug)]
pub enum MapError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error("landmark {id} appears more than once")]
    DuplicateLandmark { id: u16 },

    #[error("identity {id:#06x} uses reserved corner cells")]
    InvalidIdentity { id: u16 },

    #[error("landmark {id} needs either `points` or `spacing`")]
    MissingPoints { id: u16 },

    #[error("landmark {id} has {got} points, its identity implies {expected}")]
    PointCount { id: u16, expected: usize, got: usize },
}
