use skymark_core::ImageError;

/// Errors returned by the landmark detector.
///
/// A frame without any identifiable landmark is not an error; the detector
/// returns an empty list.
#[derive(thiserror::Error, Debug)]
pub enum DetectError {
    #[error("invalid input image: {0}")]
    InvalidInput(#[from] ImageError),
}
