//! Helpers between the `image` crate and the detector's buffer types.

use ::image::{DynamicImage, GrayImage, ImageReader};
use skymark_core::GrayImageView;
use std::path::Path;

#[derive(thiserror::Error, Debug)]
pub enum FrameError {
    #[error("expected an 8-bit single-channel frame, got {color:?}")]
    NotGray8 { color: ::image::ColorType },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Decode(#[from] ::image::ImageError),
}

/// Borrow an `image::GrayImage` as a detector view.
pub fn gray_view(img: &GrayImage) -> GrayImageView<'_> {
    GrayImageView {
        width: img.width() as usize,
        height: img.height() as usize,
        data: img.as_raw(),
    }
}

/// The 8-bit gray buffer of `img`. Frames are never converted: color or
/// 16-bit input is rejected.
pub fn as_gray8(img: &DynamicImage) -> Result<&GrayImage, FrameError> {
    img.as_luma8()
        .ok_or_else(|| FrameError::NotGray8 { color: img.color() })
}

/// Decode an 8-bit grayscale frame from disk.
pub fn load_gray8(path: impl AsRef<Path>) -> Result<GrayImage, FrameError> {
    match ImageReader::open(path)?.decode()? {
        DynamicImage::ImageLuma8(img) => Ok(img),
        other => Err(FrameError::NotGray8 {
            color: other.color(),
        }),
    }
}
