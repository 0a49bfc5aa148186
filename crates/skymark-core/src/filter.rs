//! Raster primitives used to isolate small bright blobs.
//!
//! The band-pass is a difference of two box filters: the narrow mean keeps
//! blobs about the size of a marker dot, the wide mean estimates the local
//! background which is then subtracted with saturation at zero.

use crate::{GrayImage, GrayImageView};
use nalgebra::Point2;
use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Difference-of-box-filters band-pass configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct BandPassParams {
    /// Side of the narrow (smoothing) box window in pixels.
    pub narrow_filter_size: usize,
    /// Side of the wide (background) box window in pixels.
    pub wide_filter_size: usize,
}

impl Default for BandPassParams {
    fn default() -> Self {
        Self {
            narrow_filter_size: 3,
            wide_filter_size: 11,
        }
    }
}

/// Summed-area table with one row and column of zero padding.
struct IntegralImage {
    stride: usize,
    sums: Vec<u64>,
}

impl IntegralImage {
    fn new(src: &GrayImageView<'_>) -> Self {
        let stride = src.width + 1;
        let mut sums = vec![0u64; stride * (src.height + 1)];
        for y in 0..src.height {
            let mut row = 0u64;
            for x in 0..src.width {
                row += src.data[y * src.width + x] as u64;
                sums[(y + 1) * stride + x + 1] = sums[y * stride + x + 1] + row;
            }
        }
        Self { stride, sums }
    }

    /// Sum over the half-open rectangle `[x0, x1) x [y0, y1)`.
    #[inline]
    fn rect_sum(&self, x0: usize, y0: usize, x1: usize, y1: usize) -> u64 {
        let s = self.stride;
        self.sums[y1 * s + x1] + self.sums[y0 * s + x0]
            - self.sums[y0 * s + x1]
            - self.sums[y1 * s + x0]
    }
}

/// Normalized box filter with a `size x size` window.
///
/// Windows are clipped at the image border and averaged over the pixels
/// they actually cover. A size of 0 or 1 copies the input.
pub fn box_filter(src: &GrayImageView<'_>, size: usize) -> GrayImage {
    if size <= 1 {
        return GrayImage {
            width: src.width,
            height: src.height,
            data: src.data.to_vec(),
        };
    }

    let integral = IntegralImage::new(src);
    let before = (size - 1) / 2;
    let after = size - 1 - before;
    let mut out = GrayImage::new(src.width, src.height);

    for y in 0..src.height {
        let y0 = y.saturating_sub(before);
        let y1 = (y + after + 1).min(src.height);
        for x in 0..src.width {
            let x0 = x.saturating_sub(before);
            let x1 = (x + after + 1).min(src.width);
            let area = ((x1 - x0) * (y1 - y0)) as u64;
            let sum = integral.rect_sum(x0, y0, x1, y1);
            out.data[y * src.width + x] = ((sum + area / 2) / area) as u8;
        }
    }
    out
}

/// Saturating per-pixel difference `a - b`.
///
/// Both images must have the same dimensions; the output takes the size of `a`
/// and treats missing pixels of `b` as zero.
pub fn subtract_saturating(a: &GrayImageView<'_>, b: &GrayImageView<'_>) -> GrayImage {
    let mut out = GrayImage::new(a.width, a.height);
    for (i, dst) in out.data.iter_mut().enumerate() {
        let rhs = b.data.get(i).copied().unwrap_or(0);
        *dst = a.data[i].saturating_sub(rhs);
    }
    out
}

/// Band-pass filter: narrow box mean minus wide box mean, clamped at zero.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "debug", skip(src, params), fields(width = src.width, height = src.height))
)]
pub fn band_pass(src: &GrayImageView<'_>, params: &BandPassParams) -> GrayImage {
    let narrow = box_filter(src, params.narrow_filter_size);
    let wide = box_filter(src, params.wide_filter_size);
    subtract_saturating(&narrow.view(), &wide.view())
}

/// Coordinates of every pixel strictly brighter than `threshold`, in
/// row-major order.
pub fn bright_pixels(src: &GrayImageView<'_>, threshold: u8) -> Vec<Point2<f32>> {
    let mut out = Vec::new();
    for y in 0..src.height {
        let row = &src.data[y * src.width..(y + 1) * src.width];
        for (x, &v) in row.iter().enumerate() {
            if v > threshold {
                out.push(Point2::new(x as f32, y as f32));
            }
        }
    }
    out
}
