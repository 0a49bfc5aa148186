use nalgebra::Point2;

/// Errors raised when a raw buffer cannot be interpreted as a single-channel image.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ImageError {
    #[error("image has no pixels (width={width}, height={height})")]
    EmptyImage { width: usize, height: usize },

    #[error("grayscale buffer length mismatch (expected {expected} bytes, got {got})")]
    BufferSizeMismatch { expected: usize, got: usize },
}

#[derive(Clone, Copy, Debug)]
pub struct GrayImageView<'a> {
    pub width: usize,
    pub height: usize,
    pub data: &'a [u8], // row-major, len = w*h
}

impl<'a> GrayImageView<'a> {
    /// Wrap a row-major 8-bit buffer, rejecting empty or multi-channel data.
    pub fn new(width: usize, height: usize, data: &'a [u8]) -> Result<Self, ImageError> {
        let view = Self {
            width,
            height,
            data,
        };
        view.validate()?;
        Ok(view)
    }

    /// Check that the view holds exactly one byte per pixel.
    pub fn validate(&self) -> Result<(), ImageError> {
        if self.width == 0 || self.height == 0 {
            return Err(ImageError::EmptyImage {
                width: self.width,
                height: self.height,
            });
        }
        let expected = self.width * self.height;
        if self.data.len() != expected {
            return Err(ImageError::BufferSizeMismatch {
                expected,
                got: self.data.len(),
            });
        }
        Ok(())
    }

    #[inline]
    pub fn contains(&self, x: i64, y: i64) -> bool {
        x >= 0 && y >= 0 && (x as usize) < self.width && (y as usize) < self.height
    }

    /// Pixel at integer coordinates, `None` outside the image.
    #[inline]
    pub fn get(&self, x: i64, y: i64) -> Option<u8> {
        if !self.contains(x, y) {
            return None;
        }
        Some(self.data[y as usize * self.width + x as usize])
    }

    /// Pixel nearest to a sub-pixel position, `None` outside the image.
    #[inline]
    pub fn get_nearest(&self, p: Point2<f32>) -> Option<u8> {
        self.get(p.x.round() as i64, p.y.round() as i64)
    }
}

#[derive(Clone, Debug)]
pub struct GrayImage {
    pub width: usize,
    pub height: usize,
    pub data: Vec<u8>,
}

impl GrayImage {
    /// Black image of the given size.
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            data: vec![0; width * height],
        }
    }

    pub fn view(&self) -> GrayImageView<'_> {
        GrayImageView {
            width: self.width,
            height: self.height,
            data: &self.data,
        }
    }

    /// Paint a filled disk. Pixels whose centers lie within `radius` of
    /// `center` are set to `value`; the disk is clipped to the image.
    pub fn fill_disk(&mut self, center: Point2<f32>, radius: f32, value: u8) {
        if self.width == 0 || self.height == 0 || radius < 0.0 {
            return;
        }
        let r2 = radius * radius;
        let x0 = (center.x - radius).floor().max(0.0) as usize;
        let y0 = (center.y - radius).floor().max(0.0) as usize;
        let x1 = ((center.x + radius).ceil().max(0.0) as usize).min(self.width - 1);
        let y1 = ((center.y + radius).ceil().max(0.0) as usize).min(self.height - 1);
        for y in y0..=y1 {
            for x in x0..=x1 {
                let dx = x as f32 - center.x;
                let dy = y as f32 - center.y;
                if dx * dx + dy * dy <= r2 {
                    self.data[y * self.width + x] = value;
                }
            }
        }
    }
}
