use nalgebra::{Point2, Point3};
use serde::{Deserialize, Serialize};

/// Smallest depth used when projecting; keeps points on the image plane finite.
pub(crate) const MIN_DEPTH: f64 = 1e-9;

/// Pinhole intrinsics `[fx, fy, cx, cy]` in pixels, no distortion.
///
/// The camera frame has x to the right, y down and z along the optical
/// axis, matching image coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CameraIntrinsics {
    pub fx: f64,
    pub fy: f64,
    pub cx: f64,
    pub cy: f64,
}

impl CameraIntrinsics {
    pub fn new(fx: f64, fy: f64, cx: f64, cy: f64) -> Self {
        Self { fx, fy, cx, cy }
    }

    pub fn from_array(k: [f64; 4]) -> Self {
        Self::new(k[0], k[1], k[2], k[3])
    }

    pub fn to_array(&self) -> [f64; 4] {
        [self.fx, self.fy, self.cx, self.cy]
    }

    /// Project a camera-frame point to pixels.
    #[inline]
    pub fn project(&self, p: &Point3<f64>) -> Point2<f64> {
        let z = safe_depth(p.z);
        Point2::new(self.fx * p.x / z + self.cx, self.fy * p.y / z + self.cy)
    }
}

#[inline]
fn safe_depth(z: f64) -> f64 {
    if z.abs() < MIN_DEPTH {
        MIN_DEPTH.copysign(z)
    } else {
        z
    }
}
