use nalgebra::{Point3, UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};

/// Camera pose in the world frame.
///
/// `position` is the camera center; `orientation` rotates camera-frame
/// vectors into the world. With the identity orientation the camera looks
/// along world `+z`, i.e. straight up at the ceiling.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct EgoPose {
    pub position: Vector3<f64>,
    pub orientation: UnitQuaternion<f64>,
}

impl Default for EgoPose {
    fn default() -> Self {
        Self {
            position: Vector3::zeros(),
            orientation: UnitQuaternion::identity(),
        }
    }
}

impl EgoPose {
    pub fn new(position: Vector3<f64>, orientation: UnitQuaternion<f64>) -> Self {
        Self {
            position,
            orientation,
        }
    }

    /// World point expressed in the camera frame: `R^T (p - t)`.
    #[inline]
    pub fn world_to_camera(&self, p: &Point3<f64>) -> Point3<f64> {
        Point3::from(
            self.orientation
                .inverse_transform_vector(&(p.coords - self.position)),
        )
    }

    /// Rotation about the world z axis, radians.
    pub fn yaw(&self) -> f64 {
        self.orientation.euler_angles().2
    }

    /// The same pose flattened onto the floor: `z = 0`, yaw only.
    pub fn to_planar(&self) -> Self {
        Self {
            position: Vector3::new(self.position.x, self.position.y, 0.0),
            orientation: UnitQuaternion::from_euler_angles(0.0, 0.0, self.yaw()),
        }
    }
}
