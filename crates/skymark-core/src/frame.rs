use nalgebra::{Matrix2, Point2, Vector2};

/// Affine map between an image triangle and the unit square.
///
/// The apex `corners[1]` maps to `(0, 0)`, `corners[0]` to `(1, 0)` and
/// `corners[2]` to `(0, 1)`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct UnitSquareFrame {
    origin: Vector2<f64>,
    axes: Matrix2<f64>,
    inverse: Matrix2<f64>,
}

impl UnitSquareFrame {
    /// Build the frame from three ordered corners.
    ///
    /// Returns `None` when the corners are (numerically) collinear.
    pub fn from_corners(corners: &[Point2<f32>; 3]) -> Option<Self> {
        let origin = to_f64(corners[1]);
        let x_axis = to_f64(corners[0]) - origin;
        let y_axis = to_f64(corners[2]) - origin;
        let axes = Matrix2::from_columns(&[x_axis, y_axis]);

        let scale = x_axis.norm() * y_axis.norm();
        if scale <= f64::EPSILON || axes.determinant().abs() <= 1e-9 * scale {
            return None;
        }
        let inverse = axes.try_inverse()?;
        Some(Self {
            origin,
            axes,
            inverse,
        })
    }

    /// Image point to unit-square coordinates.
    #[inline]
    pub fn to_local(&self, p: Point2<f32>) -> Point2<f64> {
        Point2::from(self.inverse * (to_f64(p) - self.origin))
    }

    /// Unit-square coordinates to image point.
    #[inline]
    pub fn to_image(&self, p: Point2<f64>) -> Point2<f32> {
        let v = self.axes * p.coords + self.origin;
        Point2::new(v.x as f32, v.y as f32)
    }
}

#[inline]
fn to_f64(p: Point2<f32>) -> Vector2<f64> {
    Vector2::new(p.x as f64, p.y as f64)
}
