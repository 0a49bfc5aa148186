//! Reprojection problem over the camera pose.
//!
//! Every frame becomes a fresh `tiny_solver` problem with two variables:
//! `position` (`[tx, ty, tz]`) and `orientation`, either a unit quaternion
//! stored as `[qx, qy, qz, qw]` on the quaternion manifold or a single yaw
//! angle. Each observed corner adds one two-row reprojection factor under a
//! Cauchy loss. The intrinsics are a constant of the factors.

use std::collections::HashMap;
use std::sync::Arc;

use crate::camera::MIN_DEPTH;
use crate::{CameraIntrinsics, EgoPose};
use nalgebra::{Point2, Point3, Quaternion, UnitQuaternion, Vector3};
use tiny_solver::factors::{na as ts_na, Factor};
use tiny_solver::loss_functions::CauchyLoss;
use tiny_solver::manifold::so3::QuaternionManifold;
use tiny_solver::problem::Problem;

pub(crate) const POSITION: &str = "position";
pub(crate) const ORIENTATION: &str = "orientation";

/// One observed corner and the world point it images.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ReprojectionResidual {
    pub observed: Point2<f64>,
    pub world_point: Point3<f64>,
}

/// How the orientation block moves.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OrientationManifold {
    /// Full rotation on the unit quaternion manifold.
    UnitQuaternion,
    /// Rotation about the camera z axis; for a yaw-only pose this is also
    /// the world z axis.
    Yaw,
}

impl OrientationManifold {
    fn dim(self) -> usize {
        match self {
            OrientationManifold::UnitQuaternion => 4,
            OrientationManifold::Yaw => 1,
        }
    }
}

/// `observed - project(R^T (p - t))` for one corner.
#[derive(Debug, Clone)]
pub(crate) struct ReprojectionFactor {
    world: [f64; 3],
    observed: [f64; 2],
    intrinsics: [f64; 4],
    orientation: OrientationManifold,
}

impl<T: ts_na::RealField> Factor<T> for ReprojectionFactor {
    fn residual_func(&self, params: &[ts_na::DVector<T>]) -> ts_na::DVector<T> {
        debug_assert_eq!(params.len(), 2, "expected [position, orientation] blocks");
        let c = |v: f64| ts_na::convert::<f64, T>(v);
        let t = &params[0];
        let q = &params[1];

        let rot = match self.orientation {
            OrientationManifold::UnitQuaternion => {
                ts_na::UnitQuaternion::from_quaternion(ts_na::Quaternion::new(
                    q[3].clone(),
                    q[0].clone(),
                    q[1].clone(),
                    q[2].clone(),
                ))
            }
            OrientationManifold::Yaw => {
                ts_na::UnitQuaternion::from_euler_angles(T::zero(), T::zero(), q[0].clone())
            }
        };
        let offset = ts_na::Vector3::new(
            c(self.world[0]) - t[0].clone(),
            c(self.world[1]) - t[1].clone(),
            c(self.world[2]) - t[2].clone(),
        );
        let pc = rot.inverse_transform_vector(&offset);

        let mut z = pc.z.clone();
        if z.clone().abs() < c(MIN_DEPTH) {
            z = if z < T::zero() {
                -c(MIN_DEPTH)
            } else {
                c(MIN_DEPTH)
            };
        }
        let [fx, fy, cx, cy] = self.intrinsics;
        let u = c(fx) * pc.x.clone() / z.clone() + c(cx);
        let v = c(fy) * pc.y.clone() / z + c(cy);
        ts_na::dvector![c(self.observed[0]) - u, c(self.observed[1]) - v]
    }
}

/// Pose refinement problem, rebuilt from scratch every frame.
#[derive(Clone, Debug)]
pub struct PoseProblem {
    camera: CameraIntrinsics,
    loss_scale: f64,
    residuals: Vec<ReprojectionResidual>,
    z_upper_bound: Option<f64>,
    orientation: Option<OrientationManifold>,
    planar: bool,
}

impl PoseProblem {
    /// `loss_scale` is the Cauchy scale in pixels.
    pub fn new(camera: CameraIntrinsics, loss_scale: f64) -> Self {
        Self {
            camera,
            loss_scale,
            residuals: Vec::new(),
            z_upper_bound: None,
            orientation: None,
            planar: false,
        }
    }

    #[inline]
    pub fn camera(&self) -> &CameraIntrinsics {
        &self.camera
    }

    #[inline]
    pub fn loss_scale(&self) -> f64 {
        self.loss_scale
    }

    /// Swap in a complete residual set.
    pub fn replace_residuals(&mut self, residuals: Vec<ReprojectionResidual>) {
        self.residuals = residuals;
    }

    pub fn residual_blocks(&self) -> &[ReprojectionResidual] {
        &self.residuals
    }

    pub fn residual_count(&self) -> usize {
        self.residuals.len()
    }

    pub fn set_z_upper_bound(&mut self, bound: f64) {
        self.z_upper_bound = Some(bound);
    }

    pub fn z_upper_bound(&self) -> Option<f64> {
        self.z_upper_bound
    }

    /// Put the orientation on a manifold. Only the first call has an
    /// effect; returns whether this call set it.
    pub fn set_orientation_manifold(&mut self, manifold: OrientationManifold) -> bool {
        if self.orientation.is_some() {
            return false;
        }
        self.orientation = Some(manifold);
        true
    }

    pub fn orientation_manifold(&self) -> Option<OrientationManifold> {
        self.orientation
    }

    /// Hold z fixed; with [`OrientationManifold::Yaw`] this leaves only the
    /// floor-plane motion free.
    pub fn set_planar(&mut self) {
        self.planar = true;
    }

    pub fn is_planar(&self) -> bool {
        self.planar
    }

    fn orientation_or_default(&self) -> OrientationManifold {
        self.orientation.unwrap_or(OrientationManifold::UnitQuaternion)
    }

    /// Solver problem and initial values for a solve starting at `pose`.
    pub(crate) fn build(
        &self,
        pose: &EgoPose,
    ) -> (Problem, HashMap<String, ts_na::DVector<f64>>) {
        let orientation = self.orientation_or_default();
        let mut problem = Problem::new();

        match orientation {
            OrientationManifold::UnitQuaternion => {
                problem.set_variable_manifold(ORIENTATION, Arc::new(QuaternionManifold));
            }
            OrientationManifold::Yaw => {}
        }
        if self.planar {
            problem.fix_variable(POSITION, 2);
        } else if let Some(bound) = self.z_upper_bound.filter(|b| b.is_finite()) {
            problem.set_variable_bounds(POSITION, 2, f64::NEG_INFINITY, bound);
        }

        let intrinsics = self.camera.to_array();
        for res in &self.residuals {
            let factor = ReprojectionFactor {
                world: [res.world_point.x, res.world_point.y, res.world_point.z],
                observed: [res.observed.x, res.observed.y],
                intrinsics,
                orientation,
            };
            problem.add_residual_block(
                2,
                &[POSITION, ORIENTATION],
                Box::new(factor),
                Some(Box::new(CauchyLoss::new(self.loss_scale))),
            );
        }

        let t = pose.position;
        let q = pose.orientation;
        let orientation_init = match orientation {
            OrientationManifold::UnitQuaternion => ts_na::dvector![q.i, q.j, q.k, q.w],
            OrientationManifold::Yaw => ts_na::dvector![pose.yaw()],
        };
        let initial = HashMap::from([
            (POSITION.to_string(), ts_na::dvector![t.x, t.y, t.z]),
            (ORIENTATION.to_string(), orientation_init),
        ]);
        (problem, initial)
    }

    /// Pose held by a solver variable map, or `None` if a block is missing.
    pub(crate) fn read_pose(
        &self,
        values: &HashMap<String, ts_na::DVector<f64>>,
    ) -> Option<EgoPose> {
        let t = values.get(POSITION).filter(|v| v.len() == 3)?;
        let q = values
            .get(ORIENTATION)
            .filter(|v| v.len() == self.orientation_or_default().dim())?;

        let mut position = Vector3::new(t[0], t[1], t[2]);
        if !self.planar {
            if let Some(bound) = self.z_upper_bound {
                position.z = position.z.min(bound);
            }
        }
        let orientation = match self.orientation_or_default() {
            OrientationManifold::UnitQuaternion => {
                UnitQuaternion::from_quaternion(Quaternion::new(q[3], q[0], q[1], q[2]))
            }
            OrientationManifold::Yaw => UnitQuaternion::from_euler_angles(0.0, 0.0, q[0]),
        };
        Some(EgoPose::new(position, orientation))
    }
}
