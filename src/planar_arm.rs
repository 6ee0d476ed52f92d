//! Planar serial arm: revolute joints about the z axis, links along the local x axis.
//! Small enough to reason about in tests, yet with redundancy, singularities and joint
//! limits like a real arm.

use std::f64::consts::PI;

use nalgebra::{DMatrix, DVector, Isometry3, Point3, Translation3, UnitQuaternion, Vector3};

use crate::jacobian::damped_least_squares;
use crate::kinematic_traits::{Configuration, Kinematics, Pose};

const IK_MAX_ITERATIONS: usize = 200;
const IK_TOLERANCE: f64 = 1e-10;
const IK_DAMPING: f64 = 1e-3;

/// Out-of-plane tolerance of IK targets.
const PLANE_TOLERANCE: f64 = 1e-6;

#[derive(Debug, Clone)]
pub struct PlanarArm {
    /// Link lengths, one per joint.
    pub links: Vec<f64>,
    /// Pose of the first joint in the world.
    pub base: Pose,
}

impl PlanarArm {
    pub fn new(links: Vec<f64>) -> Self {
        Self { links, base: Isometry3::identity() }
    }

    pub fn with_base(mut self, base: Pose) -> Self {
        self.base = base;
        self
    }

    /// Total reach with all joints stretched.
    pub fn reach(&self) -> f64 {
        self.links.iter().sum()
    }

    /// Position and heading of the tool in the base frame.
    fn planar_forward(&self, qs: &Configuration) -> (f64, f64, f64) {
        let (mut x, mut y, mut phi) = (0.0, 0.0, 0.0);
        for (link, q) in self.links.iter().zip(qs.iter()) {
            phi += q;
            x += link * phi.cos();
            y += link * phi.sin();
        }
        (x, y, phi)
    }

    /// Rows: x, y, and (if `with_heading`) the heading. Columns of joints missing from
    /// `qs` are zero.
    fn planar_jacobian(&self, qs: &Configuration, with_heading: bool) -> DMatrix<f64> {
        let rows = if with_heading { 3 } else { 2 };
        let mut jacobian = DMatrix::zeros(rows, self.links.len());
        let mut phi = 0.0;
        let mut headings = Vec::with_capacity(self.links.len());
        for q in qs.iter().take(self.links.len()) {
            phi += q;
            headings.push(phi);
        }
        let n = headings.len();
        for i in 0..n {
            for k in i..n {
                jacobian[(0, i)] -= self.links[k] * headings[k].sin();
                jacobian[(1, i)] += self.links[k] * headings[k].cos();
            }
            if with_heading {
                jacobian[(2, i)] = 1.0;
            }
        }
        jacobian
    }

    /// World positions of the base, every joint after it and the tool tip.
    pub fn joint_positions(&self, qs: &Configuration) -> Vec<Vector3<f64>> {
        let mut points = Vec::with_capacity(self.links.len() + 1);
        points.push(self.base.translation.vector);
        let (mut x, mut y, mut phi) = (0.0, 0.0, 0.0);
        for (link, q) in self.links.iter().zip(qs.iter()) {
            phi += q;
            x += link * phi.cos();
            y += link * phi.sin();
            points.push((self.base * Point3::new(x, y, 0.0)).coords);
        }
        points
    }
}

impl Kinematics for PlanarArm {
    fn dof(&self) -> usize {
        self.links.len()
    }

    fn forward(&self, qs: &Configuration) -> Pose {
        let (x, y, phi) = self.planar_forward(qs);
        let local = Isometry3::from_parts(
            Translation3::new(x, y, 0.0),
            UnitQuaternion::from_axis_angle(&Vector3::z_axis(), phi),
        );
        self.base * local
    }

    /// Damped least squares from the seed. Arms with three or more joints also match the
    /// heading, two joint arms only the position. Targets outside the arm plane, or tilted
    /// out of it, have no solution.
    fn inverse(&self, pose: &Pose, seed: &Configuration) -> Option<Configuration> {
        if seed.len() != self.dof() {
            return None;
        }
        let target = self.base.inverse() * pose;
        if target.translation.z.abs() > PLANE_TOLERANCE {
            return None;
        }
        let z_axis = target.rotation * Vector3::z();
        let with_heading = self.dof() >= 3;
        if with_heading && (z_axis.z - 1.0).abs() > PLANE_TOLERANCE {
            return None;
        }
        let x_axis = target.rotation * Vector3::x();
        let heading = x_axis.y.atan2(x_axis.x);

        let mut qs = seed.clone();
        for _ in 0..IK_MAX_ITERATIONS {
            let (x, y, phi) = self.planar_forward(&qs);
            let error = if with_heading {
                DVector::from_vec(vec![
                    target.translation.x - x,
                    target.translation.y - y,
                    wrap_angle(heading - phi),
                ])
            } else {
                DVector::from_vec(vec![target.translation.x - x, target.translation.y - y])
            };
            if error.norm() < IK_TOLERANCE {
                return Some(qs.map(wrap_angle));
            }
            let step = damped_least_squares(&self.planar_jacobian(&qs, with_heading), &error, IK_DAMPING)?;
            if !step.iter().all(|s| s.is_finite()) {
                return None;
            }
            qs += step;
        }
        None
    }
}

/// Angle in (-π, π].
pub(crate) fn wrap_angle(angle: f64) -> f64 {
    let wrapped = angle.rem_euclid(2.0 * PI);
    if wrapped > PI { wrapped - 2.0 * PI } else { wrapped }
}
