extern crate nalgebra as na;
use na::{DMatrix, DVector, Matrix3, UnitQuaternion, Vector3};
use rayon::prelude::*;
use crate::kinematic_traits::{Configuration, JacobianMatrix, Kinematics};

/// Struct representing the Jacobian matrix
pub struct Jacobian {
    /// A 6 x dof matrix representing the Jacobian
    ///
    /// The Jacobian matrix maps the joint velocities to the end-effector velocities.
    /// Each column corresponds to a joint, and each row corresponds to a degree of freedom
    /// of the end-effector (linear and angular velocities).
    matrix: JacobianMatrix,
}

impl Jacobian {
    /// Wraps already computed matrix (as returned by [`Kinematics::jacobian`]).
    pub fn from_matrix(matrix: JacobianMatrix) -> Self {
        Self { matrix }
    }

    pub fn matrix(&self) -> &JacobianMatrix {
        &self.matrix
    }

    pub fn into_matrix(self) -> JacobianMatrix {
        self.matrix
    }

    /// Moves the reference point of the linear rows by `offset` (world frame vector from the
    /// current reference point to the new one). Angular rows do not change:
    /// v_p = v + ω × offset.
    pub fn shifted(&self, offset: &Vector3<f64>) -> Self {
        let mut matrix = self.matrix.clone();
        for c in 0..matrix.ncols() {
            let angular = Vector3::new(matrix[(3, c)], matrix[(4, c)], matrix[(5, c)]);
            let extra = angular.cross(offset);
            for r in 0..3 {
                matrix[(r, c)] += extra[r];
            }
        }
        Self { matrix }
    }

    /// Expresses both linear and angular rows in the frame with the given orientation
    /// (rotation from that frame into the world).
    pub fn in_frame(&self, frame: &UnitQuaternion<f64>) -> Self {
        let r: Matrix3<f64> = frame.inverse().to_rotation_matrix().into_inner();
        let mut matrix = self.matrix.clone();
        for c in 0..matrix.ncols() {
            let linear = r * Vector3::new(matrix[(0, c)], matrix[(1, c)], matrix[(2, c)]);
            let angular = r * Vector3::new(matrix[(3, c)], matrix[(4, c)], matrix[(5, c)]);
            for i in 0..3 {
                matrix[(i, c)] = linear[i];
                matrix[(i + 3, c)] = angular[i];
            }
        }
        Self { matrix }
    }
}

/// Damped least squares step: solves J dq = error as dq = Jᵀ (J Jᵀ + λ²I)⁻¹ error.
/// Works for any number of rows and columns and stays bounded near singularities.
/// Returns None if the damped system still cannot be inverted (zero damping on a
/// singular Jacobian).
pub fn damped_least_squares(jacobian: &DMatrix<f64>, error: &DVector<f64>, damping: f64) -> Option<DVector<f64>> {
    let rows = jacobian.nrows();
    let jjt = jacobian * jacobian.transpose() + DMatrix::<f64>::identity(rows, rows) * (damping * damping);
    let inverse = jjt.try_inverse()?;
    Some(jacobian.transpose() * (inverse * error))
}

/// Function to compute the Jacobian matrix for a given robot and joint configuration
///
/// # Arguments
///
/// * `robot` - A reference to the robot implementing the Kinematics trait
/// * `joints` - A reference to the joint configuration
/// * `epsilon` - A small value used for numerical differentiation
///
/// # Returns
///
/// A 6 x dof matrix representing the Jacobian
///
/// The Jacobian matrix maps the joint velocities to the end-effector velocities.
/// Each column corresponds to a joint, and each row corresponds to a degree of freedom
/// of the end-effector (linear and angular velocities).
pub fn compute_jacobian<K: Kinematics + ?Sized>(robot: &K, joints: &Configuration, epsilon: f64) -> JacobianMatrix {
    let dof = joints.len();
    let mut jacobian = DMatrix::zeros(6, dof);
    let current_pose = robot.forward(joints);
    let current_position = current_pose.translation.vector;
    let current_orientation = current_pose.rotation;

    // Parallelize the loop using rayon
    let jacobian_columns: Vec<_> = (0..dof).into_par_iter().map(|i| {
        let mut perturbed_qs = joints.clone();
        perturbed_qs[i] += epsilon;
        let perturbed_pose = robot.forward(&perturbed_qs);
        let perturbed_position = perturbed_pose.translation.vector;
        let perturbed_orientation = perturbed_pose.rotation;

        let delta_position = (perturbed_position - current_position) / epsilon;
        let delta_orientation = (perturbed_orientation * current_orientation.inverse()).scaled_axis() / epsilon;

        (delta_position, delta_orientation)
    }).collect();

    for (i, (delta_position, delta_orientation)) in jacobian_columns.into_iter().enumerate() {
        jacobian.fixed_view_mut::<3, 1>(0, i).copy_from(&delta_position);
        jacobian.fixed_view_mut::<3, 1>(3, i).copy_from(&delta_orientation);
    }

    jacobian
}
