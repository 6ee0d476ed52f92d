//! Capability interface the planner needs from the robot model.

extern crate nalgebra as na;

use na::{DMatrix, DVector, Isometry3};

/// Pose is used a pose of the end-effector. It contains both Cartesian position and rotation quaternion
/// ```
/// extern crate nalgebra as na;
/// use na::{Isometry3, Translation3, UnitQuaternion, Vector3};
///
/// type Pose = Isometry3<f64>;
///
/// let translation = Translation3::new(1.0, 0.0, 0.0);
/// // The quaternion should be normalized to represent a valid rotation.
/// let rotation = UnitQuaternion::from_quaternion(na::Quaternion::new(1.0, 0.0, 0.0, 1.0).normalize());
/// let transform = Pose::from_parts(translation, rotation);
/// ```
pub type Pose = Isometry3<f64>;

/// Position of the robot in its configuration space, one value per joint. Unlike a fixed
/// size array, the number of joints is only known at run time.
pub type Configuration = DVector<f64>;

/// Geometric Jacobian, 6 rows (linear x, y, z then angular x, y, z velocity) and one
/// column per joint.
pub type JacobianMatrix = DMatrix<f64>;

/// Default disturbance used when the Jacobian is computed numerically.
pub const JACOBIAN_EPSILON: f64 = 1e-6;

/// Kinematics provider. Implementations must be pure: none of the methods may change
/// any shared state, so they can be called from constraint checks running in parallel.
pub trait Kinematics: Send + Sync {
    /// Number of joints (dimension of the configuration space).
    fn dof(&self) -> usize;

    /// Pose of the end-effector for the given joint positions.
    fn forward(&self, qs: &Configuration) -> Pose;

    /// Attempts inverse kinematics for the given end-effector pose, iterating from `seed`.
    /// Returns None if the solver does not converge or the pose is not reachable.
    fn inverse(&self, pose: &Pose, seed: &Configuration) -> Option<Configuration>;

    /// Geometric Jacobian at the given joint positions, expressed in the world frame and
    /// taken at the origin of the end-effector frame. The default implementation
    /// differentiates [`Kinematics::forward`] numerically.
    fn jacobian(&self, qs: &Configuration) -> JacobianMatrix {
        crate::jacobian::compute_jacobian(self, qs, JACOBIAN_EPSILON)
    }
}
