//! Lifts pose constraints (normally a [`Tsr`]) into the configuration space of the robot,
//! using the kinematics provider for forward and inverse kinematics.

use std::sync::Arc;

use nalgebra::{DMatrix, DVector, Vector3};
use tracing::trace;

use crate::constraint::capabilities::{Differentiable, SampleGenerator, Sampleable, Testable};
use crate::jacobian::Jacobian;
use crate::kinematic_traits::{Configuration, Kinematics, Pose};
use crate::tsr::Tsr;

/// Configuration is satisfied if the end-effector pose satisfies the pose testable.
pub struct FrameTestable {
    kinematics: Arc<dyn Kinematics>,
    pose_testable: Arc<dyn Testable<Pose>>,
}

impl FrameTestable {
    pub fn new(kinematics: Arc<dyn Kinematics>, pose_testable: Arc<dyn Testable<Pose>>) -> Self {
        Self { kinematics, pose_testable }
    }
}

impl Testable for FrameTestable {
    fn is_satisfied(&self, qs: &Configuration) -> bool {
        qs.len() == self.kinematics.dof()
            && self.pose_testable.is_satisfied(&self.kinematics.forward(qs))
    }
}

/// Differentiable form of a TSR in the configuration space. The value is the signed
/// excess of the end-effector pose beyond the TSR bounds. The Jacobian is the geometric
/// Jacobian of the end-effector, moved to the point the TSR actually constrains (the
/// end-effector minus its `tw_e` offset) and expressed in the TSR frame.
pub struct FrameDifferentiable {
    kinematics: Arc<dyn Kinematics>,
    tsr: Arc<Tsr>,
}

impl FrameDifferentiable {
    pub fn new(kinematics: Arc<dyn Kinematics>, tsr: Arc<Tsr>) -> Self {
        Self { kinematics, tsr }
    }
}

impl Differentiable for FrameDifferentiable {
    fn constraint_dimension(&self) -> usize {
        6
    }

    fn value(&self, qs: &Configuration) -> DVector<f64> {
        let excess = self.tsr.excess(&self.kinematics.forward(qs));
        DVector::from_column_slice(excess.as_slice())
    }

    fn jacobian(&self, qs: &Configuration) -> DMatrix<f64> {
        let pose = self.kinematics.forward(qs);
        let constrained_point = (pose * self.tsr.tw_e.inverse()).translation.vector;
        let offset: Vector3<f64> = constrained_point - pose.translation.vector;

        Jacobian::from_matrix(self.kinematics.jacobian(qs))
            .shifted(&offset)
            .in_frame(&self.tsr.t0_w.rotation)
            .into_matrix()
    }
}

/// Samples configurations by drawing end-effector poses from a pose sampleable and solving
/// inverse kinematics for them. Seeds for the solver come from the seed sampleable; the
/// first attempt for every pose may use a fixed initial seed (normally the current robot
/// configuration) as it gives the solution closest to where the robot is.
pub struct InverseKinematicsSampleable {
    kinematics: Arc<dyn Kinematics>,
    pose_sampleable: Arc<dyn Sampleable<Pose>>,
    seed_sampleable: Arc<dyn Sampleable>,
    initial_seed: Option<Configuration>,
    max_num_trials: usize,
}

impl InverseKinematicsSampleable {
    /// `max_num_trials` is the number of inverse kinematics attempts (different seeds) per
    /// pose; a `sample` call fails once they are all used up.
    pub fn new(
        kinematics: Arc<dyn Kinematics>,
        pose_sampleable: Arc<dyn Sampleable<Pose>>,
        seed_sampleable: Arc<dyn Sampleable>,
        max_num_trials: usize,
    ) -> Self {
        Self {
            kinematics,
            pose_sampleable,
            seed_sampleable,
            initial_seed: None,
            max_num_trials,
        }
    }

    pub fn with_initial_seed(mut self, seed: Configuration) -> Self {
        self.initial_seed = Some(seed);
        self
    }
}

impl Sampleable for InverseKinematicsSampleable {
    fn create_sample_generator(&self) -> Box<dyn SampleGenerator> {
        Box::new(IkSampleGenerator {
            kinematics: self.kinematics.clone(),
            pose_generator: self.pose_sampleable.create_sample_generator(),
            seed_generator: self.seed_sampleable.create_sample_generator(),
            initial_seed: self.initial_seed.clone(),
            max_num_trials: self.max_num_trials,
        })
    }
}

struct IkSampleGenerator {
    kinematics: Arc<dyn Kinematics>,
    pose_generator: Box<dyn SampleGenerator<Pose>>,
    seed_generator: Box<dyn SampleGenerator>,
    initial_seed: Option<Configuration>,
    max_num_trials: usize,
}

impl SampleGenerator for IkSampleGenerator {
    fn can_sample(&self) -> bool {
        self.pose_generator.can_sample()
    }

    fn sample(&mut self, out: &mut Configuration) -> bool {
        if !self.pose_generator.can_sample() {
            return false;
        }
        let mut pose = Pose::identity();
        if !self.pose_generator.sample(&mut pose) {
            return false;
        }

        let mut seed = Configuration::zeros(self.kinematics.dof());
        for trial in 0..self.max_num_trials {
            match (&self.initial_seed, trial) {
                (Some(initial), 0) => seed.clone_from(initial),
                _ => {
                    if !self.seed_generator.can_sample() || !self.seed_generator.sample(&mut seed) {
                        return false;
                    }
                }
            }
            if let Some(solution) = self.kinematics.inverse(&pose, &seed) {
                *out = solution;
                return true;
            }
        }
        trace!("No IK solution after {} trials", self.max_num_trials);
        false
    }

    fn num_samples_remaining(&self) -> Option<usize> {
        self.pose_generator.num_samples_remaining()
    }
}
