//! Robot shared between planning calls: kinematics, joint bounds and the live
//! configuration behind a mutex.

use std::ops::{Deref, DerefMut};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::constraint::bounds::JointBounds;
use crate::kinematic_traits::{Configuration, Kinematics, Pose};
use crate::planning_error::{check_dimension, PlanningError};

pub struct Robot {
    kinematics: Arc<dyn Kinematics>,
    bounds: Arc<JointBounds>,
    configuration: Mutex<Configuration>,
}

impl Robot {
    pub fn new(
        kinematics: Arc<dyn Kinematics>,
        bounds: Arc<JointBounds>,
        configuration: Configuration,
    ) -> Result<Self, PlanningError> {
        check_dimension(kinematics.dof(), bounds.dof())?;
        check_dimension(kinematics.dof(), configuration.len())?;
        Ok(Self { kinematics, bounds, configuration: Mutex::new(configuration) })
    }

    pub fn kinematics(&self) -> &Arc<dyn Kinematics> {
        &self.kinematics
    }

    pub fn bounds(&self) -> &Arc<JointBounds> {
        &self.bounds
    }

    pub fn dof(&self) -> usize {
        self.kinematics.dof()
    }

    /// Copy of the live configuration.
    pub fn configuration(&self) -> Configuration {
        self.lock().clone()
    }

    pub fn set_configuration(&self, qs: Configuration) -> Result<(), PlanningError> {
        check_dimension(self.dof(), qs.len())?;
        *self.lock() = qs;
        Ok(())
    }

    /// Pose of the end effector in the live configuration.
    pub fn end_effector_pose(&self) -> Pose {
        let qs = self.lock();
        self.kinematics.forward(&qs)
    }

    /// Exclusive access to the live configuration. A poisoned mutex is recovered: the
    /// configuration is a plain value and stays consistent.
    pub fn lock(&self) -> MutexGuard<'_, Configuration> {
        self.configuration.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Locks the robot and saves its configuration, restoring it when the guard drops.
    pub fn save_state(&self) -> StateSaver<'_> {
        StateSaver::new(self.lock())
    }
}

/// Holds the robot lock for a planning call and puts the saved configuration back on
/// every exit path, including early returns, errors and unwinding.
pub struct StateSaver<'a> {
    live: MutexGuard<'a, Configuration>,
    saved: Configuration,
}

impl<'a> StateSaver<'a> {
    pub fn new(live: MutexGuard<'a, Configuration>) -> Self {
        let saved = live.clone();
        Self { live, saved }
    }

    /// Configuration at the time the state was saved.
    pub fn saved(&self) -> &Configuration {
        &self.saved
    }
}

impl Deref for StateSaver<'_> {
    type Target = Configuration;

    fn deref(&self) -> &Configuration {
        &self.live
    }
}

impl DerefMut for StateSaver<'_> {
    fn deref_mut(&mut self) -> &mut Configuration {
        &mut self.live
    }
}

impl Drop for StateSaver<'_> {
    fn drop(&mut self) {
        self.live.clone_from(&self.saved);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planar_arm::PlanarArm;

    fn robot() -> Robot {
        let arm = PlanarArm::new(vec![1.0, 1.0]);
        let bounds = Arc::new(JointBounds::unlimited(2));
        Robot::new(Arc::new(arm), bounds, Configuration::from_vec(vec![0.1, 0.2])).unwrap()
    }

    fn mutate_and_fail(robot: &Robot) -> Result<(), PlanningError> {
        let mut saver = robot.save_state();
        *saver = Configuration::from_vec(vec![1.0, 1.0]);
        Err(PlanningError::EmptyGoalSet)
    }

    #[test]
    fn test_restored_on_error() {
        let robot = robot();
        assert!(mutate_and_fail(&robot).is_err());
        assert_eq!(robot.configuration(), Configuration::from_vec(vec![0.1, 0.2]));
    }

    #[test]
    fn test_restored_after_panic() {
        let robot = robot();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let mut saver = robot.save_state();
            saver[0] = 3.0;
            panic!("planning failed");
        }));
        assert!(result.is_err());
        assert_eq!(robot.configuration(), Configuration::from_vec(vec![0.1, 0.2]));
    }

    #[test]
    fn test_dimension_checks() {
        let robot = robot();
        assert!(robot.set_configuration(Configuration::from_vec(vec![0.0])).is_err());
        let arm = PlanarArm::new(vec![1.0, 1.0]);
        assert!(Robot::new(
            Arc::new(arm), Arc::new(JointBounds::unlimited(3)), Configuration::zeros(2)
        ).is_err());
    }
}
