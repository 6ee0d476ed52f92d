//! Defines the planner parameter data structures

#[cfg(feature = "allow_filesystem")]
use serde::Deserialize;

use crate::planning_error::{check_positive, PlanningError};

/// Parameters of the constrained bidirectional tree planner (CRRT-Connect) and of the
/// constraint objects the planning façade builds around it.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "allow_filesystem", derive(Deserialize), serde(default))]
pub struct CrrtPlannerParameters {
    /// Maximal number of inverse kinematics attempts (seeds) per pose sample.
    pub max_num_trials: usize,

    /// Maximal configuration space distance a single extension moves towards its target,
    /// before projection.
    pub max_extension_distance: f64,

    /// Extension is rejected if projection moves the configuration further than this.
    /// Large corrections mean the linear step is not to be trusted on a curved manifold.
    pub max_distance_btw_projections: f64,

    /// Extension making less progress than this is considered stalled.
    pub min_step_size: f64,

    /// Trees are connected when their closest nodes are this close.
    pub min_tree_connection_distance: f64,

    /// Per coordinate tolerance of the Newton projection onto the trajectory constraint.
    pub projection_tolerance: f64,

    /// Iteration budget of the Newton projection.
    pub projection_max_iteration: usize,

    /// Edges are checked for collisions in steps of this length.
    pub collision_resolution: f64,

    /// Probability of drawing the random target from the goal sampleable.
    pub goal_bias: f64,

    /// A new goal tree root is sampled every this many iterations.
    pub goal_sample_interval: usize,

    /// Optional budget of tree iterations. Without it, the planner runs until connection,
    /// exhaustion of goal samples, or timeout.
    pub max_iterations: Option<usize>,
}

impl Default for CrrtPlannerParameters {
    fn default() -> Self {
        Self {
            max_num_trials: 5,
            max_extension_distance: 0.5,
            max_distance_btw_projections: 0.1,
            min_step_size: 1e-3,
            min_tree_connection_distance: 0.1,
            projection_tolerance: 1e-4,
            projection_max_iteration: 20,
            collision_resolution: 0.1,
            goal_bias: 0.05,
            goal_sample_interval: 20,
            max_iterations: None,
        }
    }
}

impl CrrtPlannerParameters {
    /// Rejects values the planner cannot work with. `max_extension_distance` may be
    /// infinite (extend straight to the target).
    pub fn validate(&self) -> Result<(), PlanningError> {
        if !(self.max_extension_distance > 0.0) {
            return Err(PlanningError::InvalidParameter(format!(
                "max_extension_distance must be positive (got {})", self.max_extension_distance
            )));
        }
        check_positive("max_distance_btw_projections", self.max_distance_btw_projections)?;
        check_positive("min_step_size", self.min_step_size)?;
        check_positive("min_tree_connection_distance", self.min_tree_connection_distance)?;
        check_positive("projection_tolerance", self.projection_tolerance)?;
        check_positive("collision_resolution", self.collision_resolution)?;
        if !(0.0..=1.0).contains(&self.goal_bias) {
            return Err(PlanningError::InvalidParameter(format!(
                "goal_bias must be within [0, 1] (got {})", self.goal_bias
            )));
        }
        if self.max_num_trials == 0 {
            return Err(PlanningError::InvalidParameter("max_num_trials must be at least 1".into()));
        }
        if self.goal_sample_interval == 0 {
            return Err(PlanningError::InvalidParameter("goal_sample_interval must be at least 1".into()));
        }
        Ok(())
    }

    /// Convert to string yaml representation (quick viewing, etc).
    pub fn to_yaml(&self) -> String {
        let mut yaml = format!(
            "crrt_planner_parameters:\n  \
              max_num_trials: {}\n  \
              max_extension_distance: {}\n  \
              max_distance_btw_projections: {}\n  \
              min_step_size: {}\n  \
              min_tree_connection_distance: {}\n  \
              projection_tolerance: {}\n  \
              projection_max_iteration: {}\n  \
              collision_resolution: {}\n  \
              goal_bias: {}\n  \
              goal_sample_interval: {}\n",
            self.max_num_trials,
            yaml_float(self.max_extension_distance),
            yaml_float(self.max_distance_btw_projections),
            yaml_float(self.min_step_size),
            yaml_float(self.min_tree_connection_distance),
            yaml_float(self.projection_tolerance),
            self.projection_max_iteration,
            yaml_float(self.collision_resolution),
            yaml_float(self.goal_bias),
            self.goal_sample_interval,
        );
        if let Some(max_iterations) = self.max_iterations {
            yaml.push_str(&format!("  max_iterations: {}\n", max_iterations));
        }
        yaml
    }
}

/// Parameters of planning towards a Task Space Region without trajectory constraint.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "allow_filesystem", derive(Deserialize), serde(default))]
pub struct TsrPlanningParameters {
    /// Maximal number of inverse kinematics attempts per goal pose. The time limit of
    /// each full planning attempt is the total time limit divided by this number.
    pub max_num_trials: usize,

    /// Number of goal samples tried with the snap planner before any tree planning.
    pub max_snap_samples: usize,

    /// Discretization step when checking paths for collisions.
    pub collision_resolution: f64,
}

impl Default for TsrPlanningParameters {
    fn default() -> Self {
        Self {
            max_num_trials: 10,
            max_snap_samples: 100,
            collision_resolution: 0.1,
        }
    }
}

impl TsrPlanningParameters {
    pub fn validate(&self) -> Result<(), PlanningError> {
        if self.max_num_trials == 0 {
            return Err(PlanningError::InvalidParameter("max_num_trials must be at least 1".into()));
        }
        // The time limit is divided by it
        if u32::try_from(self.max_num_trials).is_err() {
            return Err(PlanningError::InvalidParameter(format!(
                "max_num_trials must not exceed {} (got {})", u32::MAX, self.max_num_trials
            )));
        }
        check_positive("collision_resolution", self.collision_resolution)
    }

    /// Convert to string yaml representation.
    pub fn to_yaml(&self) -> String {
        format!(
            "tsr_planning_parameters:\n  \
              max_num_trials: {}\n  \
              max_snap_samples: {}\n  \
              collision_resolution: {}\n",
            self.max_num_trials,
            self.max_snap_samples,
            yaml_float(self.collision_resolution),
        )
    }
}

/// Formats a float so that YAML reads it back as a float (not as an integer), with
/// infinities in YAML notation.
pub(crate) fn yaml_float(value: f64) -> String {
    if value == f64::INFINITY {
        ".inf".to_string()
    } else if value == f64::NEG_INFINITY {
        "-.inf".to_string()
    } else if value.is_nan() {
        ".nan".to_string()
    } else {
        format!("{:?}", value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(CrrtPlannerParameters::default().validate().is_ok());
        assert!(TsrPlanningParameters::default().validate().is_ok());
    }

    #[test]
    fn test_invalid_values() {
        let parameters = CrrtPlannerParameters { goal_bias: 1.5, ..Default::default() };
        assert!(parameters.validate().is_err());

        let parameters = CrrtPlannerParameters { min_step_size: 0.0, ..Default::default() };
        assert!(parameters.validate().is_err());

        let parameters = CrrtPlannerParameters { max_extension_distance: f64::NAN, ..Default::default() };
        assert!(parameters.validate().is_err());

        let parameters = CrrtPlannerParameters { max_extension_distance: f64::INFINITY, ..Default::default() };
        assert!(parameters.validate().is_ok());

        let parameters = TsrPlanningParameters { max_num_trials: 0, ..Default::default() };
        assert!(parameters.validate().is_err());

        let parameters = TsrPlanningParameters { max_num_trials: u32::MAX as usize, ..Default::default() };
        assert!(parameters.validate().is_ok());
        if let Some(too_many) = (u32::MAX as usize).checked_add(1) {
            let parameters = TsrPlanningParameters { max_num_trials: too_many, ..Default::default() };
            assert!(parameters.validate().is_err());
        }
    }

    #[test]
    fn test_yaml_float() {
        assert_eq!(yaml_float(1.0), "1.0");
        assert_eq!(yaml_float(0.05), "0.05");
        assert_eq!(yaml_float(f64::INFINITY), ".inf");
    }
}
