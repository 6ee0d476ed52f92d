//! Snap planner: the direct interpolated path between two states, if it is feasible.
//!
//! The planner is cheap (linear in the path length over the resolution) and is always
//! tried before tree search. Not finding a path is the common, expected outcome for
//! non-trivial queries and is reported as `Infeasible` rather than as an error.

use std::sync::Arc;

use tracing::debug;

use crate::constraint::capabilities::Testable;
use crate::kinematic_traits::Configuration;
use crate::path_check::check_path;
use crate::path_plan::interpolator::Interpolator;
use crate::path_plan::metric::DistanceMetric;
use crate::path_plan::trajectory::Interpolated;
use crate::planning_error::{check_dimension, check_positive, PlanningError};
use crate::planning_result::{PlanOutcome, PlanningResult};

/// Plans the straight (interpolated) path from `start` to `goal`. The path is discretized
/// so that consecutive states are at most `resolution` apart under `metric`, both ends
/// included, and every state is checked with `testable`. The two waypoint trajectory is
/// returned only if all of them pass.
pub fn plan_snap(
    start: &Configuration,
    goal: &Configuration,
    interpolator: Arc<dyn Interpolator>,
    metric: &dyn DistanceMetric,
    testable: &dyn Testable,
    resolution: f64,
) -> Result<PlanOutcome, PlanningError> {
    check_dimension(start.len(), goal.len())?;
    check_positive("resolution", resolution)?;

    let trajectory = Interpolated::from_states(interpolator, metric, vec![start.clone(), goal.clone()]);
    let states = trajectory.discretize(resolution);

    match check_path(&states, testable) {
        Some(index) => {
            debug!("Snap path infeasible at state {} of {}", index, states.len());
            Ok(PlanOutcome::failed(PlanningResult::infeasible(format!(
                "Snap planner: state {} of {} along the direct path does not satisfy the constraints",
                index,
                states.len()
            ))))
        }
        None => Ok(PlanOutcome::found(
            trajectory,
            PlanningResult::success(format!("Snap planner: direct path of {} states is feasible", states.len())),
        )),
    }
}
