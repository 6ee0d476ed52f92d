//! General purpose sampling planner used as the fallback of the planning façade.

use std::sync::Arc;

use rand::rngs::StdRng;
use tracing::debug;

use crate::constraint::capabilities::{Projectable, Sampleable, Testable};
use crate::kinematic_traits::Configuration;
use crate::parameters::CrrtPlannerParameters;
use crate::path_plan::crrt_connect::{CrrtConnect, CrrtProblem};
use crate::path_plan::interpolator::Interpolator;
use crate::path_plan::metric::DistanceMetric;
use crate::planning_error::PlanningError;
use crate::planning_result::PlanOutcome;
use crate::time_budget::TimeBudget;

/// Everything a sampling planner gets from the façade. The goal may be a single state
/// or a set of them (a sampleable holding several goals), in which case reaching any of
/// them is a success.
#[derive(Clone)]
pub struct SamplingPlanRequest {
    pub start: Configuration,
    pub goal_sampleable: Arc<dyn Sampleable>,
    pub goal_testable: Arc<dyn Testable>,
    pub interpolator: Arc<dyn Interpolator>,
    pub metric: Arc<dyn DistanceMetric>,
    /// Uniform sampler over the configuration space.
    pub sampler: Arc<dyn Sampleable>,
    pub collision: Arc<dyn Testable>,
    pub bounds_testable: Arc<dyn Testable>,
    pub bounds_projectable: Arc<dyn Projectable>,
    pub collision_resolution: f64,
}

/// Black box planner called when the snap planner misses.
pub trait SamplingPlanner: Send + Sync {
    fn plan(
        &self,
        request: &SamplingPlanRequest,
        budget: &TimeBudget,
        rng: &mut StdRng,
    ) -> Result<PlanOutcome, PlanningError>;
}

/// Unconstrained bidirectional RRT-Connect: the CRRT-Connect engine with the joint bounds
/// as the only projection.
#[derive(Debug, Clone, Default)]
pub struct RrtConnectAdaptor {
    pub parameters: CrrtPlannerParameters,
}

impl RrtConnectAdaptor {
    pub fn new(parameters: CrrtPlannerParameters) -> Self {
        Self { parameters }
    }
}

impl SamplingPlanner for RrtConnectAdaptor {
    fn plan(
        &self,
        request: &SamplingPlanRequest,
        budget: &TimeBudget,
        rng: &mut StdRng,
    ) -> Result<PlanOutcome, PlanningError> {
        let parameters = CrrtPlannerParameters {
            collision_resolution: request.collision_resolution,
            ..self.parameters.clone()
        };
        let problem = CrrtProblem {
            goal_sampleable: request.goal_sampleable.clone(),
            goal_testable: request.goal_testable.clone(),
            constraint: request.bounds_projectable.clone(),
            config_sampleable: request.sampler.clone(),
            collision: request.collision.clone(),
            bounds_testable: request.bounds_testable.clone(),
            metric: request.metric.clone(),
            interpolator: request.interpolator.clone(),
        };
        debug!("RRT-Connect fallback with {:?} remaining", budget.remaining());
        Ok(CrrtConnect::new(problem, parameters)?.plan(&request.start, budget, rng))
    }
}
