//! Ordered fallback of planning strategies sharing one time budget.

use std::sync::Arc;

use rand::rngs::StdRng;
use tracing::{debug, info};

use crate::constraint::capabilities::Testable;
use crate::kinematic_traits::Configuration;
use crate::path_plan::interpolator::Interpolator;
use crate::path_plan::metric::DistanceMetric;
use crate::planning::sampling_planner::{SamplingPlanRequest, SamplingPlanner};
use crate::planning::snap::plan_snap;
use crate::planning_error::PlanningError;
use crate::planning_result::{PlanOutcome, PlanningResult};
use crate::time_budget::TimeBudget;

/// One stage of a fallback chain.
pub trait PlanningStrategy {
    /// Short name used in diagnostics.
    fn name(&self) -> &str;

    /// Strategies that only run while time is left return true. Cheap, bounded strategies
    /// (like the snap planner) return false and run even on an elapsed budget.
    fn needs_time(&self) -> bool {
        true
    }

    fn attempt(&self, budget: &TimeBudget, rng: &mut StdRng) -> Result<PlanOutcome, PlanningError>;
}

/// Strategies tried in order until one succeeds. Configuration errors abort the chain.
#[derive(Default)]
pub struct FallbackChain<'a> {
    strategies: Vec<Box<dyn PlanningStrategy + 'a>>,
}

impl<'a> FallbackChain<'a> {
    pub fn new() -> Self {
        Self { strategies: Vec::new() }
    }

    pub fn push(&mut self, strategy: impl PlanningStrategy + 'a) -> &mut Self {
        self.strategies.push(Box::new(strategy));
        self
    }

    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }

    /// Returns the first successful outcome. If none succeeds, the outcome carries the
    /// status of the last stage that ran and the messages of all of them.
    pub fn run(&self, budget: &TimeBudget, rng: &mut StdRng) -> Result<PlanOutcome, PlanningError> {
        let mut messages = Vec::new();
        let mut last: Option<PlanningResult> = None;
        for strategy in &self.strategies {
            if strategy.needs_time() && budget.is_expired() {
                debug!("Skipping {}, time limit elapsed", strategy.name());
                messages.push(format!("{}: skipped, time limit elapsed", strategy.name()));
                last = Some(PlanningResult::timeout(""));
                continue;
            }
            let outcome = strategy.attempt(budget, rng)?;
            if outcome.is_success() {
                info!("{} succeeded: {}", strategy.name(), outcome.result.message);
                return Ok(outcome);
            }
            debug!("{} failed: {}", strategy.name(), outcome.result);
            messages.push(format!("{}: {}", strategy.name(), outcome.result));
            last = Some(outcome.result);
        }
        let status = match last {
            Some(result) => result.status,
            None => return Ok(PlanOutcome::failed(PlanningResult::exhausted("No planning strategy to try"))),
        };
        Ok(PlanOutcome::failed(PlanningResult::new(status, messages.join("; "))))
    }
}

/// Direct path to one goal.
pub struct SnapStrategy {
    pub start: Configuration,
    pub goal: Configuration,
    pub interpolator: Arc<dyn Interpolator>,
    pub metric: Arc<dyn DistanceMetric>,
    pub testable: Arc<dyn Testable>,
    pub resolution: f64,
}

impl PlanningStrategy for SnapStrategy {
    fn name(&self) -> &str {
        "snap"
    }

    fn needs_time(&self) -> bool {
        false
    }

    fn attempt(&self, _budget: &TimeBudget, _rng: &mut StdRng) -> Result<PlanOutcome, PlanningError> {
        plan_snap(
            &self.start,
            &self.goal,
            self.interpolator.clone(),
            self.metric.as_ref(),
            self.testable.as_ref(),
            self.resolution,
        )
    }
}

/// Call of the general purpose sampling planner with the rest of the budget.
pub struct SamplingStrategy<'a> {
    pub planner: &'a dyn SamplingPlanner,
    pub request: SamplingPlanRequest,
}

impl PlanningStrategy for SamplingStrategy<'_> {
    fn name(&self) -> &str {
        "sampling planner"
    }

    fn attempt(&self, budget: &TimeBudget, rng: &mut StdRng) -> Result<PlanOutcome, PlanningError> {
        self.planner.plan(&self.request, budget, rng)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;
    use std::time::Duration;
    use rand::SeedableRng;
    use crate::path_plan::interpolator::LinearInterpolator;
    use crate::path_plan::trajectory::Interpolated;
    use crate::planning_result::PlanningStatus;

    /// Records the order of calls, succeeds if told to.
    struct Scripted {
        name: &'static str,
        succeed: bool,
        needs_time: bool,
        calls: Rc<Cell<usize>>,
        order: Rc<std::cell::RefCell<Vec<&'static str>>>,
    }

    impl PlanningStrategy for Scripted {
        fn name(&self) -> &str {
            self.name
        }

        fn needs_time(&self) -> bool {
            self.needs_time
        }

        fn attempt(&self, _budget: &TimeBudget, _rng: &mut StdRng) -> Result<PlanOutcome, PlanningError> {
            self.calls.set(self.calls.get() + 1);
            self.order.borrow_mut().push(self.name);
            if self.succeed {
                let trajectory = Interpolated::new(Arc::new(LinearInterpolator));
                Ok(PlanOutcome::found(trajectory, PlanningResult::success(self.name)))
            } else {
                Ok(PlanOutcome::failed(PlanningResult::infeasible(self.name)))
            }
        }
    }

    struct Failing;

    impl PlanningStrategy for Failing {
        fn name(&self) -> &str {
            "failing"
        }

        fn attempt(&self, _budget: &TimeBudget, _rng: &mut StdRng) -> Result<PlanOutcome, PlanningError> {
            Err(PlanningError::EmptyGoalSet)
        }
    }

    fn scripted(
        name: &'static str, succeed: bool, needs_time: bool,
        order: &Rc<std::cell::RefCell<Vec<&'static str>>>,
    ) -> Scripted {
        Scripted { name, succeed, needs_time, calls: Rc::new(Cell::new(0)), order: order.clone() }
    }

    #[test]
    fn test_first_success_wins() {
        let order = Rc::new(std::cell::RefCell::new(Vec::new()));
        let mut chain = FallbackChain::new();
        chain.push(scripted("a", false, false, &order));
        chain.push(scripted("b", true, true, &order));
        chain.push(scripted("c", true, true, &order));
        let mut rng = StdRng::seed_from_u64(0);
        let outcome = chain.run(&TimeBudget::from_secs(10.0), &mut rng).unwrap();
        assert!(outcome.is_success());
        assert_eq!(outcome.result.message, "b");
        assert_eq!(*order.borrow(), vec!["a", "b"]);
    }

    #[test]
    fn test_elapsed_budget_skips_timed_stages() {
        let order = Rc::new(std::cell::RefCell::new(Vec::new()));
        let mut chain = FallbackChain::new();
        chain.push(scripted("snap", false, false, &order));
        chain.push(scripted("tree", true, true, &order));
        let mut rng = StdRng::seed_from_u64(0);
        let outcome = chain.run(&TimeBudget::new(Duration::ZERO), &mut rng).unwrap();
        assert!(!outcome.is_success());
        assert_eq!(outcome.result.status, PlanningStatus::Timeout);
        assert_eq!(*order.borrow(), vec!["snap"]);
    }

    #[test]
    fn test_all_fail() {
        let order = Rc::new(std::cell::RefCell::new(Vec::new()));
        let mut chain = FallbackChain::new();
        chain.push(scripted("a", false, true, &order));
        chain.push(scripted("b", false, true, &order));
        let mut rng = StdRng::seed_from_u64(0);
        let outcome = chain.run(&TimeBudget::from_secs(10.0), &mut rng).unwrap();
        assert_eq!(outcome.result.status, PlanningStatus::Infeasible);
        assert!(outcome.result.message.contains("a:") && outcome.result.message.contains("b:"));
    }

    #[test]
    fn test_error_aborts() {
        let order = Rc::new(std::cell::RefCell::new(Vec::new()));
        let mut chain = FallbackChain::new();
        chain.push(Failing);
        chain.push(scripted("b", true, true, &order));
        let mut rng = StdRng::seed_from_u64(0);
        assert!(chain.run(&TimeBudget::from_secs(10.0), &mut rng).is_err());
        assert!(order.borrow().is_empty());
        assert!(FallbackChain::new().run(&TimeBudget::from_secs(1.0), &mut rng).unwrap().trajectory.is_none());
    }
}
