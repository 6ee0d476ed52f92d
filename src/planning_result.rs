use std::fmt;

use crate::path_plan::trajectory::Interpolated;

/// Outcome class of one planner call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanningStatus {
    /// A trajectory has been found.
    Success,
    /// Sample, trial or iteration budgets were used up.
    Exhausted,
    /// The attempted path is known not to satisfy the constraints.
    Infeasible,
    /// The time budget has elapsed.
    Timeout,
}

/// Status of a planner call with a diagnostic message telling which stage was attempted
/// and why it stopped. Produced once per call.
#[derive(Debug, Clone, PartialEq)]
pub struct PlanningResult {
    pub status: PlanningStatus,
    pub message: String,
}

impl PlanningResult {
    pub fn new(status: PlanningStatus, message: impl Into<String>) -> Self {
        Self { status, message: message.into() }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(PlanningStatus::Success, message)
    }

    pub fn exhausted(message: impl Into<String>) -> Self {
        Self::new(PlanningStatus::Exhausted, message)
    }

    pub fn infeasible(message: impl Into<String>) -> Self {
        Self::new(PlanningStatus::Infeasible, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(PlanningStatus::Timeout, message)
    }

    pub fn is_success(&self) -> bool {
        self.status == PlanningStatus::Success
    }
}

impl fmt::Display for PlanningResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.status, self.message)
    }
}

/// Trajectory (if any) together with the status of the call that produced it.
#[derive(Debug, Clone)]
pub struct PlanOutcome {
    pub trajectory: Option<Interpolated>,
    pub result: PlanningResult,
}

impl PlanOutcome {
    pub fn found(trajectory: Interpolated, result: PlanningResult) -> Self {
        Self { trajectory: Some(trajectory), result }
    }

    pub fn failed(result: PlanningResult) -> Self {
        Self { trajectory: None, result }
    }

    pub fn is_success(&self) -> bool {
        self.trajectory.is_some()
    }
}
