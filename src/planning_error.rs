//! Errors for malformed planning requests.
//!
//! Only input that cannot be planned for at all is reported this way. A planner that
//! simply did not find a path returns no trajectory together with a
//! [`PlanningResult`](crate::planning_result::PlanningResult).

/// Configuration error, reported before any planning work starts.
#[derive(Debug, Clone, PartialEq)]
pub enum PlanningError {
    /// Direction of the end-effector offset motion has zero length.
    ZeroDirection,
    /// Vector or matrix does not match the number of joints or constraint rows.
    DimensionMismatch { expected: usize, found: usize },
    /// Lower bound is above the upper bound (or one of them is NaN).
    InvalidBounds { row: usize, min: f64, max: f64 },
    /// Numeric parameter out of its allowed range.
    InvalidParameter(String),
    /// Plural-goal planning was asked for with no goals.
    EmptyGoalSet,
}

impl std::fmt::Display for PlanningError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match *self {
            PlanningError::ZeroDirection =>
                write!(f, "Direction vector is a zero vector"),
            PlanningError::DimensionMismatch { expected, found } =>
                write!(f, "Dimension mismatch: expected {}, found {}", expected, found),
            PlanningError::InvalidBounds { row, min, max } =>
                write!(f, "Invalid bounds at row {}: min {} is not below max {}", row, min, max),
            PlanningError::InvalidParameter(ref msg) =>
                write!(f, "Invalid parameter: {}", msg),
            PlanningError::EmptyGoalSet =>
                write!(f, "No goal configurations given"),
        }
    }
}

impl std::error::Error for PlanningError {}

/// Checks that a vector has the expected number of elements.
pub(crate) fn check_dimension(expected: usize, found: usize) -> Result<(), PlanningError> {
    if expected != found {
        return Err(PlanningError::DimensionMismatch { expected, found });
    }
    Ok(())
}

/// Checks that a numeric parameter is finite and strictly positive.
pub(crate) fn check_positive(name: &str, value: f64) -> Result<(), PlanningError> {
    if !(value.is_finite() && value > 0.0) {
        return Err(PlanningError::InvalidParameter(format!(
            "{} must be finite and positive (got {})", name, value
        )));
    }
    Ok(())
}
