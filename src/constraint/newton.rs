//! Projection onto the manifold of a differentiable constraint by Newton iteration.

use std::sync::Arc;

use nalgebra::DVector;
use tracing::trace;

use crate::constraint::capabilities::{Differentiable, Projectable};
use crate::jacobian::damped_least_squares;
use crate::kinematic_traits::Configuration;
use crate::planning_error::PlanningError;

/// Damping of the least squares step. Keeps steps bounded near singular Jacobians while
/// being small enough to not slow down convergence in regular configurations.
pub const DAMPING: f64 = 1e-4;

/// Turns a [`Differentiable`] into a [`Projectable`].
///
/// Every iteration evaluates the constraint value. If each element is within its
/// tolerance, the state is accepted. Otherwise a damped least squares step
/// `dq = Jᵀ (J Jᵀ + λ²I)⁻¹ value` is subtracted from the state. Projection fails after
/// `max_iterations` steps, or earlier if a step is shorter than `min_step_size` while
/// still out of tolerance (the iteration has stalled).
pub struct NewtonsMethodProjectable {
    differentiable: Arc<dyn Differentiable>,
    tolerance: DVector<f64>,
    max_iterations: usize,
    min_step_size: f64,
}

impl NewtonsMethodProjectable {
    pub fn new(
        differentiable: Arc<dyn Differentiable>,
        tolerance: Vec<f64>,
        max_iterations: usize,
        min_step_size: f64,
    ) -> Result<Self, PlanningError> {
        let dimension = differentiable.constraint_dimension();
        if tolerance.len() != dimension {
            return Err(PlanningError::DimensionMismatch { expected: dimension, found: tolerance.len() });
        }
        if let Some(bad) = tolerance.iter().find(|t| !(**t >= 0.0)) {
            return Err(PlanningError::InvalidParameter(format!(
                "projection tolerance must not be negative (got {})", bad
            )));
        }
        if !(min_step_size >= 0.0) {
            return Err(PlanningError::InvalidParameter(format!(
                "min_step_size must not be negative (got {})", min_step_size
            )));
        }
        Ok(Self {
            differentiable,
            tolerance: DVector::from_vec(tolerance),
            max_iterations,
            min_step_size,
        })
    }

    /// Same tolerance for every constraint row.
    pub fn with_uniform_tolerance(
        differentiable: Arc<dyn Differentiable>,
        tolerance: f64,
        max_iterations: usize,
        min_step_size: f64,
    ) -> Result<Self, PlanningError> {
        let dimension = differentiable.constraint_dimension();
        Self::new(differentiable, vec![tolerance; dimension], max_iterations, min_step_size)
    }

    fn within_tolerance(&self, value: &DVector<f64>) -> bool {
        value.len() == self.tolerance.len()
            && value.iter().zip(self.tolerance.iter()).all(|(v, t)| v.abs() <= *t)
    }
}

impl Projectable for NewtonsMethodProjectable {
    fn project(&self, qs: &Configuration, out: &mut Configuration) -> bool {
        let mut current = qs.clone();
        for iteration in 0..=self.max_iterations {
            let value = self.differentiable.value(&current);
            if self.within_tolerance(&value) {
                *out = current;
                return true;
            }
            if iteration == self.max_iterations {
                break;
            }
            let jacobian = self.differentiable.jacobian(&current);
            let Some(step) = damped_least_squares(&jacobian, &value, DAMPING) else {
                return false;
            };
            if step.iter().any(|s| !s.is_finite()) {
                return false;
            }
            current -= &step;
            if step.norm() < self.min_step_size {
                // Stalled, accept only if this last step happened to converge.
                let value = self.differentiable.value(&current);
                if self.within_tolerance(&value) {
                    *out = current;
                    return true;
                }
                trace!("Projection stalled after {} iterations, residual {}", iteration + 1, value.norm());
                return false;
            }
        }
        trace!("Projection did not converge in {} iterations", self.max_iterations);
        false
    }
}
