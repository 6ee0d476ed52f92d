//! Constraint capabilities.
//!
//! A constraint implements any subset of the four traits in this module. Sampling and
//! testing are generic over the sample type: most constraints work on robot
//! configurations, while a Task Space Region samples and tests end-effector poses.
//! The planners only depend on these traits, never on concrete constraint types.

use std::sync::Mutex;

use nalgebra::{DMatrix, DVector};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::kinematic_traits::Configuration;

/// Stateful source of samples, created by a [`Sampleable`]. Generators are owned by one
/// planning call and never shared.
pub trait SampleGenerator<S = Configuration>: Send {
    /// Returns true if the generator may still produce samples. Has no side effects.
    fn can_sample(&self) -> bool;

    /// Writes the next sample into `out`. Returns false if no valid sample has been found
    /// within a bounded number of internal attempts; never blocks indefinitely.
    fn sample(&mut self, out: &mut S) -> bool;

    /// Number of samples left, or None if the generator is unbounded.
    fn num_samples_remaining(&self) -> Option<usize> {
        None
    }
}

/// Constraint that can be sampled.
pub trait Sampleable<S = Configuration>: Send + Sync {
    fn create_sample_generator(&self) -> Box<dyn SampleGenerator<S>>;
}

/// Constraint that can be checked. `is_satisfied` must be pure so it can run concurrently.
pub trait Testable<S = Configuration>: Send + Sync {
    fn is_satisfied(&self, state: &S) -> bool;
}

/// Constraint with a value and derivative.
pub trait Differentiable: Send + Sync {
    /// Number of rows of both the value vector and the Jacobian.
    fn constraint_dimension(&self) -> usize;

    /// Signed constraint violations, all zeros when the constraint is satisfied.
    fn value(&self, qs: &Configuration) -> DVector<f64>;

    /// Maps configuration space velocity to the velocity of the constraint value.
    fn jacobian(&self, qs: &Configuration) -> DMatrix<f64>;

    fn value_and_jacobian(&self, qs: &Configuration) -> (DVector<f64>, DMatrix<f64>) {
        (self.value(qs), self.jacobian(qs))
    }
}

/// Constraint that can move a state onto its manifold.
pub trait Projectable: Send + Sync {
    /// Writes the projected state into `out`. Returns false if projection did not converge
    /// within its iteration budget or tolerance; `out` is unspecified then.
    fn project(&self, qs: &Configuration, out: &mut Configuration) -> bool;
}

/// Projectable that accepts every state as it is.
#[derive(Debug, Default, Clone, Copy)]
pub struct IdentityProjectable;

impl Projectable for IdentityProjectable {
    fn project(&self, qs: &Configuration, out: &mut Configuration) -> bool {
        out.clone_from(qs);
        true
    }
}

/// Testable that is always satisfied.
#[derive(Debug, Default, Clone, Copy)]
pub struct Satisfied;

impl<S> Testable<S> for Satisfied {
    fn is_satisfied(&self, _state: &S) -> bool {
        true
    }
}

/// Shared random source of a sampleable. Every generator gets its own `StdRng` seeded
/// from here, so sampling stays repeatable for a given seed while the sampleable itself
/// can be shared between threads.
#[derive(Debug)]
pub struct RngSource {
    rng: Mutex<StdRng>,
}

impl RngSource {
    pub fn new(seed: u64) -> Self {
        Self { rng: Mutex::new(StdRng::seed_from_u64(seed)) }
    }

    /// New independent generator.
    pub fn fork(&self) -> StdRng {
        let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        StdRng::seed_from_u64(rng.r#gen())
    }
}
