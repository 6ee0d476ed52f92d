//! Joint limits as constraints: uniform sampling, inclusive containment check and
//! projection by clamping.

use std::ops::RangeInclusive;
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::Rng;

use crate::constraint::capabilities::{Projectable, RngSource, SampleGenerator, Sampleable, Testable};
use crate::kinematic_traits::Configuration;
use crate::planning_error::PlanningError;

#[derive(Debug, Clone, PartialEq)]
pub struct JointBounds {
    /// Lower limit per joint, may be -infinity for unlimited joints.
    pub from: Vec<f64>,

    /// Upper limit per joint, may be +infinity for unlimited joints.
    pub to: Vec<f64>,
}

impl JointBounds {
    pub fn new(from: Vec<f64>, to: Vec<f64>) -> Result<Self, PlanningError> {
        if from.len() != to.len() {
            return Err(PlanningError::DimensionMismatch { expected: from.len(), found: to.len() });
        }
        for (row, (&min, &max)) in from.iter().zip(&to).enumerate() {
            // Also rejects NaN
            if !(min <= max) {
                return Err(PlanningError::InvalidBounds { row, min, max });
            }
        }
        Ok(JointBounds { from, to })
    }

    /// Creates bounds from ranges given in degrees (most robot datasheets use degrees).
    pub fn from_degrees(ranges: &[RangeInclusive<f64>]) -> Result<Self, PlanningError> {
        Self::new(
            ranges.iter().map(|r| r.start().to_radians()).collect(),
            ranges.iter().map(|r| r.end().to_radians()).collect(),
        )
    }

    /// Bounds that do not limit any of `dof` joints.
    pub fn unlimited(dof: usize) -> Self {
        JointBounds {
            from: vec![f64::NEG_INFINITY; dof],
            to: vec![f64::INFINITY; dof],
        }
    }

    pub fn dof(&self) -> usize {
        self.from.len()
    }

    pub fn compliant(&self, qs: &Configuration) -> bool {
        qs.len() == self.dof()
            && qs.iter().zip(self.from.iter().zip(&self.to))
            .all(|(q, (from, to))| q >= from && q <= to)
    }

    /// Moves every joint value into its range.
    pub fn clamp(&self, qs: &Configuration) -> Configuration {
        Configuration::from_iterator(
            qs.len(),
            qs.iter().enumerate().map(|(i, q)| q.clamp(self.from[i], self.to[i])),
        )
    }

    /// All joints are limited on both sides, so uniform sampling is possible.
    pub fn is_finite(&self) -> bool {
        self.from.iter().chain(&self.to).all(|v| v.is_finite())
    }

    /// Uniformly distributed joint values within the bounds. Only meaningful if
    /// [`JointBounds::is_finite`].
    pub fn random(&self, rng: &mut impl Rng) -> Configuration {
        Configuration::from_iterator(
            self.dof(),
            self.from.iter().zip(&self.to).map(|(&from, &to)| {
                if from == to { from } else { rng.gen_range(from..=to) }
            }),
        )
    }
}

impl Testable for JointBounds {
    fn is_satisfied(&self, qs: &Configuration) -> bool {
        self.compliant(qs)
    }
}

impl Projectable for JointBounds {
    fn project(&self, qs: &Configuration, out: &mut Configuration) -> bool {
        if qs.len() != self.dof() || qs.iter().any(|q| q.is_nan()) {
            return false;
        }
        *out = self.clamp(qs);
        true
    }
}

/// Uniform sampler over the joint bounds.
#[derive(Debug)]
pub struct SampleableBounds {
    bounds: Arc<JointBounds>,
    rng: RngSource,
}

impl SampleableBounds {
    pub fn new(bounds: Arc<JointBounds>, seed: u64) -> Self {
        SampleableBounds { bounds, rng: RngSource::new(seed) }
    }
}

impl Sampleable for SampleableBounds {
    fn create_sample_generator(&self) -> Box<dyn SampleGenerator> {
        Box::new(BoundsSampleGenerator {
            bounds: self.bounds.clone(),
            rng: self.rng.fork(),
        })
    }
}

struct BoundsSampleGenerator {
    bounds: Arc<JointBounds>,
    rng: StdRng,
}

impl SampleGenerator for BoundsSampleGenerator {
    fn can_sample(&self) -> bool {
        self.bounds.is_finite()
    }

    fn sample(&mut self, out: &mut Configuration) -> bool {
        if !self.can_sample() {
            return false;
        }
        *out = self.bounds.random(&mut self.rng);
        true
    }
}
