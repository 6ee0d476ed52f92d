//! Constraints built from other constraints: intersection of testables, a sampleable
//! that renews its generator when exhausted, and a sampleable over a fixed list.

use std::sync::Arc;

use crate::constraint::capabilities::{SampleGenerator, Sampleable, Testable};

/// Satisfied only if every member is satisfied. Empty intersection is always satisfied.
pub struct TestableIntersection<S: 'static = crate::kinematic_traits::Configuration> {
    testables: Vec<Arc<dyn Testable<S>>>,
}

impl<S: 'static> TestableIntersection<S> {
    pub fn new(testables: Vec<Arc<dyn Testable<S>>>) -> Self {
        Self { testables }
    }

    pub fn len(&self) -> usize {
        self.testables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.testables.is_empty()
    }
}

impl<S: 'static> Testable<S> for TestableIntersection<S> {
    fn is_satisfied(&self, state: &S) -> bool {
        // In order, stops at the first failure
        self.testables.iter().all(|t| t.is_satisfied(state))
    }
}

/// Wraps a sampleable whose generators may run dry (for instance, a finite list of
/// poses). When the current generator cannot sample any more, a fresh one is created,
/// so the wrapped samples cycle. Each `sample` call still does a bounded amount of work:
/// at most one renewal.
pub struct CyclicSampleable<S: 'static> {
    sampleable: Arc<dyn Sampleable<S>>,
}

impl<S: 'static> CyclicSampleable<S> {
    pub fn new(sampleable: Arc<dyn Sampleable<S>>) -> Self {
        Self { sampleable }
    }
}

impl<S: 'static> Sampleable<S> for CyclicSampleable<S> {
    fn create_sample_generator(&self) -> Box<dyn SampleGenerator<S>> {
        let current = self.sampleable.create_sample_generator();
        // If even a fresh generator cannot sample, renewing will never help.
        let renewable = current.can_sample();
        Box::new(CyclicSampleGenerator {
            sampleable: self.sampleable.clone(),
            current,
            renewable,
        })
    }
}

struct CyclicSampleGenerator<S: 'static> {
    sampleable: Arc<dyn Sampleable<S>>,
    current: Box<dyn SampleGenerator<S>>,
    renewable: bool,
}

impl<S: 'static> SampleGenerator<S> for CyclicSampleGenerator<S> {
    fn can_sample(&self) -> bool {
        self.renewable || self.current.can_sample()
    }

    fn sample(&mut self, out: &mut S) -> bool {
        if !self.current.can_sample() {
            if !self.renewable {
                return false;
            }
            self.current = self.sampleable.create_sample_generator();
        }
        self.current.sample(out)
    }

    fn num_samples_remaining(&self) -> Option<usize> {
        if self.renewable {
            None
        } else {
            self.current.num_samples_remaining()
        }
    }
}

/// Hands out the given states in order, then is exhausted.
pub struct FiniteSampleable<S> {
    states: Arc<Vec<S>>,
}

impl<S: Clone + Send + Sync + 'static> FiniteSampleable<S> {
    pub fn new(states: Vec<S>) -> Self {
        Self { states: Arc::new(states) }
    }

    pub fn single(state: S) -> Self {
        Self::new(vec![state])
    }

    pub fn states(&self) -> &[S] {
        &self.states
    }
}

impl<S: Clone + Send + Sync + 'static> Sampleable<S> for FiniteSampleable<S> {
    fn create_sample_generator(&self) -> Box<dyn SampleGenerator<S>> {
        Box::new(FiniteSampleGenerator { states: self.states.clone(), index: 0 })
    }
}

struct FiniteSampleGenerator<S> {
    states: Arc<Vec<S>>,
    index: usize,
}

impl<S: Clone + Send + Sync> SampleGenerator<S> for FiniteSampleGenerator<S> {
    fn can_sample(&self) -> bool {
        self.index < self.states.len()
    }

    fn sample(&mut self, out: &mut S) -> bool {
        match self.states.get(self.index) {
            Some(state) => {
                out.clone_from(state);
                self.index += 1;
                true
            }
            None => false,
        }
    }

    fn num_samples_remaining(&self) -> Option<usize> {
        Some(self.states.len() - self.index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraint::capabilities::Satisfied;
    use crate::kinematic_traits::Configuration;

    struct Positive;

    impl Testable for Positive {
        fn is_satisfied(&self, qs: &Configuration) -> bool {
            qs.iter().all(|&q| q > 0.0)
        }
    }

    struct Small;

    impl Testable for Small {
        fn is_satisfied(&self, qs: &Configuration) -> bool {
            qs.norm() < 1.0
        }
    }

    #[test]
    fn test_intersection() {
        let intersection: TestableIntersection = TestableIntersection::new(vec![Arc::new(Positive) as Arc<dyn Testable>, Arc::new(Small)]);
        assert!(intersection.is_satisfied(&Configuration::from_vec(vec![0.1, 0.2])));
        assert!(!intersection.is_satisfied(&Configuration::from_vec(vec![-0.1, 0.2])));
        assert!(!intersection.is_satisfied(&Configuration::from_vec(vec![2.0, 0.2])));
    }

    #[test]
    fn test_empty_intersection_is_satisfied() {
        let intersection: TestableIntersection = TestableIntersection::new(Vec::new());
        assert!(intersection.is_empty());
        assert!(intersection.is_satisfied(&Configuration::from_vec(vec![-5.0])));
        let with_satisfied: TestableIntersection = TestableIntersection::new(vec![Arc::new(Satisfied) as Arc<dyn Testable>]);
        assert!(with_satisfied.is_satisfied(&Configuration::from_vec(vec![-5.0])));
    }

    #[test]
    fn test_finite_is_exhausted() {
        let finite = FiniteSampleable::new(vec![1, 2]);
        let mut generator = finite.create_sample_generator();
        let mut out = 0;
        assert_eq!(generator.num_samples_remaining(), Some(2));
        assert!(generator.sample(&mut out));
        assert_eq!(out, 1);
        assert!(generator.sample(&mut out));
        assert_eq!(out, 2);
        assert!(!generator.can_sample());
        assert!(!generator.sample(&mut out));
        assert_eq!(generator.num_samples_remaining(), Some(0));
    }

    #[test]
    fn test_cyclic_renews() {
        let cyclic = CyclicSampleable::<i32>::new(Arc::new(FiniteSampleable::new(vec![1, 2, 3])));
        let mut generator = cyclic.create_sample_generator();
        let mut seen = Vec::new();
        let mut out = 0;
        for _ in 0..7 {
            assert!(generator.can_sample());
            assert!(generator.sample(&mut out));
            seen.push(out);
        }
        assert_eq!(seen, vec![1, 2, 3, 1, 2, 3, 1]);
        assert_eq!(generator.num_samples_remaining(), None);
    }

    #[test]
    fn test_cyclic_over_empty_does_not_loop() {
        let cyclic = CyclicSampleable::<i32>::new(Arc::new(FiniteSampleable::<i32>::new(Vec::new())));
        let mut generator = cyclic.create_sample_generator();
        let mut out = 0;
        assert!(!generator.can_sample());
        assert!(!generator.sample(&mut out));
    }
}
