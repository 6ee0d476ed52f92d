use crate::kinematic_traits::Configuration;

/// Distance in the configuration space, used for nearest neighbour queries, step sizes
/// and discretization. Must be a metric (non-negative, symmetric, triangle inequality).
pub trait DistanceMetric: Send + Sync {
    fn distance(&self, a: &Configuration, b: &Configuration) -> f64;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct EuclideanMetric;

impl DistanceMetric for EuclideanMetric {
    fn distance(&self, a: &Configuration, b: &Configuration) -> f64 {
        (a - b).norm()
    }
}

/// Euclidean distance with per-joint weights (moving heavy base joints costs more).
#[derive(Debug, Clone)]
pub struct WeightedMetric {
    pub weights: Configuration,
}

impl WeightedMetric {
    pub fn new(weights: Vec<f64>) -> Self {
        Self { weights: Configuration::from_vec(weights) }
    }
}

impl DistanceMetric for WeightedMetric {
    fn distance(&self, a: &Configuration, b: &Configuration) -> f64 {
        (a - b).component_mul(&self.weights).norm()
    }
}
