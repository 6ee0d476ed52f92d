//! Geometric trajectory: waypoints joined by an interpolator.

use std::fmt;
use std::sync::Arc;

use crate::kinematic_traits::Configuration;
use crate::path_plan::interpolator::Interpolator;
use crate::path_plan::metric::DistanceMetric;
use crate::planning_error::PlanningError;

#[derive(Debug, Clone, PartialEq)]
pub struct Waypoint {
    /// Path parameter of the waypoint, non-decreasing along the trajectory.
    pub t: f64,
    pub state: Configuration,
}

/// Ordered waypoints indexed by a path parameter, with the interpolator used between
/// consecutive waypoints. Planners in this crate use the accumulated metric distance
/// as the parameter, so a trajectory from a state to itself has zero duration.
#[derive(Clone)]
pub struct Interpolated {
    interpolator: Arc<dyn Interpolator>,
    waypoints: Vec<Waypoint>,
}

impl Interpolated {
    pub fn new(interpolator: Arc<dyn Interpolator>) -> Self {
        Self { interpolator, waypoints: Vec::new() }
    }

    /// Trajectory through the given states, parameterized by accumulated distance.
    pub fn from_states(
        interpolator: Arc<dyn Interpolator>,
        metric: &dyn DistanceMetric,
        states: Vec<Configuration>,
    ) -> Self {
        let mut waypoints = Vec::with_capacity(states.len());
        let mut t = 0.0;
        let mut previous: Option<&Configuration> = None;
        for state in &states {
            if let Some(previous) = previous {
                t += metric.distance(previous, state);
            }
            waypoints.push(Waypoint { t, state: state.clone() });
            previous = Some(state);
        }
        Self { interpolator, waypoints }
    }

    /// Appends a waypoint. The parameter must not be below the last one.
    pub fn add_waypoint(&mut self, t: f64, state: Configuration) -> Result<(), PlanningError> {
        if let Some(last) = self.waypoints.last() {
            if !(t >= last.t) {
                return Err(PlanningError::InvalidParameter(format!(
                    "waypoint parameter {} is below the previous {}", t, last.t
                )));
            }
            if last.state.len() != state.len() {
                return Err(PlanningError::DimensionMismatch { expected: last.state.len(), found: state.len() });
            }
        }
        self.waypoints.push(Waypoint { t, state });
        Ok(())
    }

    pub fn num_waypoints(&self) -> usize {
        self.waypoints.len()
    }

    pub fn waypoint(&self, index: usize) -> Option<&Configuration> {
        self.waypoints.get(index).map(|w| &w.state)
    }

    pub fn waypoints(&self) -> &[Waypoint] {
        &self.waypoints
    }

    /// States of all waypoints, in order.
    pub fn states(&self) -> Vec<Configuration> {
        self.waypoints.iter().map(|w| w.state.clone()).collect()
    }

    pub fn start_time(&self) -> f64 {
        self.waypoints.first().map_or(0.0, |w| w.t)
    }

    pub fn end_time(&self) -> f64 {
        self.waypoints.last().map_or(0.0, |w| w.t)
    }

    pub fn duration(&self) -> f64 {
        self.end_time() - self.start_time()
    }

    /// State at parameter `t`, clamped to the trajectory range. None for an empty trajectory.
    pub fn evaluate(&self, t: f64) -> Option<Configuration> {
        let first = self.waypoints.first()?;
        let last = self.waypoints.last()?;
        if t <= first.t {
            return Some(first.state.clone());
        }
        if t >= last.t {
            return Some(last.state.clone());
        }
        // First waypoint with parameter above t; exists as t < last.t
        let next = self.waypoints.partition_point(|w| w.t <= t);
        let (a, b) = (&self.waypoints[next - 1], &self.waypoints[next]);
        let span = b.t - a.t;
        let local = if span > 0.0 { (t - a.t) / span } else { 1.0 };
        Some(self.interpolator.interpolate(&a.state, &b.state, local))
    }

    /// States along the whole trajectory, spaced at most `resolution` apart (in the path
    /// parameter). All waypoints are included.
    pub fn discretize(&self, resolution: f64) -> Vec<Configuration> {
        let mut states = Vec::new();
        for pair in self.waypoints.windows(2) {
            let (a, b) = (&pair[0], &pair[1]);
            let steps = segment_steps(b.t - a.t, resolution);
            for k in 0..steps {
                states.push(self.interpolator.interpolate(&a.state, &b.state, k as f64 / steps as f64));
            }
        }
        if let Some(last) = self.waypoints.last() {
            states.push(last.state.clone());
        }
        states
    }
}

/// Number of intervals a segment of the given length is split into.
pub(crate) fn segment_steps(length: f64, resolution: f64) -> usize {
    if !(length > 0.0) || !(resolution > 0.0) {
        return 1;
    }
    ((length / resolution).ceil() as usize).max(1)
}

impl fmt::Debug for Interpolated {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Interpolated")
            .field("waypoints", &self.waypoints)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path_plan::interpolator::LinearInterpolator;
    use crate::path_plan::metric::EuclideanMetric;

    fn config(values: &[f64]) -> Configuration {
        Configuration::from_column_slice(values)
    }

    fn l_shaped() -> Interpolated {
        Interpolated::from_states(
            Arc::new(LinearInterpolator),
            &EuclideanMetric,
            vec![config(&[0.0, 0.0]), config(&[1.0, 0.0]), config(&[1.0, 2.0])],
        )
    }

    #[test]
    fn test_parameterized_by_distance() {
        let trajectory = l_shaped();
        assert_eq!(trajectory.num_waypoints(), 3);
        assert_eq!(trajectory.start_time(), 0.0);
        assert_eq!(trajectory.end_time(), 3.0);
        assert_eq!(trajectory.evaluate(2.0), Some(config(&[1.0, 1.0])));
        assert_eq!(trajectory.evaluate(0.5), Some(config(&[0.5, 0.0])));
        assert_eq!(trajectory.evaluate(10.0), Some(config(&[1.0, 2.0])));
    }

    #[test]
    fn test_discretize() {
        let states = l_shaped().discretize(0.5);
        // 2 + 4 intervals, plus the final state
        assert_eq!(states.len(), 7);
        assert_eq!(states[0], config(&[0.0, 0.0]));
        assert_eq!(states[2], config(&[1.0, 0.0]));
        assert_eq!(states[6], config(&[1.0, 2.0]));
        for pair in states.windows(2) {
            assert!((&pair[1] - &pair[0]).norm() <= 0.5 + 1e-12);
        }
    }

    #[test]
    fn test_zero_length() {
        let trajectory = Interpolated::from_states(
            Arc::new(LinearInterpolator),
            &EuclideanMetric,
            vec![config(&[0.3]), config(&[0.3])],
        );
        assert_eq!(trajectory.duration(), 0.0);
        assert_eq!(trajectory.evaluate(0.0), Some(config(&[0.3])));
        assert_eq!(trajectory.discretize(0.1).len(), 2);
    }

    #[test]
    fn test_add_waypoint_checks_order() {
        let mut trajectory = Interpolated::new(Arc::new(LinearInterpolator));
        assert!(trajectory.evaluate(0.0).is_none());
        trajectory.add_waypoint(0.0, config(&[0.0])).unwrap();
        trajectory.add_waypoint(1.0, config(&[1.0])).unwrap();
        assert!(trajectory.add_waypoint(0.5, config(&[2.0])).is_err());
        assert!(trajectory.add_waypoint(2.0, config(&[2.0, 0.0])).is_err());
    }
}
