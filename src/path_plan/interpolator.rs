use crate::kinematic_traits::Configuration;

/// Produces intermediate states between two states. `t` runs from 0 (`start`) to 1
/// (`end`). The arc length of the interpolated curve must grow monotonically with `t`
/// under the planner's distance metric.
pub trait Interpolator: Send + Sync {
    fn interpolate(&self, start: &Configuration, end: &Configuration, t: f64) -> Configuration;
}

/// Interpolates linearly in the joint space (geodesic for the Euclidean joint space).
#[derive(Debug, Default, Clone, Copy)]
pub struct LinearInterpolator;

impl Interpolator for LinearInterpolator {
    fn interpolate(&self, start: &Configuration, end: &Configuration, t: f64) -> Configuration {
        interpolate_joints(start, end, t)
    }
}

/// Linear interpolation with `t` clamped into [0, 1].
pub fn interpolate_joints(start: &Configuration, end: &Configuration, t: f64) -> Configuration {
    if t <= 0.0 {
        return start.clone();
    } else if t >= 1.0 {
        return end.clone();
    }
    start + (end - start) * t
}
