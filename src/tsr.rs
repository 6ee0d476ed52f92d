//! Task Space Region (TSR): a volume of end-effector poses.
//!
//! The region is defined relative to the reference frame `t0_w` (world to TSR frame).
//! A pose belongs to the region if, after removing the end-effector offset `tw_e`, it
//! is displaced from `t0_w` by a twist within the bound matrix `bw`. Rows of `bw` are
//! translation along x, y, z followed by rotation about x, y, z (roll, pitch, yaw, so
//! the rotation is `Rz(yaw) * Ry(pitch) * Rx(roll)`). Column 0 holds the minimum and
//! column 1 the maximum. A zero width row is an equality constraint, a row from
//! -infinity to +infinity leaves the coordinate free.
//!
//! ```
//! use nalgebra::{Isometry3, Matrix6x2};
//! use rs_tsr_planning::tsr::Tsr;
//!
//! // Any pose within 5 cm of the origin, free rotation about z.
//! let mut bw = Matrix6x2::zeros();
//! for i in 0..3 {
//!     bw[(i, 0)] = -0.05;
//!     bw[(i, 1)] = 0.05;
//! }
//! bw[(5, 0)] = f64::NEG_INFINITY;
//! bw[(5, 1)] = f64::INFINITY;
//! let tsr = Tsr::new(Isometry3::identity(), Isometry3::identity(), bw).unwrap();
//! assert!(tsr.contains(&Isometry3::translation(0.01, 0.0, 0.02)));
//! assert!(!tsr.contains(&Isometry3::translation(0.1, 0.0, 0.0)));
//! ```

use std::f64::consts::PI;
use std::sync::Arc;

use nalgebra::{Isometry3, Matrix6x2, Translation3, UnitQuaternion, Vector3, Vector6};
use rand::rngs::StdRng;
use rand::Rng;

use crate::constraint::capabilities::{RngSource, SampleGenerator, Sampleable, Testable};
use crate::kinematic_traits::Pose;
use crate::planning_error::PlanningError;

const TWO_PI: f64 = 2.0 * PI;

/// Default slack of the containment test, absorbs round-off of pose composition.
pub const DEFAULT_TESTABLE_TOLERANCE: f64 = 1e-6;

#[derive(Debug, Clone)]
pub struct Tsr {
    /// Transform from the world into the TSR frame.
    pub t0_w: Isometry3<f64>,

    /// Offset of the end-effector from the TSR frame.
    pub tw_e: Isometry3<f64>,

    /// Bounds of the twist coordinates: x, y, z, roll, pitch, yaw; min in column 0, max in column 1.
    pub bw: Matrix6x2<f64>,

    /// Coordinates may exceed `bw` by this amount and still count as contained.
    pub testable_tolerance: f64,

    rng: Arc<RngSource>,
}

impl Tsr {
    pub fn new(t0_w: Isometry3<f64>, tw_e: Isometry3<f64>, bw: Matrix6x2<f64>) -> Result<Self, PlanningError> {
        let tsr = Tsr {
            t0_w,
            tw_e,
            bw,
            testable_tolerance: DEFAULT_TESTABLE_TOLERANCE,
            rng: Arc::new(RngSource::new(0)),
        };
        tsr.validate()?;
        Ok(tsr)
    }

    /// Region with identity transforms and all bounds zero (the single pose at the origin).
    pub fn identity() -> Self {
        Tsr {
            t0_w: Isometry3::identity(),
            tw_e: Isometry3::identity(),
            bw: Matrix6x2::zeros(),
            testable_tolerance: DEFAULT_TESTABLE_TOLERANCE,
            rng: Arc::new(RngSource::new(0)),
        }
    }

    /// Replaces the random source used by sample generators created afterwards.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = Arc::new(RngSource::new(seed));
        self
    }

    /// Checks that every row has min not above max. NaN bounds are rejected as well.
    pub fn validate(&self) -> Result<(), PlanningError> {
        for row in 0..6 {
            let (min, max) = (self.bw[(row, 0)], self.bw[(row, 1)]);
            if !(min <= max) {
                return Err(PlanningError::InvalidBounds { row, min, max });
            }
        }
        Ok(())
    }

    /// True if all translation rows have finite bounds so uniform sampling is possible.
    pub fn is_sampleable(&self) -> bool {
        (0..3).all(|i| self.bw[(i, 0)].is_finite() && self.bw[(i, 1)].is_finite())
    }

    /// Pose for the given twist coordinates.
    pub fn pose_from_twist(&self, twist: &Vector6<f64>) -> Pose {
        let tw = Isometry3::from_parts(
            Translation3::new(twist[0], twist[1], twist[2]),
            UnitQuaternion::from_euler_angles(twist[3], twist[4], twist[5]),
        );
        self.t0_w * tw * self.tw_e
    }

    /// Displacement of the pose from the TSR frame, as it is compared against `bw`.
    pub fn displacement(&self, pose: &Pose) -> Isometry3<f64> {
        self.t0_w.inverse() * pose * self.tw_e.inverse()
    }

    /// Signed amount by which each twist coordinate of the pose lies outside `bw`:
    /// negative below the minimum, positive above the maximum, zero inside.
    pub fn excess(&self, pose: &Pose) -> Vector6<f64> {
        let tw = self.displacement(pose);
        let translation = tw.translation.vector;
        let mut result = Vector6::zeros();
        for i in 0..3 {
            result[i] = linear_excess(translation[i], self.bw[(i, 0)], self.bw[(i, 1)]);
        }

        // The same rotation has two roll-pitch-yaw representations, take the one closer to
        // the bounds.
        let (roll, pitch, yaw) = tw.rotation.euler_angles();
        let primary = self.rotation_excess(&Vector3::new(roll, pitch, yaw));
        let alternative = self.rotation_excess(&Vector3::new(roll + PI, PI - pitch, yaw + PI));
        let rotation = if alternative.norm() < primary.norm() { alternative } else { primary };
        result.fixed_rows_mut::<3>(3).copy_from(&rotation);
        result
    }

    fn rotation_excess(&self, rpy: &Vector3<f64>) -> Vector3<f64> {
        Vector3::from_fn(|i, _| angular_excess(rpy[i], self.bw[(i + 3, 0)], self.bw[(i + 3, 1)]))
    }

    /// True if the pose is inside the region (inclusive, within `testable_tolerance`).
    pub fn contains(&self, pose: &Pose) -> bool {
        self.excess(pose).amax() <= self.testable_tolerance
    }

    /// Draws twist coordinates uniformly within `bw`. Rotation rows wider than a full turn
    /// are drawn from [-pi, pi].
    fn random_twist(&self, rng: &mut impl Rng) -> Vector6<f64> {
        Vector6::from_fn(|i, _| {
            let (mut min, mut max) = (self.bw[(i, 0)], self.bw[(i, 1)]);
            if i >= 3 && max - min >= TWO_PI {
                min = -PI;
                max = PI;
            }
            if min == max { min } else { rng.gen_range(min..=max) }
        })
    }
}

impl Default for Tsr {
    fn default() -> Self {
        Tsr::identity()
    }
}

fn linear_excess(value: f64, min: f64, max: f64) -> f64 {
    if value < min {
        value - min
    } else if value > max {
        value - max
    } else {
        0.0
    }
}

/// Excess of an angle, taking the representative (angle + 2 pi k) closest to the range.
fn angular_excess(angle: f64, min: f64, max: f64) -> f64 {
    if max - min >= TWO_PI {
        return 0.0;
    }
    // Smallest representative not below min
    let shifted = min + (angle - min).rem_euclid(TWO_PI);
    if shifted <= max {
        return 0.0;
    }
    let above = shifted - max;
    let below = shifted - TWO_PI - min; // negative
    if above <= -below { above } else { below }
}

impl Testable<Pose> for Tsr {
    fn is_satisfied(&self, pose: &Pose) -> bool {
        self.contains(pose)
    }
}

impl Sampleable<Pose> for Tsr {
    fn create_sample_generator(&self) -> Box<dyn SampleGenerator<Pose>> {
        Box::new(TsrSampleGenerator {
            tsr: self.clone(),
            rng: self.rng.fork(),
        })
    }
}

/// Unbounded generator of poses within the region.
pub struct TsrSampleGenerator {
    tsr: Tsr,
    rng: StdRng,
}

impl SampleGenerator<Pose> for TsrSampleGenerator {
    fn can_sample(&self) -> bool {
        self.tsr.is_sampleable()
    }

    fn sample(&mut self, out: &mut Pose) -> bool {
        if !self.can_sample() {
            return false;
        }
        let twist = self.tsr.random_twist(&mut self.rng);
        *out = self.tsr.pose_from_twist(&twist);
        true
    }
}
