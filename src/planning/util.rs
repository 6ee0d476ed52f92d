//! Planning façade: snap first, then tree planning, for configuration, configuration set,
//! Task Space Region and end-effector offset goals.
//!
//! Every entry point locks the robot for the whole call and restores its configuration
//! on return. Configuration errors are reported as [`PlanningError`] before any planning
//! work starts; a planning miss is a [`PlanOutcome`] without trajectory.

use std::f64::consts::PI;
use std::sync::Arc;
use std::time::Duration;

use nalgebra::{Isometry3, Matrix6x2, Translation3, UnitQuaternion, Vector3};
use rand::rngs::StdRng;
use rand::Rng;
use tracing::{debug, info};

use crate::constraint::bounds::SampleableBounds;
use crate::constraint::capabilities::{Sampleable, Satisfied, Testable};
use crate::constraint::combinators::{CyclicSampleable, FiniteSampleable, TestableIntersection};
use crate::constraint::frame::{FrameDifferentiable, FrameTestable, InverseKinematicsSampleable};
use crate::constraint::newton::NewtonsMethodProjectable;
use crate::kinematic_traits::{Configuration, Pose};
use crate::parameters::{CrrtPlannerParameters, TsrPlanningParameters};
use crate::path_plan::crrt_connect::{CrrtConnect, CrrtProblem};
use crate::path_plan::interpolator::{Interpolator, LinearInterpolator};
use crate::path_plan::metric::{DistanceMetric, EuclideanMetric};
use crate::planning::fallback::{FallbackChain, PlanningStrategy, SamplingStrategy, SnapStrategy};
use crate::planning::sampling_planner::{RrtConnectAdaptor, SamplingPlanRequest, SamplingPlanner};
use crate::planning::snap::plan_snap;
use crate::planning_error::{check_dimension, PlanningError};
use crate::planning_result::{PlanOutcome, PlanningResult};
use crate::robot::Robot;
use crate::time_budget::TimeBudget;
use crate::tsr::Tsr;

/// Newton projection onto the trajectory constraint gives up on steps shorter than this.
const PROJECTION_MIN_STEP_SIZE: f64 = 1e-10;

/// Direction vectors shorter than this are treated as zero.
const MIN_DIRECTION_NORM: f64 = 1e-6;

/// Plans motions of one robot. Holds the collision constraint and the collaborators
/// every query uses; queries themselves only differ by their goal.
pub struct RobotPlanner {
    pub robot: Arc<Robot>,
    pub collision: Arc<dyn Testable>,
    pub metric: Arc<dyn DistanceMetric>,
    pub interpolator: Arc<dyn Interpolator>,
    /// General purpose planner used when the snap planner misses.
    pub fallback: Arc<dyn SamplingPlanner>,
    pub tsr_parameters: TsrPlanningParameters,
    pub crrt_parameters: CrrtPlannerParameters,
}

impl RobotPlanner {
    /// Planner with Euclidean metric, linear interpolation and RRT-Connect fallback.
    pub fn new(robot: Arc<Robot>, collision: Arc<dyn Testable>) -> Self {
        Self {
            robot,
            collision,
            metric: Arc::new(EuclideanMetric),
            interpolator: Arc::new(LinearInterpolator),
            fallback: Arc::new(RrtConnectAdaptor::default()),
            tsr_parameters: TsrPlanningParameters::default(),
            crrt_parameters: CrrtPlannerParameters::default(),
        }
    }

    pub fn with_metric(mut self, metric: Arc<dyn DistanceMetric>) -> Self {
        self.metric = metric;
        self
    }

    pub fn with_interpolator(mut self, interpolator: Arc<dyn Interpolator>) -> Self {
        self.interpolator = interpolator;
        self
    }

    pub fn with_fallback(mut self, fallback: Arc<dyn SamplingPlanner>) -> Self {
        self.fallback = fallback;
        self
    }

    pub fn with_tsr_parameters(mut self, parameters: TsrPlanningParameters) -> Self {
        self.tsr_parameters = parameters;
        self
    }

    pub fn with_crrt_parameters(mut self, parameters: CrrtPlannerParameters) -> Self {
        self.crrt_parameters = parameters;
        self
    }

    /// Plans from the current configuration of the robot to `goal`: the direct path if it
    /// is free, the fallback planner otherwise.
    pub fn plan_to_configuration(
        &self,
        goal: &Configuration,
        time_limit: Duration,
        rng: &mut StdRng,
    ) -> Result<PlanOutcome, PlanningError> {
        self.plan_to_configurations(std::slice::from_ref(goal), time_limit, rng)
    }

    /// Plans to any of the `goals`. Direct paths are tried to every goal in order. If all
    /// of them are blocked, the fallback planner is called once with all goals as its goal
    /// set. The first found trajectory is returned.
    pub fn plan_to_configurations(
        &self,
        goals: &[Configuration],
        time_limit: Duration,
        rng: &mut StdRng,
    ) -> Result<PlanOutcome, PlanningError> {
        if goals.is_empty() {
            return Err(PlanningError::EmptyGoalSet);
        }
        for goal in goals {
            check_dimension(self.robot.dof(), goal.len())?;
        }
        self.tsr_parameters.validate()?;

        let saver = self.robot.save_state();
        let budget = TimeBudget::new(time_limit);
        self.plan_between(saver.saved(), goals, &budget, rng)
    }

    /// Plans to any configuration whose end-effector pose is within the TSR. Up to
    /// `max_snap_samples` goal configurations (from inverse kinematics of TSR samples) are
    /// tried with the snap planner first. After that, goal samples are planned to with the
    /// full configuration planner, each within its slice (`time_limit / max_num_trials`)
    /// of the remaining time.
    pub fn plan_to_tsr(
        &self,
        tsr: &Tsr,
        time_limit: Duration,
        rng: &mut StdRng,
    ) -> Result<PlanOutcome, PlanningError> {
        tsr.validate()?;
        let parameters = &self.tsr_parameters;
        parameters.validate()?;

        let saver = self.robot.save_state();
        let start = saver.saved();
        let budget = TimeBudget::new(time_limit);

        let tsr = Arc::new(tsr.clone().with_seed(rng.r#gen()));
        let seeds = Arc::new(SampleableBounds::new(self.robot.bounds().clone(), rng.r#gen()));
        let goals: Arc<dyn Sampleable> = Arc::new(
            InverseKinematicsSampleable::new(
                self.robot.kinematics().clone(),
                tsr,
                seeds,
                parameters.max_num_trials,
            )
            .with_initial_seed(start.clone()),
        );

        let mut chain = FallbackChain::new();
        chain.push(TsrSnapStrategy {
            planner: self,
            start,
            goals: goals.clone(),
            max_snap_samples: parameters.max_snap_samples,
        });
        chain.push(TsrReplanStrategy {
            planner: self,
            start,
            goals,
            time_per_sample: time_limit / u32::try_from(parameters.max_num_trials).unwrap_or(u32::MAX),
            max_failed_samples: parameters.max_snap_samples.max(1),
        });
        chain.run(&budget, rng)
    }

    /// Plans to the goal TSR keeping the end effector within the constraint TSR along the
    /// whole path, with CRRT-Connect. Goal states are inverse kinematics solutions of goal
    /// TSR samples; tree nodes are projected onto the constraint TSR by Newton iteration.
    pub fn plan_to_tsr_with_trajectory_constraint(
        &self,
        goal_tsr: &Tsr,
        constraint_tsr: &Tsr,
        time_limit: Duration,
        rng: &mut StdRng,
    ) -> Result<PlanOutcome, PlanningError> {
        goal_tsr.validate()?;
        constraint_tsr.validate()?;
        self.crrt_parameters.validate()?;

        let saver = self.robot.save_state();
        self.plan_constrained(saver.saved(), goal_tsr, constraint_tsr, &TimeBudget::new(time_limit), rng)
    }

    /// Moves the end effector by `distance` along `direction`, keeping it within
    /// `position_tolerance` of the straight line and `angular_tolerance` of its current
    /// orientation. A negative distance moves against the direction.
    pub fn plan_to_end_effector_offset_by_crrt(
        &self,
        direction: &Vector3<f64>,
        distance: f64,
        position_tolerance: f64,
        angular_tolerance: f64,
        time_limit: Duration,
        rng: &mut StdRng,
    ) -> Result<PlanOutcome, PlanningError> {
        if !(direction.norm() > 0.0) {
            return Err(PlanningError::ZeroDirection);
        }
        if !distance.is_finite() {
            return Err(PlanningError::InvalidParameter(format!("distance must be finite (got {})", distance)));
        }
        let (direction, distance) = if distance < 0.0 {
            (-direction.normalize(), -distance)
        } else {
            (direction.normalize(), distance)
        };
        self.crrt_parameters.validate()?;

        let saver = self.robot.save_state();
        let start = saver.saved();
        let end_effector = self.robot.kinematics().forward(start);
        let (goal_tsr, constraint_tsr) = goal_and_constraint_tsr_for_end_effector_offset(
            &end_effector,
            &direction,
            distance,
            position_tolerance,
            angular_tolerance,
        )?;
        debug!("End effector offset of {} along {:?}", distance, direction.as_slice());
        self.plan_constrained(start, &goal_tsr, &constraint_tsr, &TimeBudget::new(time_limit), rng)
    }

    /// Snap to each goal, then one fallback call with all goals. The robot must be locked.
    fn plan_between(
        &self,
        start: &Configuration,
        goals: &[Configuration],
        budget: &TimeBudget,
        rng: &mut StdRng,
    ) -> Result<PlanOutcome, PlanningError> {
        let testable = self.snap_testable();
        let mut chain = FallbackChain::new();
        for goal in goals {
            chain.push(SnapStrategy {
                start: start.clone(),
                goal: goal.clone(),
                interpolator: self.interpolator.clone(),
                metric: self.metric.clone(),
                testable: testable.clone(),
                resolution: self.tsr_parameters.collision_resolution,
            });
        }
        let request = self.sampling_request(start, Arc::new(FiniteSampleable::new(goals.to_vec())), rng);
        chain.push(SamplingStrategy { planner: self.fallback.as_ref(), request });
        chain.run(budget, rng)
    }

    /// CRRT-Connect between the start and the goal TSR. The robot must be locked.
    fn plan_constrained(
        &self,
        start: &Configuration,
        goal_tsr: &Tsr,
        constraint_tsr: &Tsr,
        budget: &TimeBudget,
        rng: &mut StdRng,
    ) -> Result<PlanOutcome, PlanningError> {
        let parameters = &self.crrt_parameters;
        let kinematics = self.robot.kinematics().clone();
        let bounds = self.robot.bounds().clone();
        let seeds: Arc<dyn Sampleable> = Arc::new(SampleableBounds::new(bounds.clone(), rng.r#gen()));

        let goal_tsr = Arc::new(goal_tsr.clone().with_seed(rng.r#gen()));
        let goal_sampleable = InverseKinematicsSampleable::new(
            kinematics.clone(),
            Arc::new(CyclicSampleable::new(goal_tsr.clone())),
            seeds.clone(),
            parameters.max_num_trials,
        )
        .with_initial_seed(start.clone());
        let goal_testable = FrameTestable::new(kinematics.clone(), goal_tsr);

        let constraint_tsr = Arc::new(constraint_tsr.clone().with_seed(rng.r#gen()));
        // A region with free translation cannot be sampled, draw joint space samples and
        // let the projection pull them in.
        let config_sampleable: Arc<dyn Sampleable> = if constraint_tsr.is_sampleable() {
            Arc::new(InverseKinematicsSampleable::new(
                kinematics.clone(),
                constraint_tsr.clone(),
                seeds,
                parameters.max_num_trials,
            ))
        } else {
            seeds
        };
        let constraint = NewtonsMethodProjectable::with_uniform_tolerance(
            Arc::new(FrameDifferentiable::new(kinematics, constraint_tsr)),
            parameters.projection_tolerance,
            parameters.projection_max_iteration,
            PROJECTION_MIN_STEP_SIZE,
        )?;

        let problem = CrrtProblem {
            goal_sampleable: Arc::new(goal_sampleable),
            goal_testable: Arc::new(goal_testable),
            constraint: Arc::new(constraint),
            config_sampleable,
            collision: self.collision.clone(),
            bounds_testable: bounds,
            metric: self.metric.clone(),
            interpolator: self.interpolator.clone(),
        };
        let outcome = CrrtConnect::new(problem, parameters.clone())?.plan(start, budget, rng);
        info!("Constrained planning: {}", outcome.result);
        Ok(outcome)
    }

    /// Collision free and within joint bounds.
    fn snap_testable(&self) -> Arc<dyn Testable> {
        Arc::new(TestableIntersection::new(vec![
            self.collision.clone(),
            self.robot.bounds().clone() as Arc<dyn Testable>,
        ]))
    }

    fn sampling_request(
        &self,
        start: &Configuration,
        goal_sampleable: Arc<dyn Sampleable>,
        rng: &mut StdRng,
    ) -> SamplingPlanRequest {
        let bounds = self.robot.bounds().clone();
        SamplingPlanRequest {
            start: start.clone(),
            goal_sampleable,
            goal_testable: Arc::new(Satisfied),
            interpolator: self.interpolator.clone(),
            metric: self.metric.clone(),
            sampler: Arc::new(SampleableBounds::new(bounds.clone(), rng.r#gen())),
            collision: self.collision.clone(),
            bounds_testable: bounds.clone(),
            bounds_projectable: bounds,
            collision_resolution: self.tsr_parameters.collision_resolution,
        }
    }
}

/// Snap planner against a bounded number of TSR goal samples.
struct TsrSnapStrategy<'a> {
    planner: &'a RobotPlanner,
    start: &'a Configuration,
    goals: Arc<dyn Sampleable>,
    max_snap_samples: usize,
}

impl PlanningStrategy for TsrSnapStrategy<'_> {
    fn name(&self) -> &str {
        "TSR snap"
    }

    fn needs_time(&self) -> bool {
        false
    }

    fn attempt(&self, _budget: &TimeBudget, _rng: &mut StdRng) -> Result<PlanOutcome, PlanningError> {
        let planner = self.planner;
        let testable = planner.snap_testable();
        let mut generator = self.goals.create_sample_generator();
        let mut goal = Configuration::zeros(self.start.len());
        let mut sampled = 0;
        for _ in 0..self.max_snap_samples {
            if !generator.can_sample() {
                break;
            }
            if !generator.sample(&mut goal) {
                continue;
            }
            sampled += 1;
            let outcome = plan_snap(
                self.start,
                &goal,
                planner.interpolator.clone(),
                planner.metric.as_ref(),
                testable.as_ref(),
                planner.tsr_parameters.collision_resolution,
            )?;
            if outcome.is_success() {
                return Ok(outcome);
            }
        }
        Ok(PlanOutcome::failed(PlanningResult::infeasible(format!(
            "no direct path to any of {} goal samples", sampled
        ))))
    }
}

/// Full configuration planning to TSR goal samples, one time slice per sample.
struct TsrReplanStrategy<'a> {
    planner: &'a RobotPlanner,
    start: &'a Configuration,
    goals: Arc<dyn Sampleable>,
    time_per_sample: Duration,
    /// Gives up after this many goal draws in a row without an IK solution.
    max_failed_samples: usize,
}

impl PlanningStrategy for TsrReplanStrategy<'_> {
    fn name(&self) -> &str {
        "TSR replanning"
    }

    fn attempt(&self, budget: &TimeBudget, rng: &mut StdRng) -> Result<PlanOutcome, PlanningError> {
        let mut generator = self.goals.create_sample_generator();
        let mut goal = Configuration::zeros(self.start.len());
        let mut attempts = 0;
        let mut failed_samples = 0;
        while !budget.is_expired() && generator.can_sample() && failed_samples < self.max_failed_samples {
            if !generator.sample(&mut goal) {
                failed_samples += 1;
                continue;
            }
            failed_samples = 0;
            attempts += 1;
            let slice = budget.slice(self.time_per_sample);
            let outcome = self.planner.plan_between(self.start, std::slice::from_ref(&goal), &slice, rng)?;
            if outcome.is_success() {
                return Ok(outcome);
            }
        }
        let message = format!("no path to any of {} goal samples", attempts);
        Ok(PlanOutcome::failed(if budget.is_expired() {
            PlanningResult::timeout(message)
        } else {
            PlanningResult::exhausted(message)
        }))
    }
}

/// Goal and constraint TSRs for moving the end effector from `end_effector` by `distance`
/// along the unit vector `direction`. Both are expressed in a frame at the end effector
/// with its z axis along the direction. The goal is the single pose at the end of the
/// motion; the constraint allows `position_tolerance` off the line, anything from 0 to
/// `distance` along it and `angular_tolerance` of rotation about each axis.
pub fn goal_and_constraint_tsr_for_end_effector_offset(
    end_effector: &Pose,
    direction: &Vector3<f64>,
    distance: f64,
    position_tolerance: f64,
    angular_tolerance: f64,
) -> Result<(Tsr, Tsr), PlanningError> {
    let h_world_w = look_at_isometry(&end_effector.translation.vector, direction)?;
    let h_w_ee = h_world_w.inverse() * end_effector;

    let goal = Tsr::new(
        h_world_w * Translation3::new(0.0, 0.0, distance),
        h_w_ee,
        Matrix6x2::zeros(),
    )?;

    #[rustfmt::skip]
    let bw = Matrix6x2::new(
        -position_tolerance, position_tolerance,
        -position_tolerance, position_tolerance,
        0.0, distance,
        -angular_tolerance, angular_tolerance,
        -angular_tolerance, angular_tolerance,
        -angular_tolerance, angular_tolerance,
    );
    let constraint = Tsr::new(h_world_w, h_w_ee, bw)?;
    Ok((goal, constraint))
}

/// Isometry at `from` whose z axis points along `direction`.
pub fn look_at_isometry(from: &Vector3<f64>, direction: &Vector3<f64>) -> Result<Isometry3<f64>, PlanningError> {
    if !(direction.norm() >= MIN_DIRECTION_NORM) {
        return Err(PlanningError::ZeroDirection);
    }
    let rotation = UnitQuaternion::rotation_between(&Vector3::z(), direction)
        // Exactly opposite to z: any half turn about an axis normal to z.
        .unwrap_or_else(|| UnitQuaternion::from_axis_angle(&Vector3::x_axis(), PI));
    Ok(Isometry3::from_parts(Translation3::from(*from), rotation))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_look_at() {
        let from = Vector3::new(1.0, 2.0, 3.0);
        for direction in [Vector3::x(), Vector3::new(0.0, -1.0, 1.0), Vector3::z(), -Vector3::z()] {
            let isometry = look_at_isometry(&from, &direction).unwrap();
            assert!((isometry.translation.vector - from).norm() < 1e-12);
            let z = isometry.rotation * Vector3::z();
            assert!((z - direction.normalize()).norm() < 1e-9, "{:?}", direction);
        }
        assert_eq!(look_at_isometry(&from, &Vector3::zeros()), Err(PlanningError::ZeroDirection));
        assert!(look_at_isometry(&from, &Vector3::new(1e-8, 0.0, 0.0)).is_err());
    }

    #[test]
    fn test_offset_tsrs() {
        let end_effector = Isometry3::new(Vector3::new(0.5, 0.2, 0.0), Vector3::new(0.0, 0.0, 0.3));
        let direction = Vector3::x();
        let (goal, constraint) =
            goal_and_constraint_tsr_for_end_effector_offset(&end_effector, &direction, 0.2, 1e-3, 1e-3).unwrap();

        let moved = Isometry3::from_parts(
            Translation3::from(end_effector.translation.vector + direction * 0.2),
            end_effector.rotation,
        );
        assert!(goal.contains(&moved));
        assert!(!goal.contains(&end_effector));

        assert!(constraint.contains(&end_effector));
        assert!(constraint.contains(&moved));
        let halfway = Translation3::new(0.1, 0.0, 0.0) * end_effector;
        assert!(constraint.contains(&halfway));
        let off_line = Translation3::new(0.1, 0.01, 0.0) * end_effector;
        assert!(!constraint.contains(&off_line));
        let behind = Translation3::new(-0.01, 0.0, 0.0) * end_effector;
        assert!(!constraint.contains(&behind));
    }

    #[test]
    fn test_offset_tsrs_reject_negative_distance() {
        let result = goal_and_constraint_tsr_for_end_effector_offset(
            &Isometry3::identity(), &Vector3::x(), -0.1, 1e-3, 1e-3,
        );
        assert!(matches!(result, Err(PlanningError::InvalidBounds { row: 2, .. })));
    }
}
