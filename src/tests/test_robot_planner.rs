use std::f64::consts::PI;
use std::sync::Arc;
use std::time::Duration;

use nalgebra::{Isometry3, Matrix6x2, Vector3};
use rand::rngs::StdRng;

use crate::kinematic_traits::{Configuration, Kinematics};
use crate::parameters::TsrPlanningParameters;
use crate::planning::sampling_planner::{SamplingPlanRequest, SamplingPlanner};
use crate::planning_error::PlanningError;
use crate::planning_result::{PlanOutcome, PlanningResult, PlanningStatus};
use crate::tests::test_utils::*;
use crate::time_budget::TimeBudget;
use crate::tsr::Tsr;

fn start() -> Configuration {
    config(&[-0.5, 0.0, 0.0])
}

/// Fallback that never finds anything and remembers how many goals it was given.
struct Unlucky(std::sync::Mutex<Vec<usize>>);

impl SamplingPlanner for Unlucky {
    fn plan(
        &self,
        request: &SamplingPlanRequest,
        _budget: &TimeBudget,
        _rng: &mut StdRng,
    ) -> Result<PlanOutcome, PlanningError> {
        let mut generator = request.goal_sampleable.create_sample_generator();
        let mut goal = Configuration::zeros(request.start.len());
        let mut goals = 0;
        while generator.can_sample() && generator.sample(&mut goal) {
            goals += 1;
        }
        self.0.lock().unwrap().push(goals);
        Ok(PlanOutcome::failed(PlanningResult::exhausted("nothing found")))
    }
}

#[test]
fn test_blocked_first_goal_snaps_to_second() {
    let planner = make_planner(&[blocking_ball()], start());
    let blocked = config(&[2.5, 0.0, 0.0]);
    let free = config(&[0.5, 0.0, 0.0]);
    let outcome = planner
        .plan_to_configurations(&[blocked, free.clone()], Duration::from_secs(5), &mut rng())
        .expect("valid request");

    assert!(outcome.is_success(), "{}", outcome.result);
    let trajectory = outcome.trajectory.expect("trajectory");
    assert_eq!(trajectory.num_waypoints(), 2);
    assert_eq!(first_state(&trajectory), start());
    assert_eq!(last_state(&trajectory), free);
}

#[test]
fn test_fallback_gets_all_goals_once() {
    let fallback = Arc::new(Unlucky(std::sync::Mutex::new(Vec::new())));
    let planner = make_planner(&[blocking_ball()], start()).with_fallback(fallback.clone());
    let goals = vec![config(&[2.5, 0.0, 0.0]), config(&[2.0, 0.1, 0.0]), config(&[2.2, -0.1, 0.0])];

    let outcome = planner
        .plan_to_configurations(&goals, Duration::from_secs(5), &mut rng())
        .expect("valid request");
    assert!(!outcome.is_success());
    assert_eq!(outcome.result.status, PlanningStatus::Exhausted);
    // One message per stage: three snaps and the fallback
    assert_eq!(outcome.result.message.split("; ").count(), 4, "{}", outcome.result.message);
    assert_eq!(*fallback.0.lock().unwrap(), vec![3]);
}

#[test]
fn test_blocked_goal_planned_around_the_ball() {
    let planner = make_planner(&[blocking_ball()], start());
    let goal = config(&[2.5, 0.0, 0.0]);
    let outcome = planner
        .plan_to_configuration(&goal, Duration::from_secs(20), &mut rng())
        .expect("valid request");

    assert!(outcome.is_success(), "{}", outcome.result);
    let trajectory = outcome.trajectory.expect("trajectory");
    assert!(trajectory.num_waypoints() > 2);
    assert_eq!(first_state(&trajectory), start());
    assert_eq!(last_state(&trajectory), goal);
    assert_trajectory_valid(&planner, &trajectory, planner.tsr_parameters.collision_resolution);
}

#[test]
fn test_tsr_goal_behind_the_ball() {
    let planner = make_planner(&[blocking_ball()], start());
    // Within 2 cm of a point on the other side of the ball, any heading.
    #[rustfmt::skip]
    let bw = Matrix6x2::new(
        -0.02, 0.02,
        -0.02, 0.02,
        0.0, 0.0,
        0.0, 0.0,
        0.0, 0.0,
        -PI, PI,
    );
    let tsr = Tsr::new(Isometry3::translation(-0.6, 0.4, 0.0), Isometry3::identity(), bw).expect("valid TSR");
    let outcome = planner.plan_to_tsr(&tsr, Duration::from_secs(20), &mut rng()).expect("valid request");

    assert!(outcome.is_success(), "{}", outcome.result);
    let trajectory = outcome.trajectory.expect("trajectory");
    assert_eq!(first_state(&trajectory), start());
    assert!(tsr.contains(&three_link_arm().forward(&last_state(&trajectory))));
    assert_trajectory_valid(&planner, &trajectory, planner.tsr_parameters.collision_resolution);
}

#[test]
fn test_configuration_errors() {
    let planner = make_planner(&[], start());
    let mut rng = rng();
    let limit = Duration::from_secs(1);

    assert_eq!(
        planner.plan_to_configurations(&[], limit, &mut rng).unwrap_err(),
        PlanningError::EmptyGoalSet
    );
    assert_eq!(
        planner.plan_to_configuration(&config(&[0.0, 0.0]), limit, &mut rng).unwrap_err(),
        PlanningError::DimensionMismatch { expected: 3, found: 2 }
    );

    let mut bw = Matrix6x2::zeros();
    bw[(4, 0)] = 0.1;
    let mut inverted = Tsr::identity();
    inverted.bw = bw;
    assert!(matches!(
        planner.plan_to_tsr(&inverted, limit, &mut rng),
        Err(PlanningError::InvalidBounds { row: 4, .. })
    ));
    assert!(matches!(
        planner.plan_to_tsr_with_trajectory_constraint(&Tsr::identity(), &inverted, limit, &mut rng),
        Err(PlanningError::InvalidBounds { row: 4, .. })
    ));

    assert_eq!(
        planner
            .plan_to_end_effector_offset_by_crrt(&Vector3::zeros(), 0.1, 0.01, 0.01, limit, &mut rng)
            .unwrap_err(),
        PlanningError::ZeroDirection
    );
    assert!(matches!(
        planner.plan_to_end_effector_offset_by_crrt(&Vector3::x(), f64::NAN, 0.01, 0.01, limit, &mut rng),
        Err(PlanningError::InvalidParameter(_))
    ));

    // The time slice per trial would be zero
    if let Some(too_many) = (u32::MAX as usize).checked_add(1) {
        let planner = make_planner(&[], start()).with_tsr_parameters(TsrPlanningParameters {
            max_num_trials: too_many,
            ..Default::default()
        });
        assert!(matches!(
            planner.plan_to_tsr(&Tsr::identity(), limit, &mut rng),
            Err(PlanningError::InvalidParameter(_))
        ));
    }
}

#[test]
fn test_robot_state_restored() {
    let planner = make_planner(&[blocking_ball()], start());
    let mut rng = rng();
    let limit = Duration::from_millis(200);

    let _ = planner.plan_to_configuration(&config(&[0.5, 0.0, 0.0]), limit, &mut rng);
    assert_eq!(planner.robot.configuration(), start());

    let _ = planner.plan_to_configuration(&config(&[0.5]), limit, &mut rng);
    assert_eq!(planner.robot.configuration(), start());

    let _ = planner.plan_to_end_effector_offset_by_crrt(&Vector3::x(), -0.05, 0.01, 0.05, limit, &mut rng);
    assert_eq!(planner.robot.configuration(), start());

    // Live configuration changed between calls is the start of the next call.
    let moved = config(&[0.2, 0.1, 0.0]);
    planner.robot.set_configuration(moved.clone()).unwrap();
    let outcome = planner
        .plan_to_configuration(&config(&[0.5, 0.0, 0.0]), limit, &mut rng)
        .expect("valid request");
    assert_eq!(first_state(&outcome.trajectory.expect("trajectory")), moved);
    assert_eq!(planner.robot.configuration(), moved);
}
