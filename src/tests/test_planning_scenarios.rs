//! Planning scenarios with known answers: trivial queries, single pose goals, free
//! constraints and a budget that is already used up.

use std::time::Duration;

use nalgebra::{Isometry3, Matrix6x2};

use crate::kinematic_traits::Kinematics;
use crate::planning_result::PlanningStatus;
use crate::tests::test_utils::*;
use crate::tsr::Tsr;

#[test]
fn test_start_equals_goal() {
    let start = config(&[0.1, 0.2, 0.3]);
    let planner = make_planner(&[], start.clone());
    let outcome = planner
        .plan_to_configuration(&start, Duration::from_secs(1), &mut rng())
        .expect("valid request");

    assert!(outcome.is_success(), "{}", outcome.result);
    assert!(outcome.result.message.contains("Snap"), "{}", outcome.result);
    let trajectory = outcome.trajectory.expect("trajectory");
    assert_eq!(trajectory.duration(), 0.0);
    assert!(trajectory.states().iter().all(|state| *state == start));
}

#[test]
fn test_single_pose_tsr_is_snapped() {
    let start = config(&[0.1, 0.2, 0.3]);
    let planner = make_planner(&[], start.clone());
    let target = three_link_arm().forward(&config(&[0.4, -0.3, 0.2]));
    let tsr = Tsr::new(target, Isometry3::identity(), Matrix6x2::zeros()).expect("valid TSR");

    let outcome = planner.plan_to_tsr(&tsr, Duration::from_secs(2), &mut rng()).expect("valid request");
    assert!(outcome.is_success(), "{}", outcome.result);
    let trajectory = outcome.trajectory.expect("trajectory");
    // Direct path, no tree planning involved
    assert_eq!(trajectory.num_waypoints(), 2);
    assert_eq!(first_state(&trajectory), start);

    let reached = three_link_arm().forward(&last_state(&trajectory));
    assert!((reached.translation.vector - target.translation.vector).norm() < 1e-6);
    assert!(reached.rotation.angle_to(&target.rotation) < 1e-6);
    assert!(tsr.contains(&reached));
}

#[test]
fn test_unbounded_constraint_plans_as_unconstrained() {
    let start = config(&[-0.5, 0.0, 0.0]);
    let planner = make_planner(&[], start.clone());
    let goal = config(&[0.6, -0.4, 0.3]);
    let target = three_link_arm().forward(&goal);
    let goal_tsr = Tsr::new(target, Isometry3::identity(), Matrix6x2::zeros()).expect("valid TSR");

    let mut bw = Matrix6x2::zeros();
    for row in 0..6 {
        bw[(row, 0)] = f64::NEG_INFINITY;
        bw[(row, 1)] = f64::INFINITY;
    }
    let free = Tsr::new(Isometry3::identity(), Isometry3::identity(), bw).expect("valid TSR");
    // Every pose is inside
    assert!(free.contains(&target));
    assert!(free.contains(&Isometry3::translation(100.0, -3.0, 7.0)));

    let outcome = planner
        .plan_to_tsr_with_trajectory_constraint(&goal_tsr, &free, Duration::from_secs(20), &mut rng())
        .expect("valid request");
    assert!(outcome.is_success(), "{}", outcome.result);
    let trajectory = outcome.trajectory.expect("trajectory");
    assert_eq!(first_state(&trajectory), start);
    assert!(goal_tsr.contains(&three_link_arm().forward(&last_state(&trajectory))));

    // Projection never moved a node, so no edge is longer than one extension step.
    let max_extension = planner.crrt_parameters.max_extension_distance;
    for pair in trajectory.waypoints().windows(2) {
        assert!((&pair[1].state - &pair[0].state).norm() <= max_extension + 1e-9);
    }
    assert_trajectory_valid(&planner, &trajectory, planner.crrt_parameters.collision_resolution);
}

#[test]
fn test_zero_time_limit() {
    let start = config(&[-0.5, 0.0, 0.0]);
    let planner = make_planner(&[blocking_ball()], start.clone());

    // Snap still runs on an elapsed budget
    let free_goal = config(&[0.5, 0.0, 0.0]);
    let outcome = planner.plan_to_configuration(&free_goal, Duration::ZERO, &mut rng()).expect("valid request");
    assert!(outcome.is_success(), "{}", outcome.result);

    // The tree planner does not
    let blocked_goal = config(&[2.5, 0.0, 0.0]);
    let outcome = planner.plan_to_configuration(&blocked_goal, Duration::ZERO, &mut rng()).expect("valid request");
    assert!(!outcome.is_success());
    assert_eq!(outcome.result.status, PlanningStatus::Timeout);
    assert!(outcome.result.message.contains("skipped"), "{}", outcome.result);

    let target = three_link_arm().forward(&config(&[0.4, -0.3, 0.2]));
    let goal_tsr = Tsr::new(target, Isometry3::identity(), Matrix6x2::zeros()).expect("valid TSR");
    let outcome = planner
        .plan_to_tsr_with_trajectory_constraint(&goal_tsr, &Tsr::identity(), Duration::ZERO, &mut rng())
        .expect("valid request");
    assert!(outcome.trajectory.is_none());
    assert_eq!(outcome.result.status, PlanningStatus::Timeout);
}

#[test]
fn test_zero_time_limit_tsr_goal() {
    let start = config(&[-0.5, 0.0, 0.0]);
    let planner = make_planner(&[], start.clone());
    let target = three_link_arm().forward(&config(&[0.5, 0.3, -0.2]));
    let tsr = Tsr::new(target, Isometry3::identity(), Matrix6x2::zeros()).expect("valid TSR");

    // Goal samples are still snapped to on an elapsed budget
    let outcome = planner.plan_to_tsr(&tsr, Duration::ZERO, &mut rng()).expect("valid request");
    assert!(outcome.is_success(), "{}", outcome.result);
    let trajectory = outcome.trajectory.expect("trajectory");
    assert_eq!(trajectory.num_waypoints(), 2);
    assert_eq!(first_state(&trajectory), start);
    assert!(tsr.contains(&three_link_arm().forward(&last_state(&trajectory))));

    // Out of reach, so there is nothing to snap to, and replanning has no time left.
    let far = Tsr::new(Isometry3::translation(5.0, 0.0, 0.0), Isometry3::identity(), Matrix6x2::zeros())
        .expect("valid TSR");
    let outcome = planner.plan_to_tsr(&far, Duration::ZERO, &mut rng()).expect("valid request");
    assert!(outcome.trajectory.is_none());
    assert_eq!(outcome.result.status, PlanningStatus::Timeout);
    assert!(outcome.result.message.contains("no direct path"), "{}", outcome.result);
    assert!(outcome.result.message.contains("TSR replanning: skipped"), "{}", outcome.result);
}
