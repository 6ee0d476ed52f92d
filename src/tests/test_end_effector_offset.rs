//! Straight end-effector motion with CRRT-Connect on the three link arm.

use std::time::Duration;

use nalgebra::Vector3;

use crate::kinematic_traits::Kinematics;
use crate::parameters::CrrtPlannerParameters;
use crate::planning::util::goal_and_constraint_tsr_for_end_effector_offset;
use crate::tests::test_utils::*;

const POSITION_TOLERANCE: f64 = 0.01;
const ANGULAR_TOLERANCE: f64 = 0.05;

fn crrt_parameters() -> CrrtPlannerParameters {
    CrrtPlannerParameters {
        max_extension_distance: 0.1,
        max_distance_btw_projections: 0.2,
        projection_tolerance: 1e-6,
        projection_max_iteration: 50,
        collision_resolution: 0.02,
        ..Default::default()
    }
}

fn check_offset(distance: f64) {
    let start = config(&[0.2, 1.5, 0.5]);
    let planner = make_planner(&[], start.clone()).with_crrt_parameters(crrt_parameters());
    let arm = three_link_arm();
    let end_effector = arm.forward(&start);
    let towards_base = -end_effector.translation.vector;
    let direction = Vector3::new(towards_base.x, towards_base.y, 0.0);

    let outcome = planner
        .plan_to_end_effector_offset_by_crrt(
            &direction,
            distance,
            POSITION_TOLERANCE,
            ANGULAR_TOLERANCE,
            Duration::from_secs(30),
            &mut rng(),
        )
        .expect("valid request");
    assert!(outcome.is_success(), "{}", outcome.result);
    let trajectory = outcome.trajectory.expect("trajectory");
    assert_eq!(first_state(&trajectory), start);
    assert_eq!(planner.robot.configuration(), start);

    // Negative distance is the same motion in the opposite direction.
    let (direction, distance) = if distance < 0.0 {
        (-direction.normalize(), -distance)
    } else {
        (direction.normalize(), distance)
    };
    let (goal, mut constraint) = goal_and_constraint_tsr_for_end_effector_offset(
        &end_effector,
        &direction,
        distance,
        POSITION_TOLERANCE,
        ANGULAR_TOLERANCE,
    )
    .expect("valid offset");

    let reached = arm.forward(&last_state(&trajectory));
    assert!(goal.contains(&reached), "excess {:?}", goal.excess(&reached));
    let expected = end_effector.translation.vector + direction * distance;
    assert!((reached.translation.vector - expected).norm() < 1e-5);

    // Nodes are projected to the projection tolerance only.
    constraint.testable_tolerance = 1e-4;
    for (i, waypoint) in trajectory.waypoints().iter().enumerate() {
        let pose = arm.forward(&waypoint.state);
        assert!(constraint.contains(&pose), "waypoint {}: excess {:?}", i, constraint.excess(&pose));
    }
}

#[test]
fn test_offset_towards_base() {
    check_offset(0.1);
}

#[test]
fn test_negative_offset() {
    check_offset(-0.1);
}
