mod test_planning_scenarios;
mod test_robot_planner;
mod test_end_effector_offset;
