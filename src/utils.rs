//! Helper functions

use nalgebra::{Isometry3, UnitQuaternion};

use crate::kinematic_traits::Configuration;
use crate::path_plan::trajectory::Interpolated;

/// Allows to specify joint values in degrees (converts to radians)
pub fn as_radians(degrees: &[f64]) -> Configuration {
    Configuration::from_iterator(degrees.len(), degrees.iter().map(|d| d.to_radians()))
}

/// Joint values in degrees, two decimals.
pub fn format_configuration(qs: &Configuration) -> String {
    let mut row_str = String::new();
    for q in qs.iter() {
        row_str.push_str(&format!("{:5.2} ", q.to_degrees()));
    }
    format!("[{}]", row_str.trim_end())
}

/// Print joint values, converting radians to degrees.
pub fn dump_configuration(qs: &Configuration) {
    println!("{}", format_configuration(qs));
}

/// Print every waypoint of the trajectory with its time parameter.
pub fn dump_trajectory(trajectory: &Interpolated) {
    if trajectory.num_waypoints() == 0 {
        println!("Empty trajectory");
    }
    for waypoint in trajectory.waypoints() {
        println!("{:7.3}: {}", waypoint.t, format_configuration(&waypoint.state));
    }
}

pub fn dump_pose(isometry: &Isometry3<f64>) {
    let translation = isometry.translation.vector;
    let rotation: UnitQuaternion<f64> = isometry.rotation;
    println!(
        "x: {:.5}, y: {:.5}, z: {:.5},  quat: {:.5},{:.5},{:.5},{:.5}",
        translation.x, translation.y, translation.z, rotation.i, rotation.j, rotation.k, rotation.w
    );
}
