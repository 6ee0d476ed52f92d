//! Constrained motion planning for articulated robots.
//!
//! The planners in this crate search the joint space of a robot for collision free paths
//! while keeping the end effector within a _Task Space Region_ (TSR), a volume of poses
//! around a reference frame. The approach follows _Task Space Regions: A framework for
//! pose-constrained manipulation planning_ by Dmitry Berenson, Siddhartha Srinivasa and
//! James Kuffner (IJRR 2011) and the CRRT-Connect planner built upon it, where tree nodes
//! are projected onto the constraint manifold by Newton iteration.
//!
//! # Features
//!
//! - Constraints are described by capabilities: they can be sampled, tested, differentiated
//!   or projected onto. Planners depend on these traits only, so joint limits, collision
//!   freedom, TSR membership and their combinations are interchangeable.
//! - Task Space Regions with free (infinite) and angular bounds, sampling and containment
//!   test with tolerance.
//! - Snap planner: the straight joint space path, checked at the given resolution. Tried
//!   before anything more expensive.
//! - CRRT-Connect: bidirectional tree planning under the trajectory constraint, within a
//!   time budget.
//! - Planning façade that snaps first and falls back to tree planning, for single
//!   configurations, configuration sets, TSR goals and straight end-effector offsets.
//!   The live configuration of the robot is restored on every exit path.
//! - Planner parameters can be read from YAML (`allow_filesystem` feature).
//! - Planar arm kinematics and ball obstacles (`collisions` feature) for experiments and
//!   testing.
//!
//! Planning results are repeatable: all randomness comes from a seeded [`rand::rngs::StdRng`]
//! passed by the caller.

pub mod kinematic_traits;
pub mod jacobian;

pub mod planning_error;
pub mod planning_result;
pub mod time_budget;

pub mod parameters;

#[cfg(feature = "allow_filesystem")]
pub mod parameter_error;

#[cfg(feature = "allow_filesystem")]
pub mod parameters_from_file;

pub mod utils;

pub mod tsr;

pub mod path_check;

pub mod robot;

pub mod planar_arm;

#[cfg(feature = "collisions")]
pub mod ball_obstacles;

/// Sampleable, testable, differentiable and projectable constraints.
pub mod constraint {
    pub mod capabilities;
    pub mod bounds;
    pub mod collision_free;
    pub mod combinators;
    pub mod frame;
    pub mod newton;
}

/// Trajectories and the tree planner.
pub mod path_plan {
    pub mod interpolator;
    pub mod metric;
    pub mod trajectory;
    pub mod crrt_connect;
}

/// Snap planner, fallback chaining and the planning façade.
pub mod planning {
    pub mod snap;
    pub mod fallback;
    pub mod sampling_planner;
    pub mod util;
}

#[cfg(test)]
#[cfg(feature = "collisions")]
mod tests;
