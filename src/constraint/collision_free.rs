use std::sync::Arc;

use crate::constraint::capabilities::Testable;
use crate::kinematic_traits::Configuration;

/// Pair of bodies found in collision: index of the robot link and index of the
/// obstacle (or of the other link for self collisions).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollisionPair {
    pub link: usize,
    pub other: usize,
}

/// A trait for detecting collisions of the robot in the given joint configuration.
///
/// # Requirements
/// - Implementations of this trait must be `Send` and `Sync` for concurrent safety.
pub trait CollisionDetector: Send + Sync {
    /// Checks whether the given joint configuration results in any collisions.
    ///
    /// # Returns
    /// * `true` if a collision occurs, otherwise `false`.
    fn collides(&self, qs: &Configuration) -> bool;

    /// Provides detailed information about which bodies are involved in collisions.
    /// Some algorithms may return only one pair even if multiple collide.
    /// If no collisions are detected, an empty vector is returned.
    fn collision_details(&self, qs: &Configuration) -> Vec<CollisionPair>;
}

/// Testable that is satisfied by collision free configurations.
pub struct CollisionFree {
    detector: Arc<dyn CollisionDetector>,
}

impl CollisionFree {
    pub fn new(detector: Arc<dyn CollisionDetector>) -> Self {
        Self { detector }
    }
}

impl Testable for CollisionFree {
    fn is_satisfied(&self, qs: &Configuration) -> bool {
        !self.detector.collides(qs)
    }
}
