//! Collision detection of a planar arm against spherical obstacles.

use nalgebra::{Isometry3, Point3};
use parry3d::query::PointQuery;
use parry3d::shape::Capsule;
use rayon::prelude::*;

use crate::constraint::collision_free::{CollisionDetector, CollisionPair};
use crate::kinematic_traits::Configuration;
use crate::planar_arm::PlanarArm;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ball {
    pub center: Point3<f64>,
    pub radius: f64,
}

/// Links of the arm are capsules of `link_radius` around the segments between joints,
/// queried in parry's f32 precision. A link collides with a ball if the ball center is closer than the ball radius.
#[derive(Debug, Clone)]
pub struct BallObstacles {
    arm: PlanarArm,
    link_radius: f64,
    balls: Vec<Ball>,
}

impl BallObstacles {
    pub fn new(arm: PlanarArm, link_radius: f64) -> Self {
        Self { arm, link_radius, balls: Vec::new() }
    }

    pub fn with_ball(mut self, center: Point3<f64>, radius: f64) -> Self {
        self.balls.push(Ball { center, radius });
        self
    }

    pub fn balls(&self) -> &[Ball] {
        &self.balls
    }

    fn links(&self, qs: &Configuration) -> Vec<Capsule> {
        let joints = self.arm.joint_positions(qs);
        joints
            .windows(2)
            .map(|pair| {
                Capsule::new(
                    Point3::from(pair[0]).cast::<f32>(),
                    Point3::from(pair[1]).cast::<f32>(),
                    self.link_radius as f32,
                )
            })
            .collect()
    }

    fn touches(link: &Capsule, ball: &Ball) -> bool {
        link.distance_to_point(&Isometry3::identity(), &ball.center.cast::<f32>(), true) < ball.radius as f32
    }
}

impl CollisionDetector for BallObstacles {
    fn collides(&self, qs: &Configuration) -> bool {
        let links = self.links(qs);
        links
            .par_iter()
            .any(|link| self.balls.iter().any(|ball| Self::touches(link, ball)))
    }

    fn collision_details(&self, qs: &Configuration) -> Vec<CollisionPair> {
        let links = self.links(qs);
        let mut pairs = Vec::new();
        for (link_index, link) in links.iter().enumerate() {
            for (ball_index, ball) in self.balls.iter().enumerate() {
                if Self::touches(link, ball) {
                    pairs.push(CollisionPair { link: link_index, other: ball_index });
                }
            }
        }
        pairs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    fn config(values: &[f64]) -> Configuration {
        Configuration::from_column_slice(values)
    }

    #[test]
    fn test_ball_on_second_link() {
        let obstacles = BallObstacles::new(PlanarArm::new(vec![1.0, 1.0]), 0.05)
            .with_ball(Point3::new(1.0, 0.5, 0.0), 0.1);
        assert!(!obstacles.collides(&config(&[0.0, 0.0])));
        assert!(obstacles.collides(&config(&[0.0, PI / 2.0])));
        assert_eq!(
            obstacles.collision_details(&config(&[0.0, PI / 2.0])),
            vec![CollisionPair { link: 1, other: 0 }]
        );
        assert!(obstacles.collision_details(&config(&[0.0, 0.0])).is_empty());
    }

    #[test]
    fn test_link_radius_counts() {
        let obstacles = BallObstacles::new(PlanarArm::new(vec![1.0]), 0.2)
            .with_ball(Point3::new(0.5, 0.25, 0.0), 0.1);
        assert!(obstacles.collides(&config(&[0.0])));
        assert!(!obstacles.collides(&config(&[PI])));
    }
}
