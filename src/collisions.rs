//! Joint-configuration validity: table height and sphere-obstacle proximity.

use crate::kinematic_traits::Kinematics;
use crate::obstacles::ObstacleSource;
use std::sync::Arc;

/// Safety margin added to every obstacle radius, in meters.
pub const DEFAULT_SAFETY_MARGIN: f64 = 0.05;
/// Margin above the base height below which the end effector may not drop.
pub const DEFAULT_HEIGHT_MARGIN: f64 = 0.01;

/// Composite validity predicate shared by the IK consumers and the planner.
///
/// A configuration is valid when the end effector stays above the table and
/// no representative chain frame comes closer to an obstacle center than the
/// obstacle radius plus the safety margin. The check is pure: kinematics are
/// evaluated against the stateless chain, never against a live robot.
pub struct ValidityChecker<K: Kinematics> {
    kinematics: K,
    obstacles: Arc<dyn ObstacleSource>,
    min_ee_height: f64,
    safety_margin: f64,
}

impl<K: Kinematics> ValidityChecker<K> {
    /// Creates the checker with the default margins. `base_height` is the
    /// world Z coordinate of the robot base, which doubles as the table level.
    pub fn new(kinematics: K, obstacles: Arc<dyn ObstacleSource>, base_height: f64) -> Self {
        ValidityChecker {
            kinematics,
            obstacles,
            min_ee_height: base_height + DEFAULT_HEIGHT_MARGIN,
            safety_margin: DEFAULT_SAFETY_MARGIN,
        }
    }

    /// Overrides the minimum end-effector height and the safety margin.
    pub fn with_margins(mut self, min_ee_height: f64, safety_margin: f64) -> Self {
        self.min_ee_height = min_ee_height;
        self.safety_margin = safety_margin;
        self
    }

    /// True when the configuration passes both the height and the proximity check.
    pub fn is_valid(&self, joints: &[f64]) -> bool {
        self.height_ok(joints) && self.clear_of_obstacles(joints)
    }

    fn height_ok(&self, joints: &[f64]) -> bool {
        self.kinematics.forward(joints).translation.vector.z > self.min_ee_height
    }

    fn clear_of_obstacles(&self, joints: &[f64]) -> bool {
        // One snapshot per check; a concurrent perception update replaces the
        // list wholesale and is picked up by the next check.
        let obstacles = self.obstacles.snapshot();
        if obstacles.is_empty() {
            return true;
        }

        let frames = self.kinematics.frame_positions(joints);
        for frame in &frames {
            for obstacle in &obstacles {
                let clearance = obstacle.radius + self.safety_margin;
                if (frame - obstacle.center).norm_squared() < clearance * clearance {
                    return false;
                }
            }
        }
        true
    }

    /// The underlying kinematic chain.
    pub fn kinematics(&self) -> &K {
        &self.kinematics
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kinematics_impl::SerialChain;
    use crate::obstacles::{Obstacle, SharedObstacles, StaticObstacles};
    use nalgebra::Point3;
    use std::f64::consts::FRAC_PI_2;

    /// Planar arm lifted so the default table check does not interfere:
    /// the chain operates in the plane z = 0 with the base at z = -1.
    fn checker_with(obstacles: Arc<dyn ObstacleSource>) -> ValidityChecker<SerialChain> {
        let chain = SerialChain::planar(&[1.0, 1.0]).unwrap();
        ValidityChecker::new(chain, obstacles, -1.0)
    }

    #[test]
    fn empty_obstacle_field_passes() {
        let checker = checker_with(Arc::new(StaticObstacles::empty()));
        assert!(checker.is_valid(&[0.3, -0.8]));
    }

    #[test]
    fn obstacle_at_the_effector_invalidates() {
        // Effector tip of the stretched arm sits at (2, 0, 0).
        let obstacles = StaticObstacles::new(vec![Obstacle::new(Point3::new(2.0, 0.0, 0.0), 0.1)]);
        let checker = checker_with(Arc::new(obstacles));
        assert!(!checker.is_valid(&[0.0, 0.0]));
        // Folding the elbow up moves the tip away from the obstacle.
        assert!(checker.is_valid(&[0.0, FRAC_PI_2]));
    }

    #[test]
    fn safety_margin_extends_the_obstacle() {
        // Obstacle surface 0.04 m from the tip: inside the 0.05 m margin.
        let obstacles = StaticObstacles::new(vec![Obstacle::new(Point3::new(2.24, 0.0, 0.0), 0.2)]);
        let checker = checker_with(Arc::new(obstacles));
        assert!(!checker.is_valid(&[0.0, 0.0]));
    }

    #[test]
    fn intermediate_joint_frames_are_checked_too() {
        // Obstacle swallowing the elbow at (1, 0, 0), far from the tip.
        let obstacles = StaticObstacles::new(vec![Obstacle::new(Point3::new(1.0, 0.0, 0.0), 0.1)]);
        let checker = checker_with(Arc::new(obstacles));
        assert!(!checker.is_valid(&[0.0, FRAC_PI_2]));
    }

    #[test]
    fn effector_below_the_table_invalidates() {
        let chain = SerialChain::planar(&[1.0, 1.0]).unwrap();
        // Base level at 0.0; the planar arm lives at z = 0, below the margin.
        let checker = ValidityChecker::new(chain, Arc::new(StaticObstacles::empty()), 0.0);
        assert!(!checker.is_valid(&[0.0, 0.0]));
    }

    #[test]
    fn replaced_obstacles_take_effect_on_the_next_check() {
        let shared = SharedObstacles::new();
        let checker = checker_with(Arc::new(shared.clone()));
        assert!(checker.is_valid(&[0.0, 0.0]));

        shared.replace(vec![Obstacle::new(Point3::new(2.0, 0.0, 0.0), 0.3)]);
        assert!(!checker.is_valid(&[0.0, 0.0]));
    }
}
