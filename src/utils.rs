//! Helper functions

use nalgebra::{UnitQuaternion, Vector3};

/// Euclidean distance between two joint configurations, all joints weighted
/// equally. Both the planner metric and the IK convergence checks use this.
pub fn joint_distance(a: &[f64], b: &[f64]) -> f64 {
    debug_assert_eq!(a.len(), b.len());
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f64>()
        .sqrt()
}

/// Rotation error from `current` to `target` as the vector part of the
/// difference quaternion. The difference is flipped into the hemisphere with a
/// non-negative scalar part first, so antipodal representations of the same
/// rotation do not produce a spurious large error.
pub fn rotation_error(current: &UnitQuaternion<f64>, target: &UnitQuaternion<f64>) -> Vector3<f64> {
    let difference = target * current.inverse();
    let difference = if difference.w < 0.0 {
        UnitQuaternion::from_quaternion(-difference.into_inner())
    } else {
        difference
    };
    difference.imag()
}

/// Print joint values, converting radians to degrees.
#[allow(dead_code)]
pub fn dump_joints(joints: &[f64]) {
    let mut row_str = String::new();
    for angle in joints {
        row_str.push_str(&format!("{:5.2} ", angle.to_degrees()));
    }
    println!("[{}]", row_str.trim_end());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distance_of_identical_configurations_is_zero() {
        assert_eq!(joint_distance(&[0.3, -0.7], &[0.3, -0.7]), 0.0);
    }

    #[test]
    fn distance_is_the_euclidean_norm() {
        assert!((joint_distance(&[0.0, 0.0], &[3.0, 4.0]) - 5.0).abs() < 1e-12);
    }

    #[test]
    fn rotation_error_is_zero_for_equal_rotations() {
        let q = UnitQuaternion::from_euler_angles(0.1, -0.2, 0.3);
        assert!(rotation_error(&q, &q).norm() < 1e-12);
    }

    #[test]
    fn rotation_error_ignores_quaternion_sign() {
        let q = UnitQuaternion::from_euler_angles(0.4, 0.0, -1.1);
        let negated = UnitQuaternion::from_quaternion(-q.into_inner());
        assert!(rotation_error(&q, &negated).norm() < 1e-12);
    }

    #[test]
    fn small_rotation_error_matches_half_angle() {
        // For a small rotation by angle a about Z the vector part is sin(a/2) * Z.
        let current = UnitQuaternion::identity();
        let target = UnitQuaternion::from_euler_angles(0.0, 0.0, 0.02);
        let error = rotation_error(&current, &target);
        assert!((error.z - (0.01_f64).sin()).abs() < 1e-9);
        assert!(error.x.abs() < 1e-12 && error.y.abs() < 1e-12);
    }
}
