extern crate nalgebra as na;

use na::{Isometry3, Point3};

/// Pose of the robot end effector. It contains both Cartesian position and rotation quaternion
/// ```
/// extern crate nalgebra as na;
/// use na::{Isometry3, Translation3, UnitQuaternion};
///
/// type Pose = Isometry3<f64>;
///
/// let translation = Translation3::new(1.0, 0.0, 0.0);
/// // The quaternion should be normalized to represent a valid rotation.
/// let rotation = UnitQuaternion::from_quaternion(na::Quaternion::new(1.0, 0.0, 0.0, 1.0).normalize());
/// let transform = Pose::from_parts(translation, rotation);
/// ```
pub type Pose = Isometry3<f64>;

/// Joint configuration of the arm, one angle in radians per actuated revolute joint.
/// The number of joints is not fixed by this library; the reference arm has 7.
pub type Joints = Vec<f64>;

/// Forward kinematics of a serial arm. Implementations must be pure: evaluating
/// a hypothetical configuration must not disturb any externally observable
/// robot state, so both the IK solver and the validity checker can probe
/// configurations freely while the real arm is displayed or controlled.
pub trait Kinematics {
    /// Pose of the end effector for the given joint configuration.
    ///
    /// Panics if the configuration length does not match [`Kinematics::dof`];
    /// passing a mismatched configuration is a programming error.
    fn forward(&self, joints: &[f64]) -> Pose;

    /// World positions of the representative frames used for proximity checks:
    /// the origin of every joint frame along the chain, followed by the end
    /// effector. Same dimensionality contract as [`Kinematics::forward`].
    fn frame_positions(&self, joints: &[f64]) -> Vec<Point3<f64>>;

    /// Number of actuated joints.
    fn dof(&self) -> usize;
}
