//! Serial-chain forward kinematics as a pure matrix chain multiplication.
//!
//! The chain is an explicit list of link transforms and revolute joint axes.
//! There is no shared mutable robot model and nothing to save or restore:
//! every evaluation works only on the supplied joint configuration.

use crate::kinematic_traits::{Kinematics, Pose};
use nalgebra::{Isometry3, Point3, Translation3, Unit, UnitQuaternion, Vector3};

/// One revolute link of the chain: a fixed transform from the parent joint
/// frame to this joint frame, and the rotation axis in this frame (the URDF
/// origin/axis convention).
#[derive(Clone, Debug)]
pub struct Link {
    /// Transform from the parent joint frame to this joint frame at zero angle.
    pub origin: Isometry3<f64>,
    /// Unit rotation axis of the revolute joint, in this joint's frame.
    pub axis: Unit<Vector3<f64>>,
}

impl Link {
    pub fn new(origin: Isometry3<f64>, axis: Unit<Vector3<f64>>) -> Self {
        Link { origin, axis }
    }

    /// Link displaced along the parent X axis, rotating about its local Z axis.
    /// This is the building block of planar test arms.
    pub fn planar(offset_x: f64) -> Self {
        Link {
            origin: Isometry3::from_parts(
                Translation3::new(offset_x, 0.0, 0.0),
                UnitQuaternion::identity(),
            ),
            axis: Vector3::z_axis(),
        }
    }
}

/// Kinematic chain of revolute links, evaluated base to tool.
#[derive(Clone, Debug)]
pub struct SerialChain {
    base: Isometry3<f64>,
    links: Vec<Link>,
    tool: Isometry3<f64>,
}

impl SerialChain {
    /// Creates a chain from the base transform, links and the transform from
    /// the last joint frame to the end effector. An empty chain is a
    /// programming error.
    pub fn new(base: Isometry3<f64>, links: Vec<Link>, tool: Isometry3<f64>) -> anyhow::Result<Self> {
        anyhow::ensure!(!links.is_empty(), "kinematic chain must have at least one link");
        Ok(SerialChain { base, links, tool })
    }

    /// Planar arm in the XY plane: all joints rotate about Z, consecutive
    /// links are straight segments of the given lengths. Mostly useful for
    /// tests, where forward kinematics can be verified by hand.
    pub fn planar(segment_lengths: &[f64]) -> anyhow::Result<Self> {
        anyhow::ensure!(
            !segment_lengths.is_empty(),
            "planar chain must have at least one segment"
        );
        let mut links = vec![Link::planar(0.0)];
        for &length in &segment_lengths[..segment_lengths.len() - 1] {
            links.push(Link::planar(length));
        }
        let tool = Isometry3::from_parts(
            Translation3::new(segment_lengths[segment_lengths.len() - 1], 0.0, 0.0),
            UnitQuaternion::identity(),
        );
        SerialChain::new(Isometry3::identity(), links, tool)
    }

    fn check_dof(&self, joints: &[f64]) {
        assert_eq!(
            joints.len(),
            self.links.len(),
            "joint configuration length does not match the chain"
        );
    }
}

impl Kinematics for SerialChain {
    fn forward(&self, joints: &[f64]) -> Pose {
        self.check_dof(joints);
        let mut transform = self.base;
        for (link, &angle) in self.links.iter().zip(joints) {
            transform = transform * link.origin * UnitQuaternion::from_axis_angle(&link.axis, angle);
        }
        transform * self.tool
    }

    fn frame_positions(&self, joints: &[f64]) -> Vec<Point3<f64>> {
        self.check_dof(joints);
        let mut positions = Vec::with_capacity(self.links.len() + 1);
        let mut transform = self.base;
        for (link, &angle) in self.links.iter().zip(joints) {
            transform *= link.origin;
            // The joint's own rotation does not move the frame origin.
            positions.push(Point3::from(transform.translation.vector));
            transform *= UnitQuaternion::from_axis_angle(&link.axis, angle);
        }
        positions.push(Point3::from((transform * self.tool).translation.vector));
        positions
    }

    fn dof(&self) -> usize {
        self.links.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::FRAC_PI_2;

    const EPSILON: f64 = 1e-9;

    #[test]
    fn planar_chain_stretched() {
        let chain = SerialChain::planar(&[1.0, 0.5]).unwrap();
        let pose = chain.forward(&[0.0, 0.0]);
        assert!((pose.translation.vector.x - 1.5).abs() < EPSILON);
        assert!(pose.translation.vector.y.abs() < EPSILON);
        assert!(pose.translation.vector.z.abs() < EPSILON);
    }

    #[test]
    fn planar_chain_elbow_up() {
        let chain = SerialChain::planar(&[1.0, 0.5]).unwrap();
        // First segment along X, second folded straight up.
        let pose = chain.forward(&[0.0, FRAC_PI_2]);
        assert!((pose.translation.vector.x - 1.0).abs() < EPSILON);
        assert!((pose.translation.vector.y - 0.5).abs() < EPSILON);
    }

    #[test]
    fn frame_positions_cover_every_joint_and_the_effector() {
        let chain = SerialChain::planar(&[1.0, 0.5]).unwrap();
        let frames = chain.frame_positions(&[FRAC_PI_2, 0.0]);
        assert_eq!(frames.len(), 3);
        // Base joint sits at the origin regardless of its rotation.
        assert!(frames[0].coords.norm() < EPSILON);
        // Second joint frame rotated to the Y axis.
        assert!((frames[1].y - 1.0).abs() < EPSILON);
        assert!(frames[1].x.abs() < EPSILON);
        // End effector at the chain tip.
        assert!((frames[2].y - 1.5).abs() < EPSILON);
    }

    #[test]
    fn empty_chain_is_rejected() {
        assert!(SerialChain::planar(&[]).is_err());
    }

    #[test]
    #[should_panic(expected = "joint configuration length")]
    fn mismatched_configuration_panics() {
        let chain = SerialChain::planar(&[1.0]).unwrap();
        chain.forward(&[0.0, 0.0]);
    }
}
