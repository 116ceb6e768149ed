//! Static per-joint angle limits: compliance checks, clamping and uniform sampling.

use crate::kinematic_traits::Joints;
use rand::distributions::Uniform;
use rand::prelude::*;
use tracing::debug;

/// Per-joint `[lower, upper]` limit pairs, defined once at startup.
#[derive(Clone, Debug)]
pub struct JointLimits {
    lower: Vec<f64>,
    upper: Vec<f64>,
}

impl JointLimits {
    /// Creates the limits, checking they form a well-defined box. A malformed
    /// limit array is a programming error and is reported as a hard error.
    pub fn new(lower: Vec<f64>, upper: Vec<f64>) -> anyhow::Result<Self> {
        anyhow::ensure!(!lower.is_empty(), "joint limits must not be empty");
        anyhow::ensure!(
            lower.len() == upper.len(),
            "lower and upper limit arrays differ in length: {} vs {}",
            lower.len(),
            upper.len()
        );
        for (joint, (low, high)) in lower.iter().zip(&upper).enumerate() {
            anyhow::ensure!(
                low.is_finite() && high.is_finite() && low <= high,
                "invalid limit pair for joint {}: [{}, {}]",
                joint + 1,
                low,
                high
            );
        }
        Ok(JointLimits { lower, upper })
    }

    /// Symmetric limits, every joint within plus minus `bound` radians.
    pub fn symmetric(dof: usize, bound: f64) -> anyhow::Result<Self> {
        JointLimits::new(vec![-bound; dof], vec![bound; dof])
    }

    /// Limits of the Franka Panda reference arm (7 revolute joints).
    pub fn panda() -> Self {
        let lower = vec![-2.9671, -1.8326, -2.9671, -3.1416, -2.9671, -0.0873, -2.9671];
        let upper = vec![2.9671, 1.8326, 2.9671, 0.0, 2.9671, 3.8223, 2.9671];
        JointLimits { lower, upper }
    }

    pub fn dof(&self) -> usize {
        self.lower.len()
    }

    /// True if every joint angle lies within its limit pair.
    pub fn compliant(&self, angles: &[f64]) -> bool {
        angles.len() == self.dof()
            && angles
                .iter()
                .zip(self.lower.iter().zip(&self.upper))
                .all(|(angle, (low, high))| angle >= low && angle <= high)
    }

    /// Clamps every out-of-range joint to its nearest limit, in place.
    /// Returns the number of joints that had to be clamped; each clamp is
    /// also reported as a debug event.
    pub fn clamp(&self, angles: &mut [f64]) -> usize {
        let mut clamped = 0;
        for (joint, angle) in angles.iter_mut().enumerate() {
            let (low, high) = (self.lower[joint], self.upper[joint]);
            if *angle < low {
                debug!(joint = joint + 1, angle = *angle, limit = low, "joint below lower limit, clamped");
                *angle = low;
                clamped += 1;
            } else if *angle > high {
                debug!(joint = joint + 1, angle = *angle, limit = high, "joint above upper limit, clamped");
                *angle = high;
                clamped += 1;
            }
        }
        clamped
    }

    /// Uniformly random joint configuration within the limits.
    pub fn random_angles(&self, rng: &mut impl Rng) -> Joints {
        self.lower
            .iter()
            .zip(&self.upper)
            .map(|(&low, &high)| {
                if low == high {
                    low
                } else {
                    Uniform::new_inclusive(low, high).sample(rng)
                }
            })
            .collect()
    }
}
