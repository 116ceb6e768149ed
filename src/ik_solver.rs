//! Iterative Cartesian-to-joint solver based on damped least squares.
//!
//! The solver refines a joint configuration until the end effector reaches the
//! target pose or the iteration budget runs out. Non-convergence is not an
//! error: the best configuration found so far is returned together with the
//! residual errors, and the caller decides whether the result is acceptable.

use crate::constraints::JointLimits;
use crate::jacobian::Jacobian;
use crate::kinematic_traits::{Joints, Kinematics, Pose};
use crate::utils::rotation_error;
use nalgebra::Vector6;
use tracing::debug;

/// Default iteration budget of [`DlsIkSolver::solve`].
pub const DEFAULT_MAX_ITERS: usize = 50;
/// Default convergence tolerance for both error norms, in meters and radians.
pub const DEFAULT_TOLERANCE: f64 = 1e-3;
/// Default damping constant regularizing near-singular configurations.
pub const DEFAULT_DAMPING: f64 = 0.05;
/// Default joint perturbation for the numeric Jacobian.
pub const DEFAULT_EPSILON: f64 = 1e-3;

/// Outcome of one solver run. The configuration is always present, whether or
/// not convergence was reached; inspect `converged` and the residuals for a
/// hard guarantee.
#[derive(Clone, Debug)]
pub struct IkSolution {
    /// The last computed joint configuration, clamped to the joint limits.
    pub joints: Joints,
    /// Norm of the remaining Cartesian position error.
    pub position_error: f64,
    /// Norm of the remaining orientation error (quaternion difference vector part).
    pub orientation_error: f64,
    /// Iterations actually spent.
    pub iterations: usize,
    /// How many joint values had to be clamped to their limits over the run.
    pub clamped: usize,
    /// True if both residuals dropped below the tolerance within the budget.
    pub converged: bool,
}

/// Damped least-squares differential IK solver over a pure kinematic chain.
pub struct DlsIkSolver<K: Kinematics + Sync> {
    kinematics: K,
    limits: JointLimits,
    damping: f64,
    epsilon: f64,
}

impl<K: Kinematics + Sync> DlsIkSolver<K> {
    /// Creates the solver. The limits must match the chain dimensionality.
    pub fn new(kinematics: K, limits: JointLimits) -> anyhow::Result<Self> {
        anyhow::ensure!(
            kinematics.dof() == limits.dof(),
            "joint limits cover {} joints but the chain has {}",
            limits.dof(),
            kinematics.dof()
        );
        Ok(DlsIkSolver {
            kinematics,
            limits,
            damping: DEFAULT_DAMPING,
            epsilon: DEFAULT_EPSILON,
        })
    }

    /// Overrides the damping constant and the Jacobian perturbation.
    pub fn with_damping(mut self, damping: f64, epsilon: f64) -> Self {
        self.damping = damping;
        self.epsilon = epsilon;
        self
    }

    /// Solves for a joint configuration placing the end effector at `target`,
    /// starting the iteration from `initial`.
    ///
    /// Runs at most `max_iters` iterations and stops early once both the
    /// position and the orientation error norms are below `tolerance`. Joint
    /// updates violating the limits are clamped, not rejected.
    pub fn solve(
        &self,
        target: &Pose,
        initial: &[f64],
        max_iters: usize,
        tolerance: f64,
    ) -> anyhow::Result<IkSolution> {
        anyhow::ensure!(
            initial.len() == self.kinematics.dof(),
            "initial configuration has {} joints, the chain has {}",
            initial.len(),
            self.kinematics.dof()
        );

        let mut joints = initial.to_vec();
        let mut clamped_total = 0;

        for iteration in 0..=max_iters {
            let current = self.kinematics.forward(&joints);

            let position_error = target.translation.vector - current.translation.vector;
            let orientation_error = rotation_error(&current.rotation, &target.rotation);
            let position_norm = position_error.norm();
            let orientation_norm = orientation_error.norm();

            if position_norm < tolerance && orientation_norm < tolerance {
                debug!(iteration, position_norm, orientation_norm, "IK converged");
                return Ok(IkSolution {
                    joints,
                    position_error: position_norm,
                    orientation_error: orientation_norm,
                    iterations: iteration,
                    clamped: clamped_total,
                    converged: true,
                });
            }
            if iteration == max_iters {
                debug!(position_norm, orientation_norm, "IK exhausted the iteration budget");
                return Ok(IkSolution {
                    joints,
                    position_error: position_norm,
                    orientation_error: orientation_norm,
                    iterations: iteration,
                    clamped: clamped_total,
                    converged: false,
                });
            }

            let error = Vector6::new(
                position_error.x,
                position_error.y,
                position_error.z,
                orientation_error.x,
                orientation_error.y,
                orientation_error.z,
            );

            let jacobian = Jacobian::new(&self.kinematics, &joints, self.epsilon);
            let step = jacobian.damped_least_squares(&error, self.damping);

            for (joint, delta) in joints.iter_mut().zip(step.iter()) {
                *joint += delta;
            }
            clamped_total += self.limits.clamp(&mut joints);
        }

        unreachable!("the iteration loop always returns");
    }

    /// The joint limits this solver clamps against.
    pub fn limits(&self) -> &JointLimits {
        &self.limits
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
    use std::f64::consts::PI;

    fn planar_solver() -> DlsIkSolver<SerialChain> {
        let chain = SerialChain::planar(&[1.0, 1.0]).unwrap();
        let limits = JointLimits::symmetric(2, PI).unwrap();
        DlsIkSolver::new(chain, limits).unwrap()
    }

    #[test]
    fn solving_for_the_current_pose_is_idempotent() {
        let solver = planar_solver();
        let joints = vec![0.4, -0.9];
        let target = solver.kinematics().forward(&joints);

        let solution = solver
            .solve(&target, &joints, DEFAULT_MAX_ITERS, DEFAULT_TOLERANCE)
            .unwrap();
        assert!(solution.converged);
        assert_eq!(solution.iterations, 0);
        assert!(solution.position_error < 1e-9);
        assert!(solution.orientation_error < 1e-9);
    }

    #[test]
    fn reaches_a_feasible_pose() {
        let solver = planar_solver();
        // Target taken from a known configuration so that both position and
        // orientation are simultaneously reachable.
        let target = solver.kinematics().forward(&[0.7, -0.4]);

        let solution = solver.solve(&target, &[0.0, 0.1], 200, DEFAULT_TOLERANCE).unwrap();
        assert!(
            solution.position_error < 1e-2,
            "position residual too large: {}",
            solution.position_error
        );
        assert!(solver.limits().compliant(&solution.joints));
    }

    #[test]
    fn returned_configuration_respects_joint_limits() {
        let chain = SerialChain::planar(&[1.0, 1.0]).unwrap();
        let limits = JointLimits::symmetric(2, 0.5).unwrap();
        let solver = DlsIkSolver::new(chain, limits).unwrap();

        // Far outside the tight limits; the solver clamps rather than fails.
        let target = solver.kinematics().forward(&[2.5, 2.5]);
        let solution = solver.solve(&target, &[0.0, 0.0], 50, DEFAULT_TOLERANCE).unwrap();
        assert!(!solution.converged);
        assert!(solver.limits().compliant(&solution.joints));
    }

    #[test]
    fn exhaustion_still_returns_the_best_effort_configuration() {
        let solver = planar_solver();
        // Unreachable target far outside the arm's 2.0 reach.
        let target = Pose::translation(5.0, 0.0, 0.0);
        let solution = solver.solve(&target, &[0.0, 0.0], 30, DEFAULT_TOLERANCE).unwrap();
        assert!(!solution.converged);
        assert_eq!(solution.iterations, 30);
        assert_eq!(solution.joints.len(), 2);
        assert!(solution.position_error.is_finite());
    }

    #[test]
    fn mismatched_initial_configuration_is_a_hard_error() {
        let solver = planar_solver();
        let target = Pose::identity();
        assert!(solver.solve(&target, &[0.0], 10, DEFAULT_TOLERANCE).is_err());
    }
}
