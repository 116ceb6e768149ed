//! Numerically estimated end-effector Jacobian and the damped least-squares step.

use crate::kinematic_traits::Kinematics;
use crate::utils::rotation_error;
use nalgebra::linalg::SVD;
use nalgebra::{DMatrix, DVector, Vector3, Vector6};
use rayon::prelude::*;

/// Struct representing the Jacobian matrix of a serial arm.
pub struct Jacobian {
    /// A 6xN matrix mapping joint velocities to end-effector velocities.
    /// Each column corresponds to a joint; rows 0..3 are the position
    /// sensitivity and rows 3..6 the orientation sensitivity (vector part of
    /// the quaternion difference).
    matrix: DMatrix<f64>,

    /// The disturbance value used for computing the Jacobian
    epsilon: f64,
}

impl Jacobian {
    /// Constructs a new Jacobian by finite-differencing the forward kinematics
    /// of the given arm around the given joint configuration.
    ///
    /// # Arguments
    ///
    /// * `kinematics` - the arm implementing the Kinematics trait
    /// * `joints` - the joint configuration to linearize around
    /// * `epsilon` - a small value used for numerical differentiation
    pub fn new(kinematics: &(impl Kinematics + Sync), joints: &[f64], epsilon: f64) -> Self {
        let matrix = compute_jacobian(kinematics, joints, epsilon);
        Self { matrix, epsilon }
    }

    /// Solves the damped least-squares normal equation
    /// `(JᵀJ + λI) Δq = Jᵀe` for the joint update `Δq`.
    ///
    /// The damping `λ` keeps the system well conditioned near singular
    /// configurations: for a degenerate Jacobian the damping term dominates
    /// and the update shrinks toward zero instead of blowing up.
    pub fn damped_least_squares(&self, error: &Vector6<f64>, damping: f64) -> DVector<f64> {
        let dof = self.matrix.ncols();
        let jt = self.matrix.transpose();
        let normal = &jt * &self.matrix + DMatrix::identity(dof, dof) * damping;
        let rhs = jt * error;

        if let Some(inverse) = normal.clone().try_inverse() {
            return inverse * &rhs;
        }
        // The damped normal matrix can only be singular through numeric
        // degeneracy; fall back to the pseudoinverse as with the plain
        // Jacobian inversion.
        match SVD::new(normal, true, true).pseudo_inverse(self.epsilon) {
            Ok(pseudoinverse) => pseudoinverse * rhs,
            Err(_) => DVector::zeros(dof),
        }
    }

    /// The underlying 6xN matrix.
    pub fn matrix(&self) -> &DMatrix<f64> {
        &self.matrix
    }
}

/// Computes the 6xN Jacobian for the given arm and joint configuration.
///
/// One joint at a time is perturbed by `epsilon`, the forward kinematics is
/// re-evaluated and the pose change is finite-differenced into one column.
/// The columns are independent and are computed in parallel.
pub fn compute_jacobian(
    kinematics: &(impl Kinematics + Sync),
    joints: &[f64],
    epsilon: f64,
) -> DMatrix<f64> {
    let dof = kinematics.dof();
    assert_eq!(joints.len(), dof, "joint configuration length does not match the chain");

    let current_pose = kinematics.forward(joints);
    let current_position = current_pose.translation.vector;
    let current_orientation = current_pose.rotation;

    // Parallelize the loop using rayon
    let jacobian_columns: Vec<(Vector3<f64>, Vector3<f64>)> = (0..dof)
        .into_par_iter()
        .map(|joint| {
            let mut perturbed_joints = joints.to_vec();
            perturbed_joints[joint] += epsilon;
            let perturbed_pose = kinematics.forward(&perturbed_joints);

            let delta_position = (perturbed_pose.translation.vector - current_position) / epsilon;
            let delta_orientation =
                rotation_error(&current_orientation, &perturbed_pose.rotation) / epsilon;

            (delta_position, delta_orientation)
        })
        .collect();

    let mut jacobian = DMatrix::zeros(6, dof);
    for (joint, (delta_position, delta_orientation)) in jacobian_columns.into_iter().enumerate() {
        jacobian
            .fixed_view_mut::<3, 1>(0, joint)
            .copy_from(&delta_position);
        jacobian
            .fixed_view_mut::<3, 1>(3, joint)
            .copy_from(&delta_orientation);
    }

    jacobian
}
