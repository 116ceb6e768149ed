//! High-level facade wiring the chain, limits, obstacles, IK solver and the
//! planner together: resolve a Cartesian target to a goal configuration, plan
//! a collision-free joint path toward it and interpolate the result for
//! execution.

use crate::collisions::ValidityChecker;
use crate::constraints::JointLimits;
use crate::ik_solver::{DlsIkSolver, IkSolution, DEFAULT_MAX_ITERS, DEFAULT_TOLERANCE};
use crate::kinematic_traits::{Joints, Kinematics, Pose};
use crate::kinematics_impl::SerialChain;
use crate::obstacles::ObstacleSource;
use crate::interpolator::{interpolate_path, DEFAULT_STEPS_PER_SEGMENT};
use crate::rrt_star::{PlannedPath, RrtStarPlanner};
use std::sync::Arc;
use tracing::debug;

/// Everything produced for one Cartesian relocation request.
#[derive(Clone, Debug)]
pub struct MotionPlan {
    /// IK resolution of the target pose, including residuals.
    pub goal: IkSolution,
    /// The planner result toward the resolved goal configuration.
    pub planned: PlannedPath,
    /// Densely interpolated trajectory ready for execution.
    pub trajectory: Vec<Joints>,
}

/// Motion planner for one arm: owns the shared validity semantics so the IK
/// solver and the path planner agree on joint limits and collision checks.
pub struct MotionPlanner {
    solver: DlsIkSolver<SerialChain>,
    checker: ValidityChecker<SerialChain>,
    limits: JointLimits,
    /// Planner parameters; adjust before planning if the defaults do not fit.
    pub rrt: RrtStarPlanner,
    /// Interpolation density of the returned trajectories.
    pub steps_per_segment: usize,
}

impl MotionPlanner {
    /// Creates the planner. `base_height` is the world Z level of the robot
    /// base, used as the table height for the validity checker.
    pub fn new(
        chain: SerialChain,
        limits: JointLimits,
        obstacles: Arc<dyn ObstacleSource>,
        base_height: f64,
    ) -> anyhow::Result<Self> {
        anyhow::ensure!(
            chain.dof() == limits.dof(),
            "joint limits cover {} joints but the chain has {}",
            limits.dof(),
            chain.dof()
        );
        let checker = ValidityChecker::new(chain.clone(), obstacles, base_height);
        let solver = DlsIkSolver::new(chain, limits.clone())?;
        Ok(MotionPlanner {
            solver,
            checker,
            limits,
            rrt: RrtStarPlanner::default(),
            steps_per_segment: DEFAULT_STEPS_PER_SEGMENT,
        })
    }

    /// Resolves a Cartesian target pose to a joint configuration, starting
    /// from `initial`. Non-convergence is reported through the solution
    /// residuals, not as an error.
    pub fn solve_ik(&self, target: &Pose, initial: &[f64]) -> anyhow::Result<IkSolution> {
        self.solver.solve(target, initial, DEFAULT_MAX_ITERS, DEFAULT_TOLERANCE)
    }

    /// Plans a collision-free joint-space path from `start` to `goal`.
    pub fn plan_path(&self, start: &[f64], goal: &[f64]) -> anyhow::Result<PlannedPath> {
        self.rrt
            .plan(start, goal, &self.limits, |joints| self.checker.is_valid(joints))
    }

    /// Interpolates a waypoint path into an executable trajectory.
    pub fn smooth_trajectory(&self, path: &[Joints]) -> Vec<Joints> {
        interpolate_path(path, self.steps_per_segment)
    }

    /// Full relocation pipeline: IK to a goal configuration, RRT* toward it,
    /// dense interpolation of the resulting path.
    pub fn plan_to_pose(&self, current: &[f64], target: &Pose) -> anyhow::Result<MotionPlan> {
        let goal = self.solve_ik(target, current)?;
        debug!(
            converged = goal.converged,
            position_error = goal.position_error,
            "IK goal resolved"
        );
        let planned = self.plan_path(current, &goal.joints)?;
        let trajectory = self.smooth_trajectory(&planned.path);
        Ok(MotionPlan { goal, planned, trajectory })
    }

    /// The shared validity predicate, also usable standalone.
    pub fn is_valid(&self, joints: &[f64]) -> bool {
        self.checker.is_valid(joints)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::obstacles::{Obstacle, StaticObstacles};
    use crate::utils::joint_distance;
    use nalgebra::Point3;
    use std::f64::consts::PI;

    fn planar_planner(obstacles: Arc<dyn ObstacleSource>) -> MotionPlanner {
        let chain = SerialChain::planar(&[1.0, 1.0]).unwrap();
        let limits = JointLimits::symmetric(2, PI).unwrap();
        let mut planner = MotionPlanner::new(chain, limits, obstacles, -1.0).unwrap();
        planner.rrt.seed = Some(17);
        planner
    }

    #[test]
    fn full_pipeline_reaches_a_cartesian_target() {
        let planner = planar_planner(Arc::new(StaticObstacles::empty()));
        let target_joints = vec![0.9, -0.6];
        let target = planner.solver.kinematics().forward(&target_joints);

        let plan = planner.plan_to_pose(&[0.0, 0.1], &target).unwrap();
        assert!(plan.goal.position_error < 1e-2);
        assert!(plan.planned.goal_reached);
        // Trajectory endpoints match the planned path.
        assert_eq!(plan.trajectory.first().unwrap(), &plan.planned.path[0]);
        assert_eq!(
            plan.trajectory.last().unwrap(),
            plan.planned.path.last().unwrap()
        );
    }

    #[test]
    fn planned_paths_avoid_obstacles() {
        // Sphere sitting on the stretched-arm tip position.
        let obstacles = StaticObstacles::new(vec![Obstacle::new(Point3::new(2.0, 0.0, 0.0), 0.2)]);
        let planner = planar_planner(Arc::new(obstacles));

        let start = vec![0.8, 0.3];
        let goal = vec![-0.8, 0.3];
        let result = planner.plan_path(&start, &goal).unwrap();
        for waypoint in &result.path {
            assert!(planner.is_valid(waypoint), "invalid waypoint {waypoint:?}");
        }
    }

    #[test]
    fn goal_near_start_is_trivially_planned() {
        let planner = planar_planner(Arc::new(StaticObstacles::empty()));
        let start = vec![0.2, 0.2];
        let goal = vec![0.25, 0.2];
        let result = planner.plan_path(&start, &goal).unwrap();
        assert!(result.goal_reached);
        assert!(joint_distance(result.path.last().unwrap(), &goal) < planner.rrt.goal_threshold);
    }

    #[test]
    fn mismatched_chain_and_limits_are_rejected() {
        let chain = SerialChain::planar(&[1.0, 1.0]).unwrap();
        let limits = JointLimits::symmetric(3, PI).unwrap();
        assert!(
            MotionPlanner::new(chain, limits, Arc::new(StaticObstacles::empty()), 0.0).is_err()
        );
    }
}
