//! Differential inverse kinematics and RRT* path planning for serial robotic
//! arms moving among dynamic, sphere-approximated obstacles.
//!
//! The crate pairs two tightly coupled components: a damped least-squares
//! differential IK solver that maps Cartesian targets to joint configurations,
//! and an RRT* sampling planner that searches joint space for obstacle-avoiding
//! paths, incrementally improving path cost through rewiring. Both consult the
//! same forward kinematics and the same validity semantics (joint limits,
//! table height, obstacle clearance), so a configuration the solver accepts is
//! also one the planner may route through.
//!
//! Forward kinematics is a pure matrix chain multiplication over an explicit
//! list of link transforms and joint axes. There is no shared mutable robot
//! model: hypothetical configurations can be evaluated at any time without
//! disturbing whatever is concurrently displayed or controlled.
//!
//! # Features
//!
//! - Arbitrary serial chains of revolute joints (the reference arm has 7).
//! - Numeric 6xN Jacobian with rayon-parallel columns; damped least squares
//!   keeps updates bounded near singular configurations.
//! - Joint limits are clamped during IK, never violated in returned results.
//! - The planner degrades gracefully: an exhausted iteration budget returns
//!   the path to the closest approach rather than failing.
//! - Obstacle snapshots are replaced wholesale, so validity checks never see
//!   a partially updated scene.
//! - Planner paths are densely interpolated into executable trajectories.

pub mod kinematic_traits;
pub mod kinematics_impl;

pub mod constraints;

pub mod jacobian;
pub mod ik_solver;

pub mod obstacles;
pub mod collisions;

#[path = "path_plan/rrt_star.rs"]
pub mod rrt_star;

#[path = "path_plan/interpolator.rs"]
pub mod interpolator;

pub mod motion;

pub mod utils;
