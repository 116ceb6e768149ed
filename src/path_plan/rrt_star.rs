//! RRT* planner over joint space.
//!
//! The tree is a flat vector of nodes with parent indices; rewiring changes
//! only a parent pointer and a cost, nodes are never deleted. A kd-tree over
//! the same vertices serves the nearest-node and near-radius queries, keeping
//! per-iteration cost sub-quadratic as the tree grows.

use crate::constraints::JointLimits;
use crate::kinematic_traits::Joints;
use crate::utils::joint_distance;
use kdtree::distance::squared_euclidean;
use rand::prelude::*;
use rand::rngs::StdRng;
use tracing::{debug, warn};

/// Two configurations closer than this are treated as the same vertex.
const COINCIDENT: f64 = 1e-6;

/// Result of a planning run. Planning never hard-fails: when the goal is not
/// reached within the iteration budget, the path leads to the tree node
/// closest to the goal and `goal_reached` is false. Callers decide whether
/// the degraded result is acceptable.
#[derive(Clone, Debug)]
pub struct PlannedPath {
    /// Joint configurations from the start to the terminal node.
    pub path: Vec<Joints>,
    /// Accumulated joint-space cost of the terminal node.
    pub cost: f64,
    /// True when the terminal node is within the goal threshold.
    pub goal_reached: bool,
    /// Planner iterations actually spent.
    pub iterations: usize,
}

/// Defines the RRT* planner that relocates the arm between two joint
/// configurations in a collision-free way, incrementally improving path cost
/// through rewiring.
#[derive(Clone, Debug)]
pub struct RrtStarPlanner {
    /// Iteration budget of one planning run; reasonable values are in order
    /// 1000 ... 4000.
    pub max_iterations: usize,

    /// Maximum extension step in joint space (radians, Euclidean over the
    /// joint vector). Small enough steps keep the validity checks honest
    /// while the arm moves between checked configurations.
    pub step_size: f64,

    /// Probability of sampling the goal configuration instead of a uniform
    /// random one.
    pub goal_sample_rate: f64,

    /// Radius of the near-set query used for parent selection and rewiring.
    pub search_radius: f64,

    /// Joint-space distance at which the goal counts as reached.
    pub goal_threshold: f64,

    /// How many times to retry sampling before giving up on finding a valid
    /// random configuration and handing out an unchecked one.
    pub sample_retries: usize,

    /// Fixed RNG seed for reproducible runs; `None` seeds from entropy.
    pub seed: Option<u64>,
}

impl Default for RrtStarPlanner {
    fn default() -> Self {
        Self {
            max_iterations: 1000,
            step_size: 0.2,
            goal_sample_rate: 0.05,
            search_radius: 0.5,
            goal_threshold: 0.1,
            sample_retries: 50,
            seed: None,
        }
    }
}

/// Node of the search tree. Append-only; rewiring mutates parent and cost.
#[derive(Clone, Debug)]
struct Node {
    joints: Joints,
    cost: f64,
    parent: Option<usize>,
}

/// The tree itself: vertices plus the spatial index over them.
struct Tree {
    nodes: Vec<Node>,
    kdtree: kdtree::KdTree<f64, usize, Vec<f64>>,
}

impl Tree {
    fn new(dimension: usize, root: Joints) -> Self {
        let mut tree = Tree {
            nodes: Vec::new(),
            kdtree: kdtree::KdTree::new(dimension),
        };
        tree.add(root, 0.0, None);
        tree
    }

    fn add(&mut self, joints: Joints, cost: f64, parent: Option<usize>) -> usize {
        let index = self.nodes.len();
        self.kdtree.add(joints.clone(), index).unwrap();
        self.nodes.push(Node { joints, cost, parent });
        index
    }

    fn nearest(&self, joints: &[f64]) -> usize {
        *self.kdtree.nearest(joints, 1, &squared_euclidean).unwrap()[0].1
    }

    /// Indices of all vertices within `radius` of the query, first-found
    /// (insertion) order preserved for deterministic tie-breaks.
    fn near(&self, joints: &[f64], radius: f64) -> Vec<usize> {
        let mut indices: Vec<usize> = self
            .kdtree
            .within(joints, radius * radius, &squared_euclidean)
            .unwrap()
            .into_iter()
            .map(|(_, &index)| index)
            .collect();
        indices.sort_unstable();
        indices
    }

    /// Reparents `index` onto `new_parent` with the strictly lower `new_cost`
    /// and propagates the improvement to all descendants, so every recorded
    /// cost stays equal to `cost(parent) + dist(parent, node)`.
    fn reparent(&mut self, index: usize, new_parent: usize, new_cost: f64) {
        let improvement = self.nodes[index].cost - new_cost;
        debug_assert!(improvement > 0.0);
        self.nodes[index].parent = Some(new_parent);
        self.nodes[index].cost = new_cost;

        let mut pending = vec![index];
        while let Some(ancestor) = pending.pop() {
            for child in 0..self.nodes.len() {
                if self.nodes[child].parent == Some(ancestor) && child != index {
                    self.nodes[child].cost -= improvement;
                    pending.push(child);
                }
            }
        }
    }

    /// Walks parent pointers from `index` back to the root and reverses,
    /// producing the start-to-terminal path. Rewiring preserves acyclicity
    /// (a node is only ever reparented onto a strictly cheaper route), so
    /// the walk always terminates.
    fn path_to_root(&self, index: usize) -> Vec<Joints> {
        let mut path = Vec::new();
        let mut current = Some(index);
        while let Some(node) = current {
            path.push(self.nodes[node].joints.clone());
            current = self.nodes[node].parent;
        }
        path.reverse();
        path
    }

}

impl RrtStarPlanner {
    /// Plans a path from `start` to `goal`, sampling within `limits` and
    /// accepting only configurations for which `is_valid` holds.
    ///
    /// Degraded outcomes (goal unreached, sampling exhaustion, parentless
    /// candidates) never abort the run; only mismatched dimensionality is a
    /// hard error.
    pub fn plan(
        &self,
        start: &[f64],
        goal: &[f64],
        limits: &JointLimits,
        mut is_valid: impl FnMut(&[f64]) -> bool,
    ) -> anyhow::Result<PlannedPath> {
        let dimension = limits.dof();
        anyhow::ensure!(
            start.len() == dimension && goal.len() == dimension,
            "start ({}) and goal ({}) must match the joint limits ({})",
            start.len(),
            goal.len(),
            dimension
        );

        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        if !is_valid(start) {
            warn!("start configuration is not valid; planning from it anyway");
        }

        let mut tree = Tree::new(dimension, start.to_vec());

        // A start already within the threshold needs no search at all; the
        // steering guards would otherwise drop every goal-biased sample and
        // leave success to a lucky uniform draw.
        if joint_distance(start, goal) < self.goal_threshold {
            let terminal = self.attach_goal(&mut tree, 0, goal, &[], &mut is_valid);
            debug!(cost = tree.nodes[terminal].cost, "goal within threshold of the start");
            return Ok(PlannedPath {
                path: tree.path_to_root(terminal),
                cost: tree.nodes[terminal].cost,
                goal_reached: true,
                iterations: 0,
            });
        }

        for iteration in 0..self.max_iterations {
            let sample = if rng.gen_range(0.0..1.0) < self.goal_sample_rate {
                goal.to_vec()
            } else {
                self.sample_valid(limits, &mut is_valid, &mut rng)
            };

            let nearest = tree.nearest(&sample);
            let candidate = match self.steer(&tree.nodes[nearest].joints, &sample, &mut is_valid) {
                Some(candidate) => candidate,
                // Blocked or zero-length extension grows nothing this round.
                None => continue,
            };

            let near = tree.near(&candidate, self.search_radius);

            // Choose the parent minimizing cost-from-start plus the edge to
            // the candidate. The candidate itself is already known valid;
            // with an empty near set the iteration is dropped entirely.
            let mut best: Option<(usize, f64)> = None;
            for &neighbor in &near {
                let cost = tree.nodes[neighbor].cost
                    + joint_distance(&tree.nodes[neighbor].joints, &candidate);
                if best.map_or(true, |(_, best_cost)| cost < best_cost) {
                    best = Some((neighbor, cost));
                }
            }
            let Some((parent, cost)) = best else { continue };

            let new_index = tree.add(candidate.clone(), cost, Some(parent));
            self.rewire(&mut tree, new_index, &near);

            if joint_distance(&candidate, goal) < self.goal_threshold {
                let terminal = self.attach_goal(&mut tree, new_index, goal, &near, &mut is_valid);
                debug!(iteration, cost = tree.nodes[terminal].cost, "goal reached");
                return Ok(PlannedPath {
                    path: tree.path_to_root(terminal),
                    cost: tree.nodes[terminal].cost,
                    goal_reached: true,
                    iterations: iteration + 1,
                });
            }
        }

        // Iteration budget exhausted: degrade to the node closest to the
        // goal rather than failing.
        let closest = tree.nearest(goal);
        let distance = joint_distance(&tree.nodes[closest].joints, goal);
        debug!(distance, "iteration budget exhausted, returning the closest approach");
        Ok(PlannedPath {
            path: tree.path_to_root(closest),
            cost: tree.nodes[closest].cost,
            goal_reached: distance < self.goal_threshold,
            iterations: self.max_iterations,
        })
    }

    /// Uniform sample within the limits, retried against the validity check.
    /// After the retry budget the last unchecked sample is handed out; the
    /// candidate it steers to is validated separately anyway.
    fn sample_valid(
        &self,
        limits: &JointLimits,
        is_valid: &mut impl FnMut(&[f64]) -> bool,
        rng: &mut StdRng,
    ) -> Joints {
        for _ in 0..self.sample_retries {
            let sample = limits.random_angles(rng);
            if is_valid(&sample) {
                return sample;
            }
        }
        debug!("no valid sample within the retry budget, using an unchecked one");
        limits.random_angles(rng)
    }

    /// Moves from `from` toward `to` by at most the step size. Returns the
    /// candidate only when it is itself valid and actually moves the tree;
    /// otherwise the growth attempt is a no-op.
    fn steer(
        &self,
        from: &[f64],
        to: &[f64],
        is_valid: &mut impl FnMut(&[f64]) -> bool,
    ) -> Option<Joints> {
        let distance = joint_distance(from, to);
        if distance < COINCIDENT {
            return None;
        }
        let candidate: Joints = if distance < self.step_size {
            to.to_vec()
        } else {
            from.iter()
                .zip(to)
                .map(|(f, t)| f + (t - f) * self.step_size / distance)
                .collect()
        };
        if is_valid(&candidate) { Some(candidate) } else { None }
    }

    /// Reroutes every near neighbor through the new node when that strictly
    /// reduces its cost.
    fn rewire(&self, tree: &mut Tree, new_index: usize, near: &[usize]) {
        let new_cost = tree.nodes[new_index].cost;
        for &neighbor in near {
            if Some(neighbor) == tree.nodes[new_index].parent {
                continue;
            }
            let through_new =
                new_cost + joint_distance(&tree.nodes[new_index].joints, &tree.nodes[neighbor].joints);
            if through_new < tree.nodes[neighbor].cost {
                debug!(neighbor, through_new, "rewired through the new node");
                tree.reparent(neighbor, new_index, through_new);
            }
        }
    }

    /// Attaches the exact goal configuration as a child of the node that came
    /// within the threshold, unless they coincide or the goal itself fails
    /// the validity check.
    fn attach_goal(
        &self,
        tree: &mut Tree,
        near_goal_index: usize,
        goal: &[f64],
        near: &[usize],
        is_valid: &mut impl FnMut(&[f64]) -> bool,
    ) -> usize {
        let gap = joint_distance(&tree.nodes[near_goal_index].joints, goal);
        if gap < COINCIDENT || !is_valid(goal) {
            return near_goal_index;
        }
        let cost = tree.nodes[near_goal_index].cost + gap;
        let goal_index = tree.add(goal.to_vec(), cost, Some(near_goal_index));
        self.rewire(tree, goal_index, near);
        goal_index
    }
}
