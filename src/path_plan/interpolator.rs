//! Dense linear interpolation of planner paths into executable trajectories.

use crate::kinematic_traits::Joints;

/// Default number of interpolation steps per path segment.
pub const DEFAULT_STEPS_PER_SEGMENT: usize = 10;

/// Linear interpolation between two joint configurations; `t` is clamped
/// into `[0, 1]`.
pub fn interpolate_joints(start: &[f64], end: &[f64], t: f64) -> Joints {
    if t <= 0.0 {
        return start.to_vec();
    } else if t >= 1.0 {
        return end.to_vec();
    }
    start
        .iter()
        .zip(end)
        .map(|(s, e)| s + t * (e - s))
        .collect()
}

/// Expands a waypoint path into a densely interpolated trajectory.
///
/// Every consecutive waypoint pair contributes `steps_per_segment + 1`
/// configurations inclusive of both endpoints, so each internal waypoint
/// appears twice; executors tolerate (and expect) the duplicate. A path with
/// fewer than two waypoints is returned unchanged.
pub fn interpolate_path(path: &[Joints], steps_per_segment: usize) -> Vec<Joints> {
    if path.len() < 2 {
        return path.to_vec();
    }
    let steps = steps_per_segment.max(1);

    let mut trajectory = Vec::with_capacity((path.len() - 1) * (steps + 1));
    for pair in path.windows(2) {
        for step in 0..=steps {
            let t = step as f64 / steps as f64;
            trajectory.push(interpolate_joints(&pair[0], &pair[1], t));
        }
    }
    trajectory
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoints_are_preserved() {
        let path = vec![vec![0.0, 0.0], vec![1.0, -1.0], vec![2.0, 0.5]];
        let trajectory = interpolate_path(&path, 10);
        assert_eq!(trajectory.first().unwrap(), &path[0]);
        assert_eq!(trajectory.last().unwrap(), &path[2]);
    }

    #[test]
    fn segment_counts_include_both_endpoints() {
        let path = vec![vec![0.0], vec![1.0], vec![2.0]];
        let trajectory = interpolate_path(&path, 4);
        // Two segments of 5 configurations each, internal waypoint duplicated.
        assert_eq!(trajectory.len(), 10);
        assert_eq!(trajectory[4], vec![1.0]);
        assert_eq!(trajectory[5], vec![1.0]);
    }

    #[test]
    fn interpolation_is_linear() {
        let trajectory = interpolate_path(&[vec![0.0, 2.0], vec![1.0, 0.0]], 2);
        assert_eq!(trajectory[1], vec![0.5, 1.0]);
    }

    #[test]
    fn short_paths_pass_through_unchanged() {
        let single = vec![vec![0.3, 0.4]];
        assert_eq!(interpolate_path(&single, 10), single);
        let empty: Vec<Joints> = Vec::new();
        assert!(interpolate_path(&empty, 10).is_empty());
    }

    #[test]
    fn interpolate_joints_clamps_t() {
        let start = vec![0.0];
        let end = vec![1.0];
        assert_eq!(interpolate_joints(&start, &end, -0.5), start);
        assert_eq!(interpolate_joints(&start, &end, 1.5), end);
    }
}
