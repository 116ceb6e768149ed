//! Sphere-approximated dynamic obstacles and their snapshot sources.
//!
//! Perception replaces the obstacle list wholesale on every update; consumers
//! always read one consistent snapshot per validity check, so no partial
//! update is ever observed.

use nalgebra::Point3;
use std::sync::{Arc, RwLock};

/// A dynamic obstacle approximated by a sphere.
#[derive(Clone, Copy, Debug)]
pub struct Obstacle {
    /// Estimated center of the sphere in world coordinates.
    pub center: Point3<f64>,
    /// Estimated radius of the sphere.
    pub radius: f64,
}

impl Obstacle {
    pub fn new(center: Point3<f64>, radius: f64) -> Self {
        Obstacle { center, radius }
    }
}

/// Source of the current obstacle snapshot. May return an empty list when
/// nothing is tracked.
pub trait ObstacleSource: Send + Sync {
    /// The current obstacle set. The returned vector is a snapshot: later
    /// updates of the source do not affect it.
    fn snapshot(&self) -> Vec<Obstacle>;
}

/// A fixed obstacle set, useful for tests and static scenes.
#[derive(Clone, Debug, Default)]
pub struct StaticObstacles {
    obstacles: Vec<Obstacle>,
}

impl StaticObstacles {
    pub fn new(obstacles: Vec<Obstacle>) -> Self {
        StaticObstacles { obstacles }
    }

    /// A source with no obstacles at all.
    pub fn empty() -> Self {
        StaticObstacles::default()
    }
}

impl ObstacleSource for StaticObstacles {
    fn snapshot(&self) -> Vec<Obstacle> {
        self.obstacles.clone()
    }
}

/// Obstacle set refreshed from perception. [`SharedObstacles::replace`]
/// swaps the whole list atomically, so a concurrently running validity check
/// sees either the previous or the new set, never a mix.
#[derive(Clone, Debug, Default)]
pub struct SharedObstacles {
    inner: Arc<RwLock<Vec<Obstacle>>>,
}

impl SharedObstacles {
    pub fn new() -> Self {
        SharedObstacles::default()
    }

    /// Replaces the current obstacle set wholesale.
    pub fn replace(&self, obstacles: Vec<Obstacle>) {
        let mut guard = self.inner.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = obstacles;
    }
}

impl ObstacleSource for SharedObstacles {
    fn snapshot(&self) -> Vec<Obstacle> {
        self.inner
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}
