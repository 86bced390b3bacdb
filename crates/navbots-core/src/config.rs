//! Arena configuration.

use rand::{SeedableRng, rngs::SmallRng};
use serde::{Deserialize, Serialize};

use crate::WorldError;

/// Static configuration for a NavBots arena.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ArenaConfig {
    /// Width of the arena in world units.
    pub width: f64,
    /// Height of the arena in world units.
    pub height: f64,
    /// Number of rectangular obstacles generated per world.
    pub obstacle_count: usize,
    /// Number of point resources generated per world.
    pub resource_count: usize,
    /// Smallest obstacle edge length.
    pub obstacle_min_size: f64,
    /// Largest obstacle edge length.
    pub obstacle_max_size: f64,
    /// Distance from the arena border inside which obstacles, the goal, and spawns are not sampled.
    pub edge_margin: f64,
    /// Distance from the arena border inside which resources are not sampled.
    pub resource_margin: f64,
    /// Capture radius of each resource.
    pub resource_radius: f64,
    /// Capture radius of the goal.
    pub goal_radius: f64,
    /// Minimum distance between the goal centre and every obstacle rectangle.
    pub goal_clearance: f64,
    /// Extra distance (beyond the agent radius) required between a spawn point and every obstacle.
    pub spawn_clearance: f64,
    /// Rejection-sampling budget for goal and spawn placement.
    pub placement_attempts: u32,
    /// Episode length in ticks.
    pub max_ticks: u64,
    /// Optional RNG seed for reproducible layouts.
    pub rng_seed: Option<u64>,
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            width: 800.0,
            height: 600.0,
            obstacle_count: 5,
            resource_count: 5,
            obstacle_min_size: 20.0,
            obstacle_max_size: 100.0,
            edge_margin: 50.0,
            resource_margin: 20.0,
            resource_radius: 10.0,
            goal_radius: 30.0,
            goal_clearance: 50.0,
            spawn_clearance: 20.0,
            placement_attempts: 100,
            max_ticks: 1_000,
            rng_seed: None,
        }
    }
}

impl ArenaConfig {
    /// Validate dimensions, margins, and radii.
    pub fn validate(&self) -> Result<(), WorldError> {
        if !(self.width.is_finite() && self.height.is_finite()) || self.width <= 0.0 || self.height <= 0.0 {
            return Err(WorldError::InvalidConfig("arena dimensions must be positive"));
        }
        if self.edge_margin < 0.0 || self.resource_margin < 0.0 {
            return Err(WorldError::InvalidConfig("margins must be non-negative"));
        }
        if self.width <= 2.0 * self.edge_margin || self.height <= 2.0 * self.edge_margin {
            return Err(WorldError::InvalidConfig(
                "arena must be larger than twice the edge margin",
            ));
        }
        if self.width <= 2.0 * self.resource_margin || self.height <= 2.0 * self.resource_margin {
            return Err(WorldError::InvalidConfig(
                "arena must be larger than twice the resource margin",
            ));
        }
        if self.obstacle_min_size <= 0.0 || self.obstacle_min_size > self.obstacle_max_size {
            return Err(WorldError::InvalidConfig(
                "obstacle sizes must be positive with min <= max",
            ));
        }
        if self.resource_radius < 0.0 || self.goal_radius <= 0.0 {
            return Err(WorldError::InvalidConfig(
                "resource radius must be non-negative and goal radius positive",
            ));
        }
        if self.goal_clearance < 0.0 || self.spawn_clearance < 0.0 {
            return Err(WorldError::InvalidConfig("clearances must be non-negative"));
        }
        if self.placement_attempts == 0 {
            return Err(WorldError::InvalidConfig("placement_attempts must be non-zero"));
        }
        if self.max_ticks == 0 {
            return Err(WorldError::InvalidConfig("max_ticks must be non-zero"));
        }
        Ok(())
    }

    /// Returns the configured RNG, seeding from entropy if no seed is set.
    #[must_use]
    pub fn seeded_rng(&self) -> SmallRng {
        match self.rng_seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => {
                let seed: u64 = rand::random();
                SmallRng::seed_from_u64(seed)
            }
        }
    }
}
