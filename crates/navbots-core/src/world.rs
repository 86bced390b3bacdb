//! Arena state: bounds, obstacles, resources, and the goal.

use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{ArenaConfig, Position, Tick, WorldError};

/// Axis-aligned rectangular obstacle anchored at its top-left corner.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Obstacle {
    pub origin: Position,
    pub width: f64,
    pub height: f64,
}

impl Obstacle {
    #[must_use]
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            origin: Position::new(x, y),
            width,
            height,
        }
    }

    /// Centre of the rectangle.
    #[must_use]
    pub fn center(&self) -> Position {
        Position::new(
            self.origin.x + self.width / 2.0,
            self.origin.y + self.height / 2.0,
        )
    }

    /// Distance from `point` to the closest point of the rectangle (0 inside).
    #[must_use]
    pub fn clearance(&self, point: Position) -> f64 {
        let dx = (self.origin.x - point.x)
            .max(0.0)
            .max(point.x - (self.origin.x + self.width));
        let dy = (self.origin.y - point.y)
            .max(0.0)
            .max(point.y - (self.origin.y + self.height));
        dx.hypot(dy)
    }

    /// Whether the bounding box of a circle overlaps this rectangle.
    #[must_use]
    pub fn overlaps(&self, x: f64, y: f64, radius: f64) -> bool {
        x + radius > self.origin.x
            && x - radius < self.origin.x + self.width
            && y + radius > self.origin.y
            && y - radius < self.origin.y + self.height
    }
}

/// Collectible point resource.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Resource {
    pub position: Position,
    collected: bool,
}

impl Resource {
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self {
            position: Position::new(x, y),
            collected: false,
        }
    }

    #[must_use]
    pub const fn is_collected(&self) -> bool {
        self.collected
    }
}

/// Circular goal region.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Goal {
    pub position: Position,
    pub radius: f64,
    reached: bool,
}

impl Goal {
    #[must_use]
    pub const fn new(x: f64, y: f64, radius: f64) -> Self {
        Self {
            position: Position::new(x, y),
            radius,
            reached: false,
        }
    }

    #[must_use]
    pub const fn is_reached(&self) -> bool {
        self.reached
    }
}

/// Episode progress snapshot.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct WorldStatus {
    pub tick: Tick,
    pub resources_collected: usize,
    pub resources_remaining: usize,
    pub goal_reached: bool,
}

/// Arena shared by one agent for the duration of an evaluation.
///
/// Obstacle geometry is fixed once generated; `reset` only clears the
/// per-episode flags and the clock.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct World {
    config: ArenaConfig,
    obstacles: Vec<Obstacle>,
    resources: Vec<Resource>,
    goal: Goal,
    tick: Tick,
}

fn sample_coordinate(rng: &mut dyn RngCore, extent: f64, margin: f64) -> f64 {
    let low = margin.ceil() as i64;
    let high = ((extent - margin).floor() as i64).max(low);
    rng.random_range(low..=high) as f64
}

fn sample_size(rng: &mut dyn RngCore, min: f64, max: f64) -> f64 {
    let low = min.ceil() as i64;
    let high = (max.floor() as i64).max(low);
    rng.random_range(low..=high) as f64
}

impl World {
    /// Generate a random layout from the configuration's own RNG seed.
    pub fn from_config(config: ArenaConfig) -> Result<Self, WorldError> {
        let mut rng = config.seeded_rng();
        Self::generate(config, &mut rng)
    }

    /// Generate a random layout: obstacles first, then resources, then a goal
    /// kept clear of every obstacle.
    pub fn generate(config: ArenaConfig, rng: &mut dyn RngCore) -> Result<Self, WorldError> {
        config.validate()?;
        let (obstacles, resources, goal) = Self::sample_layout(&config, rng);
        Ok(Self {
            config,
            obstacles,
            resources,
            goal,
            tick: Tick::zero(),
        })
    }

    /// Replace the layout with a fresh sample under the same configuration.
    pub fn regenerate(&mut self, rng: &mut dyn RngCore) {
        let (obstacles, resources, goal) = Self::sample_layout(&self.config, rng);
        self.obstacles = obstacles;
        self.resources = resources;
        self.goal = goal;
        self.tick = Tick::zero();
    }

    fn sample_layout(
        config: &ArenaConfig,
        rng: &mut dyn RngCore,
    ) -> (Vec<Obstacle>, Vec<Resource>, Goal) {
        let obstacles = (0..config.obstacle_count)
            .map(|_| {
                let x = sample_coordinate(rng, config.width, config.edge_margin);
                let y = sample_coordinate(rng, config.height, config.edge_margin);
                let width = sample_size(rng, config.obstacle_min_size, config.obstacle_max_size);
                let height = sample_size(rng, config.obstacle_min_size, config.obstacle_max_size);
                Obstacle::new(x, y, width, height)
            })
            .collect::<Vec<_>>();

        let resources = (0..config.resource_count)
            .map(|_| {
                let x = sample_coordinate(rng, config.width, config.resource_margin);
                let y = sample_coordinate(rng, config.height, config.resource_margin);
                Resource::new(x, y)
            })
            .collect::<Vec<_>>();

        let goal_position =
            Self::sample_clear_point(config, &obstacles, config.goal_clearance, rng)
                .unwrap_or_else(|| {
                    debug!("goal placement exhausted its attempts; falling back to arena centre");
                    Self::center_of(config)
                });
        let goal = Goal::new(goal_position.x, goal_position.y, config.goal_radius);
        (obstacles, resources, goal)
    }

    /// Build a world from an explicit layout.
    pub fn from_parts(
        config: ArenaConfig,
        obstacles: Vec<Obstacle>,
        resources: Vec<Resource>,
        goal: Goal,
    ) -> Result<Self, WorldError> {
        config.validate()?;
        if obstacles
            .iter()
            .any(|obstacle| obstacle.width <= 0.0 || obstacle.height <= 0.0)
        {
            return Err(WorldError::InvalidConfig("obstacle dimensions must be positive"));
        }
        if goal.radius <= 0.0 {
            return Err(WorldError::InvalidConfig("goal radius must be positive"));
        }
        let mut world = Self {
            config,
            obstacles,
            resources,
            goal,
            tick: Tick::zero(),
        };
        world.reset();
        Ok(world)
    }

    fn center_of(config: &ArenaConfig) -> Position {
        Position::new((config.width / 2.0).floor(), (config.height / 2.0).floor())
    }

    fn sample_clear_point(
        config: &ArenaConfig,
        obstacles: &[Obstacle],
        clearance: f64,
        rng: &mut dyn RngCore,
    ) -> Option<Position> {
        (0..config.placement_attempts).find_map(|_| {
            let candidate = Position::new(
                sample_coordinate(rng, config.width, config.edge_margin),
                sample_coordinate(rng, config.height, config.edge_margin),
            );
            obstacles
                .iter()
                .all(|obstacle| obstacle.clearance(candidate) >= clearance)
                .then_some(candidate)
        })
    }

    /// True if the circle's bounding box leaves the arena or overlaps an obstacle.
    #[must_use]
    pub fn collides(&self, x: f64, y: f64, radius: f64) -> bool {
        if x - radius < 0.0
            || x + radius > self.config.width
            || y - radius < 0.0
            || y + radius > self.config.height
        {
            return true;
        }
        self.obstacles
            .iter()
            .any(|obstacle| obstacle.overlaps(x, y, radius))
    }

    /// Mark every uncollected resource in reach as collected and return how many were taken.
    pub fn collect_resources(&mut self, x: f64, y: f64, radius: f64) -> usize {
        let reach = radius + self.config.resource_radius;
        let here = Position::new(x, y);
        let mut collected = 0;
        for resource in self.resources.iter_mut().filter(|r| !r.collected) {
            if here.distance_to(resource.position) < reach {
                resource.collected = true;
                collected += 1;
            }
        }
        collected
    }

    /// Returns `true` exactly once: on the first call that lands inside the goal.
    pub fn check_goal(&mut self, x: f64, y: f64, radius: f64) -> bool {
        if self.goal.reached {
            return false;
        }
        let distance = Position::new(x, y).distance_to(self.goal.position);
        if distance < radius + self.goal.radius {
            self.goal.reached = true;
            return true;
        }
        false
    }

    /// Sample a spawn point clear of every obstacle by `agent_radius + spawn_clearance`.
    ///
    /// Falls back to the arena centre when the attempt budget runs out.
    pub fn safe_spawn_point(&self, agent_radius: f64, rng: &mut dyn RngCore) -> Position {
        let clearance = agent_radius + self.config.spawn_clearance;
        Self::sample_clear_point(&self.config, &self.obstacles, clearance, rng).unwrap_or_else(
            || {
                debug!(agent_radius, "spawn placement exhausted its attempts; using arena centre");
                Self::center_of(&self.config)
            },
        )
    }

    /// Clear per-episode flags and rewind the clock. Geometry is kept.
    pub fn reset(&mut self) {
        self.tick = Tick::zero();
        for resource in &mut self.resources {
            resource.collected = false;
        }
        self.goal.reached = false;
    }

    /// Advance the clock; returns `true` once the tick limit is reached.
    pub fn step(&mut self) -> bool {
        self.tick = self.tick.next();
        self.tick.0 >= self.config.max_ticks
    }

    #[must_use]
    pub fn status(&self) -> WorldStatus {
        let resources_collected = self.resources.iter().filter(|r| r.collected).count();
        WorldStatus {
            tick: self.tick,
            resources_collected,
            resources_remaining: self.resources.len() - resources_collected,
            goal_reached: self.goal.reached,
        }
    }

    #[must_use]
    pub fn config(&self) -> &ArenaConfig {
        &self.config
    }

    #[must_use]
    pub fn obstacles(&self) -> &[Obstacle] {
        &self.obstacles
    }

    #[must_use]
    pub fn resources(&self) -> &[Resource] {
        &self.resources
    }

    #[must_use]
    pub const fn goal(&self) -> &Goal {
        &self.goal
    }

    #[must_use]
    pub const fn tick(&self) -> Tick {
        self.tick
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    fn open_world(resources: Vec<Resource>) -> World {
        World::from_parts(
            ArenaConfig::default(),
            vec![Obstacle::new(300.0, 200.0, 50.0, 50.0)],
            resources,
            Goal::new(700.0, 500.0, 30.0),
        )
        .expect("world")
    }

    #[test]
    fn collides_with_bounds_and_obstacles() {
        let world = open_world(Vec::new());
        assert!(world.collides(10.0, 100.0, 15.0), "left wall");
        assert!(world.collides(790.0, 100.0, 15.0), "right wall");
        assert!(world.collides(100.0, 590.0, 15.0), "bottom wall");
        assert!(world.collides(290.0, 210.0, 15.0), "obstacle edge");
        assert!(!world.collides(200.0, 100.0, 15.0));
        // Touching exactly is not an overlap.
        assert!(!world.collides(285.0, 225.0, 15.0));
    }

    #[test]
    fn collect_resources_is_once_per_episode() {
        let mut world = open_world(vec![Resource::new(105.0, 100.0), Resource::new(500.0, 100.0)]);
        assert_eq!(world.collect_resources(100.0, 100.0, 15.0), 1);
        assert!(world.resources()[0].is_collected());
        assert!(!world.resources()[1].is_collected());
        assert_eq!(world.collect_resources(100.0, 100.0, 15.0), 0);
        assert_eq!(world.status().resources_remaining, 1);

        world.reset();
        assert_eq!(world.status().resources_remaining, 2);
        assert_eq!(world.collect_resources(100.0, 100.0, 15.0), 1);
    }

    #[test]
    fn collect_radius_is_strict() {
        let mut world = open_world(vec![Resource::new(125.0, 100.0)]);
        assert_eq!(world.collect_resources(100.0, 100.0, 15.0), 0);
        assert_eq!(world.collect_resources(100.1, 100.0, 15.0), 1);
    }

    #[test]
    fn goal_fires_once() {
        let mut world = open_world(Vec::new());
        assert!(!world.check_goal(100.0, 100.0, 15.0));
        assert!(world.check_goal(690.0, 490.0, 15.0));
        assert!(world.goal().is_reached());
        assert!(!world.check_goal(700.0, 500.0, 15.0));
        world.reset();
        assert!(!world.goal().is_reached());
    }

    #[test]
    fn step_reports_time_limit() {
        let config = ArenaConfig {
            max_ticks: 3,
            ..ArenaConfig::default()
        };
        let mut world = World::from_parts(config, Vec::new(), Vec::new(), Goal::new(400.0, 300.0, 30.0))
            .expect("world");
        assert!(!world.step());
        assert!(!world.step());
        assert!(world.step());
        assert_eq!(world.tick(), Tick(3));
        world.reset();
        assert_eq!(world.tick(), Tick::zero());
    }

    #[test]
    fn generated_goal_keeps_clearance() {
        for seed in 0..32 {
            let mut rng = SmallRng::seed_from_u64(seed);
            let world = World::generate(ArenaConfig::default(), &mut rng).expect("world");
            assert_eq!(world.obstacles().len(), 5);
            assert_eq!(world.resources().len(), 5);
            let goal = world.goal().position;
            let centre = Position::new(400.0, 300.0);
            let clear = world
                .obstacles()
                .iter()
                .all(|obstacle| obstacle.clearance(goal) >= 50.0);
            assert!(clear || goal == centre, "seed {seed}: goal {goal:?} too close");
        }
    }

    #[test]
    fn spawn_point_falls_back_to_centre_when_blocked() {
        let config = ArenaConfig::default();
        let wall = Obstacle::new(0.0, 0.0, config.width, config.height);
        let world = World::from_parts(config, vec![wall], Vec::new(), Goal::new(400.0, 300.0, 30.0))
            .expect("world");
        let mut rng = SmallRng::seed_from_u64(7);
        assert_eq!(world.safe_spawn_point(15.0, &mut rng), Position::new(400.0, 300.0));
    }

    #[test]
    fn spawn_point_clears_obstacles() {
        let mut rng = SmallRng::seed_from_u64(99);
        let world = World::generate(ArenaConfig::default(), &mut rng).expect("world");
        for _ in 0..50 {
            let spawn = world.safe_spawn_point(15.0, &mut rng);
            let clear = world
                .obstacles()
                .iter()
                .all(|obstacle| obstacle.clearance(spawn) >= 35.0);
            assert!(clear || spawn == Position::new(400.0, 300.0));
        }
    }

    #[test]
    fn regenerate_matches_generate_for_the_same_stream() {
        let mut rng_a = SmallRng::seed_from_u64(21);
        let mut rng_b = SmallRng::seed_from_u64(21);
        let generated = World::generate(ArenaConfig::default(), &mut rng_a).expect("world");
        let mut regenerated = open_world(Vec::new());
        regenerated.step();
        regenerated.regenerate(&mut rng_b);
        assert_eq!(regenerated.obstacles(), generated.obstacles());
        assert_eq!(regenerated.resources(), generated.resources());
        assert_eq!(regenerated.goal(), generated.goal());
        assert_eq!(regenerated.tick(), Tick::zero());
    }

    #[test]
    fn from_parts_rejects_degenerate_obstacles() {
        let result = World::from_parts(
            ArenaConfig::default(),
            vec![Obstacle::new(10.0, 10.0, 0.0, 5.0)],
            Vec::new(),
            Goal::new(400.0, 300.0, 30.0),
        );
        assert!(result.is_err());
    }
}
