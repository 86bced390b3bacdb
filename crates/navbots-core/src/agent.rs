//! Agent kinematics and energy bookkeeping.

use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};
use std::f64::consts::FRAC_PI_4;

use crate::{Actuation, Position, World};

/// Default footprint radius of an agent.
pub const AGENT_RADIUS: f64 = 15.0;
/// Energy ceiling (and the level restored at reset).
pub const MAX_ENERGY: f64 = 100.0;
/// Speed floor once the agent has moved.
pub const MIN_SPEED: f64 = 0.1;
/// Speed ceiling.
pub const MAX_SPEED: f64 = 5.0;

const STUCK_DISPLACEMENT: f64 = 0.1;
const STUCK_TICKS: u32 = 5;
const STUCK_MIN_ACCELERATION: f64 = 0.2;
const STUCK_TURN: f64 = 0.2;
const GOAL_ENERGY_BONUS: f64 = 50.0;
const RESOURCE_ENERGY_BONUS: f64 = 20.0;
const BASE_DRAIN: f64 = 0.1;
const SPEED_DRAIN: f64 = 0.05;
const TURN_DRAIN: f64 = 0.1;

/// Kinematic state of the navigating agent.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Agent {
    pub position: Position,
    /// Heading in radians. Never wrapped; sensors normalise it.
    pub heading: f64,
    pub speed: f64,
    pub energy: f64,
    pub radius: f64,
    pub resources_collected: u32,
    pub collisions: u32,
    pub distance_traveled: f64,
    pub stuck_ticks: u32,
    pub goal_reached: bool,
    /// Position at the start of the previous tick.
    previous_position: Position,
}

impl Agent {
    /// Spawn a fresh agent at `position` with the given footprint radius.
    #[must_use]
    pub fn new(position: Position, radius: f64) -> Self {
        Self {
            position,
            heading: 0.0,
            speed: 0.0,
            energy: MAX_ENERGY,
            radius,
            resources_collected: 0,
            collisions: 0,
            distance_traveled: 0.0,
            stuck_ticks: 0,
            goal_reached: false,
            previous_position: position,
        }
    }

    /// Return to the spawn state at `position`, keeping the radius.
    pub fn reset(&mut self, position: Position) {
        *self = Self::new(position, self.radius);
    }

    /// Whether the energy budget is spent.
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.energy <= 0.0
    }

    /// Advance one tick. Returns `true` when energy has run out.
    pub fn update(&mut self, actuation: Actuation, world: &mut World, rng: &mut dyn RngCore) -> bool {
        let mut acceleration = actuation.acceleration;
        let mut turn = actuation.turn_rate;
        self.heading += turn;

        let displacement = self.previous_position.distance_to(self.position);
        self.previous_position = self.position;
        if displacement < STUCK_DISPLACEMENT {
            self.stuck_ticks += 1;
            if self.stuck_ticks > STUCK_TICKS {
                acceleration = acceleration.max(STUCK_MIN_ACCELERATION);
                turn = rng.random_range(-STUCK_TURN..=STUCK_TURN);
                self.heading += turn;
            }
        } else {
            self.stuck_ticks = 0;
        }

        self.speed = (self.speed + acceleration).clamp(MIN_SPEED, MAX_SPEED);

        let next = Position::new(
            self.position.x + self.speed * self.heading.cos(),
            self.position.y + self.speed * self.heading.sin(),
        );
        if world.collides(next.x, next.y, self.radius) {
            self.collisions += 1;
            self.speed = MIN_SPEED;
            self.heading += rng.random_range(-FRAC_PI_4..=FRAC_PI_4);
        } else {
            self.distance_traveled += self.position.distance_to(next);
            self.position = next;
        }

        let collected = world.collect_resources(self.position.x, self.position.y, self.radius);
        self.resources_collected += collected as u32;

        if !self.goal_reached && world.check_goal(self.position.x, self.position.y, self.radius) {
            self.goal_reached = true;
            self.energy = (self.energy + GOAL_ENERGY_BONUS).min(MAX_ENERGY);
        }

        self.energy -= BASE_DRAIN + SPEED_DRAIN * self.speed + TURN_DRAIN * turn.abs();
        self.energy = self.energy.max(0.0);
        if collected > 0 {
            self.energy = (self.energy + RESOURCE_ENERGY_BONUS * collected as f64).min(MAX_ENERGY);
        }

        self.is_exhausted()
    }
}
