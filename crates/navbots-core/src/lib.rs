//! Core types shared across the NavBots workspace.
//!
//! The arena ([`World`]), the kinematic [`Agent`], the [`Observation`] sensor
//! contract, and the [`Simulation`] driver that ties them to a [`Controller`].

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod agent;
pub mod config;
pub mod sensors;
pub mod simulation;
pub mod world;

pub use agent::{AGENT_RADIUS, Agent, MAX_ENERGY, MAX_SPEED, MIN_SPEED};
pub use config::ArenaConfig;
pub use sensors::{Observation, SensorVariable};
pub use simulation::{EpisodeSummary, Simulation, SteeringAssist, StepOutcome, Termination};
pub use world::{Goal, Obstacle, Resource, World, WorldStatus};

/// Admissible range for the acceleration command.
pub const ACCELERATION_LIMIT: f64 = 1.0;
/// Admissible range for the turn-rate command (radians per tick).
pub const TURN_RATE_LIMIT: f64 = 0.5;

const FULL_TURN: f64 = std::f64::consts::TAU;
const HALF_TURN: f64 = std::f64::consts::PI;

/// Wrap an angle into `(-π, π]`.
pub(crate) fn wrap_signed_angle(mut angle: f64) -> f64 {
    if !angle.is_finite() {
        return 0.0;
    }
    while angle <= -HALF_TURN {
        angle += FULL_TURN;
    }
    while angle > HALF_TURN {
        angle -= FULL_TURN;
    }
    angle
}

/// Errors raised when validating arena configuration or explicit layouts.
#[derive(Debug, Error, PartialEq)]
pub enum WorldError {
    /// Indicates an invalid configuration value.
    #[error("invalid configuration: {0}")]
    InvalidConfig(&'static str),
}

/// Simulation clock (ticks elapsed in the current episode).
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
pub struct Tick(pub u64);

impl Tick {
    /// Returns the next sequential tick.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }

    /// Resets the tick counter back to zero.
    #[must_use]
    pub const fn zero() -> Self {
        Self(0)
    }
}

/// Continuous 2D position in arena units.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    /// Construct a new position.
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point.
    #[must_use]
    pub fn distance_to(self, other: Position) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    /// Absolute bearing (radians) from `self` towards `other`.
    #[must_use]
    pub fn bearing_to(self, other: Position) -> f64 {
        (other.y - self.y).atan2(other.x - self.x)
    }
}

/// Control command produced by a policy for one tick.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct Actuation {
    pub acceleration: f64,
    pub turn_rate: f64,
}

impl Actuation {
    /// Construct a raw (unclamped) command.
    #[must_use]
    pub const fn new(acceleration: f64, turn_rate: f64) -> Self {
        Self {
            acceleration,
            turn_rate,
        }
    }

    /// Clamp into the ranges the agent accepts. Non-finite components become 0.
    #[must_use]
    pub fn clamped(self) -> Self {
        let clamp = |value: f64, limit: f64| {
            if value.is_finite() {
                value.clamp(-limit, limit)
            } else {
                0.0
            }
        };
        Self {
            acceleration: clamp(self.acceleration, ACCELERATION_LIMIT),
            turn_rate: clamp(self.turn_rate, TURN_RATE_LIMIT),
        }
    }
}

/// Thin trait object used to drive agents without coupling to concrete policy crates.
pub trait Controller: Send + Sync {
    /// Static identifier of the controller implementation.
    fn kind(&self) -> &'static str;

    /// Produce a raw command for the provided observation.
    fn act(&self, observation: &Observation) -> Actuation;
}
