//! Fixed-shape observation extracted from the agent and its world.
//!
//! The observation is the only thing a policy may read.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{Agent, World, wrap_signed_angle};

/// Named observation fields a policy tree may reference.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SensorVariable {
    ResourceDistance,
    ResourceAngle,
    GoalDistance,
    GoalAngle,
    ObstacleDistance,
    Energy,
    Speed,
    GoalReached,
    ResourcesRemaining,
}

impl SensorVariable {
    /// Every variable, in declaration order.
    pub const ALL: [SensorVariable; 9] = [
        Self::ResourceDistance,
        Self::ResourceAngle,
        Self::GoalDistance,
        Self::GoalAngle,
        Self::ObstacleDistance,
        Self::Energy,
        Self::Speed,
        Self::GoalReached,
        Self::ResourcesRemaining,
    ];

    /// Stable snake_case identifier (matches the serialized form).
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ResourceDistance => "resource_distance",
            Self::ResourceAngle => "resource_angle",
            Self::GoalDistance => "goal_distance",
            Self::GoalAngle => "goal_angle",
            Self::ObstacleDistance => "obstacle_distance",
            Self::Energy => "energy",
            Self::Speed => "speed",
            Self::GoalReached => "goal_reached",
            Self::ResourcesRemaining => "resources_remaining",
        }
    }
}

impl fmt::Display for SensorVariable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sensor snapshot for one tick.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Observation {
    /// Distance to the nearest uncollected resource (`∞` when none remain).
    pub resource_distance: f64,
    /// Heading-relative angle to the first uncollected resource (0 when none remain).
    pub resource_angle: f64,
    /// Distance to the nearest obstacle centre (`∞` without obstacles).
    pub obstacle_distance: f64,
    pub goal_distance: f64,
    pub goal_angle: f64,
    pub energy: f64,
    pub speed: f64,
    pub goal_reached: bool,
    pub resources_remaining: usize,
}

impl Observation {
    /// Extract the observation for `agent` inside `world`.
    #[must_use]
    pub fn sense(agent: &Agent, world: &World) -> Self {
        let here = agent.position;
        let uncollected = world.resources().iter().filter(|r| !r.is_collected());

        let resource_angle = uncollected
            .clone()
            .next()
            .map_or(0.0, |first| {
                wrap_signed_angle(here.bearing_to(first.position) - agent.heading)
            });
        let mut resources_remaining = 0;
        let resource_distance = uncollected.fold(f64::INFINITY, |nearest, resource| {
            resources_remaining += 1;
            nearest.min(here.distance_to(resource.position))
        });

        let obstacle_distance = world
            .obstacles()
            .iter()
            .map(|obstacle| here.distance_to(obstacle.center()))
            .fold(f64::INFINITY, f64::min);

        let goal = world.goal();
        Self {
            resource_distance,
            resource_angle,
            obstacle_distance,
            goal_distance: here.distance_to(goal.position),
            goal_angle: wrap_signed_angle(here.bearing_to(goal.position) - agent.heading),
            energy: agent.energy,
            speed: agent.speed,
            goal_reached: agent.goal_reached,
            resources_remaining,
        }
    }

    /// Read a named field as a scalar. Flags read as 1/0.
    #[must_use]
    pub fn get(&self, variable: SensorVariable) -> f64 {
        match variable {
            SensorVariable::ResourceDistance => self.resource_distance,
            SensorVariable::ResourceAngle => self.resource_angle,
            SensorVariable::GoalDistance => self.goal_distance,
            SensorVariable::GoalAngle => self.goal_angle,
            SensorVariable::ObstacleDistance => self.obstacle_distance,
            SensorVariable::Energy => self.energy,
            SensorVariable::Speed => self.speed,
            SensorVariable::GoalReached => {
                if self.goal_reached {
                    1.0
                } else {
                    0.0
                }
            }
            SensorVariable::ResourcesRemaining => self.resources_remaining as f64,
        }
    }
}

impl Default for Observation {
    fn default() -> Self {
        Self {
            resource_distance: f64::INFINITY,
            resource_angle: 0.0,
            obstacle_distance: f64::INFINITY,
            goal_distance: 0.0,
            goal_angle: 0.0,
            energy: 0.0,
            speed: 0.0,
            goal_reached: false,
            resources_remaining: 0,
        }
    }
}
