//! Tick driver binding a [`Controller`] to a world/agent pair.
//!
//! External drivers (renderers, replay tools) call [`Simulation::step`] once
//! per frame; the rollout evaluator calls [`Simulation::run_episode`].

use rand::RngCore;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::agent::AGENT_RADIUS;
use crate::{Actuation, Agent, Controller, Observation, Tick, World};

/// Why an episode stopped.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Termination {
    EnergyExhausted,
    TimeLimit,
}

/// Hand-coded steering that overrides the controller near obstacles and resources.
///
/// Disabled unless explicitly attached; when active, fitness measures the
/// tree *and* these rules.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct SteeringAssist {
    /// Obstacle-centre distance below which the agent brakes and turns away.
    pub obstacle_range: f64,
    /// Resource distance below which the agent steers straight at the resource.
    pub resource_range: f64,
}

impl Default for SteeringAssist {
    fn default() -> Self {
        Self {
            obstacle_range: 60.0,
            resource_range: 120.0,
        }
    }
}

impl SteeringAssist {
    const AVOID_ACCELERATION: f64 = -0.5;
    const AVOID_TURN: f64 = 0.5;
    const SEEK_MIN_ACCELERATION: f64 = 0.3;

    /// Replace `actuation` when the observation falls inside an assist range.
    #[must_use]
    pub fn apply(&self, observation: &Observation, actuation: Actuation) -> Actuation {
        if observation.obstacle_distance < self.obstacle_range {
            Actuation::new(Self::AVOID_ACCELERATION, Self::AVOID_TURN)
        } else if observation.resource_distance < self.resource_range {
            Actuation::new(
                actuation.acceleration.max(Self::SEEK_MIN_ACCELERATION),
                observation.resource_angle,
            )
        } else {
            actuation
        }
    }
}

/// Result of a single tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepOutcome {
    /// Observation the controller acted on.
    pub observation: Observation,
    /// Clamped command that was applied.
    pub actuation: Actuation,
    /// Set when this tick ended the episode.
    pub termination: Option<Termination>,
}

/// Final agent/world counters for one episode.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct EpisodeSummary {
    pub ticks: Tick,
    pub termination: Termination,
    pub resources_collected: u32,
    pub resources_remaining: usize,
    pub goal_reached: bool,
    pub energy: f64,
    pub distance_traveled: f64,
    pub collisions: u32,
}

/// A world, its agent, and the optional steering assist.
#[derive(Debug, Clone)]
pub struct Simulation {
    world: World,
    agent: Agent,
    assist: Option<SteeringAssist>,
    termination: Option<Termination>,
}

impl Simulation {
    /// Wrap a world; the agent starts at the arena centre until [`Self::begin_episode`].
    #[must_use]
    pub fn new(world: World, agent_radius: f64) -> Self {
        let config = world.config();
        let centre = crate::Position::new(config.width / 2.0, config.height / 2.0);
        Self {
            world,
            agent: Agent::new(centre, agent_radius),
            assist: None,
            termination: None,
        }
    }

    /// Wrap a world with the default agent radius.
    #[must_use]
    pub fn with_default_agent(world: World) -> Self {
        Self::new(world, AGENT_RADIUS)
    }

    /// Attach or detach the heuristic steering override.
    #[must_use]
    pub fn with_assist(mut self, assist: Option<SteeringAssist>) -> Self {
        self.assist = assist;
        self
    }

    /// Reset the world and respawn the agent at a fresh safe point.
    pub fn begin_episode(&mut self, rng: &mut dyn RngCore) {
        self.world.reset();
        let spawn = self.world.safe_spawn_point(self.agent.radius, rng);
        self.agent.reset(spawn);
        self.termination = None;
    }

    /// Current observation for the agent.
    #[must_use]
    pub fn observe(&self) -> Observation {
        Observation::sense(&self.agent, &self.world)
    }

    /// Map an observation to the clamped command the agent will receive.
    #[must_use]
    pub fn command(&self, controller: &dyn Controller, observation: &Observation) -> Actuation {
        let raw = controller.act(observation);
        let steered = match &self.assist {
            Some(assist) => assist.apply(observation, raw),
            None => raw,
        };
        steered.clamped()
    }

    /// Advance one tick. Calling after termination is a no-op that repeats the termination.
    pub fn step(&mut self, controller: &dyn Controller, rng: &mut dyn RngCore) -> StepOutcome {
        let observation = self.observe();
        if let Some(termination) = self.termination {
            return StepOutcome {
                observation,
                actuation: Actuation::default(),
                termination: Some(termination),
            };
        }

        let actuation = self.command(controller, &observation);
        let exhausted = self.agent.update(actuation, &mut self.world, rng);
        let termination = if exhausted {
            Some(Termination::EnergyExhausted)
        } else if self.world.step() {
            Some(Termination::TimeLimit)
        } else {
            None
        };
        self.termination = termination;
        StepOutcome {
            observation,
            actuation,
            termination,
        }
    }

    /// Run a full episode from a fresh spawn until termination.
    pub fn run_episode(&mut self, controller: &dyn Controller, rng: &mut dyn RngCore) -> EpisodeSummary {
        self.begin_episode(rng);
        let termination = loop {
            if let Some(termination) = self.step(controller, rng).termination {
                break termination;
            }
        };
        let summary = self.summary(termination);
        trace!(
            controller = controller.kind(),
            ticks = summary.ticks.0,
            resources = summary.resources_collected,
            goal = summary.goal_reached,
            collisions = summary.collisions,
            "episode finished"
        );
        summary
    }

    fn summary(&self, termination: Termination) -> EpisodeSummary {
        let status = self.world.status();
        EpisodeSummary {
            ticks: status.tick,
            termination,
            resources_collected: self.agent.resources_collected,
            resources_remaining: status.resources_remaining,
            goal_reached: self.agent.goal_reached,
            energy: self.agent.energy,
            distance_traveled: self.agent.distance_traveled,
            collisions: self.agent.collisions,
        }
    }

    #[must_use]
    pub fn world(&self) -> &World {
        &self.world
    }

    #[must_use]
    pub fn agent(&self) -> &Agent {
        &self.agent
    }

    /// Mutable agent access for scripted scenarios.
    #[must_use]
    pub fn agent_mut(&mut self) -> &mut Agent {
        &mut self.agent
    }

    #[must_use]
    pub const fn termination(&self) -> Option<Termination> {
        self.termination
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ArenaConfig, Goal, Obstacle, Resource};
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    struct Fixed(Actuation);

    impl Controller for Fixed {
        fn kind(&self) -> &'static str {
            "test.fixed"
        }

        fn act(&self, _observation: &Observation) -> Actuation {
            self.0
        }
    }

    fn short_world(max_ticks: u64) -> World {
        let config = ArenaConfig {
            max_ticks,
            ..ArenaConfig::default()
        };
        World::from_parts(
            config,
            vec![Obstacle::new(600.0, 100.0, 40.0, 40.0)],
            vec![Resource::new(200.0, 500.0)],
            Goal::new(700.0, 500.0, 30.0),
        )
        .expect("world")
    }

    #[test]
    fn episode_stops_at_time_limit() {
        let mut sim = Simulation::with_default_agent(short_world(25));
        let mut rng = SmallRng::seed_from_u64(11);
        let summary = sim.run_episode(&Fixed(Actuation::new(0.0, 0.0)), &mut rng);
        assert_eq!(summary.termination, Termination::TimeLimit);
        assert_eq!(summary.ticks, Tick(25));
        assert_eq!(sim.termination(), Some(Termination::TimeLimit));
    }

    #[test]
    fn episode_stops_when_energy_runs_out() {
        let mut sim = Simulation::with_default_agent(short_world(1_000));
        let mut rng = SmallRng::seed_from_u64(12);
        sim.begin_episode(&mut rng);
        sim.agent_mut().position = crate::Position::new(400.0, 300.0);
        sim.agent_mut().energy = 0.3;
        let controller = Fixed(Actuation::new(0.0, 0.0));
        let mut ticks = 0;
        while sim.step(&controller, &mut rng).termination.is_none() {
            ticks += 1;
        }
        assert_eq!(sim.termination(), Some(Termination::EnergyExhausted));
        assert!(ticks < 5);
    }

    #[test]
    fn commands_are_clamped() {
        let sim = Simulation::with_default_agent(short_world(10));
        let command = sim.command(&Fixed(Actuation::new(7.0, -7.0)), &Observation::default());
        assert_eq!(command, Actuation::new(1.0, -0.5));
    }

    #[test]
    fn assist_overrides_near_obstacles_and_resources() {
        let assist = SteeringAssist::default();
        let raw = Actuation::new(0.1, -0.2);

        let near_obstacle = Observation {
            obstacle_distance: 10.0,
            ..Observation::default()
        };
        assert_eq!(assist.apply(&near_obstacle, raw), Actuation::new(-0.5, 0.5));

        let near_resource = Observation {
            resource_distance: 50.0,
            resource_angle: 0.25,
            ..Observation::default()
        };
        assert_eq!(assist.apply(&near_resource, raw), Actuation::new(0.3, 0.25));

        assert_eq!(assist.apply(&Observation::default(), raw), raw);
    }

    #[test]
    fn stepping_after_termination_is_inert() {
        let mut sim = Simulation::with_default_agent(short_world(1));
        let mut rng = SmallRng::seed_from_u64(13);
        sim.begin_episode(&mut rng);
        let controller = Fixed(Actuation::new(1.0, 0.0));
        assert_eq!(sim.step(&controller, &mut rng).termination, Some(Termination::TimeLimit));
        let position = sim.agent().position;
        let again = sim.step(&controller, &mut rng);
        assert_eq!(again.termination, Some(Termination::TimeLimit));
        assert_eq!(sim.agent().position, position);
    }
}
