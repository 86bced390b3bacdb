//! Episode rollouts and the scalar fitness they produce.

use navbots_core::{
    AGENT_RADIUS, ArenaConfig, Controller, EpisodeSummary, Goal, Simulation, SteeringAssist,
    World,
};
use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::EvolutionError;

/// Reward terms applied to one episode summary.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct FitnessWeights {
    /// Reward per collected resource.
    pub resource: f64,
    /// Reward for reaching the goal after every resource is gone.
    pub completion: f64,
    /// Reward per unit of energy left at the end.
    pub energy: f64,
    /// Reward per unit of distance travelled.
    pub distance: f64,
    /// Penalty per collision.
    pub collision: f64,
    /// Penalty per resource still on the map.
    pub uncollected: f64,
    /// Extra penalty for reaching the goal while resources remain.
    pub premature_goal: f64,
    /// Lowest score an episode can receive.
    pub floor: f64,
}

impl Default for FitnessWeights {
    fn default() -> Self {
        Self {
            resource: 5_000.0,
            completion: 8_000.0,
            energy: 5.0,
            distance: 0.2,
            collision: 3_000.0,
            uncollected: 6_000.0,
            premature_goal: 10_000.0,
            floor: 1.0,
        }
    }
}

impl FitnessWeights {
    /// Score a finished episode.
    #[must_use]
    pub fn score(&self, summary: &EpisodeSummary) -> f64 {
        let remaining = summary.resources_remaining as f64;
        let mut score = self.resource * f64::from(summary.resources_collected)
            + self.energy * summary.energy
            + self.distance * summary.distance_traveled
            - self.collision * f64::from(summary.collisions)
            - self.uncollected * remaining;
        if summary.goal_reached {
            if summary.resources_remaining == 0 {
                score += self.completion;
            } else {
                score -= self.premature_goal;
            }
        }
        score.max(self.floor)
    }
}

/// How individuals are rolled out.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RolloutConfig {
    /// Episodes averaged per evaluation (each from a fresh spawn point).
    pub episodes: usize,
    pub agent_radius: f64,
    pub arena: ArenaConfig,
    pub weights: FitnessWeights,
    /// Heuristic steering override; `None` scores the trees alone.
    pub assist: Option<SteeringAssist>,
}

impl Default for RolloutConfig {
    fn default() -> Self {
        Self {
            episodes: 3,
            agent_radius: AGENT_RADIUS,
            arena: ArenaConfig::default(),
            weights: FitnessWeights::default(),
            assist: None,
        }
    }
}

impl RolloutConfig {
    pub fn validate(&self) -> Result<(), EvolutionError> {
        if self.episodes == 0 {
            return Err(EvolutionError::InvalidConfig("episodes must be non-zero"));
        }
        if !self.agent_radius.is_finite() || self.agent_radius <= 0.0 {
            return Err(EvolutionError::InvalidConfig("agent_radius must be positive"));
        }
        if let Some(assist) = &self.assist {
            if assist.obstacle_range < 0.0 || assist.resource_range < 0.0 {
                return Err(EvolutionError::InvalidConfig(
                    "assist ranges must be non-negative",
                ));
            }
        }
        self.arena.validate()?;
        Ok(())
    }
}

/// Result of evaluating one controller.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Evaluation {
    /// Mean of the per-episode scores.
    pub fitness: f64,
    pub episodes: Vec<EpisodeSummary>,
}

/// Scores controllers by running them through freshly generated worlds.
#[derive(Debug, Clone)]
pub struct RolloutEvaluator {
    config: RolloutConfig,
    template: World,
}

impl RolloutEvaluator {
    pub fn new(config: RolloutConfig) -> Result<Self, EvolutionError> {
        config.validate()?;
        let arena = &config.arena;
        let placeholder = Goal::new(arena.width / 2.0, arena.height / 2.0, arena.goal_radius);
        let template = World::from_parts(arena.clone(), Vec::new(), Vec::new(), placeholder)?;
        Ok(Self { config, template })
    }

    #[must_use]
    pub fn config(&self) -> &RolloutConfig {
        &self.config
    }

    /// Generate one world from `rng`, then run every episode in it.
    ///
    /// Identical RNG state yields an identical [`Evaluation`].
    pub fn evaluate(&self, controller: &dyn Controller, rng: &mut dyn RngCore) -> Evaluation {
        let mut world = self.template.clone();
        world.regenerate(rng);
        let mut simulation =
            Simulation::new(world, self.config.agent_radius).with_assist(self.config.assist);

        let episodes: Vec<EpisodeSummary> = (0..self.config.episodes)
            .map(|_| simulation.run_episode(controller, rng))
            .collect();
        let total: f64 = episodes
            .iter()
            .map(|summary| self.config.weights.score(summary))
            .sum();
        Evaluation {
            fitness: total / episodes.len() as f64,
            episodes,
        }
    }
}
