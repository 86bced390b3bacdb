//! Engine configuration.

use navbots_brain::TreeConfig;
use rand::{SeedableRng, rngs::SmallRng};
use serde::{Deserialize, Serialize};

use crate::EvolutionError;
use crate::rollout::RolloutConfig;
use crate::selection::SelectionStrategy;

/// Whether EVALUATE fans out across the rayon pool.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum EvaluationMode {
    Sequential,
    #[default]
    Parallel,
}

/// Island-model evolution settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EvolutionConfig {
    /// Individuals per island.
    pub population_size: usize,
    pub islands: usize,
    /// Share of each island copied unchanged into the next generation (at least one).
    pub elite_fraction: f64,
    /// Per-node replacement probability applied to every offspring.
    pub mutation_probability: f64,
    pub selection: SelectionStrategy,
    pub generations: usize,
    /// Inject random newcomers every this many generations; 0 disables injection.
    pub diversity_interval: usize,
    /// Share of each island replaced during diversity injection.
    pub diversity_fraction: f64,
    /// Individuals each island sends to its ring successor.
    pub migrants: usize,
    pub evaluation: EvaluationMode,
    pub tree: TreeConfig,
    pub rollout: RolloutConfig,
    /// Optional RNG seed for reproducible runs.
    pub rng_seed: Option<u64>,
}

impl Default for EvolutionConfig {
    fn default() -> Self {
        Self {
            population_size: 60,
            islands: 5,
            elite_fraction: 0.05,
            mutation_probability: 0.4,
            selection: SelectionStrategy::default(),
            generations: 20,
            diversity_interval: 3,
            diversity_fraction: 0.1,
            migrants: 2,
            evaluation: EvaluationMode::default(),
            tree: TreeConfig::default(),
            rollout: RolloutConfig::default(),
            rng_seed: None,
        }
    }
}

fn is_probability(value: f64) -> bool {
    (0.0..=1.0).contains(&value)
}

impl EvolutionConfig {
    pub fn validate(&self) -> Result<(), EvolutionError> {
        if self.population_size < 2 {
            return Err(EvolutionError::InvalidConfig(
                "population_size must allow two distinct parents",
            ));
        }
        if self.islands == 0 {
            return Err(EvolutionError::InvalidConfig("islands must be non-zero"));
        }
        if self.generations == 0 {
            return Err(EvolutionError::InvalidConfig("generations must be non-zero"));
        }
        if !is_probability(self.elite_fraction) {
            return Err(EvolutionError::InvalidConfig(
                "elite_fraction must lie in [0, 1]",
            ));
        }
        if !is_probability(self.mutation_probability) {
            return Err(EvolutionError::InvalidConfig(
                "mutation_probability must lie in [0, 1]",
            ));
        }
        if !is_probability(self.diversity_fraction) {
            return Err(EvolutionError::InvalidConfig(
                "diversity_fraction must lie in [0, 1]",
            ));
        }
        if let SelectionStrategy::Tournament { size } = self.selection {
            if size == 0 || size > self.population_size {
                return Err(EvolutionError::InvalidConfig(
                    "tournament size must lie in 1..=population_size",
                ));
            }
        }
        if self.migrants > self.population_size {
            return Err(EvolutionError::InvalidConfig(
                "migrants must not exceed population_size",
            ));
        }
        self.tree.validate()?;
        self.rollout.validate()?;
        Ok(())
    }

    /// Returns the configured RNG, seeding from entropy if no seed is set.
    #[must_use]
    pub fn seeded_rng(&self) -> SmallRng {
        match self.rng_seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => SmallRng::seed_from_u64(rand::random()),
        }
    }
}
