//! Island-model genetic programming for NavBots policies.
//!
//! [`EvolutionEngine`] owns a ring of [`Island`]s. Each generation it scores
//! every [`Individual`] with the [`RolloutEvaluator`], breeds the next
//! population, migrates champions around the ring, and periodically injects
//! random newcomers.

pub mod config;
pub mod engine;
pub mod error;
pub mod island;
pub mod rollout;
pub mod selection;

pub use config::{EvaluationMode, EvolutionConfig};
pub use engine::{
    EvolutionEngine, EvolutionOutcome, GenerationObserver, GenerationReport, NullObserver,
};
pub use error::EvolutionError;
pub use island::{BreedingPlan, Individual, Island};
pub use rollout::{Evaluation, FitnessWeights, RolloutConfig, RolloutEvaluator};
pub use selection::SelectionStrategy;
