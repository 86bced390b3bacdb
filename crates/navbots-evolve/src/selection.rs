//! Parent selection strategies.

use rand::seq::index;
use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::island::Individual;

/// How an island fills its selection pool.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum SelectionStrategy {
    /// Sample `size` distinct individuals and keep the fittest.
    Tournament { size: usize },
    /// Fitness-proportional draw.
    Roulette,
}

impl Default for SelectionStrategy {
    fn default() -> Self {
        Self::Tournament { size: 3 }
    }
}

impl SelectionStrategy {
    /// Draw a pool of `population.len()` indices into `population`.
    pub fn select(&self, population: &[Individual], rng: &mut dyn RngCore) -> Vec<usize> {
        if population.is_empty() {
            return Vec::new();
        }
        match *self {
            Self::Tournament { size } => (0..population.len())
                .map(|_| tournament(population, size, rng))
                .collect(),
            Self::Roulette => roulette(population, rng),
        }
    }
}

fn tournament(population: &[Individual], size: usize, rng: &mut dyn RngCore) -> usize {
    let size = size.clamp(1, population.len());
    index::sample(rng, population.len(), size)
        .into_iter()
        .max_by_key(|&candidate| population[candidate].rank())
        .unwrap_or(0)
}

fn roulette(population: &[Individual], rng: &mut dyn RngCore) -> Vec<usize> {
    let weights: Vec<f64> = population
        .iter()
        .map(|individual| individual.fitness.unwrap_or(0.0).max(0.0))
        .collect();
    let total: f64 = weights.iter().sum();
    if !total.is_finite() || total <= 0.0 {
        warn!(total, "roulette wheel has no positive fitness; drawing uniformly");
        return (0..population.len())
            .map(|_| rng.random_range(0..population.len()))
            .collect();
    }

    let last = population.len() - 1;
    (0..population.len())
        .map(|_| {
            let pick = rng.random_range(0.0..total);
            let mut cumulative = 0.0;
            weights
                .iter()
                .position(|weight| {
                    cumulative += weight;
                    cumulative > pick
                })
                .unwrap_or(last)
        })
        .collect()
}
