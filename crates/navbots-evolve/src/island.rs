//! Individuals and the fixed-size sub-populations that hold them.

use navbots_brain::{Policy, TreeConfig};
use ordered_float::OrderedFloat;
use rand::RngCore;
use rand::seq::index;
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;

use crate::selection::SelectionStrategy;

/// A policy and the fitness assigned by its latest evaluation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Individual {
    pub policy: Policy,
    /// `None` until the engine evaluates this individual.
    pub fitness: Option<f64>,
}

impl Individual {
    #[must_use]
    pub const fn new(policy: Policy) -> Self {
        Self {
            policy,
            fitness: None,
        }
    }

    #[must_use]
    pub fn random(rng: &mut dyn RngCore, tree: &TreeConfig) -> Self {
        Self::new(Policy::random(rng, tree))
    }

    /// Ordering key; unevaluated individuals rank below every score.
    #[must_use]
    pub fn rank(&self) -> OrderedFloat<f64> {
        OrderedFloat(self.fitness.unwrap_or(f64::NEG_INFINITY))
    }
}

/// Parameters an island needs to breed its next generation.
#[derive(Debug, Clone, Copy)]
pub struct BreedingPlan<'a> {
    pub selection: SelectionStrategy,
    pub elite_fraction: f64,
    pub mutation_probability: f64,
    pub tree: &'a TreeConfig,
}

/// Isolated sub-population. Its size never changes after construction.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Island {
    individuals: Vec<Individual>,
}

impl Island {
    #[must_use]
    pub fn random(size: usize, rng: &mut dyn RngCore, tree: &TreeConfig) -> Self {
        Self {
            individuals: (0..size).map(|_| Individual::random(rng, tree)).collect(),
        }
    }

    #[must_use]
    pub const fn from_individuals(individuals: Vec<Individual>) -> Self {
        Self { individuals }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.individuals.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.individuals.is_empty()
    }

    #[must_use]
    pub fn individuals(&self) -> &[Individual] {
        &self.individuals
    }

    /// Mutable access to members; the slice length cannot change.
    pub fn individuals_mut(&mut self) -> &mut [Individual] {
        &mut self.individuals
    }

    /// Indices ordered fittest first. Ties keep their original order.
    #[must_use]
    pub fn ranked(&self) -> Vec<usize> {
        let mut order: Vec<usize> = (0..self.individuals.len()).collect();
        order.sort_by_key(|&index| Reverse(self.individuals[index].rank()));
        order
    }

    /// Fittest evaluated member.
    #[must_use]
    pub fn best(&self) -> Option<&Individual> {
        self.individuals
            .iter()
            .filter(|individual| individual.fitness.is_some())
            .max_by_key(|individual| individual.rank())
    }

    /// Clones of the `count` fittest members.
    #[must_use]
    pub fn top(&self, count: usize) -> Vec<Individual> {
        self.ranked()
            .into_iter()
            .take(count)
            .map(|index| self.individuals[index].clone())
            .collect()
    }

    /// Replace the population with elites plus mutated offspring of the selection pool.
    pub fn reproduce(&mut self, rng: &mut dyn RngCore, plan: &BreedingPlan<'_>) {
        let size = self.individuals.len();
        if size == 0 {
            return;
        }
        let elite_count = ((plan.elite_fraction * size as f64).floor() as usize).clamp(1, size);
        let pool = plan.selection.select(&self.individuals, rng);

        let mut next = self.top(elite_count);
        while next.len() < size {
            let mut child = if pool.len() >= 2 {
                let parents = index::sample(rng, pool.len(), 2);
                let mother = &self.individuals[pool[parents.index(0)]].policy;
                let father = &self.individuals[pool[parents.index(1)]].policy;
                mother.crossover(father, rng)
            } else {
                self.individuals[pool[0]].policy.clone()
            };
            child.mutate(rng, plan.mutation_probability, plan.tree);
            next.push(Individual::new(child));
        }
        self.individuals = next;
    }

    /// Overwrite the lowest-ranked slots with `migrants`.
    ///
    /// Among equally ranked slots the later ones are overwritten first.
    pub fn receive(&mut self, migrants: Vec<Individual>) {
        let mut order: Vec<usize> = (0..self.individuals.len()).collect();
        order.sort_by_key(|&index| (self.individuals[index].rank(), Reverse(index)));
        for (slot, migrant) in order.into_iter().zip(migrants) {
            self.individuals[slot] = migrant;
        }
    }

    /// Replace the worst `floor(fraction * len)` members with random newcomers.
    /// Returns how many were replaced.
    pub fn diversify(&mut self, fraction: f64, rng: &mut dyn RngCore, tree: &TreeConfig) -> usize {
        let count = ((fraction * self.individuals.len() as f64).floor() as usize)
            .min(self.individuals.len());
        let worst: Vec<usize> = self.ranked().into_iter().rev().take(count).collect();
        for index in &worst {
            self.individuals[*index] = Individual::random(rng, tree);
        }
        worst.len()
    }
}
