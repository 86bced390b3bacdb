//! Generation loop: evaluate, select, reproduce, migrate, diversify.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::{EvaluationMode, EvolutionConfig};
use crate::island::{BreedingPlan, Individual, Island};
use crate::rollout::RolloutEvaluator;
use crate::EvolutionError;

/// Per-generation statistics handed to observers.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct GenerationReport {
    /// 1-based generation number.
    pub generation: usize,
    /// Best fitness observed in any generation so far.
    pub best_fitness: f64,
    /// Best fitness observed in this generation.
    pub generation_best: f64,
    /// Mean fitness across every island this generation.
    pub mean_fitness: f64,
    /// Whether diversity injection ran at the end of this generation.
    pub diversified: bool,
}

/// Receives a report after each generation.
pub trait GenerationObserver: Send {
    fn on_generation(&mut self, report: &GenerationReport);
}

/// No-op observer.
#[derive(Debug, Default)]
pub struct NullObserver;

impl GenerationObserver for NullObserver {
    fn on_generation(&mut self, _report: &GenerationReport) {}
}

/// Final result of a run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EvolutionOutcome {
    /// Best individual ever evaluated, with the fitness it scored at the time.
    pub best: Individual,
    /// Best-ever fitness after each generation.
    pub history: Vec<f64>,
}

/// Island-model genetic programming engine.
pub struct EvolutionEngine {
    config: EvolutionConfig,
    evaluator: RolloutEvaluator,
    islands: Vec<Island>,
    best: Individual,
    history: Vec<f64>,
    generation: usize,
    rng: SmallRng,
    observer: Box<dyn GenerationObserver>,
}

impl std::fmt::Debug for EvolutionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EvolutionEngine")
            .field("generation", &self.generation)
            .field("islands", &self.islands.len())
            .field("best_fitness", &self.best.fitness)
            .finish_non_exhaustive()
    }
}

impl EvolutionEngine {
    /// Validate the configuration and seed every island with random policies.
    pub fn new(config: EvolutionConfig) -> Result<Self, EvolutionError> {
        config.validate()?;
        let evaluator = RolloutEvaluator::new(config.rollout.clone())?;
        let mut rng = config.seeded_rng();
        let islands: Vec<Island> = (0..config.islands)
            .map(|_| Island::random(config.population_size, &mut rng, &config.tree))
            .collect();
        let best = islands
            .iter()
            .flat_map(|island| island.individuals().first())
            .next()
            .cloned()
            .ok_or(EvolutionError::InvalidConfig("population must not be empty"))?;

        Ok(Self {
            config,
            evaluator,
            islands,
            best,
            history: Vec::new(),
            generation: 0,
            rng,
            observer: Box::new(NullObserver),
        })
    }

    /// Attach an observer that receives every [`GenerationReport`].
    #[must_use]
    pub fn with_observer(mut self, observer: Box<dyn GenerationObserver>) -> Self {
        self.observer = observer;
        self
    }

    #[must_use]
    pub fn config(&self) -> &EvolutionConfig {
        &self.config
    }

    #[must_use]
    pub fn islands(&self) -> &[Island] {
        &self.islands
    }

    /// Best individual recorded so far (unevaluated before the first generation).
    #[must_use]
    pub const fn best(&self) -> &Individual {
        &self.best
    }

    #[must_use]
    pub fn history(&self) -> &[f64] {
        &self.history
    }

    /// Generations completed.
    #[must_use]
    pub const fn generation(&self) -> usize {
        self.generation
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.generation >= self.config.generations
    }

    /// Run one full generation.
    pub fn step(&mut self) -> GenerationReport {
        self.generation += 1;
        let (generation_best, mean_fitness) = self.evaluate();
        let best_fitness = self.best.fitness.unwrap_or(f64::NEG_INFINITY);
        self.history.push(best_fitness);

        self.reproduce();
        self.migrate();

        let interval = self.config.diversity_interval;
        let diversified = interval > 0 && self.generation % interval == 0;
        if diversified {
            self.diversify();
        }

        let report = GenerationReport {
            generation: self.generation,
            best_fitness,
            generation_best,
            mean_fitness,
            diversified,
        };
        info!(
            generation = report.generation,
            best_fitness = report.best_fitness,
            generation_best = report.generation_best,
            mean_fitness = report.mean_fitness,
            "generation complete"
        );
        self.observer.on_generation(&report);
        report
    }

    /// Run the remaining generations and return the best individual and history.
    pub fn run(mut self) -> EvolutionOutcome {
        while !self.is_finished() {
            self.step();
        }
        EvolutionOutcome {
            best: self.best,
            history: self.history,
        }
    }

    fn draw_seeds(&mut self, count: usize) -> Vec<u64> {
        (0..count).map(|_| self.rng.random()).collect()
    }

    /// Score every individual and update the best-ever record on strict improvement.
    /// Returns this generation's best and mean fitness.
    fn evaluate(&mut self) -> (f64, f64) {
        let total: usize = self.islands.iter().map(Island::len).sum();
        let seeds = self.draw_seeds(total);
        let evaluator = &self.evaluator;
        let jobs: Vec<(&mut Individual, u64)> = self
            .islands
            .iter_mut()
            .flat_map(|island| island.individuals_mut().iter_mut())
            .zip(seeds)
            .collect();

        let score = |(individual, seed): (&mut Individual, u64)| {
            let mut rng = SmallRng::seed_from_u64(seed);
            let evaluation = evaluator.evaluate(&individual.policy, &mut rng);
            individual.fitness = Some(evaluation.fitness);
        };
        match self.config.evaluation {
            EvaluationMode::Sequential => jobs.into_iter().for_each(score),
            EvaluationMode::Parallel => jobs.into_par_iter().for_each(score),
        }

        let sum: f64 = self
            .islands
            .iter()
            .flat_map(|island| island.individuals())
            .map(|individual| individual.fitness.unwrap_or(0.0))
            .sum();
        let mean = sum / total.max(1) as f64;
        let generation_best = self
            .islands
            .iter()
            .filter_map(Island::best)
            .max_by_key(|individual| individual.rank())
            .cloned();

        let Some(champion) = generation_best else {
            return (f64::NEG_INFINITY, mean);
        };
        let champion_fitness = champion.fitness.unwrap_or(f64::NEG_INFINITY);
        if champion.rank() > self.best.rank() {
            self.best = champion;
        }
        (champion_fitness, mean)
    }

    fn reproduce(&mut self) {
        let seeds = self.draw_seeds(self.islands.len());
        let plan = BreedingPlan {
            selection: self.config.selection,
            elite_fraction: self.config.elite_fraction,
            mutation_probability: self.config.mutation_probability,
            tree: &self.config.tree,
        };
        let breed = |(island, seed): (&mut Island, u64)| {
            island.reproduce(&mut SmallRng::seed_from_u64(seed), &plan);
        };
        match self.config.evaluation {
            EvaluationMode::Sequential => self.islands.iter_mut().zip(seeds).for_each(breed),
            EvaluationMode::Parallel => self.islands.par_iter_mut().zip(seeds).for_each(breed),
        }
    }

    /// Ring migration from a snapshot: island `i` sends its top members to `i + 1`.
    /// A lone island is its own successor.
    fn migrate(&mut self) {
        let count = self.islands.len();
        if count == 0 || self.config.migrants == 0 {
            return;
        }
        let emigrants: Vec<Vec<Individual>> = self
            .islands
            .iter()
            .map(|island| island.top(self.config.migrants))
            .collect();
        for (source, migrants) in emigrants.into_iter().enumerate() {
            self.islands[(source + 1) % count].receive(migrants);
        }
    }

    fn diversify(&mut self) {
        let seeds = self.draw_seeds(self.islands.len());
        let fraction = self.config.diversity_fraction;
        let tree = &self.config.tree;
        let inject = |(island, seed): (&mut Island, u64)| {
            island.diversify(fraction, &mut SmallRng::seed_from_u64(seed), tree)
        };
        let replaced: usize = match self.config.evaluation {
            EvaluationMode::Sequential => self.islands.iter_mut().zip(seeds).map(inject).sum(),
            EvaluationMode::Parallel => self.islands.par_iter_mut().zip(seeds).map(inject).sum(),
        };
        debug!(generation = self.generation, replaced, "injected random individuals");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rollout::RolloutConfig;
    use crate::selection::SelectionStrategy;
    use navbots_brain::TreeConfig;
    use navbots_core::ArenaConfig;

    fn small_config(evaluation: EvaluationMode) -> EvolutionConfig {
        EvolutionConfig {
            population_size: 8,
            islands: 3,
            generations: 4,
            diversity_interval: 2,
            diversity_fraction: 0.25,
            evaluation,
            tree: TreeConfig {
                max_depth: 3,
                ..TreeConfig::default()
            },
            rollout: RolloutConfig {
                episodes: 1,
                arena: ArenaConfig {
                    max_ticks: 120,
                    ..ArenaConfig::default()
                },
                ..RolloutConfig::default()
            },
            rng_seed: Some(0xD1CE),
            ..EvolutionConfig::default()
        }
    }

    #[test]
    fn island_sizes_are_invariant() {
        let mut engine = EvolutionEngine::new(small_config(EvaluationMode::Sequential)).expect("engine");
        for _ in 0..4 {
            engine.step();
            assert_eq!(engine.islands().len(), 3);
            assert!(engine.islands().iter().all(|island| island.len() == 8));
        }
        assert!(engine.is_finished());
    }

    #[test]
    fn best_record_never_decreases() {
        let engine = EvolutionEngine::new(small_config(EvaluationMode::Sequential)).expect("engine");
        let outcome = engine.run();
        assert_eq!(outcome.history.len(), 4);
        assert!(outcome.history.windows(2).all(|pair| pair[0] <= pair[1]));
        assert_eq!(outcome.best.fitness, outcome.history.last().copied());
        assert!(outcome.history[0] >= 1.0);
    }

    #[test]
    fn reports_mark_diversity_generations() {
        let mut engine = EvolutionEngine::new(small_config(EvaluationMode::Sequential)).expect("engine");
        let flags: Vec<bool> = (0..4).map(|_| engine.step().diversified).collect();
        assert_eq!(flags, vec![false, true, false, true]);
    }

    #[test]
    fn report_statistics_are_consistent() {
        let mut engine = EvolutionEngine::new(small_config(EvaluationMode::Sequential)).expect("engine");
        let report = engine.step();
        assert_eq!(report.generation, 1);
        assert!(report.generation_best <= report.best_fitness);
        assert!(report.mean_fitness <= report.generation_best);
        assert!(report.mean_fitness >= 1.0);
    }

    #[test]
    fn single_island_migrates_into_itself() {
        let config = EvolutionConfig {
            islands: 1,
            selection: SelectionStrategy::Roulette,
            ..small_config(EvaluationMode::Parallel)
        };
        let mut engine = EvolutionEngine::new(config).expect("engine");
        let report = engine.step();
        assert!(!report.diversified);

        // One elite survives reproduction; the top two then overwrite the last two slots.
        let members = engine.islands()[0].individuals();
        assert_eq!(members.len(), 8);
        assert!(members[0].fitness.is_some());
        assert_eq!(members[7], members[0]);
        assert_eq!(members[6], members[1]);
        assert!(members[1..6].iter().all(|member| member.fitness.is_none()));

        let outcome = engine.run();
        assert_eq!(outcome.history.len(), 4);
    }

    #[test]
    fn shallow_trees_evolve() {
        for max_depth in [0, 1] {
            let mut config = small_config(EvaluationMode::Sequential);
            config.tree.max_depth = max_depth;
            let engine = EvolutionEngine::new(config).expect("engine");
            assert!(
                engine
                    .islands()
                    .iter()
                    .flat_map(|island| island.individuals())
                    .all(|member| member.policy.acceleration.depth() <= max_depth)
            );
            let outcome = engine.run();
            assert_eq!(outcome.history.len(), 4);
            assert!(outcome.best.policy.acceleration.is_well_formed());
        }
    }

    #[test]
    fn invalid_configuration_is_rejected() {
        let config = EvolutionConfig {
            islands: 0,
            ..EvolutionConfig::default()
        };
        assert!(EvolutionEngine::new(config).is_err());
    }
}
