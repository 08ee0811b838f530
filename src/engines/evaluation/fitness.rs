use super::training::TrainingSet;
use crate::config::EvaluationConfig;
use crate::engines::generation::organism::Organism;
use crate::error::{GpError, Result};
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::cmp::Ordering;

/// Score of one prediction: the reciprocal of the absolute error, capped at
/// `ceiling`. An expected value of exactly zero is replaced by `zero_floor`
/// first. Non-finite errors score nothing.
pub fn case_fitness(expected: f64, actual: f64, ceiling: f64, zero_floor: f64) -> f64 {
    let expected = if expected == 0.0 { zero_floor } else { expected };
    let error = (expected - actual).abs();
    if !error.is_finite() {
        return 0.0;
    }
    if error == 0.0 {
        return ceiling;
    }
    (1.0 / error).min(ceiling)
}

/// Per-case scoring hook: `(expected, actual, config) -> score`.
pub type CaseFitnessFn = Box<dyn Fn(f64, f64, &EvaluationConfig) -> f64 + Send + Sync>;

/// [`case_fitness`] with the ceiling and zero floor taken from `config`.
pub fn default_case_fitness(expected: f64, actual: f64, config: &EvaluationConfig) -> f64 {
    case_fitness(
        expected,
        actual,
        config.max_case_fitness,
        config.zero_expected_floor,
    )
}

/// Sorts best first. Unscored organisms go last; ties keep their order.
pub fn rank_population<I>(population: &mut [Organism<I>]) {
    population.sort_by(|a, b| match (a.fitness(), b.fitness()) {
        (Some(x), Some(y)) => y.partial_cmp(&x).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
}

/// Runs organisms against the training set with two bounded pools: one
/// limiting organisms in flight, one limiting cases in flight.
pub struct FitnessEvaluator<I> {
    training_set: TrainingSet<I>,
    config: EvaluationConfig,
    case_fitness: CaseFitnessFn,
    organism_pool: ThreadPool,
    case_pool: ThreadPool,
}

impl<I: Send + Sync> FitnessEvaluator<I> {
    pub fn new(training_set: TrainingSet<I>, config: EvaluationConfig) -> Result<Self> {
        training_set.validate()?;

        let organism_pool = ThreadPoolBuilder::new()
            .num_threads(config.simultaneous_fitness_tests)
            .thread_name(|i| format!("pinnacle-organism-{}", i))
            .build()?;
        let case_pool = ThreadPoolBuilder::new()
            .num_threads(config.simultaneous_fitness_calculations)
            .thread_name(|i| format!("pinnacle-case-{}", i))
            .build()?;

        log::debug!(
            "Fitness evaluator ready: {} organisms x {} cases in flight, {:?}",
            config.simultaneous_fitness_tests,
            config.simultaneous_fitness_calculations,
            training_set
        );

        Ok(Self {
            training_set,
            config,
            case_fitness: Box::new(default_case_fitness),
            organism_pool,
            case_pool,
        })
    }

    pub fn config(&self) -> &EvaluationConfig {
        &self.config
    }

    pub fn training_set(&self) -> &TrainingSet<I> {
        &self.training_set
    }

    /// Replaces the per-case scoring. The organism score stays the mean.
    pub fn set_case_fitness(&mut self, case_fitness: CaseFitnessFn) {
        self.case_fitness = case_fitness;
    }

    /// Mean case fitness of `organism`. The score is stored on the organism
    /// and returned. Case results are gathered in input order, so the mean
    /// does not depend on scheduling.
    pub fn test_organism(&self, organism: &mut Organism<I>) -> Result<f64> {
        let candidate: &Organism<I> = organism;
        let fitness = self.training_set.with_cases(|cases| {
            let scores = self
                .case_pool
                .install(|| {
                    cases
                        .par_iter()
                        .map(|case| {
                            candidate.execute(&case.input).map(|actual| {
                                (self.case_fitness)(case.expected, actual, &self.config)
                            })
                        })
                        .collect::<anyhow::Result<Vec<f64>>>()
                })
                .map_err(|e| GpError::Evaluation {
                    organism: candidate.to_string(),
                    message: format!("{:#}", e),
                })?;
            Ok(scores.iter().sum::<f64>() / scores.len() as f64)
        })?;

        log::trace!("{} {} scored {:.6}", organism.id(), organism, fitness);
        organism.set_fitness(fitness);
        Ok(fitness)
    }

    /// Scores every organism. With `skip_scored`, organisms that already
    /// carry a fitness keep it.
    pub fn score_population(&self, population: &mut [Organism<I>], skip_scored: bool) -> Result<()> {
        // An organism worker waiting on the case pool steals queued siblings,
        // so the pool size alone does not cap organisms in flight. Batches do.
        for batch in population.chunks_mut(self.config.simultaneous_fitness_tests) {
            self.organism_pool.install(|| {
                batch.par_iter_mut().try_for_each(|organism| {
                    if skip_scored && organism.fitness().is_some() {
                        return Ok(());
                    }
                    self.test_organism(organism).map(|_| ())
                })
            })?;
        }
        Ok(())
    }
}
