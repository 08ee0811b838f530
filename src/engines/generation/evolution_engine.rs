use crate::config::{AppConfig, ConfigSection, EvaluationConfig, EvolutionConfig};
use crate::engines::evaluation::{rank_population, FitnessEvaluator, TrainingSet};
use crate::engines::generation::{
    generator::TreeGenerator,
    mutation::{MutationKind, Mutator},
    node::Node,
    operators::{crossover, MatingPool},
    organism::{Organism, OrganismSnapshot},
    progress::{GenerationControl, GenerationReport, ProgressCallback},
};
use crate::error::{GpError, Result};
use crate::functions::registry::Palette;
use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Where the generation loop stands. `step` moves it one transition on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationState {
    /// No population yet.
    Empty,
    /// A population exists but carries stale or missing scores.
    Seeded,
    /// Scored and ranked; the end conditions have not been checked.
    Scored,
    /// Not finished; the next population is about to be bred.
    Advancing,
    Terminated(StopReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StopReason {
    Accuracy,
    GenerationLimit,
    Callback,
    /// Reserved for custom end conditions.
    Condition,
}

/// Orders a freshly scored population. The first organism is taken as the
/// best.
pub type RankFn<I> = Box<dyn Fn(&mut [Organism<I>]) + Send + Sync>;

/// Decides after ranking whether the run is over:
/// `(config, generations scored, ranked population) -> reason`.
pub type EndConditionFn<I> =
    Box<dyn Fn(&EvolutionConfig, usize, &[Organism<I>]) -> Option<StopReason> + Send + Sync>;

/// Stops once the best fitness reaches `end_on_accuracy` or the generation
/// limit is hit, whichever is configured.
pub fn default_end_condition<I>(
    config: &EvolutionConfig,
    generation: usize,
    ranked: &[Organism<I>],
) -> Option<StopReason> {
    if let Some(target) = config.end_on_accuracy {
        if matches!(ranked.first().and_then(Organism::fitness), Some(best) if best >= target) {
            return Some(StopReason::Accuracy);
        }
    }
    match config.generation_limit {
        Some(limit) if generation >= limit => Some(StopReason::GenerationLimit),
        _ => None,
    }
}

/// Outcome of a finished run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub generations: usize,
    pub best: Option<OrganismSnapshot>,
    pub population_size: usize,
    pub stopped_by: StopReason,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl RunSummary {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

pub struct EvolutionEngine<I> {
    config: EvolutionConfig,
    palette: Palette<I>,
    evaluator: FitnessEvaluator<I>,
    ranking: RankFn<I>,
    end_condition: EndConditionFn<I>,
    mutator: Mutator,
    population: Vec<Organism<I>>,
    generation: usize,
    state: GenerationState,
    rng: StdRng,
}

impl<I: Send + Sync + 'static> EvolutionEngine<I> {
    pub fn new(
        config: EvolutionConfig,
        evaluation: EvaluationConfig,
        palette: Palette<I>,
        training_set: TrainingSet<I>,
    ) -> Result<Self> {
        config.validate()?;
        evaluation.validate()?;
        palette.validate()?;

        let evaluator = FitnessEvaluator::new(training_set, evaluation)?;
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Ok(Self {
            mutator: Mutator::new(&config),
            config,
            palette,
            evaluator,
            ranking: Box::new(rank_population::<I>),
            end_condition: Box::new(default_end_condition::<I>),
            population: Vec::new(),
            generation: 0,
            state: GenerationState::Empty,
            rng,
        })
    }

    pub fn from_app_config(
        app: &AppConfig,
        palette: Palette<I>,
        training_set: TrainingSet<I>,
    ) -> Result<Self> {
        Self::new(app.evolution.clone(), app.evaluation.clone(), palette, training_set)
    }

    /// Replaces the per-case score; see [`default_case_fitness`].
    ///
    /// [`default_case_fitness`]: crate::engines::evaluation::default_case_fitness
    pub fn with_case_fitness<F>(mut self, case_fitness: F) -> Self
    where
        F: Fn(f64, f64, &EvaluationConfig) -> f64 + Send + Sync + 'static,
    {
        self.evaluator.set_case_fitness(Box::new(case_fitness));
        self
    }

    /// Replaces the ranking. It must leave the best organism first.
    pub fn with_ranking<F>(mut self, ranking: F) -> Self
    where
        F: Fn(&mut [Organism<I>]) + Send + Sync + 'static,
    {
        self.ranking = Box::new(ranking);
        self
    }

    pub fn with_end_condition<F>(mut self, end_condition: F) -> Self
    where
        F: Fn(&EvolutionConfig, usize, &[Organism<I>]) -> Option<StopReason>
            + Send
            + Sync
            + 'static,
    {
        self.end_condition = Box::new(end_condition);
        self
    }

    pub fn config(&self) -> &EvolutionConfig {
        &self.config
    }

    pub fn palette(&self) -> &Palette<I> {
        &self.palette
    }

    pub fn population(&self) -> &[Organism<I>] {
        &self.population
    }

    /// Replaces the population; the next `step` scores it.
    pub fn set_population(&mut self, population: Vec<Organism<I>>) {
        self.state = if population.is_empty() {
            GenerationState::Empty
        } else {
            GenerationState::Seeded
        };
        self.population = population;
    }

    /// Highest ranked organism. Only meaningful once the population has
    /// been scored.
    pub fn best(&self) -> Option<&Organism<I>> {
        self.population.first()
    }

    /// Generations scored so far.
    pub fn generation(&self) -> usize {
        self.generation
    }

    pub fn state(&self) -> GenerationState {
        self.state
    }

    /// Drops the population and generation count so `run` can start over.
    /// The random stream continues where it was.
    pub fn reset(&mut self) {
        self.population.clear();
        self.generation = 0;
        self.state = GenerationState::Empty;
    }

    fn generator<'a>(
        palette: &'a Palette<I>,
        config: &EvolutionConfig,
    ) -> Result<TreeGenerator<'a, I>> {
        TreeGenerator::new(palette, config.max_node_generation_depth)
    }

    pub fn generate_random_node(&mut self, depth: usize) -> Result<Node<I>> {
        let generator = Self::generator(&self.palette, &self.config)?;
        Ok(generator.generate_node(depth, &mut self.rng))
    }

    pub fn generate_random_organism(&mut self) -> Result<Organism<I>> {
        let generator = Self::generator(&self.palette, &self.config)?;
        Ok(generator.generate_organism(&mut self.rng))
    }

    pub fn generate_random_population(&mut self) -> Result<Vec<Organism<I>>> {
        let generator = Self::generator(&self.palette, &self.config)?;
        Ok(generator.generate_population(self.config.population_size, &mut self.rng))
    }

    /// Scores one organism against the training set and stores the result
    /// on it.
    pub fn test_organism(&self, organism: &mut Organism<I>) -> Result<f64> {
        self.evaluator.test_organism(organism)
    }

    /// Scores the population, then ranks it best first. Survivors keep their
    /// score unless re-scoring is configured.
    pub fn calculate_population_fitness(&mut self) -> Result<()> {
        let skip_scored =
            self.config.organism_survival > 0 && !self.config.recalculate_survivor_fitness;
        self.evaluator
            .score_population(&mut self.population, skip_scored)?;
        (self.ranking)(&mut self.population);
        Ok(())
    }

    /// One roulette pick from the current mating pool.
    pub fn select(&mut self) -> Option<Organism<I>> {
        let pool = MatingPool::new(&self.population, self.config.crossover_rank_limit);
        pool.select(&mut self.rng).cloned()
    }

    pub fn crossover_mate(&mut self, recipient: &Organism<I>, donor: &Organism<I>) -> Organism<I> {
        crossover(
            recipient,
            donor,
            self.config.terminal_crossover_probability(),
            &mut self.rng,
        )
    }

    pub fn mutate_organism(&mut self, organism: &mut Organism<I>) -> Result<Option<MutationKind>> {
        let generator = Self::generator(&self.palette, &self.config)?;
        Ok(self.mutator.mutate(organism, &generator, &mut self.rng))
    }

    /// Next population: elite copies, fresh random organisms, then
    /// crossover offspring (some mutated) until the population is full.
    fn breed(&mut self) -> Result<Vec<Organism<I>>> {
        let size = self.config.population_size;
        let survivors = self.config.organism_survival.min(self.population.len());
        let fresh = self.config.generate_random_children_on_crossover;
        if survivors + fresh > size {
            return Err(GpError::PopulationOverflow {
                size: survivors + fresh,
                limit: size,
            });
        }

        let generator = Self::generator(&self.palette, &self.config)?;
        let mut next = Vec::with_capacity(size);
        next.extend(self.population[..survivors].iter().cloned());
        for _ in 0..fresh {
            next.push(generator.generate_organism(&mut self.rng));
        }

        let pool = MatingPool::new(&self.population, self.config.crossover_rank_limit);
        let terminal_probability = self.config.terminal_crossover_probability();
        let mut mutations = 0;
        while next.len() < size {
            let Some((recipient, donor)) = pool.select_pair(&mut self.rng) else {
                next.push(generator.generate_organism(&mut self.rng));
                continue;
            };
            let mut child = crossover(recipient, donor, terminal_probability, &mut self.rng);
            if self.rng.gen::<f64>() < self.config.mutation_rate
                && self
                    .mutator
                    .mutate(&mut child, &generator, &mut self.rng)
                    .is_some()
            {
                mutations += 1;
            }
            next.push(child);
        }

        log::debug!(
            "Bred generation {}: {} survivors, {} fresh, {} offspring ({} mutated)",
            self.generation + 1,
            survivors,
            fresh,
            size - survivors - fresh,
            mutations
        );
        Ok(next)
    }

    fn report(&self) -> GenerationReport {
        let scores: Vec<f64> = self.population.iter().filter_map(Organism::fitness).collect();
        let mean_fitness = if scores.is_empty() {
            None
        } else {
            Some(scores.iter().sum::<f64>() / scores.len() as f64)
        };
        let best = self.best();
        GenerationReport {
            generation: self.generation,
            best_fitness: best.and_then(Organism::fitness),
            mean_fitness,
            best_expression: best.map(ToString::to_string),
            population_size: self.population.len(),
        }
    }

    /// Performs one state transition and returns the new state.
    pub fn step<C: ProgressCallback + ?Sized>(&mut self, callback: &mut C) -> Result<GenerationState> {
        self.state = match self.state {
            GenerationState::Empty => {
                self.population = self.generate_random_population()?;
                GenerationState::Seeded
            }
            GenerationState::Seeded => {
                callback.on_generation_start(self.generation);
                self.calculate_population_fitness()?;
                self.generation += 1;
                GenerationState::Scored
            }
            GenerationState::Scored => match (self.end_condition)(
                &self.config,
                self.generation,
                &self.population,
            ) {
                Some(reason) => GenerationState::Terminated(reason),
                None => GenerationState::Advancing,
            },
            GenerationState::Advancing => match callback.on_generation_complete(&self.report()) {
                GenerationControl::Stop => GenerationState::Terminated(StopReason::Callback),
                GenerationControl::Continue => {
                    self.population = self.breed()?;
                    GenerationState::Seeded
                }
            },
            GenerationState::Terminated(reason) => GenerationState::Terminated(reason),
        };
        Ok(self.state)
    }

    /// Drives the loop until an end condition or the callback stops it.
    pub fn run<C: ProgressCallback + ?Sized>(&mut self, callback: &mut C) -> Result<RunSummary> {
        let started_at = Utc::now();
        log::info!(
            "Starting evolution: population {}, generation limit {:?}, target accuracy {:?}",
            self.config.population_size,
            self.config.generation_limit,
            self.config.end_on_accuracy
        );

        let stopped_by = loop {
            if let GenerationState::Terminated(reason) = self.step(callback)? {
                break reason;
            }
        };

        let summary = RunSummary {
            generations: self.generation,
            best: self.best().map(Organism::to_snapshot),
            population_size: self.population.len(),
            stopped_by,
            started_at,
            finished_at: Utc::now(),
        };
        log::info!(
            "Evolution finished after {} generations ({:?}); best fitness {:?}",
            summary.generations,
            summary.stopped_by,
            summary.best.as_ref().and_then(|best| best.fitness)
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engines::evaluation::TrainingCase;

    fn engine(config: EvolutionConfig) -> EvolutionEngine<f64> {
        let mut palette = Palette::new().with_arithmetic();
        palette.add_terminal("x", |x: &f64| Ok(*x)).add_constant(1.0);
        let cases: Vec<_> = (0..5)
            .map(|i| TrainingCase::new(i as f64, 2.0 * i as f64 + 1.0))
            .collect();
        let evaluation = EvaluationConfig {
            simultaneous_fitness_tests: 2,
            simultaneous_fitness_calculations: 2,
            ..Default::default()
        };
        EvolutionEngine::new(config, evaluation, palette, cases.into()).unwrap()
    }

    fn seeded(seed: u64) -> EvolutionConfig {
        EvolutionConfig {
            population_size: 8,
            generation_limit: Some(3),
            seed: Some(seed),
            ..Default::default()
        }
    }

    #[test]
    fn test_state_transitions() {
        let mut engine = engine(seeded(1));
        let mut callback = ();
        assert_eq!(engine.state(), GenerationState::Empty);
        assert_eq!(engine.step(&mut callback).unwrap(), GenerationState::Seeded);
        assert_eq!(engine.population().len(), 8);
        assert_eq!(engine.generation(), 0);

        assert_eq!(engine.step(&mut callback).unwrap(), GenerationState::Scored);
        assert_eq!(engine.generation(), 1);
        assert!(engine.population().iter().all(|o| o.fitness().is_some()));
        let scores: Vec<f64> = engine.population().iter().filter_map(Organism::fitness).collect();
        assert!(scores.windows(2).all(|w| w[0] >= w[1]));

        assert_eq!(engine.step(&mut callback).unwrap(), GenerationState::Advancing);
        assert_eq!(engine.step(&mut callback).unwrap(), GenerationState::Seeded);
        assert_eq!(engine.population().len(), 8);
    }

    #[test]
    fn test_run_stops_at_generation_limit() {
        let mut engine = engine(seeded(2));
        let summary = engine.run(&mut ()).unwrap();
        assert_eq!(summary.generations, 3);
        assert_eq!(summary.stopped_by, StopReason::GenerationLimit);
        assert_eq!(summary.population_size, 8);
        assert!(summary.best.is_some());
        assert_eq!(engine.step(&mut ()).unwrap(), GenerationState::Terminated(StopReason::GenerationLimit));
    }

    #[test]
    fn test_survivors_are_carried_over() {
        let mut engine = engine(EvolutionConfig {
            organism_survival: 2,
            ..seeded(3)
        });
        engine.step(&mut ()).unwrap();
        engine.step(&mut ()).unwrap();
        let elite: Vec<String> = engine.population()[..2].iter().map(ToString::to_string).collect();
        let elite_scores: Vec<_> = engine.population()[..2].iter().map(Organism::fitness).collect();

        engine.step(&mut ()).unwrap();
        engine.step(&mut ()).unwrap();
        let carried: Vec<String> = engine.population()[..2].iter().map(ToString::to_string).collect();
        assert_eq!(elite, carried);
        let carried_scores: Vec<_> = engine.population()[..2].iter().map(Organism::fitness).collect();
        assert_eq!(elite_scores, carried_scores);
        assert!(engine.population()[2..].iter().all(|o| o.fitness().is_none()));
    }

    #[test]
    fn test_overflow_is_an_error() {
        let mut engine = engine(EvolutionConfig {
            population_size: 4,
            organism_survival: 3,
            generate_random_children_on_crossover: 2,
            ..seeded(4)
        });
        assert!(matches!(
            engine.run(&mut ()),
            Err(GpError::PopulationOverflow { size: 5, limit: 4 })
        ));
    }

    #[test]
    fn test_custom_end_condition() {
        let mut engine = engine(EvolutionConfig {
            generation_limit: None,
            ..seeded(6)
        })
        .with_end_condition(|_, generation, ranked: &[Organism<f64>]| {
            assert!(ranked.iter().all(|o| o.fitness().is_some()));
            (generation >= 2).then_some(StopReason::Condition)
        });
        let summary = engine.run(&mut ()).unwrap();
        assert_eq!(summary.generations, 2);
        assert_eq!(summary.stopped_by, StopReason::Condition);
    }

    #[test]
    fn test_custom_ranking_picks_the_best() {
        // lowest score first
        let mut engine = engine(seeded(7)).with_ranking(|population: &mut [Organism<f64>]| {
            population.sort_by(|a, b| {
                a.fitness()
                    .partial_cmp(&b.fitness())
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
        });
        engine.step(&mut ()).unwrap();
        engine.step(&mut ()).unwrap();
        let scores: Vec<f64> = engine.population().iter().filter_map(Organism::fitness).collect();
        assert!(scores.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(engine.best().and_then(Organism::fitness), Some(scores[0]));
    }

    #[test]
    fn test_custom_case_fitness_drives_accuracy() {
        let mut engine = engine(EvolutionConfig {
            end_on_accuracy: Some(7.0),
            generation_limit: Some(10),
            ..seeded(8)
        })
        .with_case_fitness(|_, _, _: &EvaluationConfig| 7.0);
        let summary = engine.run(&mut ()).unwrap();
        assert_eq!(summary.stopped_by, StopReason::Accuracy);
        assert_eq!(summary.generations, 1);
        assert_eq!(summary.best.and_then(|best| best.fitness), Some(7.0));
    }

    #[test]
    fn test_summary_serializes() {
        let mut engine = engine(seeded(9));
        let json = engine.run(&mut ()).unwrap().to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["generations"], 3);
        assert_eq!(value["stopped_by"], "GenerationLimit");
    }

    #[test]
    fn test_reset_starts_over() {
        let mut engine = engine(seeded(5));
        engine.run(&mut ()).unwrap();
        engine.reset();
        assert_eq!(engine.state(), GenerationState::Empty);
        assert_eq!(engine.generation(), 0);
        assert_eq!(engine.run(&mut ()).unwrap().generations, 3);
    }
}
