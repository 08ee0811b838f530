pub mod fitness;
pub mod training;

pub use fitness::{
    case_fitness, default_case_fitness, rank_population, CaseFitnessFn, FitnessEvaluator,
};
pub use training::{TrainingCase, TrainingSet};
