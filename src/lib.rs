pub mod config;
pub mod engines;
pub mod error;
pub mod functions;
pub mod types;

pub use config::{AppConfig, ConfigManager, EvaluationConfig, EvolutionConfig};
pub use engines::evaluation::{TrainingCase, TrainingSet};
pub use engines::generation::{
    EvolutionEngine, GenerationControl, GenerationReport, Node, Organism, OrganismSnapshot,
    ProgressCallback, RunSummary, StopReason,
};
pub use error::{GpError, Result};
pub use functions::Palette;
pub use types::{Arity, NodeId, OrganismId};
