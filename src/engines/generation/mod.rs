pub mod node;
pub mod sexpr;
pub mod organism;
pub mod generator;
pub mod operators;
pub mod mutation;
pub mod progress;
pub mod evolution_engine;

pub use node::{Node, NodeKind};
pub use organism::{Organism, OrganismSnapshot};
pub use generator::{TreeGenerator, UNBOUNDED_ARITY_SPREAD};
pub use operators::{crossover, selection_weight, MatingPool, SELECTION_EPSILON};
pub use mutation::{MutationKind, Mutator};
pub use progress::{
    ChannelProgressCallback, ConsoleProgressCallback, GenerationControl, GenerationReport,
    ProgressCallback, ProgressMessage,
};
pub use evolution_engine::{
    default_end_condition, EndConditionFn, EvolutionEngine, GenerationState, RankFn, RunSummary,
    StopReason,
};
