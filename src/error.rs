use thiserror::Error;

#[derive(Error, Debug)]
pub enum GpError {
    #[error("Unknown primitive: {0}")]
    UnknownPrimitive(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Palette error: {0}")]
    Palette(String),

    #[error("Evaluation error in organism {organism}: {message}")]
    Evaluation { organism: String, message: String },

    #[error("Training set error: {0}")]
    TrainingSet(String),

    #[error("Population overflow: {size} carried-over organisms exceed the population size of {limit}")]
    PopulationOverflow { size: usize, limit: usize },

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Thread pool error: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serde error: {0}")]
    Serde(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, GpError>;
