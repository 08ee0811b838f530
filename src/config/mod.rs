pub mod traits;
pub mod evolution;
pub mod evaluation;
pub mod manager;

pub use manager::{ConfigManager, AppConfig};
pub use evolution::EvolutionConfig;
pub use evaluation::EvaluationConfig;
pub use traits::{ConfigSection, ConfigManifest, FieldManifest};
