use super::{evaluation::EvaluationConfig, evolution::EvolutionConfig, traits::ConfigSection};
use crate::error::GpError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::{Arc, RwLock};

/// Environment variables with this prefix override file values, e.g.
/// `PINNACLE_EVOLUTION__POPULATION_SIZE=200`.
pub const ENV_PREFIX: &str = "PINNACLE";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub evolution: EvolutionConfig,
    pub evaluation: EvaluationConfig,
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), GpError> {
        self.evolution.validate()?;
        self.evaluation.validate()?;
        Ok(())
    }
}

pub struct ConfigManager {
    config: Arc<RwLock<AppConfig>>,
}

impl ConfigManager {
    pub fn new() -> Self {
        Self {
            config: Arc::new(RwLock::new(AppConfig::default())),
        }
    }

    /// Loads a TOML file layered under `PINNACLE_*` environment overrides.
    pub fn load_from_file<P: AsRef<Path>>(&self, path: P) -> Result<(), GpError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(GpError::Configuration(format!(
                "Failed to read config: {} does not exist",
                path.display()
            )));
        }

        let settings = config::Config::builder()
            .add_source(config::File::from(path).format(config::FileFormat::Toml))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| GpError::Configuration(format!("Failed to read config: {}", e)))?;

        let config: AppConfig = settings
            .try_deserialize()
            .map_err(|e| GpError::Configuration(format!("Failed to parse config: {}", e)))?;

        config.validate()?;

        *self.write_lock()? = config;
        Ok(())
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), GpError> {
        let toml_str = {
            let config = self.read_lock()?;
            toml::to_string_pretty(&*config)
                .map_err(|e| GpError::Configuration(format!("Failed to serialize: {}", e)))?
        };

        std::fs::write(path, toml_str)?;

        Ok(())
    }

    pub fn get(&self) -> Result<AppConfig, GpError> {
        Ok(self.read_lock()?.clone())
    }

    /// Applies `f` to a copy and only stores it when it validates.
    pub fn update<F>(&self, f: F) -> Result<(), GpError>
    where
        F: FnOnce(&mut AppConfig),
    {
        let mut config = self.write_lock()?;
        let mut candidate = config.clone();
        f(&mut candidate);
        candidate.validate()?;
        *config = candidate;
        Ok(())
    }

    fn read_lock(&self) -> Result<std::sync::RwLockReadGuard<'_, AppConfig>, GpError> {
        self.config
            .read()
            .map_err(|_| GpError::Configuration("Config lock poisoned".to_string()))
    }

    fn write_lock(&self) -> Result<std::sync::RwLockWriteGuard<'_, AppConfig>, GpError> {
        self.config
            .write()
            .map_err(|_| GpError::Configuration("Config lock poisoned".to_string()))
    }
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pinnacle.toml");

        let manager = ConfigManager::new();
        manager
            .update(|c| {
                c.evolution.population_size = 40;
                c.evolution.seed = Some(7);
                c.evaluation.simultaneous_fitness_tests = 4;
            })
            .unwrap();
        manager.save_to_file(&path).unwrap();

        let loaded = ConfigManager::new();
        loaded.load_from_file(&path).unwrap();
        let config = loaded.get().unwrap();
        assert_eq!(config.evolution.population_size, 40);
        assert_eq!(config.evolution.seed, Some(7));
        assert_eq!(config.evaluation.simultaneous_fitness_tests, 4);
        assert_eq!(config.evolution.end_on_accuracy, None);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("partial.toml");
        std::fs::write(&path, "[evolution]\nmutation_rate = 0.2\n").unwrap();

        let manager = ConfigManager::new();
        manager.load_from_file(&path).unwrap();
        let config = manager.get().unwrap();
        assert_eq!(config.evolution.mutation_rate, 0.2);
        assert_eq!(config.evolution.population_size, 25);
    }

    #[test]
    fn test_invalid_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "[evolution]\npopulation_size = 1\n").unwrap();

        let manager = ConfigManager::new();
        assert!(matches!(
            manager.load_from_file(&path),
            Err(GpError::Configuration(_))
        ));
        assert_eq!(manager.get().unwrap().evolution.population_size, 25);
    }

    #[test]
    fn test_invalid_update_leaves_config_untouched() {
        let manager = ConfigManager::new();
        assert!(manager.update(|c| c.evolution.mutation_rate = 2.0).is_err());
        assert_eq!(manager.get().unwrap().evolution.mutation_rate, 0.1);
    }

    #[test]
    fn test_save_into_missing_directory_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("pinnacle.toml");
        assert!(matches!(
            ConfigManager::new().save_to_file(&path),
            Err(GpError::Io(_))
        ));
    }

    #[test]
    fn test_missing_file() {
        let manager = ConfigManager::new();
        assert!(manager.load_from_file("/nonexistent/pinnacle.toml").is_err());
    }
}
