use super::traits::{ConfigManifest, ConfigSection, FieldManifest};
use crate::error::GpError;
use serde::{Deserialize, Serialize};
use serde_json::json;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluationConfig {
    /// Organisms scored concurrently.
    pub simultaneous_fitness_tests: usize,
    /// Training cases executed concurrently for one organism.
    pub simultaneous_fitness_calculations: usize,
    /// Score of an exact hit on one training case.
    pub max_case_fitness: f64,
    /// Stand-in for an expected output of exactly zero.
    pub zero_expected_floor: f64,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            simultaneous_fitness_tests: 10,
            simultaneous_fitness_calculations: 10,
            max_case_fitness: 1000.0,
            zero_expected_floor: 0.001,
        }
    }
}

impl ConfigSection for EvaluationConfig {
    fn section_name() -> &'static str {
        "evaluation"
    }

    fn validate(&self) -> Result<(), GpError> {
        if self.simultaneous_fitness_tests == 0 || self.simultaneous_fitness_calculations == 0 {
            return Err(GpError::Configuration(
                "Concurrency limits must be at least 1".to_string(),
            ));
        }
        if !self.max_case_fitness.is_finite() || self.max_case_fitness <= 0.0 {
            return Err(GpError::Configuration(
                "Max case fitness must be a positive finite number".to_string(),
            ));
        }
        if self.zero_expected_floor == 0.0 || !self.zero_expected_floor.is_finite() {
            return Err(GpError::Configuration(
                "Zero expected floor must be a finite non-zero number".to_string(),
            ));
        }
        Ok(())
    }

    fn to_manifest(&self) -> ConfigManifest {
        ConfigManifest {
            section: "Evaluation".to_string(),
            fields: vec![
                FieldManifest::new(
                    "simultaneous_fitness_tests",
                    "integer",
                    json!(10),
                    (Some(1.0), Some(512.0)),
                    "Organisms evaluated at once",
                ),
                FieldManifest::new(
                    "simultaneous_fitness_calculations",
                    "integer",
                    json!(10),
                    (Some(1.0), Some(512.0)),
                    "Training cases evaluated at once per organism",
                ),
                FieldManifest::new(
                    "max_case_fitness",
                    "float",
                    json!(1000.0),
                    (Some(1.0), None),
                    "Fitness ceiling for an exact prediction",
                ),
                FieldManifest::new(
                    "zero_expected_floor",
                    "float",
                    json!(0.001),
                    (None, None),
                    "Replaces an expected output of zero",
                ),
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(EvaluationConfig::default().validate().is_ok());
    }

    #[test]
    fn test_zero_concurrency_rejected() {
        let config = EvaluationConfig {
            simultaneous_fitness_tests: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_manifest_lists_fields() {
        let manifest = EvaluationConfig::default().to_manifest();
        assert_eq!(manifest.section, "Evaluation");
        assert_eq!(manifest.fields.len(), 4);
    }
}
