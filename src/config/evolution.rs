use super::traits::{check_rate, ConfigManifest, ConfigSection, FieldManifest};
use crate::error::GpError;
use serde::{Deserialize, Serialize};
use serde_json::json;

/// Tunables of the generation loop and its operators.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EvolutionConfig {
    pub population_size: usize,
    /// Depth beyond which the grow method only picks terminals.
    pub max_node_generation_depth: usize,
    /// Stop once this many generations have been scored.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation_limit: Option<usize>,
    /// Stop once the best organism reaches this fitness.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_on_accuracy: Option<f64>,
    /// Top organisms carried unchanged into the next generation.
    pub organism_survival: usize,
    pub recalculate_survivor_fitness: bool,
    /// Mate only within the top K organisms.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crossover_rank_limit: Option<usize>,
    pub generate_random_children_on_crossover: usize,
    pub crossover_terminal_selection_rate: f64,
    pub crossover_function_selection_rate: f64,
    pub mutation_rate: f64,
    pub mutation_replacement_rate: f64,
    pub mutation_addition_rate: f64,
    pub mutation_deletion_rate: f64,
    /// Insert added subtrees at a random position instead of appending.
    pub mutation_add_mixed_placement: bool,
    pub mutation_attempt_limit: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

impl Default for EvolutionConfig {
    fn default() -> Self {
        Self {
            population_size: 25,
            max_node_generation_depth: 5,
            generation_limit: Some(50),
            end_on_accuracy: None,
            organism_survival: 0,
            recalculate_survivor_fitness: false,
            crossover_rank_limit: None,
            generate_random_children_on_crossover: 2,
            // Koza's 10/90 split between leaves and inner nodes
            crossover_terminal_selection_rate: 0.1,
            crossover_function_selection_rate: 0.9,
            mutation_rate: 0.1,
            mutation_replacement_rate: 0.34,
            mutation_addition_rate: 0.33,
            mutation_deletion_rate: 0.33,
            mutation_add_mixed_placement: true,
            mutation_attempt_limit: 3,
            seed: None,
        }
    }
}

impl EvolutionConfig {
    /// Sets the terminal crossover rate; the functional rate becomes its
    /// complement.
    pub fn set_crossover_terminal_selection_rate(&mut self, rate: f64) {
        self.crossover_terminal_selection_rate = rate;
        self.crossover_function_selection_rate = 1.0 - rate;
    }

    pub fn set_crossover_function_selection_rate(&mut self, rate: f64) {
        self.crossover_function_selection_rate = rate;
        self.crossover_terminal_selection_rate = 1.0 - rate;
    }

    /// Probability of drawing a crossover point among terminals, with the
    /// two configured rates normalized against each other.
    pub fn terminal_crossover_probability(&self) -> f64 {
        let total = self.crossover_terminal_selection_rate + self.crossover_function_selection_rate;
        if total <= 0.0 {
            return 0.0;
        }
        self.crossover_terminal_selection_rate / total
    }
}

impl ConfigSection for EvolutionConfig {
    fn section_name() -> &'static str {
        "evolution"
    }

    fn validate(&self) -> Result<(), GpError> {
        if self.population_size < 2 {
            return Err(GpError::Configuration(
                "Population size must be at least 2".to_string(),
            ));
        }
        if self.max_node_generation_depth < 1 {
            return Err(GpError::Configuration(
                "Max node generation depth must be at least 1".to_string(),
            ));
        }
        if matches!(self.crossover_rank_limit, Some(limit) if limit < 2) {
            return Err(GpError::Configuration(
                "Crossover rank limit must leave at least 2 mating candidates".to_string(),
            ));
        }
        check_rate("Crossover terminal selection rate", self.crossover_terminal_selection_rate)?;
        check_rate("Crossover function selection rate", self.crossover_function_selection_rate)?;
        if self.crossover_terminal_selection_rate + self.crossover_function_selection_rate <= 0.0 {
            return Err(GpError::Configuration(
                "Crossover selection rates cannot both be zero".to_string(),
            ));
        }
        check_rate("Mutation rate", self.mutation_rate)?;
        check_rate("Mutation replacement rate", self.mutation_replacement_rate)?;
        check_rate("Mutation addition rate", self.mutation_addition_rate)?;
        check_rate("Mutation deletion rate", self.mutation_deletion_rate)?;
        if self.mutation_replacement_rate + self.mutation_addition_rate + self.mutation_deletion_rate
            <= 0.0
        {
            return Err(GpError::Configuration(
                "Mutation kind rates cannot all be zero".to_string(),
            ));
        }
        if self.mutation_attempt_limit == 0 {
            return Err(GpError::Configuration(
                "Mutation attempt limit must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    fn to_manifest(&self) -> ConfigManifest {
        let rate = (Some(0.0), Some(1.0));
        ConfigManifest {
            section: "Evolution".to_string(),
            fields: vec![
                FieldManifest::new(
                    "population_size",
                    "integer",
                    json!(25),
                    (Some(2.0), None),
                    "Number of organisms per generation",
                ),
                FieldManifest::new(
                    "max_node_generation_depth",
                    "integer",
                    json!(5),
                    (Some(1.0), None),
                    "Depth after which random trees only grow terminals",
                ),
                FieldManifest::new(
                    "generation_limit",
                    "integer",
                    json!(50),
                    (Some(1.0), None),
                    "Stop after this many generations (empty = never)",
                ),
                FieldManifest::new(
                    "end_on_accuracy",
                    "float",
                    serde_json::Value::Null,
                    (Some(0.0), None),
                    "Stop once the best fitness reaches this value",
                ),
                FieldManifest::new(
                    "organism_survival",
                    "integer",
                    json!(0),
                    (Some(0.0), None),
                    "Top organisms copied unchanged into the next generation",
                ),
                FieldManifest::new(
                    "crossover_rank_limit",
                    "integer",
                    serde_json::Value::Null,
                    (Some(2.0), None),
                    "Only the top K organisms may mate (empty = everyone)",
                ),
                FieldManifest::new(
                    "generate_random_children_on_crossover",
                    "integer",
                    json!(2),
                    (Some(0.0), None),
                    "Fresh random organisms injected each generation",
                ),
                FieldManifest::new(
                    "crossover_terminal_selection_rate",
                    "float",
                    json!(0.1),
                    rate,
                    "Chance of picking a terminal as crossover point",
                ),
                FieldManifest::new(
                    "mutation_rate",
                    "float",
                    json!(0.1),
                    rate,
                    "Chance that an offspring is mutated",
                ),
                FieldManifest::new(
                    "mutation_attempt_limit",
                    "integer",
                    json!(3),
                    (Some(1.0), None),
                    "Retries per mutation kind before falling back to another",
                ),
            ],
        }
    }
}
