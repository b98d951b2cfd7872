//! Evolution parameters.
//!
//! Field names follow the usual NEAT configuration vocabulary so a tuned
//! configuration can be carried over from other NEAT implementations.

use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct NeatConfig {
    pub population_size: usize,
    /// Generations to run before stopping.
    pub generations: u64,
    /// Stop early once the best genome reaches this fitness.
    pub fitness_threshold: Option<f64>,
    pub num_inputs: usize,
    pub num_outputs: usize,
    /// Initial weights and biases are drawn from `-weight_init_range..weight_init_range`.
    pub weight_init_range: f32,
    /// Weights and biases are clamped to `-weight_limit..=weight_limit`.
    pub weight_limit: f32,
    pub weight_mutate_rate: f32,
    pub weight_mutate_power: f32,
    pub weight_replace_rate: f32,
    pub bias_mutate_rate: f32,
    pub bias_mutate_power: f32,
    pub conn_add_prob: f32,
    pub conn_delete_prob: f32,
    pub node_add_prob: f32,
    pub enabled_mutate_rate: f32,
    pub compatibility_threshold: f32,
    pub compatibility_disjoint_coefficient: f32,
    pub compatibility_weight_coefficient: f32,
    /// Best genomes of each species copied unchanged into the next generation.
    pub elitism: usize,
    /// Fraction of each species allowed to breed.
    pub survival_threshold: f32,
    /// Generations without improvement before a species is dropped.
    pub max_stagnation: u64,
    /// Number of top species protected from stagnation removal.
    pub species_elitism: usize,
}

impl Default for NeatConfig {
    fn default() -> Self {
        Self {
            population_size: 50,
            generations: 50,
            fitness_threshold: None,
            num_inputs: 3,
            num_outputs: 2,
            weight_init_range: 1.0,
            weight_limit: 30.0,
            weight_mutate_rate: 0.8,
            weight_mutate_power: 0.5,
            weight_replace_rate: 0.1,
            bias_mutate_rate: 0.7,
            bias_mutate_power: 0.5,
            conn_add_prob: 0.5,
            conn_delete_prob: 0.5,
            node_add_prob: 0.2,
            enabled_mutate_rate: 0.01,
            compatibility_threshold: 3.0,
            compatibility_disjoint_coefficient: 1.0,
            compatibility_weight_coefficient: 0.5,
            elitism: 2,
            survival_threshold: 0.2,
            max_stagnation: 20,
            species_elitism: 2,
        }
    }
}

impl NeatConfig {
    /// Validates all evolution parameters.
    pub fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(self.population_size > 0, "Population size must be positive");
        anyhow::ensure!(
            self.population_size <= 10000,
            "Population size too large (max 10000)"
        );
        anyhow::ensure!(self.num_inputs > 0, "Network needs at least one input");
        anyhow::ensure!(self.num_outputs > 0, "Network needs at least one output");
        anyhow::ensure!(
            self.weight_init_range > 0.0,
            "Weight init range must be positive"
        );
        anyhow::ensure!(self.weight_limit > 0.0, "Weight limit must be positive");

        for (name, value) in [
            ("weight_mutate_rate", self.weight_mutate_rate),
            ("weight_replace_rate", self.weight_replace_rate),
            ("bias_mutate_rate", self.bias_mutate_rate),
            ("conn_add_prob", self.conn_add_prob),
            ("conn_delete_prob", self.conn_delete_prob),
            ("node_add_prob", self.node_add_prob),
            ("enabled_mutate_rate", self.enabled_mutate_rate),
            ("survival_threshold", self.survival_threshold),
        ] {
            anyhow::ensure!(
                (0.0..=1.0).contains(&value),
                "{} must be in [0.0, 1.0]",
                name
            );
        }

        anyhow::ensure!(
            self.weight_mutate_power >= 0.0 && self.bias_mutate_power >= 0.0,
            "Mutation power must be non-negative"
        );
        anyhow::ensure!(
            self.compatibility_threshold > 0.0,
            "Compatibility threshold must be positive"
        );
        Ok(())
    }
}
