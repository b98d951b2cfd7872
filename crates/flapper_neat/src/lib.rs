//! # Flapper NEAT
//!
//! NeuroEvolution of Augmenting Topologies, used by the game as a black box:
//! it hands out cohorts of genomes, expects a fitness to be written onto each
//! one, and breeds the next cohort.
//!
//! - `topology`: initial genomes, innovation ids, evaluation order
//! - `forward`: feed-forward evaluation of a genome
//! - `mutation` / `crossover`: variation operators
//! - `species`: compatibility distance and speciation
//! - `population`: selection, stagnation and reproduction
//! - `reporter`: per-generation statistics
//!
//! ## Example
//!
//! ```
//! use flapper_neat::{GenomeLogic, NeatConfig, Population};
//!
//! let config = NeatConfig::default();
//! let mut population = Population::new(config, Some(7)).unwrap();
//! for genome in population.genomes_mut() {
//!     let outputs = genome.forward(&[1.0, 0.5, -0.5]);
//!     genome.fitness = Some(f64::from(outputs[0]));
//! }
//! population.advance().unwrap();
//! assert_eq!(population.generation, 1);
//! ```

pub mod config;
pub mod crossover;
pub mod forward;
pub mod mutation;
pub mod population;
pub mod reporter;
pub mod species;
pub mod topology;

pub use config::NeatConfig;
pub use flapper_data::{Activations, Connection, Genome, GenomeKey, Node, NodeType};
pub use population::Population;
pub use reporter::{GenerationStatistics, StatisticsReporter};
pub use species::{Species, SpeciesSet};

use rand::Rng;

/// Operations every NEAT genome supports.
pub trait GenomeLogic {
    fn new_random_with_rng<R: Rng>(key: GenomeKey, config: &NeatConfig, rng: &mut R) -> Self;

    /// Evaluates the network, allocating fresh buffers.
    #[must_use]
    fn forward(&self, inputs: &[f32]) -> Vec<f32>;

    /// Evaluates the network reusing caller-owned buffers.
    fn forward_internal(
        &self,
        inputs: &[f32],
        activations: &mut Activations,
        outputs: &mut Vec<f32>,
    );

    fn mutate<R: Rng>(&mut self, config: &NeatConfig, rng: &mut R);

    /// Child of `self` (the fitter parent) and `other`.
    fn crossover_with_rng<R: Rng>(&self, other: &Genome, child_key: GenomeKey, rng: &mut R)
        -> Genome;

    fn distance(&self, other: &Genome, config: &NeatConfig) -> f32;

    /// Rebuilds the evaluation caches. Must be called after any structural edit.
    fn initialize_node_idx_map(&mut self);
}

impl GenomeLogic for Genome {
    fn new_random_with_rng<R: Rng>(key: GenomeKey, config: &NeatConfig, rng: &mut R) -> Self {
        topology::create_genome_random_with_rng(key, config, rng)
    }

    fn forward(&self, inputs: &[f32]) -> Vec<f32> {
        forward::forward(self, inputs)
    }

    fn forward_internal(
        &self,
        inputs: &[f32],
        activations: &mut Activations,
        outputs: &mut Vec<f32>,
    ) {
        forward::forward_internal(self, inputs, activations, outputs)
    }

    fn mutate<R: Rng>(&mut self, config: &NeatConfig, rng: &mut R) {
        mutation::mutate(self, config, rng)
    }

    fn crossover_with_rng<R: Rng>(
        &self,
        other: &Genome,
        child_key: GenomeKey,
        rng: &mut R,
    ) -> Genome {
        crossover::genome_crossover_with_rng(self, other, child_key, rng)
    }

    fn distance(&self, other: &Genome, config: &NeatConfig) -> f32 {
        species::compatibility_distance(self, other, config)
    }

    fn initialize_node_idx_map(&mut self) {
        topology::initialize_node_idx_map(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_innovation_id_determinism() {
        let id1 = topology::get_innovation_id(10, 20);
        let id2 = topology::get_innovation_id(10, 20);
        let id3 = topology::get_innovation_id(20, 10);
        assert_eq!(id1, id2);
        assert_ne!(id1, id3);
    }

    #[test]
    fn test_split_node_id_determinism() {
        let id1 = topology::get_split_node_id(5, 15);
        let id2 = topology::get_split_node_id(5, 15);
        let id3 = topology::get_split_node_id(15, 5);
        assert_eq!(id1, id2);
        assert_ne!(id1, id3);
        assert!(id1 >= 1000);
    }

    #[test]
    fn test_new_random_creates_valid_genome() {
        let config = NeatConfig::default();
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let genome = Genome::new_random_with_rng(1, &config, &mut rng);

        assert_eq!(genome.input_count(), config.num_inputs);
        assert_eq!(genome.output_count(), config.num_outputs);
        assert_eq!(genome.hidden_count(), 0);
        assert_eq!(
            genome.enabled_connections(),
            config.num_inputs * config.num_outputs,
            "Initial topology should be fully connected"
        );
    }

    #[test]
    fn test_crossover_keeps_connections_anchored() {
        let config = NeatConfig::default();
        let mut rng = ChaCha8Rng::seed_from_u64(456);
        let mut p1 = Genome::new_random_with_rng(1, &config, &mut rng);
        let mut p2 = Genome::new_random_with_rng(2, &config, &mut rng);
        for _ in 0..20 {
            p1.mutate(&config, &mut rng);
            p2.mutate(&config, &mut rng);
        }

        let child = p1.crossover_with_rng(&p2, 3, &mut rng);
        assert_eq!(child.key, 3);
        for conn in &child.connections {
            assert!(
                child.nodes.iter().any(|n| n.id == conn.from),
                "Connection from {} has no source node",
                conn.from
            );
            assert!(
                child.nodes.iter().any(|n| n.id == conn.to),
                "Connection to {} has no target node",
                conn.to
            );
        }
    }

    #[test]
    fn test_hex_roundtrip_preserves_outputs() {
        let config = NeatConfig::default();
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let genome = Genome::new_random_with_rng(9, &config, &mut rng);

        let mut restored = Genome::from_hex(&genome.to_hex()).expect("Should deserialize");
        restored.initialize_node_idx_map();

        let inputs = [120.0, -15.0, 40.0];
        assert_eq!(genome.forward(&inputs), restored.forward(&inputs));
    }
}
