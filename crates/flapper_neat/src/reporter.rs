use flapper_data::Genome;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationStatistics {
    pub generation: u64,
    pub population_size: usize,
    pub species_count: usize,
    pub best_fitness: f64,
    pub mean_fitness: f64,
    pub stdev_fitness: f64,
}

impl GenerationStatistics {
    /// Statistics over the genomes that carry a fitness. Unevaluated genomes are skipped.
    #[must_use]
    pub fn compute(generation: u64, genomes: &[Genome], species_count: usize) -> Self {
        let scored: Vec<f64> = genomes.iter().filter_map(|g| g.fitness).collect();

        let best = scored.iter().copied().max_by(f64::total_cmp);
        let n = scored.len().max(1) as f64;
        let mean = scored.iter().sum::<f64>() / n;
        let variance = scored.iter().map(|f| (f - mean).powi(2)).sum::<f64>() / n;

        Self {
            generation,
            population_size: genomes.len(),
            species_count,
            best_fitness: best.unwrap_or(0.0),
            mean_fitness: mean,
            stdev_fitness: variance.sqrt(),
        }
    }
}

/// Keeps per-generation statistics and logs a line for each generation.
#[derive(Debug, Clone, Default)]
pub struct StatisticsReporter {
    history: Vec<GenerationStatistics>,
}

impl StatisticsReporter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, stats: GenerationStatistics) {
        tracing::info!(
            generation = stats.generation,
            best = stats.best_fitness,
            mean = stats.mean_fitness,
            stdev = stats.stdev_fitness,
            species = stats.species_count,
            "Generation evaluated"
        );
        self.history.push(stats);
    }

    #[must_use]
    pub fn history(&self) -> &[GenerationStatistics] {
        &self.history
    }

    #[must_use]
    pub fn latest(&self) -> Option<&GenerationStatistics> {
        self.history.last()
    }

    #[must_use]
    pub fn best_fitness_history(&self) -> Vec<f64> {
        self.history.iter().map(|s| s.best_fitness).collect()
    }

    #[must_use]
    pub fn mean_fitness_history(&self) -> Vec<f64> {
        self.history.iter().map(|s| s.mean_fitness).collect()
    }
}
