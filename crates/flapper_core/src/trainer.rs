//! Drives the neuroevolution loop: one [`Generation`] per cohort, fitness
//! written back to the population, next cohort bred.

use crate::config::AppConfig;
use crate::decision::{InputState, NeuralPolicy};
use crate::runner::{Generation, GenerationResult};
use crate::telemetry::TelemetrySink;
use flapper_data::{GenerationSummary, Genome, SessionMode};
use flapper_neat::Population;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::sync::atomic::{AtomicBool, Ordering};

pub struct Trainer {
    config: AppConfig,
    population: Population,
    /// Completed generations. Starts at 0.
    generation: u64,
    fingerprint: String,
    rng: ChaCha8Rng,
}

impl Trainer {
    pub fn new(config: AppConfig) -> anyhow::Result<Self> {
        config.validate()?;
        let population = Population::new(config.evolution.clone(), config.seed)?;
        let rng = match config.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed.wrapping_add(0x9E37_79B9)),
            None => ChaCha8Rng::from_entropy(),
        };
        let fingerprint = config.fingerprint();
        Ok(Self {
            config,
            population,
            generation: 0,
            fingerprint,
            rng,
        })
    }

    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    #[must_use]
    pub fn population(&self) -> &Population {
        &self.population
    }

    #[must_use]
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Best genome seen so far, with its fitness.
    #[must_use]
    pub fn champion(&self) -> Option<&Genome> {
        self.population.best.as_ref()
    }

    /// Generation in which the champion was evaluated.
    #[must_use]
    pub fn champion_generation(&self) -> Option<u64> {
        self.population.best_generation
    }

    #[must_use]
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// True once the generation budget is spent or the fitness threshold is met.
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.generation >= self.config.evolution.generations || self.population.fitness_reached()
    }

    /// Builds the next cohort as a ready-to-tick generation and opens its session.
    pub fn begin_generation(
        &mut self,
        sink: &dyn TelemetrySink,
    ) -> anyhow::Result<Generation<NeuralPolicy>> {
        let deciders = self
            .population
            .genomes()
            .iter()
            .map(|g| (Some(g.key), NeuralPolicy::new(g.clone())))
            .collect();
        let rng = ChaCha8Rng::seed_from_u64(self.rng.gen());
        let mut generation = Generation::new(
            &self.config,
            self.generation,
            SessionMode::Training,
            deciders,
            rng,
        )?;
        generation.start(sink, &self.fingerprint);
        tracing::debug!(
            generation = self.generation,
            agents = self.population.genomes().len(),
            "Generation started"
        );
        Ok(generation)
    }

    /// Writes fitness back, reports the generation and breeds the next cohort.
    ///
    /// Returns true when training is over.
    pub fn complete_generation(
        &mut self,
        result: &GenerationResult,
        sink: &dyn TelemetrySink,
    ) -> anyhow::Result<bool> {
        anyhow::ensure!(
            result.index == self.generation,
            "Result for generation {} does not match current generation {}",
            result.index,
            self.generation
        );

        for agent in &result.fitness {
            if let Some(key) = agent.key {
                if !self.population.set_fitness(key, agent.fitness) {
                    tracing::warn!(key, "Fitness reported for unknown genome");
                }
            }
        }

        let summary = GenerationSummary {
            session_id: result.session_id,
            generation: self.generation,
            average_fitness: result.average_fitness(),
            max_fitness: result.max_fitness(),
            agent_count: result.fitness.len(),
        };
        sink.generation_finished(&summary);
        tracing::info!(
            generation = self.generation,
            max_fitness = summary.max_fitness,
            average_fitness = summary.average_fitness,
            ticks = result.ticks,
            obstacles_passed = result.obstacles_passed,
            "Generation finished"
        );

        let solved = self.population.advance()?;
        self.generation += 1;
        Ok(solved || self.is_done())
    }

    /// Runs generations until done or `shutdown` is raised. An interrupted
    /// generation is closed but its partial fitness is not used for breeding.
    pub fn run(
        &mut self,
        sink: &dyn TelemetrySink,
        shutdown: &AtomicBool,
    ) -> anyhow::Result<Option<Genome>> {
        let input = InputState::default();
        while !self.is_done() {
            let mut generation = self.begin_generation(sink)?;
            while !generation.is_finished() {
                if shutdown.load(Ordering::Relaxed) {
                    generation.finish(sink);
                    tracing::info!(generation = self.generation, "Training interrupted");
                    return Ok(self.champion().cloned());
                }
                generation.tick(&input, sink);
            }
            let result = generation.finish(sink);
            if self.complete_generation(&result, sink)? {
                break;
            }
        }
        Ok(self.champion().cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry::{MemoryTelemetry, NullTelemetry};

    fn small_config() -> AppConfig {
        let mut config = AppConfig::default();
        config.seed = Some(42);
        config.evolution.population_size = 8;
        config.evolution.generations = 3;
        config.simulation.max_ticks_per_generation = Some(2_000);
        config.telemetry.record_actions = false;
        config
    }

    #[test]
    fn test_generation_index_increments_by_one() {
        let mut trainer = Trainer::new(small_config()).expect("valid config");
        assert_eq!(trainer.generation(), 0);

        for expected in 1..=2 {
            let mut generation = trainer.begin_generation(&NullTelemetry).expect("begin");
            assert_eq!(generation.contestants().len(), 8);
            generation.run(&NullTelemetry);
            let result = generation.finish(&NullTelemetry);
            trainer
                .complete_generation(&result, &NullTelemetry)
                .expect("complete");
            assert_eq!(trainer.generation(), expected);
            assert_eq!(trainer.population().genomes().len(), 8);
        }
    }

    #[test]
    fn test_mismatched_result_is_rejected() {
        let mut trainer = Trainer::new(small_config()).expect("valid config");
        let mut generation = trainer.begin_generation(&NullTelemetry).expect("begin");
        generation.run(&NullTelemetry);
        let mut result = generation.finish(&NullTelemetry);
        result.index = 7;
        assert!(trainer.complete_generation(&result, &NullTelemetry).is_err());
    }

    #[test]
    fn test_run_reports_every_generation() {
        let sink = MemoryTelemetry::new();
        let mut trainer = Trainer::new(small_config()).expect("valid config");
        let shutdown = AtomicBool::new(false);
        let champion = trainer.run(&sink, &shutdown).expect("run");

        assert!(champion.is_some());
        assert_eq!(trainer.generation(), 3);
        let summaries = sink.generation_summaries();
        assert_eq!(summaries.len(), 3);
        for (i, summary) in summaries.iter().enumerate() {
            assert_eq!(summary.generation, i as u64);
            assert_eq!(summary.agent_count, 8);
            assert!(summary.max_fitness >= summary.average_fitness);
        }

        // The champion is credited to the first generation reaching its fitness.
        let fitness = champion.and_then(|g| g.fitness).expect("champion fitness");
        let credited = trainer.champion_generation().expect("champion generation") as usize;
        assert!((summaries[credited].max_fitness - fitness).abs() < 1e-9);
        assert!(summaries[..credited].iter().all(|s| s.max_fitness < fitness));
    }

    #[test]
    fn test_shutdown_stops_before_first_generation_completes() {
        let sink = MemoryTelemetry::new();
        let mut trainer = Trainer::new(small_config()).expect("valid config");
        let shutdown = AtomicBool::new(true);
        trainer.run(&sink, &shutdown).expect("run");
        assert_eq!(trainer.generation(), 0);
        assert!(sink.generation_summaries().is_empty());
        assert_eq!(sink.session_summaries().len(), 1);
    }
}
