//! Training without a terminal: generations run as fast as the CPU allows.

use flapper_core::config::AppConfig;
use flapper_core::telemetry::TelemetrySink;
use flapper_core::trainer::Trainer;
use flapper_io::{save_champion, ChampionRecord};
use flapper_neat::GenerationStatistics;
use std::path::Path;
use std::sync::atomic::AtomicBool;

pub struct HeadlessOutcome {
    /// Generations that ran to completion.
    pub generations: u64,
    pub champion: Option<ChampionRecord>,
    pub statistics: Vec<GenerationStatistics>,
}

pub fn run_headless(
    config: AppConfig,
    sink: &dyn TelemetrySink,
    shutdown: &AtomicBool,
    champion_path: Option<&Path>,
) -> anyhow::Result<HeadlessOutcome> {
    tracing::info!(
        population = config.evolution.population_size,
        generations = config.evolution.generations,
        seed = ?config.seed,
        "Headless training started"
    );

    let mut trainer = Trainer::new(config)?;
    let champion = trainer.run(sink, shutdown)?;
    sink.flush();

    let record = champion.map(|genome| {
        ChampionRecord::new(
            genome,
            trainer.champion_generation().unwrap_or(0),
            trainer.fingerprint().to_string(),
        )
    });

    if let (Some(record), Some(path)) = (&record, champion_path) {
        save_champion(record, path)?;
    }

    let statistics = trainer.population().reporter.history().to_vec();
    if let Some(last) = statistics.last() {
        tracing::info!(
            generations = trainer.generation(),
            best_fitness = last.best_fitness,
            mean_fitness = last.mean_fitness,
            species = last.species_count,
            "Headless training finished"
        );
    }

    Ok(HeadlessOutcome {
        generations: trainer.generation(),
        champion: record,
        statistics,
    })
}
