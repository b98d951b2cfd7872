//! Saving and reloading the best genome of a training run.

use crate::error::{IoError, Result};
use crate::serialization::{from_hex, from_json, write_json_file};
use chrono::{DateTime, Utc};
use flapper_data::Genome;
use flapper_neat::GenomeLogic;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChampionRecord {
    pub genome: Genome,
    pub fitness: f64,
    /// Generation in which the genome was evaluated.
    pub generation: u64,
    /// Fingerprint of the physics it was trained under.
    pub config_fingerprint: String,
    pub saved_at: DateTime<Utc>,
}

impl ChampionRecord {
    #[must_use]
    pub fn new(genome: Genome, generation: u64, config_fingerprint: String) -> Self {
        Self {
            fitness: genome.fitness.unwrap_or(0.0),
            genome,
            generation,
            config_fingerprint,
            saved_at: Utc::now(),
        }
    }
}

pub fn save_champion<P: AsRef<Path>>(record: &ChampionRecord, path: P) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    write_json_file(record, path)?;
    tracing::info!(path = %path.display(), fitness = record.fitness, "Champion saved");
    Ok(())
}

/// Loads a champion file. Accepts either a saved [`ChampionRecord`] or a bare
/// genome as pretty JSON or hex. The returned genome is ready to evaluate.
pub fn load_champion<P: AsRef<Path>>(path: P) -> Result<ChampionRecord> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(IoError::not_found(path.display().to_string()));
    }
    let text = std::fs::read_to_string(path)
        .map_err(|e| IoError::FileSystem(e).with_context(format!("loading champion {path:?}")))?;
    let trimmed = text.trim();

    let mut record = if trimmed.starts_with('{') {
        match from_json::<ChampionRecord>(trimmed) {
            Ok(record) => record,
            Err(_) => ChampionRecord::new(from_json::<Genome>(trimmed)?, 0, String::new()),
        }
    } else {
        ChampionRecord::new(from_hex::<Genome>(trimmed)?, 0, String::new())
    };

    validate_genome(&record.genome)?;
    record.genome.initialize_node_idx_map();
    Ok(record)
}

fn validate_genome(genome: &Genome) -> Result<()> {
    if genome.input_count() == 0 || genome.output_count() == 0 {
        return Err(IoError::validation(
            "Genome must have at least one input and one output node",
        ));
    }
    let known = |id: usize| genome.nodes.iter().any(|n| n.id == id);
    if let Some(c) = genome
        .connections
        .iter()
        .find(|c| !known(c.from) || !known(c.to))
    {
        return Err(IoError::validation(format!(
            "Connection {} -> {} references a missing node",
            c.from, c.to
        )));
    }
    Ok(())
}
