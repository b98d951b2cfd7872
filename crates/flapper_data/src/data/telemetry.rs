//! Records handed to the telemetry sink.
//!
//! These mirror the tables of the analysis database: one row per agent action,
//! one per obstacle spawn, one summary per session and one per generation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// How a session was driven.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionMode {
    Human,
    Training,
    Replay,
}

impl SessionMode {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionMode::Human => "human",
            SessionMode::Training => "training",
            SessionMode::Replay => "replay",
        }
    }
}

impl std::str::FromStr for SessionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "human" => Ok(SessionMode::Human),
            "training" => Ok(SessionMode::Training),
            "replay" => Ok(SessionMode::Replay),
            other => Err(format!("unknown session mode: {other}")),
        }
    }
}

/// Opening row for a session; later records reference `session_id`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub session_id: Uuid,
    pub mode: SessionMode,
    pub generation: Option<u64>,
    pub agent_count: usize,
    pub config_fingerprint: String,
    pub started_at: DateTime<Utc>,
}

/// Decision taken by an agent on one tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    Flap,
    Glide,
}

impl Action {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Flap => "flap",
            Action::Glide => "glide",
        }
    }
}

/// One agent's action on one tick.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ActionRecord {
    pub session_id: Uuid,
    pub tick: u64,
    pub agent: usize,
    pub action: Action,
    /// Agent vertical centre after the tick.
    pub agent_y: f64,
    /// Horizontal distance to the nearest obstacle (sentinel when none).
    pub distance: f64,
    /// Vertical centre of the nearest obstacle's gap, if any.
    pub gap_y: Option<f64>,
    pub score: f64,
    pub survived: bool,
}

/// An obstacle pair entering the field.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ObstacleRecord {
    pub session_id: Uuid,
    pub tick: u64,
    pub x: f64,
    pub gap_top: f64,
    pub gap_bottom: f64,
}

/// Closing row for a session.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub session_id: Uuid,
    /// Best survival score among the session's agents.
    pub final_score: f64,
    pub obstacles_passed: u64,
    pub ticks: u64,
    pub duration_ms: u64,
}

/// Fitness statistics for one finished generation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GenerationSummary {
    pub session_id: Uuid,
    pub generation: u64,
    pub average_fitness: f64,
    pub max_fitness: f64,
    pub agent_count: usize,
}
