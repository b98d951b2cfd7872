//! # Flapper IO
//!
//! Persistence for the game.
//!
//! This crate provides:
//! - Structured error handling with [`IoError`]
//! - JSON and hex helpers for genomes and records
//! - Champion genome save and load
//! - A best-effort SQLite telemetry sink on a background thread
//! - Read-side queries over the telemetry database

/// Best genome persistence
pub mod champion;
/// Error types and result aliases for I/O operations
pub mod error;
/// Queries for offline analysis
pub mod reader;
/// JSON and hex helpers
pub mod serialization;
/// SQLite telemetry sink
pub mod storage;

pub use champion::{load_champion, save_champion, ChampionRecord};
pub use error::{IoError, Result};
pub use reader::TelemetryReader;
pub use storage::SqliteTelemetry;
