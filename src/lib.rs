//! # Flapper
//!
//! Agents falling through scrolling obstacle pairs, played by a human or by a
//! NEAT population learning to fly.
//!
//! The binary wires the crates together:
//! - [`app`]: the interactive terminal loop (human, watch and replay modes)
//! - [`headless`]: training without a terminal UI
//! - [`telemetry`]: choosing the telemetry sink from configuration

pub mod app;
pub mod headless;
pub mod telemetry;
