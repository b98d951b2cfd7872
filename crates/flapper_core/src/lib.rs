//! # Flapper Core
//!
//! The deterministic game engine: agents falling through a field of
//! scrolling obstacle pairs, steered either by a player or by evolved networks.
//!
//! This crate contains:
//! - Field, agent and obstacle configuration with validation
//! - Obstacle generation and the spawn timer
//! - Perception (the three-value observation) and the simulation step
//! - Decision sources: human input and neural policies
//! - The generation runner and the neuroevolution trainer
//! - The telemetry sink seam, metrics collection and structured logging
//!
//! ## Architecture
//!
//! One tick is: advance obstacles, then for every live agent observe, decide,
//! integrate and collide. Agents never see each other, so the per-agent part of
//! a tick can be spread over a rayon pool without changing results.
//!
//! ## Example
//!
//! ```
//! use flapper_core::config::AppConfig;
//! use flapper_core::decision::NeverFlap;
//! use flapper_core::runner::Generation;
//! use flapper_core::telemetry::NullTelemetry;
//! use flapper_data::SessionMode;
//! use rand::SeedableRng;
//! use rand_chacha::ChaCha8Rng;
//!
//! let config = AppConfig::default();
//! let deciders = vec![(None, NeverFlap)];
//! let mut generation = Generation::new(
//!     &config,
//!     0,
//!     SessionMode::Training,
//!     deciders,
//!     ChaCha8Rng::seed_from_u64(42),
//! )
//! .expect("default config is valid");
//! generation.run(&NullTelemetry);
//! let result = generation.finish(&NullTelemetry);
//! assert!(result.ticks > 0);
//! ```

/// Game, evolution and telemetry settings
pub mod config;
/// Human and neural decision sources
pub mod decision;
/// Agent spawning and retirement
pub mod lifecycle;
/// Performance metrics collection and logging
pub mod metrics;
/// Obstacle generation, spawn timer and the scrolling playfield
pub mod obstacles;
/// One cohort of agents sharing a tick loop
pub mod runner;
/// Render-ready frame snapshots
pub mod snapshot;
/// Perception and the simulation step
pub mod systems;
/// Fire-and-forget telemetry seam
pub mod telemetry;
/// Generation-by-generation training driver
pub mod trainer;

pub use config::AppConfig;
pub use decision::{DecisionSource, HumanInput, InputState, NeuralPolicy};
pub use metrics::{init_logging, LogTarget, Metrics};
pub use runner::{Generation, GenerationResult};
pub use snapshot::FrameSnapshot;
pub use telemetry::{NullTelemetry, TelemetrySink};
pub use trainer::Trainer;
