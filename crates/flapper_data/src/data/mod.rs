//! Core data structures for the flapper simulation.

pub mod entity;
pub mod genome;
pub mod geometry;
pub mod telemetry;
