//! Per-tick systems applied to each live agent.

pub mod action;
pub mod perception;
