use flapper_data::{ObstaclePair, Rect};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct AgentSnapshot {
    pub index: usize,
    pub body: Rect,
    pub alive: bool,
    pub score: f64,
}

/// Lines from an agent's centre to the edges of the gap it is heading for.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct SightLines {
    pub origin: (f64, f64),
    pub gap_top: (f64, f64),
    pub gap_bottom: (f64, f64),
}

/// Everything a renderer needs to draw one frame.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct FrameSnapshot {
    pub tick: u64,
    /// Generation index in training, `None` in human play.
    pub generation: Option<u64>,
    pub field_width: f64,
    pub field_height: f64,
    pub agents: Vec<AgentSnapshot>,
    pub obstacles: Vec<ObstaclePair>,
    pub alive: usize,
    pub best_score: f64,
    pub obstacles_passed: u64,
    /// Sight lines of the best live agent, if it has an obstacle ahead.
    pub sight: Option<SightLines>,
}

impl FrameSnapshot {
    #[must_use]
    pub fn live_agents(&self) -> impl Iterator<Item = &AgentSnapshot> {
        self.agents.iter().filter(|a| a.alive)
    }
}
