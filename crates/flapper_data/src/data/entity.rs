use crate::data::geometry::Rect;
use serde::{Deserialize, Serialize};

/// Number of values an agent observes each tick.
pub const OBSERVATION_SIZE: usize = 3;

/// Lifecycle of an agent. `Dead` is terminal.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AgentState {
    #[default]
    Alive,
    Dead,
}

/// A flying agent.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Agent {
    /// Bounding box in field coordinates.
    pub body: Rect,
    /// Vertical velocity in pixels per tick, positive is downwards.
    pub velocity: f64,
    pub state: AgentState,
    /// Survival score, non-decreasing while alive and frozen once dead.
    pub score: f64,
    /// Ticks remaining before another flap is accepted.
    pub flap_cooldown: u32,
    /// Ticks survived so far.
    pub ticks_alive: u64,
}

impl Agent {
    #[must_use]
    pub fn new(body: Rect) -> Self {
        Self {
            body,
            velocity: 0.0,
            state: AgentState::Alive,
            score: 0.0,
            flap_cooldown: 0,
            ticks_alive: 0,
        }
    }

    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.state == AgentState::Alive
    }

    /// Leading edge in the direction of travel (obstacles scroll towards it).
    #[must_use]
    pub fn leading_edge(&self) -> f64 {
        self.body.right()
    }
}

/// A top and bottom obstacle sharing one horizontal position.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ObstaclePair {
    /// Monotonic id assigned by the play-field.
    pub id: u64,
    /// Left edge shared by both members.
    pub x: f64,
    pub width: f64,
    /// Height of the member hanging from the ceiling.
    pub top_height: f64,
    /// Height of the member standing on the floor.
    pub bottom_height: f64,
    pub field_height: f64,
    /// Set once an agent's leading edge has crossed this pair's trailing edge.
    pub passed: bool,
}

impl ObstaclePair {
    #[must_use]
    pub fn top_rect(&self) -> Rect {
        Rect::new(self.x, 0.0, self.width, self.top_height)
    }

    #[must_use]
    pub fn bottom_rect(&self) -> Rect {
        Rect::new(
            self.x,
            self.field_height - self.bottom_height,
            self.width,
            self.bottom_height,
        )
    }

    /// Edge facing approaching agents.
    #[must_use]
    pub fn leading_edge(&self) -> f64 {
        self.x
    }

    #[must_use]
    pub fn trailing_edge(&self) -> f64 {
        self.x + self.width
    }

    /// Upper edge of the opening (bottom of the top member).
    #[must_use]
    pub fn gap_top(&self) -> f64 {
        self.top_height
    }

    /// Lower edge of the opening (top of the bottom member).
    #[must_use]
    pub fn gap_bottom(&self) -> f64 {
        self.field_height - self.bottom_height
    }

    #[must_use]
    pub fn gap_center(&self) -> f64 {
        (self.gap_top() + self.gap_bottom()) / 2.0
    }

    #[must_use]
    pub fn gap(&self) -> f64 {
        self.gap_bottom() - self.gap_top()
    }

    #[must_use]
    pub fn intersects(&self, body: &Rect) -> bool {
        self.top_rect().intersects(body) || self.bottom_rect().intersects(body)
    }
}

/// What an agent senses about its nearest obstacle pair.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    /// Horizontal distance from the agent's leading edge to the obstacle's leading edge.
    pub distance: f64,
    /// Agent top minus the bottom edge of the top member.
    pub clearance_above: f64,
    /// Top edge of the bottom member minus agent bottom.
    pub clearance_below: f64,
}

impl Observation {
    /// Observation used when no obstacle lies ahead: every slot holds `sentinel`.
    #[must_use]
    pub fn sentinel(sentinel: f64) -> Self {
        Self {
            distance: sentinel,
            clearance_above: sentinel,
            clearance_below: sentinel,
        }
    }

    #[must_use]
    pub fn to_inputs(&self) -> [f32; OBSERVATION_SIZE] {
        [
            self.distance as f32,
            self.clearance_above as f32,
            self.clearance_below as f32,
        ]
    }
}
