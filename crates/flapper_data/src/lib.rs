//! Plain data shared by every flapper crate.
//!
//! Nothing in here owns behaviour beyond small geometric queries; simulation
//! logic lives in `flapper_core` and the neuroevolution logic in `flapper_neat`.

pub mod data;

pub use data::entity::{Agent, AgentState, ObstaclePair, Observation, OBSERVATION_SIZE};
pub use data::genome::{Activations, Connection, Genome, GenomeKey, Node, NodeType};
pub use data::geometry::Rect;
pub use data::telemetry::{
    Action, ActionRecord, GenerationSummary, ObstacleRecord, SessionMode, SessionRecord,
    SessionSummary,
};
