//! The Telemetry Sink seam.
//!
//! Every call is fire-and-forget: implementations swallow their own failures
//! and must never block the tick loop for long.

use flapper_data::{ActionRecord, GenerationSummary, ObstacleRecord, SessionRecord, SessionSummary};
use std::sync::Mutex;

pub trait TelemetrySink: Send + Sync {
    fn session_started(&self, record: &SessionRecord);
    fn action(&self, record: &ActionRecord);
    fn obstacle_spawned(&self, record: &ObstacleRecord);
    fn session_finished(&self, summary: &SessionSummary);
    fn generation_finished(&self, summary: &GenerationSummary);

    /// True once the sink has given up and turned every call into a no-op.
    fn is_degraded(&self) -> bool {
        false
    }

    /// Blocks until everything submitted so far has been handled.
    fn flush(&self) {}
}

/// Discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullTelemetry;

impl TelemetrySink for NullTelemetry {
    fn session_started(&self, _record: &SessionRecord) {}
    fn action(&self, _record: &ActionRecord) {}
    fn obstacle_spawned(&self, _record: &ObstacleRecord) {}
    fn session_finished(&self, _summary: &SessionSummary) {}
    fn generation_finished(&self, _summary: &GenerationSummary) {}
}

/// Keeps every record in memory.
#[derive(Debug, Default)]
pub struct MemoryTelemetry {
    pub sessions: Mutex<Vec<SessionRecord>>,
    pub actions: Mutex<Vec<ActionRecord>>,
    pub obstacles: Mutex<Vec<ObstacleRecord>>,
    pub summaries: Mutex<Vec<SessionSummary>>,
    pub generations: Mutex<Vec<GenerationSummary>>,
}

impl MemoryTelemetry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn push<T: Clone>(list: &Mutex<Vec<T>>, item: &T) {
        list.lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(item.clone());
    }

    #[must_use]
    pub fn action_count(&self) -> usize {
        self.actions.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    #[must_use]
    pub fn generation_summaries(&self) -> Vec<GenerationSummary> {
        self.generations
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    #[must_use]
    pub fn session_summaries(&self) -> Vec<SessionSummary> {
        self.summaries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    #[must_use]
    pub fn obstacle_records(&self) -> Vec<ObstacleRecord> {
        self.obstacles
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    #[must_use]
    pub fn session_records(&self) -> Vec<SessionRecord> {
        self.sessions
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

impl TelemetrySink for MemoryTelemetry {
    fn session_started(&self, record: &SessionRecord) {
        Self::push(&self.sessions, record);
    }

    fn action(&self, record: &ActionRecord) {
        Self::push(&self.actions, record);
    }

    fn obstacle_spawned(&self, record: &ObstacleRecord) {
        Self::push(&self.obstacles, record);
    }

    fn session_finished(&self, summary: &SessionSummary) {
        Self::push(&self.summaries, summary);
    }

    fn generation_finished(&self, summary: &GenerationSummary) {
        Self::push(&self.generations, summary);
    }
}
