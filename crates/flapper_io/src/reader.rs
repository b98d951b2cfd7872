//! Read-side queries over the telemetry database, used for offline analysis.

use crate::error::{IoError, Result};
use flapper_data::SessionMode;
use rusqlite::{params, Connection, OpenFlags};
use serde::Serialize;
use std::path::Path;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationRow {
    pub session_id: Uuid,
    pub generation: u64,
    pub average_fitness: f64,
    pub max_fitness: f64,
    pub agent_count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionRow {
    pub session_id: Uuid,
    pub mode: SessionMode,
    pub started_at: String,
    pub final_score: f64,
    pub obstacles_passed: u64,
    pub ticks: u64,
    pub duration_ms: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ActionBreakdown {
    pub flaps: u64,
    pub glides: u64,
    /// Actions on which the agent died.
    pub deaths: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TableCounts {
    pub sessions: u64,
    pub actions: u64,
    pub obstacles: u64,
    pub generations: u64,
}

pub struct TelemetryReader {
    conn: Connection,
}

impl TelemetryReader {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(IoError::not_found(path.display().to_string()));
        }
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        Ok(Self { conn })
    }

    pub fn table_counts(&self) -> Result<TableCounts> {
        let count = |table: &str| -> Result<u64> {
            let n: i64 =
                self.conn
                    .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))?;
            Ok(n.max(0) as u64)
        };
        Ok(TableCounts {
            sessions: count("sessions")?,
            actions: count("actions")?,
            obstacles: count("obstacles")?,
            generations: count("generation_summaries")?,
        })
    }

    /// Generation summaries in the order they were recorded, most recent `limit`.
    pub fn generation_progress(&self, limit: usize) -> Result<Vec<GenerationRow>> {
        let mut stmt = self.conn.prepare(
            "SELECT session_id, generation, average_fitness, max_fitness, agent_count
             FROM (SELECT rowid AS r, * FROM generation_summaries ORDER BY rowid DESC LIMIT ?1)
             ORDER BY r ASC",
        )?;
        let rows = stmt.query_map(params![limit], |row| {
            let id: String = row.get(0)?;
            Ok(GenerationRow {
                session_id: Uuid::parse_str(&id).unwrap_or_default(),
                generation: row.get(1)?,
                average_fitness: row.get(2)?,
                max_fitness: row.get(3)?,
                agent_count: row.get(4)?,
            })
        })?;
        Ok(rows.collect::<std::result::Result<_, _>>()?)
    }

    /// Finished sessions of one mode, best score first.
    pub fn top_sessions(&self, mode: SessionMode, limit: usize) -> Result<Vec<SessionRow>> {
        let mut stmt = self.conn.prepare(
            "SELECT s.id, s.started_at, m.final_score, m.obstacles_passed, m.ticks, m.duration_ms
             FROM sessions s JOIN session_summaries m ON m.session_id = s.id
             WHERE s.mode = ?1
             ORDER BY m.final_score DESC, m.ticks DESC
             LIMIT ?2",
        )?;
        let rows = stmt.query_map(params![mode.as_str(), limit], |row| {
            let id: String = row.get(0)?;
            Ok(SessionRow {
                session_id: Uuid::parse_str(&id).unwrap_or_default(),
                mode,
                started_at: row.get(1)?,
                final_score: row.get(2)?,
                obstacles_passed: row.get(3)?,
                ticks: row.get(4)?,
                duration_ms: row.get(5)?,
            })
        })?;
        Ok(rows.collect::<std::result::Result<_, _>>()?)
    }

    pub fn action_breakdown(&self, session_id: Uuid) -> Result<ActionBreakdown> {
        let (flaps, glides, deaths): (i64, i64, i64) = self.conn.query_row(
            "SELECT
                COALESCE(SUM(action = 'flap'), 0),
                COALESCE(SUM(action = 'glide'), 0),
                COALESCE(SUM(NOT survived), 0)
             FROM actions WHERE session_id = ?1",
            params![session_id.to_string()],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )?;
        Ok(ActionBreakdown {
            flaps: flaps.max(0) as u64,
            glides: glides.max(0) as u64,
            deaths: deaths.max(0) as u64,
        })
    }
}
