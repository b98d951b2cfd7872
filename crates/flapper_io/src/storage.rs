use crate::error::Result;
use flapper_core::telemetry::TelemetrySink;
use flapper_data::{ActionRecord, GenerationSummary, ObstacleRecord, SessionRecord, SessionSummary};
use rusqlite::{params, Connection, Transaction};
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, Sender, SyncSender, TrySendError};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

/// Queued records the worker may hold before new ones are dropped.
pub const QUEUE_CAPACITY: usize = 65_536;
/// Commands committed per transaction.
const BATCH_SIZE: usize = 1_024;

/// Commands for the background telemetry writer.
pub enum TelemetryCommand {
    Session(SessionRecord),
    Action(ActionRecord),
    Obstacle(ObstacleRecord),
    SessionFinished(SessionSummary),
    GenerationFinished(GenerationSummary),
    /// Replies once everything queued before it is committed.
    Flush(Sender<()>),
    Stop,
}

/// Best-effort SQLite telemetry sink.
///
/// A dedicated thread owns the connection; the simulation only ever does a
/// non-blocking send. If the database cannot be opened or a write fails, the
/// sink logs a warning once and every later call becomes a no-op.
pub struct SqliteTelemetry {
    sender: SyncSender<TelemetryCommand>,
    degraded: Arc<AtomicBool>,
    dropped: AtomicU64,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl SqliteTelemetry {
    /// Spawns the writer thread and waits for it to open the database.
    /// Never fails: an unusable path yields an already degraded sink.
    pub fn open<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref().to_owned();
        let (tx, rx) = mpsc::sync_channel(QUEUE_CAPACITY);
        let (ready_tx, ready_rx) = mpsc::channel();
        let degraded = Arc::new(AtomicBool::new(false));

        let worker_path = path.clone();
        let worker_degraded = Arc::clone(&degraded);
        let spawned = thread::Builder::new()
            .name("telemetry".into())
            .spawn(move || {
                let mut conn = match open_database(&worker_path) {
                    Ok(conn) => {
                        let _ = ready_tx.send(Ok(()));
                        conn
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(e.to_string()));
                        return;
                    }
                };
                run_worker(&mut conn, &rx, &worker_degraded);
            });

        let worker = match spawned {
            Ok(handle) => Some(handle),
            Err(e) => {
                degraded.store(true, Ordering::SeqCst);
                tracing::warn!(error = %e, "Could not start telemetry thread, telemetry disabled");
                None
            }
        };

        if worker.is_some() {
            match ready_rx.recv() {
                Ok(Ok(())) => {
                    tracing::info!(path = %path.display(), "Telemetry database opened");
                }
                Ok(Err(e)) => {
                    degraded.store(true, Ordering::SeqCst);
                    tracing::warn!(path = %path.display(), error = %e, "Telemetry database unavailable, telemetry disabled");
                }
                Err(_) => {
                    degraded.store(true, Ordering::SeqCst);
                    tracing::warn!(path = %path.display(), "Telemetry thread exited during startup");
                }
            }
        }

        Self {
            sender: tx,
            degraded,
            dropped: AtomicU64::new(0),
            worker: Mutex::new(worker),
        }
    }

    /// Records discarded because the queue was full.
    #[must_use]
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    fn submit(&self, cmd: TelemetryCommand) {
        if self.degraded.load(Ordering::Relaxed) {
            return;
        }
        match self.sender.try_send(cmd) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                let dropped = self.dropped.fetch_add(1, Ordering::Relaxed);
                if dropped % 10_000 == 0 {
                    tracing::warn!(dropped = dropped + 1, "Telemetry queue full, dropping records");
                }
            }
            Err(TrySendError::Disconnected(_)) => {
                if !self.degraded.swap(true, Ordering::SeqCst) {
                    tracing::warn!("Telemetry thread has stopped, telemetry disabled");
                }
            }
        }
    }

    /// Stops the writer after it has drained the queue.
    pub fn close(&self) {
        let handle = self
            .worker
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if let Some(handle) = handle {
            let _ = self.sender.send(TelemetryCommand::Stop);
            if handle.join().is_err() {
                tracing::warn!("Telemetry thread panicked");
            }
        }
    }
}

impl TelemetrySink for SqliteTelemetry {
    fn session_started(&self, record: &SessionRecord) {
        self.submit(TelemetryCommand::Session(record.clone()));
    }

    fn action(&self, record: &ActionRecord) {
        self.submit(TelemetryCommand::Action(record.clone()));
    }

    fn obstacle_spawned(&self, record: &ObstacleRecord) {
        self.submit(TelemetryCommand::Obstacle(record.clone()));
    }

    fn session_finished(&self, summary: &SessionSummary) {
        self.submit(TelemetryCommand::SessionFinished(summary.clone()));
    }

    fn generation_finished(&self, summary: &GenerationSummary) {
        self.submit(TelemetryCommand::GenerationFinished(summary.clone()));
    }

    fn is_degraded(&self) -> bool {
        self.degraded.load(Ordering::Relaxed)
    }

    fn flush(&self) {
        if self.is_degraded() {
            return;
        }
        let (tx, rx) = mpsc::channel();
        if self.sender.send(TelemetryCommand::Flush(tx)).is_ok() {
            let _ = rx.recv();
        }
    }
}

impl Drop for SqliteTelemetry {
    fn drop(&mut self) {
        self.close();
    }
}

fn open_database(path: &Path) -> Result<Connection> {
    let mut conn = Connection::open(path)?;
    if let Err(e) = conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;") {
        tracing::debug!(error = %e, "Could not enable WAL journal, using the default");
    }
    init_db(&mut conn)?;
    Ok(conn)
}

/// Drains the queue in batches, one transaction per batch.
///
/// On the first failed write the sink is marked degraded and the worker
/// exits. Pending flush replies are dropped only after the flag is raised,
/// so a caller woken by `flush` always observes the degraded state.
fn run_worker(conn: &mut Connection, rx: &Receiver<TelemetryCommand>, degraded: &AtomicBool) {
    let mut batch = Vec::with_capacity(BATCH_SIZE);
    while let Ok(first) = rx.recv() {
        batch.push(first);
        while batch.len() < BATCH_SIZE {
            match rx.try_recv() {
                Ok(cmd) => batch.push(cmd),
                Err(_) => break,
            }
        }

        let mut replies = Vec::new();
        let mut stop = false;
        let mut writes = Vec::with_capacity(batch.len());
        for cmd in batch.drain(..) {
            match cmd {
                TelemetryCommand::Flush(reply) => replies.push(reply),
                TelemetryCommand::Stop => stop = true,
                other => writes.push(other),
            }
        }

        if let Err(e) = commit_batch(conn, &writes) {
            if !degraded.swap(true, Ordering::SeqCst) {
                tracing::warn!(error = %e, "Telemetry write failed, disabling telemetry");
            }
            return;
        }

        for reply in replies {
            let _ = reply.send(());
        }
        if stop {
            break;
        }
    }
}

fn commit_batch(conn: &mut Connection, writes: &[TelemetryCommand]) -> Result<()> {
    let tx = conn.transaction()?;
    for cmd in writes {
        write_command(&tx, cmd)?;
    }
    tx.commit()?;
    Ok(())
}

fn write_command(tx: &Transaction<'_>, cmd: &TelemetryCommand) -> Result<()> {
    match cmd {
        TelemetryCommand::Session(r) => {
            tx.execute(
                "INSERT OR REPLACE INTO sessions (id, mode, generation, agent_count, config_fingerprint, started_at)
                  VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    r.session_id.to_string(),
                    r.mode.as_str(),
                    r.generation,
                    r.agent_count,
                    r.config_fingerprint,
                    r.started_at.to_rfc3339()
                ],
            )?;
        }
        TelemetryCommand::Action(r) => {
            tx.prepare_cached(
                "INSERT INTO actions (session_id, tick, agent, action, agent_y, distance, gap_y, score, survived)
                  VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            )?
            .execute(params![
                r.session_id.to_string(),
                r.tick,
                r.agent,
                r.action.as_str(),
                r.agent_y,
                r.distance,
                r.gap_y,
                r.score,
                r.survived
            ])?;
        }
        TelemetryCommand::Obstacle(r) => {
            tx.execute(
                "INSERT INTO obstacles (session_id, tick, x, gap_top, gap_bottom)
                  VALUES (?1, ?2, ?3, ?4, ?5)",
                params![r.session_id.to_string(), r.tick, r.x, r.gap_top, r.gap_bottom],
            )?;
        }
        TelemetryCommand::SessionFinished(s) => {
            tx.execute(
                "INSERT OR REPLACE INTO session_summaries (session_id, final_score, obstacles_passed, ticks, duration_ms)
                  VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    s.session_id.to_string(),
                    s.final_score,
                    s.obstacles_passed,
                    s.ticks,
                    s.duration_ms
                ],
            )?;
        }
        TelemetryCommand::GenerationFinished(s) => {
            tx.execute(
                "INSERT OR REPLACE INTO generation_summaries (session_id, generation, average_fitness, max_fitness, agent_count)
                  VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    s.session_id.to_string(),
                    s.generation,
                    s.average_fitness,
                    s.max_fitness,
                    s.agent_count
                ],
            )?;
        }
        TelemetryCommand::Flush(_) | TelemetryCommand::Stop => {}
    }
    Ok(())
}

fn init_db(conn: &mut Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS sessions (
            id TEXT PRIMARY KEY,
            mode TEXT NOT NULL,
            generation INTEGER,
            agent_count INTEGER NOT NULL,
            config_fingerprint TEXT NOT NULL,
            started_at TEXT NOT NULL
        );
        CREATE TABLE IF NOT EXISTS actions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            session_id TEXT NOT NULL,
            tick INTEGER NOT NULL,
            agent INTEGER NOT NULL,
            action TEXT NOT NULL,
            agent_y REAL NOT NULL,
            distance REAL NOT NULL,
            gap_y REAL,
            score REAL NOT NULL,
            survived BOOLEAN NOT NULL
        );
        CREATE TABLE IF NOT EXISTS obstacles (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            session_id TEXT NOT NULL,
            tick INTEGER NOT NULL,
            x REAL NOT NULL,
            gap_top REAL NOT NULL,
            gap_bottom REAL NOT NULL
        );
        CREATE TABLE IF NOT EXISTS session_summaries (
            session_id TEXT PRIMARY KEY,
            final_score REAL NOT NULL,
            obstacles_passed INTEGER NOT NULL,
            ticks INTEGER NOT NULL,
            duration_ms INTEGER NOT NULL,
            recorded_at TEXT DEFAULT CURRENT_TIMESTAMP
        );
        CREATE TABLE IF NOT EXISTS generation_summaries (
            session_id TEXT PRIMARY KEY,
            generation INTEGER NOT NULL,
            average_fitness REAL NOT NULL,
            max_fitness REAL NOT NULL,
            agent_count INTEGER NOT NULL,
            recorded_at TEXT DEFAULT CURRENT_TIMESTAMP
        );
        CREATE INDEX IF NOT EXISTS idx_actions_session ON actions(session_id);
        CREATE INDEX IF NOT EXISTS idx_obstacles_session ON obstacles(session_id);
        CREATE INDEX IF NOT EXISTS idx_generations_generation ON generation_summaries(generation);",
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use flapper_data::{Action, SessionMode};
    use uuid::Uuid;

    fn session(id: Uuid) -> SessionRecord {
        SessionRecord {
            session_id: id,
            mode: SessionMode::Human,
            generation: None,
            agent_count: 1,
            config_fingerprint: "f00d".into(),
            started_at: Utc::now(),
        }
    }

    fn action(id: Uuid, tick: u64) -> ActionRecord {
        ActionRecord {
            session_id: id,
            tick,
            agent: 0,
            action: if tick % 2 == 0 { Action::Flap } else { Action::Glide },
            agent_y: 250.0,
            distance: 400.0,
            gap_y: None,
            score: tick as f64 * 0.01,
            survived: true,
        }
    }

    fn count(path: &Path, table: &str) -> i64 {
        let conn = Connection::open(path).unwrap();
        conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))
            .unwrap()
    }

    #[test]
    fn test_records_are_committed_on_flush() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("telemetry.db");
        let sink = SqliteTelemetry::open(&path);
        assert!(!sink.is_degraded());

        let id = Uuid::new_v4();
        sink.session_started(&session(id));
        for tick in 0..2_500 {
            sink.action(&action(id, tick));
        }
        sink.flush();

        assert_eq!(count(&path, "sessions"), 1);
        assert_eq!(count(&path, "actions"), 2_500);
        assert_eq!(sink.dropped(), 0);
    }

    #[test]
    fn test_close_drains_queue() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("telemetry.db");
        {
            let sink = SqliteTelemetry::open(&path);
            let id = Uuid::new_v4();
            sink.session_finished(&SessionSummary {
                session_id: id,
                final_score: 3.0,
                obstacles_passed: 3,
                ticks: 900,
                duration_ms: 15_000,
            });
        }
        assert_eq!(count(&path, "session_summaries"), 1);
    }

    #[test]
    fn test_failed_write_degrades_sink() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("telemetry.db");
        let sink = SqliteTelemetry::open(&path);
        let id = Uuid::new_v4();
        sink.session_started(&session(id));
        sink.flush();
        assert!(!sink.is_degraded());

        // Another process removes a table the writer depends on.
        Connection::open(&path)
            .unwrap()
            .execute_batch("DROP TABLE actions")
            .unwrap();

        sink.action(&action(id, 0));
        sink.flush();
        assert!(sink.is_degraded());

        // Later calls return without touching the dead worker.
        sink.action(&action(id, 1));
        sink.flush();
        sink.close();
        assert_eq!(sink.dropped(), 0);
    }

    #[test]
    fn test_unopenable_path_degrades() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("telemetry.db");
        let sink = SqliteTelemetry::open(&path);
        assert!(sink.is_degraded());

        // Every call is a silent no-op.
        let id = Uuid::new_v4();
        sink.session_started(&session(id));
        sink.action(&action(id, 0));
        sink.flush();
        sink.close();
    }
}
