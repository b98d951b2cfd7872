pub mod input;
pub mod render;
pub mod shutdown;
pub mod state;

pub use shutdown::ShutdownManager;
pub use state::{App, Session};

use anyhow::Result;
use crossterm::event::{self, Event, KeyEventKind};
use flapper_core::decision::{DecisionSource, InputState};
use flapper_core::metrics::Metrics;
use flapper_core::runner::Generation;
use flapper_core::snapshot::FrameSnapshot;
use flapper_core::telemetry::TelemetrySink;
use flapper_io::{save_champion, ChampionRecord};
use flapper_tui::{FitnessSparklines, Tui};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use state::{human_round, replay_round};

impl App {
    pub async fn run(&mut self, tui: &mut Tui, shutdown: Arc<AtomicBool>) -> Result<()> {
        let tick_rate = self.config.frame_duration();
        let mut last_tick = Instant::now();

        while self.running && !shutdown.load(Ordering::SeqCst) {
            tui.terminal.draw(|f| {
                self.draw(f);
            })?;

            let timeout = tick_rate.saturating_sub(last_tick.elapsed());
            if event::poll(timeout.max(Duration::from_millis(1)))? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press {
                        self.handle_key(key);
                    }
                }
            }

            if last_tick.elapsed() >= tick_rate {
                if !self.paused {
                    self.step()?;
                }
                last_tick = Instant::now();
            }
        }

        self.finalize()
    }

    /// Advances the session by one frame.
    pub fn step(&mut self) -> Result<()> {
        let input = self.take_input();
        let telemetry = Arc::clone(&self.telemetry);
        let sink = telemetry.as_ref();

        match &mut self.session {
            Session::Human {
                generation,
                game_over,
                round,
            } => {
                if game_over.is_some() {
                    return Ok(());
                }
                if let Some(last) = tick_round(generation, &input, sink, &self.metrics) {
                    *round += 1;
                    let next = human_round(&self.config, *round, &mut self.rng)?;
                    let result = std::mem::replace(generation, next).finish(sink);
                    let passed = result.obstacles_passed;
                    tracing::info!(round = result.index, passed, ticks = result.ticks, "Round over");

                    *game_over = Some(passed);
                    self.latest_snapshot = Some(last);
                    self.best_obstacles_passed = self.best_obstacles_passed.max(passed);
                    self.best_so_far = Some(self.best_obstacles_passed as f64);
                    return Ok(());
                }
            }
            Session::Replay {
                champion,
                generation,
                game_over,
                round,
            } => {
                if game_over.is_some() {
                    return Ok(());
                }
                if let Some(last) = tick_round(generation, &input, sink, &self.metrics) {
                    *round += 1;
                    let next = replay_round(&self.config, champion, *round, &mut self.rng)?;
                    let result = std::mem::replace(generation, next).finish(sink);
                    let fitness = result.max_fitness();
                    tracing::info!(
                        round = result.index,
                        passed = result.obstacles_passed,
                        fitness,
                        "Replay round over"
                    );

                    *game_over = Some(result.obstacles_passed);
                    self.latest_snapshot = Some(last);
                    self.best_obstacles_passed =
                        self.best_obstacles_passed.max(result.obstacles_passed);
                    self.best_so_far = Some(self.best_so_far.map_or(fitness, |b| b.max(fitness)));
                    return Ok(());
                }
            }
            Session::Watch {
                trainer,
                generation,
            } => {
                let Some(current) = generation.as_mut() else {
                    return Ok(());
                };
                for _ in 0..self.ticks_per_frame {
                    if tick_round(current, &input, sink, &self.metrics).is_some() {
                        break;
                    }
                }
                if current.is_finished() {
                    if let Some(done) = generation.take() {
                        self.latest_snapshot = Some(done.snapshot());
                        let result = done.finish(sink);
                        let training_over = trainer.complete_generation(&result, sink)?;

                        self.best_fitness_history
                            .extend(FitnessSparklines::scale(&[result.max_fitness()]));
                        self.mean_fitness_history
                            .extend(FitnessSparklines::scale(&[result.average_fitness()]));
                        let best = result.max_fitness();
                        self.best_so_far = Some(self.best_so_far.map_or(best, |b| b.max(best)));

                        if training_over {
                            tracing::info!(generations = trainer.generation(), "Training finished");
                            return Ok(());
                        }
                        *generation = Some(trainer.begin_generation(sink)?);
                    }
                }
            }
        }

        self.refresh_snapshot();
        Ok(())
    }

    /// Saves the watch-mode champion and drains telemetry before exit.
    pub fn finalize(&mut self) -> Result<()> {
        if let Session::Watch { trainer, .. } = &self.session {
            if let (Some(path), Some(genome)) = (&self.champion_path, trainer.champion()) {
                let record = ChampionRecord::new(
                    genome.clone(),
                    trainer.champion_generation().unwrap_or(0),
                    trainer.fingerprint().to_string(),
                );
                save_champion(&record, path)?;
            }
        }
        self.telemetry.flush();
        tracing::info!(
            ticks = self.metrics.tick_count(),
            alive = self.metrics.alive_count(),
            obstacles = self.metrics.obstacle_count(),
            elapsed_s = self.metrics.elapsed().as_secs_f64(),
            "Session ended"
        );
        Ok(())
    }
}

/// Ticks once and records timing. Returns the final frame when the generation ends.
fn tick_round<D: DecisionSource + Send>(
    generation: &mut Generation<D>,
    input: &InputState,
    sink: &dyn TelemetrySink,
    metrics: &Metrics,
) -> Option<FrameSnapshot> {
    let started = Instant::now();
    let report = generation.tick(input, sink);
    metrics.record_tick(started.elapsed(), report.alive, generation.obstacles().len());
    if generation.is_finished() {
        Some(generation.snapshot())
    } else {
        None
    }
}
