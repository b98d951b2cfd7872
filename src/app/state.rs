use anyhow::Result;
use flapper_core::config::AppConfig;
use flapper_core::decision::{HumanInput, InputState, NeuralPolicy};
use flapper_core::metrics::Metrics;
use flapper_core::runner::Generation;
use flapper_core::snapshot::FrameSnapshot;
use flapper_core::telemetry::TelemetrySink;
use flapper_core::trainer::Trainer;
use flapper_data::SessionMode;
use flapper_io::ChampionRecord;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// What the interactive loop is driving.
pub enum Session {
    /// One player-controlled agent. After a death `game_over` holds the final
    /// score and `generation` is already the next, not yet started, round.
    Human {
        generation: Generation<HumanInput>,
        game_over: Option<u64>,
        round: u64,
    },
    /// A training run rendered live. `generation` is `None` once training is over.
    Watch {
        trainer: Box<Trainer>,
        generation: Option<Generation<NeuralPolicy>>,
    },
    /// A saved champion flying alone.
    Replay {
        champion: ChampionRecord,
        generation: Generation<NeuralPolicy>,
        game_over: Option<u64>,
        round: u64,
    },
}

pub struct App {
    pub running: bool,
    pub paused: bool,
    pub show_sight_lines: bool,
    /// Simulation ticks per rendered frame in watch mode.
    pub ticks_per_frame: u32,
    pub config: AppConfig,
    pub session: Session,
    pub telemetry: Arc<dyn TelemetrySink>,
    pub metrics: Metrics,
    pub latest_snapshot: Option<FrameSnapshot>,
    /// Best result across rounds or generations.
    pub best_so_far: Option<f64>,
    /// Most obstacles passed in a single human or replay round.
    pub best_obstacles_passed: u64,
    pub best_fitness_history: Vec<u64>,
    pub mean_fitness_history: Vec<u64>,
    pub champion_path: Option<PathBuf>,
    /// Flap key pressed since the last tick.
    pub(crate) pending_flap: bool,
    pub(crate) rng: ChaCha8Rng,
}

impl App {
    /// Reads `path`, falling back to defaults when it is missing or invalid.
    /// A default file is written when none exists.
    pub fn load_config(path: &Path) -> AppConfig {
        if let Ok(content) = std::fs::read_to_string(path) {
            match AppConfig::from_toml(&content) {
                Ok(config) => return config,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Invalid config, using defaults");
                }
            }
        }
        let default = AppConfig::default();
        if !path.exists() {
            match toml::to_string(&default) {
                Ok(toml_str) => {
                    if let Err(e) = std::fs::write(path, toml_str) {
                        tracing::warn!(path = %path.display(), error = %e, "Could not write default config");
                    }
                }
                Err(e) => tracing::warn!(error = %e, "Could not serialize default config"),
            }
        }
        default
    }

    fn base(config: AppConfig, session: Session, telemetry: Arc<dyn TelemetrySink>, rng: ChaCha8Rng) -> Self {
        Self {
            running: true,
            paused: false,
            show_sight_lines: true,
            ticks_per_frame: 1,
            config,
            session,
            telemetry,
            metrics: Metrics::new(),
            latest_snapshot: None,
            best_so_far: None,
            best_obstacles_passed: 0,
            best_fitness_history: Vec::new(),
            mean_fitness_history: Vec::new(),
            champion_path: None,
            pending_flap: false,
            rng,
        }
    }

    fn seeded_rng(config: &AppConfig) -> ChaCha8Rng {
        match config.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        }
    }

    pub fn new_human(config: AppConfig, telemetry: Arc<dyn TelemetrySink>) -> Result<Self> {
        config.validate()?;
        let mut rng = Self::seeded_rng(&config);
        let generation = human_round(&config, 0, &mut rng)?;
        let mut app = Self::base(
            config,
            Session::Human {
                generation,
                game_over: None,
                round: 0,
            },
            telemetry,
            rng,
        );
        app.open_session();
        Ok(app)
    }

    pub fn new_watch(
        config: AppConfig,
        telemetry: Arc<dyn TelemetrySink>,
        champion_path: Option<PathBuf>,
    ) -> Result<Self> {
        let mut trainer = Trainer::new(config.clone())?;
        let generation = trainer.begin_generation(telemetry.as_ref())?;
        let rng = Self::seeded_rng(&config);
        let mut app = Self::base(
            config,
            Session::Watch {
                trainer: Box::new(trainer),
                generation: Some(generation),
            },
            telemetry,
            rng,
        );
        app.champion_path = champion_path;
        app.refresh_snapshot();
        Ok(app)
    }

    pub fn new_replay(
        config: AppConfig,
        telemetry: Arc<dyn TelemetrySink>,
        champion: ChampionRecord,
    ) -> Result<Self> {
        config.validate()?;
        if !champion.config_fingerprint.is_empty() && champion.config_fingerprint != config.fingerprint() {
            tracing::warn!("Champion was trained under a different configuration");
        }
        let mut rng = Self::seeded_rng(&config);
        let generation = replay_round(&config, &champion, 0, &mut rng)?;
        let mut app = Self::base(
            config,
            Session::Replay {
                champion,
                generation,
                game_over: None,
                round: 0,
            },
            telemetry,
            rng,
        );
        app.open_session();
        Ok(app)
    }

    /// Opens the telemetry session of a freshly built human or replay round.
    fn open_session(&mut self) {
        let fingerprint = self.config.fingerprint();
        let sink = self.telemetry.as_ref();
        match &mut self.session {
            Session::Human { generation, .. } => generation.start(sink, &fingerprint),
            Session::Replay { generation, .. } => generation.start(sink, &fingerprint),
            Session::Watch { .. } => {}
        }
        self.refresh_snapshot();
    }

    /// Starts the next round after a game over. Ignored while a round is running.
    pub fn restart(&mut self) {
        match &mut self.session {
            Session::Human { game_over, .. } | Session::Replay { game_over, .. }
                if game_over.is_some() =>
            {
                *game_over = None;
            }
            _ => return,
        }
        self.open_session();
    }

    pub fn refresh_snapshot(&mut self) {
        // After training ends the last frame stays on screen.
        let snapshot = match &self.session {
            Session::Human { generation, .. } => generation.snapshot(),
            Session::Replay { generation, .. } => generation.snapshot(),
            Session::Watch {
                generation: Some(generation),
                ..
            } => generation.snapshot(),
            Session::Watch {
                generation: None, ..
            } => return,
        };
        self.latest_snapshot = Some(snapshot);
    }

    #[must_use]
    pub fn game_over(&self) -> Option<u64> {
        match &self.session {
            Session::Human { game_over, .. } | Session::Replay { game_over, .. } => *game_over,
            Session::Watch { .. } => None,
        }
    }

    #[must_use]
    pub fn training_finished(&self) -> bool {
        matches!(
            self.session,
            Session::Watch {
                generation: None,
                ..
            }
        )
    }

    #[must_use]
    pub fn take_input(&mut self) -> InputState {
        InputState {
            flap_held: std::mem::take(&mut self.pending_flap),
        }
    }
}

fn round_rng(rng: &mut ChaCha8Rng) -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(rng.gen())
}

pub(crate) fn human_round(
    config: &AppConfig,
    round: u64,
    rng: &mut ChaCha8Rng,
) -> Result<Generation<HumanInput>> {
    Generation::new(
        config,
        round,
        SessionMode::Human,
        vec![(None, HumanInput::new())],
        round_rng(rng),
    )
}

pub(crate) fn replay_round(
    config: &AppConfig,
    champion: &ChampionRecord,
    round: u64,
    rng: &mut ChaCha8Rng,
) -> Result<Generation<NeuralPolicy>> {
    Generation::new(
        config,
        round,
        SessionMode::Replay,
        vec![(Some(champion.genome.key), NeuralPolicy::new(champion.genome.clone()))],
        round_rng(rng),
    )
}
