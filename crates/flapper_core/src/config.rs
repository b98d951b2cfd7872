//! Configuration management for game and evolution parameters.
//!
//! Every section maps to a table of `config.toml`. All fields have defaults,
//! so a file only needs to name what it overrides.
//!
//! ## Example `config.toml`
//!
//! ```toml
//! seed = 42
//! target_fps = 60
//!
//! [agent]
//! gravity = 0.4
//! jump_speed = -6.0
//!
//! [obstacles]
//! gap = 150.0
//! bottom_heights = [90.0, 122.0, 154.0, 186.0, 218.0, 250.0]
//!
//! [evolution]
//! population_size = 50
//! generations = 50
//! ```

use flapper_neat::NeatConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Dimensions of the play-field in pixels.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct FieldConfig {
    pub width: f64,
    pub height: f64,
}

impl Default for FieldConfig {
    fn default() -> Self {
        Self {
            width: 400.0,
            height: 500.0,
        }
    }
}

/// Body size and kinematics of a flying agent.
///
/// Velocities are in pixels per tick; `y` grows downwards, so `jump_speed`
/// is negative.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct AgentConfig {
    pub width: f64,
    pub height: f64,
    pub gravity: f64,
    pub max_fall_speed: f64,
    pub jump_speed: f64,
    /// Ticks after a flap during which further flaps are ignored.
    pub flap_cooldown_frames: u32,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            width: 40.0,
            height: 26.0,
            gravity: 0.4,
            max_fall_speed: 4.0,
            jump_speed: -6.0,
            flap_cooldown_frames: 8,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ObstacleConfig {
    pub width: f64,
    /// Vertical opening between the two members of a pair.
    pub gap: f64,
    /// Horizontal scroll per tick.
    pub speed: f64,
    pub spawn_interval_ticks: u64,
    /// Allowed heights of the floor member, picked uniformly.
    pub bottom_heights: Vec<f64>,
}

impl Default for ObstacleConfig {
    fn default() -> Self {
        Self {
            width: 52.0,
            gap: 150.0,
            speed: 3.0,
            spawn_interval_ticks: 60,
            bottom_heights: vec![90.0, 122.0, 154.0, 186.0, 218.0, 250.0],
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ScoringConfig {
    /// Score and fitness earned for each survived tick.
    pub per_tick_increment: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            per_tick_increment: 0.01,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct TelemetryConfig {
    pub enabled: bool,
    pub database_path: PathBuf,
    /// Per-tick action rows are by far the largest table; they can be skipped.
    pub record_actions: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            database_path: PathBuf::from("flapper.db"),
            record_actions: true,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct SimulationConfig {
    /// Run the per-agent phase of a tick on the rayon pool.
    pub parallel: bool,
    /// Minimum live agents before the parallel path is taken.
    pub parallel_threshold: usize,
    /// Ends a generation after this many ticks even if agents are still alive.
    pub max_ticks_per_generation: Option<u64>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            parallel: false,
            parallel_threshold: 64,
            max_ticks_per_generation: None,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub target_fps: u32,
    /// Seeds every RNG when set, making runs reproducible.
    pub seed: Option<u64>,
    pub field: FieldConfig,
    pub agent: AgentConfig,
    pub obstacles: ObstacleConfig,
    pub scoring: ScoringConfig,
    pub evolution: NeatConfig,
    pub telemetry: TelemetryConfig,
    pub simulation: SimulationConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            target_fps: 60,
            seed: None,
            field: FieldConfig::default(),
            agent: AgentConfig::default(),
            obstacles: ObstacleConfig::default(),
            scoring: ScoringConfig::default(),
            evolution: NeatConfig::default(),
            telemetry: TelemetryConfig::default(),
            simulation: SimulationConfig::default(),
        }
    }
}

impl AppConfig {
    /// Validates all configuration parameters.
    ///
    /// Returns `Ok(())` if all parameters are valid, or `Err` with a description
    /// of the first validation failure.
    pub fn validate(&self) -> anyhow::Result<()> {
        // Field
        anyhow::ensure!(self.field.width > 0.0, "Field width must be positive");
        anyhow::ensure!(self.field.height > 0.0, "Field height must be positive");

        // Agent
        anyhow::ensure!(
            self.agent.width > 0.0 && self.agent.height > 0.0,
            "Agent dimensions must be positive"
        );
        anyhow::ensure!(
            self.agent.height < self.field.height,
            "Agent must fit inside the field"
        );
        anyhow::ensure!(self.agent.gravity > 0.0, "Gravity must be positive");
        anyhow::ensure!(
            self.agent.max_fall_speed > 0.0,
            "Max fall speed must be positive"
        );
        anyhow::ensure!(
            self.agent.jump_speed < 0.0,
            "Jump speed must be negative (upwards)"
        );

        // Obstacles
        anyhow::ensure!(self.obstacles.width > 0.0, "Obstacle width must be positive");
        anyhow::ensure!(self.obstacles.gap > 0.0, "Obstacle gap must be positive");
        anyhow::ensure!(self.obstacles.speed > 0.0, "Obstacle speed must be positive");
        anyhow::ensure!(
            self.obstacles.spawn_interval_ticks > 0,
            "Spawn interval must be positive"
        );
        anyhow::ensure!(
            !self.obstacles.bottom_heights.is_empty(),
            "At least one bottom height is required"
        );
        for &height in &self.obstacles.bottom_heights {
            anyhow::ensure!(height > 0.0, "Bottom height {} must be positive", height);
            anyhow::ensure!(
                height + self.obstacles.gap < self.field.height,
                "Bottom height {} plus gap leaves no room for the top member",
                height
            );
        }

        // Scoring
        anyhow::ensure!(
            self.scoring.per_tick_increment > 0.0,
            "Per-tick score increment must be positive"
        );

        // Evolution
        self.evolution.validate()?;
        anyhow::ensure!(
            self.evolution.num_inputs == flapper_data::OBSERVATION_SIZE,
            "Networks need exactly {} inputs",
            flapper_data::OBSERVATION_SIZE
        );
        anyhow::ensure!(
            self.evolution.num_outputs >= 2,
            "Networks need at least two outputs"
        );

        // Simulation
        if let Some(cap) = self.simulation.max_ticks_per_generation {
            anyhow::ensure!(cap > 0, "Tick cap must be positive");
        }

        anyhow::ensure!(self.target_fps > 0, "Target FPS must be positive");
        anyhow::ensure!(self.target_fps <= 240, "Target FPS too high (max 240)");

        Ok(())
    }

    /// Parses and validates configuration from TOML text.
    pub fn from_toml(content: &str) -> anyhow::Result<Self> {
        let config = toml::from_str::<Self>(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Hash of everything that affects gameplay, stored with each telemetry session.
    #[must_use]
    pub fn fingerprint(&self) -> String {
        use sha2::{Digest, Sha256};
        let mut hasher = Sha256::new();
        hasher.update(format!("{:?}", self.field).as_bytes());
        hasher.update(format!("{:?}", self.agent).as_bytes());
        hasher.update(format!("{:?}", self.obstacles).as_bytes());
        hasher.update(format!("{:?}", self.scoring).as_bytes());
        hasher.update(format!("{:?}", self.evolution).as_bytes());
        hex::encode(hasher.finalize())
    }

    /// Duration of one frame at `target_fps`.
    #[must_use]
    pub fn frame_duration(&self) -> std::time::Duration {
        std::time::Duration::from_micros(1_000_000 / u64::from(self.target_fps.max(1)))
    }
}
