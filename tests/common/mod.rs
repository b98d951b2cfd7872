use flapper_core::config::AppConfig;
use flapper_core::decision::{NeuralPolicy, NeverFlap};
use flapper_core::lifecycle::spawn_agent;
use flapper_core::runner::Generation;
use flapper_core::trainer::Trainer;
use flapper_data::{Agent, ObstaclePair, SessionMode};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// Builds configurations and ready-to-run generations for integration tests.
#[allow(dead_code)]
pub struct SessionBuilder {
    config: AppConfig,
    seed: u64,
}

#[allow(dead_code)]
impl SessionBuilder {
    pub fn new() -> Self {
        let mut config = AppConfig::default();
        config.telemetry.record_actions = false;
        config.simulation.max_ticks_per_generation = Some(5_000);
        Self { config, seed: 0 }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self.config.seed = Some(seed);
        self
    }

    pub fn with_config<F>(mut self, modifier: F) -> Self
    where
        F: FnOnce(&mut AppConfig),
    {
        modifier(&mut self.config);
        self
    }

    pub fn with_population(mut self, size: usize) -> Self {
        self.config.evolution.population_size = size;
        self
    }

    pub fn with_generations(mut self, generations: u64) -> Self {
        self.config.evolution.generations = generations;
        self
    }

    pub fn config(&self) -> AppConfig {
        self.config.clone()
    }

    pub fn agent(&self) -> Agent {
        spawn_agent(&self.config)
    }

    /// `count` agents that never flap.
    pub fn never_flap(&self, count: usize) -> Generation<NeverFlap> {
        Generation::new(
            &self.config,
            0,
            SessionMode::Training,
            (0..count).map(|_| (None, NeverFlap)).collect(),
            ChaCha8Rng::seed_from_u64(self.seed),
        )
        .expect("Failed to create generation in test builder")
    }

    pub fn neural(&self, policies: Vec<NeuralPolicy>) -> Generation<NeuralPolicy> {
        Generation::new(
            &self.config,
            0,
            SessionMode::Replay,
            policies.into_iter().map(|p| (Some(p.genome().key), p)).collect(),
            ChaCha8Rng::seed_from_u64(self.seed),
        )
        .expect("Failed to create generation in test builder")
    }

    pub fn trainer(&self) -> Trainer {
        Trainer::new(self.config.clone()).expect("Failed to create trainer in test builder")
    }
}

/// A pair at `x` whose gap spans `gap_top..gap_bottom` on a 500 px field.
#[allow(dead_code)]
pub fn pair(id: u64, x: f64, gap_top: f64, gap_bottom: f64) -> ObstaclePair {
    ObstaclePair {
        id,
        x,
        width: 52.0,
        top_height: gap_top,
        bottom_height: 500.0 - gap_bottom,
        field_height: 500.0,
        passed: false,
    }
}
