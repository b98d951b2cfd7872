//! Obstacle Generator and the play-field that owns the live obstacle pairs.

use crate::config::AppConfig;
use flapper_data::{Agent, ObstaclePair};
use rand::Rng;

/// Factory for obstacle pairs entering at the right edge of the field.
///
/// `bottom_heights` is never empty.
#[derive(Debug, Clone)]
pub struct ObstacleGenerator {
    field_width: f64,
    field_height: f64,
    width: f64,
    gap: f64,
    bottom_heights: Vec<f64>,
}

impl ObstacleGenerator {
    pub fn new(config: &AppConfig) -> anyhow::Result<Self> {
        anyhow::ensure!(
            !config.obstacles.bottom_heights.is_empty(),
            "At least one obstacle bottom height is required"
        );
        Ok(Self {
            field_width: config.field.width,
            field_height: config.field.height,
            width: config.obstacles.width,
            gap: config.obstacles.gap,
            bottom_heights: config.obstacles.bottom_heights.clone(),
        })
    }

    /// Builds one pair with a bottom height drawn uniformly from the configured set.
    ///
    /// The top member fills the rest of the field above the gap:
    /// `top_height == field_height - bottom_height - gap`.
    pub fn generate<R: Rng>(&self, id: u64, rng: &mut R) -> ObstaclePair {
        let bottom_height = self.bottom_heights[rng.gen_range(0..self.bottom_heights.len())];
        ObstaclePair {
            id,
            x: self.field_width,
            width: self.width,
            top_height: self.field_height - bottom_height - self.gap,
            bottom_height,
            field_height: self.field_height,
            passed: false,
        }
    }
}

/// Fires once every `interval` ticks, starting at tick `interval`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpawnTimer {
    interval: u64,
    elapsed: u64,
}

impl SpawnTimer {
    #[must_use]
    pub fn new(interval: u64) -> Self {
        Self {
            interval: interval.max(1),
            elapsed: 0,
        }
    }

    pub fn tick(&mut self) -> bool {
        self.elapsed += 1;
        if self.elapsed >= self.interval {
            self.elapsed = 0;
            true
        } else {
            false
        }
    }
}

/// Live obstacles plus the timer and generator feeding them.
#[derive(Debug, Clone)]
pub struct Playfield {
    pub obstacles: Vec<ObstaclePair>,
    generator: ObstacleGenerator,
    timer: SpawnTimer,
    speed: f64,
    next_id: u64,
    /// Pairs any agent has flown past.
    pub obstacles_passed: u64,
}

impl Playfield {
    pub fn new(config: &AppConfig) -> anyhow::Result<Self> {
        Ok(Self {
            obstacles: Vec::new(),
            generator: ObstacleGenerator::new(config)?,
            timer: SpawnTimer::new(config.obstacles.spawn_interval_ticks),
            speed: config.obstacles.speed,
            next_id: 0,
            obstacles_passed: 0,
        })
    }

    /// Spawns a pair if the timer fires, scrolls every pair left and drops
    /// pairs whose trailing edge has left the field. Returns the new pair.
    pub fn advance<R: Rng>(&mut self, rng: &mut R) -> Option<ObstaclePair> {
        let spawned = if self.timer.tick() {
            let pair = self.generator.generate(self.next_id, rng);
            self.next_id += 1;
            self.obstacles.push(pair.clone());
            Some(pair)
        } else {
            None
        };

        for pair in &mut self.obstacles {
            pair.x -= self.speed;
        }
        self.obstacles.retain(|pair| pair.trailing_edge() >= 0.0);
        spawned
    }

    /// Marks pairs whose trailing edge `agent` has crossed. Returns how many
    /// pairs were newly passed.
    pub fn mark_passed(&mut self, agent: &Agent) -> u64 {
        let mut newly = 0;
        for pair in self.obstacles.iter_mut().filter(|p| !p.passed) {
            if agent.leading_edge() > pair.trailing_edge() {
                pair.passed = true;
                newly += 1;
            }
        }
        self.obstacles_passed += newly;
        newly
    }
}
