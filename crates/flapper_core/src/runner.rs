//! Generation Runner: one cohort of agents sharing one tick loop.

use crate::config::AppConfig;
use crate::decision::{DecisionContext, DecisionSource, InputState};
use crate::lifecycle::spawn_agent;
use crate::obstacles::Playfield;
use crate::snapshot::{AgentSnapshot, FrameSnapshot, SightLines};
use crate::systems::action::{step_agent, Kinematics, StepOutcome, StepResult};
use crate::systems::perception::{nearest_obstacle, observation};
use crate::telemetry::TelemetrySink;
use chrono::Utc;
use flapper_data::{
    Action, ActionRecord, Agent, GenomeKey, ObstaclePair, ObstacleRecord, Observation,
    SessionMode, SessionRecord, SessionSummary,
};
use rand_chacha::ChaCha8Rng;
use std::time::{Duration, Instant};
use uuid::Uuid;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// One agent with the decision source steering it.
#[derive(Debug, Clone)]
pub struct Contestant<D> {
    pub agent: Agent,
    pub decider: D,
    /// Genome this agent evaluates, when driven by a network.
    pub key: Option<GenomeKey>,
    /// Mirrors `agent.score`; this is what gets written back to the genome.
    pub fitness: f64,
    pub observation: Observation,
    /// Gap centre of the nearest obstacle at the last observation.
    pub gap_center: Option<f64>,
    pub last_step: Option<StepResult>,
}

impl<D: DecisionSource> Contestant<D> {
    fn advance(
        &mut self,
        input: &InputState,
        obstacles: &[ObstaclePair],
        kinematics: &Kinematics,
        field_width: f64,
    ) {
        if !self.agent.is_alive() {
            self.last_step = None;
            return;
        }

        let nearest = nearest_obstacle(&self.agent, obstacles);
        self.observation = observation(&self.agent, nearest, field_width);
        self.gap_center = nearest.map(ObstaclePair::gap_center);

        let flap = self.decider.decide(&DecisionContext {
            agent: &self.agent,
            observation: &self.observation,
            input,
        });
        let result = step_agent(&mut self.agent, flap, obstacles, kinematics);
        if result.outcome == StepOutcome::Survived {
            self.fitness += kinematics.per_tick_increment;
        }
        self.last_step = Some(result);
    }
}

/// Per-agent outcome once a generation has ended.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AgentFitness {
    pub key: Option<GenomeKey>,
    pub fitness: f64,
    pub ticks_alive: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GenerationResult {
    pub session_id: Uuid,
    pub index: u64,
    pub ticks: u64,
    pub obstacles_passed: u64,
    pub fitness: Vec<AgentFitness>,
    pub duration: Duration,
}

impl GenerationResult {
    #[must_use]
    pub fn max_fitness(&self) -> f64 {
        self.fitness.iter().map(|f| f.fitness).fold(0.0, f64::max)
    }

    #[must_use]
    pub fn average_fitness(&self) -> f64 {
        if self.fitness.is_empty() {
            return 0.0;
        }
        self.fitness.iter().map(|f| f.fitness).sum::<f64>() / self.fitness.len() as f64
    }
}

/// What happened during one tick.
#[derive(Debug, Clone, PartialEq)]
pub struct TickReport {
    pub tick: u64,
    pub alive: usize,
    pub died: usize,
    pub spawned: Option<ObstaclePair>,
    pub newly_passed: u64,
}

pub struct Generation<D> {
    session_id: Uuid,
    index: u64,
    mode: SessionMode,
    contestants: Vec<Contestant<D>>,
    playfield: Playfield,
    kinematics: Kinematics,
    field_width: f64,
    field_height: f64,
    rng: ChaCha8Rng,
    tick: u64,
    parallel: bool,
    parallel_threshold: usize,
    max_ticks: Option<u64>,
    record_actions: bool,
    started: Instant,
}

impl<D: DecisionSource + Send> Generation<D> {
    /// Spawns one agent per decision source, all at the field centre.
    pub fn new(
        config: &AppConfig,
        index: u64,
        mode: SessionMode,
        deciders: Vec<(Option<GenomeKey>, D)>,
        rng: ChaCha8Rng,
    ) -> anyhow::Result<Self> {
        let playfield = Playfield::new(config)?;
        let field_width = config.field.width;
        let contestants = deciders
            .into_iter()
            .map(|(key, decider)| Contestant {
                agent: spawn_agent(config),
                decider,
                key,
                fitness: 0.0,
                observation: Observation::sentinel(field_width),
                gap_center: None,
                last_step: None,
            })
            .collect();

        Ok(Self {
            session_id: Uuid::new_v4(),
            index,
            mode,
            contestants,
            playfield,
            kinematics: Kinematics::new(config),
            field_width,
            field_height: config.field.height,
            rng,
            tick: 0,
            parallel: config.simulation.parallel,
            parallel_threshold: config.simulation.parallel_threshold,
            max_ticks: config.simulation.max_ticks_per_generation,
            record_actions: config.telemetry.record_actions,
            started: Instant::now(),
        })
    }

    /// Opens the telemetry session for this generation.
    pub fn start(&mut self, sink: &dyn TelemetrySink, config_fingerprint: &str) {
        self.started = Instant::now();
        sink.session_started(&SessionRecord {
            session_id: self.session_id,
            mode: self.mode,
            generation: (self.mode != SessionMode::Human).then_some(self.index),
            agent_count: self.contestants.len(),
            config_fingerprint: config_fingerprint.to_string(),
            started_at: Utc::now(),
        });
    }

    /// Advances obstacles and every live agent by one tick.
    pub fn tick(&mut self, input: &InputState, sink: &dyn TelemetrySink) -> TickReport {
        let spawned = self.playfield.advance(&mut self.rng);
        if let Some(pair) = &spawned {
            sink.obstacle_spawned(&ObstacleRecord {
                session_id: self.session_id,
                tick: self.tick,
                x: pair.x,
                gap_top: pair.gap_top(),
                gap_bottom: pair.gap_bottom(),
            });
        }

        self.advance_agents(input);

        let mut died = 0;
        let mut newly_passed = 0;
        for (i, contestant) in self.contestants.iter().enumerate() {
            let Some(step) = contestant.last_step else {
                continue;
            };
            match step.outcome {
                StepOutcome::Survived => {
                    newly_passed += self.playfield.mark_passed(&contestant.agent);
                }
                StepOutcome::Died => died += 1,
                StepOutcome::Inactive => continue,
            }
            if self.record_actions {
                sink.action(&ActionRecord {
                    session_id: self.session_id,
                    tick: self.tick,
                    agent: i,
                    action: if step.flapped {
                        Action::Flap
                    } else {
                        Action::Glide
                    },
                    agent_y: contestant.agent.body.center_y(),
                    distance: contestant.observation.distance,
                    gap_y: contestant.gap_center,
                    score: contestant.agent.score,
                    survived: step.outcome == StepOutcome::Survived,
                });
            }
        }

        self.tick += 1;
        if died > 0 {
            tracing::debug!(tick = self.tick, died, alive = self.alive_count(), "Agents retired");
        }
        TickReport {
            tick: self.tick,
            alive: self.alive_count(),
            died,
            spawned,
            newly_passed,
        }
    }

    fn advance_agents(&mut self, input: &InputState) {
        let obstacles = &self.playfield.obstacles;
        let kinematics = &self.kinematics;
        let field_width = self.field_width;

        #[cfg(feature = "parallel")]
        if self.parallel && self.contestants.len() >= self.parallel_threshold {
            self.contestants
                .par_iter_mut()
                .for_each(|c| c.advance(input, obstacles, kinematics, field_width));
            return;
        }

        for contestant in &mut self.contestants {
            contestant.advance(input, obstacles, kinematics, field_width);
        }
    }

    /// Ticks with no input until every agent is dead or the tick cap is hit.
    pub fn run(&mut self, sink: &dyn TelemetrySink) {
        let input = InputState::default();
        while !self.is_finished() {
            self.tick(&input, sink);
        }
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.alive_count() == 0 || self.max_ticks.is_some_and(|cap| self.tick >= cap)
    }

    /// Closes the telemetry session and reports each agent's final fitness.
    pub fn finish(self, sink: &dyn TelemetrySink) -> GenerationResult {
        let duration = self.started.elapsed();
        let result = GenerationResult {
            session_id: self.session_id,
            index: self.index,
            ticks: self.tick,
            obstacles_passed: self.playfield.obstacles_passed,
            fitness: self
                .contestants
                .iter()
                .map(|c| AgentFitness {
                    key: c.key,
                    fitness: c.fitness,
                    ticks_alive: c.agent.ticks_alive,
                })
                .collect(),
            duration,
        };
        // A player is scored on obstacles passed, a cohort on its best fitness.
        let final_score = match self.mode {
            SessionMode::Human => self.playfield.obstacles_passed as f64,
            SessionMode::Training | SessionMode::Replay => self.best_score(),
        };
        sink.session_finished(&SessionSummary {
            session_id: self.session_id,
            final_score,
            obstacles_passed: self.playfield.obstacles_passed,
            ticks: self.tick,
            duration_ms: duration.as_millis() as u64,
        });
        result
    }

    #[must_use]
    pub fn snapshot(&self) -> FrameSnapshot {
        let best = self
            .contestants
            .iter()
            .filter(|c| c.agent.is_alive())
            .max_by(|a, b| a.agent.score.total_cmp(&b.agent.score));
        let sight = best.and_then(|c| {
            nearest_obstacle(&c.agent, &self.playfield.obstacles).map(|pair| {
                let mid_x = pair.x + pair.width / 2.0;
                SightLines {
                    origin: (c.agent.body.center_x(), c.agent.body.center_y()),
                    gap_top: (mid_x, pair.gap_top()),
                    gap_bottom: (mid_x, pair.gap_bottom()),
                }
            })
        });

        FrameSnapshot {
            tick: self.tick,
            generation: (self.mode != SessionMode::Human).then_some(self.index),
            field_width: self.field_width,
            field_height: self.field_height,
            agents: self
                .contestants
                .iter()
                .enumerate()
                .map(|(index, c)| AgentSnapshot {
                    index,
                    body: c.agent.body,
                    alive: c.agent.is_alive(),
                    score: c.agent.score,
                })
                .collect(),
            obstacles: self.playfield.obstacles.clone(),
            alive: self.alive_count(),
            best_score: self.best_score(),
            obstacles_passed: self.playfield.obstacles_passed,
            sight,
        }
    }
}

impl<D> Generation<D> {
    #[must_use]
    pub fn alive_count(&self) -> usize {
        self.contestants.iter().filter(|c| c.agent.is_alive()).count()
    }

    #[must_use]
    pub fn best_score(&self) -> f64 {
        self.contestants
            .iter()
            .map(|c| c.agent.score)
            .fold(0.0, f64::max)
    }

    #[must_use]
    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    #[must_use]
    pub fn index(&self) -> u64 {
        self.index
    }

    #[must_use]
    pub fn tick_count(&self) -> u64 {
        self.tick
    }

    #[must_use]
    pub fn obstacles_passed(&self) -> u64 {
        self.playfield.obstacles_passed
    }

    #[must_use]
    pub fn contestants(&self) -> &[Contestant<D>] {
        &self.contestants
    }

    #[must_use]
    pub fn obstacles(&self) -> &[ObstaclePair] {
        &self.playfield.obstacles
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decision::{HumanInput, NeverFlap};
    use crate::telemetry::{MemoryTelemetry, NullTelemetry};
    use rand::SeedableRng;

    fn never_flap_generation(config: &AppConfig, n: usize) -> Generation<NeverFlap> {
        let deciders = (0..n as u64).map(|k| (Some(k), NeverFlap)).collect();
        Generation::new(
            config,
            0,
            SessionMode::Training,
            deciders,
            ChaCha8Rng::seed_from_u64(1),
        )
        .unwrap()
    }

    #[test]
    fn test_never_flap_cohort_terminates() {
        let config = AppConfig::default();
        let mut generation = never_flap_generation(&config, 5);
        generation.run(&NullTelemetry);
        assert!(generation.is_finished());

        let result = generation.finish(&NullTelemetry);
        assert_eq!(result.fitness.len(), 5);
        for agent in &result.fitness {
            let expected = agent.ticks_alive as f64 * config.scoring.per_tick_increment;
            assert!((agent.fitness - expected).abs() < 1e-9);
            assert!(agent.ticks_alive > 0);
        }
    }

    #[test]
    fn test_tick_cap_ends_generation() {
        let mut config = AppConfig::default();
        config.simulation.max_ticks_per_generation = Some(3);
        let mut generation = never_flap_generation(&config, 2);
        generation.run(&NullTelemetry);
        assert_eq!(generation.tick_count(), 3);
        assert_eq!(generation.alive_count(), 2);
    }

    #[test]
    fn test_telemetry_records_actions_and_summary() {
        let config = AppConfig::default();
        let sink = MemoryTelemetry::new();
        let mut generation = never_flap_generation(&config, 3);
        generation.start(&sink, "abc");
        generation.run(&sink);
        let result = generation.finish(&sink);

        let sessions = sink.session_records();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].agent_count, 3);
        assert_eq!(sessions[0].generation, Some(0));

        let live_ticks: u64 = result.fitness.iter().map(|f| f.ticks_alive + 1).sum();
        assert_eq!(sink.action_count() as u64, live_ticks);

        let summaries = sink.session_summaries();
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].ticks, result.ticks);
    }

    #[test]
    fn test_obstacle_spawn_is_reported() {
        let mut config = AppConfig::default();
        config.simulation.max_ticks_per_generation = Some(61);
        let sink = MemoryTelemetry::new();
        let deciders = vec![(None, HumanInput::new())];
        let mut generation = Generation::new(
            &config,
            0,
            SessionMode::Human,
            deciders,
            ChaCha8Rng::seed_from_u64(3),
        )
        .unwrap();

        // Keep the agent aloft by tapping the flap key every few ticks.
        for t in 0..61 {
            let input = InputState {
                flap_held: t % 30 == 0,
            };
            generation.tick(&input, &sink);
        }
        let spawns = sink.obstacle_records();
        assert_eq!(spawns.len(), 1);
        assert_eq!(spawns[0].tick, 59);
        assert_eq!(spawns[0].gap_bottom - spawns[0].gap_top, config.obstacles.gap);
    }

    #[test]
    fn test_snapshot_reflects_state() {
        let config = AppConfig::default();
        let mut generation = never_flap_generation(&config, 4);
        generation.tick(&InputState::default(), &NullTelemetry);
        let snapshot = generation.snapshot();
        assert_eq!(snapshot.agents.len(), 4);
        assert_eq!(snapshot.alive, 4);
        assert_eq!(snapshot.generation, Some(0));
        assert!(snapshot.sight.is_none());
    }

    #[test]
    fn test_parallel_and_serial_agree() {
        let mut config = AppConfig::default();
        config.simulation.parallel_threshold = 1;

        config.simulation.parallel = false;
        let mut serial = never_flap_generation(&config, 8);
        serial.run(&NullTelemetry);

        config.simulation.parallel = true;
        let mut parallel = never_flap_generation(&config, 8);
        parallel.run(&NullTelemetry);

        assert_eq!(
            serial.finish(&NullTelemetry).fitness,
            parallel.finish(&NullTelemetry).fitness
        );
    }
}
