mod common;

use common::{pair, SessionBuilder};
use flapper_core::decision::{DecisionContext, DecisionSource, InputState};
use flapper_core::runner::Generation;
use flapper_core::systems::action::{step_agent, Kinematics, StepOutcome};
use flapper_core::systems::perception::observe;
use flapper_core::telemetry::{MemoryTelemetry, NullTelemetry};
use flapper_data::{AgentState, Observation, SessionMode};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

#[test]
fn test_single_tick_without_flap_applies_gravity() {
    let builder = SessionBuilder::new().with_seed(1);
    let config = builder.config();
    let mut generation = builder.never_flap(1);
    let y0 = generation.contestants()[0].agent.body.y;

    let report = generation.tick(&InputState::default(), &NullTelemetry);
    assert!(report.spawned.is_none());

    let agent = &generation.contestants()[0].agent;
    let expected_velocity = config.agent.gravity.min(config.agent.max_fall_speed);
    assert_eq!(agent.velocity, expected_velocity);
    assert_eq!(agent.body.y, y0 + expected_velocity);
    assert!(agent.is_alive());
}

#[test]
fn test_flap_then_blocked_second_flap() {
    let builder = SessionBuilder::new();
    let config = builder.config();
    let k = Kinematics::new(&config);
    let mut agent = builder.agent();

    let first = step_agent(&mut agent, true, &[], &k);
    assert!(first.flapped);
    assert_eq!(agent.velocity, config.agent.jump_speed);
    assert_eq!(agent.flap_cooldown, config.agent.flap_cooldown_frames);

    let second = step_agent(&mut agent, true, &[], &k);
    assert!(!second.flapped);
    assert_eq!(agent.velocity, config.agent.jump_speed + config.agent.gravity);
    assert_eq!(agent.flap_cooldown, config.agent.flap_cooldown_frames - 1);
}

#[test]
fn test_overlap_kills_and_freezes_score() {
    let builder = SessionBuilder::new();
    let k = Kinematics::new(&builder.config());
    let mut agent = builder.agent();
    for _ in 0..5 {
        step_agent(&mut agent, false, &[], &k);
    }
    let score_before = agent.score;
    let ticks_before = agent.ticks_alive;

    // The top member reaches well below the agent.
    let blocking = pair(0, agent.body.x - 5.0, 450.0, 480.0);
    let result = step_agent(&mut agent, false, &[blocking], &k);

    assert_eq!(result.outcome, StepOutcome::Died);
    assert_eq!(agent.state, AgentState::Dead);
    assert_eq!(agent.score, score_before);
    assert_eq!(agent.ticks_alive, ticks_before);
}

#[test]
fn test_never_flap_generation_reports_every_fitness() {
    const N: usize = 12;
    let builder = SessionBuilder::new().with_seed(5);
    let increment = builder.config().scoring.per_tick_increment;
    let sink = MemoryTelemetry::new();
    let mut generation = builder.never_flap(N);
    generation.start(&sink, "test");
    generation.run(&sink);

    assert_eq!(generation.alive_count(), 0);
    let result = generation.finish(&sink);
    assert_eq!(result.fitness.len(), N);
    for agent in &result.fitness {
        let expected = agent.ticks_alive as f64 * increment;
        assert!((agent.fitness - expected).abs() < 1e-9);
        assert!(agent.ticks_alive > 0);
    }
    // Identical agents fall together and leave on the same tick.
    assert!(result
        .fitness
        .windows(2)
        .all(|w| w[0].ticks_alive == w[1].ticks_alive));
    assert_eq!(sink.session_summaries().len(), 1);
}

#[test]
fn test_observation_defaults_to_sentinel_before_first_spawn() {
    let builder = SessionBuilder::new();
    let config = builder.config();
    let observation = observe(&builder.agent(), &[], config.field.width);
    assert_eq!(observation.distance, config.field.width);
    assert_eq!(observation.clearance_above, config.field.width);
    assert_eq!(observation.clearance_below, config.field.width);
}

/// Steers towards the centre of the next gap. Keeps the previous target while
/// still inside a pair, since the pair being crossed is no longer observed.
struct GapSeeker {
    target: f64,
    hold: u32,
    last_distance: f64,
}

impl GapSeeker {
    fn new() -> Self {
        Self {
            target: 250.0,
            hold: 0,
            last_distance: f64::MAX,
        }
    }
}

impl DecisionSource for GapSeeker {
    fn decide(&mut self, ctx: &DecisionContext<'_>) -> bool {
        let obs = ctx.observation;
        let body = &ctx.agent.body;
        if obs.distance > self.last_distance {
            self.hold = 32;
        }
        self.last_distance = obs.distance;

        if self.hold > 0 {
            self.hold -= 1;
        } else if *obs != Observation::sentinel(400.0) {
            let gap_top = body.top() - obs.clearance_above;
            let gap_bottom = body.bottom() + obs.clearance_below;
            self.target = (gap_top + gap_bottom) / 2.0;
        }
        body.center_y() > self.target + 15.0 && ctx.agent.velocity > 0.0
    }
}

#[test]
fn test_gap_seeker_passes_obstacles() {
    let config = SessionBuilder::new()
        .with_config(|c| c.simulation.max_ticks_per_generation = Some(1_200))
        .config();
    let mut generation = Generation::new(
        &config,
        0,
        SessionMode::Training,
        vec![(None, GapSeeker::new())],
        ChaCha8Rng::seed_from_u64(9),
    )
    .unwrap();
    generation.run(&NullTelemetry);
    let result = generation.finish(&NullTelemetry);
    assert!(result.obstacles_passed > 0);
    assert!(result.ticks > 100);
}
