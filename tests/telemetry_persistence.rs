mod common;

use common::SessionBuilder;
use flapper_core::decision::{DecisionContext, DecisionSource, InputState, NeuralPolicy};
use flapper_core::telemetry::TelemetrySink;
use flapper_data::{Observation, SessionMode};
use flapper_io::{load_champion, save_champion, ChampionRecord, SqliteTelemetry, TelemetryReader};
use flapper_lib::telemetry::open_telemetry;
use flapper_neat::GenomeLogic;

#[test]
fn test_generation_is_recorded_in_sqlite() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("flapper.db");
    let builder = SessionBuilder::new()
        .with_seed(21)
        .with_config(|c| c.telemetry.record_actions = true);
    let sink = SqliteTelemetry::open(&path);

    let mut generation = builder.never_flap(4);
    generation.start(&sink, &builder.config().fingerprint());
    generation.run(&sink);
    let result = generation.finish(&sink);
    sink.flush();

    let reader = TelemetryReader::open(&path).unwrap();
    let counts = reader.table_counts().unwrap();
    assert_eq!(counts.sessions, 1);
    // One action per agent per survived tick plus the fatal one.
    let expected_actions: u64 = result.fitness.iter().map(|f| f.ticks_alive + 1).sum();
    assert_eq!(counts.actions, expected_actions);

    let breakdown = reader.action_breakdown(result.session_id).unwrap();
    assert_eq!(breakdown.flaps, 0);
    assert_eq!(breakdown.deaths, 4);

    let sessions = reader.top_sessions(SessionMode::Training, 5).unwrap();
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0].ticks, result.ticks);
}

#[test]
fn test_trainer_writes_generation_summaries() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("flapper.db");
    let builder = SessionBuilder::new()
        .with_seed(8)
        .with_population(6)
        .with_generations(3)
        .with_config(|c| c.simulation.max_ticks_per_generation = Some(600));
    let sink = SqliteTelemetry::open(&path);
    let mut trainer = builder.trainer();
    let shutdown = std::sync::atomic::AtomicBool::new(false);
    trainer.run(&sink, &shutdown).unwrap();
    sink.close();

    let reader = TelemetryReader::open(&path).unwrap();
    let rows = reader.generation_progress(10).unwrap();
    let generations: Vec<u64> = rows.iter().map(|r| r.generation).collect();
    assert_eq!(generations, vec![0, 1, 2]);
    assert!(rows.iter().all(|r| r.agent_count == 6));
    assert!(rows.iter().all(|r| r.max_fitness >= r.average_fitness));
}

#[test]
fn test_degraded_sink_still_completes_generation() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = SessionBuilder::new().config().telemetry;
    config.database_path = dir.path().join("no").join("such").join("dir.db");
    let sink = open_telemetry(&config);
    assert!(sink.is_degraded());

    let builder = SessionBuilder::new().with_seed(2);
    let mut generation = builder.never_flap(3);
    generation.start(sink.as_ref(), "degraded");
    generation.run(sink.as_ref());
    let result = generation.finish(sink.as_ref());
    sink.flush();

    assert_eq!(result.fitness.len(), 3);
    assert!(result.max_fitness() > 0.0);
}

#[test]
fn test_champion_reload_gives_identical_outputs() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("champion.json");
    let builder = SessionBuilder::new()
        .with_seed(13)
        .with_population(8)
        .with_generations(2)
        .with_config(|c| c.simulation.max_ticks_per_generation = Some(600));
    let mut trainer = builder.trainer();
    let shutdown = std::sync::atomic::AtomicBool::new(false);
    let champion = trainer
        .run(&flapper_core::NullTelemetry, &shutdown)
        .unwrap()
        .expect("a champion after two generations");

    let record = ChampionRecord::new(champion.clone(), 1, trainer.fingerprint().to_string());
    save_champion(&record, &path).unwrap();
    let loaded = load_champion(&path).unwrap();
    assert_eq!(loaded.config_fingerprint, trainer.fingerprint());
    assert!((loaded.fitness - record.fitness).abs() < 1e-9);

    let inputs = [
        [120.0f32, 35.0, 80.0],
        [400.0, 400.0, 400.0],
        [3.0, -12.0, 140.0],
    ];
    for input in inputs {
        assert_eq!(champion.forward(&input), loaded.genome.forward(&input));
    }

    // The same decisions come out of a policy built from either copy.
    let agent = builder.agent();
    let mut original = NeuralPolicy::new(champion);
    let mut reloaded = NeuralPolicy::new(loaded.genome);
    for input in inputs {
        let observation = Observation {
            distance: f64::from(input[0]),
            clearance_above: f64::from(input[1]),
            clearance_below: f64::from(input[2]),
        };
        let ctx = DecisionContext {
            agent: &agent,
            observation: &observation,
            input: &InputState::default(),
        };
        assert_eq!(original.decide(&ctx), reloaded.decide(&ctx));
        assert_eq!(original.last_outputs(), reloaded.last_outputs());
    }
}
