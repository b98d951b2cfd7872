use anyhow::{Context, Result};
use clap::Parser;
use flapper_core::{init_logging, AppConfig, LogTarget, TelemetrySink};
use flapper_io::load_champion;
use flapper_lib::app::{App, ShutdownManager};
use flapper_lib::headless::run_headless;
use flapper_lib::telemetry::open_telemetry;
use flapper_tui::Tui;
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// What drives the agents
    #[arg(short, long, value_enum, default_value = "human")]
    mode: Mode,

    /// Custom config file path
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Override the number of generations to train
    #[arg(short, long)]
    generations: Option<u64>,

    /// Override the population size
    #[arg(short, long)]
    population: Option<usize>,

    /// Seed for a reproducible run
    #[arg(long)]
    seed: Option<u64>,

    /// Override the telemetry database path
    #[arg(long)]
    db: Option<PathBuf>,

    /// Disable telemetry for this run
    #[arg(long)]
    no_telemetry: bool,

    /// Where the trained champion is written (watch, headless) or read from (replay)
    #[arg(long, alias = "genome", default_value = "champion.json")]
    champion: PathBuf,

    /// Log file used while the terminal UI is active
    #[arg(long, default_value = "flapper.log")]
    log_file: PathBuf,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum Mode {
    Human,
    Watch,
    Headless,
    Replay,
}

fn build_config(args: &Args) -> Result<AppConfig> {
    let mut config = App::load_config(&args.config);
    if let Some(generations) = args.generations {
        config.evolution.generations = generations;
    }
    if let Some(population) = args.population {
        config.evolution.population_size = population;
    }
    if args.seed.is_some() {
        config.seed = args.seed;
    }
    if let Some(db) = &args.db {
        config.telemetry.database_path = db.clone();
    }
    if args.no_telemetry {
        config.telemetry.enabled = false;
    }
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

fn headless(
    config: AppConfig,
    telemetry: &dyn TelemetrySink,
    shutdown: &ShutdownManager,
    champion_path: &Path,
) -> Result<()> {
    let outcome = run_headless(config, telemetry, &shutdown.flag(), Some(champion_path))?;
    match &outcome.champion {
        Some(record) => println!(
            "Trained {} generations. Champion fitness {:.2} saved to {}",
            outcome.generations,
            record.fitness,
            champion_path.display()
        ),
        None => println!("Stopped before any generation completed."),
    }
    if shutdown.is_shutdown_requested() {
        println!("Interrupted after {} generations.", outcome.generations);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let target = if args.mode == Mode::Headless {
        LogTarget::Stderr
    } else {
        LogTarget::File(args.log_file.clone())
    };
    init_logging(target)?;

    let config = build_config(&args)?;
    let shutdown = ShutdownManager::new();
    shutdown.install_ctrl_c();
    let telemetry = open_telemetry(&config.telemetry);

    let mut app = match args.mode {
        Mode::Headless => {
            return headless(config, telemetry.as_ref(), &shutdown, &args.champion);
        }
        Mode::Human => App::new_human(config, telemetry)?,
        Mode::Watch => App::new_watch(config, telemetry, Some(args.champion.clone()))?,
        Mode::Replay => {
            let champion = load_champion(&args.champion)
                .with_context(|| format!("Failed to load champion {}", args.champion.display()))?;
            App::new_replay(config, telemetry, champion)?
        }
    };

    let mut tui = Tui::new()?;
    tui.init()?;
    let res = app.run(&mut tui, shutdown.flag()).await;
    tui.exit()?;

    if let Err(e) = res {
        eprintln!("Application error: {e}");
        return Err(e);
    }
    if let Some(best) = app.best_so_far {
        println!("Best: {best:.2}");
    }
    Ok(())
}
