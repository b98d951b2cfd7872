use clap::Parser;
use flapper_data::SessionMode;
use flapper_io::reader::{GenerationRow, SessionRow};
use flapper_io::TelemetryReader;
use serde::Serialize;
use uuid::Uuid;

#[derive(Parser, Debug)]
#[command(author, version, about = "Summarise a flapper telemetry database", long_about = None)]
struct Args {
    #[arg(short, long, default_value = "flapper.db")]
    db: String,

    /// Most recent generations to list.
    #[arg(short, long, default_value_t = 20)]
    generations: usize,

    /// Best human sessions to list.
    #[arg(short, long, default_value_t = 10)]
    sessions: usize,

    /// Flap/glide breakdown for one session.
    #[arg(long)]
    session: Option<Uuid>,

    /// Print JSON instead of tables.
    #[arg(long)]
    json: bool,
}

#[derive(Serialize)]
struct Report {
    generations: Vec<GenerationRow>,
    human_sessions: Vec<SessionRow>,
}

fn print_generations(rows: &[GenerationRow]) {
    if rows.is_empty() {
        println!("No training generations recorded.");
        return;
    }
    println!("{:>5}  {:>8}  {:>11}  {:>11}", "Gen", "Agents", "Max", "Average");
    for row in rows {
        println!(
            "{:>5}  {:>8}  {:>11.2}  {:>11.2}",
            row.generation, row.agent_count, row.max_fitness, row.average_fitness
        );
    }
    if let (Some(first), Some(last)) = (rows.first(), rows.last()) {
        println!(
            "Max fitness {:.2} -> {:.2} over {} generations",
            first.max_fitness,
            last.max_fitness,
            rows.len()
        );
    }
}

fn print_sessions(rows: &[SessionRow]) {
    if rows.is_empty() {
        println!("No human sessions recorded.");
        return;
    }
    println!("{:>6}  {:>7}  {:>9}  Started", "Score", "Ticks", "Seconds");
    for row in rows {
        println!(
            "{:>6}  {:>7}  {:>9.1}  {}",
            row.obstacles_passed,
            row.ticks,
            row.duration_ms as f64 / 1000.0,
            row.started_at
        );
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let reader = TelemetryReader::open(&args.db)?;

    let generations = reader.generation_progress(args.generations)?;
    let human_sessions = reader.top_sessions(SessionMode::Human, args.sessions)?;

    if args.json {
        let report = Report {
            generations,
            human_sessions,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        let counts = reader.table_counts()?;
        println!(
            "{}: {} sessions, {} actions, {} obstacles, {} generations\n",
            args.db, counts.sessions, counts.actions, counts.obstacles, counts.generations
        );
        print_generations(&generations);
        println!();
        print_sessions(&human_sessions);
    }

    if let Some(id) = args.session {
        let breakdown = reader.action_breakdown(id)?;
        println!(
            "\nSession {id}: {} flaps, {} glides, {} deaths",
            breakdown.flaps, breakdown.glides, breakdown.deaths
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_parsing_defaults() {
        let args = Args::parse_from(["analyze"]);
        assert_eq!(args.db, "flapper.db");
        assert_eq!(args.generations, 20);
        assert_eq!(args.sessions, 10);
        assert!(args.session.is_none());
        assert!(!args.json);
    }

    #[test]
    fn test_args_parsing_custom() {
        let id = Uuid::new_v4();
        let id_text = id.to_string();
        let args = Args::parse_from([
            "analyze",
            "-d",
            "runs/t.db",
            "-g",
            "5",
            "--session",
            id_text.as_str(),
            "--json",
        ]);
        assert_eq!(args.db, "runs/t.db");
        assert_eq!(args.generations, 5);
        assert_eq!(args.session, Some(id));
        assert!(args.json);
    }
}
