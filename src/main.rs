use std::path::PathBuf;

use clap::Parser;
use rps_arena::prelude::*;

/// Runs the default schedule between the built-in bots.
///
/// Timeouts and parallelism are read from `MESSAGE_TIMEOUT_MS`, `SHUTDOWN_TIMEOUT_MS` and
/// `PARALLEL_MATCHES`, logging and seeding from `ARENA_VERBOSE`, `ARENA_LOG` and `ARENA_SEED`.
#[derive(Parser, Debug)]
#[command(name = "rps-arena", version)]
struct Args {
    /// Prefix of the tournament ids, one tournament per generation
    tournament_id: String,

    /// JSON-lines file the results are appended to
    #[arg(default_value = "results.jsonl")]
    results_file: PathBuf,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let constraints = ConstraintsBuilder::from_env().build()?;
    let evaluator = Evaluator::new(Configuration::from_env(), constraints)?;
    let roster = builtin_roster()?;
    let mut sink = JsonLinesSink::open(&args.results_file)?;

    let results =
        evaluator.run_schedule(&args.tournament_id, &DEFAULT_SCHEDULE, &roster, &mut sink)?;

    for result in results {
        println!(
            "{}: {}",
            result.tournament_id,
            result.survivor().unwrap_or("nobody")
        );
    }
    println!("results appended to {}", args.results_file.display());
    Ok(())
}
