//! Core evaluation logic for running tournaments.
//!
//! This module defines the [`Evaluator`] type, which runs one single-elimination
//! tournament per generation of a schedule. Its responsibilities include:
//!
//! - Setting up logging according to the [`Configuration`]
//! - Seeding every tournament
//! - Enforcing timing limits via [`Constraints`]
//! - Printing pairing results as they come when verbose
//!
//! # Example
//!
//! See crate-level documentation for an example on how to use the `Evaluator`.

use rand::Rng;
use tracing::{info, instrument, trace};

use crate::agent::Roster;
use crate::configuration::Configuration;
use crate::confrontation::Confrontation;
use crate::constraints::Constraints;
use crate::logger::init_logger;
use crate::sink::{Outcome, PairingResult, ResultSink, TournamentResult};
use crate::tournament_scheduler::TournamentScheduler;
use crate::variant::Generation;

/// Runs tournaments between the contenders of a [`Roster`].
#[derive(Debug, Clone)]
pub struct Evaluator {
    config: Configuration,
    constraints: Constraints,
    seed: u64,
}

impl Evaluator {
    /// Create an [`Evaluator`] with given [`Configuration`] and [`Constraints`].
    ///
    /// # Errors
    /// When logging is enabled and the log file or the subscriber cannot be set up.
    #[instrument(skip_all)]
    pub fn new(config: Configuration, constraints: Constraints) -> anyhow::Result<Evaluator> {
        if config.log {
            init_logger()?;
        }
        trace!(?config, ?constraints);

        Ok(Evaluator {
            config,
            constraints,
            seed: config.seed.unwrap_or_else(|| rand::rng().random()),
        })
    }

    /// Runs one tournament of `generation`, `rounds` rounds per match.
    ///
    /// # Errors
    /// When `rounds` cannot be played with `generation`, or a match could not be started.
    pub fn run_generation(
        &self,
        tournament_id: &str,
        generation: Generation,
        rounds: usize,
        roster: &Roster,
        sink: &mut dyn ResultSink,
    ) -> anyhow::Result<TournamentResult> {
        info!(tournament_id, %generation, rounds, players = ?roster.names());
        if self.config.verbose {
            println!("\x1b[1mTournament {tournament_id} (generation {generation}, {rounds} rounds)\x1b[0m");
        }

        let result = TournamentScheduler::new(
            tournament_id.to_owned(),
            generation,
            rounds,
            self.constraints,
            self.seed.wrapping_add(u64::from(generation.id())),
        )
        .with_verbose(self.config.verbose)
        .run(roster, sink)?;

        if self.config.verbose {
            print_tournament_result(&result);
        }
        Ok(result)
    }

    /// Runs one tournament per `(generation, rounds)` entry, identified as `"{id}-{generation}"`.
    ///
    /// # Errors
    /// Stops at the first tournament that fails.
    pub fn run_schedule(
        &self,
        id: &str,
        schedule: &[(Generation, usize)],
        roster: &Roster,
        sink: &mut dyn ResultSink,
    ) -> anyhow::Result<Vec<TournamentResult>> {
        let mut results = Vec::with_capacity(schedule.len());
        for &(generation, rounds) in schedule {
            let tournament_id = format!("{id}-{generation}");
            results.push(self.run_generation(&tournament_id, generation, rounds, roster, sink)?);
        }
        Ok(results)
    }
}

pub(crate) fn print_pairing_result(confrontation: &Confrontation, result: &PairingResult) {
    let scores = result
        .scores
        .iter()
        .map(|s| s.to_string())
        .collect::<Vec<_>>()
        .join("-");
    let outcome = match result.outcome {
        Outcome::Win | Outcome::Draw => format!("{}", result.outcome),
        // red
        Outcome::MutualLoss | Outcome::Foul => format!("\x1b[31m{}\x1b[39m", result.outcome),
    };

    // green match, scores, outcome
    println!("\x1b[32m{confrontation}: \x1b[39m{scores} {outcome}");
}

fn print_tournament_result(result: &TournamentResult) {
    for elimination in result.eliminations.iter().filter(|e| e.round != 0) {
        println!(
            "  round {}: \x1b[31m{}\x1b[39m",
            elimination.round,
            elimination.names.join(", ")
        );
    }
    match result.survivor() {
        Some(name) => println!("  winner: \x1b[32m{name}\x1b[39m"),
        None => println!("  winner: nobody"),
    }
}
