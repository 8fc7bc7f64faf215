//! Single-elimination tournament over a [`Roster`].
//!
//! Each bracket round pairs consecutive slots. A player facing an empty slot advances
//! without playing, a match decides between two players:
//!
//! - win: the player with the higher score advances
//! - draw: a random one of the two advances
//! - mutual loss: both are eliminated and the slot stays empty
//! - foul: the offender is eliminated
//!
//! Matches of one round run in parallel, up to [`Constraints::parallel_matches`]. Every
//! random choice is drawn from the tournament's seeded rng, in slot order, so a run is
//! reproducible whatever the parallelism.

use std::{
    collections::HashMap,
    iter,
    sync::{
        atomic::{AtomicUsize, Ordering},
        mpsc, Arc, Mutex, PoisonError,
    },
    thread,
};

use anyhow::Context;
use rand::{rngs::StdRng, Rng, SeedableRng};
use tracing::{debug, info, instrument, warn};

use crate::{
    agent::{Contender, Roster},
    bracket,
    confrontation::Confrontation,
    constraints::Constraints,
    match_runner::{run_match, MatchReport, MatchSettings},
    server::print_pairing_result,
    sink::{Elimination, Outcome, PairingResult, ResultSink, TournamentResult},
    variant::Generation,
};

type Slot = Option<Arc<Contender>>;
type SharedSink<'a> = Mutex<&'a mut dyn ResultSink>;

pub struct TournamentScheduler {
    tournament_id: String,
    generation: Generation,
    total_rounds: usize,
    constraints: Constraints,
    verbose: bool,
    rng: StdRng,
}

impl TournamentScheduler {
    pub fn new(
        tournament_id: String,
        generation: Generation,
        total_rounds: usize,
        constraints: Constraints,
        seed: u64,
    ) -> Self {
        TournamentScheduler {
            tournament_id,
            generation,
            total_rounds,
            constraints,
            verbose: false,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Print every pairing result to stdout.
    pub fn with_verbose(mut self, value: bool) -> Self {
        self.verbose = value;
        self
    }

    /// Runs the whole bracket and hands every result to `sink`.
    ///
    /// Sink failures are logged and do not change the results.
    ///
    /// # Errors
    /// When the number of rounds is invalid for the generation, or a match could not be
    /// started.
    #[instrument(skip_all, fields(tournament = %self.tournament_id))]
    pub fn run(
        mut self,
        roster: &Roster,
        sink: &mut dyn ResultSink,
    ) -> anyhow::Result<TournamentResult> {
        self.generation.validate_rounds(self.total_rounds)?;

        let mut slots = bracket::allocate(roster.contenders(), &mut self.rng);
        info!(
            players = roster.len(),
            rounds = bracket::rounds_for(roster.len()),
            "bracket ready"
        );

        let sink: SharedSink = Mutex::new(sink);
        let mut rounds = vec![];
        while slots.len() > 1 {
            bracket::assert_power_of_two(slots.len());
            let (next, eliminated) = self.play_round(slots, &sink)?;
            debug!(round = rounds.len() + 1, ?eliminated);
            rounds.push(eliminated);
            slots = next;
        }

        let survivor: Vec<String> = slots
            .into_iter()
            .flatten()
            .map(|contender| contender.name.clone())
            .collect();
        info!(?survivor, "tournament over");

        let depth = rounds.len() as i32;
        let eliminations = rounds
            .into_iter()
            .enumerate()
            .map(|(i, names)| Elimination {
                round: i as i32 - depth,
                names,
            })
            .chain(iter::once(Elimination {
                round: 0,
                names: survivor,
            }))
            .collect();
        let result = TournamentResult {
            tournament_id: self.tournament_id.clone(),
            generation: self.generation,
            eliminations,
        };

        let sink = sink.into_inner().unwrap_or_else(PoisonError::into_inner);
        if let Err(e) = sink.record_tournament_result(&result) {
            warn!("could not record tournament result: {e:#}");
        }
        Ok(result)
    }

    /// Plays one bracket round, returns the next round's slots and the eliminated names.
    fn play_round(
        &mut self,
        slots: Vec<Slot>,
        sink: &SharedSink,
    ) -> anyhow::Result<(Vec<Slot>, Vec<String>)> {
        let pairs: Vec<[Slot; 2]> = slots
            .chunks(2)
            .map(|pair| [pair[0].clone(), pair[1].clone()])
            .collect();

        let mut jobs = vec![];
        for (index, pair) in pairs.iter().enumerate() {
            if let [Some(first), Some(second)] = pair {
                jobs.push((
                    index,
                    MatchSettings {
                        confrontation: Confrontation::new(first.clone(), second.clone()),
                        generation: self.generation,
                        total_rounds: self.total_rounds,
                        seed: self.rng.random(),
                    },
                ));
            }
        }
        let mut reports = self.run_matches(&jobs, sink)?;

        let mut next = Vec::with_capacity(pairs.len());
        let mut eliminated = vec![];
        for (index, pair) in pairs.into_iter().enumerate() {
            let advancing = match pair {
                [Some(player), None] | [None, Some(player)] => {
                    debug!(player = %player.name, "bye");
                    Some(player)
                }
                [None, None] => None,
                [Some(first), Some(second)] => {
                    let report = reports
                        .remove(&index)
                        .context("match report went missing")?;
                    let seats = [first, second];
                    let winner = self.decide(&report);
                    for (seat, contender) in seats.iter().enumerate() {
                        if Some(seat) != winner {
                            eliminated.push(contender.name.clone());
                        }
                    }
                    winner.map(|seat| seats[seat].clone())
                }
            };
            next.push(advancing);
        }
        Ok((next, eliminated))
    }

    /// Seat of the player going through, if any.
    fn decide(&mut self, report: &MatchReport) -> Option<usize> {
        match report.outcome {
            Outcome::Win => report.winner(),
            Outcome::Draw => Some(self.rng.random_range(0..2)),
            Outcome::Foul => report.offender.map(|seat| 1 - seat),
            Outcome::MutualLoss => None,
        }
    }

    /// Runs every match of a round, keyed by pair index.
    fn run_matches(
        &self,
        jobs: &[(usize, MatchSettings)],
        sink: &SharedSink,
    ) -> anyhow::Result<HashMap<usize, MatchReport>> {
        let next_job = AtomicUsize::new(0);
        let (tx_result, rx_result) = mpsc::channel();
        let workers = self.constraints.parallel_matches.min(jobs.len());

        thread::scope(|scope| {
            for _ in 0..workers {
                let tx_result = tx_result.clone();
                let next_job = &next_job;
                scope.spawn(move || {
                    while let Some((index, settings)) =
                        jobs.get(next_job.fetch_add(1, Ordering::Relaxed))
                    {
                        let report = run_match(settings, &self.constraints);
                        if let Ok(report) = &report {
                            self.record(settings, report, sink);
                        }
                        if tx_result.send((*index, report)).is_err() {
                            break;
                        }
                    }
                });
            }
        });
        drop(tx_result);

        rx_result
            .into_iter()
            .map(|(index, report)| report.map(|report| (index, report)))
            .collect()
    }

    fn record(&self, settings: &MatchSettings, report: &MatchReport, sink: &SharedSink) {
        let result = PairingResult {
            tournament_id: self.tournament_id.clone(),
            generation: settings.generation,
            players: report.players.clone(),
            scores: report.scores,
            outcome: report.outcome,
        };
        if self.verbose {
            print_pairing_result(&settings.confrontation, &result);
        }
        let mut guard = sink.lock().unwrap_or_else(PoisonError::into_inner);
        if let Err(e) = guard.record_pairing_result(&result) {
            warn!("could not record {}: {e:#}", settings.confrontation);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::{
        agents::{AlwaysRock, Bot, Chicken, RandomPlay},
        constraints::ConstraintsBuilder,
        sink::MemorySink,
    };

    fn constraints(parallel_matches: usize) -> Constraints {
        ConstraintsBuilder::new()
            .with_message_timeout(Duration::from_secs(1))
            .with_shutdown_timeout(Duration::from_secs(1))
            .with_parallel_matches(parallel_matches)
            .build()
            .unwrap()
    }

    fn roster(size: usize) -> Roster {
        let mut roster = Roster::new();
        for i in 0..size {
            roster
                .add(&format!("bot_{i}"), || Box::new(Bot(RandomPlay)))
                .unwrap();
        }
        roster
    }

    fn scheduler(generation: Generation, rounds: usize, seed: u64) -> TournamentScheduler {
        TournamentScheduler::new("test".to_owned(), generation, rounds, constraints(4), seed)
    }

    #[test]
    fn five_players() {
        let mut sink = MemorySink::new();
        let result = scheduler(Generation::Gen0, 5, 3)
            .run(&roster(5), &mut sink)
            .unwrap();

        assert_eq!(
            result.eliminations.iter().map(|e| e.round).collect::<Vec<_>>(),
            vec![-3, -2, -1, 0]
        );
        // 8 slots: 3 byes, one real match in the first round
        assert_eq!(sink.pairings.len(), 4);
        let eliminated: usize = result.eliminations.iter().map(|e| e.names.len()).sum();
        assert_eq!(eliminated, 5);
        assert!(result.survivor().is_some());
        assert_eq!(sink.tournaments, vec![result]);
    }

    #[test]
    fn mutual_loss_leaves_no_survivor() {
        let mut roster = Roster::new();
        roster.add("chicken_a", || Box::new(Bot(Chicken))).unwrap();
        roster.add("chicken_b", || Box::new(Bot(Chicken))).unwrap();

        let mut sink = MemorySink::new();
        let result = scheduler(Generation::Gen3, 13, 0)
            .run(&roster, &mut sink)
            .unwrap();

        assert_eq!(result.survivor(), None);
        assert_eq!(result.eliminated_in(-1).len(), 2);
        assert_eq!(sink.pairings[0].outcome, Outcome::MutualLoss);
        assert_eq!(sink.pairings[0].scores, [-1, -1]);
    }

    #[test]
    fn draws_are_settled() {
        let mut roster = Roster::new();
        roster.add("rock_a", || Box::new(Bot(AlwaysRock))).unwrap();
        roster.add("rock_b", || Box::new(Bot(AlwaysRock))).unwrap();

        let mut sink = MemorySink::new();
        let result = scheduler(Generation::Gen0, 5, 9)
            .run(&roster, &mut sink)
            .unwrap();

        assert_eq!(sink.pairings[0].outcome, Outcome::Draw);
        assert!(result.survivor().is_some());
        assert_eq!(result.eliminated_in(-1).len(), 1);
    }

    #[test]
    fn seeded_runs_agree_whatever_the_parallelism() {
        let mut roster = Roster::new();
        for i in 0..6 {
            roster
                .add(&format!("rock_{i}"), || Box::new(Bot(AlwaysRock)))
                .unwrap();
        }
        let run = |parallel_matches| {
            TournamentScheduler::new(
                "test".to_owned(),
                Generation::Gen1,
                6,
                constraints(parallel_matches),
                11,
            )
            .run(&roster, &mut MemorySink::new())
            .unwrap()
        };
        assert_eq!(run(1), run(8));
    }

    #[test]
    fn trivial_brackets() {
        let result = scheduler(Generation::Gen0, 5, 0)
            .run(&roster(1), &mut MemorySink::new())
            .unwrap();
        assert_eq!(result.survivor(), Some("bot_0"));
        assert_eq!(result.eliminations.len(), 1);

        let result = scheduler(Generation::Gen0, 5, 0)
            .run(&Roster::new(), &mut MemorySink::new())
            .unwrap();
        assert_eq!(result.survivor(), None);
    }

    #[test]
    fn invalid_rounds() {
        assert!(scheduler(Generation::Gen1, 7, 0)
            .run(&roster(2), &mut MemorySink::new())
            .is_err());
    }
}
