//! Runs one match between two agents.
//!
//! Each agent runs on its own thread and talks to the referee through its [`Mailbox`]. The
//! referee alternates between both mailboxes and only touches the [`Game`] once it has
//! collected every input of a step. Any late, missing or malformed message is a foul of the
//! agent that sent it (or failed to), and ends the match.

use std::{
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

use anyhow::{anyhow, Context};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, instrument, trace, warn};

use crate::{
    agent::Contender,
    confrontation::Confrontation,
    constraints::Constraints,
    game::{Game, GameError},
    mailbox::{self, Mailbox},
    protocol::{parse_hand, SetupResponse},
    sink::Outcome,
    variant::Generation,
};

/// Everything needed to play one match.
#[derive(Debug, Clone)]
pub struct MatchSettings {
    pub confrontation: Confrontation,
    pub generation: Generation,
    pub total_rounds: usize,
    pub seed: u64,
}

/// Final state of a match, in seat order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchReport {
    pub players: [String; 2],
    pub scores: [i32; 2],
    pub outcome: Outcome,
    /// Seat of the player that fouled, if any.
    pub offender: Option<usize>,
}

impl MatchReport {
    /// Seat of the player with the higher score.
    pub fn winner(&self) -> Option<usize> {
        match self.scores[0].cmp(&self.scores[1]) {
            std::cmp::Ordering::Greater => Some(0),
            std::cmp::Ordering::Less => Some(1),
            std::cmp::Ordering::Equal => None,
        }
    }
}

struct AgentContext {
    mailbox: Mailbox,
    handle: Option<JoinHandle<anyhow::Result<()>>>,
}

impl AgentContext {
    fn spawn(contender: &Contender) -> anyhow::Result<Self> {
        let (mailbox, link) = mailbox::channel();
        let mut agent = contender.spawn_agent();
        let handle = thread::Builder::new()
            .name(format!("agent-{}", contender.name))
            .spawn(move || agent.run(link))
            .with_context(|| format!("could not spawn thread of agent {}", contender.name))?;
        Ok(Self {
            mailbox,
            handle: Some(handle),
        })
    }
}

struct Referee {
    game: Game,
    contexts: Vec<AgentContext>,
    message_timeout: Duration,
    shutdown_timeout: Duration,
}

/// Plays a whole match.
///
/// # Errors
/// Only on infrastructure failures (a thread could not be spawned) or invalid settings.
/// Anything an agent does wrong ends up in the [`MatchReport`].
#[instrument(skip_all, fields(pairing = %settings.confrontation, generation = %settings.generation))]
pub fn run_match(settings: &MatchSettings, constraints: &Constraints) -> anyhow::Result<MatchReport> {
    let players = settings.confrontation.names();
    let game = Game::new(
        settings.generation,
        players.to_vec(),
        settings.total_rounds,
        settings.seed,
    )?;
    let contexts = settings
        .confrontation
        .ordered_player
        .iter()
        .map(|contender| AgentContext::spawn(contender))
        .collect::<anyhow::Result<Vec<_>>>()?;

    let mut referee = Referee {
        game,
        contexts,
        message_timeout: constraints.message_timeout,
        shutdown_timeout: constraints.shutdown_timeout,
    };

    let played = referee.play().and_then(|()| referee.shutdown());
    let (outcome, offender) = match played {
        Ok(()) => (Outcome::Win, None),
        Err(GameError::Foul { player, reason }) => {
            warn!(offender = %players[player], %reason, "foul");
            (Outcome::Foul, Some(player))
        }
        Err(GameError::MutualLoss) => (Outcome::MutualLoss, None),
        Err(e) => return Err(anyhow!(e).context("game driven out of order")),
    };

    let scores = referee.game.scores()?;
    let scores = [scores[0], scores[1]];
    let outcome = match outcome {
        Outcome::Win if scores[0] == scores[1] => Outcome::Draw,
        outcome => outcome,
    };
    info!(?scores, %outcome, "match over");

    // remaining agent threads are detached, dropping the mailboxes unblocks them
    Ok(MatchReport {
        players,
        scores,
        outcome,
        offender,
    })
}

impl Referee {
    fn play(&mut self) -> Result<(), GameError> {
        let header = self.game.describe();
        for player in 0..self.contexts.len() {
            self.send(player, &header)?;
        }
        for player in 0..self.contexts.len() {
            let reply = self.receive(player)?;
            let setup = serde_json::from_value::<SetupResponse>(reply)
                .map_err(|e| self.fault(player, format!("malformed setup: {e}")))?;
            self.game.configure(player, &setup)?;
        }

        while !self.game.is_finished() {
            trace!(round = self.game.current_round());
            for (player, state) in self.game.round_states()?.iter().enumerate() {
                self.send(player, state)?;
            }
            let hands = [self.receive(0)?, self.receive(1)?].map(|reply| parse_hand(&reply));
            for (player, result) in self.game.resolve(&hands)?.iter().enumerate() {
                self.send(player, result)?;
            }
        }
        Ok(())
    }

    /// Waits for every agent to return, within one shared deadline.
    fn shutdown(&mut self) -> Result<(), GameError> {
        let deadline = Instant::now() + self.shutdown_timeout;
        for player in 0..self.contexts.len() {
            let Some(handle) = self.contexts[player].handle.take() else {
                continue;
            };
            while !handle.is_finished() && Instant::now() < deadline {
                thread::sleep(Duration::from_millis(1));
            }
            if !handle.is_finished() {
                return Err(self.fault(player, "still running after the last round".to_owned()));
            }
            match handle.join() {
                Ok(Ok(())) => debug!(player, "agent returned"),
                Ok(Err(e)) => return Err(self.fault(player, format!("agent failed: {e:#}"))),
                Err(_) => return Err(self.fault(player, "agent panicked".to_owned())),
            }
        }
        Ok(())
    }

    fn send(&mut self, player: usize, message: &impl Serialize) -> Result<(), GameError> {
        self.contexts[player]
            .mailbox
            .send(message, self.message_timeout)
            .map_err(|e| self.fault(player, e.to_string()))
    }

    fn receive(&mut self, player: usize) -> Result<Value, GameError> {
        self.contexts[player]
            .mailbox
            .receive(self.message_timeout)
            .map_err(|e| self.fault(player, e.to_string()))
    }

    /// Ends the game in favour of the opponent of `player`.
    fn fault(&mut self, player: usize, reason: String) -> GameError {
        let opponent = (player + 1) % self.contexts.len();
        self.game.force_terminate(Some(opponent));
        GameError::Foul { player, reason }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use super::*;
    use crate::{
        agent::Agent,
        agents::{AlwaysRock, Bot, Chicken, Strategy},
        card::Card,
        constraints::ConstraintsBuilder,
        game::{LOSS_SCORE, WIN_SCORE},
        mailbox::AgentLink,
        protocol::{MatchHeader, RoundHeader},
    };

    fn contender(name: &str, factory: impl Fn() -> Box<dyn Agent> + Send + Sync + 'static) -> Arc<Contender> {
        Arc::new(Contender::new(name.to_owned(), 1, factory))
    }

    fn settings(
        generation: Generation,
        total_rounds: usize,
        first: Arc<Contender>,
        second: Arc<Contender>,
    ) -> MatchSettings {
        MatchSettings {
            confrontation: Confrontation::new(first, second),
            generation,
            total_rounds,
            seed: 42,
        }
    }

    fn constraints() -> Constraints {
        ConstraintsBuilder::new()
            .with_message_timeout(Duration::from_millis(500))
            .with_shutdown_timeout(Duration::from_millis(500))
            .build()
            .unwrap()
    }

    fn rock() -> Arc<Contender> {
        contender("rock", || Box::new(Bot(AlwaysRock)))
    }

    /// Reads the header and never answers.
    struct Silent;

    impl Agent for Silent {
        fn run(&mut self, link: AgentLink) -> anyhow::Result<()> {
            let _header = link.receive_value()?;
            link.receive_value()?;
            Ok(())
        }
    }

    /// Answers the header with garbage.
    struct Garbage;

    impl Agent for Garbage {
        fn run(&mut self, link: AgentLink) -> anyhow::Result<()> {
            let _header = link.receive_value()?;
            link.send_value(json!("hello"))?;
            link.receive_value()?;
            Ok(())
        }
    }

    /// Plays properly, then takes its time to return.
    struct Lingering;

    impl Agent for Lingering {
        fn run(&mut self, link: AgentLink) -> anyhow::Result<()> {
            Bot(AlwaysRock).run(link)?;
            thread::sleep(Duration::from_millis(300));
            Ok(())
        }
    }

    /// Answers the header without reading it, then stops reading its inbox.
    struct Deaf;

    impl Agent for Deaf {
        fn run(&mut self, link: AgentLink) -> anyhow::Result<()> {
            link.send_value(json!({"ready": true}))?;
            thread::sleep(Duration::from_millis(300));
            Ok(())
        }
    }

    /// Panics as soon as the match starts.
    struct Crashing;

    impl Agent for Crashing {
        fn run(&mut self, link: AgentLink) -> anyhow::Result<()> {
            let _header = link.receive_value()?;
            panic!("crashing on purpose");
        }
    }

    /// Claims three rocks whatever the pool.
    struct RockHoarder;

    impl Strategy for RockHoarder {
        fn setup(&mut self, header: &MatchHeader) -> SetupResponse {
            SetupResponse::with_deck(vec![Card::Rock; header.total_rounds])
        }

        fn play(&mut self, _round: &RoundHeader) -> Card {
            Card::Rock
        }
    }

    #[test]
    fn same_cards_is_a_draw() {
        let report = run_match(
            &settings(Generation::Gen0, 5, rock(), rock()),
            &constraints(),
        )
        .unwrap();
        assert_eq!(report.outcome, Outcome::Draw);
        assert_eq!(report.scores, [0, 0]);
        assert_eq!(report.winner(), None);
    }

    #[test]
    fn silent_agent_fouls() {
        let silent = contender("silent", || Box::new(Silent));
        let report = run_match(
            &settings(Generation::Gen0, 5, rock(), silent),
            &ConstraintsBuilder::new()
                .with_message_timeout(Duration::from_millis(20))
                .build()
                .unwrap(),
        )
        .unwrap();
        assert_eq!(report.outcome, Outcome::Foul);
        assert_eq!(report.offender, Some(1));
        assert_eq!(report.scores, [WIN_SCORE, LOSS_SCORE]);
        assert_eq!(report.winner(), Some(0));
    }

    #[test]
    fn malformed_setup_fouls() {
        let garbage = contender("garbage", || Box::new(Garbage));
        let report = run_match(
            &settings(Generation::Gen1, 6, garbage, rock()),
            &constraints(),
        )
        .unwrap();
        assert_eq!(report.outcome, Outcome::Foul);
        assert_eq!(report.offender, Some(0));
        assert_eq!(report.scores, [LOSS_SCORE, WIN_SCORE]);
    }

    #[test]
    fn late_return_fouls() {
        let lingering = contender("lingering", || Box::new(Lingering));
        let report = run_match(
            &settings(Generation::Gen0, 3, rock(), lingering),
            &ConstraintsBuilder::new()
                .with_message_timeout(Duration::from_millis(500))
                .with_shutdown_timeout(Duration::from_millis(20))
                .build()
                .unwrap(),
        )
        .unwrap();
        assert_eq!(report.outcome, Outcome::Foul);
        assert_eq!(report.offender, Some(1));
    }

    #[test]
    fn full_inbox_fouls() {
        let deaf = contender("deaf", || Box::new(Deaf));
        let report = run_match(
            &settings(Generation::Gen0, 3, rock(), deaf),
            &ConstraintsBuilder::new()
                .with_message_timeout(Duration::from_millis(30))
                .build()
                .unwrap(),
        )
        .unwrap();
        assert_eq!(report.outcome, Outcome::Foul);
        assert_eq!(report.offender, Some(1));
        assert_eq!(report.scores, [WIN_SCORE, LOSS_SCORE]);
    }

    #[test]
    fn crashed_agent_fouls() {
        let crashing = contender("crashing", || Box::new(Crashing));
        let report = run_match(
            &settings(Generation::Gen0, 3, rock(), crashing),
            &ConstraintsBuilder::new()
                .with_message_timeout(Duration::from_millis(30))
                .build()
                .unwrap(),
        )
        .unwrap();
        assert_eq!(report.outcome, Outcome::Foul);
        assert_eq!(report.offender, Some(1));
        assert_eq!(report.scores, [WIN_SCORE, LOSS_SCORE]);
    }

    #[test]
    fn deck_exceeding_pool_fouls() {
        let hoarder = contender("hoarder", || Box::new(Bot(RockHoarder)));
        let report = run_match(
            &settings(Generation::Gen2, 3, hoarder, rock()),
            &constraints(),
        )
        .unwrap();
        assert_eq!(report.outcome, Outcome::Foul);
        assert_eq!(report.offender, Some(0));
        assert_eq!(report.scores, [LOSS_SCORE, WIN_SCORE]);
    }

    #[test]
    fn chickens_die_together() {
        let chicken = || contender("chicken", || Box::new(Bot(Chicken)));
        let report = run_match(
            &settings(Generation::Gen3, 13, chicken(), chicken()),
            &constraints(),
        )
        .unwrap();
        assert_eq!(report.outcome, Outcome::MutualLoss);
        assert_eq!(report.scores, [LOSS_SCORE, LOSS_SCORE]);
        assert_eq!(report.offender, None);
    }

    #[test]
    fn invalid_rounds_are_an_error() {
        assert!(run_match(
            &settings(Generation::Gen1, 5, rock(), rock()),
            &constraints()
        )
        .is_err());
    }
}
