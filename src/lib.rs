//! # Rps Arena
//!
//! A harness evaluating card-playing agents through single-elimination tournaments.
//!
//! The game is a family of rock-paper-scissors variants of increasing complexity
//! ([`Generation`](crate::variant::Generation)): fixed decks first, then balanced decks,
//! decks chosen from a pool, and finally special cards (sacrifice, look, take) paid for with
//! points.
//!
//! It provides:
//! - A pure game engine ([`game`])
//! - A referee giving each agent its own thread and a hard deadline on every message
//! - A seeded single-elimination scheduler, with byes and parallel matches
//! - Result sinks ([`sink`]) keeping results in memory or in a JSON-lines file
//!
//! Any late, missing or malformed message is a foul: the offender loses the match at once.
//!
//! # Documentation Overview
//!
//! - For running tournaments, see the [`server`] module.
//! - For evaluator behaviour and timing limits, see
//!   [`Configuration`](crate::configuration::Configuration) and [`constraints`].
//! - For writing agents, see the [`Agent`](crate::agent::Agent) trait, the
//!   [`Strategy`](crate::agents::Strategy) helper and the messages in [`protocol`].
//!
//! # Usage Example
//!
//! ```no_run
//! use rps_arena::prelude::*;
//!
//! fn main() -> anyhow::Result<()> {
//!     let constraints = ConstraintsBuilder::new()
//!         .with_message_timeout(std::time::Duration::from_millis(100))
//!         .build()?;
//!     let config = Configuration::new().with_seed(42);
//!     let evaluator = Evaluator::new(config, constraints)?;
//!
//!     let roster = builtin_roster()?.with("my_bot", || Box::new(Bot(RandomPlay)))?;
//!     let mut sink = MemorySink::new();
//!     let results = evaluator.run_schedule("demo", &DEFAULT_SCHEDULE, &roster, &mut sink)?;
//!
//!     for result in results {
//!         println!("{}: {:?}", result.tournament_id, result.survivor());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Example Agent
//!
//! Agents built as executables read one JSON message per line on stdin and answer on
//! stdout, see [`ProcessAgent`](crate::process_agent::ProcessAgent). In-process agents
//! usually implement [`Strategy`](crate::agents::Strategy):
//!
//! ```
//! use rps_arena::prelude::*;
//!
//! struct Stubborn;
//!
//! impl Strategy for Stubborn {
//!     fn setup(&mut self, header: &MatchHeader) -> SetupResponse {
//!         match &header.pool {
//!             Some(pool) => SetupResponse::with_deck(pool[..header.total_rounds].to_vec()),
//!             None => SetupResponse::ready(),
//!         }
//!     }
//!
//!     fn play(&mut self, round: &RoundHeader) -> Card {
//!         round.remaining_deck[0]
//!     }
//! }
//!
//! let mut roster = Roster::new();
//! roster.add("stubborn", || Box::new(Bot(Stubborn))).unwrap();
//! ```
//!
//! ## Agent Requirements
//!
//! - Every answer must arrive within the message timeout
//! - The deck sent at setup must be drawn from the pool, one card per round
//! - Every card played must be in the remaining deck
//! - The agent must return shortly after the last round result

pub use anyhow;

pub mod agent;
pub mod agents;
pub mod bracket;
pub mod card;
pub mod configuration;
pub mod confrontation;
pub mod constraints;
pub mod game;
mod logger;
pub mod mailbox;
pub mod match_runner;
pub mod process_agent;
pub mod protocol;
pub mod server;
pub mod sink;
pub mod tournament_scheduler;
pub mod variant;

/// Commonly used types and traits for quick access.
///
/// ```rust
/// use rps_arena::prelude::*;
/// ```
pub mod prelude {
    pub use crate::agent::{Agent, Roster};
    pub use crate::agents::{builtin_roster, Bot, Strategy};
    pub use crate::agents::{AlwaysRock, Chicken, CopyBot, Lightning, RandomPlay};
    pub use crate::card::Card;
    pub use crate::configuration::Configuration;
    pub use crate::constraints::ConstraintsBuilder;
    pub use crate::mailbox::AgentLink;
    pub use crate::process_agent::ProcessAgent;
    pub use crate::protocol::{MatchHeader, Move, RoundHeader, RoundResult, SetupResponse};
    pub use crate::server::Evaluator;
    pub use crate::sink::{JsonLinesSink, MemorySink, Outcome, ResultSink};
    pub use crate::variant::{Generation, DEFAULT_SCHEDULE};
}
