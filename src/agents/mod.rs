//! Built-in agents, handy as sparring partners and in tests.
//!
//! Most agents only need to decide on a deck and a card per round: implement [`Strategy`]
//! and wrap it in a [`Bot`], which takes care of the message exchange.

use rand::seq::IndexedRandom;

use crate::{
    agent::{Agent, Roster},
    card::{self, Card},
    mailbox::AgentLink,
    protocol::{MatchHeader, Move, RoundHeader, RoundResult, SetupResponse},
};

mod reactive;
mod simple;

pub use reactive::{CopyBot, Lightning};
pub use simple::{AlwaysRock, Chicken, RandomPlay};

/// Decisions of an agent that follows the protocol to the letter.
pub trait Strategy: Send {
    fn setup(&mut self, header: &MatchHeader) -> SetupResponse;

    /// Picks a card. Anything outside `round.remaining_deck` is a foul.
    fn play(&mut self, round: &RoundHeader) -> Card;

    fn observe(&mut self, _result: &RoundResult) {}
}

/// Runs a [`Strategy`] as an [`Agent`].
#[derive(Debug, Default)]
pub struct Bot<S>(pub S);

impl<S: Strategy> Agent for Bot<S> {
    fn run(&mut self, link: AgentLink) -> anyhow::Result<()> {
        let header: MatchHeader = link.receive()?;
        link.send(&self.0.setup(&header))?;

        for _ in 0..header.total_rounds {
            let round: RoundHeader = link.receive()?;
            let hand = self.0.play(&round);
            link.send(&Move { hand })?;
            let result: RoundResult = link.receive()?;
            self.0.observe(&result);
        }
        Ok(())
    }
}

/// One of each built-in agent.
pub fn builtin_roster() -> anyhow::Result<Roster> {
    Roster::new()
        .with("always_rock", || Box::new(Bot(AlwaysRock)))
        .and_then(|r| r.with("random_play", || Box::new(Bot(RandomPlay))))
        .and_then(|r| r.with("chickenbot", || Box::new(Bot(Chicken))))
        .and_then(|r| r.with("lightningbot", || Box::new(Bot(Lightning::default()))))
        .and_then(|r| r.with("copybot", || Box::new(Bot(CopyBot::default()))))
}

/// `rounds` cards drawn at random from `pool`.
pub(crate) fn random_deck(pool: &[Card], rounds: usize) -> Vec<Card> {
    pool.choose_multiple(&mut rand::rng(), rounds)
        .copied()
        .collect()
}

/// `rounds` cards from `pool`, as many copies of `preferred` as possible, then basic cards.
pub(crate) fn deck_preferring(pool: &[Card], rounds: usize, preferred: Card) -> Vec<Card> {
    let mut remaining = pool.to_vec();
    let mut deck = Vec::with_capacity(rounds);
    for wanted in std::iter::once(preferred).chain(Card::BASIC) {
        while deck.len() < rounds && card::remove_one(&mut remaining, wanted) {
            deck.push(wanted);
        }
    }
    deck
}

/// Any card of the deck.
pub(crate) fn random_card(deck: &[Card]) -> Card {
    deck.choose(&mut rand::rng())
        .copied()
        .unwrap_or(Card::Rock)
}
