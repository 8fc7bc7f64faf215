//! The family of rule sets, one per generation.
//!
//! Each generation is plain data ([`VariantRules`]) read by the single engine in
//! [`crate::game`]. Later generations only add to earlier ones:
//!
//! | gen | alphabet      | deck                                        |
//! |-----|---------------|---------------------------------------------|
//! | 0   | `R P S`       | every basic card once per round             |
//! | 1   | `R P S`       | each basic card `rounds / 3` times          |
//! | 2   | `R P S`       | chosen from a pool                          |
//! | 3   | `R P S C L T` | chosen from a pool, special cards cost more |

use std::fmt::Display;

use anyhow::bail;
use serde::{Deserialize, Serialize};

use crate::card::Card;

/// Payoff of the base cards, `(first player, second player)`. The winner of a round gets one point.
pub const PAYOFF_TABLE: [((Card, Card), [i32; 2]); 9] = [
    ((Card::Rock, Card::Rock), [0, 0]),
    ((Card::Paper, Card::Paper), [0, 0]),
    ((Card::Scissors, Card::Scissors), [0, 0]),
    ((Card::Rock, Card::Paper), [0, 1]),
    ((Card::Rock, Card::Scissors), [1, 0]),
    ((Card::Paper, Card::Rock), [1, 0]),
    ((Card::Paper, Card::Scissors), [0, 1]),
    ((Card::Scissors, Card::Rock), [0, 1]),
    ((Card::Scissors, Card::Paper), [1, 0]),
];

/// Looks up a pair of base cards in [`PAYOFF_TABLE`].
pub fn base_payoff(first: Card, second: Card) -> Option<[i32; 2]> {
    PAYOFF_TABLE
        .iter()
        .find(|(pair, _)| *pair == (first, second))
        .map(|(_, payoff)| *payoff)
}

/// `(generation, rounds)` pairs played by a full run, in order.
pub const DEFAULT_SCHEDULE: [(Generation, usize); 4] = [
    (Generation::Gen0, 5),
    (Generation::Gen1, 6),
    (Generation::Gen2, 13),
    (Generation::Gen3, 13),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeckRule {
    /// Every basic card, once per round.
    Unlimited,
    /// Each basic card `rounds / 3` times.
    Balanced,
    /// Each player picks `rounds` cards from a shared pool.
    Chosen,
}

/// Everything the engine needs to know about a generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VariantRules {
    pub alphabet: &'static [Card],
    pub deck_rule: DeckRule,
    /// Non-basic cards added to the pool, with their count.
    pub special_pool: &'static [(Card, usize)],
    /// Card ending the match when every player plays it. Not limited by the pool.
    pub sacrifice: Option<Card>,
    /// The k-th non-basic card of a chosen deck costs `k * escalating_cost` points.
    pub escalating_cost: i32,
}

/// Maximum number of cards revealed by [`Card::Look`].
pub const LOOK_SIZE: usize = 3;

/// Identifier of a rule set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum Generation {
    Gen0,
    Gen1,
    Gen2,
    Gen3,
}

impl Generation {
    pub const ALL: [Generation; 4] = [
        Generation::Gen0,
        Generation::Gen1,
        Generation::Gen2,
        Generation::Gen3,
    ];

    pub fn id(self) -> u8 {
        match self {
            Generation::Gen0 => 0,
            Generation::Gen1 => 1,
            Generation::Gen2 => 2,
            Generation::Gen3 => 3,
        }
    }

    pub fn rules(self) -> VariantRules {
        const BASIC: &[Card] = &Card::BASIC;
        match self {
            Generation::Gen0 => VariantRules {
                alphabet: BASIC,
                deck_rule: DeckRule::Unlimited,
                special_pool: &[],
                sacrifice: None,
                escalating_cost: 0,
            },
            Generation::Gen1 => VariantRules {
                alphabet: BASIC,
                deck_rule: DeckRule::Balanced,
                special_pool: &[],
                sacrifice: None,
                escalating_cost: 0,
            },
            Generation::Gen2 => VariantRules {
                alphabet: BASIC,
                deck_rule: DeckRule::Chosen,
                special_pool: &[],
                sacrifice: None,
                escalating_cost: 0,
            },
            Generation::Gen3 => VariantRules {
                alphabet: &[
                    Card::Rock,
                    Card::Paper,
                    Card::Scissors,
                    Card::Chicken,
                    Card::Look,
                    Card::Take,
                ],
                deck_rule: DeckRule::Chosen,
                special_pool: &[(Card::Look, 2), (Card::Take, 2), (Card::Chicken, 1)],
                sacrifice: Some(Card::Chicken),
                escalating_cost: 1,
            },
        }
    }

    /// Rejects round counts this generation cannot be played with.
    pub fn validate_rounds(self, rounds: usize) -> anyhow::Result<()> {
        if rounds == 0 {
            bail!("a match needs at least one round");
        }
        if self.rules().deck_rule == DeckRule::Balanced && rounds % Card::BASIC.len() != 0 {
            bail!(
                "generation {self} needs a number of rounds divisible by {}, got {rounds}",
                Card::BASIC.len()
            );
        }
        Ok(())
    }

    /// The deck every player starts with, or `None` when players choose their own.
    pub fn initial_deck(self, rounds: usize) -> Option<Vec<Card>> {
        let copies = match self.rules().deck_rule {
            DeckRule::Unlimited => rounds,
            DeckRule::Balanced => rounds / Card::BASIC.len(),
            DeckRule::Chosen => return None,
        };
        Some(repeat_each(&Card::BASIC, copies))
    }

    /// The pool decks are chosen from, or `None` when decks are fixed.
    pub fn pool(self, rounds: usize) -> Option<Vec<Card>> {
        let rules = self.rules();
        if rules.deck_rule != DeckRule::Chosen {
            return None;
        }
        let mut pool = repeat_each(&Card::BASIC, rounds / Card::BASIC.len() + 1);
        for (card, copies) in rules.special_pool {
            pool.extend(std::iter::repeat(*card).take(*copies));
        }
        Some(pool)
    }

    /// Points paid for a chosen deck: `1 + 2 + ... + k` cost units for `k` non-basic cards.
    ///
    /// Saturates at `i32::MAX`.
    pub fn acquisition_cost(self, deck: &[Card]) -> i32 {
        let k = i64::try_from(deck.iter().filter(|c| !c.is_basic()).count()).unwrap_or(i64::MAX);
        let units = k.saturating_mul(k.saturating_add(1)) / 2;
        let cost = i64::from(self.rules().escalating_cost).saturating_mul(units);
        i32::try_from(cost).unwrap_or(i32::MAX)
    }
}

fn repeat_each(cards: &[Card], copies: usize) -> Vec<Card> {
    cards
        .iter()
        .flat_map(|card| std::iter::repeat(*card).take(copies))
        .collect()
}

impl Display for Generation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.id())
    }
}

impl From<Generation> for u8 {
    fn from(generation: Generation) -> u8 {
        generation.id()
    }
}

impl TryFrom<u8> for Generation {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Generation::ALL
            .into_iter()
            .find(|g| g.id() == value)
            .ok_or_else(|| format!("unknown generation {value}"))
    }
}
