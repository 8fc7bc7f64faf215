//! Card alphabet shared by every generation of the game.

use std::{fmt::Display, str::FromStr};

use anyhow::bail;
use serde::{Deserialize, Serialize};

/// A single card. On the wire a card is its one-letter symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Card {
    /// Beats scissors.
    #[serde(rename = "R")]
    Rock,
    /// Beats rock.
    #[serde(rename = "P")]
    Paper,
    /// Beats paper.
    #[serde(rename = "S")]
    Scissors,
    /// The sacrifice card. Played alone it takes the round, played by everyone it ends the match.
    #[serde(rename = "C")]
    Chicken,
    /// Reveals part of the opponent's remaining deck, conceding the round.
    #[serde(rename = "L")]
    Look,
    /// Steals a random card from the opponent's deck.
    #[serde(rename = "T")]
    Take,
}

impl Card {
    /// Rock, paper and scissors.
    pub const BASIC: [Card; 3] = [Card::Rock, Card::Paper, Card::Scissors];

    /// True for rock, paper and scissors.
    pub fn is_basic(self) -> bool {
        matches!(self, Card::Rock | Card::Paper | Card::Scissors)
    }

    pub fn symbol(self) -> char {
        match self {
            Card::Rock => 'R',
            Card::Paper => 'P',
            Card::Scissors => 'S',
            Card::Chicken => 'C',
            Card::Look => 'L',
            Card::Take => 'T',
        }
    }
}

impl Display for Card {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

impl FromStr for Card {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "R" => Card::Rock,
            "P" => Card::Paper,
            "S" => Card::Scissors,
            "C" => Card::Chicken,
            "L" => Card::Look,
            "T" => Card::Take,
            _ => bail!("'{s}' is not a card"),
        })
    }
}

/// Number of copies of `card` in `cards`.
pub fn count(cards: &[Card], card: Card) -> usize {
    cards.iter().filter(|c| **c == card).count()
}

/// Removes one copy of `card`. Returns false if there was none.
pub fn remove_one(cards: &mut Vec<Card>, card: Card) -> bool {
    match cards.iter().position(|c| *c == card) {
        Some(pos) => {
            cards.remove(pos);
            true
        }
        None => false,
    }
}

/// Compact representation used in logs, e.g. `RRPS`.
pub fn to_symbols(cards: &[Card]) -> String {
    cards.iter().map(|c| c.symbol()).collect()
}
