//! Messages exchanged between the referee and an agent.
//!
//! Every message is a JSON object. The referee sends [`MatchHeader`] once, then a
//! [`RoundHeader`] and a [`RoundResult`] per round. The agent answers the match header
//! with a [`SetupResponse`] and every round header with a [`Move`].

use serde::{Deserialize, Serialize};

use crate::{card::Card, variant::Generation};

/// Referee -> agent, once per match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchHeader {
    pub generation: Generation,
    pub total_rounds: usize,
    pub players: Vec<String>,
    /// Only sent when players choose their own deck.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pool: Option<Vec<Card>>,
}

/// Agent -> referee, answer to [`MatchHeader`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetupResponse {
    pub ready: bool,
    /// Required iff the header carried a pool.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deck: Option<Vec<Card>>,
}

impl SetupResponse {
    pub fn ready() -> Self {
        Self {
            ready: true,
            deck: None,
        }
    }

    pub fn with_deck(deck: Vec<Card>) -> Self {
        Self {
            ready: true,
            deck: Some(deck),
        }
    }
}

/// Referee -> agent, once per round before the move.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundHeader {
    pub player_index: usize,
    pub round_number: usize,
    pub remaining_deck: Vec<Card>,
}

/// Agent -> referee, answer to [`RoundHeader`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Move {
    pub hand: Card,
}

/// Referee -> agent, once per round after resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundResult {
    pub player_index: usize,
    pub both_hands: Vec<Card>,
    pub cumulative_scores: Vec<i32>,
    /// Cards of the opponent's deck revealed by [`Card::Look`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub look: Option<Vec<Card>>,
    /// Card moved by [`Card::Take`], told to both the thief and the victim.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stolen_card: Option<Card>,
}

impl RoundResult {
    /// The hand played by the other player of a two-player match.
    pub fn opponent_hand(&self) -> Option<Card> {
        self.both_hands.get(1 - self.player_index.min(1)).copied()
    }
}

/// Parses the hand of a move. Anything but `{"hand": "<card>"}` is `None`.
pub fn parse_hand(reply: &serde_json::Value) -> Option<Card> {
    serde_json::from_value::<Move>(reply.clone())
        .ok()
        .map(|m| m.hand)
}
