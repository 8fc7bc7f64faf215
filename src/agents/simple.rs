use crate::{
    card::Card,
    protocol::{MatchHeader, RoundHeader, SetupResponse},
};

use super::{deck_preferring, random_card, random_deck, Strategy};

/// Rock whenever it can.
#[derive(Debug, Default, Clone, Copy)]
pub struct AlwaysRock;

impl Strategy for AlwaysRock {
    fn setup(&mut self, header: &MatchHeader) -> SetupResponse {
        match &header.pool {
            Some(pool) => {
                SetupResponse::with_deck(deck_preferring(pool, header.total_rounds, Card::Rock))
            }
            None => SetupResponse::ready(),
        }
    }

    fn play(&mut self, round: &RoundHeader) -> Card {
        if round.remaining_deck.contains(&Card::Rock) {
            Card::Rock
        } else {
            random_card(&round.remaining_deck)
        }
    }
}

/// Uniformly random deck and cards.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomPlay;

impl Strategy for RandomPlay {
    fn setup(&mut self, header: &MatchHeader) -> SetupResponse {
        match &header.pool {
            Some(pool) => SetupResponse::with_deck(random_deck(pool, header.total_rounds)),
            None => SetupResponse::ready(),
        }
    }

    fn play(&mut self, round: &RoundHeader) -> Card {
        random_card(&round.remaining_deck)
    }
}

/// Fills its deck with the sacrifice card and always plays its smallest card.
///
/// Fouls at setup in generations without the sacrifice card.
#[derive(Debug, Default, Clone, Copy)]
pub struct Chicken;

impl Strategy for Chicken {
    fn setup(&mut self, header: &MatchHeader) -> SetupResponse {
        match header.pool {
            Some(_) => SetupResponse::with_deck(vec![Card::Chicken; header.total_rounds]),
            None => SetupResponse::ready(),
        }
    }

    fn play(&mut self, round: &RoundHeader) -> Card {
        round
            .remaining_deck
            .iter()
            .copied()
            .min_by_key(|c| c.symbol())
            .unwrap_or(Card::Chicken)
    }
}
