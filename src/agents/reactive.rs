use crate::{
    card::Card,
    protocol::{MatchHeader, RoundHeader, RoundResult, SetupResponse},
};

use super::{random_card, random_deck, Strategy};

/// Lightning never strikes twice: assumes the opponent will not repeat its last card.
#[derive(Debug, Default, Clone, Copy)]
pub struct Lightning {
    last: Option<Card>,
}

impl Lightning {
    /// Draws against a repeat, wins against one of the two other cards.
    fn answer(last: Card) -> Option<Card> {
        match last {
            Card::Rock => Some(Card::Scissors),
            Card::Paper => Some(Card::Rock),
            Card::Scissors => Some(Card::Paper),
            _ => None,
        }
    }
}

impl Strategy for Lightning {
    fn setup(&mut self, header: &MatchHeader) -> SetupResponse {
        self.last = None;
        match &header.pool {
            Some(pool) => SetupResponse::with_deck(random_deck(pool, header.total_rounds)),
            None => SetupResponse::ready(),
        }
    }

    fn play(&mut self, round: &RoundHeader) -> Card {
        match self.last.and_then(Self::answer) {
            Some(card) if round.remaining_deck.contains(&card) => card,
            _ => random_card(&round.remaining_deck),
        }
    }

    fn observe(&mut self, result: &RoundResult) {
        self.last = result.opponent_hand();
    }
}

/// Plays whatever the opponent played last.
#[derive(Debug, Default, Clone, Copy)]
pub struct CopyBot {
    last: Option<Card>,
}

impl Strategy for CopyBot {
    fn setup(&mut self, header: &MatchHeader) -> SetupResponse {
        self.last = None;
        match &header.pool {
            Some(pool) => SetupResponse::with_deck(random_deck(pool, header.total_rounds)),
            None => SetupResponse::ready(),
        }
    }

    fn play(&mut self, round: &RoundHeader) -> Card {
        match self.last {
            Some(card) if round.remaining_deck.contains(&card) => card,
            _ => random_card(&round.remaining_deck),
        }
    }

    fn observe(&mut self, result: &RoundResult) {
        self.last = result.opponent_hand();
    }
}
