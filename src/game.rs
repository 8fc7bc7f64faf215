//! Round-based card game engine. Pure state machine, no I/O.
//!
//! A [`Game`] goes through `AwaitingSetup -> InRound(1) -> ... -> InRound(total_rounds) -> Terminated`,
//! and can jump to `Terminated` early on a foul or when every player sacrifices.
//!
//! Special cards are resolved with the following precedence (highest first):
//! 1. every player played the sacrifice card: mutual loss
//! 2. one player played the sacrifice card: that player takes the round
//! 3. no base card was played: nothing happens
//! 4. look: the opponent takes the round, the looker sees part of the opponent's deck
//! 5. take: the victim gets its card back, then loses a random card to the thief
//! 6. [`PAYOFF_TABLE`](crate::variant::PAYOFF_TABLE)

use rand::{rngs::StdRng, seq::IndexedRandom, Rng, SeedableRng};
use thiserror::Error;
use tracing::{debug, trace};

use crate::{
    card::{self, Card},
    protocol::{MatchHeader, RoundHeader, RoundResult, SetupResponse},
    variant::{base_payoff, DeckRule, Generation, VariantRules, LOOK_SIZE},
};

/// Score of the winner of a match ended by [`Game::force_terminate`].
pub const WIN_SCORE: i32 = 1;
/// Score of the loser(s) of a match ended by [`Game::force_terminate`].
pub const LOSS_SCORE: i32 = -1;

/// Why the game refused an input.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GameError {
    /// Rule or protocol violation by one player. The game is already terminated in favour of the opponent.
    #[error("player {player} fouled: {reason}")]
    Foul { player: usize, reason: String },
    /// Every player played the sacrifice card. The game is already terminated.
    #[error("every player played the sacrifice card")]
    MutualLoss,
    /// The game is terminated and cannot advance.
    #[error("game is over")]
    GameOver,
    /// Scores were requested before termination.
    #[error("game is not over")]
    NotOver,
    /// A round was requested before every player was set up.
    #[error("players are not set up yet")]
    AwaitingSetup,
}

impl GameError {
    /// Index of the player responsible, if any.
    pub fn offender(&self) -> Option<usize> {
        match self {
            GameError::Foul { player, .. } => Some(*player),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    AwaitingSetup,
    InRound(usize),
    Terminated,
}

/// One match between two players.
#[derive(Debug)]
pub struct Game {
    generation: Generation,
    rules: VariantRules,
    players: Vec<String>,
    total_rounds: usize,
    pool: Option<Vec<Card>>,
    decks: Vec<Vec<Card>>,
    configured: Vec<bool>,
    scores: Vec<i32>,
    current_round: usize,
    terminated: bool,
    rng: StdRng,
}

impl Game {
    /// Creates a match. Fixed decks are dealt now, chosen decks wait for [`Game::configure`].
    ///
    /// # Errors
    /// When there are not exactly two players, or `total_rounds` is not playable with `generation`.
    pub fn new(
        generation: Generation,
        players: Vec<String>,
        total_rounds: usize,
        seed: u64,
    ) -> anyhow::Result<Game> {
        anyhow::ensure!(
            players.len() == 2,
            "a match needs exactly two players, got {}",
            players.len()
        );
        generation.validate_rounds(total_rounds)?;
        let deck = generation.initial_deck(total_rounds).unwrap_or_default();
        let num_players = players.len();
        Ok(Game {
            generation,
            rules: generation.rules(),
            pool: generation.pool(total_rounds),
            decks: vec![deck; num_players],
            configured: vec![false; num_players],
            scores: vec![0; num_players],
            players,
            total_rounds,
            current_round: 1,
            terminated: false,
            rng: StdRng::seed_from_u64(seed),
        })
    }

    /// Creates a match where every player is already set up with the given decks.
    pub fn with_decks(
        generation: Generation,
        players: Vec<String>,
        total_rounds: usize,
        decks: Vec<Vec<Card>>,
        seed: u64,
    ) -> anyhow::Result<Game> {
        anyhow::ensure!(decks.len() == players.len(), "one deck per player");
        let mut game = Game::new(generation, players, total_rounds, seed)?;
        game.configured = vec![true; decks.len()];
        game.decks = decks;
        Ok(game)
    }

    /// Parameters sent to every agent before setup.
    pub fn describe(&self) -> MatchHeader {
        MatchHeader {
            generation: self.generation,
            total_rounds: self.total_rounds,
            players: self.players.clone(),
            pool: self.pool.clone(),
        }
    }

    pub fn phase(&self) -> Phase {
        if self.terminated {
            Phase::Terminated
        } else if self.configured.iter().any(|c| !c) {
            Phase::AwaitingSetup
        } else {
            Phase::InRound(self.current_round)
        }
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn total_rounds(&self) -> usize {
        self.total_rounds
    }

    pub fn current_round(&self) -> usize {
        self.current_round
    }

    pub fn is_finished(&self) -> bool {
        self.terminated
    }

    pub fn deck(&self, player: usize) -> &[Card] {
        &self.decks[player]
    }

    /// Applies a player's answer to the match header.
    ///
    /// For chosen-deck generations the deck must have exactly `total_rounds` cards of the
    /// alphabet, and no more copies of a card than the pool (the sacrifice card excepted).
    /// Non-basic cards are paid for with points.
    pub fn configure(&mut self, player: usize, setup: &SetupResponse) -> Result<(), GameError> {
        if self.terminated {
            return Err(GameError::GameOver);
        }
        assert!(player < self.players.len(), "no player {player}");

        if !setup.ready {
            return Err(self.foul(player, "not ready".to_owned()));
        }

        if self.rules.deck_rule == DeckRule::Chosen {
            let Some(deck) = &setup.deck else {
                return Err(self.foul(player, "no deck".to_owned()));
            };
            if let Err(reason) = self.check_deck(deck) {
                return Err(self.foul(player, reason));
            }
            let cost = self.generation.acquisition_cost(deck);
            debug!(player, deck = %card::to_symbols(deck), cost, "deck accepted");
            self.scores[player] = self.scores[player].saturating_sub(cost);
            self.decks[player] = deck.clone();
        } else if setup.deck.is_some() {
            trace!(player, "ignoring deck of a fixed-deck generation");
        }

        self.configured[player] = true;
        Ok(())
    }

    fn check_deck(&self, deck: &[Card]) -> Result<(), String> {
        if deck.len() != self.total_rounds {
            return Err(format!(
                "deck has {} cards instead of {}",
                deck.len(),
                self.total_rounds
            ));
        }
        let pool = self.pool.as_deref().unwrap_or_default();
        for &claimed_card in deck {
            if !self.rules.alphabet.contains(&claimed_card) {
                return Err(format!(
                    "{claimed_card} is not allowed in generation {}",
                    self.generation
                ));
            }
            if Some(claimed_card) == self.rules.sacrifice {
                continue;
            }
            let claimed = card::count(deck, claimed_card);
            let available = card::count(pool, claimed_card);
            if claimed > available {
                return Err(format!(
                    "{claimed} x {claimed_card} but the pool only has {available}"
                ));
            }
        }
        Ok(())
    }

    /// What `player` gets before choosing a card.
    pub fn round_state(&self, player: usize) -> Result<RoundHeader, GameError> {
        match self.phase() {
            Phase::Terminated => Err(GameError::GameOver),
            Phase::AwaitingSetup => Err(GameError::AwaitingSetup),
            Phase::InRound(round_number) => Ok(RoundHeader {
                player_index: player,
                round_number,
                remaining_deck: self.decks[player].clone(),
            }),
        }
    }

    pub fn round_states(&self) -> Result<Vec<RoundHeader>, GameError> {
        (0..self.players.len())
            .map(|player| self.round_state(player))
            .collect()
    }

    /// Plays one round. `None` stands for a missing or malformed move.
    ///
    /// Returns one [`RoundResult`] per player, in player order.
    pub fn resolve(&mut self, hands: &[Option<Card>; 2]) -> Result<Vec<RoundResult>, GameError> {
        match self.phase() {
            Phase::Terminated => return Err(GameError::GameOver),
            Phase::AwaitingSetup => return Err(GameError::AwaitingSetup),
            Phase::InRound(_) => {}
        }

        let played = [self.check_hand(0, hands[0])?, self.check_hand(1, hands[1])?];

        if let Some(sacrifice) = self.rules.sacrifice {
            if played.iter().all(|card| *card == sacrifice) {
                debug!(round = self.current_round, "everybody dies");
                self.force_terminate(None);
                return Err(GameError::MutualLoss);
            }
        }

        for (deck, card) in self.decks.iter_mut().zip(played) {
            card::remove_one(deck, card);
        }

        let mut payoff = [0, 0];
        let mut looks: [Option<Vec<Card>>; 2] = [None, None];
        let mut stolen_card = None;

        let played_by = |card: Card| played.iter().position(|c| *c == card);
        let sacrificer = self.rules.sacrifice.and_then(played_by);

        if let Some(player) = sacrificer {
            payoff[player] = 1;
        } else if played.iter().all(|card| !card.is_basic()) {
            trace!("no base card played");
        } else if let Some(looker) = played_by(Card::Look) {
            let opponent = 1 - looker;
            payoff[opponent] = 1;
            looks[looker] = Some(
                self.decks[opponent]
                    .choose_multiple(&mut self.rng, LOOK_SIZE)
                    .copied()
                    .collect(),
            );
        } else if let Some(thief) = played_by(Card::Take) {
            let victim = 1 - thief;
            self.decks[victim].push(played[victim]);
            let index = self.rng.random_range(0..self.decks[victim].len());
            let card = self.decks[victim].remove(index);
            self.decks[thief].push(card);
            stolen_card = Some(card);
        } else {
            payoff = base_payoff(played[0], played[1]).unwrap_or_default();
        }

        for (score, delta) in self.scores.iter_mut().zip(payoff) {
            *score += delta;
        }
        debug!(
            round = self.current_round,
            hands = %card::to_symbols(&played),
            ?payoff,
            scores = ?self.scores,
            "round resolved"
        );

        self.current_round += 1;
        if self.current_round > self.total_rounds {
            self.terminated = true;
        }

        Ok(looks
            .into_iter()
            .enumerate()
            .map(|(player_index, look)| RoundResult {
                player_index,
                both_hands: played.to_vec(),
                cumulative_scores: self.scores.clone(),
                look,
                stolen_card,
            })
            .collect())
    }

    fn check_hand(&mut self, player: usize, hand: Option<Card>) -> Result<Card, GameError> {
        let Some(card) = hand else {
            return Err(self.foul(player, "malformed move".to_owned()));
        };
        if !self.decks[player].contains(&card) {
            return Err(self.foul(player, format!("{card} is not in deck")));
        }
        Ok(card)
    }

    /// Final scores, one per player.
    pub fn scores(&self) -> Result<Vec<i32>, GameError> {
        if !self.terminated {
            return Err(GameError::NotOver);
        }
        Ok(self.scores.clone())
    }

    /// Ends the game with constant scores: [`WIN_SCORE`] for `favoured`, [`LOSS_SCORE`] for everybody else.
    pub fn force_terminate(&mut self, favoured: Option<usize>) {
        self.scores = vec![LOSS_SCORE; self.players.len()];
        if let Some(player) = favoured {
            self.scores[player] = WIN_SCORE;
        }
        self.terminated = true;
    }

    fn foul(&mut self, player: usize, reason: String) -> GameError {
        let opponent = (player + 1) % self.players.len();
        self.force_terminate(Some(opponent));
        GameError::Foul { player, reason }
    }
}
