//! Round model: the games of one round, keyed by table.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use super::{Game, Outcome, PlayerNumber};

/// How the games of a round were produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PairingQuality {
    /// Every constraint (no rematch, no third same side) was honoured
    #[default]
    Standard,
    /// Retry budget ran out; the tail of the round was paired sequentially
    Fallback,
}

/// All games of one round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Round {
    /// Round number (1-based)
    pub number: u32,

    /// Games ordered by table number
    games: Vec<Game>,

    /// Whether the automatic pairing had to fall back
    pub quality: PairingQuality,

    /// Whether the games were rearranged by hand after pairing
    pub manually_adjusted: bool,
}

impl Round {
    /// Create a round from games. Tables are renumbered 1..N in the given order.
    pub fn new(number: u32, games: Vec<Game>, quality: PairingQuality) -> Self {
        let games = games
            .into_iter()
            .enumerate()
            .map(|(i, game)| game.at_table(i as u32 + 1))
            .collect();

        Self {
            number,
            games,
            quality,
            manually_adjusted: false,
        }
    }

    pub fn games(&self) -> &[Game] {
        &self.games
    }

    pub fn len(&self) -> usize {
        self.games.len()
    }

    pub fn is_empty(&self) -> bool {
        self.games.is_empty()
    }

    pub fn game(&self, table: u32) -> Option<&Game> {
        self.games.iter().find(|g| g.table == table)
    }

    /// The game a contestant sits at, if any.
    pub fn game_of(&self, number: PlayerNumber) -> Option<&Game> {
        self.games.iter().find(|g| g.involves(number))
    }

    pub fn contains(&self, number: PlayerNumber) -> bool {
        self.game_of(number).is_some()
    }

    /// Replace the game at the given table. Returns None if no such table exists.
    pub fn with_game(&self, game: Game) -> Option<Self> {
        let index = self.games.iter().position(|g| g.table == game.table)?;
        let mut round = self.clone();
        round.games[index] = game;
        Some(round)
    }

    /// Replace the outcome at the given table. Returns None if no such table exists.
    pub fn with_outcome(&self, table: u32, outcome: Outcome) -> Option<Self> {
        let game = self.game(table)?.with_outcome(outcome);
        self.with_game(game)
    }

    /// The same round with contestant `from` recorded as `to`.
    pub fn with_renumbered(&self, from: PlayerNumber, to: PlayerNumber) -> Self {
        let renumber = |n: PlayerNumber| if n == from { to } else { n };
        let games = self
            .games
            .iter()
            .map(|g| Game {
                red: renumber(g.red),
                black: renumber(g.black),
                ..*g
            })
            .collect();
        Self {
            games,
            ..self.clone()
        }
    }

    /// Builder method to flag manual edits.
    pub fn adjusted(mut self) -> Self {
        self.manually_adjusted = true;
        self
    }

    pub fn unresolved_count(&self) -> usize {
        self.games
            .iter()
            .filter(|g| !g.outcome.is_resolved())
            .count()
    }

    /// A round can close once every game has a result.
    pub fn can_end(&self) -> bool {
        self.unresolved_count() == 0
    }

    /// Tables are 1..N without gaps and nobody sits at two tables.
    pub fn is_well_formed(&self) -> bool {
        let mut seen = HashSet::new();
        for (i, game) in self.games.iter().enumerate() {
            if game.table != i as u32 + 1 || game.red == game.black {
                return false;
            }
            if !seen.insert(game.red) || !seen.insert(game.black) {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BYE_NUMBER;

    fn sample_round() -> Round {
        Round::new(
            2,
            vec![Game::new(9, 1, 4), Game::new(9, 2, 5), Game::new(9, 3, BYE_NUMBER)],
            PairingQuality::Standard,
        )
    }

    #[test]
    fn test_tables_are_renumbered() {
        let round = sample_round();
        let tables: Vec<u32> = round.games().iter().map(|g| g.table).collect();
        assert_eq!(tables, vec![1, 2, 3]);
        assert!(round.is_well_formed());
    }

    #[test]
    fn test_can_end_requires_all_results() {
        let round = sample_round();
        // The bye table resolves itself
        assert_eq!(round.unresolved_count(), 2);
        assert!(!round.can_end());

        let round = round
            .with_outcome(1, Outcome::RedWins)
            .unwrap()
            .with_outcome(2, Outcome::Draw)
            .unwrap();
        assert!(round.can_end());
    }

    #[test]
    fn test_with_outcome_unknown_table() {
        assert!(sample_round().with_outcome(4, Outcome::Draw).is_none());
    }

    #[test]
    fn test_game_of_player() {
        let round = sample_round();
        assert_eq!(round.game_of(5).map(|g| g.table), Some(2));
        assert!(!round.contains(6));
    }

    #[test]
    fn test_renumbered_keeps_tables_and_outcomes() {
        let round = sample_round().with_outcome(2, Outcome::Draw).unwrap();
        let renumbered = round.with_renumbered(5, 50);

        let game = renumbered.game(2).unwrap();
        assert_eq!((game.red, game.black), (2, 50));
        assert_eq!(game.outcome, Outcome::Draw);
        assert!(!renumbered.contains(5));
        assert_eq!(renumbered.game(1), round.game(1));
    }

    #[test]
    fn test_duplicate_player_is_not_well_formed() {
        let round = Round::new(
            1,
            vec![Game::new(1, 1, 2), Game::new(2, 2, 3)],
            PairingQuality::Standard,
        );
        assert!(!round.is_well_formed());
    }
}
