//! Contestant model: identity plus accumulated per-round history.

use serde::{Deserialize, Serialize};

/// Identifier of a contestant within one match.
pub type PlayerNumber = u32;

/// Reserved number of the synthetic bye contestant.
pub const BYE_NUMBER: PlayerNumber = 0;

/// Display name of the synthetic bye contestant.
pub const BYE_NAME: &str = "BYE";

/// Which role a contestant takes in a game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    /// First mover
    Red,
    /// Second mover
    Black,
}

impl Side {
    /// The other side of the board.
    pub fn opposite(self) -> Side {
        match self {
            Side::Red => Side::Black,
            Side::Black => Side::Red,
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Red => write!(f, "red"),
            Side::Black => write!(f, "black"),
        }
    }
}

/// A contestant's outcome in a single game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameResult {
    Win,
    Loss,
    Draw,
}

impl GameResult {
    /// Single-letter form used on score sheets.
    pub fn letter(self) -> char {
        match self {
            GameResult::Win => '+',
            GameResult::Loss => '-',
            GameResult::Draw => '=',
        }
    }
}

impl std::fmt::Display for GameResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.letter())
    }
}

/// A contestant taking part in a match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    /// Unique positive number (0 is reserved for the bye)
    pub number: PlayerNumber,

    /// Display name
    pub name: String,

    /// Club, team or other affiliation
    pub organization: String,

    /// Free-text note
    pub note: String,

    /// Accumulated match points
    pub score: u32,

    /// Sum of the current scores of every opponent faced (tie-break)
    pub opponent_score: u32,

    /// Opponent numbers, one per completed round
    pub played_opponents: Vec<PlayerNumber>,

    /// Sides played, one per completed round
    pub played_sides: Vec<Side>,

    /// Outcomes, one per completed round
    pub played_results: Vec<GameResult>,
}

impl Player {
    /// Create a contestant with no history.
    pub fn new(number: PlayerNumber, name: impl Into<String>) -> Self {
        Self {
            number,
            name: name.into(),
            organization: String::new(),
            note: String::new(),
            score: 0,
            opponent_score: 0,
            played_opponents: Vec::new(),
            played_sides: Vec::new(),
            played_results: Vec::new(),
        }
    }

    /// The placeholder used to even out an odd roster.
    pub fn bye() -> Self {
        Self::new(BYE_NUMBER, BYE_NAME)
    }

    pub fn is_bye(&self) -> bool {
        self.number == BYE_NUMBER
    }

    /// Builder method to set organization.
    pub fn with_organization(mut self, organization: impl Into<String>) -> Self {
        self.organization = organization.into();
        self
    }

    /// Builder method to set note.
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = note.into();
        self
    }

    /// Builder method to set the tie-break score.
    pub fn with_opponent_score(mut self, opponent_score: u32) -> Self {
        self.opponent_score = opponent_score;
        self
    }

    /// Append one completed game to the history and add its points.
    pub fn record_game(
        mut self,
        opponent: PlayerNumber,
        side: Side,
        result: GameResult,
        points: u32,
    ) -> Self {
        self.score += points;
        self.played_opponents.push(opponent);
        self.played_sides.push(side);
        self.played_results.push(result);
        self
    }

    /// Replace every reference to `old` in the opponent history.
    pub fn with_renamed_opponent(mut self, old: PlayerNumber, new: PlayerNumber) -> Self {
        for opponent in self.played_opponents.iter_mut() {
            if *opponent == old {
                *opponent = new;
            }
        }
        self
    }

    /// Whether this contestant already faced `opponent`. A previous bye counts.
    pub fn has_played(&self, opponent: PlayerNumber) -> bool {
        self.played_opponents.contains(&opponent)
    }

    pub fn rounds_played(&self) -> usize {
        self.played_sides.len()
    }

    /// Number of games played on `side`, byes included.
    pub fn side_count(&self, side: Side) -> usize {
        self.played_sides.iter().filter(|s| **s == side).count()
    }

    pub fn bye_count(&self) -> usize {
        self.played_opponents
            .iter()
            .filter(|n| **n == BYE_NUMBER)
            .count()
    }

    /// Long-run side imbalance: red games minus byes minus black games.
    ///
    /// Byes are recorded as red, so they are discounted here. A positive value
    /// means the contestant is owed a black game.
    pub fn side_imbalance(&self) -> i64 {
        self.side_count(Side::Red) as i64
            - self.bye_count() as i64
            - self.side_count(Side::Black) as i64
    }

    /// The two most recent sides, oldest first, if at least two rounds were played.
    pub fn last_two_sides(&self) -> Option<(Side, Side)> {
        match self.played_sides.as_slice() {
            [.., older, newer] => Some((*older, *newer)),
            _ => None,
        }
    }

    pub fn last_side(&self) -> Option<Side> {
        self.played_sides.last().copied()
    }
}
