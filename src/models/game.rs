//! Game model: one table of one round.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use super::{GameResult, PlayerNumber, Side, BYE_NUMBER};

/// Result flag of a game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Unresolved,
    RedWins,
    BlackWins,
    Draw,
}

impl Outcome {
    pub fn is_resolved(self) -> bool {
        self != Outcome::Unresolved
    }

    /// The result seen from `side`, or None while unresolved.
    pub fn result_for(self, side: Side) -> Option<GameResult> {
        match (self, side) {
            (Outcome::Unresolved, _) => None,
            (Outcome::Draw, _) => Some(GameResult::Draw),
            (Outcome::RedWins, Side::Red) | (Outcome::BlackWins, Side::Black) => {
                Some(GameResult::Win)
            }
            (Outcome::RedWins, Side::Black) | (Outcome::BlackWins, Side::Red) => {
                Some(GameResult::Loss)
            }
        }
    }

    /// Score-sheet symbol: `+` red wins, `-` black wins, `=` draw, `?` unresolved.
    pub fn symbol(self) -> char {
        match self {
            Outcome::Unresolved => '?',
            Outcome::RedWins => '+',
            Outcome::BlackWins => '-',
            Outcome::Draw => '=',
        }
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

impl FromStr for Outcome {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "+" | "red" | "red_wins" => Ok(Outcome::RedWins),
            "-" | "black" | "black_wins" => Ok(Outcome::BlackWins),
            "=" | "draw" => Ok(Outcome::Draw),
            "?" | "unresolved" => Ok(Outcome::Unresolved),
            other => Err(format!("unknown outcome: {}", other)),
        }
    }
}

/// A single game at a numbered table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Game {
    /// Table number (1-based)
    pub table: u32,

    /// First mover
    pub red: PlayerNumber,

    /// Second mover
    pub black: PlayerNumber,

    /// Current result flag
    pub outcome: Outcome,
}

impl Game {
    /// Create a game. A bye always takes black and the real contestant is
    /// credited with the win straight away.
    pub fn new(table: u32, red: PlayerNumber, black: PlayerNumber) -> Self {
        let (red, black) = if red == BYE_NUMBER { (black, red) } else { (red, black) };
        let outcome = if black == BYE_NUMBER {
            Outcome::RedWins
        } else {
            Outcome::Unresolved
        };

        Self {
            table,
            red,
            black,
            outcome,
        }
    }

    /// Builder method to set the outcome.
    pub fn with_outcome(mut self, outcome: Outcome) -> Self {
        self.outcome = outcome;
        self
    }

    /// Builder method to move the game to another table.
    pub fn at_table(mut self, table: u32) -> Self {
        self.table = table;
        self
    }

    pub fn has_bye(&self) -> bool {
        self.black == BYE_NUMBER || self.red == BYE_NUMBER
    }

    pub fn involves(&self, number: PlayerNumber) -> bool {
        self.red == number || self.black == number
    }

    pub fn side_of(&self, number: PlayerNumber) -> Option<Side> {
        if self.red == number {
            Some(Side::Red)
        } else if self.black == number {
            Some(Side::Black)
        } else {
            None
        }
    }

    pub fn opponent_of(&self, number: PlayerNumber) -> Option<PlayerNumber> {
        match self.side_of(number)? {
            Side::Red => Some(self.black),
            Side::Black => Some(self.red),
        }
    }
}
