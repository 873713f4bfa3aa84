//! Match state machine.
//!
//! A [`Match`] is an immutable value. Every operation borrows the current
//! value and returns a new one; the old value stays valid, which lets callers
//! keep snapshots and retry freely. Closed rounds are shared between
//! snapshots.
//!
//! ```text
//! NotStarted -> Pairing(1) -> Fighting(1) -> Pairing(2) -> ... -> Finished
//! ```

mod results;
mod roster;

pub use roster::{NewPlayer, PlayerUpdate};

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::models::{Game, GameResult, Outcome, Player, PlayerNumber, Round};
use crate::pairing;
use crate::ranking::{self, Standing};

/// Upper bound on the number of rounds of a match.
pub const MAXIMUM_TOTAL_ROUNDS: u32 = 20;

/// Errors raised by match operations. A failed operation never changes state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MatchError {
    #[error("cannot {operation} while the match is {status}")]
    InvalidTransition {
        operation: &'static str,
        status: Status,
    },

    #[error("not found: {0}")]
    NotFound(String),

    #[error("duplicate: {0}")]
    Duplicate(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

/// Points awarded per game result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoringRules {
    pub win: u32,
    pub draw: u32,
    pub loss: u32,
}

impl ScoringRules {
    pub fn points(&self, result: GameResult) -> u32 {
        match result {
            GameResult::Win => self.win,
            GameResult::Draw => self.draw,
            GameResult::Loss => self.loss,
        }
    }
}

impl Default for ScoringRules {
    fn default() -> Self {
        Self {
            win: 2,
            draw: 1,
            loss: 0,
        }
    }
}

/// Status of the match as a whole, or of a single round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    NotStarted,
    OnGoingPairing,
    OnGoingFighting,
    Finished,
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Status::NotStarted => write!(f, "not started"),
            Status::OnGoingPairing => write!(f, "pairing"),
            Status::OnGoingFighting => write!(f, "fighting"),
            Status::Finished => write!(f, "finished"),
        }
    }
}

/// Progress of the match. The live round only exists while it is being
/// paired or fought.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "phase", content = "round", rename_all = "snake_case")]
pub enum Phase {
    NotStarted,
    Pairing(Round),
    Fighting(Round),
    Finished,
}

impl Phase {
    pub fn status(&self) -> Status {
        match self {
            Phase::NotStarted => Status::NotStarted,
            Phase::Pairing(_) => Status::OnGoingPairing,
            Phase::Fighting(_) => Status::OnGoingFighting,
            Phase::Finished => Status::Finished,
        }
    }

    pub fn live_round(&self) -> Option<&Round> {
        match self {
            Phase::Pairing(round) | Phase::Fighting(round) => Some(round),
            Phase::NotStarted | Phase::Finished => None,
        }
    }
}

/// Outcome of asking to close the current round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoundEnd {
    /// Some games are still unresolved; nothing changed
    Pending { unresolved: usize },
    /// The round closed and the match advanced
    Closed(Match),
}

/// A Swiss/Monrad match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Match {
    name: String,
    organizer: String,
    total_rounds: u32,
    scoring: ScoringRules,
    players: Vec<Player>,
    history: Vec<Arc<Round>>,
    phase: Phase,
}

impl Default for Match {
    fn default() -> Self {
        Self::new()
    }
}

impl Match {
    /// An empty match: no contestants, one round, default scoring.
    pub fn new() -> Self {
        Self {
            name: String::new(),
            organizer: String::new(),
            total_rounds: 1,
            scoring: ScoringRules::default(),
            players: Vec::new(),
            history: Vec::new(),
            phase: Phase::NotStarted,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn organizer(&self) -> &str {
        &self.organizer
    }

    pub fn total_rounds(&self) -> u32 {
        self.total_rounds
    }

    pub fn scoring(&self) -> ScoringRules {
        self.scoring
    }

    pub fn players(&self) -> &[Player] {
        &self.players
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    pub fn status(&self) -> Status {
        self.phase.status()
    }

    /// 0 before the start, the live round while playing, total + 1 once finished.
    pub fn current_round(&self) -> u32 {
        match &self.phase {
            Phase::NotStarted => 0,
            Phase::Pairing(round) | Phase::Fighting(round) => round.number,
            Phase::Finished => self.total_rounds + 1,
        }
    }

    /// Closed rounds, oldest first.
    pub fn history(&self) -> &[Arc<Round>] {
        &self.history
    }

    /// Data of round `number`, if the match has reached it.
    pub fn round(&self, number: u32) -> Option<&Round> {
        let index = (number as usize).checked_sub(1)?;
        match self.history.get(index) {
            Some(round) => Some(round.as_ref()),
            None => self.phase.live_round().filter(|r| r.number == number),
        }
    }

    /// Games of the live round, empty when no round is live.
    pub fn current_games(&self) -> &[Game] {
        self.phase.live_round().map(Round::games).unwrap_or(&[])
    }

    pub fn player(&self, number: PlayerNumber) -> Option<&Player> {
        self.players.iter().find(|p| p.number == number)
    }

    pub fn player_by_name(&self, name: &str) -> Option<&Player> {
        self.players.iter().find(|p| p.name == name)
    }

    pub fn standings(&self) -> Vec<Standing> {
        ranking::standings(&self.players)
    }

    /// Status of one round derived from the match progress.
    pub fn round_status(&self, number: u32) -> Result<Status, MatchError> {
        if number == 0 || number > self.total_rounds {
            return Err(MatchError::NotFound(format!("round {}", number)));
        }

        let current = self.current_round();
        Ok(match self.status() {
            Status::NotStarted => Status::NotStarted,
            Status::Finished => Status::Finished,
            _ if number < current => Status::Finished,
            _ if number > current => Status::NotStarted,
            status => status,
        })
    }

    fn invalid(&self, operation: &'static str) -> MatchError {
        MatchError::InvalidTransition {
            operation,
            status: self.status(),
        }
    }

    pub fn set_name(&self, name: &str) -> Result<Match, MatchError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(MatchError::InvalidArgument("match name is empty".to_string()));
        }
        Ok(Match {
            name: name.to_string(),
            ..self.clone()
        })
    }

    pub fn set_organizer(&self, organizer: &str) -> Result<Match, MatchError> {
        Ok(Match {
            organizer: organizer.trim().to_string(),
            ..self.clone()
        })
    }

    /// Change the number of rounds. Cannot drop below the live round.
    pub fn set_total_rounds(&self, total_rounds: u32) -> Result<Match, MatchError> {
        if self.status() == Status::Finished {
            return Err(self.invalid("change the number of rounds"));
        }
        if total_rounds == 0 || total_rounds > MAXIMUM_TOTAL_ROUNDS {
            return Err(MatchError::InvalidArgument(format!(
                "total rounds must be between 1 and {}, got {}",
                MAXIMUM_TOTAL_ROUNDS, total_rounds
            )));
        }
        if total_rounds < self.current_round() {
            return Err(MatchError::InvalidArgument(format!(
                "round {} is already under way",
                self.current_round()
            )));
        }
        Ok(Match {
            total_rounds,
            ..self.clone()
        })
    }

    pub fn set_scoring(&self, scoring: ScoringRules) -> Result<Match, MatchError> {
        if self.status() != Status::NotStarted {
            return Err(self.invalid("change the scoring"));
        }
        Ok(Match {
            scoring,
            ..self.clone()
        })
    }

    /// Begin round 1.
    pub fn start(&self) -> Result<Match, MatchError> {
        if self.phase != Phase::NotStarted || self.current_round() != 0 {
            return Err(self.invalid("start the match"));
        }
        if self.players.len() < 2 {
            return Err(MatchError::InvalidArgument(
                "at least two contestants are required".to_string(),
            ));
        }

        info!(players = self.players.len(), rounds = self.total_rounds, "Starting match");
        Ok(Match {
            phase: Phase::Pairing(pairing::pair_round(&self.players, 1)),
            ..self.clone()
        })
    }

    /// Lock the pairing of round `number` and start playing it.
    pub fn start_current_round(&self, number: u32) -> Result<Match, MatchError> {
        let round = match &self.phase {
            Phase::Pairing(round) if round.number == number => round,
            _ => return Err(self.invalid("start this round")),
        };
        if round.is_empty() {
            return Err(MatchError::InvalidArgument(format!(
                "round {} has no games",
                number
            )));
        }

        info!(round = number, games = round.len(), "Round started");
        Ok(Match {
            phase: Phase::Fighting(round.clone()),
            ..self.clone()
        })
    }

    /// Record the outcome of one table of the live round.
    pub fn record_result(
        &self,
        number: u32,
        table: u32,
        outcome: Outcome,
    ) -> Result<Match, MatchError> {
        let round = match &self.phase {
            Phase::Fighting(round) if round.number == number => round,
            _ => return Err(self.invalid("record a result")),
        };
        let game = round
            .game(table)
            .ok_or_else(|| MatchError::NotFound(format!("table {} in round {}", table, number)))?;
        if game.has_bye() {
            return Err(MatchError::InvalidArgument(format!(
                "table {} is a bye and has a fixed result",
                table
            )));
        }

        let round = round
            .with_outcome(table, outcome)
            .ok_or_else(|| MatchError::NotFound(format!("table {}", table)))?;
        Ok(Match {
            phase: Phase::Fighting(round),
            ..self.clone()
        })
    }

    /// Close round `number` if every game has a result, then advance.
    pub fn end_current_round(&self, number: u32) -> Result<RoundEnd, MatchError> {
        let round = match &self.phase {
            Phase::Fighting(round) if round.number == number => round,
            _ => return Err(self.invalid("end this round")),
        };
        if !round.can_end() {
            return Ok(RoundEnd::Pending {
                unresolved: round.unresolved_count(),
            });
        }

        let players = results::apply_round(&self.players, round, self.scoring);
        let mut history = self.history.clone();
        history.push(Arc::new(round.clone()));
        info!(round = number, "Round closed");

        let phase = if number >= self.total_rounds {
            info!("Match finished");
            Phase::Finished
        } else {
            Phase::Pairing(pairing::pair_round(&players, number + 1))
        };

        Ok(RoundEnd::Closed(Match {
            players,
            history,
            phase,
            ..self.clone()
        }))
    }

    /// Throw away any manual edits and pair the live round again.
    pub fn reset_pairing(&self) -> Result<Match, MatchError> {
        let number = match &self.phase {
            Phase::Pairing(round) => round.number,
            _ => return Err(self.invalid("reset the pairing")),
        };
        Ok(Match {
            phase: Phase::Pairing(pairing::pair_round(&self.players, number)),
            ..self.clone()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{PairingQuality, BYE_NUMBER};
    use pretty_assertions::assert_eq;

    fn match_with(names: &[&str], rounds: u32) -> Match {
        names
            .iter()
            .fold(Match::new().set_total_rounds(rounds).unwrap(), |m, name| {
                m.add_player(NewPlayer::named(*name)).unwrap()
            })
    }

    fn closed(end: RoundEnd) -> Match {
        match end {
            RoundEnd::Closed(m) => m,
            RoundEnd::Pending { unresolved } => panic!("{} games unresolved", unresolved),
        }
    }

    #[test]
    fn test_new_match_is_empty() {
        let m = Match::new();
        assert_eq!(m.status(), Status::NotStarted);
        assert_eq!(m.current_round(), 0);
        assert!(m.players().is_empty());
        assert!(m.current_games().is_empty());
    }

    #[test]
    fn test_start_pairs_round_one() {
        let m = match_with(&["A", "B", "C", "D"], 3).start().unwrap();
        assert_eq!(m.status(), Status::OnGoingPairing);
        assert_eq!(m.current_round(), 1);
        assert_eq!(m.current_games().len(), 2);
    }

    #[test]
    fn test_start_twice_fails() {
        let m = match_with(&["A", "B"], 3).start().unwrap();
        assert!(matches!(
            m.start(),
            Err(MatchError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn test_start_needs_two_players() {
        let m = match_with(&["A"], 3);
        assert!(matches!(m.start(), Err(MatchError::InvalidArgument(_))));
    }

    #[test]
    fn test_start_round_requires_current_round() {
        let m = match_with(&["A", "B"], 3).start().unwrap();
        assert!(m.start_current_round(2).is_err());
        let m = m.start_current_round(1).unwrap();
        assert_eq!(m.status(), Status::OnGoingFighting);
        assert!(m.start_current_round(1).is_err());
    }

    #[test]
    fn test_record_result_outside_fight_fails() {
        let m = match_with(&["A", "B"], 3).start().unwrap();
        assert!(matches!(
            m.record_result(1, 1, Outcome::RedWins),
            Err(MatchError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn test_record_result_unknown_table() {
        let m = match_with(&["A", "B"], 3)
            .start()
            .unwrap()
            .start_current_round(1)
            .unwrap();
        assert!(matches!(
            m.record_result(1, 5, Outcome::RedWins),
            Err(MatchError::NotFound(_))
        ));
    }

    #[test]
    fn test_bye_result_is_fixed() {
        let m = match_with(&["A", "B", "C"], 3)
            .start()
            .unwrap()
            .start_current_round(1)
            .unwrap();
        let bye_table = m
            .current_games()
            .iter()
            .find(|g| g.has_bye())
            .unwrap()
            .table;
        assert!(matches!(
            m.record_result(1, bye_table, Outcome::Draw),
            Err(MatchError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_end_round_with_unresolved_games_is_pending() {
        let m = match_with(&["A", "B", "C", "D"], 3)
            .start()
            .unwrap()
            .start_current_round(1)
            .unwrap()
            .record_result(1, 1, Outcome::RedWins)
            .unwrap();

        match m.end_current_round(1).unwrap() {
            RoundEnd::Pending { unresolved } => assert_eq!(unresolved, 1),
            RoundEnd::Closed(_) => panic!("round should not close"),
        }
        assert_eq!(m.status(), Status::OnGoingFighting);
        assert!(m.players().iter().all(|p| p.score == 0));
    }

    #[test]
    fn test_five_player_scenario() {
        let m = match_with(&["A", "B", "C", "D", "E"], 3).start().unwrap();

        let games: Vec<(u32, u32)> = m.current_games().iter().map(|g| (g.red, g.black)).collect();
        assert_eq!(games, vec![(1, 4), (2, 5), (3, BYE_NUMBER)]);

        let m = m
            .start_current_round(1)
            .unwrap()
            .record_result(1, 1, Outcome::RedWins)
            .unwrap()
            .record_result(1, 2, Outcome::Draw)
            .unwrap();
        let m = closed(m.end_current_round(1).unwrap());

        let score = |n| m.player(n).unwrap().score;
        assert_eq!(score(1), 2);
        assert_eq!(score(4), 0);
        assert_eq!(score(2), 1);
        assert_eq!(score(5), 1);
        assert_eq!(score(3), 2);
        assert_eq!(m.status(), Status::OnGoingPairing);
        assert_eq!(m.current_round(), 2);
        assert_eq!(m.round_status(1).unwrap(), Status::Finished);
        assert_eq!(m.round_status(2).unwrap(), Status::OnGoingPairing);
        assert_eq!(m.round_status(3).unwrap(), Status::NotStarted);
        assert!(m.round_status(4).is_err());
    }

    #[test]
    fn test_last_round_finishes_match() {
        let m = match_with(&["A", "B"], 1)
            .start()
            .unwrap()
            .start_current_round(1)
            .unwrap()
            .record_result(1, 1, Outcome::BlackWins)
            .unwrap();
        let m = closed(m.end_current_round(1).unwrap());

        assert_eq!(m.status(), Status::Finished);
        assert_eq!(m.current_round(), 2);
        assert_eq!(m.history().len(), 1);
        assert_eq!(m.round(1).unwrap().games()[0].outcome, Outcome::BlackWins);
        assert!(m.set_total_rounds(3).is_err());
    }

    #[test]
    fn test_snapshots_stay_valid() {
        let before = match_with(&["A", "B"], 2).start().unwrap();
        let after = before.start_current_round(1).unwrap();

        assert_eq!(before.status(), Status::OnGoingPairing);
        assert_eq!(after.status(), Status::OnGoingFighting);
    }

    #[test]
    fn test_score_conservation() {
        let scoring = ScoringRules {
            win: 3,
            draw: 1,
            loss: 0,
        };
        let m = match_with(&["A", "B", "C", "D", "E", "F", "G"], 2)
            .set_scoring(scoring)
            .unwrap()
            .start()
            .unwrap()
            .start_current_round(1)
            .unwrap()
            .record_result(1, 1, Outcome::RedWins)
            .unwrap()
            .record_result(1, 2, Outcome::Draw)
            .unwrap()
            .record_result(1, 3, Outcome::BlackWins)
            .unwrap();
        let m = closed(m.end_current_round(1).unwrap());

        let total: u32 = m.players().iter().map(|p| p.score).sum();
        // two decisive games, one draw, one bye win
        assert_eq!(total, 3 + 3 + 2 + 3);
    }

    #[test]
    fn test_tie_break_is_sum_of_current_opponent_scores() {
        let mut m = match_with(&["A", "B", "C", "D", "E", "F"], 3).start().unwrap();
        for round in 1..=2 {
            m = m.start_current_round(round).unwrap();
            for table in 1..=m.current_games().len() as u32 {
                m = m.record_result(round, table, Outcome::RedWins).unwrap();
            }
            m = closed(m.end_current_round(round).unwrap());
        }

        for p in m.players() {
            let expected: u32 = p
                .played_opponents
                .iter()
                .map(|n| m.player(*n).map(|o| o.score).unwrap_or(0))
                .sum();
            assert_eq!(p.opponent_score, expected);
        }
    }

    #[test]
    fn test_reset_pairing_only_while_pairing() {
        let m = match_with(&["A", "B", "C", "D"], 2).start().unwrap();
        let reset = m.reset_pairing().unwrap();
        assert_eq!(reset.current_games(), m.current_games());
        assert_eq!(reset.phase().live_round().unwrap().quality, PairingQuality::Standard);

        let fighting = m.start_current_round(1).unwrap();
        assert!(fighting.reset_pairing().is_err());
    }

    #[test]
    fn test_settings_validation() {
        let m = Match::new();
        assert!(m.set_name("  ").is_err());
        assert_eq!(m.set_name(" Open ").unwrap().name(), "Open");
        assert!(m.set_total_rounds(0).is_err());
        assert!(m.set_total_rounds(MAXIMUM_TOTAL_ROUNDS + 1).is_err());
        assert_eq!(m.set_total_rounds(9).unwrap().total_rounds(), 9);
    }

    #[test]
    fn test_scoring_locked_after_start() {
        let m = match_with(&["A", "B"], 2).start().unwrap();
        assert!(m.set_scoring(ScoringRules::default()).is_err());
    }
}
