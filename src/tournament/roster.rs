//! Roster edits and manual pairing adjustments.
//!
//! Edits are only accepted before the match starts or while the live round is
//! still being paired. In the latter case the round is paired again so it
//! always reflects the live roster.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use super::{Match, MatchError, Phase, Status};
use crate::models::{Game, Player, PlayerNumber, BYE_NUMBER};
use crate::pairing;
use crate::ranking;

/// A contestant to be added.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPlayer {
    pub name: String,

    #[serde(default)]
    pub organization: String,

    #[serde(default)]
    pub note: String,

    /// Requested number; the smallest free one is used when absent
    #[serde(default)]
    pub number: Option<PlayerNumber>,
}

impl NewPlayer {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Builder method to set organization.
    pub fn with_organization(mut self, organization: impl Into<String>) -> Self {
        self.organization = organization.into();
        self
    }

    /// Builder method to set a preferred number.
    pub fn with_number(mut self, number: PlayerNumber) -> Self {
        self.number = Some(number);
        self
    }
}

/// Replacement identity fields for an existing contestant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerUpdate {
    pub number: PlayerNumber,
    pub name: String,

    #[serde(default)]
    pub organization: String,

    #[serde(default)]
    pub note: String,
}

impl Match {
    fn ensure_roster_editable(&self, operation: &'static str) -> Result<(), MatchError> {
        match self.status() {
            Status::NotStarted | Status::OnGoingPairing => Ok(()),
            _ => Err(self.invalid(operation)),
        }
    }

    /// Install a new roster, refresh tie-breaks, and re-pair a live round.
    fn with_roster(&self, players: Vec<Player>) -> Match {
        let players = ranking::with_opponent_scores(&players);
        let phase = match &self.phase {
            Phase::Pairing(round) => Phase::Pairing(pairing::pair_round(&players, round.number)),
            other => other.clone(),
        };
        Match {
            players,
            phase,
            ..self.clone()
        }
    }

    /// Whether a closed round recorded this number. It stays bound to whoever
    /// played under it, even after that contestant leaves the roster.
    fn in_history(&self, number: PlayerNumber) -> bool {
        self.history.iter().any(|r| r.contains(number))
    }

    /// Smallest positive number neither on the roster nor in the history.
    fn free_number(&self) -> PlayerNumber {
        (1..)
            .find(|n| self.player(*n).is_none() && !self.in_history(*n))
            .unwrap_or(BYE_NUMBER)
    }

    fn check_identity(
        &self,
        name: &str,
        number: PlayerNumber,
        except: Option<PlayerNumber>,
    ) -> Result<(), MatchError> {
        if name.is_empty() {
            return Err(MatchError::InvalidArgument("contestant name is empty".to_string()));
        }
        if number == BYE_NUMBER {
            return Err(MatchError::InvalidArgument(
                "contestant number must be positive".to_string(),
            ));
        }
        for other in self.players.iter().filter(|p| Some(p.number) != except) {
            if other.name == name {
                return Err(MatchError::Duplicate(format!(
                    "name \"{}\" is taken by contestant {}",
                    name, other.number
                )));
            }
            if other.number == number {
                return Err(MatchError::Duplicate(format!("number {} is taken", number)));
            }
        }
        if Some(number) != except && self.in_history(number) {
            return Err(MatchError::Duplicate(format!(
                "number {} belongs to a removed contestant",
                number
            )));
        }
        Ok(())
    }

    pub fn add_player(&self, new: NewPlayer) -> Result<Match, MatchError> {
        self.ensure_roster_editable("add a contestant")?;

        let name = new.name.trim();
        let number = new.number.unwrap_or_else(|| self.free_number());
        self.check_identity(name, number, None)?;

        let player = Player::new(number, name)
            .with_organization(new.organization.trim())
            .with_note(new.note.trim());
        info!(number, name, "Added contestant");

        let mut players = self.players.clone();
        players.push(player);
        Ok(self.with_roster(players))
    }

    /// Change a contestant's identity. Renumbering rewrites opponent histories
    /// and the closed rounds.
    pub fn update_player(
        &self,
        number: PlayerNumber,
        update: PlayerUpdate,
    ) -> Result<Match, MatchError> {
        self.ensure_roster_editable("update a contestant")?;
        if self.player(number).is_none() {
            return Err(MatchError::NotFound(format!("contestant {}", number)));
        }

        let name = update.name.trim();
        self.check_identity(name, update.number, Some(number))?;

        let players = self
            .players
            .iter()
            .map(|p| {
                let p = p.clone().with_renamed_opponent(number, update.number);
                if p.number != number {
                    return p;
                }
                Player {
                    number: update.number,
                    name: name.to_string(),
                    organization: update.organization.trim().to_string(),
                    note: update.note.trim().to_string(),
                    ..p
                }
            })
            .collect();
        let history = self
            .history
            .iter()
            .map(|r| {
                if number != update.number && r.contains(number) {
                    Arc::new(r.with_renumbered(number, update.number))
                } else {
                    Arc::clone(r)
                }
            })
            .collect();
        info!(number, new_number = update.number, "Updated contestant");
        Ok(Match {
            history,
            ..self.clone()
        }
        .with_roster(players))
    }

    pub fn remove_player(&self, number: PlayerNumber) -> Result<Match, MatchError> {
        self.ensure_roster_editable("remove a contestant")?;
        if self.player(number).is_none() {
            return Err(MatchError::NotFound(format!("contestant {}", number)));
        }

        let players = self
            .players
            .iter()
            .filter(|p| p.number != number)
            .cloned()
            .collect();
        info!(number, "Removed contestant");
        Ok(self.with_roster(players))
    }

    pub fn remove_all_players(&self) -> Result<Match, MatchError> {
        self.ensure_roster_editable("remove all contestants")?;
        info!(count = self.players.len(), "Removed all contestants");
        Ok(self.with_roster(Vec::new()))
    }

    /// Exchange `current` (seated at `table`) with `with`, wherever that one sits.
    ///
    /// Two contestants of the same table simply change sides. History is untouched.
    pub fn swap_players(
        &self,
        table: u32,
        current: PlayerNumber,
        with: PlayerNumber,
    ) -> Result<Match, MatchError> {
        let round = match &self.phase {
            Phase::Pairing(round) => round,
            _ => return Err(self.invalid("change the pairing")),
        };
        let game = round
            .game(table)
            .ok_or_else(|| MatchError::NotFound(format!("table {}", table)))?;
        if !game.involves(current) {
            return Err(MatchError::NotFound(format!(
                "contestant {} at table {}",
                current, table
            )));
        }
        let other = round.game_of(with).ok_or_else(|| {
            MatchError::NotFound(format!("contestant {} in round {}", with, round.number))
        })?;

        let replace = |g: &Game, from: PlayerNumber, to: PlayerNumber| {
            let red = if g.red == from { to } else { g.red };
            let black = if g.black == from { to } else { g.black };
            Game::new(g.table, red, black)
        };

        let updated = if other.table == game.table {
            round.with_game(Game::new(table, game.black, game.red))
        } else {
            round
                .with_game(replace(game, current, with))
                .and_then(|r| r.with_game(replace(other, with, current)))
        };
        let updated = updated.ok_or_else(|| MatchError::NotFound(format!("table {}", table)))?;

        info!(table, current, with, "Swapped contestants");
        Ok(Match {
            phase: Phase::Pairing(updated.adjusted()),
            ..self.clone()
        })
    }
}
