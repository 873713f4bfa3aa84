//! Commands and sessions.
//!
//! Every change to a match is expressed as a [`Command`]. A [`Session`] holds
//! the current match together with the commands that produced it, so the
//! match can be persisted as a journal and rebuilt by replaying it.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::models::{Outcome, PlayerNumber};
use crate::storage::{CommandJournal, Journal, StorageError};
use crate::tournament::{Match, MatchError, NewPlayer, PlayerUpdate, RoundEnd, ScoringRules};

/// A command failed while rebuilding a match from its journal.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("command {index} ({}) was rejected during replay: {source}", .command.name())]
pub struct ReplayError {
    /// Zero-based position of the failing command
    pub index: usize,
    pub command: Command,
    #[source]
    pub source: MatchError,
}

/// Errors raised by a persisted session.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Replay(#[from] ReplayError),

    #[error("command rejected: {0}")]
    Rejected(#[from] MatchError),
}

/// One change to a match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Command {
    SetName {
        name: String,
    },
    SetOrganizer {
        organizer: String,
    },
    SetTotalRounds {
        total_rounds: u32,
    },
    SetScoring {
        scoring: ScoringRules,
    },
    AddPlayer {
        player: NewPlayer,
    },
    UpdatePlayer {
        number: PlayerNumber,
        update: PlayerUpdate,
    },
    RemovePlayer {
        number: PlayerNumber,
    },
    RemoveAllPlayers,
    StartMatch,
    StartRound {
        round: u32,
    },
    RecordResult {
        round: u32,
        table: u32,
        outcome: Outcome,
    },
    EndRound {
        round: u32,
    },
    SwapPlayers {
        table: u32,
        current: PlayerNumber,
        with: PlayerNumber,
    },
    ResetPairing,
}

/// Effect of applying a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Applied {
    Changed(Match),
    /// The round cannot be closed yet; nothing changed
    Pending { unresolved: usize },
}

/// Effect of executing a command in a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Executed {
    Recorded,
    Pending { unresolved: usize },
}

impl Command {
    /// Short name for logs and messages.
    pub fn name(&self) -> &'static str {
        match self {
            Command::SetName { .. } => "set_name",
            Command::SetOrganizer { .. } => "set_organizer",
            Command::SetTotalRounds { .. } => "set_total_rounds",
            Command::SetScoring { .. } => "set_scoring",
            Command::AddPlayer { .. } => "add_player",
            Command::UpdatePlayer { .. } => "update_player",
            Command::RemovePlayer { .. } => "remove_player",
            Command::RemoveAllPlayers => "remove_all_players",
            Command::StartMatch => "start_match",
            Command::StartRound { .. } => "start_round",
            Command::RecordResult { .. } => "record_result",
            Command::EndRound { .. } => "end_round",
            Command::SwapPlayers { .. } => "swap_players",
            Command::ResetPairing => "reset_pairing",
        }
    }

    /// Apply the command to `current`. `current` itself is never modified.
    pub fn apply(&self, current: &Match) -> Result<Applied, MatchError> {
        let next = match self {
            Command::SetName { name } => current.set_name(name),
            Command::SetOrganizer { organizer } => current.set_organizer(organizer),
            Command::SetTotalRounds { total_rounds } => current.set_total_rounds(*total_rounds),
            Command::SetScoring { scoring } => current.set_scoring(*scoring),
            Command::AddPlayer { player } => current.add_player(player.clone()),
            Command::UpdatePlayer { number, update } => {
                current.update_player(*number, update.clone())
            }
            Command::RemovePlayer { number } => current.remove_player(*number),
            Command::RemoveAllPlayers => current.remove_all_players(),
            Command::StartMatch => current.start(),
            Command::StartRound { round } => current.start_current_round(*round),
            Command::RecordResult {
                round,
                table,
                outcome,
            } => current.record_result(*round, *table, *outcome),
            Command::EndRound { round } => {
                return match current.end_current_round(*round)? {
                    RoundEnd::Closed(next) => Ok(Applied::Changed(next)),
                    RoundEnd::Pending { unresolved } => Ok(Applied::Pending { unresolved }),
                };
            }
            Command::SwapPlayers {
                table,
                current: seated,
                with,
            } => current.swap_players(*table, *seated, *with),
            Command::ResetPairing => current.reset_pairing(),
        };
        next.map(Applied::Changed)
    }
}

/// The live match plus the commands that produced it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    current: Match,
    commands: Vec<Command>,
}

impl Session {
    /// A session over an empty match.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> &Match {
        &self.current
    }

    /// Commands applied so far, oldest first.
    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    /// Apply `command`; it is recorded only if it changed the match.
    pub fn execute(&mut self, command: Command) -> Result<Executed, MatchError> {
        match command.apply(&self.current)? {
            Applied::Changed(next) => {
                debug!(command = command.name(), "Command applied");
                self.current = next;
                self.commands.push(command);
                Ok(Executed::Recorded)
            }
            Applied::Pending { unresolved } => Ok(Executed::Pending { unresolved }),
        }
    }

    /// Rebuild a session from an empty match.
    ///
    /// Fails on the first rejected command; no partial session is returned.
    pub fn replay(commands: impl IntoIterator<Item = Command>) -> Result<Self, ReplayError> {
        let mut session = Self::new();
        for (index, command) in commands.into_iter().enumerate() {
            if let Err(source) = session.execute(command.clone()) {
                return Err(ReplayError {
                    index,
                    command,
                    source,
                });
            }
        }
        Ok(session)
    }

    /// Open the journal at `path` and replay it. A missing file is a new match.
    pub fn open(path: impl Into<PathBuf>) -> Result<(Self, CommandJournal), SessionError> {
        Self::resume(Journal::open(path)?)
    }

    /// Like `open`, but the journal must already exist.
    pub fn open_existing(
        path: impl Into<PathBuf>,
    ) -> Result<(Self, CommandJournal), SessionError> {
        Self::resume(Journal::open_existing(path)?)
    }

    fn resume(
        (journal, commands): (CommandJournal, Vec<Command>),
    ) -> Result<(Self, CommandJournal), SessionError> {
        let session = Self::replay(commands)?;
        info!(
            commands = session.commands.len(),
            status = %session.current.status(),
            "Opened match journal"
        );
        Ok((session, journal))
    }

    /// Execute `command` and append it to `journal` if it was recorded.
    ///
    /// The session only changes once the journal write succeeded.
    pub fn execute_and_persist(
        &mut self,
        journal: &mut CommandJournal,
        command: Command,
    ) -> Result<Executed, SessionError> {
        match command.apply(&self.current)? {
            Applied::Changed(next) => {
                journal.append(&command)?;
                debug!(command = command.name(), seq = journal.len(), "Command persisted");
                self.current = next;
                self.commands.push(command);
                Ok(Executed::Recorded)
            }
            Applied::Pending { unresolved } => Ok(Executed::Pending { unresolved }),
        }
    }

    /// Write the whole session to a fresh journal at `path`.
    pub fn save_as(&self, path: impl Into<PathBuf>) -> Result<CommandJournal, StorageError> {
        Journal::rewrite(path, &self.commands)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tournament::Status;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn add(name: &str) -> Command {
        Command::AddPlayer {
            player: NewPlayer::named(name),
        }
    }

    fn setup_commands() -> Vec<Command> {
        vec![
            Command::SetName {
                name: "Club night".to_string(),
            },
            Command::SetTotalRounds { total_rounds: 2 },
            add("A"),
            add("B"),
            add("C"),
            add("D"),
            Command::StartMatch,
            Command::StartRound { round: 1 },
        ]
    }

    #[test]
    fn test_command_serialization_is_tagged() {
        let json = serde_json::to_string(&Command::StartRound { round: 3 }).unwrap();
        assert_eq!(json, r#"{"type":"start_round","round":3}"#);

        let parsed: Command =
            serde_json::from_str(r#"{"type":"record_result","round":1,"table":2,"outcome":"draw"}"#)
                .unwrap();
        assert_eq!(
            parsed,
            Command::RecordResult {
                round: 1,
                table: 2,
                outcome: Outcome::Draw
            }
        );
    }

    #[test]
    fn test_rejected_command_is_not_recorded() {
        let mut session = Session::new();
        session.execute(add("A")).unwrap();

        let err = session.execute(Command::StartMatch).unwrap_err();
        assert!(matches!(err, MatchError::InvalidArgument(_)));
        assert_eq!(session.commands().len(), 1);
        assert_eq!(session.current().status(), Status::NotStarted);
    }

    #[test]
    fn test_pending_end_round_is_not_recorded() {
        let mut session = Session::replay(setup_commands()).unwrap();
        let before = session.commands().len();

        let executed = session.execute(Command::EndRound { round: 1 }).unwrap();
        assert_eq!(executed, Executed::Pending { unresolved: 2 });
        assert_eq!(session.commands().len(), before);
    }

    #[test]
    fn test_replay_is_identical() {
        let mut session = Session::replay(setup_commands()).unwrap();
        for table in 1..=2 {
            session
                .execute(Command::RecordResult {
                    round: 1,
                    table,
                    outcome: Outcome::RedWins,
                })
                .unwrap();
        }
        session.execute(Command::EndRound { round: 1 }).unwrap();
        assert_eq!(session.current().current_round(), 2);

        let replayed = Session::replay(session.commands().to_vec()).unwrap();
        assert_eq!(replayed, session);
    }

    #[test]
    fn test_replay_reports_failing_command() {
        let mut commands = setup_commands();
        commands.push(Command::StartRound { round: 1 });

        let err = Session::replay(commands.clone()).unwrap_err();
        assert_eq!(err.index, commands.len() - 1);
        assert_eq!(err.command, Command::StartRound { round: 1 });
        assert!(matches!(err.source, MatchError::InvalidTransition { .. }));
    }

    #[test]
    fn test_persisted_session_reopens() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("match.jsonl");

        let (mut session, mut journal) = Session::open(&path).unwrap();
        for command in setup_commands() {
            session.execute_and_persist(&mut journal, command).unwrap();
        }
        assert!(session
            .execute_and_persist(&mut journal, Command::StartMatch)
            .is_err());
        assert_eq!(journal.len(), setup_commands().len() as u64);

        let (reopened, _) = Session::open(&path).unwrap();
        assert_eq!(reopened, session);
    }

    #[test]
    fn test_save_as_writes_fresh_journal() {
        let temp_dir = TempDir::new().unwrap();
        let session = Session::replay(setup_commands()).unwrap();

        let journal = session.save_as(temp_dir.path().join("copy.jsonl")).unwrap();
        assert_eq!(journal.len(), session.commands().len() as u64);

        let (reopened, _) = Session::open(journal.path()).unwrap();
        assert_eq!(reopened.current(), session.current());
    }

    #[test]
    fn test_open_existing_rejects_missing_journal() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("match.jsonl");

        assert!(matches!(
            Session::open_existing(&path),
            Err(SessionError::Storage(StorageError::PathNotFound(_)))
        ));

        let session = Session::replay(setup_commands()).unwrap();
        session.save_as(&path).unwrap();
        let (reopened, _) = Session::open_existing(&path).unwrap();
        assert_eq!(reopened, session);
    }
}
