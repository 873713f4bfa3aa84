//! A complete competition driven through a persisted session.

use std::collections::HashSet;
use std::fs;

use pretty_assertions::assert_eq;
use tempfile::TempDir;

use monrad_arbiter::commands::{Command, Executed, Session, SessionError};
use monrad_arbiter::models::{Outcome, PairingQuality, Side, BYE_NUMBER};
use monrad_arbiter::storage::{CommandJournal, StorageError};
use monrad_arbiter::tournament::{NewPlayer, Status};

const NAMES: [&str; 7] = ["Ada", "Bo", "Cy", "Di", "Ed", "Flo", "Gus"];
const ROUNDS: u32 = 4;

/// Play the whole match with results derived from round and table numbers.
fn play(session: &mut Session, journal: &mut CommandJournal) {
    let setup = [
        Command::SetName {
            name: "Autumn open".to_string(),
        },
        Command::SetTotalRounds {
            total_rounds: ROUNDS,
        },
    ];
    for command in setup {
        session.execute_and_persist(journal, command).unwrap();
    }
    for name in NAMES {
        session
            .execute_and_persist(
                journal,
                Command::AddPlayer {
                    player: NewPlayer::named(name),
                },
            )
            .unwrap();
    }
    session
        .execute_and_persist(journal, Command::StartMatch)
        .unwrap();

    for round in 1..=ROUNDS {
        session
            .execute_and_persist(journal, Command::StartRound { round })
            .unwrap();

        let tables: Vec<(u32, bool)> = session
            .current()
            .current_games()
            .iter()
            .map(|g| (g.table, g.has_bye()))
            .collect();
        for (table, has_bye) in tables {
            if has_bye {
                continue;
            }
            let outcome = match (round + table) % 3 {
                0 => Outcome::Draw,
                1 => Outcome::RedWins,
                _ => Outcome::BlackWins,
            };
            session
                .execute_and_persist(
                    journal,
                    Command::RecordResult {
                        round,
                        table,
                        outcome,
                    },
                )
                .unwrap();
        }

        let executed = session
            .execute_and_persist(journal, Command::EndRound { round })
            .unwrap();
        assert_eq!(executed, Executed::Recorded);
    }
}

#[test]
fn test_full_match_keeps_pairing_constraints() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("match.jsonl");

    let (mut session, mut journal) = Session::open(&path).unwrap();
    play(&mut session, &mut journal);
    let m = session.current();

    assert_eq!(m.status(), Status::Finished);
    assert_eq!(m.current_round(), ROUNDS + 1);
    assert_eq!(m.history().len(), ROUNDS as usize);

    // Four tables per round, two points handed out per table
    let total: u32 = m.players().iter().map(|p| p.score).sum();
    assert_eq!(total, 2 * 4 * ROUNDS);

    for player in m.players() {
        assert_eq!(player.rounds_played(), ROUNDS as usize);
        assert!(player.bye_count() <= 1, "{} got two byes", player.name);
    }

    for round in m.history() {
        assert_eq!(round.quality, PairingQuality::Standard, "round {}", round.number);
    }
    for player in m.players() {
        let real: Vec<_> = player
            .played_opponents
            .iter()
            .filter(|o| **o != BYE_NUMBER)
            .collect();
        let distinct: HashSet<_> = real.iter().collect();
        assert_eq!(distinct.len(), real.len(), "rematch for {}", player.name);

        let games: Vec<(u32, Side)> = player
            .played_opponents
            .iter()
            .copied()
            .zip(player.played_sides.iter().copied())
            .collect();
        for window in games.windows(3) {
            if window.iter().any(|(o, _)| *o == BYE_NUMBER) {
                continue;
            }
            assert!(
                !(window[0].1 == window[1].1 && window[1].1 == window[2].1),
                "{} played {} three times running",
                player.name,
                window[0].1
            );
        }
    }

    // The bye table is always the last one
    for round in m.history() {
        let last = round.games().len() as u32;
        assert!(round.game(last).unwrap().has_bye(), "round {}", round.number);
    }

    let standings = m.standings();
    assert_eq!(standings.len(), NAMES.len());
    assert!(standings
        .windows(2)
        .all(|w| w[0].player.score >= w[1].player.score));
}

#[test]
fn test_reopened_journal_rebuilds_identical_match() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("match.jsonl");

    let (mut session, mut journal) = Session::open(&path).unwrap();
    play(&mut session, &mut journal);

    let (reopened, reopened_journal) = Session::open(&path).unwrap();
    assert_eq!(reopened.current(), session.current());
    assert_eq!(reopened.commands(), session.commands());
    assert_eq!(reopened_journal.head(), journal.head());

    let serialized = serde_json::to_string(session.current()).unwrap();
    assert_eq!(serde_json::to_string(reopened.current()).unwrap(), serialized);
}

#[test]
fn test_edited_journal_is_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("match.jsonl");

    let (mut session, mut journal) = Session::open(&path).unwrap();
    play(&mut session, &mut journal);

    let edited = fs::read_to_string(&path)
        .unwrap()
        .replacen("\"red_wins\"", "\"black_wins\"", 1);
    fs::write(&path, edited).unwrap();

    match Session::open(&path) {
        Err(SessionError::Storage(StorageError::Corrupt { .. })) => {}
        other => panic!("expected a corrupt journal, got {:?}", other.map(|_| ())),
    }
}
