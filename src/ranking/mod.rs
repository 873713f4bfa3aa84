//! Ranking engine.
//!
//! Computes derived standings from the roster:
//! - Tie-break ("opponent") score, Buchholz style
//! - Total ranking order used for standings and pairing

use std::cmp::Ordering;
use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::models::{Player, PlayerNumber};

/// One line of the standings table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Standing {
    /// 1-based position
    pub position: usize,

    pub player: Player,
}

/// Ranking order: score desc, tie-break desc, number asc. The bye is always last.
pub fn compare(a: &Player, b: &Player) -> Ordering {
    a.is_bye()
        .cmp(&b.is_bye())
        .then_with(|| b.score.cmp(&a.score))
        .then_with(|| b.opponent_score.cmp(&a.opponent_score))
        .then_with(|| a.number.cmp(&b.number))
}

/// Return the players sorted by ranking order.
pub fn rank(players: &[Player]) -> Vec<Player> {
    let mut ranked = players.to_vec();
    ranked.sort_by(compare);
    ranked
}

/// Sum of the current scores of every opponent `player` has faced.
///
/// Opponents that are no longer on the roster (and the bye) contribute nothing.
pub fn opponent_score(player: &Player, scores: &HashMap<PlayerNumber, u32>) -> u32 {
    player
        .played_opponents
        .iter()
        .map(|n| scores.get(n).copied().unwrap_or(0))
        .sum()
}

/// Recompute every contestant's tie-break score from up-to-date opponent scores.
pub fn with_opponent_scores(players: &[Player]) -> Vec<Player> {
    let scores: HashMap<PlayerNumber, u32> = players
        .iter()
        .filter(|p| !p.is_bye())
        .map(|p| (p.number, p.score))
        .collect();

    players
        .iter()
        .map(|p| {
            let tie_break = if p.is_bye() {
                0
            } else {
                opponent_score(p, &scores)
            };
            p.clone().with_opponent_score(tie_break)
        })
        .collect()
}

/// Build the standings table for the roster.
pub fn standings(players: &[Player]) -> Vec<Standing> {
    rank(players)
        .into_iter()
        .filter(|p| !p.is_bye())
        .enumerate()
        .map(|(i, player)| Standing {
            position: i + 1,
            player,
        })
        .collect()
}
