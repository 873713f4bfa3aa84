//! Pairing engine.
//!
//! Produces a complete round from the roster:
//! - Round 1: rank-sorted roster split at the midpoint, rank i against rank i + half
//! - Later rounds: greedy walk down the ranking with bounded backtracking
//! - Retry budget exhausted: sequential pairing of whatever is left
//!
//! Games are finally ordered by rank so table 1 hosts the leader's game.

pub mod sides;

use std::cmp::Reverse;

use tracing::{debug, info, warn};

use crate::models::{Game, PairingQuality, Player, Round, Side};
use crate::ranking;

/// A pairing under construction. Indices point into the ranked entrant list,
/// so a lower index is a higher ranked contestant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Draft {
    red: usize,
    black: usize,
}

impl Draft {
    /// `a` is the contestant being placed, `side_for_a` the side it was given.
    fn new(a: usize, b: usize, side_for_a: Side) -> Self {
        match side_for_a {
            Side::Red => Self { red: a, black: b },
            Side::Black => Self { red: b, black: a },
        }
    }

    fn members(&self) -> [usize; 2] {
        [self.red, self.black]
    }
}

/// Result of the constrained search.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Search {
    /// Everyone was paired within the constraints
    Complete(Vec<Draft>),
    /// The retry budget ran out with `remaining` still unpaired
    Exhausted {
        formed: Vec<Draft>,
        remaining: Vec<usize>,
    },
}

/// Ranked entrants for a round: the roster plus a bye when the count is odd.
pub fn entrants(players: &[Player]) -> Vec<Player> {
    let mut entrants: Vec<Player> = players.iter().filter(|p| !p.is_bye()).cloned().collect();
    if entrants.len() % 2 == 1 {
        entrants.push(Player::bye());
    }
    ranking::rank(&entrants)
}

/// Pair round `number` for the given roster. Never fails; a degraded result is
/// flagged through `Round::quality`.
pub fn pair_round(players: &[Player], number: u32) -> Round {
    let entrants = entrants(players);

    let (drafts, quality) = if number <= 1 {
        (split_pairing(&entrants), PairingQuality::Standard)
    } else {
        match search(&entrants) {
            Search::Complete(drafts) => (drafts, PairingQuality::Standard),
            Search::Exhausted {
                mut formed,
                remaining,
            } => {
                warn!(
                    round = number,
                    unpaired = remaining.len(),
                    "Retry budget exhausted, pairing the rest sequentially"
                );
                formed.extend(sequential_pairing(&entrants, remaining));
                (formed, PairingQuality::Fallback)
            }
        }
    };

    let games = order_by_strength(&entrants, drafts)
        .into_iter()
        .map(|d| Game::new(0, entrants[d.red].number, entrants[d.black].number))
        .collect();

    let round = Round::new(number, games, quality);
    info!(
        round = number,
        games = round.len(),
        quality = ?round.quality,
        "Paired round"
    );
    round
}

/// Rank i of the top half against rank i of the bottom half.
fn split_pairing(entrants: &[Player]) -> Vec<Draft> {
    let half = entrants.len() / 2;
    (0..half)
        .map(|a| {
            let b = a + half;
            Draft::new(a, b, sides::assign_lenient(&entrants[a], &entrants[b]))
        })
        .collect()
}

/// Whether `a` and `b` may meet, and with which side for `a`.
fn legal_side(entrants: &[Player], a: usize, b: usize) -> Option<Side> {
    let (pa, pb) = (&entrants[a], &entrants[b]);
    if pa.has_played(pb.number) || pb.has_played(pa.number) {
        return None;
    }
    sides::assign(pa, pb)
}

/// A pairing decision that can be taken back: the pool before it was made and
/// the position of the partner chosen for the pool's head.
struct Choice {
    pool: Vec<usize>,
    partner: usize,
}

/// Greedy walk with backtracking.
///
/// The head of the pool takes the first legal partner behind it. When a head
/// has no legal partner left, the most recent game is undone, its contestants
/// return to the front of the pool in rank order and the previous head moves on
/// to its next candidate. The pool stays in rank order, so the bye is always
/// last. The search gives up after `entrants³` dead ends.
fn search(entrants: &[Player]) -> Search {
    let budget = entrants.len().pow(3);

    let mut formed: Vec<Draft> = Vec::new();
    let mut choices: Vec<Choice> = Vec::new();
    let mut pool: Vec<usize> = (0..entrants.len()).collect();
    let mut from = 1;
    let mut failures = 0;

    while let Some(&head) = pool.first() {
        let partner = pool
            .iter()
            .enumerate()
            .skip(from)
            .find_map(|(pos, &b)| legal_side(entrants, head, b).map(|side| (pos, b, side)));

        if let Some((pos, b, side)) = partner {
            debug!(
                a = entrants[head].number,
                b = entrants[b].number,
                side = %side,
                "Formed pairing"
            );
            let rest: Vec<usize> = pool
                .iter()
                .enumerate()
                .filter(|(i, _)| *i != 0 && *i != pos)
                .map(|(_, &x)| x)
                .collect();
            choices.push(Choice {
                pool: std::mem::replace(&mut pool, rest),
                partner: pos,
            });
            formed.push(Draft::new(head, b, side));
            from = 1;
            continue;
        }

        failures += 1;
        let choice = match choices.pop() {
            Some(choice) if failures <= budget => choice,
            _ => {
                return Search::Exhausted {
                    formed,
                    remaining: pool,
                }
            }
        };
        formed.pop();
        debug!(
            head = entrants[head].number,
            undone = entrants[choice.pool[0]].number,
            attempt = failures,
            "Backtracking"
        );
        pool = choice.pool;
        from = choice.partner + 1;
    }

    Search::Complete(formed)
}

/// Adjacent pairs in rank order, constraints ignored.
fn sequential_pairing(entrants: &[Player], mut remaining: Vec<usize>) -> Vec<Draft> {
    remaining.sort_unstable();
    remaining
        .chunks(2)
        .filter(|pair| pair.len() == 2)
        .map(|pair| {
            let (a, b) = (pair[0], pair[1]);
            Draft::new(a, b, sides::assign_lenient(&entrants[a], &entrants[b]))
        })
        .collect()
}

/// Bye game last; otherwise by the better rank of the two, then combined
/// score desc, then combined tie-break desc.
fn order_by_strength(entrants: &[Player], mut drafts: Vec<Draft>) -> Vec<Draft> {
    drafts.sort_by_key(|d| {
        let [x, y] = d.members();
        let (px, py) = (&entrants[x], &entrants[y]);
        (
            px.is_bye() || py.is_bye(),
            x.min(y),
            Reverse(px.score + py.score),
            Reverse(px.opponent_score + py.opponent_score),
        )
    });
    drafts
}
