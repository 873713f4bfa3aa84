//! Side-balance heuristic: who moves first in a candidate pairing.
//!
//! Decisions are always made from the point of view of the first contestant
//! of the pair (`a`, the higher ranked one). Nobody may play the same side
//! three rounds running; everything else is balanced on long-run counts.

use std::cmp::Ordering;

use crate::models::{Player, Side};

/// Verdict for a candidate pair, seen from `a`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SideDecision {
    /// `a` must take red
    FirstRed,
    /// `a` must take black
    FirstBlack,
    /// Either assignment is legal for both
    Flexible,
    /// Every assignment gives someone a third game on the same side
    Reject,
}

/// A contestant's last two sides, oldest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Recent {
    /// Fewer than two rounds played
    Short,
    RedRed,
    RedBlack,
    BlackRed,
    BlackBlack,
}

impl Recent {
    fn of(player: &Player) -> Self {
        match player.last_two_sides() {
            None => Recent::Short,
            Some((Side::Red, Side::Red)) => Recent::RedRed,
            Some((Side::Red, Side::Black)) => Recent::RedBlack,
            Some((Side::Black, Side::Red)) => Recent::BlackRed,
            Some((Side::Black, Side::Black)) => Recent::BlackBlack,
        }
    }

    fn index(self) -> usize {
        match self {
            Recent::Short => 0,
            Recent::RedRed => 1,
            Recent::RedBlack => 2,
            Recent::BlackRed => 3,
            Recent::BlackBlack => 4,
        }
    }
}

const RED: SideDecision = SideDecision::FirstRed;
const BLK: SideDecision = SideDecision::FirstBlack;
const FLX: SideDecision = SideDecision::Flexible;
const NO: SideDecision = SideDecision::Reject;

/// Rows: `a`'s recent sides. Columns: `b`'s recent sides.
/// Order: short, RR, RB, BR, BB.
const SIDE_TABLE: [[SideDecision; 5]; 5] = [
    [FLX, RED, FLX, FLX, BLK],
    [BLK, NO, BLK, BLK, BLK],
    [FLX, RED, FLX, FLX, BLK],
    [FLX, RED, FLX, FLX, BLK],
    [RED, RED, RED, RED, NO],
];

/// Look up the verdict for the pair (`a`, `b`).
pub fn lookup(a: &Player, b: &Player) -> SideDecision {
    if b.is_bye() {
        return SideDecision::FirstRed;
    }
    if a.is_bye() {
        return SideDecision::FirstBlack;
    }
    SIDE_TABLE[Recent::of(a).index()][Recent::of(b).index()]
}

/// Side for `a`, or None when the pair must not be formed.
pub fn assign(a: &Player, b: &Player) -> Option<Side> {
    match lookup(a, b) {
        SideDecision::FirstRed => Some(Side::Red),
        SideDecision::FirstBlack => Some(Side::Black),
        SideDecision::Reject => None,
        SideDecision::Flexible => {
            if Recent::of(a) == Recent::Short && Recent::of(b) == Recent::Short {
                Some(short_history(a, b))
            } else {
                Some(balance(a, b))
            }
        }
    }
}

/// Like `assign`, but a rejected pair is still given sides by balance.
pub fn assign_lenient(a: &Player, b: &Player) -> Side {
    assign(a, b).unwrap_or_else(|| balance(a, b))
}

/// Neither contestant has two rounds behind them: whoever moved first most
/// recently now moves second. With no history `a` takes red.
fn short_history(a: &Player, b: &Player) -> Side {
    match (a.last_side(), b.last_side()) {
        (None, None) => Side::Red,
        (Some(Side::Red), last) if last != Some(Side::Red) => Side::Black,
        (last, Some(Side::Red)) if last != Some(Side::Red) => Side::Red,
        _ => balance(a, b),
    }
}

/// Give the side that reduces imbalance to whoever is more imbalanced.
///
/// Equal non-zero magnitudes go to the lower contestant number. Two perfectly
/// balanced contestants leave `a` on red.
fn balance(a: &Player, b: &Player) -> Side {
    let (ia, ib) = (a.side_imbalance(), b.side_imbalance());

    let a_leads = match ia.abs().cmp(&ib.abs()) {
        Ordering::Greater => true,
        Ordering::Less => false,
        Ordering::Equal if ia == 0 => return Side::Red,
        Ordering::Equal => a.number < b.number,
    };

    let (lead_imbalance, lead_for_a) = if a_leads { (ia, true) } else { (ib, false) };
    let lead_side = if lead_imbalance > 0 {
        Side::Black
    } else {
        Side::Red
    };

    if lead_for_a {
        lead_side
    } else {
        lead_side.opposite()
    }
}
