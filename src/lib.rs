//! # Monrad Arbiter
//!
//! Administration of Swiss/Monrad style competitions: roster, round-by-round
//! pairing with side balance, results, and standings.
//!
//! ## Architecture
//!
//! - **models**: Core data structures (contestants, games, rounds)
//! - **ranking**: Score and tie-break ordering
//! - **pairing**: Monrad pairing engine and side-balance heuristic
//! - **tournament**: The match state machine
//! - **commands**: Commands, sessions and replay
//! - **storage**: Hash-chained command journal
//! - **config**: Configuration loading and validation

pub mod commands;
pub mod config;
pub mod models;
pub mod pairing;
pub mod ranking;
pub mod storage;
pub mod tournament;

pub use models::*;
pub use tournament::{Match, MatchError, Phase, RoundEnd, ScoringRules, Status};
