//! Core data models for the tournament engine.

mod game;
mod player;
mod round;

pub use game::*;
pub use player::*;
pub use round::*;
