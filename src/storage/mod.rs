//! Filesystem persistence.
//!
//! A match is stored as the journal of commands that produced it. Replaying
//! the journal from an empty match rebuilds the exact same state.

pub mod journal;

use std::path::PathBuf;
use thiserror::Error;

pub use journal::{CommandJournal, Journal, JournalEntry};

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Path not found: {0}")]
    PathNotFound(PathBuf),

    #[error("Corrupt journal at line {line}: {reason}")]
    Corrupt { line: usize, reason: String },
}
