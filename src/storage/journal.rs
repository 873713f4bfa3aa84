//! Hash-chained JSON Lines journal.
//!
//! Each line holds one entry with its sequence number and a SHA-256 digest
//! over the previous digest and the entry's canonical JSON. A file whose
//! chain does not verify is rejected as a whole; no line is ever skipped.

use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use super::StorageError;
use crate::commands::Command;

/// The journal a match is persisted in.
pub type CommandJournal = Journal<Command>;

/// One line of the journal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalEntry<T> {
    pub seq: u64,

    /// Wall-clock time of the write; not covered by the digest
    pub recorded_at: DateTime<Utc>,

    pub command: T,

    pub digest: String,
}

/// Digest of an empty chain.
pub fn genesis_digest() -> String {
    hex::encode(Sha256::digest(b""))
}

/// Chain `payload` onto `previous`.
fn chain_digest<T: Serialize>(previous: &str, payload: &T) -> Result<String, StorageError> {
    // Going through Value sorts object keys
    let canonical = serde_json::to_string(&serde_json::to_value(payload)?)?;

    let mut hasher = Sha256::new();
    hasher.update(previous.as_bytes());
    hasher.update(b"|");
    hasher.update(canonical.as_bytes());
    Ok(hex::encode(hasher.finalize()))
}

/// Append-only journal of `T` entries.
#[derive(Debug)]
pub struct Journal<T> {
    path: PathBuf,
    head: String,
    len: u64,
    _marker: PhantomData<T>,
}

impl<T: Serialize + DeserializeOwned> Journal<T> {
    /// Open the journal at `path`, verifying the whole chain.
    ///
    /// A missing file is an empty journal.
    pub fn open(path: impl Into<PathBuf>) -> Result<(Self, Vec<T>), StorageError> {
        let path = path.into();
        let mut journal = Self {
            path,
            head: genesis_digest(),
            len: 0,
            _marker: PhantomData,
        };
        if !journal.path.exists() {
            debug!("No journal at {:?}, starting empty", journal.path);
            return Ok((journal, Vec::new()));
        }

        let reader = BufReader::new(File::open(&journal.path)?);
        let mut entries = Vec::new();

        for (index, line) in reader.lines().enumerate() {
            let line_num = index + 1;
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }

            let entry: JournalEntry<T> = serde_json::from_str(&line)
                .map_err(|e| journal.corrupt(line_num, format!("unparsable entry: {}", e)))?;

            if entry.seq != journal.len + 1 {
                return Err(journal.corrupt(
                    line_num,
                    format!("expected sequence {}, found {}", journal.len + 1, entry.seq),
                ));
            }
            let expected = chain_digest(&journal.head, &entry.command)?;
            if entry.digest != expected {
                return Err(journal.corrupt(line_num, "digest mismatch".to_string()));
            }

            journal.head = entry.digest;
            journal.len = entry.seq;
            entries.push(entry.command);
        }

        debug!("Verified {} entries in {:?}", entries.len(), journal.path);
        Ok((journal, entries))
    }

    /// Like `open`, but a missing file is an error.
    pub fn open_existing(path: impl Into<PathBuf>) -> Result<(Self, Vec<T>), StorageError> {
        let path = path.into();
        if !path.exists() {
            return Err(StorageError::PathNotFound(path));
        }
        Self::open(path)
    }

    /// Replace any file at `path` with a fresh chain of `entries`.
    pub fn rewrite(path: impl Into<PathBuf>, entries: &[T]) -> Result<Self, StorageError> {
        let mut journal = Self {
            path: path.into(),
            head: genesis_digest(),
            len: 0,
            _marker: PhantomData,
        };
        journal.ensure_dir()?;

        let mut writer = BufWriter::new(File::create(&journal.path)?);
        for entry in entries {
            let line = journal.next_line(entry)?;
            writeln!(writer, "{}", line)?;
        }
        writer.flush()?;

        info!("Wrote {} entries to {:?}", journal.len, journal.path);
        Ok(journal)
    }

    /// Extend the chain with one entry.
    pub fn append(&mut self, entry: &T) -> Result<(), StorageError> {
        self.ensure_dir()?;

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        // Only advance the head once the line is on disk
        let previous = (self.head.clone(), self.len);
        let line = self.next_line(entry)?;
        let mut writer = BufWriter::new(file);
        let written = writeln!(writer, "{}", line).and_then(|_| writer.flush());
        if let Err(e) = written {
            (self.head, self.len) = previous;
            return Err(e.into());
        }

        debug!("Appended entry {} to {:?}", self.len, self.path);
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Digest of the last entry, or the genesis digest.
    pub fn head(&self) -> &str {
        &self.head
    }

    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn next_line(&mut self, command: &T) -> Result<String, StorageError> {
        let digest = chain_digest(&self.head, command)?;
        let entry = JournalEntry {
            seq: self.len + 1,
            recorded_at: Utc::now(),
            command,
            digest,
        };
        let line = serde_json::to_string(&entry)?;
        self.head = entry.digest;
        self.len = entry.seq;
        Ok(line)
    }

    fn ensure_dir(&self) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        Ok(())
    }

    fn corrupt(&self, line: usize, reason: String) -> StorageError {
        warn!("Rejecting journal {:?} at line {}: {}", self.path, line, reason);
        StorageError::Corrupt { line, reason }
    }
}
