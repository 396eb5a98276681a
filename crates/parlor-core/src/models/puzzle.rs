//! Puzzle models

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::Result;

/// A unique identifier for a puzzle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PuzzleId(Uuid);

impl PuzzleId {
    /// Create a new unique puzzle ID using UUID v7
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Get the string representation of this ID
    #[must_use]
    pub fn as_str(&self) -> String {
        self.0.to_string()
    }
}

impl Default for PuzzleId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PuzzleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for PuzzleId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// A puzzle as served by the remote catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemotePuzzle {
    pub id: PuzzleId,
    /// Which game the content belongs to (e.g. "gridlock", "cipher")
    pub game_mode: String,
    /// The calendar day the puzzle is published for
    pub puzzle_date: NaiveDate,
    /// Game content; opaque to the sync engine
    pub content: serde_json::Value,
    pub difficulty: Option<String>,
    /// Server revision marker; the basis for staleness comparisons
    pub updated_at: DateTime<Utc>,
}

/// A puzzle cached on this device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalPuzzle {
    pub id: PuzzleId,
    pub game_mode: String,
    pub puzzle_date: NaiveDate,
    /// Content JSON serialized to a string for local storage
    pub content: String,
    pub difficulty: Option<String>,
    /// Server revision marker, preserved verbatim from the last pull.
    /// Absent for rows cached before the server carried one.
    pub updated_at: Option<DateTime<Utc>>,
    /// When this device last wrote the row during a sync; local bookkeeping only
    pub synced_at: Option<DateTime<Utc>>,
}

impl LocalPuzzle {
    /// Build the local cache row for a fetched remote puzzle.
    ///
    /// The content JSON is serialized to a string and `updated_at` is carried
    /// over verbatim so later staleness probes compare against exactly what
    /// the server reported.
    pub fn from_remote(remote: &RemotePuzzle, synced_at: DateTime<Utc>) -> Result<Self> {
        Ok(Self {
            id: remote.id,
            game_mode: remote.game_mode.clone(),
            puzzle_date: remote.puzzle_date,
            content: serde_json::to_string(&remote.content)?,
            difficulty: remote.difficulty.clone(),
            updated_at: Some(remote.updated_at),
            synced_at: Some(synced_at),
        })
    }
}

/// An `(id, updated_at)` pair, the unit of the staleness probe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PuzzleRevision {
    pub id: PuzzleId,
    pub updated_at: Option<DateTime<Utc>>,
}
