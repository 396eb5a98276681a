//! Attempt models
//!
//! A [`LocalAttempt`] is created the moment a user starts a puzzle and is
//! mutated in place as play progresses; any mutation makes the row unsynced
//! again. Its remote counterpart is keyed by `(user_id, puzzle_id)` on the
//! server, which collapses however many local attempt ids a user's devices
//! generated for the same puzzle into a single row.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::models::PuzzleId;

/// A unique identifier for a locally created attempt, using UUID v7 (time-sortable)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AttemptId(Uuid);

impl AttemptId {
    /// Create a new unique attempt ID using UUID v7
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

impl Default for AttemptId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for AttemptId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for AttemptId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// A puzzle attempt as recorded on this device
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalAttempt {
    /// Client-generated stable identifier
    pub id: AttemptId,
    /// Puzzle this attempt belongs to
    pub puzzle_id: PuzzleId,
    /// Whether the attempt reached completion
    #[serde(default)]
    pub completed: bool,
    /// Final numeric score, once known
    pub score: Option<i64>,
    /// Display form of the score (e.g. "3/5", "02:31")
    pub score_display: Option<String>,
    /// Opaque game payload; interpreted only by game logic, never by sync
    pub metadata: Option<serde_json::Value>,
    /// When the user started the attempt
    pub started_at: DateTime<Utc>,
    /// When the attempt was completed, if it was
    pub completed_at: Option<DateTime<Utc>>,
    /// False until the row is confirmed remotely
    #[serde(default)]
    pub synced: bool,
}

impl LocalAttempt {
    /// Create a new in-progress attempt for the given puzzle, started now
    #[must_use]
    pub fn start(puzzle_id: PuzzleId) -> Self {
        Self {
            id: AttemptId::new(),
            puzzle_id,
            completed: false,
            score: None,
            score_display: None,
            metadata: None,
            started_at: Utc::now(),
            completed_at: None,
            synced: false,
        }
    }

    /// Record in-progress game state
    pub fn record_progress(&mut self, metadata: serde_json::Value) {
        self.metadata = Some(metadata);
        self.synced = false;
    }

    /// Mark the attempt completed with its final score
    pub fn complete(&mut self, score: i64, score_display: impl Into<String>) {
        self.completed = true;
        self.score = Some(score);
        self.score_display = Some(score_display.into());
        self.completed_at = Some(Utc::now());
        self.synced = false;
    }
}

/// The server-side attempt row pushed through the conflict-safe upsert
///
/// Uniquely keyed by `(user_id, puzzle_id)` on the server. Serializes to the
/// exact argument names of the `upsert_attempt` procedure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteAttempt {
    pub id: AttemptId,
    pub puzzle_id: PuzzleId,
    pub user_id: String,
    pub completed: bool,
    pub score: Option<i64>,
    pub score_display: Option<String>,
    pub metadata: Option<serde_json::Value>,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl RemoteAttempt {
    /// Build the remote row for a local attempt under the syncing identity.
    ///
    /// Pure field mapping; `user_id` always comes from the caller, never from
    /// the attempt row itself. Booleans and JSON pass through uninterpreted.
    #[must_use]
    pub fn from_local(attempt: &LocalAttempt, user_id: impl Into<String>) -> Self {
        Self {
            id: attempt.id,
            puzzle_id: attempt.puzzle_id,
            user_id: user_id.into(),
            completed: attempt.completed,
            score: attempt.score,
            score_display: attempt.score_display.clone(),
            metadata: attempt.metadata.clone(),
            started_at: attempt.started_at,
            completed_at: attempt.completed_at,
        }
    }
}
