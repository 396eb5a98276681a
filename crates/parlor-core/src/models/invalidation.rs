//! Content invalidation audit model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::PuzzleId;

/// Recorded discard of in-progress attempts after remote content changed
///
/// Written when the staleness probe replaces a puzzle's content underneath
/// existing local attempts. Local observability only; never synced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncInvalidation {
    /// Audit row identifier
    pub id: i64,
    /// Puzzle whose content changed
    pub puzzle_id: PuzzleId,
    /// Revision marker the device held, if any
    pub local_updated_at: Option<DateTime<Utc>>,
    /// Revision marker that superseded it
    pub remote_updated_at: DateTime<Utc>,
    /// Number of local attempts discarded
    pub attempts_deleted: i64,
    /// When the invalidation was applied (local clock)
    pub invalidated_at: DateTime<Utc>,
}
