//! Remote store contract and HTTP client
//!
//! The remote store is the single authoritative copy of the puzzle catalog
//! and of attempt rows. The engines consume it through the [`RemoteStore`]
//! trait: filtered queries over the puzzles relation plus two narrow RPCs.

mod http;

pub use http::{RemoteConfig, RestRemoteStore};

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::error::Result;
use crate::models::{AccessTier, PuzzleId, PuzzleRevision, RemoteAttempt, RemotePuzzle};

/// Trait for the authoritative remote store
#[async_trait]
pub trait RemoteStore {
    /// All puzzles currently visible under the access policy for the tier
    async fn fetch_visible_puzzles(&self, tier: AccessTier) -> Result<Vec<RemotePuzzle>>;

    /// `(id, updated_at)` pairs for puzzles dated inside the window, inclusive
    async fn fetch_revisions_in_range(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        tier: AccessTier,
    ) -> Result<Vec<PuzzleRevision>>;

    /// Full content for the given puzzle ids
    async fn fetch_puzzles_by_ids(&self, ids: &[PuzzleId]) -> Result<Vec<RemotePuzzle>>;

    /// Fetch one puzzle regardless of normal visibility.
    ///
    /// Backs the explicit unlock action; the server side authorizes the
    /// grant, this call just retrieves the content.
    async fn fetch_puzzle_by_id(&self, id: &PuzzleId) -> Result<Option<RemotePuzzle>>;

    /// Conflict-safe attempt upsert.
    ///
    /// The server enforces `(user_id, puzzle_id)` uniqueness and completion
    /// precedence in a single atomic conditional write: a new pair always
    /// inserts; an existing row's completion-sensitive fields (`completed`,
    /// `score`, `score_display`, `metadata`, `completed_at`) are overwritten
    /// only when the stored row is not yet completed or the incoming write is
    /// itself a completion. A completed row silently discards an incoming
    /// incomplete write for those fields but still bumps its last-write
    /// timestamp. Clients must never try to reproduce this with a
    /// get-then-put; only the server-side guard is race-free.
    async fn upsert_attempt(&self, attempt: &RemoteAttempt) -> Result<()>;
}
