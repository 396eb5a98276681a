//! Full catalog reconciliation

use std::collections::HashSet;

use chrono::{DateTime, Utc};

use crate::db::PuzzleRepository;
use crate::error::Result;
use crate::models::{AccessTier, LocalPuzzle, PuzzleId, RemotePuzzle};
use crate::remote::RemoteStore;

use super::SyncResult;

/// Caller-owned state for one full sync run
///
/// `last_synced_at` is whatever the caller recorded after its previous run;
/// the pull itself is always the complete visible set, since an incremental
/// delta cannot observe remote deletions.
#[derive(Debug, Clone)]
pub struct PuzzleSyncRequest {
    pub user_id: String,
    pub access_tier: AccessTier,
    pub last_synced_at: Option<DateTime<Utc>>,
}

/// Mirrors the visible remote puzzle set into the local cache
///
/// Fetches the complete set, deletes local puzzles the remote no longer
/// serves, and upserts everything fetched. Deleting orphans and upserting
/// are both idempotent, so their relative order doesn't matter and the whole
/// operation is safely retryable.
pub struct PuzzleSyncEngine<'a, P, R> {
    local: &'a P,
    remote: &'a R,
}

impl<'a, P, R> PuzzleSyncEngine<'a, P, R>
where
    P: PuzzleRepository + Sync,
    R: RemoteStore + Sync,
{
    /// Create an engine over the given stores
    pub const fn new(local: &'a P, remote: &'a R) -> Self {
        Self { local, remote }
    }

    /// Replace the local catalog with the currently visible remote set
    pub async fn sync_puzzles(&self, request: &PuzzleSyncRequest) -> SyncResult {
        tracing::debug!(
            user_id = %request.user_id,
            tier = %request.access_tier,
            last_synced_at = ?request.last_synced_at,
            "Starting full puzzle sync"
        );

        let fetched = match self.remote.fetch_visible_puzzles(request.access_tier).await {
            Ok(fetched) => fetched,
            Err(error) => {
                tracing::warn!("Puzzle fetch failed, nothing applied: {error}");
                return SyncResult::failed(error);
            }
        };

        match self.apply(&fetched).await {
            Ok(()) => SyncResult::ok(fetched.len()),
            Err(error) => {
                tracing::warn!("Puzzle sync failed while applying: {error}");
                SyncResult::failed(error)
            }
        }
    }

    /// Fetch one puzzle past normal visibility and cache it for offline play.
    ///
    /// Backs an explicitly granted unlock; returns the cached row, or `None`
    /// when the remote doesn't know the id.
    pub async fn unlock_puzzle(&self, id: &PuzzleId) -> Result<Option<LocalPuzzle>> {
        let Some(remote) = self.remote.fetch_puzzle_by_id(id).await? else {
            return Ok(None);
        };

        let row = LocalPuzzle::from_remote(&remote, Utc::now())?;
        self.local.save_puzzle(&row).await?;
        tracing::debug!("Unlocked puzzle {id} cached locally");
        Ok(Some(row))
    }

    async fn apply(&self, fetched: &[RemotePuzzle]) -> Result<()> {
        let remote_ids: HashSet<PuzzleId> = fetched.iter().map(|puzzle| puzzle.id).collect();

        let orphans: Vec<PuzzleId> = self
            .local
            .get_all_puzzle_ids()
            .await?
            .into_iter()
            .filter(|id| !remote_ids.contains(id))
            .collect();

        if !orphans.is_empty() {
            let deleted = self.local.delete_puzzles_by_ids(&orphans).await?;
            tracing::info!("Purged {deleted} puzzles no longer visible remotely");
        }

        let synced_at = Utc::now();
        for remote in fetched {
            let row = LocalPuzzle::from_remote(remote, synced_at)?;
            self.local.save_puzzle(&row).await?;
        }

        Ok(())
    }
}
