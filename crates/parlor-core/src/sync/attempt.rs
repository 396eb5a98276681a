//! Attempt push path

use crate::db::AttemptRepository;
use crate::error::{Error, Result};
use crate::models::{LocalAttempt, RemoteAttempt};
use crate::remote::RemoteStore;

use super::SyncResult;

/// Pushes locally created or updated attempts to the remote store
///
/// Each unsynced attempt is sent through the conflict-safe upsert and marked
/// synced on confirmation. Items are pushed one at a time; a failing item is
/// recorded and skipped, never aborting the rest of the batch.
pub struct AttemptSyncEngine<'a, A, R> {
    local: &'a A,
    remote: &'a R,
}

impl<'a, A, R> AttemptSyncEngine<'a, A, R>
where
    A: AttemptRepository + Sync,
    R: RemoteStore + Sync,
{
    /// Create an engine over the given stores
    pub const fn new(local: &'a A, remote: &'a R) -> Self {
        Self { local, remote }
    }

    /// Push every unsynced local attempt under the given identity.
    ///
    /// Refuses to run without a persistent identity: rows pushed under a
    /// throwaway id could never be reconciled with the same user again.
    pub async fn sync_attempts(&self, user_id: Option<&str>) -> SyncResult {
        let Some(user_id) = user_id.map(str::trim).filter(|id| !id.is_empty()) else {
            return SyncResult::failed(Error::NotAuthenticated);
        };

        let attempts = match self.local.get_unsynced_attempts().await {
            Ok(attempts) => attempts,
            Err(error) => return SyncResult::failed(error),
        };

        if attempts.is_empty() {
            return SyncResult::ok(0);
        }

        tracing::debug!("Pushing {} unsynced attempts", attempts.len());

        let mut synced_count = 0;
        let mut first_error: Option<Error> = None;
        for attempt in &attempts {
            match self.push_one(attempt, user_id).await {
                Ok(()) => synced_count += 1,
                Err(error) => {
                    tracing::warn!("Failed to push attempt {}: {error}", attempt.id);
                    first_error.get_or_insert(error);
                }
            }
        }

        match first_error {
            None => {
                tracing::debug!("Pushed {synced_count} attempts");
                SyncResult::ok(synced_count)
            }
            Some(error) => SyncResult::partial(synced_count, error),
        }
    }

    async fn push_one(&self, attempt: &LocalAttempt, user_id: &str) -> Result<()> {
        let remote_row = RemoteAttempt::from_local(attempt, user_id);
        self.remote.upsert_attempt(&remote_row).await?;
        self.local.mark_attempt_synced(&attempt.id).await
    }
}
