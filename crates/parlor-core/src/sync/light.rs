//! Staleness probe path
//!
//! Compares cheap `(id, updated_at)` pairs for a bounded date window before
//! fetching any full content, so foreground transitions cost bandwidth
//! proportional to what actually changed, not to catalog size. The probe is
//! best-effort: any failure degrades to a zero result and never surfaces an
//! error to the caller.

use std::collections::HashMap;

use chrono::{DateTime, Days, NaiveDate, Utc};

use crate::db::{AttemptRepository, PuzzleRepository};
use crate::error::Result;
use crate::models::{AccessTier, LocalPuzzle, PuzzleId};
use crate::remote::RemoteStore;

/// Per-tier date-window policy for the staleness probe
///
/// Window widths are product policy, injected rather than hard-coded. The
/// defaults keep the free probe to the last week of dailies while premium
/// covers the full archive month; the one-day lookahead absorbs timezone
/// skew around the daily publish boundary.
#[derive(Debug, Clone, Copy)]
pub struct LightSyncPolicy {
    pub free_lookback_days: u32,
    pub premium_lookback_days: u32,
    pub lookahead_days: u32,
}

impl Default for LightSyncPolicy {
    fn default() -> Self {
        Self {
            free_lookback_days: 7,
            premium_lookback_days: 30,
            lookahead_days: 1,
        }
    }
}

impl LightSyncPolicy {
    /// Probe window anchored on `today`, wider for higher tiers
    #[must_use]
    pub fn window(&self, today: NaiveDate, tier: AccessTier) -> (NaiveDate, NaiveDate) {
        let lookback = match tier {
            AccessTier::Free => self.free_lookback_days,
            AccessTier::Premium => self.premium_lookback_days,
        };
        let start = today
            .checked_sub_days(Days::new(u64::from(lookback)))
            .unwrap_or(NaiveDate::MIN);
        let end = today
            .checked_add_days(Days::new(u64::from(self.lookahead_days)))
            .unwrap_or(NaiveDate::MAX);
        (start, end)
    }
}

/// Outcome of a staleness probe
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LightSyncResult {
    /// How many cached puzzles were compared against remote markers
    pub checked_count: usize,
    /// How many had their content refreshed
    pub updated_count: usize,
}

/// Refreshes cached puzzles whose content changed remotely
///
/// When content changes underneath a cached puzzle, any local attempts
/// referencing it are discarded rather than silently misrepresenting
/// progress against content the user never saw; each discard is recorded in
/// the invalidation log.
pub struct LightSyncEngine<'a, P, A, R> {
    puzzles: &'a P,
    attempts: &'a A,
    remote: &'a R,
    policy: LightSyncPolicy,
}

impl<'a, P, A, R> LightSyncEngine<'a, P, A, R>
where
    P: PuzzleRepository + Sync,
    A: AttemptRepository + Sync,
    R: RemoteStore + Sync,
{
    /// Create an engine over the given stores with the default window policy
    pub fn new(puzzles: &'a P, attempts: &'a A, remote: &'a R) -> Self {
        Self {
            puzzles,
            attempts,
            remote,
            policy: LightSyncPolicy::default(),
        }
    }

    /// Override the date-window policy
    #[must_use]
    pub const fn with_policy(mut self, policy: LightSyncPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Probe for changed content in the window anchored on today
    pub async fn refresh_stale(&self, tier: AccessTier) -> LightSyncResult {
        self.refresh_stale_at(Utc::now().date_naive(), tier).await
    }

    /// Probe for changed content in the window anchored on an explicit date
    pub async fn refresh_stale_at(&self, today: NaiveDate, tier: AccessTier) -> LightSyncResult {
        let (start, end) = self.policy.window(today, tier);

        let local = match self.puzzles.get_revisions_in_range(start, end).await {
            Ok(revisions) => revisions,
            Err(error) => {
                tracing::debug!("Light sync skipped, local probe failed: {error}");
                return LightSyncResult::default();
            }
        };
        if local.is_empty() {
            return LightSyncResult::default();
        }

        let remote = match self.remote.fetch_revisions_in_range(start, end, tier).await {
            Ok(revisions) => revisions,
            Err(error) => {
                tracing::debug!("Light sync degraded to offline: {error}");
                return LightSyncResult::default();
            }
        };

        let local_by_id: HashMap<PuzzleId, Option<DateTime<Utc>>> = local
            .iter()
            .map(|revision| (revision.id, revision.updated_at))
            .collect();

        // Remote ids we don't hold locally belong to the full pull, not here
        let mut stale = Vec::new();
        for revision in &remote {
            let Some(local_updated_at) = local_by_id.get(&revision.id) else {
                continue;
            };
            let Some(remote_updated_at) = revision.updated_at else {
                continue;
            };
            if is_stale(*local_updated_at, remote_updated_at) {
                stale.push((revision.id, *local_updated_at, remote_updated_at));
            }
        }

        let checked_count = local.len();
        if stale.is_empty() {
            return LightSyncResult {
                checked_count,
                updated_count: 0,
            };
        }

        tracing::info!("{} cached puzzles changed remotely", stale.len());

        match self.refresh(&stale).await {
            Ok(updated_count) => LightSyncResult {
                checked_count,
                updated_count,
            },
            Err(error) => {
                tracing::debug!("Light sync refresh failed: {error}");
                LightSyncResult {
                    checked_count,
                    updated_count: 0,
                }
            }
        }
    }

    async fn refresh(
        &self,
        stale: &[(PuzzleId, Option<DateTime<Utc>>, DateTime<Utc>)],
    ) -> Result<usize> {
        // Progress tied to superseded content is discarded before the new
        // content lands, so a half-played stale attempt can't be scored
        // against a board the user never saw
        for (id, local_updated_at, remote_updated_at) in stale {
            let deleted = self.attempts.delete_attempts_by_puzzle_id(id).await?;
            if deleted > 0 {
                tracing::info!("Discarded {deleted} attempts for changed puzzle {id}");
            }
            self.attempts
                .record_invalidation(id, *local_updated_at, *remote_updated_at, deleted)
                .await?;
        }

        let ids: Vec<PuzzleId> = stale.iter().map(|(id, _, _)| *id).collect();
        let fetched = self.remote.fetch_puzzles_by_ids(&ids).await?;

        let synced_at = Utc::now();
        let mut updated_count = 0;
        for remote in &fetched {
            let row = LocalPuzzle::from_remote(remote, synced_at)?;
            self.puzzles.save_puzzle(&row).await?;
            updated_count += 1;
        }

        Ok(updated_count)
    }
}

/// A cached row is stale when it has no revision marker or its marker is
/// strictly older than the remote's
fn is_stale(local: Option<DateTime<Utc>>, remote: DateTime<Utc>) -> bool {
    local.map_or(true, |local| local < remote)
}
