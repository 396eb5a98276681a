//! Sync engines reconciling local play state with the remote store
//!
//! Three engines cover the three paths: [`AttemptSyncEngine`] pushes locally
//! recorded attempts upward through the conflict-safe upsert,
//! [`PuzzleSyncEngine`] mirrors the visible remote catalog into the local
//! cache, and [`LightSyncEngine`] runs the cheap staleness probe between
//! full pulls.
//!
//! Engines run as plain async operations on the caller's task and process
//! batch items strictly sequentially, one awaited remote call at a time.
//! They hold no locks; safety under concurrent instances rests entirely on
//! the remote upsert's server-side completion-precedence guard.

mod attempt;
mod light;
mod puzzle;

#[cfg(test)]
pub(crate) mod testing;

pub use attempt::AttemptSyncEngine;
pub use light::{LightSyncEngine, LightSyncPolicy, LightSyncResult};
pub use puzzle::{PuzzleSyncEngine, PuzzleSyncRequest};

use crate::error::Error;

/// Outcome of a sync operation
///
/// Every engine operation collapses into this; errors never propagate past
/// the engine boundary. A partial batch reports `success = false` with a
/// non-zero `synced_count`; that is an expected outcome, not an exception.
#[derive(Debug)]
pub struct SyncResult {
    pub success: bool,
    pub synced_count: usize,
    pub error: Option<Error>,
}

impl SyncResult {
    /// Fully successful operation
    #[must_use]
    pub const fn ok(synced_count: usize) -> Self {
        Self {
            success: true,
            synced_count,
            error: None,
        }
    }

    /// Operation that failed before anything was applied
    #[must_use]
    pub const fn failed(error: Error) -> Self {
        Self {
            success: false,
            synced_count: 0,
            error: Some(error),
        }
    }

    /// Batch where some items succeeded and at least one failed
    #[must_use]
    pub const fn partial(synced_count: usize, error: Error) -> Self {
        Self {
            success: false,
            synced_count,
            error: Some(error),
        }
    }
}
