//! parlor-core - Sync core for Parlor
//!
//! This crate contains the shared models, the local database layer, the
//! remote store client, and the three sync engines that reconcile locally
//! cached puzzle content and attempt progress with the authoritative remote
//! store once connectivity returns. All Parlor clients (desktop, mobile)
//! build their sync flows on top of it.

pub mod db;
pub mod error;
pub mod models;
pub mod remote;
pub mod sync;

pub use error::{Error, Result};
pub use models::{
    AccessTier, AttemptId, LocalAttempt, LocalPuzzle, PuzzleId, RemoteAttempt, RemotePuzzle,
};
pub use sync::{
    AttemptSyncEngine, LightSyncEngine, LightSyncPolicy, LightSyncResult, PuzzleSyncEngine,
    PuzzleSyncRequest, SyncResult,
};
