//! Data models for Parlor

mod attempt;
mod invalidation;
mod puzzle;
mod tier;

pub use attempt::{AttemptId, LocalAttempt, RemoteAttempt};
pub use invalidation::SyncInvalidation;
pub use puzzle::{LocalPuzzle, PuzzleId, PuzzleRevision, RemotePuzzle};
pub use tier::AccessTier;
