//! In-memory store fakes shared by the sync engine tests
//!
//! `MemoryRemoteStore` reproduces the server-side semantics the engines rely
//! on, namely `(user_id, puzzle_id)` uniqueness and the completion-precedence
//! guard of the attempt upsert. It also supports failure injection so batch
//! isolation and degraded paths can be exercised.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

use crate::db::{AttemptRepository, PuzzleRepository};
use crate::error::{Error, Result};
use crate::models::{
    AccessTier, AttemptId, LocalAttempt, LocalPuzzle, PuzzleId, PuzzleRevision, RemoteAttempt,
    RemotePuzzle, SyncInvalidation,
};
use crate::remote::RemoteStore;

/// Remote puzzle fixture published on the given date
pub(crate) fn remote_puzzle_on(date: &str) -> RemotePuzzle {
    RemotePuzzle {
        id: PuzzleId::new(),
        game_mode: "gridlock".to_string(),
        puzzle_date: date.parse().unwrap(),
        content: serde_json::json!({"grid": [1, 2, 3]}),
        difficulty: Some("medium".to_string()),
        updated_at: format!("{date}T06:00:00Z").parse().unwrap(),
    }
}

#[derive(Default)]
pub(crate) struct MemoryAttemptRepository {
    rows: Mutex<Vec<LocalAttempt>>,
    invalidations: Mutex<Vec<SyncInvalidation>>,
}

impl MemoryAttemptRepository {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) async fn insert(&self, attempt: LocalAttempt) {
        self.save_attempt(&attempt).await.unwrap();
    }

    pub(crate) async fn unsynced_count(&self) -> usize {
        self.get_unsynced_attempts().await.unwrap().len()
    }

    /// `(puzzle_id, attempts_deleted)` pairs recorded so far
    pub(crate) async fn recorded_invalidations(&self) -> Vec<(PuzzleId, usize)> {
        self.invalidations
            .lock()
            .unwrap()
            .iter()
            .map(|invalidation| {
                (
                    invalidation.puzzle_id,
                    usize::try_from(invalidation.attempts_deleted).unwrap(),
                )
            })
            .collect()
    }
}

#[async_trait]
impl AttemptRepository for MemoryAttemptRepository {
    async fn save_attempt(&self, attempt: &LocalAttempt) -> Result<()> {
        let mut rows = self.rows.lock().unwrap();
        if let Some(existing) = rows.iter_mut().find(|row| row.id == attempt.id) {
            *existing = attempt.clone();
        } else {
            rows.push(attempt.clone());
        }
        Ok(())
    }

    async fn get_attempt(&self, id: &AttemptId) -> Result<Option<LocalAttempt>> {
        let rows = self.rows.lock().unwrap();
        Ok(rows.iter().find(|row| row.id == *id).cloned())
    }

    async fn get_unsynced_attempts(&self) -> Result<Vec<LocalAttempt>> {
        let mut unsynced: Vec<LocalAttempt> = self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|row| !row.synced)
            .cloned()
            .collect();
        unsynced.sort_by_key(|row| row.started_at);
        Ok(unsynced)
    }

    async fn mark_attempt_synced(&self, id: &AttemptId) -> Result<()> {
        let mut rows = self.rows.lock().unwrap();
        match rows.iter_mut().find(|row| row.id == *id) {
            Some(row) => {
                row.synced = true;
                Ok(())
            }
            None => Err(Error::NotFound(id.to_string())),
        }
    }

    async fn delete_attempts_by_puzzle_id(&self, puzzle_id: &PuzzleId) -> Result<usize> {
        let mut rows = self.rows.lock().unwrap();
        let before = rows.len();
        rows.retain(|row| row.puzzle_id != *puzzle_id);
        Ok(before - rows.len())
    }

    async fn record_invalidation(
        &self,
        puzzle_id: &PuzzleId,
        local_updated_at: Option<DateTime<Utc>>,
        remote_updated_at: DateTime<Utc>,
        attempts_deleted: usize,
    ) -> Result<()> {
        let mut invalidations = self.invalidations.lock().unwrap();
        let id = i64::try_from(invalidations.len()).unwrap() + 1;
        invalidations.push(SyncInvalidation {
            id,
            puzzle_id: *puzzle_id,
            local_updated_at,
            remote_updated_at,
            attempts_deleted: i64::try_from(attempts_deleted).unwrap(),
            invalidated_at: Utc::now(),
        });
        Ok(())
    }

    async fn list_invalidations(&self, limit: usize) -> Result<Vec<SyncInvalidation>> {
        let invalidations = self.invalidations.lock().unwrap();
        Ok(invalidations.iter().rev().take(limit).cloned().collect())
    }
}

#[derive(Default)]
pub(crate) struct MemoryPuzzleRepository {
    rows: Mutex<Vec<LocalPuzzle>>,
}

impl MemoryPuzzleRepository {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) async fn insert(&self, puzzle: LocalPuzzle) {
        self.save_puzzle(&puzzle).await.unwrap();
    }
}

#[async_trait]
impl PuzzleRepository for MemoryPuzzleRepository {
    async fn save_puzzle(&self, puzzle: &LocalPuzzle) -> Result<()> {
        let mut rows = self.rows.lock().unwrap();
        if let Some(existing) = rows.iter_mut().find(|row| row.id == puzzle.id) {
            *existing = puzzle.clone();
        } else {
            rows.push(puzzle.clone());
        }
        Ok(())
    }

    async fn get_puzzle(&self, id: &PuzzleId) -> Result<Option<LocalPuzzle>> {
        let rows = self.rows.lock().unwrap();
        Ok(rows.iter().find(|row| row.id == *id).cloned())
    }

    async fn get_all_puzzle_ids(&self) -> Result<Vec<PuzzleId>> {
        let rows = self.rows.lock().unwrap();
        Ok(rows.iter().map(|row| row.id).collect())
    }

    async fn delete_puzzles_by_ids(&self, ids: &[PuzzleId]) -> Result<usize> {
        let doomed: HashSet<PuzzleId> = ids.iter().copied().collect();
        let mut rows = self.rows.lock().unwrap();
        let before = rows.len();
        rows.retain(|row| !doomed.contains(&row.id));
        Ok(before - rows.len())
    }

    async fn get_revisions_in_range(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<PuzzleRevision>> {
        let rows = self.rows.lock().unwrap();
        Ok(rows
            .iter()
            .filter(|row| row.puzzle_date >= start && row.puzzle_date <= end)
            .map(|row| PuzzleRevision {
                id: row.id,
                updated_at: row.updated_at,
            })
            .collect())
    }
}

struct StoredAttempt {
    row: RemoteAttempt,
    last_write_at: DateTime<Utc>,
}

#[derive(Default)]
pub(crate) struct MemoryRemoteStore {
    puzzles: Mutex<Vec<RemotePuzzle>>,
    hidden: Mutex<Vec<RemotePuzzle>>,
    attempts: Mutex<HashMap<(String, PuzzleId), StoredAttempt>>,
    failing_upserts: Mutex<HashSet<AttemptId>>,
    fail_fetches: AtomicBool,
    calls: AtomicUsize,
}

impl MemoryRemoteStore {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Replace the visible catalog
    pub(crate) fn set_puzzles(&self, puzzles: Vec<RemotePuzzle>) {
        *self.puzzles.lock().unwrap() = puzzles;
    }

    /// Replace the set reachable only through the unlock RPC
    pub(crate) fn set_hidden(&self, puzzles: Vec<RemotePuzzle>) {
        *self.hidden.lock().unwrap() = puzzles;
    }

    /// Make upserts for the given attempt id fail
    pub(crate) fn fail_upserts_for(&self, id: AttemptId) {
        self.failing_upserts.lock().unwrap().insert(id);
    }

    /// Make every fetch fail as if the store were unreachable
    pub(crate) fn fail_fetches(&self) {
        self.fail_fetches.store(true, Ordering::SeqCst);
    }

    /// Total calls received across all operations
    pub(crate) fn remote_calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub(crate) fn stored_attempt(&self, user_id: &str, puzzle_id: &PuzzleId) -> Option<RemoteAttempt> {
        let attempts = self.attempts.lock().unwrap();
        attempts
            .get(&(user_id.to_string(), *puzzle_id))
            .map(|stored| stored.row.clone())
    }

    pub(crate) fn attempt_row_count(&self) -> usize {
        self.attempts.lock().unwrap().len()
    }

    fn check_fetches(&self) -> Result<()> {
        if self.fail_fetches.load(Ordering::SeqCst) {
            Err(Error::RemoteUnavailable("connection refused".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl RemoteStore for MemoryRemoteStore {
    async fn fetch_visible_puzzles(&self, _tier: AccessTier) -> Result<Vec<RemotePuzzle>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.check_fetches()?;
        Ok(self.puzzles.lock().unwrap().clone())
    }

    async fn fetch_revisions_in_range(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        _tier: AccessTier,
    ) -> Result<Vec<PuzzleRevision>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.check_fetches()?;
        let puzzles = self.puzzles.lock().unwrap();
        Ok(puzzles
            .iter()
            .filter(|puzzle| puzzle.puzzle_date >= start && puzzle.puzzle_date <= end)
            .map(|puzzle| PuzzleRevision {
                id: puzzle.id,
                updated_at: Some(puzzle.updated_at),
            })
            .collect())
    }

    async fn fetch_puzzles_by_ids(&self, ids: &[PuzzleId]) -> Result<Vec<RemotePuzzle>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.check_fetches()?;
        let wanted: HashSet<PuzzleId> = ids.iter().copied().collect();
        let puzzles = self.puzzles.lock().unwrap();
        let hidden = self.hidden.lock().unwrap();
        Ok(puzzles
            .iter()
            .chain(hidden.iter())
            .filter(|puzzle| wanted.contains(&puzzle.id))
            .cloned()
            .collect())
    }

    async fn fetch_puzzle_by_id(&self, id: &PuzzleId) -> Result<Option<RemotePuzzle>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.check_fetches()?;
        let puzzles = self.puzzles.lock().unwrap();
        let hidden = self.hidden.lock().unwrap();
        Ok(puzzles
            .iter()
            .chain(hidden.iter())
            .find(|puzzle| puzzle.id == *id)
            .cloned())
    }

    async fn upsert_attempt(&self, incoming: &RemoteAttempt) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing_upserts.lock().unwrap().contains(&incoming.id) {
            return Err(Error::RemoteRejected("injected failure".to_string()));
        }

        let mut attempts = self.attempts.lock().unwrap();
        let key = (incoming.user_id.clone(), incoming.puzzle_id);
        match attempts.get_mut(&key) {
            None => {
                attempts.insert(
                    key,
                    StoredAttempt {
                        row: incoming.clone(),
                        last_write_at: Utc::now(),
                    },
                );
            }
            Some(stored) => {
                // Completion precedence: a completed row only takes writes
                // that are themselves completions, but every write bumps the
                // observability timestamp
                stored.last_write_at = Utc::now();
                if !stored.row.completed || incoming.completed {
                    stored.row = incoming.clone();
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn remote_attempt(puzzle_id: PuzzleId, completed: bool, score: Option<i64>) -> RemoteAttempt {
        let mut attempt = LocalAttempt::start(puzzle_id);
        if completed {
            attempt.complete(score.unwrap_or_default(), "");
        }
        let mut row = RemoteAttempt::from_local(&attempt, "user-a");
        row.score = score;
        row
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn upsert_inserts_new_pairs() {
        let store = MemoryRemoteStore::new();
        let puzzle = PuzzleId::new();

        store
            .upsert_attempt(&remote_attempt(puzzle, false, None))
            .await
            .unwrap();

        assert_eq!(store.attempt_row_count(), 1);
        assert!(!store.stored_attempt("user-a", &puzzle).unwrap().completed);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn upsert_promotes_incomplete_to_complete() {
        let store = MemoryRemoteStore::new();
        let puzzle = PuzzleId::new();

        store
            .upsert_attempt(&remote_attempt(puzzle, false, None))
            .await
            .unwrap();
        store
            .upsert_attempt(&remote_attempt(puzzle, true, Some(80)))
            .await
            .unwrap();

        let stored = store.stored_attempt("user-a", &puzzle).unwrap();
        assert!(stored.completed);
        assert_eq!(stored.score, Some(80));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn completed_row_discards_incomplete_writes() {
        let store = MemoryRemoteStore::new();
        let puzzle = PuzzleId::new();

        store
            .upsert_attempt(&remote_attempt(puzzle, true, Some(95)))
            .await
            .unwrap();
        store
            .upsert_attempt(&remote_attempt(puzzle, false, Some(10)))
            .await
            .unwrap();

        let stored = store.stored_attempt("user-a", &puzzle).unwrap();
        assert!(stored.completed);
        assert_eq!(stored.score, Some(95));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn completed_row_accepts_newer_completion() {
        let store = MemoryRemoteStore::new();
        let puzzle = PuzzleId::new();

        store
            .upsert_attempt(&remote_attempt(puzzle, true, Some(60)))
            .await
            .unwrap();
        store
            .upsert_attempt(&remote_attempt(puzzle, true, Some(100)))
            .await
            .unwrap();

        assert_eq!(
            store.stored_attempt("user-a", &puzzle).unwrap().score,
            Some(100)
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn rows_are_keyed_per_user() {
        let store = MemoryRemoteStore::new();
        let puzzle = PuzzleId::new();

        let mut for_b = remote_attempt(puzzle, false, None);
        for_b.user_id = "user-b".to_string();
        store
            .upsert_attempt(&remote_attempt(puzzle, false, None))
            .await
            .unwrap();
        store.upsert_attempt(&for_b).await.unwrap();

        assert_eq!(store.attempt_row_count(), 2);
    }
}
