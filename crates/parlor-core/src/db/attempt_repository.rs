//! Attempt repository

#![allow(clippy::cast_possible_wrap, clippy::cast_possible_truncation)] // SQLite row counts are u64, columns i64

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use libsql::{params, Connection};

use crate::error::{Error, Result};
use crate::models::{AttemptId, LocalAttempt, PuzzleId, SyncInvalidation};

/// Trait for local attempt storage operations
#[async_trait]
pub trait AttemptRepository {
    /// Insert or update an attempt row by id (idempotent upsert)
    async fn save_attempt(&self, attempt: &LocalAttempt) -> Result<()>;

    /// Fetch an attempt by id
    async fn get_attempt(&self, id: &AttemptId) -> Result<Option<LocalAttempt>>;

    /// All attempts not yet confirmed remotely, oldest first
    async fn get_unsynced_attempts(&self) -> Result<Vec<LocalAttempt>>;

    /// Mark an attempt as confirmed remotely
    async fn mark_attempt_synced(&self, id: &AttemptId) -> Result<()>;

    /// Delete every attempt referencing the given puzzle, returning the count
    async fn delete_attempts_by_puzzle_id(&self, puzzle_id: &PuzzleId) -> Result<usize>;

    /// Record that changed content forced local attempts to be discarded
    async fn record_invalidation(
        &self,
        puzzle_id: &PuzzleId,
        local_updated_at: Option<DateTime<Utc>>,
        remote_updated_at: DateTime<Utc>,
        attempts_deleted: usize,
    ) -> Result<()>;

    /// List recent content invalidations, newest first
    async fn list_invalidations(&self, limit: usize) -> Result<Vec<SyncInvalidation>>;
}

/// libSQL implementation of `AttemptRepository`
pub struct LibSqlAttemptRepository<'a> {
    conn: &'a Connection,
}

impl<'a> LibSqlAttemptRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }
}

#[async_trait]
impl AttemptRepository for LibSqlAttemptRepository<'_> {
    async fn save_attempt(&self, attempt: &LocalAttempt) -> Result<()> {
        let metadata = attempt
            .metadata
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        self.conn
            .execute(
                "INSERT INTO attempts
                     (id, puzzle_id, completed, score, score_display, metadata,
                      started_at, completed_at, synced)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                 ON CONFLICT(id) DO UPDATE SET
                     puzzle_id = excluded.puzzle_id,
                     completed = excluded.completed,
                     score = excluded.score,
                     score_display = excluded.score_display,
                     metadata = excluded.metadata,
                     started_at = excluded.started_at,
                     completed_at = excluded.completed_at,
                     synced = excluded.synced",
                params![
                    attempt.id.as_str(),
                    attempt.puzzle_id.as_str(),
                    i32::from(attempt.completed),
                    attempt.score,
                    attempt.score_display.clone(),
                    metadata,
                    attempt.started_at.to_rfc3339(),
                    attempt.completed_at.map(|at| at.to_rfc3339()),
                    i32::from(attempt.synced)
                ],
            )
            .await?;

        Ok(())
    }

    async fn get_attempt(&self, id: &AttemptId) -> Result<Option<LocalAttempt>> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, puzzle_id, completed, score, score_display, metadata,
                        started_at, completed_at, synced
                 FROM attempts WHERE id = ?1",
                params![id.as_str()],
            )
            .await?;

        match rows.next().await? {
            Some(row) => Ok(Some(parse_attempt(&row)?)),
            None => Ok(None),
        }
    }

    async fn get_unsynced_attempts(&self) -> Result<Vec<LocalAttempt>> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, puzzle_id, completed, score, score_display, metadata,
                        started_at, completed_at, synced
                 FROM attempts
                 WHERE synced = 0
                 ORDER BY started_at ASC",
                (),
            )
            .await?;

        let mut attempts = Vec::new();
        while let Some(row) = rows.next().await? {
            attempts.push(parse_attempt(&row)?);
        }

        Ok(attempts)
    }

    async fn mark_attempt_synced(&self, id: &AttemptId) -> Result<()> {
        let rows = self
            .conn
            .execute(
                "UPDATE attempts SET synced = 1 WHERE id = ?1",
                params![id.as_str()],
            )
            .await?;

        if rows == 0 {
            return Err(Error::NotFound(id.to_string()));
        }

        Ok(())
    }

    async fn delete_attempts_by_puzzle_id(&self, puzzle_id: &PuzzleId) -> Result<usize> {
        let deleted = self
            .conn
            .execute(
                "DELETE FROM attempts WHERE puzzle_id = ?1",
                params![puzzle_id.as_str()],
            )
            .await?;

        Ok(deleted as usize)
    }

    async fn record_invalidation(
        &self,
        puzzle_id: &PuzzleId,
        local_updated_at: Option<DateTime<Utc>>,
        remote_updated_at: DateTime<Utc>,
        attempts_deleted: usize,
    ) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO sync_invalidations
                     (puzzle_id, local_updated_at, remote_updated_at,
                      attempts_deleted, invalidated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    puzzle_id.as_str(),
                    local_updated_at.map(|at| at.to_rfc3339()),
                    remote_updated_at.to_rfc3339(),
                    attempts_deleted as i64,
                    Utc::now().to_rfc3339()
                ],
            )
            .await?;

        Ok(())
    }

    async fn list_invalidations(&self, limit: usize) -> Result<Vec<SyncInvalidation>> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, puzzle_id, local_updated_at, remote_updated_at,
                        attempts_deleted, invalidated_at
                 FROM sync_invalidations
                 ORDER BY invalidated_at DESC
                 LIMIT ?1",
                params![limit as i64],
            )
            .await?;

        let mut invalidations = Vec::new();
        while let Some(row) = rows.next().await? {
            invalidations.push(parse_invalidation(&row)?);
        }

        Ok(invalidations)
    }
}

fn parse_attempt(row: &libsql::Row) -> Result<LocalAttempt> {
    let id: String = row.get(0)?;
    let puzzle_id: String = row.get(1)?;
    let metadata: Option<String> = row.get(5)?;
    let started_at: String = row.get(6)?;
    let completed_at: Option<String> = row.get(7)?;

    Ok(LocalAttempt {
        id: id
            .parse()
            .map_err(|_| Error::Database(format!("invalid attempt id: {id}")))?,
        puzzle_id: puzzle_id
            .parse()
            .map_err(|_| Error::Database(format!("invalid puzzle id: {puzzle_id}")))?,
        completed: row.get::<i32>(2)? != 0,
        score: row.get::<Option<i64>>(3)?,
        score_display: row.get::<Option<String>>(4)?,
        metadata: metadata.as_deref().map(serde_json::from_str).transpose()?,
        started_at: parse_timestamp(&started_at)?,
        completed_at: completed_at.as_deref().map(parse_timestamp).transpose()?,
        synced: row.get::<i32>(8)? != 0,
    })
}

fn parse_invalidation(row: &libsql::Row) -> Result<SyncInvalidation> {
    let puzzle_id: String = row.get(1)?;
    let local_updated_at: Option<String> = row.get(2)?;
    let remote_updated_at: String = row.get(3)?;
    let invalidated_at: String = row.get(5)?;

    Ok(SyncInvalidation {
        id: row.get(0)?,
        puzzle_id: puzzle_id
            .parse()
            .map_err(|_| Error::Database(format!("invalid puzzle id: {puzzle_id}")))?,
        local_updated_at: local_updated_at
            .as_deref()
            .map(parse_timestamp)
            .transpose()?,
        remote_updated_at: parse_timestamp(&remote_updated_at)?,
        attempts_deleted: row.get(4)?,
        invalidated_at: parse_timestamp(&invalidated_at)?,
    })
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|parsed| parsed.with_timezone(&Utc))
        .map_err(|error| Error::Database(format!("invalid timestamp {value:?}: {error}")))
}
