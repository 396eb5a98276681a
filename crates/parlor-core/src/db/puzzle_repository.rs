//! Puzzle repository

#![allow(clippy::cast_possible_truncation)] // SQLite reports row counts as u64

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use libsql::{params, Connection};

use crate::error::{Error, Result};
use crate::models::{LocalPuzzle, PuzzleId, PuzzleRevision};

/// Trait for local puzzle catalog storage
#[async_trait]
pub trait PuzzleRepository {
    /// Insert or update a puzzle row by id (idempotent upsert)
    async fn save_puzzle(&self, puzzle: &LocalPuzzle) -> Result<()>;

    /// Fetch a cached puzzle by id
    async fn get_puzzle(&self, id: &PuzzleId) -> Result<Option<LocalPuzzle>>;

    /// Ids of every cached puzzle
    async fn get_all_puzzle_ids(&self) -> Result<Vec<PuzzleId>>;

    /// Delete the given puzzles, returning how many rows were removed
    async fn delete_puzzles_by_ids(&self, ids: &[PuzzleId]) -> Result<usize>;

    /// `(id, updated_at)` pairs for puzzles dated inside the window, inclusive
    async fn get_revisions_in_range(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<PuzzleRevision>>;
}

/// libSQL implementation of `PuzzleRepository`
pub struct LibSqlPuzzleRepository<'a> {
    conn: &'a Connection,
}

impl<'a> LibSqlPuzzleRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }
}

#[async_trait]
impl PuzzleRepository for LibSqlPuzzleRepository<'_> {
    async fn save_puzzle(&self, puzzle: &LocalPuzzle) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO puzzles
                     (id, game_mode, puzzle_date, content, difficulty, updated_at, synced_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                 ON CONFLICT(id) DO UPDATE SET
                     game_mode = excluded.game_mode,
                     puzzle_date = excluded.puzzle_date,
                     content = excluded.content,
                     difficulty = excluded.difficulty,
                     updated_at = excluded.updated_at,
                     synced_at = excluded.synced_at",
                params![
                    puzzle.id.as_str(),
                    puzzle.game_mode.clone(),
                    puzzle.puzzle_date.to_string(),
                    puzzle.content.clone(),
                    puzzle.difficulty.clone(),
                    puzzle.updated_at.map(|at| at.to_rfc3339()),
                    puzzle.synced_at.map(|at| at.to_rfc3339())
                ],
            )
            .await?;

        Ok(())
    }

    async fn get_puzzle(&self, id: &PuzzleId) -> Result<Option<LocalPuzzle>> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, game_mode, puzzle_date, content, difficulty, updated_at, synced_at
                 FROM puzzles WHERE id = ?1",
                params![id.as_str()],
            )
            .await?;

        match rows.next().await? {
            Some(row) => Ok(Some(parse_puzzle(&row)?)),
            None => Ok(None),
        }
    }

    async fn get_all_puzzle_ids(&self) -> Result<Vec<PuzzleId>> {
        let mut rows = self.conn.query("SELECT id FROM puzzles", ()).await?;

        let mut ids = Vec::new();
        while let Some(row) = rows.next().await? {
            let id: String = row.get(0)?;
            ids.push(
                id.parse()
                    .map_err(|_| Error::Database(format!("invalid puzzle id: {id}")))?,
            );
        }

        Ok(ids)
    }

    async fn delete_puzzles_by_ids(&self, ids: &[PuzzleId]) -> Result<usize> {
        let mut deleted: u64 = 0;
        for id in ids {
            deleted += self
                .conn
                .execute("DELETE FROM puzzles WHERE id = ?1", params![id.as_str()])
                .await?;
        }

        Ok(deleted as usize)
    }

    async fn get_revisions_in_range(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<PuzzleRevision>> {
        // ISO dates compare correctly as text
        let mut rows = self
            .conn
            .query(
                "SELECT id, updated_at FROM puzzles
                 WHERE puzzle_date >= ?1 AND puzzle_date <= ?2",
                params![start.to_string(), end.to_string()],
            )
            .await?;

        let mut revisions = Vec::new();
        while let Some(row) = rows.next().await? {
            let id: String = row.get(0)?;
            let updated_at: Option<String> = row.get(1)?;
            revisions.push(PuzzleRevision {
                id: id
                    .parse()
                    .map_err(|_| Error::Database(format!("invalid puzzle id: {id}")))?,
                updated_at: updated_at.as_deref().map(parse_timestamp).transpose()?,
            });
        }

        Ok(revisions)
    }
}

fn parse_puzzle(row: &libsql::Row) -> Result<LocalPuzzle> {
    let id: String = row.get(0)?;
    let puzzle_date: String = row.get(2)?;
    let updated_at: Option<String> = row.get(5)?;
    let synced_at: Option<String> = row.get(6)?;

    Ok(LocalPuzzle {
        id: id
            .parse()
            .map_err(|_| Error::Database(format!("invalid puzzle id: {id}")))?,
        game_mode: row.get(1)?,
        puzzle_date: parse_date(&puzzle_date)?,
        content: row.get(3)?,
        difficulty: row.get::<Option<String>>(4)?,
        updated_at: updated_at.as_deref().map(parse_timestamp).transpose()?,
        synced_at: synced_at.as_deref().map(parse_timestamp).transpose()?,
    })
}

fn parse_date(value: &str) -> Result<NaiveDate> {
    value
        .parse()
        .map_err(|error| Error::Database(format!("invalid puzzle date {value:?}: {error}")))
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|parsed| parsed.with_timezone(&Utc))
        .map_err(|error| Error::Database(format!("invalid timestamp {value:?}: {error}")))
}
