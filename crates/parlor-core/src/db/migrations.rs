//! Database migrations

use crate::error::Result;
use libsql::Connection;

/// Current schema version
const CURRENT_VERSION: i32 = 2;

/// Run all pending migrations
pub async fn run(conn: &Connection) -> Result<()> {
    let version = get_version(conn).await?;

    if version < 1 {
        migrate_v1(conn).await?;
    }
    if version < 2 {
        migrate_v2(conn).await?;
    }

    Ok(())
}

/// Get the current schema version
async fn get_version(conn: &Connection) -> Result<i32> {
    // Check if schema_version table exists
    let mut rows = conn
        .query(
            "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version')",
            (),
        )
        .await?;

    let exists: bool = if let Some(row) = rows.next().await? {
        row.get::<i32>(0)? != 0
    } else {
        false
    };

    if !exists {
        return Ok(0);
    }

    let mut rows = conn
        .query("SELECT COALESCE(MAX(version), 0) FROM schema_version", ())
        .await?;

    let version: i32 = if let Some(row) = rows.next().await? {
        row.get(0)?
    } else {
        0
    };

    Ok(version)
}

/// Migration to version 1: Initial schema
async fn migrate_v1(conn: &Connection) -> Result<()> {
    // libsql doesn't have execute_batch, so we run each statement separately
    // Using a transaction for atomicity

    conn.execute("BEGIN TRANSACTION", ()).await?;

    let statements = [
        // Schema version tracking
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY
        )",
        // Cached puzzle catalog
        "CREATE TABLE IF NOT EXISTS puzzles (
            id TEXT PRIMARY KEY,
            game_mode TEXT NOT NULL,
            puzzle_date TEXT NOT NULL,
            content TEXT NOT NULL,
            difficulty TEXT,
            updated_at TEXT,
            synced_at TEXT
        )",
        "CREATE INDEX IF NOT EXISTS idx_puzzles_date ON puzzles(puzzle_date)",
        // Attempt rows; synced = 0 until confirmed remotely
        "CREATE TABLE IF NOT EXISTS attempts (
            id TEXT PRIMARY KEY,
            puzzle_id TEXT NOT NULL,
            completed INTEGER NOT NULL DEFAULT 0,
            score INTEGER,
            score_display TEXT,
            metadata TEXT,
            started_at TEXT NOT NULL,
            completed_at TEXT,
            synced INTEGER NOT NULL DEFAULT 0
        )",
        "CREATE INDEX IF NOT EXISTS idx_attempts_synced ON attempts(synced)",
        "CREATE INDEX IF NOT EXISTS idx_attempts_puzzle ON attempts(puzzle_id)",
        // Record migration version
        "INSERT INTO schema_version (version) VALUES (1)",
    ];

    for stmt in statements {
        if let Err(e) = conn.execute(stmt, ()).await {
            conn.execute("ROLLBACK", ()).await.ok();
            return Err(e.into());
        }
    }

    if let Err(e) = conn.execute("COMMIT", ()).await {
        conn.execute("ROLLBACK", ()).await.ok();
        return Err(e.into());
    }

    tracing::info!("Migrated database to version 1");
    Ok(())
}

/// Migration to version 2: content invalidation audit log
async fn migrate_v2(conn: &Connection) -> Result<()> {
    conn.execute("BEGIN TRANSACTION", ()).await?;

    let statements = [
        "CREATE TABLE IF NOT EXISTS sync_invalidations (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            puzzle_id TEXT NOT NULL,
            local_updated_at TEXT,
            remote_updated_at TEXT NOT NULL,
            attempts_deleted INTEGER NOT NULL,
            invalidated_at TEXT NOT NULL
        )",
        "CREATE INDEX IF NOT EXISTS idx_sync_invalidations_puzzle_id ON sync_invalidations(puzzle_id)",
        "CREATE INDEX IF NOT EXISTS idx_sync_invalidations_invalidated_at ON sync_invalidations(invalidated_at DESC)",
        "INSERT INTO schema_version (version) VALUES (2)",
    ];

    for stmt in statements {
        if let Err(e) = conn.execute(stmt, ()).await {
            conn.execute("ROLLBACK", ()).await.ok();
            return Err(e.into());
        }
    }

    if let Err(e) = conn.execute("COMMIT", ()).await {
        conn.execute("ROLLBACK", ()).await.ok();
        return Err(e.into());
    }

    tracing::info!("Migrated database to version {CURRENT_VERSION}");
    Ok(())
}
