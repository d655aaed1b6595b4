//! Database migrations
//!
//! Every migration is additive: collections and indices are only ever
//! created, so records in untouched collections survive an upgrade.

use rusqlite::{Connection, OptionalExtension};

use crate::error::{Error, Result};

/// Current schema version
pub const CURRENT_VERSION: i32 = 2;

/// Run all pending migrations
pub fn run(conn: &mut Connection) -> Result<()> {
    let version = get_version(conn)?;

    if version > CURRENT_VERSION {
        return Err(Error::StorageUnavailable(format!(
            "database schema version {version} is newer than supported version {CURRENT_VERSION}"
        )));
    }

    if version < 1 {
        apply(conn, 1, MIGRATION_V1)?;
    }
    if version < 2 {
        apply(conn, 2, MIGRATION_V2)?;
    }

    Ok(())
}

/// Get the current schema version
pub fn get_version(conn: &Connection) -> Result<i32> {
    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version')",
        [],
        |row| row.get(0),
    )?;

    if !exists {
        return Ok(0);
    }

    let version = conn
        .query_row("SELECT MAX(version) FROM schema_version", [], |row| {
            row.get::<_, Option<i32>>(0)
        })
        .optional()?
        .flatten()
        .unwrap_or(0);

    Ok(version)
}

fn apply(conn: &mut Connection, version: i32, statements: &str) -> Result<()> {
    let tx = conn.transaction()?;
    tx.execute_batch(statements)?;
    tx.execute(
        "INSERT INTO schema_version (version) VALUES (?1)",
        [version],
    )?;
    tx.commit()?;

    tracing::info!("Migrated database to version {version}");
    Ok(())
}

/// Version 1: the five core collections
const MIGRATION_V1: &str = "
    CREATE TABLE IF NOT EXISTS schema_version (
        version INTEGER PRIMARY KEY
    );

    CREATE TABLE IF NOT EXISTS stories (
        key TEXT PRIMARY KEY,
        data TEXT NOT NULL,
        created_at INTEGER,
        author_id TEXT
    );
    CREATE INDEX IF NOT EXISTS idx_stories_created_at ON stories(created_at);
    CREATE INDEX IF NOT EXISTS idx_stories_author_id ON stories(author_id);

    CREATE TABLE IF NOT EXISTS users (
        key TEXT PRIMARY KEY,
        data TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS offline_actions (
        key INTEGER PRIMARY KEY AUTOINCREMENT,
        data TEXT NOT NULL,
        timestamp INTEGER,
        synced INTEGER
    );
    CREATE INDEX IF NOT EXISTS idx_offline_actions_timestamp ON offline_actions(timestamp);
    CREATE INDEX IF NOT EXISTS idx_offline_actions_synced ON offline_actions(synced);

    CREATE TABLE IF NOT EXISTS subscriptions (
        key TEXT PRIMARY KEY,
        data TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS settings (
        key TEXT PRIMARY KEY,
        data TEXT NOT NULL
    );
";

/// Version 2: mirrored API responses for the cache-aside fetcher
const MIGRATION_V2: &str = "
    CREATE TABLE IF NOT EXISTS cached_responses (
        key TEXT PRIMARY KEY,
        data TEXT NOT NULL,
        cached_at INTEGER
    );
    CREATE INDEX IF NOT EXISTS idx_cached_responses_cached_at ON cached_responses(cached_at);
";
