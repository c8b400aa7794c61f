use anyhow::{Context, Result};
use rusqlite::{Connection, params};

use crate::util::now_utc_string;

pub const STORE_SCHEMA_VERSION: &str = "0.1.0";

pub(super) fn configure_connection(connection: &Connection) -> Result<()> {
    connection
        .pragma_update(None, "journal_mode", "WAL")
        .context("failed to set journal_mode=WAL")?;
    connection
        .pragma_update(None, "synchronous", "NORMAL")
        .context("failed to set synchronous=NORMAL")?;
    connection
        .pragma_update(None, "foreign_keys", "ON")
        .context("failed to enable foreign_keys")?;
    Ok(())
}

pub(super) fn ensure_schema(connection: &Connection) -> Result<()> {
    connection
        .execute_batch(
            "
            CREATE TABLE IF NOT EXISTS metadata (
              key TEXT PRIMARY KEY,
              value TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS experiments (
              experiment_id INTEGER PRIMARY KEY AUTOINCREMENT,
              name TEXT NOT NULL UNIQUE,
              created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS runs (
              run_id TEXT PRIMARY KEY,
              experiment_id INTEGER NOT NULL,
              run_name TEXT NOT NULL,
              parent_run_id TEXT,
              status TEXT NOT NULL,
              started_at TEXT NOT NULL,
              ended_at TEXT,
              FOREIGN KEY(experiment_id) REFERENCES experiments(experiment_id),
              FOREIGN KEY(parent_run_id) REFERENCES runs(run_id)
            );

            CREATE INDEX IF NOT EXISTS idx_runs_experiment ON runs(experiment_id, started_at);
            CREATE INDEX IF NOT EXISTS idx_runs_parent ON runs(parent_run_id);

            CREATE TABLE IF NOT EXISTS params (
              run_id TEXT NOT NULL,
              key TEXT NOT NULL,
              value TEXT NOT NULL,
              PRIMARY KEY(run_id, key),
              FOREIGN KEY(run_id) REFERENCES runs(run_id)
            );

            CREATE TABLE IF NOT EXISTS metrics (
              run_id TEXT NOT NULL,
              key TEXT NOT NULL,
              value REAL NOT NULL,
              logged_at TEXT NOT NULL,
              PRIMARY KEY(run_id, key),
              FOREIGN KEY(run_id) REFERENCES runs(run_id)
            );

            CREATE TABLE IF NOT EXISTS artifacts (
              run_id TEXT NOT NULL,
              path TEXT NOT NULL,
              content TEXT NOT NULL,
              sha256 TEXT NOT NULL,
              created_at TEXT NOT NULL,
              PRIMARY KEY(run_id, path),
              FOREIGN KEY(run_id) REFERENCES runs(run_id)
            );
            ",
        )
        .context("failed to create run store schema")?;

    connection.execute(
        "
        INSERT INTO metadata(key, value) VALUES('schema_version', ?1)
        ON CONFLICT(key) DO UPDATE SET value=excluded.value
        ",
        params![STORE_SCHEMA_VERSION],
    )?;
    connection.execute(
        "INSERT OR IGNORE INTO metadata(key, value) VALUES('created_at', ?1)",
        params![now_utc_string()],
    )?;

    Ok(())
}
