//! Local run store: experiments, runs, params, metrics and text artifacts in
//! one SQLite file.

mod runs;
mod schema;

use std::path::Path;

use anyhow::{Context, Result};
use rusqlite::Connection;

use crate::util::ensure_directory;

pub use self::runs::{RunRecord, RunStatus, StoreCounts};
pub use self::schema::STORE_SCHEMA_VERSION;

pub const DB_FILE_NAME: &str = "runs.sqlite";

pub struct RunStore {
    connection: Connection,
}

impl RunStore {
    pub fn open(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                ensure_directory(parent)?;
            }
        }

        let connection = Connection::open(db_path)
            .with_context(|| format!("failed to open {}", db_path.display()))?;
        Self::from_connection(connection)
    }

    pub fn open_in_memory() -> Result<Self> {
        let connection =
            Connection::open_in_memory().context("failed to open in-memory run store")?;
        Self::from_connection(connection)
    }

    fn from_connection(connection: Connection) -> Result<Self> {
        schema::configure_connection(&connection)?;
        schema::ensure_schema(&connection)?;
        Ok(Self { connection })
    }
}
