use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::{Context, Result, bail};
use chrono::Utc;
use rusqlite::{OptionalExtension, Row, params};
use serde::Serialize;

use super::RunStore;
use crate::util::{now_utc_string, sha256_text};

static RUN_ID_COUNTER: AtomicU64 = AtomicU64::new(0);

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunStatus {
    Running,
    Finished,
    Failed,
}

impl RunStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Running => "RUNNING",
            Self::Finished => "FINISHED",
            Self::Failed => "FAILED",
        }
    }

    fn parse(raw: &str) -> Result<Self> {
        match raw {
            "RUNNING" => Ok(Self::Running),
            "FINISHED" => Ok(Self::Finished),
            "FAILED" => Ok(Self::Failed),
            other => bail!("unknown run status in store: {other}"),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RunRecord {
    pub run_id: String,
    pub experiment_id: i64,
    pub run_name: String,
    pub parent_run_id: Option<String>,
    pub status: RunStatus,
    pub started_at: String,
    pub ended_at: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StoreCounts {
    pub experiments: i64,
    pub runs: i64,
    pub params: i64,
    pub metrics: i64,
    pub artifacts: i64,
}

const RUN_COLUMNS: &str =
    "run_id, experiment_id, run_name, parent_run_id, status, started_at, ended_at";

impl RunStore {
    pub fn get_or_create_experiment(&self, name: &str) -> Result<i64> {
        let name = name.trim();
        if name.is_empty() {
            bail!("experiment name must not be empty");
        }

        self.connection.execute(
            "INSERT OR IGNORE INTO experiments(name, created_at) VALUES(?1, ?2)",
            params![name, now_utc_string()],
        )?;

        self.connection
            .query_row(
                "SELECT experiment_id FROM experiments WHERE name = ?1",
                params![name],
                |row| row.get(0),
            )
            .with_context(|| format!("failed to resolve experiment: {name}"))
    }

    pub fn find_experiment(&self, name: &str) -> Result<Option<i64>> {
        let id = self
            .connection
            .query_row(
                "SELECT experiment_id FROM experiments WHERE name = ?1",
                params![name.trim()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(id)
    }

    pub fn experiment_name(&self, experiment_id: i64) -> Result<Option<String>> {
        let name = self
            .connection
            .query_row(
                "SELECT name FROM experiments WHERE experiment_id = ?1",
                params![experiment_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(name)
    }

    pub fn create_run(
        &self,
        experiment_id: i64,
        run_name: &str,
        parent_run_id: Option<&str>,
    ) -> Result<String> {
        if let Some(parent) = parent_run_id {
            self.require_run(parent)?;
        }

        let started_at = now_utc_string();
        let run_id = next_run_id(experiment_id, run_name);

        self.connection
            .execute(
                "
                INSERT INTO runs(run_id, experiment_id, run_name, parent_run_id, status, started_at)
                VALUES(?1, ?2, ?3, ?4, ?5, ?6)
                ",
                params![
                    run_id,
                    experiment_id,
                    run_name,
                    parent_run_id,
                    RunStatus::Running.as_str(),
                    started_at,
                ],
            )
            .with_context(|| format!("failed to create run {run_name}"))?;

        Ok(run_id)
    }

    pub fn finish_run(&self, run_id: &str, status: RunStatus) -> Result<()> {
        let updated = self.connection.execute(
            "UPDATE runs SET status = ?2, ended_at = ?3 WHERE run_id = ?1",
            params![run_id, status.as_str(), now_utc_string()],
        )?;
        if updated == 0 {
            bail!("unknown run id: {run_id}");
        }
        Ok(())
    }

    pub fn log_param(&self, run_id: &str, key: &str, value: &str) -> Result<()> {
        self.connection
            .execute(
                "
                INSERT INTO params(run_id, key, value) VALUES(?1, ?2, ?3)
                ON CONFLICT(run_id, key) DO UPDATE SET value=excluded.value
                ",
                params![run_id, key, value],
            )
            .with_context(|| format!("failed to log param {key} for run {run_id}"))?;
        Ok(())
    }

    pub fn log_metric(&self, run_id: &str, key: &str, value: f64) -> Result<()> {
        self.connection
            .execute(
                "
                INSERT INTO metrics(run_id, key, value, logged_at) VALUES(?1, ?2, ?3, ?4)
                ON CONFLICT(run_id, key) DO UPDATE SET
                  value=excluded.value,
                  logged_at=excluded.logged_at
                ",
                params![run_id, key, value, now_utc_string()],
            )
            .with_context(|| format!("failed to log metric {key} for run {run_id}"))?;
        Ok(())
    }

    pub fn log_artifact(&self, run_id: &str, path: &str, content: &str) -> Result<()> {
        self.connection
            .execute(
                "
                INSERT INTO artifacts(run_id, path, content, sha256, created_at)
                VALUES(?1, ?2, ?3, ?4, ?5)
                ON CONFLICT(run_id, path) DO UPDATE SET
                  content=excluded.content,
                  sha256=excluded.sha256,
                  created_at=excluded.created_at
                ",
                params![run_id, path, content, sha256_text(content), now_utc_string()],
            )
            .with_context(|| format!("failed to log artifact {path} for run {run_id}"))?;
        Ok(())
    }

    pub fn load_artifact(&self, run_id: &str, path: &str) -> Result<Option<String>> {
        let content = self
            .connection
            .query_row(
                "SELECT content FROM artifacts WHERE run_id = ?1 AND path = ?2",
                params![run_id, path],
                |row| row.get(0),
            )
            .optional()?;
        Ok(content)
    }

    pub fn load_param(&self, run_id: &str, key: &str) -> Result<Option<String>> {
        let value = self
            .connection
            .query_row(
                "SELECT value FROM params WHERE run_id = ?1 AND key = ?2",
                params![run_id, key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    pub fn load_metric(&self, run_id: &str, key: &str) -> Result<Option<f64>> {
        let value = self
            .connection
            .query_row(
                "SELECT value FROM metrics WHERE run_id = ?1 AND key = ?2",
                params![run_id, key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    pub fn load_run(&self, run_id: &str) -> Result<Option<RunRecord>> {
        let raw = self
            .connection
            .query_row(
                &format!("SELECT {RUN_COLUMNS} FROM runs WHERE run_id = ?1"),
                params![run_id],
                read_run_row,
            )
            .optional()?;
        raw.map(RawRunRow::into_record).transpose()
    }

    pub fn require_run(&self, run_id: &str) -> Result<RunRecord> {
        self.load_run(run_id)?
            .with_context(|| format!("unknown run id: {run_id}"))
    }

    /// Runs of one experiment, most recently started first.
    pub fn list_runs(&self, experiment_id: i64, limit: usize) -> Result<Vec<RunRecord>> {
        let mut statement = self.connection.prepare(&format!(
            "
            SELECT {RUN_COLUMNS}
            FROM runs
            WHERE experiment_id = ?1
            ORDER BY started_at DESC, rowid DESC
            LIMIT ?2
            "
        ))?;
        let rows = statement.query_map(params![experiment_id, limit as i64], read_run_row)?;
        collect_runs(rows)
    }

    /// Children of a parent run in the order they were recorded.
    pub fn child_runs(&self, parent_run_id: &str) -> Result<Vec<RunRecord>> {
        let mut statement = self.connection.prepare(&format!(
            "
            SELECT {RUN_COLUMNS}
            FROM runs
            WHERE parent_run_id = ?1
            ORDER BY started_at ASC, rowid ASC
            "
        ))?;
        let rows = statement.query_map(params![parent_run_id], read_run_row)?;
        collect_runs(rows)
    }

    pub fn counts(&self) -> Result<StoreCounts> {
        Ok(StoreCounts {
            experiments: self.count_rows("SELECT COUNT(*) FROM experiments")?,
            runs: self.count_rows("SELECT COUNT(*) FROM runs")?,
            params: self.count_rows("SELECT COUNT(*) FROM params")?,
            metrics: self.count_rows("SELECT COUNT(*) FROM metrics")?,
            artifacts: self.count_rows("SELECT COUNT(*) FROM artifacts")?,
        })
    }

    pub fn schema_version(&self) -> Result<Option<String>> {
        let value = self
            .connection
            .query_row(
                "SELECT value FROM metadata WHERE key = 'schema_version'",
                [],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    fn count_rows(&self, sql: &str) -> Result<i64> {
        let count = self.connection.query_row(sql, [], |row| row.get(0))?;
        Ok(count)
    }
}

struct RawRunRow {
    run_id: String,
    experiment_id: i64,
    run_name: String,
    parent_run_id: Option<String>,
    status: String,
    started_at: String,
    ended_at: Option<String>,
}

impl RawRunRow {
    fn into_record(self) -> Result<RunRecord> {
        Ok(RunRecord {
            status: RunStatus::parse(&self.status)?,
            run_id: self.run_id,
            experiment_id: self.experiment_id,
            run_name: self.run_name,
            parent_run_id: self.parent_run_id,
            started_at: self.started_at,
            ended_at: self.ended_at,
        })
    }
}

fn read_run_row(row: &Row<'_>) -> rusqlite::Result<RawRunRow> {
    Ok(RawRunRow {
        run_id: row.get(0)?,
        experiment_id: row.get(1)?,
        run_name: row.get(2)?,
        parent_run_id: row.get(3)?,
        status: row.get(4)?,
        started_at: row.get(5)?,
        ended_at: row.get(6)?,
    })
}

fn collect_runs(
    rows: impl Iterator<Item = rusqlite::Result<RawRunRow>>,
) -> Result<Vec<RunRecord>> {
    let mut out = Vec::<RunRecord>::new();
    for row in rows {
        out.push(row?.into_record()?);
    }
    Ok(out)
}

fn next_run_id(experiment_id: i64, run_name: &str) -> String {
    let nanos = Utc::now().timestamp_nanos_opt().unwrap_or_default();
    let sequence = RUN_ID_COUNTER.fetch_add(1, Ordering::Relaxed);
    let digest = sha256_text(&format!(
        "{experiment_id}:{run_name}:{nanos}:{}:{sequence}",
        std::process::id()
    ));
    digest[..32].to_string()
}
