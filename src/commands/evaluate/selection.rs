use anyhow::{Context, Result, bail};
use prompt_consistency::consistency::RawOutput;
use prompt_consistency::store::{RunRecord, RunStatus, RunStore};

/// Explicit run ids win; otherwise the batch is the parent's children.
/// A given parent must exist either way, since it receives the metric.
pub(super) fn select_runs(
    store: &RunStore,
    run_ids: &[String],
    parent_run_id: Option<&str>,
) -> Result<Vec<RunRecord>> {
    if let Some(parent_run_id) = parent_run_id {
        store
            .require_run(parent_run_id)
            .context("parent run must exist before scoring")?;
    }

    if !run_ids.is_empty() {
        return run_ids
            .iter()
            .map(|run_id| store.require_run(run_id))
            .collect();
    }

    let Some(parent_run_id) = parent_run_id else {
        bail!("select runs with --run-id or --parent-run-id");
    };
    store.child_runs(parent_run_id)
}

/// Runs without the artifact hand over no text; they extract as unparseable.
pub(super) fn load_raw_outputs(
    store: &RunStore,
    runs: &[RunRecord],
    artifact_path: &str,
) -> Result<Vec<RawOutput>> {
    let mut outputs = Vec::with_capacity(runs.len());
    for record in runs {
        let text = store.load_artifact(&record.run_id, artifact_path)?;
        let latency_secs = store
            .load_metric(&record.run_id, "latency")?
            .unwrap_or(0.0);

        outputs.push(RawOutput {
            run_id: record.run_id.clone(),
            text,
            succeeded: record.status != RunStatus::Failed,
            latency_secs,
        });
    }
    Ok(outputs)
}
