use anyhow::Result;
use prompt_consistency::consistency::{BatchEvaluation, evaluate_batch};
use prompt_consistency::store::RunStore;
use prompt_consistency::util::{now_utc_string, write_json_pretty};
use tracing::{info, warn};

use super::selection::{load_raw_outputs, select_runs};
use crate::cli::EvaluateArgs;
use crate::commands::output::{write_json_stdout, write_report_text};
use crate::model::ConsistencyReport;

pub const CONSISTENCY_METRIC: &str = "consistency_score";
pub(super) const CONSISTENCY_FIELD_PARAM: &str = "consistency_field";

pub fn run(args: EvaluateArgs) -> Result<()> {
    let config = args.extraction.to_config();
    let db_path = args.store.resolved_db_path();
    let store = RunStore::open(&db_path)?;

    let runs = select_runs(&store, &args.run_ids, args.parent_run_id.as_deref())?;
    if runs.len() < 2 {
        warn!(
            run_count = runs.len(),
            "fewer than two runs selected; consistency is reported as 0"
        );
    }

    let outputs = load_raw_outputs(&store, &runs, &config.artifact_path)?;
    let evaluation = evaluate_batch(&outputs, &config);

    info!(
        run_count = evaluation.runs.len(),
        extracted = evaluation.extracted_count(),
        pairs = evaluation.pairs.len(),
        score = evaluation.score,
        "batch evaluated"
    );

    persist_batch_score(
        &store,
        args.parent_run_id.as_deref(),
        &evaluation,
        &config.field,
    )?;

    let experiment = match runs.first() {
        Some(first) => store.experiment_name(first.experiment_id)?,
        None => None,
    };

    let mut report = ConsistencyReport::new("run-store", &config, evaluation, now_utc_string());
    report.experiment = experiment;
    report.parent_run_id = args.parent_run_id.clone();

    if let Some(report_path) = &args.report_path {
        write_json_pretty(report_path, &report)?;
        info!(path = %report_path.display(), "wrote consistency report");
    }

    if args.json {
        write_json_stdout(&report)
    } else {
        write_report_text(&report)
    }
}

/// Returns whether anything was written.
pub(super) fn persist_batch_score(
    store: &RunStore,
    parent_run_id: Option<&str>,
    evaluation: &BatchEvaluation,
    field: &str,
) -> Result<bool> {
    let Some(parent_run_id) = parent_run_id else {
        warn!("no --parent-run-id given; consistency score not persisted");
        return Ok(false);
    };

    store.log_metric(parent_run_id, CONSISTENCY_METRIC, evaluation.score)?;
    store.log_param(parent_run_id, CONSISTENCY_FIELD_PARAM, field)?;
    info!(
        run_id = %parent_run_id,
        score = evaluation.score,
        "logged consistency score on parent run"
    );
    Ok(true)
}
