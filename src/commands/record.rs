use anyhow::{Context, Result};
use prompt_consistency::consistency::{DEFAULT_ARTIFACT_PATH, ExtractedDocument, extract};
use prompt_consistency::store::{RunStatus, RunStore};
use prompt_consistency::util::read_text_file;
use tracing::{info, warn};

use crate::cli::{RecordArgs, RunOutcome};

pub(crate) const SYSTEM_PROMPT_ARTIFACT: &str = "system_prompt.txt";
const TEXT_OUTPUT_ARTIFACT: &str = "output.txt";
const UNKNOWN_FINISH_REASON: &str = "UNKNOWN";

/// What the model-execution side reported for a single run.
#[derive(Debug, Clone)]
struct RecordedRun {
    model_name: String,
    system_prompt: String,
    output_text: String,
    outcome: RunOutcome,
    latency_secs: f64,
    prompt_tokens: Option<u64>,
    candidates_tokens: Option<u64>,
    total_tokens: Option<u64>,
    finish_reason: Option<String>,
}

pub fn run(args: RecordArgs) -> Result<()> {
    let db_path = args.store.resolved_db_path();
    let recorded = RecordedRun {
        model_name: args.model_name.clone(),
        system_prompt: read_text_file(&args.system_prompt_file)?,
        output_text: read_text_file(&args.output_file)?,
        outcome: args.outcome,
        latency_secs: args.latency_secs,
        prompt_tokens: args.prompt_tokens,
        candidates_tokens: args.candidates_tokens,
        total_tokens: args.total_tokens,
        finish_reason: args.finish_reason.clone(),
    };

    let store = RunStore::open(&db_path)?;
    let experiment_id = store.get_or_create_experiment(&args.experiment)?;
    let run_id = store.create_run(
        experiment_id,
        &args.run_name,
        args.parent_run_id.as_deref(),
    )?;

    info!(
        run_id = %run_id,
        run_name = %args.run_name,
        experiment = %args.experiment,
        "recording run"
    );

    let status = log_recorded_run(&store, &run_id, &recorded)
        .with_context(|| format!("failed to record run {run_id}"))?;
    store.finish_run(&run_id, status)?;

    info!(run_id = %run_id, status = status.as_str(), "run recorded");
    println!("{run_id}");
    Ok(())
}

fn log_recorded_run(store: &RunStore, run_id: &str, recorded: &RecordedRun) -> Result<RunStatus> {
    store.log_param(run_id, "model_name", &recorded.model_name)?;
    store.log_artifact(run_id, SYSTEM_PROMPT_ARTIFACT, &recorded.system_prompt)?;

    if recorded.outcome == RunOutcome::Fail {
        warn!(run_id = %run_id, "model execution failed upstream");
        store.log_param(run_id, "error", &recorded.output_text)?;
        return Ok(RunStatus::Failed);
    }

    store.log_metric(run_id, "latency", recorded.latency_secs)?;
    let token_counts = [
        ("prompt_token_count", recorded.prompt_tokens),
        ("candidates_token_count", recorded.candidates_tokens),
        ("total_token_count", recorded.total_tokens),
    ];
    for (key, count) in token_counts {
        if let Some(count) = count {
            store.log_metric(run_id, key, count as f64)?;
        }
    }

    let finish_reason = recorded
        .finish_reason
        .as_deref()
        .unwrap_or(UNKNOWN_FINISH_REASON);
    store.log_param(run_id, "finish_reason", finish_reason)?;

    match extract(Some(recorded.output_text.as_str())) {
        ExtractedDocument::Parsed(value) => {
            let pretty = serde_json::to_string_pretty(&value)
                .context("failed to serialize extracted output")?;
            store.log_artifact(run_id, DEFAULT_ARTIFACT_PATH, &pretty)?;
        }
        ExtractedDocument::Unparseable => {
            info!(run_id = %run_id, "output is not valid json; stored as text");
            store.log_artifact(run_id, TEXT_OUTPUT_ARTIFACT, &recorded.output_text)?;
        }
    }

    Ok(RunStatus::Finished)
}
