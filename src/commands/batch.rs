use anyhow::{Context, Result};
use prompt_consistency::store::{RunStatus, RunStore};
use prompt_consistency::util::read_text_file;
use tracing::info;

use crate::cli::BatchArgs;
use crate::commands::record::SYSTEM_PROMPT_ARTIFACT;

const RUN_KIND_PARAM: &str = "run_kind";
const BATCH_RUN_KIND: &str = "batch";

pub fn run(args: BatchArgs) -> Result<()> {
    let system_prompt = match &args.system_prompt_file {
        Some(path) => Some(read_text_file(path)?),
        None => None,
    };

    let store = RunStore::open(&args.store.resolved_db_path())?;
    let run_id = create_batch_parent(
        &store,
        &args.experiment,
        &args.run_name,
        system_prompt.as_deref(),
    )?;

    info!(
        run_id = %run_id,
        run_name = %args.run_name,
        experiment = %args.experiment,
        "batch parent created"
    );
    println!("{run_id}");
    Ok(())
}

/// The parent carries no model output; children are attached with
/// `record --parent-run-id` and scored with `evaluate`.
fn create_batch_parent(
    store: &RunStore,
    experiment: &str,
    run_name: &str,
    system_prompt: Option<&str>,
) -> Result<String> {
    let experiment_id = store.get_or_create_experiment(experiment)?;
    let run_id = store.create_run(experiment_id, run_name, None)?;

    store
        .log_param(&run_id, RUN_KIND_PARAM, BATCH_RUN_KIND)
        .with_context(|| format!("failed to tag batch run {run_id}"))?;
    if let Some(system_prompt) = system_prompt {
        store.log_artifact(&run_id, SYSTEM_PROMPT_ARTIFACT, system_prompt)?;
    }
    store.finish_run(&run_id, RunStatus::Finished)?;
    Ok(run_id)
}
