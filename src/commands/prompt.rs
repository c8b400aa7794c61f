use std::io::{self, Write};

use anyhow::{Context, Result};
use prompt_consistency::store::RunStore;
use tracing::info;

use crate::cli::PromptArgs;
use crate::commands::record::SYSTEM_PROMPT_ARTIFACT;

pub fn run(args: PromptArgs) -> Result<()> {
    let db_path = args.store.resolved_db_path();
    let store = RunStore::open(&db_path)?;

    let record = store.require_run(&args.run_id)?;
    let prompt = store
        .load_artifact(&record.run_id, SYSTEM_PROMPT_ARTIFACT)?
        .with_context(|| format!("run {} has no {SYSTEM_PROMPT_ARTIFACT}", record.run_id))?;

    info!(run_id = %record.run_id, run_name = %record.run_name, "imported system prompt");

    let mut output = io::stdout().lock();
    output.write_all(prompt.as_bytes())?;
    if !prompt.ends_with('\n') {
        writeln!(output)?;
    }
    output.flush()?;
    Ok(())
}
