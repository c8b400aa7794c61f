use anyhow::Result;
use prompt_consistency::store::RunStore;
use tracing::{info, warn};

use crate::cli::StatusArgs;

pub fn run(args: StatusArgs) -> Result<()> {
    let db_path = args.store.resolved_db_path();

    info!(store_root = %args.store.store_root.display(), "status requested");

    if !db_path.exists() {
        warn!(path = %db_path.display(), "run store missing");
        return Ok(());
    }

    let store = RunStore::open(&db_path)?;
    let counts = store.counts()?;

    info!(
        path = %db_path.display(),
        schema_version = %store.schema_version()?.unwrap_or_default(),
        experiments = counts.experiments,
        runs = counts.runs,
        params = counts.params,
        metrics = counts.metrics,
        artifacts = counts.artifacts,
        "run store status"
    );

    Ok(())
}
