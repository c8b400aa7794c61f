use std::io::{self, Write};

use anyhow::{Context, Result};
use prompt_consistency::store::{RunRecord, RunStore};
use tracing::{info, warn};

use crate::cli::RunsArgs;
use crate::commands::evaluate::CONSISTENCY_METRIC;
use crate::commands::output::write_json_stdout;
use crate::model::RunListing;

pub fn run(args: RunsArgs) -> Result<()> {
    let db_path = args.store.resolved_db_path();
    let store = RunStore::open(&db_path)?;

    let Some(experiment_id) = store.find_experiment(&args.experiment)? else {
        warn!(experiment = %args.experiment, "experiment not found");
        return if args.json {
            write_json_stdout(&Vec::<RunListing>::new())
        } else {
            Ok(())
        };
    };

    let limit = usize::try_from(args.limit).context("--limit does not fit in memory")?;
    let runs = store.list_runs(experiment_id, limit)?;
    let listings = runs
        .iter()
        .map(|record| build_listing(&store, record))
        .collect::<Result<Vec<_>>>()?;

    info!(
        experiment = %args.experiment,
        returned = listings.len(),
        "listed runs"
    );

    if args.json {
        write_json_stdout(&listings)
    } else {
        write_listing_text(&listings)
    }
}

fn build_listing(store: &RunStore, record: &RunRecord) -> Result<RunListing> {
    Ok(RunListing {
        run_id: record.run_id.clone(),
        run_name: record.run_name.clone(),
        status: record.status.as_str().to_string(),
        started_at: record.started_at.clone(),
        parent_run_id: record.parent_run_id.clone(),
        model_name: store.load_param(&record.run_id, "model_name")?,
        latency: store.load_metric(&record.run_id, "latency")?,
        consistency_score: store.load_metric(&record.run_id, CONSISTENCY_METRIC)?,
    })
}

fn write_listing_text(listings: &[RunListing]) -> Result<()> {
    let mut output = io::BufWriter::new(io::stdout().lock());
    for listing in listings {
        let short_id = &listing.run_id[..listing.run_id.len().min(8)];
        let latency = listing
            .latency
            .map(|value| format!("{value:.2}s"))
            .unwrap_or_else(|| "-".to_string());
        let consistency = listing
            .consistency_score
            .map(|value| format!("{value:.4}"))
            .unwrap_or_else(|| "-".to_string());

        writeln!(
            output,
            "{} ({})\t{}\t{}\tlatency={}\tconsistency={}\tmodel={}",
            listing.run_name,
            short_id,
            listing.status,
            listing.started_at,
            latency,
            consistency,
            listing.model_name.as_deref().unwrap_or("-"),
        )?;
    }
    output.flush()?;
    Ok(())
}
