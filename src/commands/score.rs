use std::path::Path;

use anyhow::{Context, Result, bail};
use prompt_consistency::consistency::{RawOutput, evaluate_batch};
use prompt_consistency::util::{now_utc_string, read_text_file, write_json_pretty};
use tracing::info;

use crate::cli::ScoreArgs;
use crate::commands::output::{write_json_stdout, write_report_text};
use crate::model::{BatchLine, ConsistencyReport};

pub fn run(args: ScoreArgs) -> Result<()> {
    let config = args.extraction.to_config();

    let mut outputs = Vec::<RawOutput>::new();
    for path in &args.inputs {
        outputs.push(RawOutput::new(path.display().to_string(), read_text_file(path)?));
    }
    if let Some(batch_path) = &args.batch {
        outputs.extend(load_batch_file(batch_path)?);
    }

    if outputs.is_empty() {
        bail!("no runs to score; pass --input files or a --batch file");
    }

    let evaluation = evaluate_batch(&outputs, &config);
    info!(
        run_count = evaluation.runs.len(),
        extracted = evaluation.extracted_count(),
        score = evaluation.score,
        "batch scored"
    );

    let report = ConsistencyReport::new("files", &config, evaluation, now_utc_string());
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

fn load_batch_file(path: &Path) -> Result<Vec<RawOutput>> {
    let raw = read_text_file(path)?;
    parse_batch_lines(&raw).with_context(|| format!("failed to parse batch {}", path.display()))
}

/// Blank lines are skipped; a line that is not a JSON object is an error in
/// the batch file itself, not a malformed model response.
fn parse_batch_lines(raw: &str) -> Result<Vec<RawOutput>> {
    let mut outputs = Vec::new();
    for (index, line) in raw.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }

        let parsed: BatchLine = serde_json::from_str(line)
            .with_context(|| format!("invalid batch line {}", index + 1))?;
        let succeeded = parsed.succeeded();
        outputs.push(RawOutput {
            run_id: parsed
                .run_id
                .unwrap_or_else(|| format!("line-{}", index + 1)),
            // anything but a string is non-text input
            text: parsed.output_text.as_str().map(ToOwned::to_owned),
            succeeded,
            latency_secs: parsed.latency.unwrap_or(0.0),
        });
    }
    Ok(outputs)
}
