use std::io::{self, Write};

use anyhow::{Context, Result};
use prompt_consistency::util::truncate_preview;
use serde::Serialize;

use crate::model::ConsistencyReport;

const ITEM_PREVIEW_CHARS: usize = 80;

pub(super) fn write_json_stdout<T: Serialize>(value: &T) -> Result<()> {
    let mut output = io::BufWriter::new(io::stdout().lock());
    serde_json::to_writer_pretty(&mut output, value).context("failed to serialize json output")?;
    writeln!(output)?;
    output.flush()?;
    Ok(())
}

pub(super) fn write_report_text(report: &ConsistencyReport) -> Result<()> {
    let mut output = io::BufWriter::new(io::stdout().lock());

    writeln!(
        output,
        "Consistency: {:.4} over {} runs ({} pairs, {} extracted) field={}",
        report.consistency_score,
        report.run_count,
        report.pair_count,
        report.extracted_count,
        report.field,
    )?;

    for run in &report.evaluation.runs {
        let items = run.items.items().join(", ");
        writeln!(
            output,
            "{}\t{}\titems={}\t{}",
            run.run_id,
            run.status.as_str(),
            run.item_count,
            truncate_preview(&items, ITEM_PREVIEW_CHARS),
        )?;
    }

    for pair in &report.evaluation.pairs {
        let left = &report.evaluation.runs[pair.left].run_id;
        let right = &report.evaluation.runs[pair.right].run_id;
        writeln!(output, "pair\t{left}\t{right}\tratio={:.4}", pair.ratio)?;
    }

    output.flush()?;
    Ok(())
}
