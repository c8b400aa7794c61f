//! Consistency evaluation for repeated model runs.
//!
//! Raw responses are cleaned and decoded ([`extract`]), reduced to canonical
//! token sets ([`normalize`]) and compared pairwise ([`score`]). Nothing here
//! fails on bad data: malformed or missing payloads become empty sets and
//! count as maximally inconsistent runs.

mod extract;
mod matcher;
mod normalize;
mod score;
#[cfg(test)]
mod tests;

use serde::Serialize;
use tracing::{debug, warn};

pub use self::extract::{ExtractedDocument, extract};
pub use self::matcher::{MatchBlock, SequenceMatcher, similarity_ratio};
pub use self::normalize::{NormalizedSet, PayloadRoot, normalize};
pub use self::score::{PairScore, mean_ratio, pair_scores, score};

use self::normalize::normalize_with_root;

pub const DEFAULT_FIELD: &str = "ingredient_composition";
pub const DEFAULT_ARTIFACT_PATH: &str = "output.json";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvaluationConfig {
    /// Mapping key the comparison payload lives under.
    pub field: String,
    /// Where the run store keeps each run's structured output.
    pub artifact_path: String,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            field: DEFAULT_FIELD.to_string(),
            artifact_path: DEFAULT_ARTIFACT_PATH.to_string(),
        }
    }
}

/// One run's response as handed over by the model-execution side.
#[derive(Debug, Clone, PartialEq)]
pub struct RawOutput {
    pub run_id: String,
    pub text: Option<String>,
    pub succeeded: bool,
    pub latency_secs: f64,
}

impl RawOutput {
    pub fn new(run_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            run_id: run_id.into(),
            text: Some(text.into()),
            succeeded: true,
            latency_secs: 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionStatus {
    Parsed,
    MissingField,
    Unparseable,
    /// The model call itself failed. Scored exactly like any other run; the
    /// distinction only shows up in diagnostics.
    UpstreamFailure,
}

impl ExtractionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Parsed => "parsed",
            Self::MissingField => "missing_field",
            Self::Unparseable => "unparseable",
            Self::UpstreamFailure => "upstream_failure",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RunDiagnostic {
    pub run_id: String,
    pub status: ExtractionStatus,
    pub item_count: usize,
    pub items: NormalizedSet,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchEvaluation {
    pub score: f64,
    pub pairs: Vec<PairScore>,
    pub runs: Vec<RunDiagnostic>,
}

impl BatchEvaluation {
    pub fn extracted_count(&self) -> usize {
        self.runs
            .iter()
            .filter(|run| run.status == ExtractionStatus::Parsed)
            .count()
    }
}

pub fn evaluate_batch(outputs: &[RawOutput], config: &EvaluationConfig) -> BatchEvaluation {
    let mut sets = Vec::with_capacity(outputs.len());
    let mut runs = Vec::with_capacity(outputs.len());

    for output in outputs {
        let document = extract(output.text.as_deref());
        let (set, root) = normalize_with_root(&document, &config.field);
        let status = classify(output, root);

        match status {
            ExtractionStatus::Parsed => {
                debug!(run_id = %output.run_id, items = set.len(), "normalized run output");
            }
            other => {
                warn!(
                    run_id = %output.run_id,
                    status = other.as_str(),
                    field = %config.field,
                    "run output has no comparable payload"
                );
            }
        }

        runs.push(RunDiagnostic {
            run_id: output.run_id.clone(),
            status,
            item_count: set.len(),
            items: set.clone(),
        });
        sets.push(set);
    }

    let pairs = pair_scores(&sets);
    BatchEvaluation {
        score: mean_ratio(&pairs),
        pairs,
        runs,
    }
}

fn classify(output: &RawOutput, root: PayloadRoot) -> ExtractionStatus {
    if !output.succeeded {
        return ExtractionStatus::UpstreamFailure;
    }
    match root {
        PayloadRoot::Field | PayloadRoot::Sequence => ExtractionStatus::Parsed,
        PayloadRoot::MissingField => ExtractionStatus::MissingField,
        PayloadRoot::Unsupported | PayloadRoot::Unparseable => ExtractionStatus::Unparseable,
    }
}
