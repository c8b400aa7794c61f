use prompt_consistency::consistency::{BatchEvaluation, EvaluationConfig};
use serde::{Deserialize, Serialize};

/// One line of a JSONL batch handed over by the model-execution side.
#[derive(Debug, Clone, Deserialize)]
pub struct BatchLine {
    pub run_id: Option<String>,
    #[serde(default)]
    pub output_text: serde_json::Value,
    pub status: Option<String>,
    pub latency: Option<f64>,
}

impl BatchLine {
    pub fn succeeded(&self) -> bool {
        self.status
            .as_deref()
            .map(|status| !status.trim().eq_ignore_ascii_case("fail"))
            .unwrap_or(true)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ConsistencyReport {
    pub report_version: u32,
    pub generated_at: String,
    pub source: String,
    pub experiment: Option<String>,
    pub parent_run_id: Option<String>,
    pub field: String,
    pub artifact_path: String,
    pub run_count: usize,
    pub extracted_count: usize,
    pub pair_count: usize,
    pub consistency_score: f64,
    pub evaluation: BatchEvaluation,
}

impl ConsistencyReport {
    pub fn new(
        source: &str,
        config: &EvaluationConfig,
        evaluation: BatchEvaluation,
        generated_at: String,
    ) -> Self {
        Self {
            report_version: 1,
            generated_at,
            source: source.to_string(),
            experiment: None,
            parent_run_id: None,
            field: config.field.clone(),
            artifact_path: config.artifact_path.clone(),
            run_count: evaluation.runs.len(),
            extracted_count: evaluation.extracted_count(),
            pair_count: evaluation.pairs.len(),
            consistency_score: evaluation.score,
            evaluation,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RunListing {
    pub run_id: String,
    pub run_name: String,
    pub status: String,
    pub started_at: String,
    pub parent_run_id: Option<String>,
    pub model_name: Option<String>,
    pub latency: Option<f64>,
    pub consistency_score: Option<f64>,
}
