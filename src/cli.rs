use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use prompt_consistency::consistency::{DEFAULT_ARTIFACT_PATH, DEFAULT_FIELD, EvaluationConfig};
use prompt_consistency::store::DB_FILE_NAME;

#[derive(Parser, Debug)]
#[command(
    name = "prompt-consistency",
    version,
    about = "Record repeated model runs and score how consistent their structured outputs are"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    Batch(BatchArgs),
    Record(RecordArgs),
    Evaluate(EvaluateArgs),
    Score(ScoreArgs),
    Runs(RunsArgs),
    Prompt(PromptArgs),
    Status(StatusArgs),
}

#[derive(Args, Debug, Clone)]
pub struct StoreArgs {
    #[arg(long, default_value = ".cache/prompt-consistency")]
    pub store_root: PathBuf,

    #[arg(long)]
    pub db_path: Option<PathBuf>,
}

impl StoreArgs {
    pub fn resolved_db_path(&self) -> PathBuf {
        self.db_path
            .clone()
            .unwrap_or_else(|| self.store_root.join(DB_FILE_NAME))
    }
}

#[derive(Args, Debug, Clone)]
pub struct ExtractionArgs {
    #[arg(long, default_value = DEFAULT_FIELD)]
    pub field: String,

    #[arg(long, default_value = DEFAULT_ARTIFACT_PATH)]
    pub artifact_path: String,
}

impl ExtractionArgs {
    pub fn to_config(&self) -> EvaluationConfig {
        EvaluationConfig {
            field: self.field.clone(),
            artifact_path: self.artifact_path.clone(),
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum RunOutcome {
    Pass,
    Fail,
}

/// Opens a parent run that groups repeated runs of one prompt.
#[derive(Args, Debug, Clone)]
pub struct BatchArgs {
    #[command(flatten)]
    pub store: StoreArgs,

    #[arg(long, default_value = "Default")]
    pub experiment: String,

    #[arg(long)]
    pub run_name: String,

    #[arg(long)]
    pub system_prompt_file: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct RecordArgs {
    #[command(flatten)]
    pub store: StoreArgs,

    #[arg(long, default_value = "Default")]
    pub experiment: String,

    #[arg(long)]
    pub run_name: String,

    #[arg(long)]
    pub model_name: String,

    #[arg(long)]
    pub system_prompt_file: PathBuf,

    /// Raw response text, or the error message when the run failed.
    #[arg(long)]
    pub output_file: PathBuf,

    #[arg(long, value_enum, default_value_t = RunOutcome::Pass)]
    pub outcome: RunOutcome,

    #[arg(long, default_value_t = 0.0)]
    pub latency_secs: f64,

    #[arg(long)]
    pub prompt_tokens: Option<u64>,

    #[arg(long)]
    pub candidates_tokens: Option<u64>,

    #[arg(long)]
    pub total_tokens: Option<u64>,

    #[arg(long)]
    pub finish_reason: Option<String>,

    #[arg(long)]
    pub parent_run_id: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct EvaluateArgs {
    #[command(flatten)]
    pub store: StoreArgs,

    #[command(flatten)]
    pub extraction: ExtractionArgs,

    #[arg(long = "run-id")]
    pub run_ids: Vec<String>,

    /// Evaluates the children of this run when no run ids are given, and
    /// receives the consistency metric either way.
    #[arg(long)]
    pub parent_run_id: Option<String>,

    #[arg(long)]
    pub report_path: Option<PathBuf>,

    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct ScoreArgs {
    #[command(flatten)]
    pub extraction: ExtractionArgs,

    /// One raw response per file.
    #[arg(long = "input")]
    pub inputs: Vec<PathBuf>,

    /// JSONL file with one run object per line.
    #[arg(long)]
    pub batch: Option<PathBuf>,

    #[arg(long)]
    pub report_path: Option<PathBuf>,

    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct RunsArgs {
    #[command(flatten)]
    pub store: StoreArgs,

    #[arg(long, default_value = "Default")]
    pub experiment: String,

    #[arg(long, default_value_t = 20, value_parser = clap::value_parser!(u64).range(1..))]
    pub limit: u64,

    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct PromptArgs {
    #[command(flatten)]
    pub store: StoreArgs,

    #[arg(long)]
    pub run_id: String,
}

#[derive(Args, Debug, Clone)]
pub struct StatusArgs {
    #[command(flatten)]
    pub store: StoreArgs,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn runs_limit_rejects_zero() {
        let err = Cli::try_parse_from(["prompt-consistency", "runs", "--limit", "0"])
            .expect_err("zero limit");
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);

        let cli = Cli::try_parse_from(["prompt-consistency", "runs", "--limit", "5"])
            .expect("parse");
        match cli.command {
            Commands::Runs(args) => assert_eq!(args.limit, 5),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn batch_needs_only_a_run_name() {
        let cli = Cli::try_parse_from(["prompt-consistency", "batch", "--run-name", "batch-1"])
            .expect("parse");
        match cli.command {
            Commands::Batch(args) => {
                assert_eq!(args.run_name, "batch-1");
                assert_eq!(args.experiment, "Default");
                assert!(args.system_prompt_file.is_none());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
