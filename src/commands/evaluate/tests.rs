use prompt_consistency::consistency::{
    DEFAULT_ARTIFACT_PATH, EvaluationConfig, ExtractionStatus, evaluate_batch,
};
use prompt_consistency::store::{RunStatus, RunStore};

use super::run::{CONSISTENCY_FIELD_PARAM, CONSISTENCY_METRIC, persist_batch_score};
use super::selection::{load_raw_outputs, select_runs};

fn seeded_batch(store: &RunStore) -> (String, Vec<String>) {
    let experiment_id = store.get_or_create_experiment("Default").expect("experiment");
    let parent = store
        .create_run(experiment_id, "batch", None)
        .expect("parent");

    let outputs = [
        Some("{\n  \"ingredient_composition\": [{\"name\": \"Flour\"}, {\"name\": \"Sugar\"}]\n}"),
        Some("{\"ingredient_composition\": [{\"name\": \"sugar\"}, {\"name\": \"flour\"}]}"),
        None,
    ];

    let mut children = Vec::new();
    for (index, output) in outputs.iter().enumerate() {
        let run_id = store
            .create_run(experiment_id, &format!("run_{}", index + 1), Some(parent.as_str()))
            .expect("child");
        match output {
            Some(text) => {
                store
                    .log_artifact(&run_id, DEFAULT_ARTIFACT_PATH, text)
                    .expect("artifact");
                store.log_metric(&run_id, "latency", 0.5).expect("metric");
                store.finish_run(&run_id, RunStatus::Finished).expect("finish");
            }
            None => {
                store.log_param(&run_id, "error", "API Error").expect("param");
                store.finish_run(&run_id, RunStatus::Failed).expect("finish");
            }
        }
        children.push(run_id);
    }

    (parent, children)
}

#[test]
fn select_runs_prefers_explicit_ids() {
    let store = RunStore::open_in_memory().expect("store");
    let (parent, children) = seeded_batch(&store);

    let explicit = vec![children[1].clone(), children[0].clone()];
    let selected = select_runs(&store, &explicit, Some(parent.as_str())).expect("select");
    let ids = selected.iter().map(|run| run.run_id.clone()).collect::<Vec<_>>();
    assert_eq!(ids, explicit);

    let by_parent = select_runs(&store, &[], Some(parent.as_str())).expect("select");
    assert_eq!(by_parent.len(), 3);
}

#[test]
fn select_runs_requires_a_selection() {
    let store = RunStore::open_in_memory().expect("store");
    assert!(select_runs(&store, &[], None).is_err());
    assert!(select_runs(&store, &["missing".to_string()], None).is_err());
    assert!(select_runs(&store, &[], Some("missing")).is_err());
}

#[test]
fn select_runs_rejects_unknown_parent_with_explicit_ids() {
    let store = RunStore::open_in_memory().expect("store");
    let (_, children) = seeded_batch(&store);
    let before = store.counts().expect("counts");

    let err = select_runs(&store, &children, Some("missing")).expect_err("unknown parent");
    assert!(format!("{err:#}").contains("unknown run id: missing"));
    assert_eq!(store.counts().expect("counts"), before);
}

#[test]
fn stored_batch_scores_failed_run_as_empty_set() {
    let store = RunStore::open_in_memory().expect("store");
    let (parent, _) = seeded_batch(&store);

    let runs = select_runs(&store, &[], Some(parent.as_str())).expect("select");
    let outputs = load_raw_outputs(&store, &runs, DEFAULT_ARTIFACT_PATH).expect("outputs");
    assert_eq!(outputs.len(), 3);
    assert!(outputs[0].succeeded);
    assert_eq!(outputs[0].latency_secs, 0.5);
    assert!(!outputs[2].succeeded);
    assert!(outputs[2].text.is_none());

    let evaluation = evaluate_batch(&outputs, &EvaluationConfig::default());
    assert_eq!(evaluation.runs[0].status, ExtractionStatus::Parsed);
    assert_eq!(evaluation.runs[2].status, ExtractionStatus::UpstreamFailure);
    assert!((evaluation.score - 1.0 / 3.0).abs() < 1e-12);
}

#[test]
fn batch_score_lands_on_parent_run() {
    let store = RunStore::open_in_memory().expect("store");
    let (parent, children) = seeded_batch(&store);

    let runs = select_runs(&store, &[], Some(parent.as_str())).expect("select");
    let outputs = load_raw_outputs(&store, &runs, DEFAULT_ARTIFACT_PATH).expect("outputs");
    let evaluation = evaluate_batch(&outputs, &EvaluationConfig::default());

    let written = persist_batch_score(
        &store,
        Some(parent.as_str()),
        &evaluation,
        "ingredient_composition",
    )
    .expect("persist");
    assert!(written);

    let metric = store
        .load_metric(&parent, CONSISTENCY_METRIC)
        .expect("metric")
        .expect("parent metric should exist");
    assert!((metric - 1.0 / 3.0).abs() < 1e-12);
    assert_eq!(
        store.load_param(&parent, CONSISTENCY_FIELD_PARAM).expect("param"),
        Some("ingredient_composition".to_string())
    );
    for child in &children {
        assert_eq!(store.load_metric(child, CONSISTENCY_METRIC).expect("metric"), None);
    }
}

#[test]
fn batch_score_without_parent_writes_nothing() {
    let store = RunStore::open_in_memory().expect("store");
    let (_, children) = seeded_batch(&store);

    let runs = select_runs(&store, &children, None).expect("select");
    let outputs = load_raw_outputs(&store, &runs, DEFAULT_ARTIFACT_PATH).expect("outputs");
    let evaluation = evaluate_batch(&outputs, &EvaluationConfig::default());
    let before = store.counts().expect("counts");

    let written = persist_batch_score(&store, None, &evaluation, "ingredient_composition")
        .expect("persist");
    assert!(!written);
    assert_eq!(store.counts().expect("counts"), before);
}
