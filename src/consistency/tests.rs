use serde_json::json;

use super::*;

fn set(tokens: &[&str]) -> NormalizedSet {
    NormalizedSet::from_tokens(tokens.iter().copied())
}

fn normalize_value(value: serde_json::Value) -> NormalizedSet {
    normalize(&ExtractedDocument::Parsed(value), DEFAULT_FIELD)
}

fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-12,
        "expected {expected}, got {actual}"
    );
}

#[test]
fn extract_parses_plain_json() {
    let document = extract(Some(r#"{"key": "value"}"#));
    assert_eq!(document, ExtractedDocument::Parsed(json!({"key": "value"})));
}

#[test]
fn extract_strips_markdown_fences() {
    let document = extract(Some("```json\n{\"key\": \"value\"}\n```"));
    assert_eq!(document, ExtractedDocument::Parsed(json!({"key": "value"})));

    let bare_fence = extract(Some("  ```\n[1, 2]\n```  "));
    assert_eq!(bare_fence, ExtractedDocument::Parsed(json!([1, 2])));
}

#[test]
fn extract_strips_fence_markers_inside_payload() {
    let document = extract(Some(r#"{"code": "a```b"}"#));
    assert_eq!(document, ExtractedDocument::Parsed(json!({"code": "ab"})));
}

#[test]
fn extract_fails_closed_on_malformed_json() {
    assert_eq!(
        extract(Some(r#"{"key": "value""#)),
        ExtractedDocument::Unparseable
    );
    assert_eq!(
        extract(Some("Sure! Here is the JSON: {\"a\": 1}")),
        ExtractedDocument::Unparseable
    );
    assert_eq!(extract(Some("")), ExtractedDocument::Unparseable);
}

#[test]
fn extract_rejects_non_text_input() {
    assert_eq!(extract(None), ExtractedDocument::Unparseable);
}

#[test]
fn normalize_finds_names_at_any_depth() {
    let value = json!({
        "ingredient_composition": [
            {"name": "Flour", "details": {"sub": [{"name": "Wheat Germ"}]}},
            {"group": {"items": [{"name": "  Sugar "}]}}
        ]
    });

    assert_eq!(
        normalize_value(value),
        set(&["flour", "sugar", "wheat germ"])
    );
}

#[test]
fn normalize_collects_bare_strings_and_sibling_strings() {
    let value = json!({
        "ingredient_composition": ["Salt", {"name": "Flour", "unit": "g", "amount": 200}]
    });

    assert_eq!(normalize_value(value), set(&["flour", "g", "salt"]));
}

#[test]
fn normalize_is_case_whitespace_and_order_insensitive() {
    let first = json!({"ingredient_composition": [
        {"name": "Flour"}, {"name": " flour "}, {"name": "FLOUR"}, {"name": "Egg"}
    ]});
    let second = json!({"ingredient_composition": [
        {"name": "egg"}, {"name": "flour"}
    ]});

    let normalized = normalize_value(first);
    assert_eq!(normalized.items(), ["egg", "flour"]);
    assert_eq!(normalized, normalize_value(second));
}

#[test]
fn normalize_ignores_key_order() {
    let first = json!({
        "ingredient_composition": {"a": {"name": "Milk"}, "b": {"name": "Butter"}}
    });
    let second = json!({
        "ingredient_composition": {"b": {"name": "Butter"}, "a": {"name": "Milk"}}
    });
    assert_eq!(normalize_value(first), normalize_value(second));
}

#[test]
fn normalize_accepts_sequence_root() {
    let value = json!([{"name": "Yeast"}, "Water"]);
    assert_eq!(normalize_value(value), set(&["water", "yeast"]));
}

#[test]
fn normalize_yields_empty_set_for_missing_or_unsupported_payloads() {
    assert!(normalize_value(json!({"other_field": [{"name": "Egg"}]})).is_empty());
    assert!(normalize_value(json!("just a string")).is_empty());
    assert!(normalize_value(json!(42)).is_empty());
    assert!(normalize_value(json!({"ingredient_composition": [1, true, null]})).is_empty());
    assert!(normalize(&ExtractedDocument::Unparseable, DEFAULT_FIELD).is_empty());
}

#[test]
fn normalize_renders_non_string_names() {
    let value = json!({"ingredient_composition": [
        {"name": 7}, {"name": true}, {"name": null}, {"name": ["A", 1]}
    ]});

    let normalized = normalize_value(value);
    assert_eq!(normalized.items(), ["7", "['a', 1]", "a", "none", "true"]);
}

#[test]
fn normalize_uses_configured_field() {
    let document = ExtractedDocument::Parsed(json!({"toppings": [{"name": "Basil"}]}));
    assert_eq!(normalize(&document, "toppings"), set(&["basil"]));
    assert!(normalize(&document, DEFAULT_FIELD).is_empty());
}

#[test]
fn fenced_duplicate_names_collapse_to_one_item() {
    let raw = concat!(
        "```json\n",
        "{\"ingredient_composition\": [{\"name\": \"Egg\"}, {\"name\": \"egg\"}]}\n",
        "```"
    );
    let document = extract(Some(raw));
    assert!(document.is_parsed());
    assert_eq!(normalize(&document, DEFAULT_FIELD), set(&["egg"]));
}

#[test]
fn matcher_ratio_matches_reference_values() {
    assert_close(similarity_ratio("abcd", "bcde"), 0.75);
    assert_close(similarity_ratio("flour\nsugar", "flour"), 0.625);
    assert_close(similarity_ratio("abxcd", "abcd"), 8.0 / 9.0);
    assert_close(similarity_ratio("flour", ""), 0.0);
    assert_close(similarity_ratio("", ""), 1.0);
    assert_close(similarity_ratio("same", "same"), 1.0);
}

#[test]
fn matcher_reports_collapsed_blocks_with_sentinel() {
    let blocks = SequenceMatcher::new("abxcd", "abcd").matching_blocks();
    assert_eq!(
        blocks,
        vec![
            MatchBlock { a: 0, b: 0, size: 2 },
            MatchBlock { a: 3, b: 2, size: 2 },
            MatchBlock { a: 5, b: 4, size: 0 },
        ]
    );
}

#[test]
fn matcher_drops_popular_characters_in_long_sequences() {
    let long_run = "a".repeat(250);
    let shifted = format!("b{long_run}");

    // the only anchor character is popular, so nothing can seed a match
    assert_close(similarity_ratio(&shifted, &long_run), 0.0);
    // a zero-length match at the origin still extends across equal prefixes
    assert_close(similarity_ratio(&long_run, &long_run), 1.0);
}

#[test]
fn matcher_handles_multibyte_characters() {
    assert_close(similarity_ratio("crème", "creme"), 0.8);
}

#[test]
fn score_needs_at_least_two_sets() {
    assert_eq!(score(&[]), 0.0);
    assert_eq!(score(&[set(&["flour"])]), 0.0);
}

#[test]
fn score_identical_sets_is_one() {
    let sets = vec![set(&["flour", "sugar"]), set(&["sugar", "flour"])];
    assert_close(score(&sets), 1.0);
}

#[test]
fn score_disjoint_sets_is_near_zero() {
    let sets = vec![set(&["flour"]), set(&["quinoa"])];
    let value = score(&sets);
    assert!(value < 0.2, "unexpected score {value}");
}

#[test]
fn score_averages_all_pairs() {
    let sets = vec![
        set(&["flour", "sugar"]),
        set(&["flour", "sugar"]),
        set(&["flour"]),
    ];

    let pairs = pair_scores(&sets);
    assert_eq!(pairs.len(), 3);
    assert_eq!((pairs[0].left, pairs[0].right), (0, 1));
    assert_eq!((pairs[2].left, pairs[2].right), (1, 2));
    assert_close(pairs[0].ratio, 1.0);
    assert_close(pairs[1].ratio, 0.625);
    assert_close(score(&sets), 0.75);
}

#[test]
fn score_counts_empty_sets_as_dissimilar() {
    let sets = vec![set(&["flour"]), NormalizedSet::default()];
    assert_eq!(score(&sets), 0.0);

    let both_empty = vec![NormalizedSet::default(), NormalizedSet::default()];
    assert_close(score(&both_empty), 1.0);
}

#[test]
fn evaluate_batch_scores_failed_extractions_as_empty() {
    let outputs = vec![
        RawOutput::new("run-a", r#"{"ingredient_composition": [{"name": "Flour"}]}"#),
        RawOutput::new("run-b", "not json at all"),
    ];

    let evaluation = evaluate_batch(&outputs, &EvaluationConfig::default());
    assert_eq!(evaluation.runs[0].status, ExtractionStatus::Parsed);
    assert_eq!(evaluation.runs[0].items, set(&["flour"]));
    assert_eq!(evaluation.runs[1].status, ExtractionStatus::Unparseable);
    assert_eq!(evaluation.runs[1].item_count, 0);
    assert_eq!(evaluation.extracted_count(), 1);
    assert_eq!(evaluation.pairs.len(), 1);
    assert_eq!(evaluation.score, 0.0);
}

#[test]
fn evaluate_batch_flags_upstream_failures_without_excluding_them() {
    let mut failed = RawOutput::new("run-c", "API Error: quota exceeded");
    failed.succeeded = false;
    let outputs = vec![
        RawOutput::new("run-a", r#"{"ingredient_composition": ["Egg"]}"#),
        RawOutput::new("run-b", r#"{"ingredient_composition": ["egg"]}"#),
        failed,
    ];

    let evaluation = evaluate_batch(&outputs, &EvaluationConfig::default());
    assert_eq!(evaluation.runs[2].status, ExtractionStatus::UpstreamFailure);
    assert_eq!(evaluation.pairs.len(), 3);
    assert_close(evaluation.score, 1.0 / 3.0);
}

#[test]
fn evaluate_batch_reports_missing_field_and_non_text_runs() {
    let outputs = vec![
        RawOutput::new("run-a", r#"{"recipe": []}"#),
        RawOutput {
            run_id: "run-b".to_string(),
            text: None,
            succeeded: true,
            latency_secs: 1.5,
        },
    ];

    let evaluation = evaluate_batch(&outputs, &EvaluationConfig::default());
    assert_eq!(evaluation.runs[0].status, ExtractionStatus::MissingField);
    assert_eq!(evaluation.runs[1].status, ExtractionStatus::Unparseable);
    assert_close(evaluation.score, 1.0);
}
