use evalflow_report::{EvaluationReport, MetricEvaluation, STATUS_ERROR};
use serde_json::{json, Value};

/// Helper: a provider response resembling a real prompt evaluation.
fn sample_prompt_report() -> Value {
    json!({
        "status": 200,
        "message": "Metrics evaluated successfully",
        "remaining_credits": 981,
        "results": [
            {
                "metric_name": "DATA_LEAKAGE",
                "score": 0.0,
                "passed": true,
                "metric_evaluation_status": "COMPLETED",
                "evaluation_details": {
                    "actual_value": 0.0,
                    "threshold_score": 0.5,
                    "metric_labels": ["No Data Leakage"]
                },
                "metrics_config": {"custom_labels": ["Data Leakage", "No Data Leakage"]}
            },
            {
                "metric_name": "COHERENCE",
                "score": "0.35",
                "passed": "false",
                "metric_evaluation_status": "FAILED",
                "evaluation_details": {
                    "actual_value": "0.35",
                    "threshold_score": 0.5,
                    "metric_labels": "Incoherent"
                }
            },
            "truncated-entry",
            null,
            {
                "metric_name": "TOXICITY",
                "metric_evaluation_status": "ERROR",
                "error_message": "model timeout"
            }
        ]
    })
}

// ============================================================
// Report-level tests
// ============================================================

#[test]
fn test_metric_count_matches_raw_results_including_malformed() {
    let raw = sample_prompt_report();
    let report = EvaluationReport::from_value(&raw);

    let raw_len = raw["results"].as_array().unwrap().len();
    assert_eq!(report.metrics.len(), raw_len);
}

#[test]
fn test_malformed_entries_become_error_records_in_place() {
    let report = EvaluationReport::from_value(&sample_prompt_report());

    assert_eq!(report.metrics[0].name, "DATA_LEAKAGE");
    assert_eq!(report.metrics[1].name, "COHERENCE");
    assert_eq!(report.metrics[2].name, "ERROR");
    assert_eq!(report.metrics[3].name, "ERROR");
    assert_eq!(report.metrics[4].name, "TOXICITY");
}

#[test]
fn test_report_header_fields_are_stringified() {
    let report = EvaluationReport::from_value(&sample_prompt_report());

    assert_eq!(report.status, "200");
    assert_eq!(report.message, "Metrics evaluated successfully");
    assert_eq!(report.remaining_credits, "981");
}

#[test]
fn test_failing_metrics_detected_by_status() {
    let report = EvaluationReport::from_value(&sample_prompt_report());
    assert!(report.has_failing_metrics());

    let clean = EvaluationReport::from_value(&json!({
        "results": [{"metric_name": "CLARITY", "metric_evaluation_status": "COMPLETED", "passed": true}]
    }));
    assert!(!clean.has_failing_metrics());
}

#[test]
fn test_error_status_is_not_counted_as_failing() {
    let report = EvaluationReport::from_value(&json!({
        "results": [{"metric_name": "X", "metric_evaluation_status": "ERROR"}, 7]
    }));
    assert!(!report.has_failing_metrics());
    assert!(report.metrics.iter().all(|m| m.is_error()));
}

#[test]
fn test_results_not_a_list_yields_zero_metrics() {
    let shapes = [
        json!({"results": "n/a"}),
        json!({"results": 12}),
        json!({"results": true}),
        json!({"results": {"metric_name": "COHERENCE"}}),
    ];

    for raw in shapes {
        let report = EvaluationReport::from_value(&raw);
        assert!(report.metrics.is_empty(), "expected no metrics for {}", raw);
    }
}

#[test]
fn test_top_level_wrong_shape_falls_back_to_error_report() {
    for raw in [json!(null), json!("text"), json!(1.5), json!([{"metric_name": "X"}])] {
        let report = EvaluationReport::from_value(&raw);
        assert_eq!(report.status, STATUS_ERROR);
        assert_eq!(report.remaining_credits, "N/A");
        assert!(report.metrics.is_empty());
        assert!(report.message.contains("Parser initialization failed"));
    }
}

// ============================================================
// Metric-level tests
// ============================================================

#[test]
fn test_string_typed_numbers_and_flags_are_coerced() {
    let report = EvaluationReport::from_value(&sample_prompt_report());
    let coherence = &report.metrics[1];

    assert!((coherence.score - 0.35).abs() < 1e-9);
    assert!(!coherence.passed);
    assert_eq!(coherence.labels, vec!["Incoherent"]);
    assert!(coherence.custom_labels.is_empty());
}

#[test]
fn test_malformed_metric_status_is_original_or_error() {
    let inputs = [
        json!({"metric_name": 5, "score": {"x": 1}, "passed": [], "metric_evaluation_status": "COMPLETED"}),
        json!({"score": null, "labels": 3, "metric_evaluation_status": "FAILED"}),
        json!(false),
        json!(["COHERENCE"]),
    ];
    let expected = ["COMPLETED", "FAILED", "ERROR", "ERROR"];

    for (raw, status) in inputs.iter().zip(expected) {
        let metric = MetricEvaluation::from_value(raw);
        assert_eq!(metric.status, status);
    }
}

#[test]
fn test_error_message_carried_through() {
    let report = EvaluationReport::from_value(&sample_prompt_report());
    assert_eq!(
        report.metrics[4].error_message.as_deref(),
        Some("model timeout")
    );
}

#[test]
fn test_display_lists_every_metric() {
    let report = EvaluationReport::from_value(&sample_prompt_report());
    let text = report.to_string();

    assert!(text.contains("🟢 Status: 200"));
    assert!(text.contains("💳 Remaining Credits: 981"));
    assert!(text.contains("✅ DATA_LEAKAGE:"));
    assert!(text.contains("❌ COHERENCE:"));
    assert_eq!(text.matches("Score:").count(), 5);
}
