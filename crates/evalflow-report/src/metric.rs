use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use tracing::error;

use crate::coerce::{
    bool_field, f64_field, object_field, optional_string_field, string_field, string_list,
    value_kind,
};

pub const STATUS_COMPLETED: &str = "COMPLETED";
pub const STATUS_FAILED: &str = "FAILED";
pub const STATUS_ERROR: &str = "ERROR";
pub const STATUS_UNKNOWN: &str = "UNKNOWN";

const NOT_AVAILABLE: &str = "N/A";

/// One scored check performed by the evaluation provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricEvaluation {
    pub name: String,
    pub score: f64,
    pub passed: bool,
    pub actual_value: String,
    pub labels: Vec<String>,
    pub threshold_score: String,
    pub custom_labels: Vec<String>,
    /// Provider status, e.g. COMPLETED, FAILED, ERROR, UNKNOWN
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl MetricEvaluation {
    /// Build a metric from one raw `results` entry.
    ///
    /// Never fails. Malformed fields fall back to defaults; a value that is
    /// not an object at all becomes an ERROR record.
    ///
    /// Expected shape:
    /// ```text
    /// {
    ///   "metric_name": "COHERENCE",
    ///   "score": 0.9,
    ///   "passed": true,
    ///   "metric_evaluation_status": "COMPLETED",
    ///   "evaluation_details": {"actual_value": 0.9, "threshold_score": 0.5, "metric_labels": ["Coherent"]},
    ///   "metrics_config": {"custom_labels": ["Incoherent", "Coherent"]}
    /// }
    /// ```
    pub fn from_value(value: &Value) -> Self {
        match value.as_object() {
            Some(obj) => Self::from_object(obj),
            None => {
                let reason = format!("expected a metric object, found {}", value_kind(value));
                error!(%reason, "Error parsing metric result");
                Self::parse_error(format!("Parser Error: {}", reason))
            }
        }
    }

    fn from_object(obj: &Map<String, Value>) -> Self {
        let name = string_field(obj, "metric_name", STATUS_UNKNOWN);
        let details = object_field(obj, "evaluation_details", &name);
        let config = object_field(obj, "metrics_config", &name);

        Self {
            score: f64_field(obj, "score", &name),
            passed: bool_field(obj, "passed", &name),
            actual_value: details
                .map(|d| string_field(d, "actual_value", NOT_AVAILABLE))
                .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
            labels: string_list(details.and_then(|d| d.get("metric_labels"))),
            threshold_score: details
                .map(|d| string_field(d, "threshold_score", NOT_AVAILABLE))
                .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
            custom_labels: string_list(config.and_then(|c| c.get("custom_labels"))),
            status: string_field(obj, "metric_evaluation_status", STATUS_UNKNOWN),
            error_message: optional_string_field(obj, "error_message"),
            name,
        }
    }

    /// Synthetic record standing in for an entry that could not be read
    pub fn parse_error(message: impl Into<String>) -> Self {
        Self {
            name: STATUS_ERROR.to_string(),
            score: 0.0,
            passed: false,
            actual_value: NOT_AVAILABLE.to_string(),
            labels: vec!["Error".to_string()],
            threshold_score: NOT_AVAILABLE.to_string(),
            custom_labels: Vec::new(),
            status: STATUS_ERROR.to_string(),
            error_message: Some(message.into()),
        }
    }

    /// Whether the provider marked this metric as failed.
    ///
    /// Status based; see [`MetricEvaluation::passed`] for the threshold verdict.
    pub fn is_failing(&self) -> bool {
        self.status.eq_ignore_ascii_case(STATUS_FAILED)
    }

    pub fn is_error(&self) -> bool {
        self.status.eq_ignore_ascii_case(STATUS_ERROR)
    }
}

impl fmt::Display for MetricEvaluation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = if self.passed { "✅" } else { "❌" };
        writeln!(f, "{} {}:", symbol, self.name)?;
        writeln!(f, "  Score: {:.2}", self.score)?;
        write!(f, "  Status: {}", self.status)?;

        if !self.labels.is_empty() {
            write!(f, "\n  Labels: {}", self.labels.join(", "))?;
        }
        if let Some(ref message) = self.error_message {
            write!(f, "\n  ⚠️ Error: {}", message)?;
        }
        if self.threshold_score != NOT_AVAILABLE {
            write!(f, "\n  Threshold: {}", self.threshold_score)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_complete_metric() {
        let raw = json!({
            "metric_name": "COHERENCE",
            "score": 0.9,
            "passed": true,
            "metric_evaluation_status": "COMPLETED",
            "evaluation_details": {
                "actual_value": 0.9,
                "threshold_score": 0.5,
                "metric_labels": ["Coherent"]
            },
            "metrics_config": {"custom_labels": ["Incoherent", "Coherent"]}
        });

        let metric = MetricEvaluation::from_value(&raw);

        assert_eq!(metric.name, "COHERENCE");
        assert!((metric.score - 0.9).abs() < 1e-9);
        assert!(metric.passed);
        assert_eq!(metric.actual_value, "0.9");
        assert_eq!(metric.threshold_score, "0.5");
        assert_eq!(metric.labels, vec!["Coherent"]);
        assert_eq!(metric.custom_labels, vec!["Incoherent", "Coherent"]);
        assert_eq!(metric.status, STATUS_COMPLETED);
        assert!(metric.error_message.is_none());
        assert!(!metric.is_failing());
    }

    #[test]
    fn test_empty_object_uses_defaults() {
        let metric = MetricEvaluation::from_value(&json!({}));
        assert_eq!(metric.name, STATUS_UNKNOWN);
        assert_eq!(metric.score, 0.0);
        assert!(!metric.passed);
        assert_eq!(metric.actual_value, "N/A");
        assert_eq!(metric.threshold_score, "N/A");
        assert!(metric.labels.is_empty());
        assert!(metric.custom_labels.is_empty());
        assert_eq!(metric.status, STATUS_UNKNOWN);
    }

    #[test]
    fn test_non_object_becomes_error_record() {
        for raw in [json!("oops"), json!(42), json!(null), json!([1, 2])] {
            let metric = MetricEvaluation::from_value(&raw);
            assert_eq!(metric.name, STATUS_ERROR);
            assert_eq!(metric.status, STATUS_ERROR);
            assert!(!metric.passed);
            assert_eq!(metric.score, 0.0);
            assert!(metric
                .error_message
                .as_deref()
                .unwrap()
                .starts_with("Parser Error"));
        }
    }

    #[test]
    fn test_wrong_typed_nested_sections_are_ignored() {
        let raw = json!({
            "metric_name": "CLARITY",
            "score": "not a number",
            "metric_evaluation_status": "FAILED",
            "evaluation_details": "garbled",
            "metrics_config": 7
        });

        let metric = MetricEvaluation::from_value(&raw);
        assert_eq!(metric.name, "CLARITY");
        assert_eq!(metric.score, 0.0);
        assert_eq!(metric.actual_value, "N/A");
        assert!(metric.labels.is_empty());
        assert!(metric.custom_labels.is_empty());
        assert!(metric.is_failing());
    }

    #[test]
    fn test_scalar_labels_wrapped() {
        let raw = json!({"evaluation_details": {"metric_labels": "Toxic"}});
        let metric = MetricEvaluation::from_value(&raw);
        assert_eq!(metric.labels, vec!["Toxic"]);
    }

    #[test]
    fn test_failing_status_is_case_insensitive() {
        let metric = MetricEvaluation::from_value(&json!({"metric_evaluation_status": "failed"}));
        assert!(metric.is_failing());
    }

    #[test]
    fn test_display_includes_optional_lines() {
        let metric = MetricEvaluation::from_value(&json!({
            "metric_name": "TOXICITY",
            "score": 0.123,
            "passed": false,
            "metric_evaluation_status": "FAILED",
            "error_message": "threshold not met",
            "evaluation_details": {"threshold_score": 0.2, "metric_labels": ["Toxic", "Rude"]}
        }));

        let text = metric.to_string();
        assert!(text.starts_with("❌ TOXICITY:"));
        assert!(text.contains("Score: 0.12"));
        assert!(text.contains("Labels: Toxic, Rude"));
        assert!(text.contains("Error: threshold not met"));
        assert!(text.contains("Threshold: 0.2"));
    }
}
