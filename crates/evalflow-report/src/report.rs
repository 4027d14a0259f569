use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use tracing::{debug, error};

use crate::coerce::{string_field, value_kind};
use crate::metric::{MetricEvaluation, STATUS_ERROR, STATUS_UNKNOWN};

const DEFAULT_MESSAGE: &str = "No message available";
const NOT_AVAILABLE: &str = "N/A";

/// The outcome of one call to the evaluation provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    /// Provider status code or string, rendered as text
    pub status: String,
    pub message: String,
    pub remaining_credits: String,
    /// One entry per raw result, malformed entries included
    pub metrics: Vec<MetricEvaluation>,
}

impl EvaluationReport {
    /// Build a report from a raw provider response. Never fails.
    pub fn from_value(value: &Value) -> Self {
        let Some(obj) = value.as_object() else {
            let reason = format!("expected a report object, found {}", value_kind(value));
            error!(%reason, "Error initializing evaluation report");
            return Self::parse_error(format!("Parser initialization failed: {}", reason));
        };

        let metrics = match obj.get("results") {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(results)) => {
                results.iter().map(MetricEvaluation::from_value).collect()
            }
            Some(other) => {
                error!(kind = value_kind(other), "Results data is not a list");
                Vec::new()
            }
        };

        debug!(metrics = metrics.len(), "Parsed evaluation report");

        Self {
            status: string_field(obj, "status", STATUS_UNKNOWN),
            message: string_field(obj, "message", DEFAULT_MESSAGE),
            remaining_credits: string_field(obj, "remaining_credits", NOT_AVAILABLE),
            metrics,
        }
    }

    /// Parse a report from JSON text; invalid JSON yields an ERROR report.
    pub fn from_json_str(text: &str) -> Self {
        match serde_json::from_str::<Value>(text) {
            Ok(value) => Self::from_value(&value),
            Err(e) => {
                error!(error = %e, "Evaluation report is not valid JSON");
                Self::parse_error(format!("Parser initialization failed: {}", e))
            }
        }
    }

    /// Fallback report for input that could not be read at all
    pub fn parse_error(message: impl Into<String>) -> Self {
        Self {
            status: STATUS_ERROR.to_string(),
            message: message.into(),
            remaining_credits: NOT_AVAILABLE.to_string(),
            metrics: Vec::new(),
        }
    }

    pub fn passed_metrics(&self) -> Vec<&MetricEvaluation> {
        self.metrics.iter().filter(|m| m.passed).collect()
    }

    pub fn failed_metrics(&self) -> Vec<&MetricEvaluation> {
        self.metrics.iter().filter(|m| !m.passed).collect()
    }

    /// True if any metric carries a failing status
    pub fn has_failing_metrics(&self) -> bool {
        self.metrics.iter().any(MetricEvaluation::is_failing)
    }

    pub fn is_success_status(&self) -> bool {
        self.status == "200"
    }
}

impl fmt::Display for EvaluationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let indicator = if self.is_success_status() { "🟢" } else { "🔴" };
        writeln!(f, "{} Status: {}", indicator, self.status)?;
        writeln!(f, "📝 Message: {}", self.message)?;
        writeln!(f, "💳 Remaining Credits: {}", self.remaining_credits)?;
        writeln!(f)?;
        write!(f, "📊 Results:")?;

        if self.metrics.is_empty() {
            write!(f, "\nNo results available")?;
        } else {
            for metric in &self.metrics {
                write!(f, "\n{}", metric)?;
            }
        }
        Ok(())
    }
}
