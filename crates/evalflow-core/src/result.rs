use evalflow_report::EvaluationReport;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Everything one flow produced, in the order the stages ran.
///
/// Evaluation payloads are kept raw so nothing the provider sent is lost;
/// use [`FlowResult::prompt_report`] / [`FlowResult::response_report`] for
/// typed views.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FlowResult {
    pub prompt_evaluation: Option<Value>,
    pub generated_text: Option<String>,
    pub response_evaluation: Option<Value>,
    /// True if any metric in either report has a failing status
    #[serde(default)]
    pub failed_metrics: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl FlowResult {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store the prompt evaluation and fold its metrics into `failed_metrics`
    pub fn record_prompt_evaluation(&mut self, raw: Value) -> EvaluationReport {
        let report = EvaluationReport::from_value(&raw);
        self.failed_metrics |= report.has_failing_metrics();
        self.prompt_evaluation = Some(raw);
        report
    }

    pub fn record_generated_text(&mut self, text: String) {
        self.generated_text = Some(text);
    }

    /// Store the response evaluation and fold its metrics into `failed_metrics`
    pub fn record_response_evaluation(&mut self, raw: Value) -> EvaluationReport {
        let report = EvaluationReport::from_value(&raw);
        self.failed_metrics |= report.has_failing_metrics();
        self.response_evaluation = Some(raw);
        report
    }

    pub fn prompt_report(&self) -> Option<EvaluationReport> {
        self.prompt_evaluation
            .as_ref()
            .map(EvaluationReport::from_value)
    }

    pub fn response_report(&self) -> Option<EvaluationReport> {
        self.response_evaluation
            .as_ref()
            .map(EvaluationReport::from_value)
    }

    /// All three stages produced output
    pub fn is_complete(&self) -> bool {
        self.prompt_evaluation.is_some()
            && self.generated_text.is_some()
            && self.response_evaluation.is_some()
    }
}
