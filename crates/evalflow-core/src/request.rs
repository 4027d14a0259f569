/// Task name sent with the pre-generation evaluation
pub const PROMPT_EVALUATION_TASK: &str = "prompt_evaluation";
/// Task name sent with the post-generation evaluation
pub const RESPONSE_EVALUATION_TASK: &str = "response_evaluation";

pub const DEFAULT_PROMPT_METRICS: &[&str] = &[
    "DATA_LEAKAGE",
    "INSECURE_OUTPUT",
    "COHERENCE",
    "GRAMMATICAL_CORRECTNESS",
    "TOXICITY",
];

pub const DEFAULT_RESPONSE_METRICS: &[&str] = &[
    "RESPONSE_TONE",
    "ANSWER_RELEVANCE",
    "FACTUAL_CONSISTENCY",
    "READABILITY",
    "CLARITY",
];

/// Input to one evaluation flow
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowRequest {
    pub prompt: String,
    /// Background material for generation; empty when not provided
    pub context: String,
    pub prompt_metrics: Vec<String>,
    pub response_metrics: Vec<String>,
}

impl FlowRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            context: String::new(),
            prompt_metrics: to_owned_list(DEFAULT_PROMPT_METRICS),
            response_metrics: to_owned_list(DEFAULT_RESPONSE_METRICS),
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = context.into();
        self
    }

    pub fn with_prompt_metrics(mut self, metrics: Vec<String>) -> Self {
        self.prompt_metrics = metrics;
        self
    }

    pub fn with_response_metrics(mut self, metrics: Vec<String>) -> Self {
        self.response_metrics = metrics;
        self
    }

    /// First 100 characters of the prompt, for log lines
    pub fn prompt_preview(&self) -> String {
        self.prompt.trim().chars().take(100).collect()
    }
}

fn to_owned_list(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let request = FlowRequest::new("Summarize X");
        assert!(request.context.is_empty());
        assert_eq!(request.prompt_metrics.len(), 5);
        assert_eq!(request.response_metrics[4], "CLARITY");
    }

    #[test]
    fn test_prompt_preview_is_char_bounded() {
        let request = FlowRequest::new(format!("  {}", "é".repeat(150)));
        assert_eq!(request.prompt_preview().chars().count(), 100);
    }
}
