use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use tracing::{debug, info};

use crate::{EvaluationInput, EvaluationProvider, ProviderError};

pub const INSPEQ_BASE_URL: &str = "https://api.inspeq.ai";
const EVALUATE_PATH: &str = "/api/v2/inspeq/evaluation/evaluate-llm-task";

/// Evaluation provider backed by the Inspeq LLM evaluation API
pub struct InspeqEvaluator {
    api_key: SecretString,
    project_id: String,
    base_url: String,
    client: reqwest::Client,
}

impl std::fmt::Debug for InspeqEvaluator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InspeqEvaluator")
            .field("project_id", &self.project_id)
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl InspeqEvaluator {
    pub fn new(api_key: SecretString, project_id: String) -> Self {
        Self {
            api_key,
            project_id,
            base_url: INSPEQ_BASE_URL.to_string(),
            client: reqwest::Client::new(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn request_body(&self, task_name: &str, metrics: &[String], inputs: &[EvaluationInput]) -> Value {
        serde_json::json!({
            "project_id": self.project_id,
            "task_name": task_name,
            "metrics_list": metrics,
            "input_data": inputs,
        })
    }
}

#[async_trait]
impl EvaluationProvider for InspeqEvaluator {
    fn name(&self) -> &str {
        "Inspeq"
    }

    async fn evaluate(
        &self,
        task_name: &str,
        metrics: &[String],
        inputs: &[EvaluationInput],
    ) -> Result<Value, ProviderError> {
        debug!(
            task = task_name,
            metrics = metrics.len(),
            inputs = inputs.len(),
            "Sending evaluation request"
        );

        let response = self
            .client
            .post(format!("{}{}", self.base_url, EVALUATE_PATH))
            .bearer_auth(self.api_key.expose_secret())
            .json(&self.request_body(task_name, metrics, inputs))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Api {
                status: status.as_u16(),
                body,
            });
        }

        // Shape is interpreted downstream; only require valid JSON here
        let report: Value = response.json().await?;
        info!(task = task_name, "Evaluation completed");
        Ok(report)
    }
}
