use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur when calling an external provider
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Failed to spawn provider process: {0}")]
    SpawnFailed(#[from] std::io::Error),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Provider returned status {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Provider process exited with code {code}: {stderr}")]
    ProcessFailed { code: i32, stderr: String },

    #[error("Invalid provider response: {0}")]
    InvalidResponse(String),

    #[error("Provider did not respond within {0:?}")]
    Timeout(Duration),

    #[error("Provider returned an empty generation result")]
    EmptyResult,

    #[error("Provider configuration error: {0}")]
    ConfigError(String),
}

/// One row of input sent to the evaluation provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationInput {
    pub prompt: String,
    pub response: String,
    pub context: String,
}

impl EvaluationInput {
    /// Input for a pre-generation check; the response is not known yet.
    pub fn for_prompt(prompt: &str, context: &str) -> Self {
        Self {
            prompt: prompt.to_string(),
            response: String::new(),
            context: context.to_string(),
        }
    }

    pub fn for_response(prompt: &str, response: &str, context: &str) -> Self {
        Self {
            prompt: prompt.to_string(),
            response: response.to_string(),
            context: context.to_string(),
        }
    }
}

/// Configuration for text generation providers
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    /// Model identifier passed to the provider
    pub model: String,
    /// Upper bound on generated tokens
    pub max_tokens: u32,
    /// Optional request timeout (None = client default)
    pub timeout: Option<Duration>,
    /// API base URL for HTTP providers
    pub base_url: Option<String>,
    /// Binary to run for CLI providers
    pub binary_path: Option<PathBuf>,
    /// Working directory for CLI providers
    pub working_dir: Option<PathBuf>,
    /// Additional environment variables for CLI providers
    pub env_vars: HashMap<String, String>,
}

pub const DEFAULT_MODEL: &str = "claude-3-5-sonnet-latest";
pub const DEFAULT_MAX_TOKENS: u32 = 1500;

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            timeout: None,
            base_url: None,
            binary_path: None,
            working_dir: None,
            env_vars: HashMap::new(),
        }
    }
}

impl GeneratorConfig {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..Default::default()
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn with_binary_path(mut self, path: PathBuf) -> Self {
        self.binary_path = Some(path);
        self
    }

    pub fn with_working_dir(mut self, dir: PathBuf) -> Self {
        self.working_dir = Some(dir);
        self
    }

    pub fn with_env(mut self, key: String, value: String) -> Self {
        self.env_vars.insert(key, value);
        self
    }
}

/// Supported text generation backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    /// Anthropic Messages API over HTTP
    Anthropic,
    /// Local `claude` CLI in print mode
    ClaudeCli,
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderKind::Anthropic => write!(f, "anthropic"),
            ProviderKind::ClaudeCli => write!(f, "claude-cli"),
        }
    }
}

impl std::str::FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "anthropic" | "claude-api" => Ok(ProviderKind::Anthropic),
            "claude-cli" | "claude-code" | "claude" => Ok(ProviderKind::ClaudeCli),
            _ => Err(format!("Unknown provider: {}", s)),
        }
    }
}

/// Builds the single user message sent to generation backends.
pub fn generation_payload(prompt: &str, context: &str) -> String {
    format!(
        "Leverage the context:{} to execute the following prompt:{}",
        context, prompt
    )
}

/// A remote capability that turns a prompt plus context into text.
///
/// Implementations must be safe to call repeatedly with the same input; the
/// flow runner retries failed calls without any deduplication.
#[async_trait]
pub trait TextGenerationProvider: Send + Sync {
    /// Human-readable name (e.g., "Anthropic API")
    fn name(&self) -> &str;

    async fn generate(&self, prompt: &str, context: &str) -> Result<String, ProviderError>;
}

/// A remote capability that scores prompts and responses against named metrics.
///
/// The returned value is the provider's raw report. Its shape is not
/// guaranteed; `evalflow-report` is responsible for interpreting it.
#[async_trait]
pub trait EvaluationProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn evaluate(
        &self,
        task_name: &str,
        metrics: &[String],
        inputs: &[EvaluationInput],
    ) -> Result<serde_json::Value, ProviderError>;
}
