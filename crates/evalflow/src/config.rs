//! Project configuration file support for evalflow.
//!
//! Loads configuration from `evalflow.toml` in the working directory.
//! Secrets never live in the file; they come from the environment.

use anyhow::{Context, Result};
use secrecy::SecretString;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use evalflow_provider::ProviderKind;

/// Project-level configuration loaded from `evalflow.toml`
#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct ProjectConfig {
    #[serde(default)]
    pub generator: GeneratorSection,
    #[serde(default)]
    pub evaluator: EvaluatorSection,
    #[serde(default)]
    pub retry: RetrySection,
    #[serde(default)]
    pub metrics: MetricsSection,
    #[serde(default)]
    pub output: OutputSection,
}

/// Text generation backend
#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct GeneratorSection {
    /// `anthropic` or `claude-cli`
    pub provider: Option<String>,
    pub model: Option<String>,
    pub max_tokens: Option<u32>,
    /// Per-request limit; unset means no limit
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct EvaluatorSection {
    pub base_url: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct RetrySection {
    pub max_retries: Option<usize>,
    pub base_delay_secs: Option<f64>,
}

/// Metric lists for the two evaluation stages
#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct MetricsSection {
    pub prompt: Option<Vec<String>>,
    pub response: Option<Vec<String>>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct OutputSection {
    pub results_dir: Option<PathBuf>,
}

/// The config file name
pub const CONFIG_FILE_NAME: &str = "evalflow.toml";

pub const CLAUDE_API_KEY_VAR: &str = "CLAUDE_API_KEY";
pub const ANTHROPIC_API_KEY_VAR: &str = "ANTHROPIC_API_KEY";
pub const INSPEQ_API_KEY_VAR: &str = "INSPEQ_API_KEY";
pub const INSPEQ_PROJECT_ID_VAR: &str = "INSPEQ_PROJECT_ID";

impl ProjectConfig {
    /// Load configuration from the working directory.
    ///
    /// Returns:
    /// - `Ok(Some(config))` if file exists and parses successfully
    /// - `Ok(None)` if file does not exist
    /// - `Err(...)` if file exists but fails to parse (hard error)
    pub fn load(working_dir: &Path) -> Result<Option<Self>> {
        let config_path = working_dir.join(CONFIG_FILE_NAME);

        if !config_path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read {}", config_path.display()))?;

        let config = Self::parse(&content)
            .with_context(|| format!("Failed to parse {}", config_path.display()))?;

        Ok(Some(config))
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Priority: CLI flag > [generator].provider > anthropic
    pub fn provider_kind(&self, cli: Option<ProviderKind>) -> Result<ProviderKind> {
        if let Some(kind) = cli {
            return Ok(kind);
        }
        match self.generator.provider.as_deref() {
            Some(name) => name
                .parse()
                .map_err(|e: String| anyhow::anyhow!("Invalid [generator].provider: {}", e)),
            None => Ok(ProviderKind::Anthropic),
        }
    }

    /// Priority: CLI flag > [retry].max_retries > None (library default)
    pub fn max_retries(&self, cli: Option<usize>) -> Option<usize> {
        cli.or(self.retry.max_retries)
    }

    /// Base backoff delay from `[retry].base_delay_secs`, if set and valid
    pub fn base_delay(&self) -> Result<Option<Duration>> {
        match self.retry.base_delay_secs {
            Some(secs) => Duration::try_from_secs_f64(secs)
                .map(Some)
                .with_context(|| format!("Invalid [retry].base_delay_secs: {}", secs)),
            None => Ok(None),
        }
    }

    /// Priority: CLI flags (if any) > [metrics].prompt > None (library default)
    pub fn prompt_metrics(&self, cli: &[String]) -> Option<Vec<String>> {
        if !cli.is_empty() {
            return Some(cli.to_vec());
        }
        self.metrics.prompt.clone()
    }

    /// Priority: CLI flags (if any) > [metrics].response > None (library default)
    pub fn response_metrics(&self, cli: &[String]) -> Option<Vec<String>> {
        if !cli.is_empty() {
            return Some(cli.to_vec());
        }
        self.metrics.response.clone()
    }

    /// Relative paths resolve against the working directory
    pub fn results_dir(&self, cli: Option<&Path>, working_dir: &Path) -> Option<PathBuf> {
        let dir = cli.map(Path::to_path_buf).or_else(|| self.output.results_dir.clone())?;
        if dir.is_absolute() {
            Some(dir)
        } else {
            Some(working_dir.join(dir))
        }
    }
}

/// Credentials read from the environment
pub struct Secrets {
    pub generator_key: Option<SecretString>,
    pub evaluator_key: Option<SecretString>,
    pub project_id: Option<String>,
}

impl Secrets {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Empty values count as unset
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        Self {
            generator_key: get(CLAUDE_API_KEY_VAR)
                .or_else(|| get(ANTHROPIC_API_KEY_VAR))
                .map(SecretString::new),
            evaluator_key: get(INSPEQ_API_KEY_VAR).map(SecretString::new),
            project_id: get(INSPEQ_PROJECT_ID_VAR),
        }
    }

    pub fn require_evaluator(&self) -> Result<(SecretString, String)> {
        let key = self
            .evaluator_key
            .clone()
            .with_context(|| format!("{} is not set", INSPEQ_API_KEY_VAR))?;
        let project_id = self
            .project_id
            .clone()
            .with_context(|| format!("{} is not set", INSPEQ_PROJECT_ID_VAR))?;
        Ok((key, project_id))
    }

    /// Only the Anthropic backend needs a key
    pub fn require_generator(&self, kind: ProviderKind) -> Result<Option<SecretString>> {
        match kind {
            ProviderKind::Anthropic => self
                .generator_key
                .clone()
                .map(Some)
                .with_context(|| format!("{} is not set", CLAUDE_API_KEY_VAR)),
            ProviderKind::ClaudeCli => Ok(None),
        }
    }
}
