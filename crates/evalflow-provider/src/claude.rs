use async_trait::async_trait;
use std::path::PathBuf;
use tracing::debug;

use crate::{
    generation_payload, GeneratorConfig, ProcessSpawner, ProviderError, TextGenerationProvider,
};

/// Generates text through the local `claude` CLI in print mode
pub struct ClaudeCliGenerator {
    binary_path: PathBuf,
    config: GeneratorConfig,
}

impl ClaudeCliGenerator {
    pub fn new(config: GeneratorConfig) -> Self {
        let binary_path = config
            .binary_path
            .clone()
            .unwrap_or_else(|| PathBuf::from("claude"));
        Self {
            binary_path,
            config,
        }
    }

    fn build_args<'a>(&'a self, payload: &'a str) -> Vec<&'a str> {
        let mut args = vec!["--print", "--model", self.config.model.as_str()];
        // End of options; payloads starting with '-' stay positional
        args.push("--");
        args.push(payload);
        args
    }
}

#[async_trait]
impl TextGenerationProvider for ClaudeCliGenerator {
    fn name(&self) -> &str {
        "Claude CLI"
    }

    async fn generate(&self, prompt: &str, context: &str) -> Result<String, ProviderError> {
        let payload = generation_payload(prompt, context);
        debug!(
            provider = self.name(),
            payload_len = payload.len(),
            "Requesting generation"
        );

        let args = self.build_args(&payload);
        let output = ProcessSpawner::spawn(&self.binary_path, &args, &self.config).await?;

        if !output.success() {
            return Err(ProviderError::ProcessFailed {
                code: output.exit_code,
                stderr: output.stderr,
            });
        }

        Ok(output.stdout.trim().to_string())
    }
}
