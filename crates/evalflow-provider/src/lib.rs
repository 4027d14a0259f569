//! # evalflow-provider
//!
//! Interfaces to the two external capabilities an evaluation flow depends on:
//! a [`TextGenerationProvider`] and an [`EvaluationProvider`], plus concrete
//! HTTP and CLI backed implementations.

mod anthropic;
mod claude;
mod inspeq;
mod output;
mod spawner;
mod traits;

pub use anthropic::{AnthropicGenerator, ANTHROPIC_BASE_URL};
pub use claude::ClaudeCliGenerator;
pub use inspeq::{InspeqEvaluator, INSPEQ_BASE_URL};
pub use output::ProcessOutput;
pub use spawner::ProcessSpawner;
pub use traits::{
    generation_payload, EvaluationInput, EvaluationProvider, GeneratorConfig, ProviderError,
    ProviderKind, TextGenerationProvider, DEFAULT_MAX_TOKENS, DEFAULT_MODEL,
};

use secrecy::SecretString;

/// Create a text generation provider by kind.
///
/// The Anthropic backend requires an API key; the CLI backend ignores it.
pub fn create_generator(
    kind: ProviderKind,
    config: GeneratorConfig,
    api_key: Option<SecretString>,
) -> Result<Box<dyn TextGenerationProvider>, ProviderError> {
    match kind {
        ProviderKind::Anthropic => {
            let key = api_key.ok_or_else(|| {
                ProviderError::ConfigError("Anthropic provider requires an API key".to_string())
            })?;
            Ok(Box::new(AnthropicGenerator::new(key, config)?))
        }
        ProviderKind::ClaudeCli => Ok(Box::new(ClaudeCliGenerator::new(config))),
    }
}
