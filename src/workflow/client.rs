//! Provider registry and factory.
//!
//! Maps provider names to concrete [`LlmClient`] implementations.

use std::sync::Arc;

use crate::error::WorkflowError;
use crate::workflow::config::WorkflowConfig;
use crate::workflow::provider::LlmClient;
use crate::workflow::providers::OpenAiClient;

/// Creates an [`LlmClient`] based on the configured provider name.
///
/// # Supported Providers
///
/// - `"openai"` (default) — `OpenAI`-compatible APIs via `async-openai`
///
/// # Errors
///
/// Returns [`WorkflowError::UnsupportedProvider`] for unknown names.
pub fn create_client(config: &WorkflowConfig) -> Result<Arc<dyn LlmClient>, WorkflowError> {
    match config.provider.as_str() {
        "openai" => Ok(Arc::new(OpenAiClient::new(config))),
        other => Err(WorkflowError::UnsupportedProvider {
            name: other.to_string(),
        }),
    }
}
