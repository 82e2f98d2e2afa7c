//! Workflow configuration with builder pattern and environment variable
//! support.
//!
//! Configuration is resolved in order: explicit values → environment
//! variables → defaults.

use std::time::Duration;

use crate::error::WorkflowError;

/// Default wall-clock budget for a full agent run.
const DEFAULT_AGENT_TIMEOUT_SECS: u64 = 60;
/// Default wall-clock budget for one router pipeline invocation.
const DEFAULT_ROUTER_TIMEOUT_SECS: u64 = 10;
/// Default model for all three call sites.
const DEFAULT_MODEL: &str = "gpt-4o";

/// Configuration for the workflow engine.
#[derive(Debug, Clone)]
pub struct WorkflowConfig {
    /// LLM provider name (e.g. "openai").
    pub provider: String,
    /// API key for the provider.
    pub api_key: String,
    /// Optional base URL override (for proxies or compatible APIs).
    pub base_url: Option<String>,
    /// Model for the agent's chat-with-tools dispatch.
    pub agent_model: String,
    /// Model for the router's structured-predict call.
    pub router_model: String,
    /// Model for multi-response summarization.
    pub summarizer_model: String,
    /// Wall-clock budget for a full agent run.
    pub agent_timeout: Duration,
    /// Wall-clock budget for one router pipeline invocation.
    pub router_timeout: Duration,
}

impl WorkflowConfig {
    /// Creates a new builder for `WorkflowConfig`.
    #[must_use]
    pub fn builder() -> WorkflowConfigBuilder {
        WorkflowConfigBuilder::default()
    }

    /// Creates configuration from environment variables with defaults.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError::ApiKeyMissing`] if no API key is found.
    pub fn from_env() -> Result<Self, WorkflowError> {
        Self::builder().from_env().build()
    }
}

/// Builder for [`WorkflowConfig`].
#[derive(Debug, Clone, Default)]
pub struct WorkflowConfigBuilder {
    provider: Option<String>,
    api_key: Option<String>,
    base_url: Option<String>,
    agent_model: Option<String>,
    router_model: Option<String>,
    summarizer_model: Option<String>,
    agent_timeout: Option<Duration>,
    router_timeout: Option<Duration>,
}

impl WorkflowConfigBuilder {
    /// Populates unset fields from environment variables.
    #[must_use]
    pub fn from_env(mut self) -> Self {
        if self.provider.is_none() {
            self.provider = std::env::var("DECKQA_PROVIDER").ok();
        }
        if self.api_key.is_none() {
            self.api_key = std::env::var("OPENAI_API_KEY")
                .or_else(|_| std::env::var("DECKQA_API_KEY"))
                .ok();
        }
        if self.base_url.is_none() {
            self.base_url = std::env::var("OPENAI_BASE_URL")
                .or_else(|_| std::env::var("DECKQA_BASE_URL"))
                .ok();
        }
        if self.agent_model.is_none() {
            self.agent_model = std::env::var("DECKQA_AGENT_MODEL").ok();
        }
        if self.router_model.is_none() {
            self.router_model = std::env::var("DECKQA_ROUTER_MODEL").ok();
        }
        if self.summarizer_model.is_none() {
            self.summarizer_model = std::env::var("DECKQA_SUMMARIZER_MODEL").ok();
        }
        if self.agent_timeout.is_none() {
            self.agent_timeout = std::env::var("DECKQA_AGENT_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_secs);
        }
        if self.router_timeout.is_none() {
            self.router_timeout = std::env::var("DECKQA_ROUTER_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_secs);
        }
        self
    }

    /// Sets the LLM provider name.
    #[must_use]
    pub fn provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    /// Sets the API key.
    #[must_use]
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Sets the base URL override.
    #[must_use]
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Sets the agent dispatch model.
    #[must_use]
    pub fn agent_model(mut self, model: impl Into<String>) -> Self {
        self.agent_model = Some(model.into());
        self
    }

    /// Sets the router model.
    #[must_use]
    pub fn router_model(mut self, model: impl Into<String>) -> Self {
        self.router_model = Some(model.into());
        self
    }

    /// Sets the summarizer model.
    #[must_use]
    pub fn summarizer_model(mut self, model: impl Into<String>) -> Self {
        self.summarizer_model = Some(model.into());
        self
    }

    /// Sets the agent run timeout.
    #[must_use]
    pub const fn agent_timeout(mut self, timeout: Duration) -> Self {
        self.agent_timeout = Some(timeout);
        self
    }

    /// Sets the router pipeline timeout.
    #[must_use]
    pub const fn router_timeout(mut self, timeout: Duration) -> Self {
        self.router_timeout = Some(timeout);
        self
    }

    /// Builds the [`WorkflowConfig`].
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError::ApiKeyMissing`] if no API key was set.
    pub fn build(self) -> Result<WorkflowConfig, WorkflowError> {
        let api_key = self.api_key.ok_or(WorkflowError::ApiKeyMissing)?;

        Ok(WorkflowConfig {
            provider: self.provider.unwrap_or_else(|| "openai".to_string()),
            api_key,
            base_url: self.base_url,
            agent_model: self.agent_model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            router_model: self
                .router_model
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            summarizer_model: self
                .summarizer_model
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            agent_timeout: self
                .agent_timeout
                .unwrap_or(Duration::from_secs(DEFAULT_AGENT_TIMEOUT_SECS)),
            router_timeout: self
                .router_timeout
                .unwrap_or(Duration::from_secs(DEFAULT_ROUTER_TIMEOUT_SECS)),
        })
    }
}
