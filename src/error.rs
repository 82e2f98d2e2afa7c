//! Error types for the deckqa workflow.
//!
//! The taxonomy mirrors the pipeline stages: configuration problems fail
//! fast, routing and engine failures abort the stage that produced them,
//! and citation-fragment parse failures are handled locally in
//! [`crate::extract`] and never surface here.

use thiserror::Error;

/// Errors produced by the workflow engine.
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// A required input field was missing or invalid.
    #[error("Configuration error: {message}")]
    Configuration {
        /// What was missing or invalid.
        message: String,
    },

    /// The router selected a candidate index outside `[1, candidate_count]`.
    ///
    /// Validated before any candidate lookup so an out-of-range choice
    /// can never cause an out-of-bounds index.
    #[error("Router returned out-of-range choice {choice} ({candidate_count} candidates available)")]
    Routing {
        /// The 1-based choice the router returned.
        choice: usize,
        /// How many candidates were actually offered.
        candidate_count: usize,
    },

    /// A candidate engine query failed.
    ///
    /// Aborts the whole fan-out stage: synthesizing from an incomplete
    /// response set would silently degrade answer quality.
    #[error("Candidate engine '{engine}' failed: {message}")]
    EngineQuery {
        /// Identifier of the failing engine (endpoint or description).
        engine: String,
        /// Underlying failure.
        message: String,
    },

    /// An LLM API request failed.
    #[error("API request failed: {message}")]
    ApiRequest {
        /// Provider error message.
        message: String,
    },

    /// An LLM response could not be parsed into the expected schema.
    #[error("Failed to parse model response: {message}")]
    ResponseParse {
        /// Diagnostic message including a content preview.
        message: String,
        /// The raw response content, for debugging.
        content: String,
    },

    /// The run exceeded its wall-clock budget. No partial result is kept.
    #[error("Run exceeded the {budget_secs}s timeout")]
    Timeout {
        /// The configured budget in seconds.
        budget_secs: u64,
    },

    /// Unknown provider name in configuration.
    #[error("Unsupported provider: {name}")]
    UnsupportedProvider {
        /// The provider name that was requested.
        name: String,
    },

    /// No API key found in configuration or environment.
    #[error("No API key configured (set OPENAI_API_KEY or DECKQA_API_KEY)")]
    ApiKeyMissing,

    /// A spawned fan-out task failed to join.
    #[error("Task join failed: {message}")]
    TaskJoin {
        /// Join error message.
        message: String,
    },
}
