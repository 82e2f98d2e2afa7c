//! Candidate engine abstraction.
//!
//! A candidate engine is one retrieval+synthesis strategy the router can
//! select (e.g. whole-document vs. chunk-level retrieval). Retrieval,
//! ranking, and vector storage live behind this trait as opaque external
//! services; the workflow only consumes the response text and its
//! attached source nodes.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::WorkflowError;

/// One retrieved node attached to an engine response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceNode {
    /// Retrieved text content.
    pub text: String,
    /// Arbitrary node metadata (`file_name`, `url`, `page_number`, ...).
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

/// Response from a candidate engine query.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineResponse {
    /// Answer text produced by the engine.
    pub text: String,
    /// Retrieved nodes backing the answer, in retrieval order.
    #[serde(default)]
    pub source_nodes: Vec<SourceNode>,
}

/// A retrieval strategy the router can select.
///
/// Engines are stateless per call and independent of one another, so the
/// fan-out stage may query several concurrently.
#[async_trait]
pub trait CandidateEngine: Send + Sync {
    /// Description used to build the router prompt. Immutable for the
    /// workflow's lifetime; never used for dispatch logic.
    fn description(&self) -> &str;

    /// Answers a query against this engine's retrieval strategy.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError::EngineQuery`] on any transport or
    /// upstream failure.
    async fn query(&self, query: &str) -> Result<EngineResponse, WorkflowError>;
}
