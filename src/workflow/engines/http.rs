//! HTTP-backed candidate engine.
//!
//! Talks to an external retrieval service: `POST {endpoint}` with
//! `{"query": "..."}`, expecting an [`EngineResponse`] JSON body. The
//! retrieval strategy itself (document-level vs. chunk-level, ranking,
//! embeddings) is entirely the remote service's concern.

use async_trait::async_trait;
use serde_json::json;

use super::super::engine::{CandidateEngine, EngineResponse};
use crate::error::WorkflowError;

/// Candidate engine backed by a remote retrieval endpoint.
pub struct HttpEngine {
    client: reqwest::Client,
    endpoint: String,
    description: String,
}

impl HttpEngine {
    /// Creates an engine for the given endpoint with a router-facing
    /// description.
    #[must_use]
    pub fn new(endpoint: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
            description: description.into(),
        }
    }

    fn engine_error(&self, message: impl std::fmt::Display) -> WorkflowError {
        WorkflowError::EngineQuery {
            engine: self.endpoint.clone(),
            message: message.to_string(),
        }
    }
}

impl std::fmt::Debug for HttpEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpEngine")
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl CandidateEngine for HttpEngine {
    fn description(&self) -> &str {
        &self.description
    }

    async fn query(&self, query: &str) -> Result<EngineResponse, WorkflowError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&json!({ "query": query }))
            .send()
            .await
            .map_err(|e| self.engine_error(e))?
            .error_for_status()
            .map_err(|e| self.engine_error(e))?;

        response
            .json::<EngineResponse>()
            .await
            .map_err(|e| self.engine_error(format!("invalid response body: {e}")))
    }
}
