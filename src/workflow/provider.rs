//! Pluggable LLM client trait.
//!
//! The workflow needs three distinct LLM operations: a constrained
//! structured-predict call for routing, a chat-with-tools call for the
//! agent loop, and a plain completion for multi-response synthesis.
//! Implementations translate these into provider-specific SDK calls,
//! keeping all workflow logic decoupled from any particular vendor.

use async_trait::async_trait;

use super::message::{ChatMessage, ChatResponse};
use super::router::AnswerSet;
use super::tool::ToolDefinition;
use crate::error::WorkflowError;

/// Trait for LLM backends consumed by the workflow.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Provider name (e.g. `"openai"`).
    fn name(&self) -> &'static str;

    /// Runs the router prompt with constrained decoding, returning a
    /// typed [`AnswerSet`].
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError::ApiRequest`] on transport failures and
    /// [`WorkflowError::ResponseParse`] if the constrained output does
    /// not deserialize. No retry is attempted at this layer; failures
    /// propagate to the caller.
    async fn structured_predict(&self, prompt: &str) -> Result<AnswerSet, WorkflowError>;

    /// Sends the full conversation history with the given tool
    /// definitions. The model may answer directly or request one or more
    /// parallel tool calls.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError::ApiRequest`] on API failures.
    async fn chat_with_tools(
        &self,
        history: &[ChatMessage],
        tools: &[ToolDefinition],
    ) -> Result<ChatResponse, WorkflowError>;

    /// Runs a plain completion (used for multi-response summarization).
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError::ApiRequest`] on API failures.
    async fn complete(&self, prompt: &str) -> Result<String, WorkflowError>;
}
