//! Tool types for the agent loop.
//!
//! The agent exposes exactly one tool to the model: `query_corpus`, which
//! runs the router/fan-out/synthesis pipeline against the slide-deck
//! corpus. Tool dispatch is a closed union ([`ToolInvocation`]) rather
//! than an open registry, so every supported call has an explicit
//! argument schema.

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::WorkflowError;

/// Name of the corpus-query tool as seen by the model.
pub const QUERY_CORPUS_TOOL: &str = "query_corpus";

/// A tool definition that can be sent to an LLM for function-calling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Tool name (must match a [`ToolInvocation`] variant).
    pub name: String,
    /// Human-readable description of what the tool does.
    pub description: String,
    /// JSON Schema object describing the tool's parameters.
    pub parameters: serde_json::Value,
}

/// A tool call requested by the LLM.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    /// Unique identifier for this call (assigned by the provider).
    pub id: String,
    /// Name of the tool to invoke.
    pub name: String,
    /// JSON-encoded arguments for the tool.
    pub arguments: String,
}

/// Defines the `query_corpus` tool.
#[must_use]
pub fn query_corpus_tool() -> ToolDefinition {
    ToolDefinition {
        name: QUERY_CORPUS_TOOL.to_string(),
        description: "Answers a question from the slide-deck corpus. Routes the query to the \
                      most suitable retrieval strategy (whole-document summarization or \
                      chunk-level lookup), queries the selected strategies, and returns a \
                      synthesized answer with source citations. Call it once per independent \
                      question; multiple calls run in parallel."
            .to_string(),
        parameters: json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "The question to answer from the corpus."
                }
            },
            "required": ["query"],
            "additionalProperties": false
        }),
    }
}

/// Arguments accepted by `query_corpus`.
#[derive(Debug, Deserialize)]
struct QueryCorpusArgs {
    #[serde(alias = "query_str")]
    query: String,
}

/// A parsed, validated tool call. Closed set: unknown tool names are a
/// dispatch error, not a lookup miss.
#[derive(Debug, Clone)]
pub enum ToolInvocation {
    /// Run the corpus-query pipeline with the given question.
    QueryCorpus {
        /// The question to answer.
        query: String,
    },
}

impl ToolInvocation {
    /// Parses a raw [`ToolCall`] into a typed invocation.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError::Configuration`] for unknown tool names or
    /// arguments that do not match the tool's schema.
    pub fn parse(call: &ToolCall) -> Result<Self, WorkflowError> {
        match call.name.as_str() {
            QUERY_CORPUS_TOOL => {
                let args: QueryCorpusArgs = serde_json::from_str(&call.arguments).map_err(|e| {
                    WorkflowError::Configuration {
                        message: format!("invalid arguments for {QUERY_CORPUS_TOOL}: {e}"),
                    }
                })?;
                Ok(Self::QueryCorpus { query: args.query })
            }
            other => Err(WorkflowError::Configuration {
                message: format!("unknown tool requested by model: {other}"),
            }),
        }
    }
}
