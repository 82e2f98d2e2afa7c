//! Router query pipeline: choose → fan-out → synthesize.
//!
//! One pipeline invocation answers one query. The router picks candidate
//! engines with a constrained LLM call, the fan-out stage queries every
//! selected engine concurrently (results ordered by answer index, never
//! by completion), and the synthesis stage merges the responses and
//! wraps them in the `<response>`/`<source>` text envelope consumed by
//! [`crate::extract`].

use std::fmt::Write;
use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use super::engine::{CandidateEngine, EngineResponse, SourceNode};
use super::prompt::{build_router_prompt, build_summary_prompt};
use super::provider::LlmClient;
use super::router::AnswerSet;
use crate::error::WorkflowError;

/// One citation record collected from an engine's source nodes.
///
/// Field names match the metadata keys the parsing service stamps on
/// each node; `page` stays a JSON value because upstream metadata mixes
/// numbers and strings (`2` vs `"N/A"`).
#[derive(Debug, Clone, PartialEq)]
pub struct SourceRecord {
    /// Originating file name (`"Unknown"` when absent).
    pub file_name: String,
    /// Public URL of the document (`"Unknown"` when absent).
    pub url: String,
    /// Page number, or `"N/A"` when absent.
    pub page: serde_json::Value,
    /// Retrieved node text. Carried in the envelope but stripped again
    /// by the extractor.
    pub content: String,
}

impl SourceRecord {
    /// Builds a record from a source node's metadata.
    #[must_use]
    pub fn from_node(node: &SourceNode) -> Self {
        let get_str = |key: &str| {
            node.metadata
                .get(key)
                .and_then(serde_json::Value::as_str)
                .unwrap_or("Unknown")
                .to_string()
        };
        Self {
            file_name: get_str("file_name"),
            url: get_str("url"),
            page: node
                .metadata
                .get("page_number")
                .cloned()
                .unwrap_or_else(|| serde_json::Value::String("N/A".to_string())),
            content: node.text.clone(),
        }
    }
}

/// The router/fan-out/synthesis pipeline over a fixed set of candidate
/// engines.
pub struct RouterQueryPipeline {
    engines: Vec<Arc<dyn CandidateEngine>>,
    llm: Arc<dyn LlmClient>,
    timeout: Duration,
}

impl RouterQueryPipeline {
    /// Creates a pipeline over the given engines.
    ///
    /// Engine order is significant: router choices are 1-based indices
    /// into this list.
    #[must_use]
    pub fn new(
        engines: Vec<Arc<dyn CandidateEngine>>,
        llm: Arc<dyn LlmClient>,
        timeout: Duration,
    ) -> Self {
        Self {
            engines,
            llm,
            timeout,
        }
    }

    /// Runs the full pipeline for one query, producing a response
    /// envelope.
    ///
    /// # Errors
    ///
    /// Propagates stage errors (§ error taxonomy) and returns
    /// [`WorkflowError::Timeout`] if the whole invocation exceeds the
    /// configured budget. No partial result is produced on timeout.
    pub async fn run(&self, query: &str) -> Result<String, WorkflowError> {
        match tokio::time::timeout(self.timeout, self.run_inner(query)).await {
            Ok(result) => result,
            Err(_) => Err(WorkflowError::Timeout {
                budget_secs: self.timeout.as_secs(),
            }),
        }
    }

    async fn run_inner(&self, query: &str) -> Result<String, WorkflowError> {
        let answers = self.choose(query).await?;
        let responses = self.query_all(query, &answers).await?;
        self.synthesize(query, &responses).await
    }

    /// Router stage: asks the LLM to select candidate engines.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError::Configuration`] for an empty query or an
    /// empty selection, [`WorkflowError::Routing`] for out-of-range
    /// choices, and propagates LLM failures unretried.
    pub async fn choose(&self, query: &str) -> Result<AnswerSet, WorkflowError> {
        if query.trim().is_empty() {
            return Err(WorkflowError::Configuration {
                message: "'query' is required".to_string(),
            });
        }
        if self.engines.is_empty() {
            return Err(WorkflowError::Configuration {
                message: "pipeline has no candidate engines".to_string(),
            });
        }

        let descriptions: Vec<&str> = self.engines.iter().map(|e| e.description()).collect();
        let prompt = build_router_prompt(query, &descriptions);

        let answers = self.llm.structured_predict(&prompt).await?;
        answers.validate(self.engines.len())?;

        for answer in &answers.answers {
            debug!(choice = answer.choice, reason = %answer.reason, "router selected candidate");
        }

        Ok(answers)
    }

    /// Fan-out stage: queries every selected engine concurrently.
    ///
    /// Results are returned in answer order regardless of completion
    /// order — citation ordering and synthesis reproducibility depend on
    /// this. One failing engine aborts the whole stage: synthesizing
    /// from an incomplete response set would silently degrade answer
    /// quality without signaling it.
    ///
    /// # Errors
    ///
    /// Returns the first [`WorkflowError::EngineQuery`] in answer order,
    /// or [`WorkflowError::TaskJoin`] if a spawned query panics.
    pub async fn query_all(
        &self,
        query: &str,
        answers: &AnswerSet,
    ) -> Result<Vec<EngineResponse>, WorkflowError> {
        answers.validate(self.engines.len())?;

        // Spawn in answer order, await in the same order: completion
        // order never leaks into the result sequence.
        let mut handles = Vec::with_capacity(answers.answers.len());
        for answer in &answers.answers {
            let engine = Arc::clone(&self.engines[answer.choice - 1]);
            let q = query.to_string();
            handles.push(tokio::spawn(async move { engine.query(&q).await }));
        }

        let mut responses = Vec::with_capacity(handles.len());
        for handle in handles {
            let response = handle.await.map_err(|e| WorkflowError::TaskJoin {
                message: e.to_string(),
            })??;
            responses.push(response);
        }

        debug!(count = responses.len(), "fan-out complete");
        Ok(responses)
    }

    /// Synthesis stage: merges responses and renders the envelope.
    ///
    /// A single response passes through unchanged — no summarization
    /// call is made when routing was unambiguous. Source records are
    /// collected across all responses in response order, then node order;
    /// a response without source nodes contributes zero records.
    ///
    /// # Errors
    ///
    /// Propagates summarizer LLM failures.
    pub async fn synthesize(
        &self,
        query: &str,
        responses: &[EngineResponse],
    ) -> Result<String, WorkflowError> {
        let records: Vec<SourceRecord> = responses
            .iter()
            .flat_map(|r| r.source_nodes.iter().map(SourceRecord::from_node))
            .collect();

        let text = if responses.len() == 1 {
            responses[0].text.clone()
        } else {
            let texts: Vec<&str> = responses.iter().map(|r| r.text.as_str()).collect();
            self.llm
                .complete(&build_summary_prompt(query, &texts))
                .await?
        };

        Ok(render_envelope(query, &text, &records))
    }
}

impl std::fmt::Debug for RouterQueryPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouterQueryPipeline")
            .field("engines", &self.engines.len())
            .field("llm", &self.llm.name())
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Renders the response envelope: answer text in `<response>` tags and
/// the citation list in `<source>` tags.
///
/// This is a deliberately loose, human/LLM-readable format (the envelope
/// travels through chat history and further LLM calls), not a strict
/// wire protocol. [`crate::extract`] parses it defensively.
#[must_use]
pub fn render_envelope(query: &str, text: &str, records: &[SourceRecord]) -> String {
    format!(
        "Answer to your query: {query}\n\n\
         <response>\n{text}\n</response>\n\n\
         <source>\n{}\n</source>\n\n",
        render_source_list(records)
    )
}

/// Renders source records as a single-quoted, repr-like list of mappings.
///
/// Strings are single-quoted with `\'` escapes; newlines in `content`
/// are kept raw. Numeric pages render bare, string pages quoted.
fn render_source_list(records: &[SourceRecord]) -> String {
    let mut out = String::from("[");
    for (idx, record) in records.iter().enumerate() {
        if idx > 0 {
            out.push_str(", ");
        }
        let _ = write!(
            out,
            "{{'file_name': {}, 'url': {}, 'page': {}, 'content': {}}}",
            repr_str(&record.file_name),
            repr_str(&record.url),
            repr_value(&record.page),
            repr_str(&record.content),
        );
    }
    out.push(']');
    out
}

fn repr_str(s: &str) -> String {
    format!("'{}'", s.replace('\\', "\\\\").replace('\'', "\\'"))
}

fn repr_value(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => repr_str(s),
        other => other.to_string(),
    }
}
