//! Routed question-answering over a parsed slide-deck corpus.
//!
//! A user message enters the agent loop, which exposes the
//! router/fan-out/synthesis pipeline to the LLM as a single
//! corpus-query tool. The pipeline routes each query to one or more
//! candidate retrieval engines, merges their responses into a text
//! envelope with inline citations, and the extractor turns that
//! envelope back into structured JSON.
//!
//! ```text
//! agent loop -> (router -> fan-out -> synthesis) -> envelope -> extractor
//! ```
//!
//! See [`workflow`] for the pipeline and agent, [`extract`] for the
//! envelope parser and [`server`] for the HTTP boundary.

pub mod error;
pub mod extract;
pub mod server;
pub mod workflow;

pub use error::WorkflowError;
pub use extract::{CitationDocument, ExtractedResponse, extract};
pub use workflow::{
    AgentOutcome, CandidateEngine, ChatSession, EngineResponse, LlmClient, RouterOutputAgent,
    RouterQueryPipeline, WorkflowConfig,
};
