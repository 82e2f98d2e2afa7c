//! Agentic query workflow: router, fan-out, synthesis and the agent loop.
//!
//! The pieces compose bottom-up:
//!
//! - [`engine`] defines the candidate-engine seam ([`engines::http`] is
//!   the stock implementation),
//! - [`provider`] defines the LLM seam ([`providers::openai`] is the
//!   stock implementation, created through [`client::create_client`]),
//! - [`pipeline`] wires router, fan-out and synthesis into one
//!   query-to-envelope call,
//! - [`agent`] exposes the pipeline as a tool inside a chat loop.

pub mod agent;
pub mod client;
pub mod config;
pub mod engine;
pub mod engines;
pub mod message;
pub mod pipeline;
pub mod prompt;
pub mod provider;
pub mod providers;
pub mod router;
pub mod tool;

pub use agent::{AgentOutcome, ChatSession, RouterOutputAgent};
pub use config::WorkflowConfig;
pub use engine::{CandidateEngine, EngineResponse, SourceNode};
pub use pipeline::{RouterQueryPipeline, SourceRecord};
pub use provider::LlmClient;
pub use router::{Answer, AnswerSet};
