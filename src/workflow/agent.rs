//! Tool-calling agent loop over the router query pipeline.
//!
//! The loop is an explicit state machine:
//!
//! ```text
//! AwaitingInput -> Dispatching -> { ToolFanOut -> ToolFanIn -> Dispatching }
//!                              -> Terminal
//! ```
//!
//! Each `Dispatching` step sends the full history to the LLM with the
//! corpus-query tool attached. Tool calls fan out concurrently through
//! the pipeline; the fan-in gate requires exactly N results before any
//! of them is appended to history. A direct answer terminates the loop.

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures_util::StreamExt;
use futures_util::stream::FuturesUnordered;
use tracing::{debug, info};

use super::message::{ChatMessage, Role, assistant_message, tool_message, user_message};
use super::pipeline::RouterQueryPipeline;
use super::provider::LlmClient;
use super::tool::{ToolCall, ToolDefinition, ToolInvocation, query_corpus_tool};
use crate::error::WorkflowError;

/// One conversation's chat history.
///
/// Owned by the caller and threaded through [`RouterOutputAgent::run`];
/// the agent is the only writer. One session per conversation, never
/// shared across conversations.
#[derive(Debug, Default, Clone)]
pub struct ChatSession {
    messages: Vec<ChatMessage>,
}

impl ChatSession {
    /// Creates an empty session.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All messages accumulated so far.
    #[must_use]
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Clears the history.
    pub fn reset(&mut self) {
        self.messages.clear();
    }

    fn push(&mut self, message: ChatMessage) {
        self.messages.push(message);
    }

    /// Content of the most recent user message, if any.
    #[must_use]
    pub fn last_user_content(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.as_str())
    }
}

/// Result of one agent run.
#[derive(Debug, Clone)]
pub struct AgentOutcome {
    /// Final answer text (a response envelope or combined text).
    pub text: String,
    /// Total tokens spent across all LLM dispatch calls this run.
    pub total_tokens: u32,
    /// Wall-clock duration of the run.
    pub elapsed: Duration,
}

/// Control states of the agent loop.
enum AgentState {
    Dispatching,
    ToolFanOut(Vec<ToolCall>),
    Terminal(String),
}

/// Agent that answers user messages by routing them through the query
/// pipeline when the LLM asks for it.
pub struct RouterOutputAgent {
    llm: Arc<dyn LlmClient>,
    pipeline: Arc<RouterQueryPipeline>,
    tools: Vec<ToolDefinition>,
    timeout: Duration,
}

impl RouterOutputAgent {
    /// Creates an agent over the given LLM and pipeline.
    #[must_use]
    pub fn new(
        llm: Arc<dyn LlmClient>,
        pipeline: Arc<RouterQueryPipeline>,
        timeout: Duration,
    ) -> Self {
        Self {
            llm,
            pipeline,
            tools: vec![query_corpus_tool()],
            timeout,
        }
    }

    /// Runs the agent loop for one user message.
    ///
    /// Appends the message and all intermediate turns to `session`.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError::Configuration`] for an empty message,
    /// [`WorkflowError::Timeout`] when the run exceeds its wall-clock
    /// budget (no partial outcome is produced), and propagates LLM,
    /// routing and engine errors.
    pub async fn run(
        &self,
        session: &mut ChatSession,
        message: &str,
    ) -> Result<AgentOutcome, WorkflowError> {
        if message.trim().is_empty() {
            return Err(WorkflowError::Configuration {
                message: "'message' is required".to_string(),
            });
        }

        let started = Instant::now();
        match tokio::time::timeout(self.timeout, self.run_inner(session, message)).await {
            Ok(result) => {
                let (text, total_tokens) = result?;
                let elapsed = started.elapsed();
                info!(total_tokens, ?elapsed, "agent run complete");
                Ok(AgentOutcome {
                    text,
                    total_tokens,
                    elapsed,
                })
            }
            Err(_) => Err(WorkflowError::Timeout {
                budget_secs: self.timeout.as_secs(),
            }),
        }
    }

    async fn run_inner(
        &self,
        session: &mut ChatSession,
        message: &str,
    ) -> Result<(String, u32), WorkflowError> {
        // AwaitingInput: record the user message, then dispatch.
        session.push(user_message(message));

        let mut total_tokens: u32 = 0;
        let mut state = AgentState::Dispatching;

        loop {
            state = match state {
                AgentState::Dispatching => {
                    let response = self
                        .llm
                        .chat_with_tools(session.messages(), &self.tools)
                        .await?;
                    total_tokens = total_tokens.saturating_add(response.usage.total_tokens);

                    if response.tool_calls.is_empty() {
                        debug!("direct answer, no tool calls");
                        session.push(assistant_message(&response.content, Vec::new()));
                        // The pipeline also runs once against the last
                        // user message and its envelope is folded into
                        // the final text. Intentionally kept: downstream
                        // extraction relies on an envelope being present
                        // even when the model answers directly.
                        let query = session
                            .last_user_content()
                            .unwrap_or(message)
                            .to_string();
                        let envelope = self.pipeline.run(&query).await?;
                        AgentState::Terminal(format!(
                            "{}\n\nPipeline response: {envelope}",
                            response.content
                        ))
                    } else {
                        debug!(count = response.tool_calls.len(), "tool fan-out requested");
                        session.push(assistant_message(
                            &response.content,
                            response.tool_calls.clone(),
                        ));
                        AgentState::ToolFanOut(response.tool_calls)
                    }
                }

                AgentState::ToolFanOut(calls) => {
                    let results = self.fan_out(&calls).await?;
                    // ToolFanIn: history is updated only here, after all
                    // N results arrived. Arrival order is fine because
                    // each message carries its own tool_call_id.
                    for result in results {
                        session.push(result);
                    }
                    AgentState::Dispatching
                }

                AgentState::Terminal(text) => return Ok((text, total_tokens)),
            };
        }
    }

    /// Dispatches all tool calls concurrently and gates on the exact
    /// expected count.
    ///
    /// Returns one tool-role message per call, in arrival order. The
    /// caller must not observe any result until the full set is ready.
    async fn fan_out(&self, calls: &[ToolCall]) -> Result<Vec<ChatMessage>, WorkflowError> {
        let expected = calls.len();

        let mut in_flight: FuturesUnordered<_> = calls
            .iter()
            .map(|call| {
                let pipeline = Arc::clone(&self.pipeline);
                let call = call.clone();
                async move {
                    let ToolInvocation::QueryCorpus { query } = ToolInvocation::parse(&call)?;
                    let envelope = pipeline.run(&query).await?;
                    Ok::<ChatMessage, WorkflowError>(tool_message(&call.id, &call.name, &envelope))
                }
            })
            .collect();

        let mut collected = Vec::with_capacity(expected);
        while let Some(result) = in_flight.next().await {
            collected.push(result?);
        }
        debug_assert_eq!(collected.len(), expected);

        debug!(count = collected.len(), "tool fan-in complete");
        Ok(collected)
    }
}

impl std::fmt::Debug for RouterOutputAgent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouterOutputAgent")
            .field("llm", &self.llm.name())
            .field("tools", &self.tools.len())
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::workflow::engine::{CandidateEngine, EngineResponse};
    use crate::workflow::message::ChatResponse;
    use crate::workflow::router::{Answer, AnswerSet};

    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    /// Scripted LLM: each `chat_with_tools` call pops the next response;
    /// records how many tool-role messages it saw per call.
    struct ScriptedClient {
        script: Mutex<Vec<ChatResponse>>,
        tool_messages_seen: Mutex<Vec<usize>>,
    }

    impl ScriptedClient {
        fn new(mut script: Vec<ChatResponse>) -> Arc<Self> {
            script.reverse();
            Arc::new(Self {
                script: Mutex::new(script),
                tool_messages_seen: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl LlmClient for ScriptedClient {
        fn name(&self) -> &'static str {
            "scripted"
        }

        async fn structured_predict(&self, _prompt: &str) -> Result<AnswerSet, WorkflowError> {
            Ok(AnswerSet {
                answers: vec![Answer {
                    choice: 1,
                    reason: "only engine".to_string(),
                }],
            })
        }

        async fn chat_with_tools(
            &self,
            history: &[ChatMessage],
            _tools: &[ToolDefinition],
        ) -> Result<ChatResponse, WorkflowError> {
            let seen = history.iter().filter(|m| m.role == Role::Tool).count();
            self.tool_messages_seen
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner)
                .push(seen);
            self.script
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner)
                .pop()
                .ok_or_else(|| WorkflowError::ApiRequest {
                    message: "script exhausted".to_string(),
                })
        }

        async fn complete(&self, _prompt: &str) -> Result<String, WorkflowError> {
            Ok("summary".to_string())
        }
    }

    /// Engine whose first few queries are slower than the rest.
    struct StaggeredEngine {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl CandidateEngine for StaggeredEngine {
        fn description(&self) -> &str {
            "Staggered corpus engine"
        }

        async fn query(&self, query: &str) -> Result<EngineResponse, WorkflowError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            // Later calls finish first so arrival order differs from
            // dispatch order.
            tokio::time::sleep(Duration::from_millis(30 * (3 - n.min(3)) as u64)).await;
            Ok(EngineResponse {
                text: format!("engine answer for {query}"),
                source_nodes: Vec::new(),
            })
        }
    }

    fn tool_call(id: &str, query: &str) -> ToolCall {
        ToolCall {
            id: id.to_string(),
            name: crate::workflow::tool::QUERY_CORPUS_TOOL.to_string(),
            arguments: format!(r#"{{"query":"{query}"}}"#),
        }
    }

    fn with_tools(calls: Vec<ToolCall>) -> ChatResponse {
        ChatResponse {
            content: String::new(),
            usage: crate::workflow::message::TokenUsage {
                prompt_tokens: 10,
                completion_tokens: 5,
                total_tokens: 15,
            },
            tool_calls: calls,
        }
    }

    fn direct(text: &str) -> ChatResponse {
        ChatResponse {
            content: text.to_string(),
            usage: crate::workflow::message::TokenUsage {
                prompt_tokens: 10,
                completion_tokens: 5,
                total_tokens: 15,
            },
            tool_calls: Vec::new(),
        }
    }

    fn agent(llm: Arc<ScriptedClient>) -> RouterOutputAgent {
        let engines: Vec<Arc<dyn CandidateEngine>> = vec![Arc::new(StaggeredEngine {
            calls: AtomicUsize::new(0),
        })];
        let pipeline = Arc::new(RouterQueryPipeline::new(
            engines,
            Arc::clone(&llm) as Arc<dyn LlmClient>,
            Duration::from_secs(10),
        ));
        RouterOutputAgent::new(llm, pipeline, Duration::from_secs(10))
    }

    #[tokio::test]
    async fn test_empty_message_fails_fast() {
        let llm = ScriptedClient::new(vec![]);
        let a = agent(Arc::clone(&llm));
        let mut session = ChatSession::new();
        let err = a.run(&mut session, "  ").await.unwrap_err();
        assert!(matches!(err, WorkflowError::Configuration { .. }));
        assert!(session.messages().is_empty());
    }

    #[tokio::test]
    async fn test_fan_in_gates_on_exact_count() {
        // Turn 1 dispatches 3 parallel tool calls; turn 2 answers
        // directly. The second dispatch must already see all 3 tool
        // messages in history, never 2.
        let llm = ScriptedClient::new(vec![
            with_tools(vec![
                tool_call("call_1", "alpha"),
                tool_call("call_2", "beta"),
                tool_call("call_3", "gamma"),
            ]),
            direct("final answer"),
        ]);
        let a = agent(Arc::clone(&llm));
        let mut session = ChatSession::new();
        let outcome = a
            .run(&mut session, "tell me things")
            .await
            .unwrap_or_else(|e| panic!("{e}"));

        let seen = llm
            .tool_messages_seen
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone();
        assert_eq!(seen, vec![0, 3]);
        assert!(outcome.text.contains("final answer"));

        let tool_msgs: Vec<&ChatMessage> = session
            .messages()
            .iter()
            .filter(|m| m.role == Role::Tool)
            .collect();
        assert_eq!(tool_msgs.len(), 3);
        for msg in tool_msgs {
            assert!(msg.tool_call_id.is_some());
            assert!(msg.content.contains("<response>"));
        }
    }

    #[tokio::test]
    async fn test_direct_answer_still_runs_pipeline() {
        let llm = ScriptedClient::new(vec![direct("I know this one")]);
        let a = agent(Arc::clone(&llm));
        let mut session = ChatSession::new();
        let outcome = a
            .run(&mut session, "what about growth?")
            .await
            .unwrap_or_else(|e| panic!("{e}"));

        // Direct text plus the unconditional pipeline envelope.
        assert!(outcome.text.starts_with("I know this one"));
        assert!(outcome.text.contains("Pipeline response:"));
        assert!(outcome.text.contains("<response>"));
        assert!(outcome.text.contains("what about growth?"));
    }

    #[tokio::test]
    async fn test_token_accounting_sums_dispatch_calls() {
        let llm = ScriptedClient::new(vec![
            with_tools(vec![tool_call("call_1", "alpha")]),
            direct("done"),
        ]);
        let a = agent(Arc::clone(&llm));
        let mut session = ChatSession::new();
        let outcome = a
            .run(&mut session, "q")
            .await
            .unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(outcome.total_tokens, 30);
    }

    #[tokio::test]
    async fn test_session_reset_clears_history() {
        let llm = ScriptedClient::new(vec![direct("answer")]);
        let a = agent(Arc::clone(&llm));
        let mut session = ChatSession::new();
        a.run(&mut session, "q")
            .await
            .unwrap_or_else(|e| panic!("{e}"));
        assert!(!session.messages().is_empty());
        session.reset();
        assert!(session.messages().is_empty());
    }

    #[tokio::test]
    async fn test_run_times_out_without_partial_outcome() {
        let llm = ScriptedClient::new(vec![with_tools(vec![tool_call("call_1", "slow")])]);
        let engines: Vec<Arc<dyn CandidateEngine>> = vec![Arc::new(StaggeredEngine {
            calls: AtomicUsize::new(0),
        })];
        let pipeline = Arc::new(RouterQueryPipeline::new(
            engines,
            Arc::clone(&llm) as Arc<dyn LlmClient>,
            Duration::from_secs(10),
        ));
        let a = RouterOutputAgent::new(llm, pipeline, Duration::from_millis(10));
        let mut session = ChatSession::new();
        let err = a.run(&mut session, "q").await.unwrap_err();
        assert!(matches!(err, WorkflowError::Timeout { budget_secs: 0 }));
    }
}
