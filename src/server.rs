//! HTTP boundary for the query workflow.
//!
//! One endpoint, `POST /query`, accepts `{"message": "..."}`, runs the
//! agent loop and returns `{"response": {...}}` with the extracted
//! answer and citations. Internal errors become a JSON error body with
//! an appropriate status; no partial or streaming responses.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::error::WorkflowError;
use crate::extract::extract;
use crate::workflow::{ChatSession, RouterOutputAgent};

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    agent: Arc<RouterOutputAgent>,
}

impl AppState {
    /// Creates state around a configured agent.
    #[must_use]
    pub fn new(agent: Arc<RouterOutputAgent>) -> Self {
        Self { agent }
    }
}

#[derive(Debug, Deserialize)]
struct QueryRequest {
    message: String,
}

/// Builds the application router.
#[must_use]
pub fn build_app(state: AppState) -> Router {
    Router::new()
        .route("/query", post(query_endpoint))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Binds and serves until shutdown.
///
/// # Errors
///
/// Returns an error if the listener cannot bind or the server fails.
pub async fn serve(state: AppState, addr: &str) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "listening");
    axum::serve(listener, build_app(state)).await?;
    Ok(())
}

/// `POST /query`: runs one agent conversation and returns structured
/// output.
///
/// Each request gets its own session; conversations do not persist
/// across requests and concurrent requests never share history.
async fn query_endpoint(
    State(state): State<AppState>,
    Json(request): Json<QueryRequest>,
) -> Response {
    let mut session = ChatSession::new();

    match state.agent.run(&mut session, &request.message).await {
        Ok(outcome) => {
            let extracted = extract(&outcome.text);
            Json(json!({ "response": extracted })).into_response()
        }
        Err(e) => {
            error!(error = %e, "query failed");
            let status = match e {
                WorkflowError::Configuration { .. } => StatusCode::BAD_REQUEST,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            };
            (status, Json(json!({ "detail": e.to_string() }))).into_response()
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::workflow::engine::{CandidateEngine, EngineResponse, SourceNode};
    use crate::workflow::message::{ChatMessage, ChatResponse, TokenUsage};
    use crate::workflow::pipeline::RouterQueryPipeline;
    use crate::workflow::provider::LlmClient;
    use crate::workflow::router::{Answer, AnswerSet};
    use crate::workflow::tool::{QUERY_CORPUS_TOOL, ToolCall, ToolDefinition};

    use std::time::Duration;

    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{Request, header};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    /// LLM stub: always requests one corpus query, then answers
    /// directly.
    struct StubClient {
        turn: std::sync::atomic::AtomicUsize,
    }

    #[async_trait]
    impl LlmClient for StubClient {
        fn name(&self) -> &'static str {
            "stub"
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
            _history: &[ChatMessage],
            _tools: &[ToolDefinition],
        ) -> Result<ChatResponse, WorkflowError> {
            let turn = self.turn.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            let tool_calls = if turn == 0 {
                vec![ToolCall {
                    id: "call_1".to_string(),
                    name: QUERY_CORPUS_TOOL.to_string(),
                    arguments: r#"{"query":"NYC media growth 2012-2014"}"#.to_string(),
                }]
            } else {
                Vec::new()
            };
            Ok(ChatResponse {
                content: if turn == 0 {
                    String::new()
                } else {
                    "Growth was driven by scripted TV.".to_string()
                },
                usage: TokenUsage::default(),
                tool_calls,
            })
        }

        async fn complete(&self, _prompt: &str) -> Result<String, WorkflowError> {
            Ok("summary".to_string())
        }
    }

    /// Engine stub returning one cited source node.
    struct StubEngine;

    #[async_trait]
    impl CandidateEngine for StubEngine {
        fn description(&self) -> &str {
            "Whole-document retrieval over the deck corpus"
        }

        async fn query(&self, _query: &str) -> Result<EngineResponse, WorkflowError> {
            let mut metadata = serde_json::Map::new();
            metadata.insert("file_name".to_string(), "media-2015.pdf".into());
            metadata.insert(
                "url".to_string(),
                "https://example.com/media-2015.pdf".into(),
            );
            metadata.insert("page_number".to_string(), 2.into());
            Ok(EngineResponse {
                text: "Scripted TV drove steady growth from 2012 to 2014.".to_string(),
                source_nodes: vec![SourceNode {
                    text: "START OF PAGE: 2\nSteady growth...\nEND OF PAGE: 2".to_string(),
                    metadata,
                }],
            })
        }
    }

    fn test_app() -> Router {
        let llm = Arc::new(StubClient {
            turn: std::sync::atomic::AtomicUsize::new(0),
        });
        let engines: Vec<Arc<dyn CandidateEngine>> = vec![Arc::new(StubEngine)];
        let pipeline = Arc::new(RouterQueryPipeline::new(
            engines,
            Arc::clone(&llm) as Arc<dyn LlmClient>,
            Duration::from_secs(10),
        ));
        let agent = Arc::new(RouterOutputAgent::new(
            llm,
            pipeline,
            Duration::from_secs(60),
        ));
        build_app(AppState::new(agent))
    }

    async fn post_query(app: Router, body: &str) -> (StatusCode, serde_json::Value) {
        let response = app
            .oneshot(
                Request::post("/query")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap_or_else(|e| panic!("{e}")),
            )
            .await
            .unwrap_or_else(|e| panic!("{e}"));
        let status = response.status();
        let bytes = response
            .into_body()
            .collect()
            .await
            .unwrap_or_else(|e| panic!("{e}"))
            .to_bytes();
        let value = serde_json::from_slice(&bytes).unwrap_or_else(|e| panic!("{e}"));
        (status, value)
    }

    #[tokio::test]
    async fn test_query_endpoint_end_to_end() {
        let (status, body) = post_query(
            test_app(),
            r#"{"message": "What drove NYC media growth 2012-2014?"}"#,
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        let response = &body["response"];
        assert!(
            response["text"]
                .as_str()
                .unwrap_or_default()
                .contains("2012")
        );
        assert_eq!(response["images"], serde_json::json!([]));
        assert_eq!(response["experts"], serde_json::json!([]));
        let docs = response["documents"]
            .as_array()
            .unwrap_or_else(|| panic!("documents missing"));
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0]["title"], "media-2015.pdf");
        assert_eq!(docs[0]["url"], "https://example.com/media-2015.pdf");
        assert_eq!(docs[0]["page"], 2);
    }

    #[tokio::test]
    async fn test_empty_message_is_bad_request() {
        let (status, body) = post_query(test_app(), r#"{"message": ""}"#).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(
            body["detail"]
                .as_str()
                .unwrap_or_default()
                .contains("required")
        );
    }
}
