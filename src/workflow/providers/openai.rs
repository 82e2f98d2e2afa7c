//! `OpenAI` client implementation using the `async-openai` crate.
//!
//! Supports any `OpenAI`-compatible API (`OpenAI`, Azure, local proxies)
//! via the base URL override in [`WorkflowConfig`]. The router call uses
//! the `json_schema` response format with `strict: true`, so routing
//! output is constrained at the decoding layer rather than scraped out
//! of free text.

use async_openai::Client;
use async_openai::config::OpenAIConfig;
use async_openai::types::{
    ChatCompletionMessageToolCall, ChatCompletionRequestAssistantMessage,
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessage,
    ChatCompletionRequestToolMessage, ChatCompletionRequestUserMessage, ChatCompletionTool,
    ChatCompletionToolType, CreateChatCompletionRequest, FunctionCall, FunctionObject,
    ResponseFormat, ResponseFormatJsonSchema,
};
use async_trait::async_trait;

use crate::error::WorkflowError;
use crate::workflow::config::WorkflowConfig;
use crate::workflow::message::{ChatMessage, ChatResponse, Role, TokenUsage, user_message};
use crate::workflow::provider::LlmClient;
use crate::workflow::router::AnswerSet;
use crate::workflow::tool::{ToolCall, ToolDefinition};

/// `OpenAI`-compatible LLM client.
pub struct OpenAiClient {
    client: Client<OpenAIConfig>,
    router_model: String,
    agent_model: String,
    summarizer_model: String,
}

impl OpenAiClient {
    /// Creates a new client from workflow configuration.
    #[must_use]
    pub fn new(config: &WorkflowConfig) -> Self {
        let mut openai_config = OpenAIConfig::new().with_api_key(&config.api_key);

        if let Some(ref base_url) = config.base_url {
            openai_config = openai_config.with_api_base(base_url);
        }

        Self {
            client: Client::with_config(openai_config),
            router_model: config.router_model.clone(),
            agent_model: config.agent_model.clone(),
            summarizer_model: config.summarizer_model.clone(),
        }
    }

    /// Converts our message type to the `OpenAI` SDK type.
    fn convert_message(msg: &ChatMessage) -> ChatCompletionRequestMessage {
        match msg.role {
            Role::System => {
                ChatCompletionRequestMessage::System(ChatCompletionRequestSystemMessage {
                    content: async_openai::types::ChatCompletionRequestSystemMessageContent::Text(
                        msg.content.clone(),
                    ),
                    name: None,
                })
            }
            Role::User => ChatCompletionRequestMessage::User(ChatCompletionRequestUserMessage {
                content: async_openai::types::ChatCompletionRequestUserMessageContent::Text(
                    msg.content.clone(),
                ),
                name: None,
            }),
            Role::Assistant => {
                let tool_calls = if msg.tool_calls.is_empty() {
                    None
                } else {
                    Some(
                        msg.tool_calls
                            .iter()
                            .map(|tc| ChatCompletionMessageToolCall {
                                id: tc.id.clone(),
                                r#type: ChatCompletionToolType::Function,
                                function: FunctionCall {
                                    name: tc.name.clone(),
                                    arguments: tc.arguments.clone(),
                                },
                            })
                            .collect(),
                    )
                };

                let content = if msg.content.is_empty() {
                    None
                } else {
                    Some(
                        async_openai::types::ChatCompletionRequestAssistantMessageContent::Text(
                            msg.content.clone(),
                        ),
                    )
                };

                #[allow(deprecated)]
                ChatCompletionRequestMessage::Assistant(ChatCompletionRequestAssistantMessage {
                    content,
                    name: None,
                    tool_calls,
                    refusal: None,
                    audio: None,
                    function_call: None,
                })
            }
            Role::Tool => ChatCompletionRequestMessage::Tool(ChatCompletionRequestToolMessage {
                content: async_openai::types::ChatCompletionRequestToolMessageContent::Text(
                    msg.content.clone(),
                ),
                tool_call_id: msg.tool_call_id.clone().unwrap_or_default(),
            }),
        }
    }

    /// Converts tool definitions to the `OpenAI` SDK type.
    fn convert_tools(tools: &[ToolDefinition]) -> Option<Vec<ChatCompletionTool>> {
        if tools.is_empty() {
            return None;
        }
        Some(
            tools
                .iter()
                .map(|td| ChatCompletionTool {
                    r#type: ChatCompletionToolType::Function,
                    function: FunctionObject {
                        name: td.name.clone(),
                        description: Some(td.description.clone()),
                        parameters: Some(td.parameters.clone()),
                        strict: None,
                    },
                })
                .collect(),
        )
    }

    async fn create(
        &self,
        request: CreateChatCompletionRequest,
    ) -> Result<ChatResponse, WorkflowError> {
        let response =
            self.client
                .chat()
                .create(request)
                .await
                .map_err(|e| WorkflowError::ApiRequest {
                    message: e.to_string(),
                })?;

        let choice = response.choices.first();

        let content = choice
            .and_then(|c| c.message.content.as_ref())
            .cloned()
            .unwrap_or_default();

        let tool_calls = choice
            .and_then(|c| c.message.tool_calls.as_ref())
            .map(|tcs| {
                tcs.iter()
                    .map(|tc| ToolCall {
                        id: tc.id.clone(),
                        name: tc.function.name.clone(),
                        arguments: tc.function.arguments.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default();

        let usage = response
            .usage
            .map_or_else(TokenUsage::default, |u| TokenUsage {
                prompt_tokens: u.prompt_tokens,
                completion_tokens: u.completion_tokens,
                total_tokens: u.total_tokens,
            });

        Ok(ChatResponse {
            content,
            usage,
            tool_calls,
        })
    }
}

impl std::fmt::Debug for OpenAiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiClient")
            .field("router_model", &self.router_model)
            .field("agent_model", &self.agent_model)
            .field("summarizer_model", &self.summarizer_model)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl LlmClient for OpenAiClient {
    fn name(&self) -> &'static str {
        "openai"
    }

    async fn structured_predict(&self, prompt: &str) -> Result<AnswerSet, WorkflowError> {
        let request = CreateChatCompletionRequest {
            model: self.router_model.clone(),
            messages: vec![Self::convert_message(&user_message(prompt))],
            response_format: Some(ResponseFormat::JsonSchema {
                json_schema: ResponseFormatJsonSchema {
                    name: "answer_set".to_string(),
                    description: Some(
                        "Candidate choices selected for the query, with reasons.".to_string(),
                    ),
                    schema: Some(AnswerSet::schema()),
                    strict: Some(true),
                },
            }),
            ..Default::default()
        };

        let response = self.create(request).await?;

        serde_json::from_str(&response.content).map_err(|e| WorkflowError::ResponseParse {
            message: format!("structured router output did not match schema: {e}"),
            content: response.content,
        })
    }

    async fn chat_with_tools(
        &self,
        history: &[ChatMessage],
        tools: &[ToolDefinition],
    ) -> Result<ChatResponse, WorkflowError> {
        let request = CreateChatCompletionRequest {
            model: self.agent_model.clone(),
            messages: history.iter().map(Self::convert_message).collect(),
            tools: Self::convert_tools(tools),
            ..Default::default()
        };

        self.create(request).await
    }

    async fn complete(&self, prompt: &str) -> Result<String, WorkflowError> {
        let request = CreateChatCompletionRequest {
            model: self.summarizer_model.clone(),
            messages: vec![Self::convert_message(&user_message(prompt))],
            ..Default::default()
        };

        Ok(self.create(request).await?.content)
    }
}
