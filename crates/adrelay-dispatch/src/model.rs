//! Language-model client.
//!
//! Only the pieces of chat completion the router needs: a message history,
//! tool definitions, and a reply that may carry tool calls.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;
use tracing::debug;

/// Role of a chat message participant.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
    Tool,
}

/// Tool definition sent to the model (function-calling format).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    /// Tells the model when to use the tool.
    pub description: String,
    /// JSON Schema of the arguments.
    pub parameters: Value,
}

/// Tool call requested by the model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    /// Parsed JSON arguments. Unparseable argument text is kept as a string so
    /// schema validation rejects it.
    pub arguments: Value,
}

/// A single message in a conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl ChatMessage {
    fn text(role: ChatRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::text(ChatRole::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::text(ChatRole::User, content)
    }

    pub fn assistant(content: impl Into<String>, tool_calls: Vec<ToolCall>) -> Self {
        Self {
            tool_calls,
            ..Self::text(ChatRole::Assistant, content)
        }
    }

    pub fn tool(call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            tool_call_id: Some(call_id.into()),
            ..Self::text(ChatRole::Tool, content)
        }
    }
}

/// One model turn.
#[derive(Debug, Clone, Default)]
pub struct ModelReply {
    pub content: String,
    pub tool_calls: Vec<ToolCall>,
    pub finish_reason: Option<String>,
}

#[derive(Error, Debug, Clone)]
pub enum ModelError {
    #[error("Model is not configured: missing {0}")]
    NotConfigured(&'static str),

    #[error("Model authentication failed: {0}")]
    Authentication(String),

    #[error("Model rate limit exceeded")]
    RateLimited,

    #[error("Model API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Model request timed out")]
    Timeout,

    #[error("Model transport error: {0}")]
    Transport(String),

    #[error("Unreadable model response: {0}")]
    Decode(String),
}

/// A chat-completion backend with function calling.
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolDefinition],
    ) -> Result<ModelReply, ModelError>;
}

/// Deployment settings of the model endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_model")]
    pub model: String,

    /// Model round trips allowed per conversational turn.
    #[serde(default = "default_max_rounds")]
    pub max_rounds: usize,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default)]
    pub temperature: Option<f64>,
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}
fn default_model() -> String {
    "gpt-4o-mini".to_string()
}
fn default_max_rounds() -> usize {
    5
}
fn default_timeout_secs() -> u64 {
    60
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: None,
            model: default_model(),
            max_rounds: default_max_rounds(),
            timeout_secs: default_timeout_secs(),
            temperature: None,
        }
    }
}

/// OpenAI-compatible `/chat/completions` client.
pub struct OpenAiChatModel {
    config: ModelConfig,
    client: reqwest::Client,
}

impl OpenAiChatModel {
    pub fn new(config: ModelConfig) -> Result<Self, ModelError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ModelError::Transport(e.to_string()))?;
        Ok(Self { config, client })
    }

    fn headers(&self) -> Result<HeaderMap, ModelError> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or(ModelError::NotConfigured("api_key"))?;

        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", api_key))
                .map_err(|_| ModelError::NotConfigured("valid api_key"))?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Ok(headers)
    }

    fn build_payload(&self, messages: &[ChatMessage], tools: &[ToolDefinition]) -> Value {
        let messages: Vec<Value> = messages.iter().map(wire_message).collect();
        let mut payload = json!({
            "model": self.config.model,
            "messages": messages,
        });
        if !tools.is_empty() {
            payload["tools"] = tools
                .iter()
                .map(|t| {
                    json!({
                        "type": "function",
                        "function": {
                            "name": t.name,
                            "description": t.description,
                            "parameters": t.parameters,
                        }
                    })
                })
                .collect();
            payload["tool_choice"] = json!("auto");
        }
        if let Some(temperature) = self.config.temperature {
            payload["temperature"] = json!(temperature);
        }
        payload
    }

    fn parse_reply(body: &Value) -> Result<ModelReply, ModelError> {
        let choice = body
            .pointer("/choices/0")
            .ok_or_else(|| ModelError::Decode("no choices in response".to_string()))?;
        let message = choice.get("message").cloned().unwrap_or(Value::Null);

        let content = message
            .get("content")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        let tool_calls = message
            .get("tool_calls")
            .and_then(Value::as_array)
            .map(|calls| calls.iter().filter_map(parse_tool_call).collect())
            .unwrap_or_default();

        Ok(ModelReply {
            content,
            tool_calls,
            finish_reason: choice
                .get("finish_reason")
                .and_then(Value::as_str)
                .map(str::to_string),
        })
    }

    fn map_error(status: u16, body: &str) -> ModelError {
        if status == 401 || status == 403 {
            return ModelError::Authentication(body.to_string());
        }
        if status == 429 {
            return ModelError::RateLimited;
        }
        let message = serde_json::from_str::<Value>(body)
            .ok()
            .and_then(|v| {
                v.pointer("/error/message")
                    .and_then(Value::as_str)
                    .map(str::to_string)
            })
            .unwrap_or_else(|| body.to_string());
        ModelError::Api { status, message }
    }
}

fn wire_message(message: &ChatMessage) -> Value {
    let role = match message.role {
        ChatRole::System => "system",
        ChatRole::User => "user",
        ChatRole::Assistant => "assistant",
        ChatRole::Tool => "tool",
    };
    let mut wire = json!({ "role": role, "content": message.content });
    if !message.tool_calls.is_empty() {
        wire["tool_calls"] = message
            .tool_calls
            .iter()
            .map(|call| {
                json!({
                    "id": call.id,
                    "type": "function",
                    "function": {
                        "name": call.name,
                        "arguments": call.arguments.to_string(),
                    }
                })
            })
            .collect();
    }
    if let Some(id) = &message.tool_call_id {
        wire["tool_call_id"] = json!(id);
    }
    wire
}

fn parse_tool_call(raw: &Value) -> Option<ToolCall> {
    let id = raw.get("id")?.as_str()?.to_string();
    let function = raw.get("function")?;
    let name = function.get("name")?.as_str()?.to_string();
    let arguments = match function.get("arguments") {
        Some(Value::String(text)) if text.trim().is_empty() => json!({}),
        Some(Value::String(text)) => {
            serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.clone()))
        }
        Some(other) => other.clone(),
        None => json!({}),
    };
    Some(ToolCall {
        id,
        name,
        arguments,
    })
}

#[async_trait]
impl ChatModel for OpenAiChatModel {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolDefinition],
    ) -> Result<ModelReply, ModelError> {
        let headers = self.headers()?;
        let url = format!(
            "{}/chat/completions",
            self.config.base_url.trim_end_matches('/')
        );
        debug!(model = %self.config.model, messages = messages.len(), tools = tools.len(), "Model request");

        let response = self
            .client
            .post(url)
            .headers(headers)
            .json(&self.build_payload(messages, tools))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ModelError::Timeout
                } else {
                    ModelError::Transport(e.to_string())
                }
            })?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| ModelError::Transport(e.to_string()))?;
        if !status.is_success() {
            return Err(Self::map_error(status.as_u16(), &text));
        }

        let body: Value =
            serde_json::from_str(&text).map_err(|e| ModelError::Decode(e.to_string()))?;
        Self::parse_reply(&body)
    }
}
