use reqwest::Client;
use serde::Serialize;
use serde_json::{json, Value};

use async_trait::async_trait;

use crate::message::{Message, Role, ToolCall, ToolDefinition};

use super::{Adapter, AdapterConfig, AdapterError, TurnResult};

const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_MAX_TOKENS: u32 = 1024;

/// Hand-rolled Anthropic Messages API adapter, grounded on the teacher's
/// `llm/claude/client.rs` raw-`reqwest` client rather than an SDK (the
/// teacher has no Anthropic SDK dependency).
pub struct AnthropicAdapter {
    client: Client,
    api_key: String,
}

impl AnthropicAdapter {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
            api_key: std::env::var("ANTHROPIC_API_KEY").unwrap_or_default(),
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = api_key.into();
        self
    }

    fn convert_messages(messages: &[Message]) -> (Option<String>, Vec<Value>) {
        let mut system = None;
        let mut converted = Vec::new();

        for m in messages {
            match m.role {
                Some(Role::System) => system = m.content.clone(),
                Some(Role::User) => converted.push(json!({
                    "role": "user",
                    "content": m.content.clone().unwrap_or_default(),
                })),
                Some(Role::Assistant) => {
                    let mut blocks: Vec<Value> = Vec::new();
                    if let Some(content) = &m.content {
                        if !content.is_empty() {
                            blocks.push(json!({"type": "text", "text": content}));
                        }
                    }
                    if let Some(tool_calls) = &m.tool_calls {
                        for tc in tool_calls {
                            blocks.push(json!({
                                "type": "tool_use",
                                "id": tc.id,
                                "name": tc.name,
                                "input": tc.arguments,
                            }));
                        }
                    }
                    converted.push(json!({"role": "assistant", "content": blocks}));
                }
                Some(Role::ToolResult) | None => converted.push(json!({
                    "role": "user",
                    "content": [{
                        "type": "tool_result",
                        "tool_use_id": m.tool_call_id.clone().unwrap_or_default(),
                        "content": m.content.clone().unwrap_or_default(),
                    }],
                })),
            }
        }

        (system, converted)
    }

    fn convert_tools(tools: &[ToolDefinition]) -> Vec<Value> {
        tools
            .iter()
            .map(|t| {
                json!({
                    "name": t.name,
                    "description": t.description,
                    "input_schema": t.parameters_schema(),
                })
            })
            .collect()
    }
}

impl Default for AnthropicAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Serialize)]
struct AnthropicPayload {
    model: String,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<Value>,
    #[serde(flatten)]
    extras: serde_json::Map<String, Value>,
}

#[async_trait]
impl Adapter for AnthropicAdapter {
    async fn send_turn(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
        config: &AdapterConfig,
    ) -> Result<TurnResult, AdapterError> {
        let (system, converted_messages) = Self::convert_messages(messages);

        let payload = AnthropicPayload {
            model: config.model.clone(),
            max_tokens: config.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            system,
            messages: converted_messages,
            temperature: config.temperature,
            tools: Self::convert_tools(tools),
            extras: config.extras.clone(),
        };

        let response = self
            .client
            .post("https://api.anthropic.com/v1/messages")
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&payload)
            .send()
            .await
            .map_err(classify_reqwest_error)?;

        let status = response.status().as_u16();
        if status != 200 {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(AdapterError::Http { status, message });
        }

        let body: Value = response.json().await.map_err(classify_reqwest_error)?;

        let content_blocks = body["content"].as_array().cloned().unwrap_or_default();

        let mut text = String::new();
        let mut tool_calls = Vec::new();
        for block in &content_blocks {
            match block["type"].as_str() {
                Some("text") => text.push_str(block["text"].as_str().unwrap_or("")),
                Some("tool_use") => tool_calls.push(ToolCall::new(
                    block["id"].as_str().unwrap_or_default(),
                    block["name"].as_str().unwrap_or_default(),
                    block["input"].clone(),
                )),
                _ => {}
            }
        }

        Ok(TurnResult {
            content: if text.is_empty() { None } else { Some(text) },
            tool_calls,
            input_tokens: body["usage"]["input_tokens"].as_u64().unwrap_or(0),
            output_tokens: body["usage"]["output_tokens"].as_u64().unwrap_or(0),
            finish_reason: body["stop_reason"]
                .as_str()
                .unwrap_or("unknown")
                .to_string(),
            raw_response: body,
        })
    }

    fn provider_name(&self) -> &str {
        "anthropic"
    }
}

fn classify_reqwest_error(err: reqwest::Error) -> AdapterError {
    if err.is_timeout() {
        AdapterError::Timeout
    } else if err.is_connect() {
        AdapterError::Connection(err.to_string())
    } else if let Some(status) = err.status() {
        AdapterError::Http {
            status: status.as_u16(),
            message: err.to_string(),
        }
    } else {
        AdapterError::Request(err)
    }
}
