use std::sync::OnceLock;

use async_openai::config::OpenAIConfig;
use async_openai::types::CreateChatCompletionResponse;
use async_openai::Client;
use async_trait::async_trait;
use serde_json::{json, Map, Value};

use crate::message::{Message, Role, ToolCall, ToolDefinition};

use super::{Adapter, AdapterConfig, AdapterError, TurnResult};

/// Adapter for the OpenAI chat-completions API, built on the teacher's
/// existing `async-openai` dependency. The request body is assembled as a
/// plain [`Value`] (the crate's "bring your own types" mode) rather than
/// through the SDK's builder types, since canonical messages don't map
/// 1:1 onto `ChatCompletionRequestMessage`'s role set.
pub struct OpenAiAdapter {
    client: OnceLock<Client<OpenAIConfig>>,
}

impl OpenAiAdapter {
    pub fn new() -> Self {
        Self {
            client: OnceLock::new(),
        }
    }

    fn client(&self) -> &Client<OpenAIConfig> {
        self.client.get_or_init(Client::new)
    }

    fn convert_messages(messages: &[Message]) -> Vec<Value> {
        messages
            .iter()
            .map(|m| match m.role {
                Some(Role::System) => json!({
                    "role": "system",
                    "content": m.content.clone().unwrap_or_default(),
                }),
                Some(Role::User) => json!({
                    "role": "user",
                    "content": m.content.clone().unwrap_or_default(),
                }),
                Some(Role::Assistant) => {
                    let mut obj = Map::new();
                    obj.insert("role".into(), json!("assistant"));
                    obj.insert("content".into(), json!(m.content));
                    if let Some(tool_calls) = &m.tool_calls {
                        let encoded: Vec<Value> = tool_calls
                            .iter()
                            .map(|t| {
                                json!({
                                    "id": t.id,
                                    "type": "function",
                                    "function": {
                                        "name": t.name,
                                        "arguments": serde_json::to_string(&t.arguments)
                                            .unwrap_or_default(),
                                    },
                                })
                            })
                            .collect();
                        obj.insert("tool_calls".into(), Value::Array(encoded));
                    }
                    Value::Object(obj)
                }
                Some(Role::ToolResult) | None => json!({
                    "role": "tool",
                    "tool_call_id": m.tool_call_id.clone().unwrap_or_default(),
                    "content": m.content.clone().unwrap_or_default(),
                }),
            })
            .collect()
    }

    fn convert_tools(tools: &[ToolDefinition]) -> Vec<Value> {
        tools
            .iter()
            .map(|t| {
                json!({
                    "type": "function",
                    "function": {
                        "name": t.name,
                        "description": t.description,
                        "parameters": t.parameters_schema(),
                    },
                })
            })
            .collect()
    }
}

impl Default for OpenAiAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Adapter for OpenAiAdapter {
    async fn send_turn(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
        config: &AdapterConfig,
    ) -> Result<TurnResult, AdapterError> {
        let mut request = Map::new();
        request.insert("model".into(), json!(config.model));
        request.insert(
            "messages".into(),
            Value::Array(Self::convert_messages(messages)),
        );
        if !tools.is_empty() {
            request.insert("tools".into(), Value::Array(Self::convert_tools(tools)));
        }
        if let Some(temperature) = config.temperature {
            request.insert("temperature".into(), json!(temperature));
        }
        if let Some(max_tokens) = config.max_tokens {
            request.insert("max_tokens".into(), json!(max_tokens));
        }
        if let Some(seed) = config.seed {
            request.insert("seed".into(), json!(seed));
        }
        for (key, value) in &config.extras {
            request.insert(key.clone(), value.clone());
        }

        let response = self
            .client()
            .chat()
            .create_byot::<Value, CreateChatCompletionResponse>(Value::Object(request))
            .await
            .map_err(classify_openai_error)?;

        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| AdapterError::Other("openai response had no choices".to_string()))?;

        let tool_calls = choice
            .message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(|tc| {
                Ok(ToolCall::new(
                    tc.id,
                    tc.function.name,
                    serde_json::from_str(&tc.function.arguments)?,
                ))
            })
            .collect::<Result<Vec<_>, serde_json::Error>>()?;

        let usage = response.usage;
        let raw_response = serde_json::to_value(&Value::Object({
            let mut m = Map::new();
            m.insert("finish_reason".into(), json!(choice.finish_reason));
            m
        }))
        .unwrap_or(Value::Null);

        Ok(TurnResult {
            content: choice.message.content,
            tool_calls,
            input_tokens: usage.as_ref().map(|u| u.prompt_tokens as u64).unwrap_or(0),
            output_tokens: usage
                .as_ref()
                .map(|u| u.completion_tokens as u64)
                .unwrap_or(0),
            raw_response,
            finish_reason: choice
                .finish_reason
                .map(|r| format!("{r:?}").to_lowercase())
                .unwrap_or_else(|| "unknown".to_string()),
        })
    }

    fn provider_name(&self) -> &str {
        "openai"
    }
}

fn classify_openai_error(err: async_openai::error::OpenAIError) -> AdapterError {
    use async_openai::error::OpenAIError;
    match err {
        OpenAIError::Reqwest(e) => classify_reqwest_error(e),
        other => AdapterError::OpenAi(other),
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
