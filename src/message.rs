//! Canonical message and tool-call types shared by every adapter, the
//! scenario runner, and the evaluators. These are the wire-agnostic shapes
//! adapters translate to and from a specific provider's request/response
//! format.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The role a [`Message`] plays in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    System,
    User,
    Assistant,
    ToolResult,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::System => write!(f, "system"),
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
            Role::ToolResult => write!(f, "tool_result"),
        }
    }
}

/// A tool invocation requested by the model during an assistant turn.
///
/// `id` is echoed back on the matching [`Role::ToolResult`] message so the
/// provider can correlate a call with its result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub arguments: Value,
}

impl ToolCall {
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: Value) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments,
        }
    }
}

/// One turn in a conversation.
///
/// `tool_calls` is only ever populated on assistant messages; `tool_call_id`
/// and `tool_name` only on tool-result messages.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Message {
    pub role: Option<Role>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub tool_calls: Option<Vec<ToolCall>>,
    #[serde(default)]
    pub tool_call_id: Option<String>,
    #[serde(default)]
    pub tool_name: Option<String>,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Some(Role::System),
            content: Some(content.into()),
            ..Default::default()
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Some(Role::User),
            content: Some(content.into()),
            ..Default::default()
        }
    }

    pub fn assistant(content: Option<String>, tool_calls: Option<Vec<ToolCall>>) -> Self {
        Self {
            role: Some(Role::Assistant),
            content,
            tool_calls,
            ..Default::default()
        }
    }

    pub fn tool_result(
        tool_call_id: impl Into<String>,
        tool_name: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            role: Some(Role::ToolResult),
            content: Some(content.into()),
            tool_call_id: Some(tool_call_id.into()),
            tool_name: Some(tool_name.into()),
            ..Default::default()
        }
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(tool_calls) = &self.tool_calls {
            if !tool_calls.is_empty() {
                return write!(
                    f,
                    "tool_calls: {}",
                    serde_json::to_string(tool_calls).unwrap_or_else(|_| "<unprintable>".into())
                );
            }
        }
        match &self.content {
            Some(content) if !content.is_empty() => {
                write!(f, "{}: {content}", self.role.map(|r| r.to_string()).unwrap_or_default())
            }
            _ => {
                log::warn!("message without content nor tool calls, possibly a degenerate turn");
                Ok(())
            }
        }
    }
}

/// Either a string or a structured value deterministically returned for a
/// mocked tool call.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MockResponse {
    Text(String),
    Structured(Value),
}

impl MockResponse {
    /// The representation appended to the transcript as the tool_result's
    /// text content: strings pass through, structured values serialize to
    /// JSON text.
    pub fn to_content_string(&self) -> String {
        match self {
            MockResponse::Text(s) => s.clone(),
            MockResponse::Structured(v) => {
                serde_json::to_string(v).unwrap_or_else(|_| v.to_string())
            }
        }
    }
}

/// A callable tool, its JSON-Schema-subset parameter shape, and its
/// deterministic mock reply. Only tools carrying a `mock_response` are
/// callable; a call naming any other tool is a fatal run-time error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub properties: Map<String, Value>,
    #[serde(default)]
    pub required: Vec<String>,
    pub mock_response: MockResponse,
}

impl ToolDefinition {
    /// The `parameters` object as a JSON-Schema-shaped value, suitable for
    /// handing to an adapter's tool-conversion step.
    pub fn parameters_schema(&self) -> Value {
        Value::Object(Map::from_iter([
            ("type".to_string(), Value::String("object".to_string())),
            (
                "properties".to_string(),
                Value::Object(self.properties.clone()),
            ),
            (
                "required".to_string(),
                Value::Array(self.required.iter().cloned().map(Value::String).collect()),
            ),
        ]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mock_response_structured_serializes_to_json_text() {
        let mock = MockResponse::Structured(serde_json::json!({"ok": true}));
        assert_eq!(mock.to_content_string(), r#"{"ok":true}"#);
    }

    #[test]
    fn mock_response_text_passes_through() {
        let mock = MockResponse::Text("found it".to_string());
        assert_eq!(mock.to_content_string(), "found it");
    }
}
