use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::message::{Message, ToolDefinition};

use super::{Adapter, AdapterConfig, AdapterError, TurnResult};

/// A scripted mock adapter returning a fixed sequence of [`TurnResult`]s,
/// one per call, in order. Used across this crate's own test suite in place
/// of hitting a real provider — there is no HTTP boundary worth mocking for
/// pure-core tests, mirroring how `original_source/tests/` builds a
/// `FakeAdapter` per test.
pub struct TestAdapter {
    scripted: Mutex<Vec<TurnResult>>,
    provider_name: String,
}

impl TestAdapter {
    pub fn new(scripted: Vec<TurnResult>) -> Self {
        Self {
            scripted: Mutex::new(scripted),
            provider_name: "test".to_string(),
        }
    }

    pub fn with_provider_name(mut self, name: impl Into<String>) -> Self {
        self.provider_name = name.into();
        self
    }
}

#[async_trait]
impl Adapter for TestAdapter {
    async fn send_turn(
        &self,
        _messages: &[Message],
        _tools: &[ToolDefinition],
        _config: &AdapterConfig,
    ) -> Result<TurnResult, AdapterError> {
        let mut scripted = self.scripted.lock().await;
        if scripted.is_empty() {
            return Err(AdapterError::Other(
                "TestAdapter has no more scripted turns".to_string(),
            ));
        }
        Ok(scripted.remove(0))
    }

    fn provider_name(&self) -> &str {
        &self.provider_name
    }
}

/// Convenience constructor for a text-only, no-tool-call turn.
pub fn text_turn(content: impl Into<String>, input_tokens: u64, output_tokens: u64) -> TurnResult {
    TurnResult {
        content: Some(content.into()),
        tool_calls: Vec::new(),
        input_tokens,
        output_tokens,
        raw_response: serde_json::Value::Null,
        finish_reason: "stop".to_string(),
    }
}

/// Convenience constructor for a turn that calls tools.
pub fn tool_call_turn(
    calls: Vec<crate::message::ToolCall>,
    input_tokens: u64,
    output_tokens: u64,
) -> TurnResult {
    TurnResult {
        content: None,
        tool_calls: calls,
        input_tokens,
        output_tokens,
        raw_response: serde_json::Value::Null,
        finish_reason: "tool_calls".to_string(),
    }
}
