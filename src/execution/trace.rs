//! The write-once, structured record of one conversation.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::message::{Message, ToolCall};

/// Cumulative token usage for a conversation.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub total_tokens: u64,
}

impl TokenUsage {
    pub fn add(&mut self, other: &TokenUsage) {
        self.input_tokens += other.input_tokens;
        self.output_tokens += other.output_tokens;
        self.total_tokens += other.total_tokens;
    }
}

/// The full, structured record of one conversation and its metrics.
///
/// Built once by [`crate::execution::runner::ScenarioRunner`] and returned;
/// never mutated afterward (see [`crate::execution::redaction::apply_trace_limits`]
/// for the one sanctioned exception, which rebuilds a fresh `Trace` rather
/// than mutating in place).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trace {
    pub messages: Vec<Message>,
    pub tool_calls_made: Vec<ToolCall>,
    pub turn_count: u32,
    pub tokens: TokenUsage,
    pub elapsed_seconds: f64,
    pub final_content: Option<String>,
    pub finish_reason: String,
    pub model: String,
    pub provider: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub scenario_hash: String,
    /// `None` when the model id has no pricing table entry — propagated as a
    /// first-class unknown, never silently coerced to zero.
    pub cost_usd: Option<f64>,
    pub extras_resolved: Map<String, Value>,
    pub max_turns_hit: bool,
}

impl Trace {
    /// Number of assistant-role messages in the transcript; must equal
    /// `turn_count`.
    pub fn assistant_message_count(&self) -> u32 {
        self.messages
            .iter()
            .filter(|m| matches!(m.role, Some(crate::message::Role::Assistant)))
            .count() as u32
    }
}
