//! The single-run multi-turn conversation loop. Grounded on
//! `original_source/src/salvo/execution/runner.py`.

use std::collections::HashMap;
use std::time::Instant;

use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::adapters::{Adapter, AdapterConfig, AdapterError};
use crate::execution::cost::estimate_cost;
use crate::execution::trace::{TokenUsage, Trace};
use crate::message::{Message, MockResponse, ToolDefinition};
use crate::scenario::Scenario;

#[derive(Error, Debug)]
pub enum RunnerError {
    #[error("tool call to '{0}' has no registered mock response")]
    MockNotFound(String),

    #[error(transparent)]
    Adapter(#[from] AdapterError),
}

impl RunnerError {
    /// *mock-not-found* (§7) is always fatal; an adapter error is transient
    /// exactly when the adapter itself classifies it as such.
    pub fn is_transient(&self) -> bool {
        match self {
            RunnerError::MockNotFound(_) => false,
            RunnerError::Adapter(e) => e.is_transient(),
        }
    }

    pub fn transient_type_name(&self) -> &'static str {
        match self {
            RunnerError::MockNotFound(_) => "mock_not_found",
            RunnerError::Adapter(e) => e.transient_type_name(),
        }
    }
}

/// Runs one scenario end-to-end: builds the initial `[system?, user]`
/// messages, drives the adapter through tool-call / tool-result cycles up to
/// `max_turns`, and returns the resulting [`Trace`].
pub struct ScenarioRunner {
    scenario: Scenario,
}

impl ScenarioRunner {
    pub fn new(scenario: Scenario) -> Self {
        Self { scenario }
    }

    fn mock_map(&self) -> HashMap<&str, &ToolDefinition> {
        self.scenario
            .tools
            .iter()
            .map(|t| (t.name.as_str(), t))
            .collect()
    }

    pub async fn run(
        &self,
        adapter: &dyn Adapter,
        base_config: &AdapterConfig,
    ) -> Result<Trace, RunnerError> {
        let start = Instant::now();

        let mut messages = Vec::new();
        if let Some(system_prompt) = &self.scenario.system_prompt {
            messages.push(Message::system(system_prompt));
        }
        messages.push(Message::user(&self.scenario.user_prompt));

        let mock_map = self.mock_map();
        let mut tool_calls_made = Vec::new();
        let mut tokens = TokenUsage::default();
        let mut turn_count = 0u32;
        let mut final_content = None;
        let mut finish_reason = String::new();
        let mut max_turns_hit = false;

        let config = AdapterConfig {
            model: self.scenario.model.clone(),
            temperature: self.scenario.temperature,
            max_tokens: base_config.max_tokens,
            seed: self.scenario.seed,
            extras: base_config.extras.clone(),
        };

        for turn in 0..self.scenario.max_turns {
            tracing::debug!(turn, "scenario runner: requesting next turn");

            let turn_result = adapter
                .send_turn(&messages, &self.scenario.tools, &config)
                .await?;
            turn_count += 1;

            tokens.input_tokens += turn_result.input_tokens;
            tokens.output_tokens += turn_result.output_tokens;
            tokens.total_tokens += turn_result.input_tokens + turn_result.output_tokens;

            final_content = turn_result.content.clone();
            finish_reason = turn_result.finish_reason.clone();

            messages.push(Message::assistant(
                turn_result.content.clone(),
                if turn_result.tool_calls.is_empty() {
                    None
                } else {
                    Some(turn_result.tool_calls.clone())
                },
            ));

            if turn_result.tool_calls.is_empty() {
                break;
            }

            for tool_call in &turn_result.tool_calls {
                let tool_def = mock_map
                    .get(tool_call.name.as_str())
                    .ok_or_else(|| RunnerError::MockNotFound(tool_call.name.clone()))?;

                let content = match &tool_def.mock_response {
                    MockResponse::Text(s) => s.clone(),
                    MockResponse::Structured(v) => {
                        serde_json::to_string(v).unwrap_or_else(|_| v.to_string())
                    }
                };

                messages.push(Message::tool_result(
                    tool_call.id.clone(),
                    tool_call.name.clone(),
                    content,
                ));
                tool_calls_made.push(tool_call.clone());
            }

            let reached_bound = turn + 1 == self.scenario.max_turns;
            if reached_bound {
                max_turns_hit = true;
            }
        }

        let elapsed_seconds = start.elapsed().as_secs_f64();
        let scenario_hash = hash_scenario(&self.scenario);
        let cost_usd = estimate_cost(&self.scenario.model, &tokens);

        Ok(Trace {
            messages,
            tool_calls_made,
            turn_count,
            tokens,
            elapsed_seconds,
            final_content,
            finish_reason,
            model: self.scenario.model.clone(),
            provider: adapter.provider_name().to_string(),
            timestamp: chrono::Utc::now(),
            scenario_hash,
            cost_usd,
            extras_resolved: config.extras,
            max_turns_hit,
        })
    }
}

/// SHA-256 over the scenario's canonical JSON serialization. Identical
/// `Scenario` values always hash identically (`serde_json::Map` sorts keys
/// via its `BTreeMap` backing).
pub fn hash_scenario(scenario: &Scenario) -> String {
    let canonical = scenario
        .canonical_json()
        .expect("Scenario must always serialize");
    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::test_adapter::{text_turn, tool_call_turn, TestAdapter};
    use crate::message::{MockResponse, ToolCall, ToolDefinition};
    use serde_json::Map;

    fn base_scenario() -> Scenario {
        Scenario {
            name: "test".to_string(),
            model: "gpt-4o".to_string(),
            adapter: "openai".to_string(),
            system_prompt: None,
            user_prompt: "Hello".to_string(),
            tools: Vec::new(),
            assertions: Vec::new(),
            threshold: 0.8,
            max_turns: 10,
            temperature: None,
            seed: None,
            extras: Map::new(),
        }
    }

    #[tokio::test]
    async fn vacuous_single_turn_produces_one_turn_trace() {
        let scenario = base_scenario();
        let adapter = TestAdapter::new(vec![text_turn("Hi", 10, 5)]);
        let runner = ScenarioRunner::new(scenario);
        let trace = runner
            .run(&adapter, &AdapterConfig::default())
            .await
            .unwrap();

        assert_eq!(trace.turn_count, 1);
        assert_eq!(trace.assistant_message_count(), 1);
        assert_eq!(trace.tokens.total_tokens, 15);
        assert_eq!(trace.final_content.as_deref(), Some("Hi"));
        assert!(!trace.max_turns_hit);
    }

    #[tokio::test]
    async fn tool_loop_appends_one_result_per_call() {
        let mut scenario = base_scenario();
        scenario.tools.push(ToolDefinition {
            name: "search".to_string(),
            description: "search the web".to_string(),
            properties: Map::new(),
            required: Vec::new(),
            mock_response: MockResponse::Text("found it".to_string()),
        });

        let adapter = TestAdapter::new(vec![
            tool_call_turn(
                vec![ToolCall::new("call_1", "search", serde_json::json!({"q": "x"}))],
                10,
                5,
            ),
            text_turn("done", 12, 3),
        ]);

        let runner = ScenarioRunner::new(scenario);
        let trace = runner
            .run(&adapter, &AdapterConfig::default())
            .await
            .unwrap();

        assert_eq!(trace.turn_count, 2);
        assert_eq!(trace.tool_calls_made.len(), 1);
        assert_eq!(trace.final_content.as_deref(), Some("done"));
    }

    #[tokio::test]
    async fn unmocked_tool_call_is_fatal() {
        let scenario = base_scenario();
        let adapter = TestAdapter::new(vec![tool_call_turn(
            vec![ToolCall::new("call_1", "unknown", serde_json::json!({}))],
            5,
            5,
        )]);

        let runner = ScenarioRunner::new(scenario);
        let result = runner.run(&adapter, &AdapterConfig::default()).await;
        assert!(matches!(result, Err(RunnerError::MockNotFound(name)) if name == "unknown"));
    }

    #[tokio::test]
    async fn max_turns_one_with_trailing_tool_call_sets_flag() {
        let mut scenario = base_scenario();
        scenario.max_turns = 1;
        scenario.tools.push(ToolDefinition {
            name: "search".to_string(),
            description: "search".to_string(),
            properties: Map::new(),
            required: Vec::new(),
            mock_response: MockResponse::Text("ok".to_string()),
        });

        let adapter = TestAdapter::new(vec![tool_call_turn(
            vec![ToolCall::new("call_1", "search", serde_json::json!({}))],
            5,
            5,
        )]);

        let runner = ScenarioRunner::new(scenario);
        let trace = runner
            .run(&adapter, &AdapterConfig::default())
            .await
            .unwrap();

        assert!(trace.max_turns_hit);
        assert_eq!(trace.turn_count, 1);
        assert_eq!(trace.tool_calls_made.len(), 1);
    }

    #[test]
    fn identical_scenarios_hash_identically() {
        let scenario = base_scenario();
        assert_eq!(hash_scenario(&scenario), hash_scenario(&scenario.clone()));
    }
}
