//! The evaluator registry: one [`Evaluator`] implementation per
//! [`crate::scenario::Assertion`] variant, dispatched by its `kind()` tag.
//! Mirrors the closed registry described in spec §9 — host code wanting a
//! new assertion kind adds a variant to `Assertion` and a branch here, the
//! same way `original_source/src/salvo/evaluation/evaluators/__init__.py`
//! wires its registry.

mod cost_limit;
mod latency_limit;
pub mod judge;
mod path_query_eval;
mod tool_sequence;

pub use cost_limit::CostLimitEvaluator;
pub use judge::JudgeEvaluator;
pub use latency_limit::LatencyLimitEvaluator;
pub use path_query_eval::PathQueryEvaluator;
pub use tool_sequence::ToolSequenceEvaluator;

use async_trait::async_trait;

use crate::adapters::Adapter;
use crate::config::JudgeConfig;
use crate::execution::trace::Trace;
use crate::message::ToolDefinition;
use crate::result::EvalResult;
use crate::scenario::Assertion;

/// Context an evaluator may need beyond the trace and its own assertion.
/// Only the judge evaluator currently reads any of this; the other four
/// ignore it. Owned (not borrowed) so it can be constructed once per
/// `evaluate_trace` call and passed by reference into an async trait
/// without fighting lifetimes.
#[derive(Default)]
pub struct EvalContext {
    pub scenario_system_prompt: Option<String>,
    pub scenario_tools: Vec<ToolDefinition>,
    pub project_judge_config: Option<JudgeConfig>,
    /// The adapter the judge should call when an assertion doesn't pin one
    /// itself and the project config doesn't either. `None` falls back to
    /// the hard-coded default (`openai`) via [`crate::adapters::get_builtin_adapter`].
    pub judge_adapter_override: Option<Box<dyn Adapter>>,
    pub verbose: bool,
}

/// Scores one canonical [`Assertion`] against a completed [`Trace`].
/// Infallible by design: an evaluator that cannot do its job reports a
/// failing [`EvalResult`] with the reason in `details`, rather than
/// propagating a `Result` — a malformed assertion is a test failure, not a
/// harness error.
#[async_trait]
pub trait Evaluator: Send + Sync {
    async fn evaluate(&self, trace: &Trace, assertion: &Assertion, ctx: &EvalContext) -> EvalResult;
}

/// Resolves an [`Assertion`] to its evaluator and runs it. The sole
/// dispatch point new assertion kinds must be wired into.
pub async fn dispatch(trace: &Trace, assertion: &Assertion, ctx: &EvalContext) -> EvalResult {
    match assertion {
        Assertion::PathQuery { .. } => PathQueryEvaluator.evaluate(trace, assertion, ctx).await,
        Assertion::ToolSequence { .. } => ToolSequenceEvaluator.evaluate(trace, assertion, ctx).await,
        Assertion::CostLimit { .. } => CostLimitEvaluator.evaluate(trace, assertion, ctx).await,
        Assertion::LatencyLimit { .. } => LatencyLimitEvaluator.evaluate(trace, assertion, ctx).await,
        Assertion::Judge { .. } => JudgeEvaluator.evaluate(trace, assertion, ctx).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn dispatch_routes_cost_limit_to_its_evaluator() {
        let trace = crate::execution::trace::Trace {
            messages: vec![],
            tool_calls_made: vec![],
            turn_count: 1,
            tokens: crate::execution::trace::TokenUsage::default(),
            elapsed_seconds: 0.1,
            final_content: None,
            finish_reason: "stop".to_string(),
            model: "m".to_string(),
            provider: "p".to_string(),
            timestamp: chrono::Utc::now(),
            scenario_hash: "h".to_string(),
            cost_usd: Some(0.01),
            extras_resolved: Default::default(),
            max_turns_hit: false,
        };
        let assertion = Assertion::CostLimit {
            max_usd: 1.0,
            weight: 1.0,
            required: true,
        };
        let result = dispatch(&trace, &assertion, &EvalContext::default()).await;
        assert_eq!(result.assertion_kind, "cost_limit");
        assert!(result.passed);
    }
}
