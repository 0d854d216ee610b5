//! The path-query evaluator: flattens a [`Trace`] into a query-friendly
//! structure and applies an operator to the resolved value.

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::evaluation::evaluators::{EvalContext, Evaluator};
use crate::evaluation::path_query::{compare, query};
use crate::execution::trace::Trace;
use crate::result::EvalResult;
use crate::scenario::Assertion;

/// Builds the queryable structure described in spec §4.5: `response`,
/// `turns`, `tool_calls`, and `metadata`.
pub fn build_trace_data(trace: &Trace) -> Value {
    let turns: Vec<Value> = trace
        .messages
        .iter()
        .map(|m| {
            json!({
                "role": m.role,
                "content": m.content,
                "tool_calls": m.tool_calls,
                "tool_call_id": m.tool_call_id,
                "tool_name": m.tool_name,
            })
        })
        .collect();

    let tool_calls: Vec<Value> = trace
        .tool_calls_made
        .iter()
        .map(|tc| json!({"id": tc.id, "name": tc.name, "arguments": tc.arguments}))
        .collect();

    json!({
        "response": {
            "content": trace.final_content,
            "finish_reason": trace.finish_reason,
        },
        "turns": turns,
        "tool_calls": tool_calls,
        "metadata": {
            "model": trace.model,
            "provider": trace.provider,
            "cost_usd": trace.cost_usd,
            "latency_seconds": trace.elapsed_seconds,
            "input_tokens": trace.tokens.input_tokens,
            "output_tokens": trace.tokens.output_tokens,
            "total_tokens": trace.tokens.total_tokens,
            "turn_count": trace.turn_count,
            "finish_reason": trace.finish_reason,
        },
    })
}

pub struct PathQueryEvaluator;

#[async_trait]
impl Evaluator for PathQueryEvaluator {
    async fn evaluate(&self, trace: &Trace, assertion: &Assertion, _ctx: &EvalContext) -> EvalResult {
        let Assertion::PathQuery {
            expression,
            operator,
            value,
            weight,
            required,
        } = assertion
        else {
            return EvalResult::new(
                "path_query",
                0.0,
                false,
                assertion.weight(),
                assertion.required(),
                "PathQueryEvaluator received a non-path-query assertion",
            );
        };

        let trace_data = build_trace_data(trace);
        let resolved = query(&trace_data, expression);
        let passed = compare(&resolved, *operator, value.as_ref());

        let details = if passed {
            format!("'{expression}' {operator:?} matched")
        } else {
            format!(
                "'{expression}' resolved to {} which did not satisfy {operator:?} {}",
                resolved,
                value.as_ref().map(|v| v.to_string()).unwrap_or_default()
            )
        };

        EvalResult::new(
            "path_query",
            if passed { 1.0 } else { 0.0 },
            passed,
            *weight,
            *required,
            details,
        )
    }
}
