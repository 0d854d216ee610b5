use async_trait::async_trait;

use crate::evaluation::evaluators::{EvalContext, Evaluator};
use crate::execution::trace::Trace;
use crate::result::EvalResult;
use crate::scenario::Assertion;

pub struct LatencyLimitEvaluator;

#[async_trait]
impl Evaluator for LatencyLimitEvaluator {
    async fn evaluate(&self, trace: &Trace, assertion: &Assertion, _ctx: &EvalContext) -> EvalResult {
        let Assertion::LatencyLimit {
            max_seconds,
            weight,
            required,
        } = assertion
        else {
            return EvalResult::new(
                "latency_limit",
                0.0,
                false,
                assertion.weight(),
                assertion.required(),
                "LatencyLimitEvaluator received a non-latency-limit assertion",
            );
        };

        let passed = trace.elapsed_seconds <= *max_seconds;
        EvalResult::new(
            "latency_limit",
            if passed { 1.0 } else { 0.0 },
            passed,
            *weight,
            *required,
            format!(
                "elapsed {:.3}s vs limit {:.3}s",
                trace.elapsed_seconds, max_seconds
            ),
        )
    }
}
