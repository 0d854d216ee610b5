use async_trait::async_trait;

use crate::evaluation::evaluators::{EvalContext, Evaluator};
use crate::execution::trace::Trace;
use crate::result::EvalResult;
use crate::scenario::Assertion;

pub struct CostLimitEvaluator;

#[async_trait]
impl Evaluator for CostLimitEvaluator {
    async fn evaluate(&self, trace: &Trace, assertion: &Assertion, _ctx: &EvalContext) -> EvalResult {
        let Assertion::CostLimit {
            max_usd,
            weight,
            required,
        } = assertion
        else {
            return EvalResult::new(
                "cost_limit",
                0.0,
                false,
                assertion.weight(),
                assertion.required(),
                "CostLimitEvaluator received a non-cost-limit assertion",
            );
        };

        match trace.cost_usd {
            // Unknown cost is never a pass, even against a generous limit.
            None => EvalResult::new(
                "cost_limit",
                0.0,
                false,
                *weight,
                *required,
                "trace cost is unknown; cannot verify it is within budget",
            ),
            Some(cost) => {
                let passed = cost <= *max_usd;
                EvalResult::new(
                    "cost_limit",
                    if passed { 1.0 } else { 0.0 },
                    passed,
                    *weight,
                    *required,
                    format!("cost ${cost:.6} vs limit ${max_usd:.6}"),
                )
            }
        }
    }
}
