//! Runs every normalized assertion against a trace and rolls the per-
//! assertion [`EvalResult`]s up into one score and pass/fail verdict.
//! Grounded on `original_source/src/salvo/evaluation/scorer.py`.

use crate::evaluation::evaluators::{dispatch, EvalContext};
use crate::evaluation::EvaluationError;
use crate::execution::trace::Trace;
use crate::result::EvalResult;
use crate::scenario::Assertion;

/// Evaluates every assertion against `trace`, one after another.
///
/// Sequential, not concurrent: only the judge evaluator does any I/O, and
/// running k-voted judge calls for several assertions in parallel would
/// make per-trial latency much harder to reason about than the modest
/// time saved is worth.
pub async fn evaluate_trace_async(
    trace: &Trace,
    assertions: &[Assertion],
    ctx: &EvalContext,
) -> Result<Vec<EvalResult>, EvaluationError> {
    let mut results = Vec::with_capacity(assertions.len());
    for assertion in assertions {
        results.push(dispatch(trace, assertion, ctx).await);
    }
    Ok(results)
}

/// Weighted-mean score across all results, plus the pass/fail verdict: a
/// run passes only if every `required` assertion passed AND the overall
/// weighted score meets `threshold`. A failing required assertion is
/// reported back as the hard-fail reason so callers can short-circuit
/// without re-scanning `eval_results` themselves.
pub fn compute_score(eval_results: &[EvalResult], threshold: f64) -> (f64, bool, Option<String>) {
    if eval_results.is_empty() {
        // A scenario with no assertions vacuously passes (spec §4.7).
        return (1.0, true, None);
    }

    let total_weight: f64 = eval_results.iter().map(|r| r.weight).sum();
    let score = if total_weight > 0.0 {
        eval_results.iter().map(|r| r.score * r.weight).sum::<f64>() / total_weight
    } else {
        0.0
    };

    let hard_fail = eval_results
        .iter()
        .find(|r| r.required && !r.passed)
        .map(|r| format!("required assertion '{}' failed: {}", r.assertion_kind, r.details));

    let passed = hard_fail.is_none() && score >= threshold;
    (score, passed, hard_fail)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(score: f64, passed: bool, weight: f64, required: bool) -> EvalResult {
        EvalResult::new("path_query", score, passed, weight, required, "")
    }

    #[test]
    fn score_is_weighted_mean() {
        let results = vec![result(1.0, true, 1.0, false), result(0.0, false, 3.0, false)];
        let (score, _, _) = compute_score(&results, 0.5);
        assert!((score - 0.25).abs() < 1e-9);
    }

    #[test]
    fn failing_required_assertion_hard_fails_regardless_of_score() {
        let results = vec![result(1.0, true, 1.0, false), result(0.0, false, 0.01, true)];
        let (score, passed, hard_fail) = compute_score(&results, 0.1);
        assert!(score >= 0.1);
        assert!(!passed);
        assert!(hard_fail.is_some());
    }

    #[test]
    fn passes_when_no_required_failures_and_score_meets_threshold() {
        let results = vec![result(0.9, true, 1.0, true)];
        let (_, passed, hard_fail) = compute_score(&results, 0.8);
        assert!(passed);
        assert!(hard_fail.is_none());
    }

    #[test]
    fn no_assertions_vacuously_passes() {
        let (score, passed, hard_fail) = compute_score(&[], 0.8);
        assert_eq!(score, 1.0);
        assert!(passed);
        assert!(hard_fail.is_none());
    }
}
