//! Tool-sequence matching against the tool calls actually made. Grounded on
//! `original_source/src/salvo/evaluation/evaluators/tool_sequence.py`.

use async_trait::async_trait;
use std::collections::HashMap;

use crate::evaluation::evaluators::{EvalContext, Evaluator};
use crate::execution::trace::Trace;
use crate::result::EvalResult;
use crate::scenario::{Assertion, SequenceMode};

fn match_exact(actual: &[String], expected: &[String]) -> Result<(), String> {
    if actual.len() != expected.len() {
        return Err(format!(
            "expected {} calls {:?}, got {} calls {:?}",
            expected.len(),
            expected,
            actual.len(),
            actual
        ));
    }
    for (i, (a, e)) in actual.iter().zip(expected.iter()).enumerate() {
        if a != e {
            return Err(format!(
                "diverged at position {i}: expected '{e}', got '{a}'"
            ));
        }
    }
    Ok(())
}

fn match_in_order(actual: &[String], expected: &[String]) -> Result<(), String> {
    let mut cursor = 0;
    for (expected_idx, e) in expected.iter().enumerate() {
        while cursor < actual.len() && &actual[cursor] != e {
            cursor += 1;
        }
        if cursor >= actual.len() {
            return Err(format!(
                "stalled at expected index {expected_idx} ('{e}') with only {cursor} of {} actual calls consumed",
                actual.len()
            ));
        }
        cursor += 1;
    }
    Ok(())
}

fn match_any_order(actual: &[String], expected: &[String]) -> Result<(), String> {
    let mut actual_counts: HashMap<&str, usize> = HashMap::new();
    for name in actual {
        *actual_counts.entry(name.as_str()).or_insert(0) += 1;
    }
    let mut expected_counts: HashMap<&str, usize> = HashMap::new();
    for name in expected {
        *expected_counts.entry(name.as_str()).or_insert(0) += 1;
    }

    let mut missing = Vec::new();
    for (name, count) in &expected_counts {
        let have = actual_counts.get(name).copied().unwrap_or(0);
        if have < *count {
            missing.push(format!("{name} (needed {count}, got {have})"));
        }
    }

    if missing.is_empty() {
        Ok(())
    } else {
        Err(format!("missing from multiset: {}", missing.join(", ")))
    }
}

pub struct ToolSequenceEvaluator;

#[async_trait]
impl Evaluator for ToolSequenceEvaluator {
    async fn evaluate(&self, trace: &Trace, assertion: &Assertion, _ctx: &EvalContext) -> EvalResult {
        let Assertion::ToolSequence {
            mode,
            sequence,
            weight,
            required,
        } = assertion
        else {
            return EvalResult::new(
                "tool_sequence",
                0.0,
                false,
                assertion.weight(),
                assertion.required(),
                "ToolSequenceEvaluator received a non-tool-sequence assertion",
            );
        };

        let actual: Vec<String> = trace
            .tool_calls_made
            .iter()
            .map(|tc| tc.name.clone())
            .collect();

        if actual.is_empty() && !sequence.is_empty() {
            return EvalResult::new(
                "tool_sequence",
                0.0,
                false,
                *weight,
                *required,
                format!("no tool calls were made; expected {sequence:?}"),
            );
        }

        let outcome = match mode {
            SequenceMode::Exact => match_exact(&actual, sequence),
            SequenceMode::InOrder => match_in_order(&actual, sequence),
            SequenceMode::AnyOrder => match_any_order(&actual, sequence),
        };

        match outcome {
            Ok(()) => EvalResult::new("tool_sequence", 1.0, true, *weight, *required, "sequence matched"),
            Err(details) => EvalResult::new("tool_sequence", 0.0, false, *weight, *required, details),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn exact_requires_same_length_and_order() {
        assert!(match_exact(&names(&["a", "b"]), &names(&["a", "b"])).is_ok());
        assert!(match_exact(&names(&["a", "b"]), &names(&["b", "a"])).is_err());
        assert!(match_exact(&names(&["a"]), &names(&["a", "b"])).is_err());
    }

    #[test]
    fn in_order_permits_gaps() {
        assert!(match_in_order(&names(&["a", "x", "b", "y"]), &names(&["a", "b"])).is_ok());
        assert!(match_in_order(&names(&["b", "a"]), &names(&["a", "b"])).is_err());
    }

    #[test]
    fn in_order_is_greedy_and_does_not_restart() {
        // Two expected "a"s but only one actual "a" followed by "b" — the
        // second "a" can never be found after the cursor passes it.
        assert!(match_in_order(&names(&["a", "b"]), &names(&["a", "a"])).is_err());
    }

    #[test]
    fn any_order_is_a_multiset_subset_check() {
        assert!(match_any_order(&names(&["b", "a", "a"]), &names(&["a", "a"])).is_ok());
        assert!(match_any_order(&names(&["a"]), &names(&["a", "a"])).is_err());
    }
}
