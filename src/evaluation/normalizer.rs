//! Converts raw, possibly-shorthand assertion records into the canonical
//! tagged [`Assertion`] form. Grounded on
//! `original_source/src/salvo/evaluation/normalizer.py`.

use thiserror::Error;

use crate::scenario::{Assertion, Criterion, Operator, RawAssertion, SequenceMode};

const OPERATOR_KEYS: &[&str] = &["eq", "ne", "gt", "gte", "lt", "lte", "contains", "regex"];

#[derive(Error, Debug)]
pub enum NormalizeError {
    #[error("assertion has no operator key; expected exactly one of {OPERATOR_KEYS:?}")]
    NoOperator,

    #[error("assertion has multiple operator keys {0:?}; expected exactly one")]
    MultipleOperators(Vec<String>),

    #[error("unknown assertion type '{0}'")]
    UnknownType(String),

    #[error("assertion is missing required field '{0}'")]
    MissingField(&'static str),

    #[error("assertion field '{0}' has an invalid value")]
    InvalidField(&'static str),
}

fn default_weight(raw: &RawAssertion) -> f64 {
    raw.get("weight").and_then(|v| v.as_f64()).unwrap_or(1.0)
}

fn default_required(raw: &RawAssertion) -> bool {
    raw.get("required").and_then(|v| v.as_bool()).unwrap_or(false)
}

fn parse_operator(name: &str) -> Result<Operator, NormalizeError> {
    match name {
        "eq" => Ok(Operator::Eq),
        "ne" => Ok(Operator::Ne),
        "gt" => Ok(Operator::Gt),
        "gte" => Ok(Operator::Gte),
        "lt" => Ok(Operator::Lt),
        "lte" => Ok(Operator::Lte),
        "contains" => Ok(Operator::Contains),
        "regex" => Ok(Operator::Regex),
        "exists" => Ok(Operator::Exists),
        _ => Err(NormalizeError::InvalidField("operator")),
    }
}

fn parse_mode(name: &str) -> Result<SequenceMode, NormalizeError> {
    match name {
        "exact" => Ok(SequenceMode::Exact),
        "in_order" => Ok(SequenceMode::InOrder),
        "any_order" => Ok(SequenceMode::AnyOrder),
        _ => Err(NormalizeError::InvalidField("mode")),
    }
}

fn parse_criteria(raw: &RawAssertion) -> Result<Vec<Criterion>, NormalizeError> {
    let array = raw
        .get("criteria")
        .and_then(|v| v.as_array())
        .ok_or(NormalizeError::MissingField("criteria"))?;

    array
        .iter()
        .map(|c| {
            let name = c
                .get("name")
                .and_then(|v| v.as_str())
                .ok_or(NormalizeError::MissingField("criteria[].name"))?
                .to_string();
            let description = c
                .get("description")
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string();
            let weight = c.get("weight").and_then(|v| v.as_f64()).unwrap_or(1.0);
            Ok(Criterion {
                name,
                description,
                weight,
            })
        })
        .collect()
}

/// Expands shorthand (`tool_called`, `output_contains`, operator-key
/// shorthand) or passes through an already-canonical record into the
/// canonical tagged [`Assertion`] form. Idempotent: re-normalizing the
/// serialized output of a normalized assertion yields the same value.
pub fn normalize_assertion(raw: &RawAssertion) -> Result<Assertion, NormalizeError> {
    let weight = default_weight(raw);
    let required = default_required(raw);

    let type_tag = raw
        .get("type")
        .or_else(|| raw.get("kind"))
        .and_then(|v| v.as_str());

    if let Some(type_tag) = type_tag {
        return match type_tag {
            "tool_called" => {
                let tool = raw
                    .get("tool")
                    .and_then(|v| v.as_str())
                    .ok_or(NormalizeError::MissingField("tool"))?;
                Ok(Assertion::PathQuery {
                    expression: format!("tool_calls[?name=='{tool}'] | [0]"),
                    operator: Operator::Exists,
                    value: None,
                    weight,
                    required,
                })
            }
            "output_contains" => {
                let value = raw
                    .get("value")
                    .cloned()
                    .ok_or(NormalizeError::MissingField("value"))?;
                Ok(Assertion::PathQuery {
                    expression: "response.content".to_string(),
                    operator: Operator::Contains,
                    value: Some(value),
                    weight,
                    required,
                })
            }
            "path_query" | "jmespath" => {
                let expression = raw
                    .get("expression")
                    .or_else(|| raw.get("path"))
                    .and_then(|v| v.as_str())
                    .unwrap_or("response.content")
                    .to_string();
                let operator = raw
                    .get("operator")
                    .and_then(|v| v.as_str())
                    .ok_or(NormalizeError::MissingField("operator"))
                    .and_then(parse_operator)?;
                Ok(Assertion::PathQuery {
                    expression,
                    operator,
                    value: raw.get("value").cloned(),
                    weight,
                    required,
                })
            }
            "tool_sequence" => {
                let mode = raw
                    .get("mode")
                    .and_then(|v| v.as_str())
                    .ok_or(NormalizeError::MissingField("mode"))
                    .and_then(parse_mode)?;
                let sequence = raw
                    .get("sequence")
                    .and_then(|v| v.as_array())
                    .ok_or(NormalizeError::MissingField("sequence"))?
                    .iter()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect();
                Ok(Assertion::ToolSequence {
                    mode,
                    sequence,
                    weight,
                    required,
                })
            }
            "cost_limit" => {
                let max_usd = raw
                    .get("max_usd")
                    .and_then(|v| v.as_f64())
                    .ok_or(NormalizeError::MissingField("max_usd"))?;
                Ok(Assertion::CostLimit {
                    max_usd,
                    weight,
                    required,
                })
            }
            "latency_limit" => {
                let max_seconds = raw
                    .get("max_seconds")
                    .and_then(|v| v.as_f64())
                    .ok_or(NormalizeError::MissingField("max_seconds"))?;
                Ok(Assertion::LatencyLimit {
                    max_seconds,
                    weight,
                    required,
                })
            }
            "judge" => Ok(Assertion::Judge {
                criteria: parse_criteria(raw)?,
                threshold: raw.get("threshold").and_then(|v| v.as_f64()),
                k: raw.get("k").and_then(|v| v.as_u64()).map(|v| v as u32),
                judge_model: raw
                    .get("judge_model")
                    .and_then(|v| v.as_str())
                    .map(str::to_string),
                judge_adapter: raw
                    .get("judge_adapter")
                    .and_then(|v| v.as_str())
                    .map(str::to_string),
                custom_prompt: raw
                    .get("custom_prompt")
                    .and_then(|v| v.as_str())
                    .map(str::to_string),
                include_system_prompt: raw
                    .get("include_system_prompt")
                    .and_then(|v| v.as_bool())
                    .unwrap_or(false),
                weight,
                required,
            }),
            other => Err(NormalizeError::UnknownType(other.to_string())),
        };
    }

    let present: Vec<&str> = OPERATOR_KEYS
        .iter()
        .filter(|key| raw.contains_key(**key))
        .copied()
        .collect();

    match present.len() {
        0 => Err(NormalizeError::NoOperator),
        1 => {
            let operator_key = present[0];
            let operator = parse_operator(operator_key)?;
            let expression = raw
                .get("path")
                .and_then(|v| v.as_str())
                .unwrap_or("response.content")
                .to_string();
            Ok(Assertion::PathQuery {
                expression,
                operator,
                value: raw.get(operator_key).cloned(),
                weight,
                required,
            })
        }
        _ => Err(NormalizeError::MultipleOperators(
            present.into_iter().map(str::to_string).collect(),
        )),
    }
}

pub fn normalize_assertions(raws: &[RawAssertion]) -> Result<Vec<Assertion>, NormalizeError> {
    raws.iter().map(normalize_assertion).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Map};

    fn obj(value: serde_json::Value) -> RawAssertion {
        match value {
            serde_json::Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn tool_called_sugar_expands_to_path_query() {
        let raw = obj(json!({"type": "tool_called", "tool": "search"}));
        let assertion = normalize_assertion(&raw).unwrap();
        match assertion {
            Assertion::PathQuery {
                expression,
                operator,
                ..
            } => {
                assert_eq!(expression, "tool_calls[?name=='search'] | [0]");
                assert_eq!(operator, Operator::Exists);
            }
            other => panic!("expected path query, got {other:?}"),
        }
    }

    #[test]
    fn output_contains_sugar_expands_to_path_query() {
        let raw = obj(json!({"type": "output_contains", "value": "done"}));
        let assertion = normalize_assertion(&raw).unwrap();
        match assertion {
            Assertion::PathQuery {
                expression,
                operator,
                value,
                ..
            } => {
                assert_eq!(expression, "response.content");
                assert_eq!(operator, Operator::Contains);
                assert_eq!(value, Some(json!("done")));
            }
            other => panic!("expected path query, got {other:?}"),
        }
    }

    #[test]
    fn no_operator_key_is_an_error() {
        let raw = obj(json!({"path": "response.content"}));
        assert!(matches!(
            normalize_assertion(&raw),
            Err(NormalizeError::NoOperator)
        ));
    }

    #[test]
    fn two_operator_keys_is_an_error() {
        let raw = obj(json!({"eq": "a", "ne": "b"}));
        assert!(matches!(
            normalize_assertion(&raw),
            Err(NormalizeError::MultipleOperators(_))
        ));
    }

    #[test]
    fn shorthand_defaults_expression_and_weight() {
        let raw = obj(json!({"contains": "done"}));
        let assertion = normalize_assertion(&raw).unwrap();
        match assertion {
            Assertion::PathQuery {
                expression, weight, required, ..
            } => {
                assert_eq!(expression, "response.content");
                assert_eq!(weight, 1.0);
                assert!(!required);
            }
            other => panic!("expected path query, got {other:?}"),
        }
    }

    #[test]
    fn normalizer_is_idempotent() {
        let raw = obj(json!({"path": "response.content", "eq": "done", "weight": 2.0, "required": true}));
        let once = normalize_assertion(&raw).unwrap();
        let serialized = serde_json::to_value(&once).unwrap();
        let reraw: RawAssertion = serde_json::from_value::<Map<String, serde_json::Value>>(serialized).unwrap();
        let twice = normalize_assertion(&reraw).unwrap();
        assert_eq!(
            serde_json::to_value(&once).unwrap(),
            serde_json::to_value(&twice).unwrap()
        );
    }
}
