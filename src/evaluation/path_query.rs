//! A minimal dotted/bracket path-query micro-language over
//! [`serde_json::Value`], preserving the operator semantics of
//! `original_source/src/salvo/evaluation/evaluators/jmespath_eval.py`
//! (`build_trace_data`, `compare`). No maintained JMESPath crate exists and
//! nothing in the example pack uses one, so this module stands in for it —
//! see DESIGN.md.
//!
//! Supports: dotted field access (`response.content`), numeric array
//! indexing (`tool_calls[0]`), a `?field=='literal'` filter projection
//! (`tool_calls[?name=='search']`), and a `|` pipe to chain a further
//! path against the previous result (used by the `tool_called` sugar
//! expansion's `| [0]`).

use regex::Regex;
use serde_json::Value;

use crate::scenario::Operator;

/// Resolves `expression` against `root`. Any unresolvable step (missing
/// field, out-of-range index, non-array filter target) collapses to
/// `Value::Null` — the single "missing path" sentinel the operators below
/// all treat identically.
pub fn query(root: &Value, expression: &str) -> Value {
    let mut current = root.clone();
    for part in expression.split('|') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        current = eval_path(&current, part);
        if current.is_null() {
            return Value::Null;
        }
    }
    current
}

fn eval_path(value: &Value, path: &str) -> Value {
    let mut current = value.clone();
    for segment in path.split('.') {
        let segment = segment.trim();
        if segment.is_empty() {
            continue;
        }
        current = eval_segment(&current, segment);
        if current.is_null() {
            return Value::Null;
        }
    }
    current
}

fn eval_segment(value: &Value, segment: &str) -> Value {
    let (field, brackets) = split_field_and_brackets(segment);

    let mut current = if field.is_empty() {
        value.clone()
    } else {
        value.get(field).cloned().unwrap_or(Value::Null)
    };

    for bracket in brackets {
        if current.is_null() {
            return Value::Null;
        }
        current = apply_bracket(&current, &bracket);
    }

    current
}

fn split_field_and_brackets(segment: &str) -> (&str, Vec<String>) {
    let bracket_start = segment.find('[');
    let field = match bracket_start {
        Some(idx) => &segment[..idx],
        None => segment,
    };

    let mut brackets = Vec::new();
    let mut rest = match bracket_start {
        Some(idx) => &segment[idx..],
        None => "",
    };
    while let Some(stripped) = rest.strip_prefix('[') {
        match stripped.find(']') {
            Some(end) => {
                brackets.push(stripped[..end].to_string());
                rest = &stripped[end + 1..];
            }
            None => break,
        }
    }

    (field, brackets)
}

fn apply_bracket(value: &Value, bracket: &str) -> Value {
    let bracket = bracket.trim();

    if let Some(filter) = bracket.strip_prefix('?') {
        return apply_filter(value, filter);
    }

    match bracket.parse::<usize>() {
        Ok(idx) => value
            .as_array()
            .and_then(|items| items.get(idx))
            .cloned()
            .unwrap_or(Value::Null),
        Err(_) => Value::Null,
    }
}

fn apply_filter(value: &Value, filter: &str) -> Value {
    let Some((key, literal)) = filter.split_once("==") else {
        return Value::Null;
    };
    let key = key.trim();
    let literal = literal.trim().trim_matches(|c| c == '\'' || c == '"');

    match value.as_array() {
        Some(items) => Value::Array(
            items
                .iter()
                .filter(|item| item.get(key).and_then(|v| v.as_str()) == Some(literal))
                .cloned()
                .collect(),
        ),
        None => Value::Null,
    }
}

fn as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.parse::<f64>().ok(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    }
}

/// Applies `operator` to the resolved `actual` value against `expected`.
/// Missing path (`actual` is `Value::Null`) is `false` for every operator,
/// including `exists`.
pub fn compare(actual: &Value, operator: Operator, expected: Option<&Value>) -> bool {
    if actual.is_null() {
        return false;
    }

    match operator {
        Operator::Exists => true,
        Operator::Eq => Some(actual) == expected,
        Operator::Ne => Some(actual) != expected,
        Operator::Gt | Operator::Gte | Operator::Lt | Operator::Lte => {
            let (Some(a), Some(e)) = (as_f64(actual), expected.and_then(as_f64)) else {
                return false;
            };
            match operator {
                Operator::Gt => a > e,
                Operator::Gte => a >= e,
                Operator::Lt => a < e,
                Operator::Lte => a <= e,
                _ => unreachable!(),
            }
        }
        Operator::Contains => {
            let Some(expected) = expected else {
                return false;
            };
            match actual {
                Value::String(s) => expected.as_str().map(|e| s.contains(e)).unwrap_or(false),
                Value::Array(items) => items.contains(expected),
                _ => false,
            }
        }
        Operator::Regex => {
            let Some(pattern) = expected.and_then(|v| v.as_str()) else {
                return false;
            };
            let actual_str = match actual {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            Regex::new(pattern)
                .map(|re| re.is_match(&actual_str))
                .unwrap_or(false)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn dotted_path_resolves() {
        let data = json!({"response": {"content": "hello"}});
        assert_eq!(query(&data, "response.content"), json!("hello"));
    }

    #[test]
    fn missing_path_is_null() {
        let data = json!({"response": {"content": "hello"}});
        assert_eq!(query(&data, "response.missing.deep"), Value::Null);
    }

    #[test]
    fn filter_and_pipe_index() {
        let data = json!({
            "tool_calls": [
                {"name": "search", "arguments": {"q": "x"}},
                {"name": "other", "arguments": {}}
            ]
        });
        let result = query(&data, "tool_calls[?name=='search'] | [0]");
        assert_eq!(result["name"], json!("search"));
    }

    #[test]
    fn exists_false_on_missing_path() {
        assert!(!compare(&Value::Null, Operator::Exists, None));
    }

    #[test]
    fn contains_substring() {
        assert!(compare(
            &json!("hello world"),
            Operator::Contains,
            Some(&json!("world"))
        ));
    }

    #[test]
    fn numeric_coercion_for_ordering() {
        assert!(compare(&json!("5"), Operator::Gt, Some(&json!(3))));
    }

    #[test]
    fn non_coercible_numeric_comparison_is_false() {
        assert!(!compare(&json!("not a number"), Operator::Gt, Some(&json!(3))));
    }
}
