//! Pulls the judge's per-criterion scores out of a raw tool-call argument
//! value (or, failing that, out of free-form text the model emitted
//! instead of calling the tool). Grounded on
//! `original_source/src/salvo/evaluation/judge/extraction.py`.

use serde_json::Value;
use std::collections::HashMap;

/// One criterion's score and reasoning as extracted from a single judge
/// vote.
#[derive(Debug, Clone)]
pub struct CriterionVote {
    pub score: f64,
    pub reasoning: String,
}

/// Attempts, in order, to parse a JSON object out of `text`:
/// 1. the whole string is valid JSON,
/// 2. a ```json fenced block is present,
/// 3. the first `{` to the last `}` parses as JSON.
fn extract_json_object(text: &str) -> Option<Value> {
    if let Ok(value) = serde_json::from_str::<Value>(text.trim()) {
        return Some(value);
    }

    if let Some(start) = text.find("```json") {
        let after = &text[start + "```json".len()..];
        if let Some(end) = after.find("```") {
            if let Ok(value) = serde_json::from_str::<Value>(after[..end].trim()) {
                return Some(value);
            }
        }
    }

    if let (Some(start), Some(end)) = (text.find('{'), text.rfind('}')) {
        if end > start {
            if let Ok(value) = serde_json::from_str::<Value>(&text[start..=end]) {
                return Some(value);
            }
        }
    }

    None
}

fn clamp_score(raw: f64) -> f64 {
    raw.clamp(0.0, 1.0)
}

fn votes_from_object(obj: &serde_json::Map<String, Value>) -> HashMap<String, CriterionVote> {
    let mut votes = HashMap::new();
    for (name, entry) in obj {
        let Some(entry) = entry.as_object() else { continue };
        let Some(score) = entry.get("score").and_then(Value::as_f64) else { continue };
        let reasoning = entry
            .get("reasoning")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        votes.insert(name.clone(), CriterionVote { score: clamp_score(score), reasoning });
    }
    votes
}

/// Extracts one vote's per-criterion scores, either from a tool call's
/// arguments or (if the model answered in plain text instead) by running
/// the JSON-extraction fallback chain over it. Returns `None` if nothing
/// naming at least one of `expected_criteria` could be parsed out.
pub fn extract_votes(
    tool_call_arguments: Option<&Value>,
    fallback_text: Option<&str>,
    expected_criteria: &[String],
) -> Option<HashMap<String, CriterionVote>> {
    let parsed = match tool_call_arguments {
        Some(Value::Object(obj)) => Some(obj.clone()),
        Some(other) => other.as_object().cloned(),
        None => fallback_text
            .and_then(extract_json_object)
            .and_then(|v| v.as_object().cloned()),
    }?;

    let votes = votes_from_object(&parsed);
    let has_expected = expected_criteria.iter().any(|name| votes.contains_key(name));
    if votes.is_empty() || !has_expected {
        None
    } else {
        Some(votes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_tool_call_arguments_directly() {
        let args = json!({"accuracy": {"score": 0.9, "reasoning": "good"}});
        let votes = extract_votes(Some(&args), None, &["accuracy".to_string()]).unwrap();
        assert_eq!(votes["accuracy"].score, 0.9);
    }

    #[test]
    fn falls_back_to_fenced_json_block() {
        let text = "Here is my assessment:\n```json\n{\"accuracy\": {\"score\": 1.5, \"reasoning\": \"r\"}}\n```\nDone.";
        let votes = extract_votes(None, Some(text), &["accuracy".to_string()]).unwrap();
        // Out-of-range scores are clamped into [0, 1].
        assert_eq!(votes["accuracy"].score, 1.0);
    }

    #[test]
    fn falls_back_to_brace_slice() {
        let text = "Sure, {\"accuracy\": {\"score\": 0.5, \"reasoning\": \"ok\"}} is my answer.";
        let votes = extract_votes(None, Some(text), &["accuracy".to_string()]).unwrap();
        assert_eq!(votes["accuracy"].score, 0.5);
    }

    #[test]
    fn returns_none_when_no_expected_criterion_present() {
        let args = json!({"unrelated": {"score": 0.9, "reasoning": "x"}});
        assert!(extract_votes(Some(&args), None, &["accuracy".to_string()]).is_none());
    }

    #[test]
    fn returns_none_when_nothing_parses() {
        assert!(extract_votes(None, Some("no json here at all"), &["accuracy".to_string()]).is_none());
    }
}
