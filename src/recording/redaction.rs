//! Extended redaction pipeline for recorded traces: the built-in catalog
//! plus project-supplied custom patterns, and the `metadata_only`
//! content-stripping transform. Grounded on
//! `original_source/src/salvo/recording/redaction.py`.

use regex::Regex;

use crate::execution::redaction::{compiled_patterns, REDACTED_PLACEHOLDER};
use crate::execution::trace::Trace;
use crate::message::{Message, ToolCall};
use crate::recording::models::RecordingError;

const CONTENT_EXCLUDED: &str = "[CONTENT_EXCLUDED]";

/// Builds a redaction closure over the built-in pattern catalog extended
/// with `custom_patterns`. Custom patterns extend, never replace, the
/// built-ins.
pub fn build_redaction_pipeline(
    custom_patterns: &[String],
) -> Result<Box<dyn Fn(&str) -> String + Send + Sync>, RecordingError> {
    let mut all_patterns: Vec<Regex> = compiled_patterns().clone();
    for pattern_str in custom_patterns {
        let compiled = Regex::new(pattern_str)
            .map_err(|e| RecordingError::InvalidPattern(pattern_str.clone(), e))?;
        all_patterns.push(compiled);
    }

    Ok(Box::new(move |content: &str| {
        let mut result = content.to_string();
        for pattern in &all_patterns {
            result = pattern.replace_all(&result, REDACTED_PLACEHOLDER).to_string();
        }
        result
    }))
}

/// Applies `redact_fn` to every message's content and the trace's final
/// content, leaving everything else unchanged.
pub fn apply_custom_redaction(trace: &Trace, redact_fn: &(dyn Fn(&str) -> String + Send + Sync)) -> Trace {
    let mut redacted = trace.clone();
    redacted.messages = trace
        .messages
        .iter()
        .map(|m| Message {
            content: m.content.as_deref().map(redact_fn),
            ..m.clone()
        })
        .collect();
    redacted.final_content = trace.final_content.as_deref().map(redact_fn);
    redacted
}

/// Strips message content and tool-call arguments while preserving
/// structure (role, tool call id/name, token and cost metrics) — used for
/// `RecordingMode::MetadataOnly`.
pub fn strip_content_for_metadata_only(trace: &Trace) -> Trace {
    let mut stripped = trace.clone();
    stripped.messages = trace
        .messages
        .iter()
        .map(|m| Message {
            content: m.content.as_ref().map(|_| CONTENT_EXCLUDED.to_string()),
            tool_calls: m.tool_calls.as_ref().map(|calls| {
                calls
                    .iter()
                    .map(|c| ToolCall {
                        id: c.id.clone(),
                        name: c.name.clone(),
                        arguments: serde_json::Value::String(CONTENT_EXCLUDED.to_string()),
                    })
                    .collect()
            }),
            ..m.clone()
        })
        .collect();
    stripped.final_content = None;
    stripped
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_trace() -> Trace {
        Trace {
            messages: vec![
                Message::user("my api_key=abcdefgh12345678 is leaked"),
                Message::assistant(Some("ok".to_string()), None),
            ],
            tool_calls_made: vec![],
            turn_count: 1,
            tokens: Default::default(),
            elapsed_seconds: 0.1,
            final_content: Some("ok".to_string()),
            finish_reason: "stop".to_string(),
            model: "gpt-4o".to_string(),
            provider: "openai".to_string(),
            timestamp: chrono::Utc::now(),
            scenario_hash: "abc".to_string(),
            cost_usd: Some(0.01),
            extras_resolved: Default::default(),
            max_turns_hit: false,
        }
    }

    #[test]
    fn custom_pattern_extends_builtin_catalog() {
        let redact = build_redaction_pipeline(&["LEAK-\\d+".to_string()]).unwrap();
        assert_eq!(redact("code LEAK-42 here"), "code [REDACTED] here");
    }

    #[test]
    fn invalid_custom_pattern_is_rejected() {
        let err = build_redaction_pipeline(&["(unclosed".to_string()]).unwrap_err();
        assert!(matches!(err, RecordingError::InvalidPattern(_, _)));
    }

    #[test]
    fn custom_redaction_scrubs_message_content() {
        let redact = build_redaction_pipeline(&[]).unwrap();
        let redacted = apply_custom_redaction(&sample_trace(), &*redact);
        assert!(!redacted.messages[0].content.as_ref().unwrap().contains("abcdefgh12345678"));
    }

    #[test]
    fn metadata_only_strips_content_but_keeps_structure() {
        let stripped = strip_content_for_metadata_only(&sample_trace());
        assert_eq!(stripped.messages[0].content.as_deref(), Some(CONTENT_EXCLUDED));
        assert!(stripped.final_content.is_none());
        assert_eq!(stripped.turn_count, 1);
    }
}
