//! Default redaction pattern catalog and trace-size limits. Grounded on
//! `original_source/src/salvo/execution/redaction.py`.

use std::sync::OnceLock;

use regex::Regex;

use crate::execution::trace::Trace;
use crate::message::Message;

pub const REDACTED_PLACEHOLDER: &str = "[REDACTED]";

pub const MAX_MESSAGE_CONTENT_SIZE: usize = 50 * 1024;
pub const MAX_RAW_RESPONSE_SIZE: usize = 100 * 1024;
pub const MAX_TRACE_TOTAL_SIZE: usize = 5 * 1024 * 1024;

const REDACTION_PATTERNS: &[&str] = &[
    r"(?i)bearer\s+[A-Za-z0-9\-._~+/]+=*",
    r"sk-[A-Za-z0-9]{20,}",
    r"sk-ant-[A-Za-z0-9\-_]{20,}",
    r"gh[po]_[A-Za-z0-9]{20,}",
    r#"(?i)(api[_-]?key|secret|token|password)\s*[:=]\s*['"]?[A-Za-z0-9\-._~+/]{8,}['"]?"#,
    r"(?i)(cookie|set-cookie|x-api-key)\s*:\s*\S+",
];

pub(crate) fn compiled_patterns() -> &'static Vec<Regex> {
    static COMPILED: OnceLock<Vec<Regex>> = OnceLock::new();
    COMPILED.get_or_init(|| {
        REDACTION_PATTERNS
            .iter()
            .map(|p| Regex::new(p).expect("built-in redaction pattern must compile"))
            .collect()
    })
}

/// Replaces every match of the default redaction catalog in `content` with
/// [`REDACTED_PLACEHOLDER`].
pub fn redact_content(content: &str) -> String {
    let mut result = content.to_string();
    for pattern in compiled_patterns() {
        result = pattern.replace_all(&result, REDACTED_PLACEHOLDER).to_string();
    }
    result
}

/// Truncates `content` to `max_size` bytes, appending a truncation marker
/// when it was cut.
pub fn truncate_content(content: &str, max_size: usize) -> String {
    if content.len() <= max_size {
        return content.to_string();
    }
    let mut cut = max_size;
    while cut > 0 && !content.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}... [truncated]", &content[..cut])
}

fn sanitize_message(message: &Message) -> Message {
    let mut sanitized = message.clone();
    if let Some(content) = &sanitized.content {
        let redacted = redact_content(content);
        sanitized.content = Some(truncate_content(&redacted, MAX_MESSAGE_CONTENT_SIZE));
    }
    sanitized
}

/// Rebuilds `trace` with redaction and size limits applied to every message
/// and its raw response payload. Returns a fresh `Trace` rather than
/// mutating in place, preserving write-once semantics.
pub fn apply_trace_limits(trace: &Trace) -> Trace {
    let mut sanitized = trace.clone();
    sanitized.messages = trace.messages.iter().map(sanitize_message).collect();

    let serialized_total: usize = sanitized
        .messages
        .iter()
        .filter_map(|m| m.content.as_ref())
        .map(|c| c.len())
        .sum();

    if serialized_total > MAX_TRACE_TOTAL_SIZE {
        log::warn!(
            "trace content size {serialized_total} exceeds the {MAX_TRACE_TOTAL_SIZE}-byte limit after per-message truncation"
        );
    }

    sanitized
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redacts_bearer_token() {
        let redacted = redact_content("Authorization: Bearer abc123XYZ.def-456");
        assert!(redacted.contains(REDACTED_PLACEHOLDER));
        assert!(!redacted.contains("abc123XYZ"));
    }

    #[test]
    fn redacts_openai_style_key() {
        let redacted = redact_content("key is sk-abcdefghijklmnopqrstuvwx1234");
        assert!(!redacted.contains("sk-abcdefghijklmnopqrstuvwx1234"));
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        let content = "a".repeat(10);
        let truncated = truncate_content(&content, 4);
        assert!(truncated.starts_with("aaaa"));
        assert!(truncated.ends_with("[truncated]"));
    }

    #[test]
    fn leaves_benign_content_untouched() {
        assert_eq!(redact_content("hello world"), "hello world");
    }
}
