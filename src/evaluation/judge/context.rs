//! Builds the user-prompt context block handed to the judge model. Grounded
//! on `original_source/src/salvo/evaluation/judge/context.py`.

use crate::message::ToolCall;
use crate::message::ToolDefinition;

const ARG_TRUNCATE_LEN: usize = 100;
const SYSTEM_PROMPT_TRUNCATE_LEN: usize = 2000;

fn truncate(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        s.to_string()
    } else {
        let mut cut = max_len;
        while cut > 0 && !s.is_char_boundary(cut) {
            cut -= 1;
        }
        format!("{}...", &s[..cut])
    }
}

/// One line per tool call: name plus its arguments, truncated to 100 chars.
pub fn build_tool_call_summary(tool_calls: &[ToolCall]) -> String {
    if tool_calls.is_empty() {
        return "(no tool calls were made)".to_string();
    }
    tool_calls
        .iter()
        .map(|tc| {
            let args = serde_json::to_string(&tc.arguments).unwrap_or_default();
            format!("- {}({})", tc.name, truncate(&args, ARG_TRUNCATE_LEN))
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn build_tool_definitions_digest(tools: &[ToolDefinition]) -> String {
    if tools.is_empty() {
        return "(no tools were available)".to_string();
    }
    tools
        .iter()
        .map(|t| format!("- {}: {}", t.name, t.description))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Assembles the user-prompt context: final response and tool-call summary
/// are always included; the scenario system prompt (truncated to 2000
/// chars) and a tool-definition digest are included only when
/// `include_system_prompt` is set.
pub fn build_context(
    final_response: Option<&str>,
    tool_calls: &[ToolCall],
    system_prompt: Option<&str>,
    tools: &[ToolDefinition],
    include_system_prompt: bool,
) -> String {
    let mut sections = Vec::new();

    sections.push(format!(
        "## Agent's final response\n{}",
        final_response.unwrap_or("(no final response)")
    ));
    sections.push(format!(
        "## Tool calls made\n{}",
        build_tool_call_summary(tool_calls)
    ));

    if include_system_prompt {
        if let Some(system_prompt) = system_prompt {
            sections.push(format!(
                "## Scenario system prompt\n{}",
                truncate(system_prompt, SYSTEM_PROMPT_TRUNCATE_LEN)
            ));
        }
        sections.push(format!(
            "## Available tools\n{}",
            build_tool_definitions_digest(tools)
        ));
    }

    sections.join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn truncates_long_arguments() {
        let tool_calls = vec![ToolCall::new("1", "search", json!({"q": "x".repeat(200)}))];
        let summary = build_tool_call_summary(&tool_calls);
        assert!(summary.contains("..."));
        assert!(summary.len() < 300);
    }

    #[test]
    fn excludes_system_prompt_when_flag_unset() {
        let context = build_context(Some("done"), &[], Some("secret instructions"), &[], false);
        assert!(!context.contains("secret instructions"));
    }

    #[test]
    fn includes_system_prompt_when_flag_set() {
        let context = build_context(Some("done"), &[], Some("secret instructions"), &[], true);
        assert!(context.contains("secret instructions"));
    }
}
