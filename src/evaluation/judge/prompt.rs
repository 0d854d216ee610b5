//! Judge prompt and scoring-tool construction. Grounded on
//! `original_source/src/salvo/evaluation/judge/prompt.py`.

use indoc::indoc;
use serde_json::{json, Map, Value};

use crate::message::{MockResponse, ToolDefinition};
use crate::scenario::Criterion;

const JUDGE_SYSTEM_TEMPLATE: &str = indoc! {"
    You are an impartial judge evaluating an AI agent's conversation against a set of named criteria. For each criterion, assign a score from 0.0 to 1.0 using this anchored scale:

      0.0  — completely fails the criterion
      0.25 — mostly fails, with minor partial credit
      0.5  — partially satisfies the criterion
      0.75 — mostly satisfies the criterion, with minor gaps
      1.0  — fully satisfies the criterion

    Call the score_criteria tool exactly once with a score and a brief reasoning for every criterion listed below.

    Criteria:
    {criteria_block}"};

const JUDGE_USER_TEMPLATE: &str = "{context}";

/// One `- name (weight: W): description` line per criterion.
pub fn build_criteria_block(criteria: &[Criterion]) -> String {
    criteria
        .iter()
        .map(|c| format!("- {} (weight: {}): {}", c.name, c.weight, c.description))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Builds the (system, user) prompt pair. `custom_prompt`, when set,
/// overrides the system template wholesale.
pub fn build_judge_prompt(
    criteria: &[Criterion],
    context: &str,
    custom_prompt: Option<&str>,
) -> (String, String) {
    let system = match custom_prompt {
        Some(custom) => custom.to_string(),
        None => JUDGE_SYSTEM_TEMPLATE.replace("{criteria_block}", &build_criteria_block(criteria)),
    };
    let user = JUDGE_USER_TEMPLATE.replace("{context}", context);
    (system, user)
}

/// The `score_criteria` tool: one object property per criterion, each
/// requiring a numeric `score` and a string `reasoning`.
pub fn build_scoring_tool(criteria: &[Criterion]) -> ToolDefinition {
    let mut properties = Map::new();
    let mut required = Vec::new();

    for criterion in criteria {
        properties.insert(
            criterion.name.clone(),
            json!({
                "type": "object",
                "properties": {
                    "score": {"type": "number", "minimum": 0.0, "maximum": 1.0},
                    "reasoning": {"type": "string"},
                },
                "required": ["score", "reasoning"],
            }),
        );
        required.push(criterion.name.clone());
    }

    ToolDefinition {
        name: "score_criteria".to_string(),
        description: "Record a score and reasoning for each evaluation criterion.".to_string(),
        properties,
        required,
        mock_response: MockResponse::Text(String::new()),
    }
}

/// Provider-specific "force this tool" directive, merged into
/// `AdapterConfig.extras` under `tool_choice` for the judge's own adapter
/// calls.
pub fn format_tool_choice(provider_name: &str) -> Value {
    match provider_name {
        "anthropic" => json!({"type": "tool", "name": "score_criteria"}),
        _ => json!({"type": "function", "function": {"name": "score_criteria"}}),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn criteria_block_lists_weight_and_description() {
        let criteria = vec![Criterion {
            name: "accuracy".to_string(),
            description: "is the answer correct".to_string(),
            weight: 1.0,
        }];
        let block = build_criteria_block(&criteria);
        assert!(block.contains("accuracy"));
        assert!(block.contains("weight: 1"));
    }

    #[test]
    fn custom_prompt_overrides_template() {
        let (system, _) = build_judge_prompt(&[], "context", Some("custom system prompt"));
        assert_eq!(system, "custom system prompt");
    }

    #[test]
    fn scoring_tool_requires_score_and_reasoning_per_criterion() {
        let criteria = vec![Criterion {
            name: "clarity".to_string(),
            description: "".to_string(),
            weight: 1.0,
        }];
        let tool = build_scoring_tool(&criteria);
        assert_eq!(tool.required, vec!["clarity"]);
        assert!(tool.properties.contains_key("clarity"));
    }
}
