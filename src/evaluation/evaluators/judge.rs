//! Orchestrates the LLM-as-judge assertion: resolves configuration,
//! dispatches k independent adapter calls, extracts each vote, and
//! aggregates them into one [`EvalResult`]. Grounded on
//! `original_source/src/salvo/evaluation/evaluators/judge.py`.

use async_trait::async_trait;
use serde_json::{json, Map};

use crate::adapters::{Adapter, AdapterConfig, TurnResult};
use crate::evaluation::evaluators::{EvalContext, Evaluator};
use crate::evaluation::judge::aggregation::aggregate_votes;
use crate::evaluation::judge::context::build_context;
use crate::evaluation::judge::extraction::extract_votes;
use crate::evaluation::judge::prompt::{build_judge_prompt, build_scoring_tool, format_tool_choice};
use crate::execution::cost::estimate_cost;
use crate::execution::trace::{Trace, TokenUsage};
use crate::message::Message;
use crate::result::EvalResult;
use crate::scenario::Assertion;

const DEFAULT_ADAPTER: &str = "openai";
const DEFAULT_MODEL: &str = "gpt-4o-mini";
const DEFAULT_K: u32 = 3;
const DEFAULT_TEMPERATURE: f64 = 0.0;
const DEFAULT_MAX_TOKENS: u32 = 1024;
const DEFAULT_THRESHOLD: f64 = 0.8;

pub struct JudgeEvaluator;

struct ResolvedJudgeConfig {
    adapter: String,
    model: String,
    k: u32,
    temperature: f64,
    max_tokens: u32,
    threshold: f64,
}

/// Resolution order: assertion fields > project-level [`crate::config::JudgeConfig`]
/// > hard-coded defaults.
fn resolve_config(assertion: &Assertion, ctx: &EvalContext) -> ResolvedJudgeConfig {
    let Assertion::Judge {
        threshold,
        k,
        judge_model,
        judge_adapter,
        ..
    } = assertion
    else {
        unreachable!("resolve_config is only called with a Judge assertion")
    };

    let project = ctx.project_judge_config.as_ref();

    ResolvedJudgeConfig {
        adapter: judge_adapter
            .clone()
            .or_else(|| project.and_then(|p| p.adapter.clone()))
            .unwrap_or_else(|| DEFAULT_ADAPTER.to_string()),
        model: judge_model
            .clone()
            .or_else(|| project.and_then(|p| p.model.clone()))
            .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
        k: k.or_else(|| project.and_then(|p| p.k)).unwrap_or(DEFAULT_K),
        temperature: project
            .and_then(|p| p.temperature)
            .unwrap_or(DEFAULT_TEMPERATURE),
        max_tokens: project
            .and_then(|p| p.max_tokens)
            .unwrap_or(DEFAULT_MAX_TOKENS),
        threshold: threshold
            .or_else(|| project.and_then(|p| p.threshold))
            .unwrap_or(DEFAULT_THRESHOLD),
    }
}

#[async_trait]
impl Evaluator for JudgeEvaluator {
    async fn evaluate(&self, trace: &Trace, assertion: &Assertion, ctx: &EvalContext) -> EvalResult {
        let Assertion::Judge {
            criteria,
            custom_prompt,
            include_system_prompt,
            weight,
            required,
            ..
        } = assertion
        else {
            return EvalResult::new(
                "judge",
                0.0,
                false,
                assertion.weight(),
                assertion.required(),
                "JudgeEvaluator received a non-judge assertion",
            );
        };

        if criteria.is_empty() {
            return EvalResult::new(
                "judge",
                0.0,
                false,
                *weight,
                *required,
                "judge assertion has no criteria to score",
            );
        }

        let resolved = resolve_config(assertion, ctx);

        let adapter_owned;
        let adapter: &dyn Adapter = if let Some(override_adapter) = &ctx.judge_adapter_override {
            override_adapter.as_ref()
        } else {
            match crate::adapters::get_builtin_adapter(&resolved.adapter) {
                Ok(a) => {
                    adapter_owned = a;
                    adapter_owned.as_ref()
                }
                Err(e) => {
                    return EvalResult::new(
                        "judge",
                        0.0,
                        false,
                        *weight,
                        *required,
                        format!("could not resolve judge adapter '{}': {e}", resolved.adapter),
                    )
                }
            }
        };

        let context_block = build_context(
            trace.final_content.as_deref(),
            &trace.tool_calls_made,
            ctx.scenario_system_prompt.as_deref(),
            &ctx.scenario_tools,
            *include_system_prompt,
        );
        let (system_prompt, user_prompt) =
            build_judge_prompt(criteria, &context_block, custom_prompt.as_deref());
        let scoring_tool = build_scoring_tool(criteria);
        let expected_names: Vec<String> = criteria.iter().map(|c| c.name.clone()).collect();

        let mut extras = Map::new();
        extras.insert(
            "tool_choice".to_string(),
            format_tool_choice(adapter.provider_name()),
        );

        let adapter_config = AdapterConfig {
            model: resolved.model.clone(),
            temperature: Some(resolved.temperature),
            max_tokens: Some(resolved.max_tokens),
            seed: None,
            extras,
        };

        let messages = vec![Message::system(&system_prompt), Message::user(&user_prompt)];

        let mut votes = Vec::new();
        let mut total_tokens = TokenUsage::default();
        for _ in 0..resolved.k {
            let turn: TurnResult = match adapter
                .send_turn(&messages, std::slice::from_ref(&scoring_tool), &adapter_config)
                .await
            {
                Ok(turn) => turn,
                Err(_) => continue,
            };

            total_tokens.input_tokens += turn.input_tokens;
            total_tokens.output_tokens += turn.output_tokens;
            total_tokens.total_tokens += turn.input_tokens + turn.output_tokens;

            let tool_call_args = turn
                .tool_calls
                .iter()
                .find(|tc| tc.name == "score_criteria")
                .map(|tc| &tc.arguments);

            if let Some(parsed) = extract_votes(tool_call_args, turn.content.as_deref(), &expected_names) {
                votes.push(parsed);
            }
        }

        let aggregate = aggregate_votes(&votes, criteria, resolved.threshold, resolved.k as usize);
        let judge_cost_usd = estimate_cost(&resolved.model, &total_tokens);

        let details = if aggregate.votes_parsed == 0 {
            format!(
                "judge_parse_failed: none of {} votes could be parsed",
                aggregate.votes_total
            )
        } else {
            format!(
                "{}/{} votes parsed; weighted score {:.3} vs threshold {:.3}",
                aggregate.votes_parsed, aggregate.votes_total, aggregate.score, resolved.threshold
            )
        };

        let mut metadata = Map::new();
        metadata.insert(
            "per_criterion_median".to_string(),
            json!(aggregate.per_criterion_median),
        );
        metadata.insert("votes_parsed".to_string(), json!(aggregate.votes_parsed));
        metadata.insert("votes_total".to_string(), json!(aggregate.votes_total));
        metadata.insert("judge_model".to_string(), json!(resolved.model));
        metadata.insert("judge_adapter".to_string(), json!(resolved.adapter));
        if let Some(cost) = judge_cost_usd {
            metadata.insert("judge_cost_usd".to_string(), json!(cost));
        }

        EvalResult::new("judge", aggregate.score, aggregate.passed, *weight, *required, details)
            .with_metadata(metadata)
    }
}
