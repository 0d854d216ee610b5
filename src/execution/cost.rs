//! Static pricing table and cost estimation.
//!
//! Grounded on `original_source/src/salvo/execution/cost.py`: a static
//! model-id → (input-per-million, output-per-million) USD map, plus an alias
//! table for dated model variants. An unknown model id is a first-class
//! `None`, never silently coerced to zero (see spec §9, "Cost unknown").

use std::collections::HashMap;
use std::sync::OnceLock;

use crate::execution::trace::TokenUsage;

struct Pricing {
    input_per_million: f64,
    output_per_million: f64,
}

fn pricing_table() -> &'static HashMap<&'static str, Pricing> {
    static TABLE: OnceLock<HashMap<&'static str, Pricing>> = OnceLock::new();
    TABLE.get_or_init(|| {
        HashMap::from([
            (
                "gpt-4o",
                Pricing {
                    input_per_million: 2.50,
                    output_per_million: 10.00,
                },
            ),
            (
                "gpt-4o-mini",
                Pricing {
                    input_per_million: 0.15,
                    output_per_million: 0.60,
                },
            ),
            (
                "claude-sonnet-4-5",
                Pricing {
                    input_per_million: 3.00,
                    output_per_million: 15.00,
                },
            ),
            (
                "claude-haiku-4-5",
                Pricing {
                    input_per_million: 1.00,
                    output_per_million: 5.00,
                },
            ),
        ])
    })
}

fn model_aliases() -> &'static HashMap<&'static str, &'static str> {
    static ALIASES: OnceLock<HashMap<&'static str, &'static str>> = OnceLock::new();
    ALIASES.get_or_init(|| {
        HashMap::from([
            ("gpt-4o-2024-08-06", "gpt-4o"),
            ("gpt-4o-2024-05-13", "gpt-4o"),
            ("gpt-4o-mini-2024-07-18", "gpt-4o-mini"),
            ("claude-sonnet-4-5-20250929", "claude-sonnet-4-5"),
            ("claude-haiku-4-5-20251001", "claude-haiku-4-5"),
        ])
    })
}

fn resolve_model<'a>(model: &'a str) -> &'a str {
    model_aliases()
        .get(model)
        .copied()
        .unwrap_or(model)
}

/// Estimated USD cost for the given token usage under `model`'s pricing.
/// `None` when `model` has no pricing table entry (after alias resolution).
/// Rounded to 6 decimals to match the original's persistence round-trip.
pub fn estimate_cost(model: &str, tokens: &TokenUsage) -> Option<f64> {
    let resolved = resolve_model(model);
    let pricing = pricing_table().get(resolved)?;

    let input_cost = tokens.input_tokens as f64 * pricing.input_per_million / 1_000_000.0;
    let output_cost = tokens.output_tokens as f64 * pricing.output_per_million / 1_000_000.0;

    Some(((input_cost + output_cost) * 1_000_000.0).round() / 1_000_000.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_model_is_none() {
        assert_eq!(
            estimate_cost(
                "nonexistent-model",
                &TokenUsage {
                    input_tokens: 100,
                    output_tokens: 100,
                    total_tokens: 200,
                }
            ),
            None
        );
    }

    #[test]
    fn alias_resolves_to_base_pricing() {
        let direct = estimate_cost(
            "gpt-4o",
            &TokenUsage {
                input_tokens: 1_000_000,
                output_tokens: 0,
                total_tokens: 1_000_000,
            },
        );
        let aliased = estimate_cost(
            "gpt-4o-2024-08-06",
            &TokenUsage {
                input_tokens: 1_000_000,
                output_tokens: 0,
                total_tokens: 1_000_000,
            },
        );
        assert_eq!(direct, aliased);
        assert_eq!(direct, Some(2.50));
    }

    #[test]
    fn cost_is_linear_in_tokens() {
        let a = TokenUsage {
            input_tokens: 1000,
            output_tokens: 500,
            total_tokens: 1500,
        };
        let b = TokenUsage {
            input_tokens: 2000,
            output_tokens: 700,
            total_tokens: 2700,
        };
        let combined = TokenUsage {
            input_tokens: a.input_tokens + b.input_tokens,
            output_tokens: a.output_tokens + b.output_tokens,
            total_tokens: a.total_tokens + b.total_tokens,
        };
        let cost_a = estimate_cost("gpt-4o-mini", &a).unwrap();
        let cost_b = estimate_cost("gpt-4o-mini", &b).unwrap();
        let cost_combined = estimate_cost("gpt-4o-mini", &combined).unwrap();
        assert!((cost_a + cost_b - cost_combined).abs() < 1e-9);
    }
}
