//! Per-assertion evaluation output and the single-run (not N-trial) result
//! wrapper kept for parity with the original's non-suite invocation path.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ScenarioError;
use crate::execution::trace::Trace;

/// The outcome of evaluating one canonical assertion against a [`Trace`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvalResult {
    pub assertion_kind: String,
    pub score: f64,
    pub passed: bool,
    pub weight: f64,
    pub required: bool,
    pub details: String,
    #[serde(default)]
    pub metadata: Option<Map<String, Value>>,
}

impl EvalResult {
    pub fn new(assertion_kind: impl Into<String>, score: f64, passed: bool, weight: f64, required: bool, details: impl Into<String>) -> Self {
        Self {
            assertion_kind: assertion_kind.into(),
            score,
            passed,
            weight,
            required,
            details: details.into(),
            metadata: None,
        }
    }

    pub fn with_metadata(mut self, metadata: Map<String, Value>) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// Metadata about one non-suite invocation: which scenario, which model and
/// adapter, when it ran.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunMetadata {
    pub scenario_name: String,
    pub model: String,
    pub adapter: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// The result of a single scenario run (one trial, no N-trial aggregation).
/// A strict subset of [`crate::trial::SuiteResult`]'s shape, kept because the
/// original's `run` command has a single-trial path distinct from its
/// multi-trial `eval` path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunResult {
    pub metadata: RunMetadata,
    pub trace: Trace,
    pub eval_results: Vec<EvalResult>,
    pub score: f64,
    pub passed: bool,
}

/// Runs a scenario once end-to-end: scenario runner, normalization,
/// evaluation, scoring. Composes [`crate::execution::runner::ScenarioRunner`]
/// and [`crate::evaluation::scorer`] the same way the original's single-run
/// CLI path does, minus argument parsing and rendering.
pub async fn single_run(
    scenario: &crate::scenario::Scenario,
    adapter: &dyn crate::adapters::Adapter,
    adapter_config: &crate::adapters::AdapterConfig,
) -> Result<RunResult, ScenarioError> {
    use crate::evaluation::normalizer::normalize_assertions;
    use crate::evaluation::scorer::evaluate_trace_async;
    use crate::execution::runner::ScenarioRunner;

    let runner = ScenarioRunner::new(scenario.clone());
    let trace = runner.run(adapter, adapter_config).await?;

    let assertions = normalize_assertions(&scenario.assertions)?;
    let eval_results = evaluate_trace_async(&trace, &assertions, &Default::default()).await?;
    let (score, passed, _hard_fail) =
        crate::evaluation::scorer::compute_score(&eval_results, scenario.threshold);

    Ok(RunResult {
        metadata: RunMetadata {
            scenario_name: scenario.name.clone(),
            model: scenario.model.clone(),
            adapter: scenario.adapter.clone(),
            timestamp: chrono::Utc::now(),
        },
        trace,
        eval_results,
        score,
        passed,
    })
}
