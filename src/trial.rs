//! The N-trial result data model: one [`TrialResult`] per trial, rolled up
//! into a [`SuiteResult`] by [`crate::trial_runner::TrialRunner`] and
//! [`crate::aggregation`].

use serde::{Deserialize, Serialize};

use crate::result::EvalResult;

/// A trial's terminal outcome. Derivation (§3): any required [`EvalResult`]
/// failed → `HardFail`; else if the scorer says passed → `Passed`; else →
/// `Failed`; an execution exception surviving retries → `InfraError`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrialStatus {
    Passed,
    Failed,
    HardFail,
    InfraError,
}

/// The outcome of running one trial of a [`crate::scenario::Scenario`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrialResult {
    pub trial_number: u32,
    pub status: TrialStatus,
    pub score: f64,
    pub passed: bool,
    pub eval_results: Vec<EvalResult>,
    pub latency_seconds: f64,
    pub cost_usd: Option<f64>,
    pub retries_used: u32,
    pub transient_errors_seen: Vec<String>,
    pub error_message: Option<String>,
    pub trace_id: Option<String>,
}

/// Cross-trial verdict. Exit-code mapping (for a host CLI, §6): PASS=0,
/// FAIL=1, PARTIAL=1, HARD_FAIL=2, INFRA_ERROR=3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Pass,
    Fail,
    Partial,
    HardFail,
    InfraError,
}

impl Verdict {
    pub fn exit_code(self) -> i32 {
        match self {
            Verdict::Pass => 0,
            Verdict::Fail | Verdict::Partial => 1,
            Verdict::HardFail => 2,
            Verdict::InfraError => 3,
        }
    }
}

/// Score statistics over the scored trials (status != `InfraError`) of a
/// suite.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ScoreStats {
    pub avg: f64,
    pub min: f64,
    pub p50: f64,
    pub p95: f64,
}

/// One ranked group of recurring assertion failures (§4.8).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssertionFailureGroup {
    pub kind: String,
    pub detail_prefix: String,
    pub fail_count: u32,
    pub fail_rate: f64,
    pub total_weight_lost: f64,
    pub sample_details: Vec<String>,
}

/// The full result of one N-trial invocation of a scenario.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuiteResult {
    pub run_id: String,
    pub scenario_name: String,
    pub model: String,
    pub adapter: String,
    pub trials: Vec<TrialResult>,
    pub trials_total: u32,
    pub trials_passed: u32,
    pub trials_failed: u32,
    pub trials_hard_fail: u32,
    pub trials_infra_error: u32,
    pub verdict: Verdict,
    pub pass_rate: f64,
    pub score_stats: Option<ScoreStats>,
    pub threshold: f64,
    pub cost_total: Option<f64>,
    pub cost_avg_per_trial: Option<f64>,
    pub judge_cost_total: Option<f64>,
    pub latency_p50: Option<f64>,
    pub latency_p95: Option<f64>,
    pub total_retries: u32,
    pub trials_with_retries: u32,
    pub early_stopped: bool,
    pub early_stop_reason: Option<String>,
    pub n_requested: u32,
    pub assertion_failures: Vec<AssertionFailureGroup>,
}
