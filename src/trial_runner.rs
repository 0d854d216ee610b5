//! Orchestrates N trials of a scenario: sequential or bounded-concurrent,
//! per-trial isolation, retry, early stop, and final suite assembly.
//! Grounded on `original_source/src/salvo/execution/trial_runner.py`; the
//! concurrency primitives are the direct idiomatic-Rust analogue named in
//! SPEC_FULL.md's AMBIENT STACK section (`tokio::sync::{Semaphore, Mutex,
//! Notify}` + `tokio::task::JoinSet` standing in for `asyncio.Semaphore` +
//! `asyncio.Event` + `TaskGroup`).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::{Mutex, Notify, Semaphore};
use tokio::task::JoinSet;

use crate::adapters::{Adapter, AdapterConfig, AdapterFactory};
use crate::aggregation::{aggregate_failures, compute_aggregate_metrics, determine_verdict};
use crate::config::JudgeConfig;
use crate::evaluation::evaluators::EvalContext;
use crate::evaluation::normalizer::normalize_assertions;
use crate::evaluation::scorer::{compute_score, evaluate_trace_async};
use crate::execution::retry::retry_with_backoff;
use crate::execution::runner::ScenarioRunner;
use crate::execution::trace::{TokenUsage, Trace};
use crate::message::Message;
use crate::persistence::PersistenceHook;
use crate::scenario::Scenario;
use crate::trial::{SuiteResult, TrialResult, TrialStatus};

#[derive(Error, Debug)]
pub enum TrialError {
    #[error("scenario error: {0}")]
    Scenario(#[from] crate::error::ScenarioError),
}

/// Everything the Trial Runner needs beyond the [`Scenario`] and
/// [`AdapterFactory`] themselves (§4.9).
pub struct TrialRunnerConfig {
    pub n_trials: u32,
    pub max_parallel: u32,
    pub max_retries: u32,
    pub early_stop: bool,
    pub threshold: f64,
    pub project_judge_config: Option<JudgeConfig>,
    pub verbose: bool,
    /// When true, [`crate::aggregation::determine_verdict`] re-runs the
    /// verdict selection over scored trials only (§6).
    pub allow_infra: bool,
}

type SharedAdapterFactory = Arc<dyn Fn() -> Box<dyn Adapter> + Send + Sync>;

pub struct TrialRunner {
    scenario: Arc<Scenario>,
    adapter_config: AdapterConfig,
    adapter_factory: SharedAdapterFactory,
    config: TrialRunnerConfig,
    persistence: Option<Arc<dyn PersistenceHook>>,
}

impl TrialRunner {
    pub fn new(
        scenario: Scenario,
        adapter_config: AdapterConfig,
        adapter_factory: AdapterFactory,
        config: TrialRunnerConfig,
        persistence: Option<Arc<dyn PersistenceHook>>,
    ) -> Self {
        Self {
            scenario: Arc::new(scenario),
            adapter_config,
            adapter_factory: Arc::from(adapter_factory),
            config,
            persistence,
        }
    }

    /// Per-trial execution (§4.9): run the scenario inside the retry
    /// wrapper, normalize assertions, evaluate, derive status. On
    /// exhausted retries, builds a minimal placeholder trace instead.
    async fn run_one_trial(
        scenario: Arc<Scenario>,
        adapter_config: AdapterConfig,
        adapter: Box<dyn Adapter>,
        trial_number: u32,
        max_retries: u32,
        threshold: f64,
        project_judge_config: Option<JudgeConfig>,
        verbose: bool,
        persistence: Option<Arc<dyn PersistenceHook>>,
    ) -> TrialResult {
        let trace_id = uuid::Uuid::new_v4().to_string();
        tracing::debug!(trial_number, %trace_id, "starting trial");

        let started_at = std::time::Instant::now();
        let run_attempt = || {
            let scenario = Arc::clone(&scenario);
            let adapter = adapter.as_ref();
            let adapter_config = adapter_config.clone();
            async move {
                let runner = ScenarioRunner::new((*scenario).clone());
                runner.run(adapter, &adapter_config).await
            }
        };

        let outcome = retry_with_backoff(
            run_attempt,
            Some(max_retries),
            |e: &crate::execution::RunnerError| e.is_transient(),
            |e: &crate::execution::RunnerError| e.transient_type_name(),
        )
        .await;

        match outcome {
            Ok(retry_outcome) => {
                let trace = retry_outcome.result;
                if let Some(hook) = &persistence {
                    let _ = hook.save_trace(&trace_id, &trace).await;
                }

                let ctx = EvalContext {
                    scenario_system_prompt: scenario.system_prompt.clone(),
                    scenario_tools: scenario.tools.clone(),
                    project_judge_config,
                    judge_adapter_override: None,
                    verbose,
                };

                let assertions = match normalize_assertions(&scenario.assertions) {
                    Ok(a) => a,
                    Err(e) => {
                        return TrialResult {
                            trial_number,
                            status: TrialStatus::InfraError,
                            score: 0.0,
                            passed: false,
                            eval_results: vec![],
                            latency_seconds: trace.elapsed_seconds,
                            cost_usd: trace.cost_usd,
                            retries_used: retry_outcome.retries_used,
                            transient_errors_seen: retry_outcome
                                .transient_errors_seen
                                .iter()
                                .map(|s| s.to_string())
                                .collect(),
                            error_message: Some(e.to_string()),
                            trace_id: Some(trace_id),
                        };
                    }
                };

                let eval_results = evaluate_trace_async(&trace, &assertions, &ctx)
                    .await
                    .unwrap_or_default();
                let (score, passed, hard_fail) = compute_score(&eval_results, threshold);

                let status = if hard_fail.is_some() {
                    TrialStatus::HardFail
                } else if passed {
                    TrialStatus::Passed
                } else {
                    TrialStatus::Failed
                };

                TrialResult {
                    trial_number,
                    status,
                    score,
                    passed,
                    eval_results,
                    latency_seconds: trace.elapsed_seconds,
                    cost_usd: trace.cost_usd,
                    retries_used: retry_outcome.retries_used,
                    transient_errors_seen: retry_outcome
                        .transient_errors_seen
                        .iter()
                        .map(|s| s.to_string())
                        .collect(),
                    error_message: None,
                    trace_id: Some(trace_id),
                }
            }
            // retry_with_backoff only reports retries_used/transient types on
            // success (§4.3); on exhaustion we only have the final error, so
            // retries_used is reported as the configured ceiling (§4.9 step 7).
            Err(error) => {
                let elapsed_seconds = started_at.elapsed().as_secs_f64();
                tracing::warn!(trial_number, %error, "trial failed after retries");

                let mut messages = Vec::new();
                if let Some(system_prompt) = &scenario.system_prompt {
                    messages.push(Message::system(system_prompt));
                }
                messages.push(Message::user(&scenario.user_prompt));

                let placeholder = Trace {
                    messages,
                    tool_calls_made: vec![],
                    turn_count: 0,
                    tokens: TokenUsage::default(),
                    elapsed_seconds,
                    final_content: None,
                    finish_reason: "error".to_string(),
                    model: scenario.model.clone(),
                    provider: scenario.adapter.clone(),
                    timestamp: chrono::Utc::now(),
                    scenario_hash: String::new(),
                    cost_usd: None,
                    extras_resolved: scenario.extras.clone(),
                    max_turns_hit: false,
                };

                if let Some(hook) = &persistence {
                    let _ = hook.save_trace(&trace_id, &placeholder).await;
                }

                TrialResult {
                    trial_number,
                    status: TrialStatus::InfraError,
                    score: 0.0,
                    passed: false,
                    eval_results: vec![],
                    latency_seconds: elapsed_seconds,
                    cost_usd: None,
                    retries_used: max_retries,
                    transient_errors_seen: vec![],
                    error_message: Some(error.to_string()),
                    trace_id: Some(trace_id),
                }
            }
        }
    }

    /// Returns true iff no further trial could change the outcome: a
    /// hard fail has already occurred, or the best possible average
    /// (every remaining trial scoring 1.0) still can't clear the
    /// threshold.
    fn should_stop(completed: &[Option<TrialResult>], n_trials: u32, threshold: f64) -> Option<String> {
        let done: Vec<&TrialResult> = completed.iter().filter_map(|t| t.as_ref()).collect();

        if let Some(hard_fail) = done.iter().find(|t| t.status == TrialStatus::HardFail) {
            return Some(format!("trial {} hard-failed", hard_fail.trial_number));
        }

        let n = n_trials as f64;
        let completed_sum: f64 = done.iter().map(|t| t.score).sum();
        let remaining = n - done.len() as f64;
        if (completed_sum + remaining) / n < threshold {
            return Some("threshold mathematically unreachable".to_string());
        }
        None
    }

    /// Runs all configured trials and assembles the final [`SuiteResult`].
    /// `progress` is invoked after each trial completes with
    /// `(trial_number, n_trials)`.
    pub async fn run(
        &self,
        progress: Option<Arc<dyn Fn(u32, u32) + Send + Sync>>,
    ) -> Result<SuiteResult, TrialError> {
        let run_id = uuid::Uuid::new_v4().to_string();
        let n = self.config.n_trials;

        let (trials, early_stop_reason) = if self.config.max_parallel <= 1 {
            self.run_sequential(n, progress).await
        } else {
            self.run_concurrent(n, progress).await
        };

        self.assemble(run_id, trials, early_stop_reason)
    }

    async fn run_sequential(
        &self,
        n: u32,
        progress: Option<Arc<dyn Fn(u32, u32) + Send + Sync>>,
    ) -> (Vec<Option<TrialResult>>, Option<String>) {
        let mut slots: Vec<Option<TrialResult>> = vec![None; n as usize];
        let mut early_stop_reason = None;

        for trial_number in 1..=n {
            let adapter = (self.adapter_factory)();
            let result = Self::run_one_trial(
                Arc::clone(&self.scenario),
                self.adapter_config.clone(),
                adapter,
                trial_number,
                self.config.max_retries,
                self.config.threshold,
                self.config.project_judge_config.clone(),
                self.config.verbose,
                self.persistence.clone(),
            )
            .await;
            slots[(trial_number - 1) as usize] = Some(result);

            if let Some(cb) = &progress {
                cb(trial_number, n);
            }

            if self.config.early_stop {
                if let Some(reason) = Self::should_stop(&slots, n, self.config.threshold) {
                    early_stop_reason = Some(reason);
                    break;
                }
            }
        }

        (slots, early_stop_reason)
    }

    async fn run_concurrent(
        &self,
        n: u32,
        progress: Option<Arc<dyn Fn(u32, u32) + Send + Sync>>,
    ) -> (Vec<Option<TrialResult>>, Option<String>) {
        let semaphore = Arc::new(Semaphore::new(self.config.max_parallel as usize));
        let stop_event = Arc::new(Notify::new());
        let stopped = Arc::new(AtomicBool::new(false));
        let slots = Arc::new(Mutex::new(vec![None; n as usize]));
        let reason_slot: Arc<Mutex<Option<String>>> = Arc::new(Mutex::new(None));

        let mut tasks = JoinSet::new();
        for trial_number in 1..=n {
            let semaphore = Arc::clone(&semaphore);
            let stop_event = Arc::clone(&stop_event);
            let stopped = Arc::clone(&stopped);
            let slots = Arc::clone(&slots);
            let reason_slot = Arc::clone(&reason_slot);
            let scenario = Arc::clone(&self.scenario);
            let adapter_config = self.adapter_config.clone();
            let adapter = (self.adapter_factory)();
            let max_retries = self.config.max_retries;
            let threshold = self.config.threshold;
            let project_judge_config = self.config.project_judge_config.clone();
            let verbose = self.config.verbose;
            let persistence = self.persistence.clone();
            let progress = progress.clone();
            let early_stop = self.config.early_stop;

            tasks.spawn(async move {
                let permit = tokio::select! {
                    permit = semaphore.acquire() => permit.expect("semaphore not closed"),
                    _ = stop_event.notified() => return,
                };
                if stopped.load(Ordering::SeqCst) {
                    drop(permit);
                    return;
                }

                let result = TrialRunner::run_one_trial(
                    scenario,
                    adapter_config,
                    adapter,
                    trial_number,
                    max_retries,
                    threshold,
                    project_judge_config,
                    verbose,
                    persistence,
                )
                .await;
                drop(permit);

                let mut guard = slots.lock().await;
                guard[(trial_number - 1) as usize] = Some(result);
                let reason = if early_stop { TrialRunner::should_stop(&guard, n, threshold) } else { None };
                drop(guard);

                if let Some(cb) = &progress {
                    cb(trial_number, n);
                }

                if reason.is_some() {
                    stopped.store(true, Ordering::SeqCst);
                    stop_event.notify_waiters();
                    let mut r = reason_slot.lock().await;
                    if r.is_none() {
                        *r = reason;
                    }
                }
            });
        }

        while tasks.join_next().await.is_some() {}

        let final_slots = slots.lock().await.clone();
        let early_stop_reason = reason_slot.lock().await.clone();
        (final_slots, early_stop_reason)
    }

    fn assemble(
        &self,
        run_id: String,
        slots: Vec<Option<TrialResult>>,
        early_stop_reason: Option<String>,
    ) -> Result<SuiteResult, TrialError> {
        let trials: Vec<TrialResult> = slots.into_iter().flatten().collect();
        let trials_total = trials.len() as u32;
        let early_stopped = trials_total < self.config.n_trials;

        let metrics = compute_aggregate_metrics(&trials);
        let verdict = determine_verdict(&metrics, self.config.threshold, self.config.allow_infra);
        let assertion_failures = aggregate_failures(&trials);

        let judge_cost_total: f64 = trials
            .iter()
            .flat_map(|t| &t.eval_results)
            .filter_map(|r| r.metadata.as_ref())
            .filter_map(|m| m.get("judge_cost_usd"))
            .filter_map(|v| v.as_f64())
            .sum();
        let judge_cost_total = if judge_cost_total > 0.0 { Some(judge_cost_total) } else { None };

        let total_retries: u32 = trials.iter().map(|t| t.retries_used).sum();
        let trials_with_retries = trials.iter().filter(|t| t.retries_used > 0).count() as u32;

        Ok(SuiteResult {
            run_id,
            scenario_name: self.scenario.name.clone(),
            model: self.scenario.model.clone(),
            adapter: self.scenario.adapter.clone(),
            trials_total,
            trials_passed: metrics.trials_passed,
            trials_failed: metrics.trials_failed,
            trials_hard_fail: metrics.trials_hard_fail,
            trials_infra_error: metrics.trials_infra_error,
            verdict,
            pass_rate: metrics.pass_rate,
            score_stats: metrics.score_stats,
            threshold: self.config.threshold,
            cost_total: metrics.cost_total,
            cost_avg_per_trial: metrics.cost_avg_per_trial,
            judge_cost_total,
            latency_p50: metrics.latency_p50,
            latency_p95: metrics.latency_p95,
            total_retries,
            trials_with_retries,
            early_stopped,
            early_stop_reason,
            n_requested: self.config.n_trials,
            assertion_failures,
            trials,
        })
    }
}
