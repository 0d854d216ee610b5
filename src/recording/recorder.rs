//! Orchestrates recording: redaction, recording-mode handling, and
//! persistence of one suite's trial traces. Grounded on
//! `original_source/src/salvo/recording/recorder.py`.

use std::sync::Arc;

use chrono::Utc;

use crate::config::RecordingMode;
use crate::persistence::PersistenceHook;
use crate::recording::models::{RecordedTrace, RecordingError, TraceMetadata, CURRENT_TRACE_SCHEMA_VERSION};
use crate::recording::redaction::{apply_custom_redaction, build_redaction_pipeline, strip_content_for_metadata_only};
use crate::scenario::Scenario;
use crate::trial::SuiteResult;

pub struct TraceRecorder {
    persistence: Arc<dyn PersistenceHook>,
    recording_mode: RecordingMode,
    redact_fn: Box<dyn Fn(&str) -> String + Send + Sync>,
}

impl TraceRecorder {
    pub fn new(
        persistence: Arc<dyn PersistenceHook>,
        recording_mode: RecordingMode,
        custom_patterns: &[String],
    ) -> Result<Self, RecordingError> {
        Ok(Self {
            persistence,
            recording_mode,
            redact_fn: build_redaction_pipeline(custom_patterns)?,
        })
    }

    /// Records every trial in `suite` that produced a trace: loads the raw
    /// trace, redacts it, strips content under `metadata_only`, wraps it in
    /// a [`RecordedTrace`] with metadata, and persists it. Trials whose
    /// trace failed to load are skipped, not fatal. Returns the trace ids
    /// that were successfully recorded, and marks the last one as latest.
    pub async fn record_suite(
        &self,
        suite: &SuiteResult,
        scenario: &Scenario,
        scenario_file: &str,
    ) -> Vec<String> {
        let mut recorded_ids = Vec::new();

        for trial in &suite.trials {
            let Some(trace_id) = &trial.trace_id else {
                continue;
            };

            let trace = match self.persistence.load_trace(trace_id).await {
                Ok(Some(trace)) => trace,
                Ok(None) => {
                    tracing::warn!(trace_id, "no trace found for recorded trial, skipping");
                    continue;
                }
                Err(err) => {
                    tracing::warn!(trace_id, %err, "failed to load trace for recording, skipping");
                    continue;
                }
            };

            let mut redacted = apply_custom_redaction(&trace, &*self.redact_fn);
            if self.recording_mode == RecordingMode::MetadataOnly {
                redacted = strip_content_for_metadata_only(&redacted);
            }

            let metadata = TraceMetadata {
                schema_version: CURRENT_TRACE_SCHEMA_VERSION,
                recording_mode: self.recording_mode,
                salvo_version: env!("CARGO_PKG_VERSION").to_string(),
                recorded_at: Utc::now(),
                source_run_id: suite.run_id.clone(),
                scenario_name: suite.scenario_name.clone(),
                scenario_file: scenario_file.to_string(),
                scenario_hash: trace.scenario_hash.clone(),
            };

            let scenario_snapshot = serde_json::to_value(scenario).unwrap_or(serde_json::Value::Null);

            let recorded = RecordedTrace {
                metadata,
                trace: redacted,
                scenario_snapshot,
                original_trace_id: None,
            };

            if let Err(err) = self.persistence.save_recorded_trace(trace_id, &recorded).await {
                tracing::warn!(trace_id, %err, "failed to persist recorded trace, skipping");
                continue;
            }
            recorded_ids.push(trace_id.clone());
        }

        if let Some(last) = recorded_ids.last() {
            let _ = self.persistence.mark_latest_recorded(last).await;
        }

        recorded_ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use crate::execution::trace::{TokenUsage, Trace};
    use crate::message::Message;
    use crate::trial::{TrialResult, TrialStatus};

    #[derive(Default)]
    struct MemoryStore {
        traces: Mutex<std::collections::HashMap<String, Trace>>,
        recorded: Mutex<std::collections::HashMap<String, RecordedTrace>>,
        latest: Mutex<Option<String>>,
    }

    #[async_trait]
    impl PersistenceHook for MemoryStore {
        async fn save_trace(&self, trace_id: &str, trace: &Trace) -> std::io::Result<()> {
            self.traces.lock().unwrap().insert(trace_id.to_string(), trace.clone());
            Ok(())
        }
        async fn save_trace_manifest_entry(
            &self,
            _run_id: &str,
            _trace_id: &str,
            _trial_index: u32,
            _status: &str,
            _error: Option<&str>,
            _scenario_name: &str,
        ) -> std::io::Result<()> {
            Ok(())
        }
        async fn save_suite_result(&self, _suite: &SuiteResult) -> std::io::Result<()> {
            Ok(())
        }
        async fn load_trace(&self, trace_id: &str) -> std::io::Result<Option<Trace>> {
            Ok(self.traces.lock().unwrap().get(trace_id).cloned())
        }
        async fn save_recorded_trace(&self, trace_id: &str, recorded: &RecordedTrace) -> std::io::Result<()> {
            self.recorded.lock().unwrap().insert(trace_id.to_string(), recorded.clone());
            Ok(())
        }
        async fn load_recorded_trace(&self, trace_id: &str) -> std::io::Result<Option<RecordedTrace>> {
            Ok(self.recorded.lock().unwrap().get(trace_id).cloned())
        }
        async fn load_latest_recorded_trace(&self) -> std::io::Result<Option<RecordedTrace>> {
            let latest = self.latest.lock().unwrap().clone();
            match latest {
                Some(id) => self.load_recorded_trace(&id).await,
                None => Ok(None),
            }
        }
        async fn mark_latest_recorded(&self, trace_id: &str) -> std::io::Result<()> {
            *self.latest.lock().unwrap() = Some(trace_id.to_string());
            Ok(())
        }
    }

    fn sample_scenario() -> Scenario {
        Scenario {
            name: "greet".to_string(),
            model: "gpt-4o".to_string(),
            adapter: "openai".to_string(),
            system_prompt: None,
            user_prompt: "hi".to_string(),
            tools: vec![],
            assertions: vec![],
            threshold: 0.8,
            max_turns: 10,
            temperature: None,
            seed: None,
            extras: Default::default(),
        }
    }

    fn sample_trace(hash: &str) -> Trace {
        Trace {
            messages: vec![Message::user("hi"), Message::assistant(Some("hello".to_string()), None)],
            tool_calls_made: vec![],
            turn_count: 1,
            tokens: TokenUsage::default(),
            elapsed_seconds: 0.2,
            final_content: Some("hello".to_string()),
            finish_reason: "stop".to_string(),
            model: "gpt-4o".to_string(),
            provider: "openai".to_string(),
            timestamp: Utc::now(),
            scenario_hash: hash.to_string(),
            cost_usd: Some(0.001),
            extras_resolved: Default::default(),
            max_turns_hit: false,
        }
    }

    fn trial_with_trace(trace_id: &str) -> TrialResult {
        TrialResult {
            trial_number: 1,
            status: TrialStatus::Passed,
            score: 1.0,
            passed: true,
            eval_results: vec![],
            latency_seconds: 0.2,
            cost_usd: Some(0.001),
            retries_used: 0,
            transient_errors_seen: vec![],
            error_message: None,
            trace_id: Some(trace_id.to_string()),
        }
    }

    fn sample_suite(trials: Vec<TrialResult>) -> SuiteResult {
        SuiteResult {
            run_id: "run-1".to_string(),
            scenario_name: "greet".to_string(),
            model: "gpt-4o".to_string(),
            adapter: "openai".to_string(),
            trials_total: trials.len() as u32,
            trials_passed: trials.len() as u32,
            trials_failed: 0,
            trials_hard_fail: 0,
            trials_infra_error: 0,
            verdict: crate::trial::Verdict::Pass,
            pass_rate: 1.0,
            score_stats: None,
            threshold: 0.8,
            cost_total: None,
            cost_avg_per_trial: None,
            judge_cost_total: None,
            latency_p50: None,
            latency_p95: None,
            total_retries: 0,
            trials_with_retries: 0,
            early_stopped: false,
            early_stop_reason: None,
            n_requested: trials.len() as u32,
            assertion_failures: vec![],
            trials,
        }
    }

    #[tokio::test]
    async fn records_every_trial_with_a_trace_and_marks_latest() {
        let store = Arc::new(MemoryStore::default());
        store.save_trace("trace-1", &sample_trace("abc")).await.unwrap();
        store.save_trace("trace-2", &sample_trace("def")).await.unwrap();

        let recorder = TraceRecorder::new(store.clone(), RecordingMode::Full, &[]).unwrap();
        let suite = sample_suite(vec![trial_with_trace("trace-1"), trial_with_trace("trace-2")]);
        let recorded = recorder.record_suite(&suite, &sample_scenario(), "scenarios/greet.yaml").await;

        assert_eq!(recorded, vec!["trace-1".to_string(), "trace-2".to_string()]);
        assert!(store.load_recorded_trace("trace-1").await.unwrap().is_some());
        assert_eq!(
            store.load_latest_recorded_trace().await.unwrap().unwrap().metadata.source_run_id,
            "run-1"
        );
    }

    #[tokio::test]
    async fn metadata_only_mode_strips_recorded_content() {
        let store = Arc::new(MemoryStore::default());
        store.save_trace("trace-1", &sample_trace("abc")).await.unwrap();

        let recorder = TraceRecorder::new(store.clone(), RecordingMode::MetadataOnly, &[]).unwrap();
        let suite = sample_suite(vec![trial_with_trace("trace-1")]);
        recorder.record_suite(&suite, &sample_scenario(), "scenarios/greet.yaml").await;

        let recorded = store.load_recorded_trace("trace-1").await.unwrap().unwrap();
        assert_eq!(recorded.trace.messages[0].content.as_deref(), Some("[CONTENT_EXCLUDED]"));
        assert!(recorded.trace.final_content.is_none());
    }

    #[tokio::test]
    async fn trial_without_trace_id_is_skipped() {
        let store = Arc::new(MemoryStore::default());
        let recorder = TraceRecorder::new(store.clone(), RecordingMode::Full, &[]).unwrap();
        let mut trial = trial_with_trace("unused");
        trial.trace_id = None;
        let suite = sample_suite(vec![trial]);
        let recorded = recorder.record_suite(&suite, &sample_scenario(), "scenarios/greet.yaml").await;
        assert!(recorded.is_empty());
    }
}
