//! The exported persistence capability (§6). The core never prescribes a
//! storage layout; it only requires a hook with these three operations.
//! Grounded on `original_source/src/salvo/storage/json_store.py`'s shape —
//! no concrete JSON-file implementation ships here, only the trait.

use async_trait::async_trait;

use crate::execution::trace::Trace;
use crate::recording::RecordedTrace;
use crate::trial::SuiteResult;

/// Safe under concurrent writes of distinct trace ids (§5): implementations
/// are expected to use atomic rename (write-to-temp-then-rename) per file
/// and a mutex for any manifest-style aggregation across calls.
#[async_trait]
pub trait PersistenceHook: Send + Sync {
    /// Idempotent on the same `(trace_id, trace)` pair.
    async fn save_trace(&self, trace_id: &str, trace: &Trace) -> std::io::Result<()>;

    /// Appendable; safe under concurrency.
    async fn save_trace_manifest_entry(
        &self,
        run_id: &str,
        trace_id: &str,
        trial_index: u32,
        status: &str,
        error: Option<&str>,
        scenario_name: &str,
    ) -> std::io::Result<()>;

    async fn save_suite_result(&self, suite: &SuiteResult) -> std::io::Result<()>;

    /// Loads a previously-saved raw trace by id, for
    /// [`crate::recording::TraceRecorder`] to redact and wrap.
    async fn load_trace(&self, trace_id: &str) -> std::io::Result<Option<Trace>>;

    /// Persists a redacted, metadata-wrapped [`RecordedTrace`].
    async fn save_recorded_trace(&self, trace_id: &str, recorded: &RecordedTrace) -> std::io::Result<()>;

    /// Loads a previously-recorded trace by id.
    async fn load_recorded_trace(&self, trace_id: &str) -> std::io::Result<Option<RecordedTrace>>;

    /// Loads whichever recorded trace was most recently marked latest via
    /// [`PersistenceHook::mark_latest_recorded`].
    async fn load_latest_recorded_trace(&self) -> std::io::Result<Option<RecordedTrace>>;

    /// Marks `trace_id` as the latest recorded trace, for
    /// [`PersistenceHook::load_latest_recorded_trace`] to resolve later.
    async fn mark_latest_recorded(&self, trace_id: &str) -> std::io::Result<()>;
}
