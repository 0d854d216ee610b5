//! The recorded-trace schema and re-evaluation result. Grounded on
//! `original_source/src/salvo/recording/models.py`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::config::RecordingMode;
use crate::execution::trace::Trace;
use crate::result::EvalResult;

/// Current schema version for recorded trace files.
pub const CURRENT_TRACE_SCHEMA_VERSION: u32 = 1;

#[derive(Error, Debug)]
pub enum RecordingError {
    #[error(
        "trace schema version {found} is newer than supported version {supported}; upgrade to read this trace"
    )]
    SchemaVersionTooNew { found: u32, supported: u32 },

    #[error("invalid custom redaction pattern '{0}': {1}")]
    InvalidPattern(String, #[source] regex::Error),
}

/// Metadata attached to a recorded trace: schema version, recording mode,
/// crate version, timestamps, and source run information.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceMetadata {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    #[serde(default)]
    pub recording_mode: RecordingMode,
    pub salvo_version: String,
    pub recorded_at: DateTime<Utc>,
    pub source_run_id: String,
    pub scenario_name: String,
    pub scenario_file: String,
    pub scenario_hash: String,
}

fn default_schema_version() -> u32 {
    CURRENT_TRACE_SCHEMA_VERSION
}

/// A complete recorded trace: the execution trace, its recording metadata,
/// a snapshot of the scenario that produced it, and an optional link back
/// to the original trace id (for traces produced by re-evaluation).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordedTrace {
    pub metadata: TraceMetadata,
    pub trace: Trace,
    pub scenario_snapshot: Value,
    #[serde(default)]
    pub original_trace_id: Option<String>,
}

/// The result of re-evaluating a recorded trace against updated assertions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RevalResult {
    pub reeval_id: String,
    pub original_trace_id: String,
    pub scenario_name: String,
    #[serde(default)]
    pub scenario_file: Option<String>,
    pub eval_results: Vec<EvalResult>,
    pub score: f64,
    pub passed: bool,
    pub threshold: f64,
    pub evaluated_at: DateTime<Utc>,
    pub assertions_used: u32,
    #[serde(default)]
    pub assertions_skipped: u32,
}

/// Rejects a trace recorded under a schema version newer than this crate
/// understands.
pub fn validate_trace_version(metadata: &TraceMetadata) -> Result<(), RecordingError> {
    if metadata.schema_version > CURRENT_TRACE_SCHEMA_VERSION {
        return Err(RecordingError::SchemaVersionTooNew {
            found: metadata.schema_version,
            supported: CURRENT_TRACE_SCHEMA_VERSION,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metadata(schema_version: u32) -> TraceMetadata {
        TraceMetadata {
            schema_version,
            recording_mode: RecordingMode::Full,
            salvo_version: "0.1.0".to_string(),
            recorded_at: Utc::now(),
            source_run_id: "run-1".to_string(),
            scenario_name: "test".to_string(),
            scenario_file: "scenarios/test.yaml".to_string(),
            scenario_hash: "deadbeef".to_string(),
        }
    }

    #[test]
    fn current_schema_version_passes() {
        assert!(validate_trace_version(&metadata(CURRENT_TRACE_SCHEMA_VERSION)).is_ok());
    }

    #[test]
    fn future_schema_version_is_rejected() {
        let err = validate_trace_version(&metadata(CURRENT_TRACE_SCHEMA_VERSION + 1)).unwrap_err();
        assert!(matches!(err, RecordingError::SchemaVersionTooNew { .. }));
    }
}
