//! Recording, redaction, and replay of trial traces for later review or
//! re-evaluation (§"Recording / replay data types" in SPEC_FULL.md).
//! Grounded on `original_source/src/salvo/recording/`.

pub mod models;
pub mod recorder;
pub mod redaction;
pub mod replayer;

pub use models::{RecordedTrace, RecordingError, RevalResult, TraceMetadata, CURRENT_TRACE_SCHEMA_VERSION};
pub use recorder::TraceRecorder;
pub use replayer::TraceReplayer;
