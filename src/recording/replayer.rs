//! Loads recorded traces for replay display or re-evaluation. Grounded on
//! `original_source/src/salvo/recording/replayer.py`.

use std::sync::Arc;

use crate::config::RecordingMode;
use crate::persistence::PersistenceHook;
use crate::recording::models::RecordedTrace;

pub struct TraceReplayer {
    persistence: Arc<dyn PersistenceHook>,
}

impl TraceReplayer {
    pub fn new(persistence: Arc<dyn PersistenceHook>) -> Self {
        Self { persistence }
    }

    /// Loads a recorded trace by id, or the most recently recorded one when
    /// `trace_id` is `None`.
    pub async fn load(&self, trace_id: Option<&str>) -> std::io::Result<Option<RecordedTrace>> {
        match trace_id {
            Some(id) => self.persistence.load_recorded_trace(id).await,
            None => self.persistence.load_latest_recorded_trace().await,
        }
    }

    pub fn is_metadata_only(&self, recorded: &RecordedTrace) -> bool {
        recorded.metadata.recording_mode == RecordingMode::MetadataOnly
    }
}
