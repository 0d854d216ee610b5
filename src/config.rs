//! Plain, already-parsed configuration types. YAML loading and validation are
//! an external collaborator; the core only ever consumes these structs.

use serde::{Deserialize, Serialize};

/// Project-wide judge defaults, the middle tier of the judge configuration
/// resolution order (assertion > project > hard-coded defaults).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JudgeConfig {
    #[serde(default)]
    pub adapter: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub k: Option<u32>,
    #[serde(default)]
    pub temperature: Option<f64>,
    #[serde(default)]
    pub max_tokens: Option<u32>,
    #[serde(default)]
    pub threshold: Option<f64>,
}

/// How the optional trace recorder should behave.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordingMode {
    Full,
    MetadataOnly,
}

impl Default for RecordingMode {
    fn default() -> Self {
        RecordingMode::Full
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecordingConfig {
    #[serde(default)]
    pub mode: RecordingMode,
    #[serde(default)]
    pub custom_redaction_patterns: Vec<String>,
}

/// Top-level project configuration. Scaffolding, scenarios-directory
/// resolution, and storage directory layout stay the host's concern; these
/// fields are the ones the core itself reads.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectConfig {
    #[serde(default)]
    pub default_adapter: Option<String>,
    #[serde(default)]
    pub default_model: Option<String>,
    #[serde(default)]
    pub ci_mode: bool,
    #[serde(default)]
    pub judge: Option<JudgeConfig>,
    #[serde(default)]
    pub recording: Option<RecordingConfig>,
}
