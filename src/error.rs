use thiserror::Error;

use crate::adapters::AdapterError;
use crate::evaluation::EvaluationError;
use crate::execution::RunnerError;

/// Errors raised while evaluating assertions against a captured [`crate::execution::Trace`].
#[derive(Error, Debug)]
pub enum ScenarioError {
    #[error("adapter error: {0}")]
    Adapter(#[from] AdapterError),

    #[error("scenario runner error: {0}")]
    Runner(#[from] RunnerError),

    #[error("evaluation error: {0}")]
    Evaluation(#[from] EvaluationError),

    #[error("serde error: {0}")]
    Serde(#[from] serde_json::Error),
}
