//! Assertion normalization, the path-query micro-language, the five
//! evaluators, and the scorer that rolls their results up into one verdict.

pub mod evaluators;
pub mod normalizer;
pub mod path_query;
pub mod scorer;

mod judge;

use thiserror::Error;

use crate::evaluation::normalizer::NormalizeError;

#[derive(Error, Debug)]
pub enum EvaluationError {
    #[error("assertion normalization error: {0}")]
    Normalize(#[from] NormalizeError),
}
