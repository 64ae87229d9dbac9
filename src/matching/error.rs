//! Match-run error types.
//!
//! Per-identifier lookup failures never surface here: they are recovered
//! in place by classifying the identifier as unknown.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum MatchError {
    #[error("No genes on input")]
    ExtractionEmpty,

    #[error("Gene lookup service unavailable: {0}")]
    LookupUnavailable(String),

    #[error("Match run cancelled")]
    Cancelled,

    #[error("Match task failed: {0}")]
    Task(String),
}
