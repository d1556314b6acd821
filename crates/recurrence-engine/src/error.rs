//! Error types for recurrence-engine operations.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RecurrenceError {
    #[error("Invalid rule: {0}")]
    InvalidRule(String),

    #[error("Malformed encoded rule: {0}")]
    MalformedEncoding(String),

    #[error("Pattern too complex: gave up after {operations} candidate evaluations")]
    PatternTooComplex { operations: usize },

    #[error("No occurrence found: {0}")]
    NoOccurrence(String),

    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Invalid timezone: {0}")]
    InvalidTimezone(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, RecurrenceError>;
