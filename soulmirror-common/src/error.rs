//! Common error types for SoulMirror

use thiserror::Error;

/// Common result type for SoulMirror operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types shared by the engine and its hosts
///
/// Configuration and malformed-input errors are structural failures: they are
/// returned to the caller synchronously and never retried. A missing archetype
/// is not an error at all (the resolver substitutes a placeholder).
#[derive(Error, Debug)]
pub enum Error {
    /// Definition table, question bank or config file is missing or invalid
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Answer value outside the scale, or answer to a question not in the bank
    #[error("Malformed answer for question {question_id} (value {value}): {reason}")]
    MalformedAnswer {
        question_id: u32,
        value: u8,
        reason: String,
    },

    /// Report requested before every question was answered
    #[error("Incomplete session: {answered} of {total} questions answered")]
    IncompleteSession { answered: usize, total: usize },

    /// Session action not allowed in the current state
    #[error("Invalid transition: cannot {action} while {from}")]
    InvalidTransition { from: String, action: String },

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parse error (wraps toml::de::Error)
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// JSON parse error (wraps serde_json::Error)
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub(crate) fn malformed(question_id: u32, value: u8, reason: impl Into<String>) -> Self {
        Error::MalformedAnswer {
            question_id,
            value,
            reason: reason.into(),
        }
    }
}
