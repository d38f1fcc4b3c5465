//! Birdcall error taxonomy.
//!
//! One enum for the whole workspace. Validation and not-found errors surface
//! synchronously to the caller; persistence and execution errors are logged
//! at the site that can decide what degrading gracefully means there.

use thiserror::Error;

/// All errors produced by Birdcall crates.
#[derive(Debug, Error)]
pub enum BirdcallError {
    /// A field of a new schedule failed validation. Nothing was persisted.
    #[error("invalid {field}: {reason}")]
    Validation { field: &'static str, reason: String },

    /// The referenced schedule id does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Reading or writing the schedule file failed.
    #[error("persistence error: {0}")]
    Persistence(String),

    /// The platform write API rejected or never received a submission.
    #[error("post submission failed: {0}")]
    Execution(String),

    /// Config file could not be read, parsed, or written.
    #[error("config error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl BirdcallError {
    /// Shorthand for a validation failure on a named field.
    pub fn validation(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Validation {
            field,
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, BirdcallError>;
