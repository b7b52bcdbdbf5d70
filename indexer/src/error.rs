//! Indexer-specific error types

use shared::{FaultCategory, PoolKind, SharedError};
use thiserror::Error;

use crate::services::mailbox::MailboxError;

#[derive(Error, Debug)]
pub enum IndexerError {
    #[error("Mailbox error: {0}")]
    Mailbox(#[from] MailboxError),

    #[error("Counter underflow: {counter} is already zero")]
    CounterUnderflow { counter: &'static str },

    #[error("Pool unavailable: {pool}")]
    PoolUnavailable { pool: PoolKind },

    #[error("Configuration error: {field}: {reason}")]
    ConfigurationError { field: String, reason: String },

    #[error("Coordinator session {session} ended abnormally: {message}")]
    SessionAborted { session: String, message: String },

    #[error("Shared component error: {0}")]
    SharedError(#[from] SharedError),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl IndexerError {
    pub fn config(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ConfigurationError {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

pub type IndexerResult<T> = Result<T, IndexerError>;

/// Errors returned by pool collaborators
///
/// `Reported` is caught by the worker and sent to the coordinator as a
/// failure signal. `Fault` crashes the worker and goes through supervision.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WorkerError {
    #[error("{reason}")]
    Reported { reason: String },

    #[error("worker fault ({category}): {message}")]
    Fault { category: FaultCategory, message: String },
}

impl WorkerError {
    pub fn reported(reason: impl Into<String>) -> Self {
        Self::Reported { reason: reason.into() }
    }

    pub fn fault(category: FaultCategory, message: impl Into<String>) -> Self {
        Self::Fault {
            category,
            message: message.into(),
        }
    }
}

pub type WorkerResult<T> = Result<T, WorkerError>;
