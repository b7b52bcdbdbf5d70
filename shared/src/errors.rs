//! Shared error types for the catalog indexing system

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SharedError {
    #[error("Invalid document type: '{input}'")]
    InvalidDocumentType { input: String },

    #[error("Invalid UUID: {input}")]
    InvalidUuid { input: String },

    #[error("Message protocol error: {message}")]
    ProtocolError { message: String },
}

pub type SharedResult<T> = Result<T, SharedError>;
