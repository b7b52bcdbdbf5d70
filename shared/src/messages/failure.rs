//! Reported and structural failure types
//!
//! A worker that catches its own error reports a [`FailureSignal`]; a worker
//! that crashes is described by a [`ChildFailure`] and handled by supervision.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::types::DocumentType;

/// A failure a pool worker caught and chose to report instead of crashing
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub enum FailureSignal {
    /// The document type could not even begin generating data
    DataGeneration { document_type: DocumentType, reason: String },
    /// One expected document could not be produced
    DocumentGeneration { document_type: DocumentType, reason: String },
    /// One document failed to index
    Index { document_type: DocumentType, reason: String },
}

impl FailureSignal {
    pub fn document_type(&self) -> &DocumentType {
        match self {
            FailureSignal::DataGeneration { document_type, .. }
            | FailureSignal::DocumentGeneration { document_type, .. }
            | FailureSignal::Index { document_type, .. } => document_type,
        }
    }

    pub fn reason(&self) -> &str {
        match self {
            FailureSignal::DataGeneration { reason, .. }
            | FailureSignal::DocumentGeneration { reason, .. }
            | FailureSignal::Index { reason, .. } => reason,
        }
    }

    fn stage(&self) -> &'static str {
        match self {
            FailureSignal::DataGeneration { .. } => "data generation",
            FailureSignal::DocumentGeneration { .. } => "document generation",
            FailureSignal::Index { .. } => "indexing",
        }
    }
}

impl fmt::Display for FailureSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} failed for '{}': {}", self.stage(), self.document_type(), self.reason())
    }
}

/// The three child pools a coordinator supervises
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PoolKind {
    DataGenerator,
    DocumentGenerator,
    IndexWriter,
}

impl fmt::Display for PoolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PoolKind::DataGenerator => write!(f, "data_generator"),
            PoolKind::DocumentGenerator => write!(f, "document_generator"),
            PoolKind::IndexWriter => write!(f, "index_writer"),
        }
    }
}

/// Category of a worker crash, used to pick a supervision directive
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FaultCategory {
    DataGeneration,
    DocumentGeneration,
    IndexWrite,
    /// The worker could not start
    Initialization,
    /// The worker was forcibly terminated
    Killed,
    /// Any other fault the worker returned
    Other,
    /// The worker panicked
    Panic,
}

impl fmt::Display for FaultCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FaultCategory::DataGeneration => "data_generation",
            FaultCategory::DocumentGeneration => "document_generation",
            FaultCategory::IndexWrite => "index_write",
            FaultCategory::Initialization => "initialization",
            FaultCategory::Killed => "killed",
            FaultCategory::Other => "other",
            FaultCategory::Panic => "panic",
        };
        f.write_str(name)
    }
}

/// A worker crash observed by its pool's monitor
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ChildFailure {
    pub pool: PoolKind,
    /// Worker slot inside the pool
    pub worker: usize,
    pub category: FaultCategory,
    pub message: String,
}

impl fmt::Display for ChildFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} worker {} failed ({}): {}",
            self.pool, self.worker, self.category, self.message
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_signal_display_names_stage_type_and_reason() {
        let books = DocumentType::parse("books").unwrap();
        let signal = FailureSignal::Index {
            document_type: books.clone(),
            reason: "mapping conflict".to_string(),
        };

        assert_eq!(signal.reason(), "mapping conflict");
        assert_eq!(signal.document_type(), &books);
        assert_eq!(signal.to_string(), "indexing failed for 'books': mapping conflict");

        let signal = FailureSignal::DocumentGeneration {
            document_type: books,
            reason: "template rendering failed".to_string(),
        };
        assert_eq!(
            signal.to_string(),
            "document generation failed for 'books': template rendering failed"
        );
    }
}
