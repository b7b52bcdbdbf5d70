//! Coordinator inbox and Coordinator → Master notifications

use serde::{Deserialize, Serialize};

use super::document::{DocumentJob, DocumentTypeRequest};
use super::failure::{ChildFailure, FailureSignal};
use crate::types::{DocumentType, SessionId};

/// Everything a coordinator can receive
#[derive(Serialize, Deserialize, Clone, Debug)]
pub enum CoordinatorMessage {
    /// From the master: start generating one document type
    Request(DocumentTypeRequest),

    /// From the data generator: all placeholders for one request
    Placeholders {
        document_type: DocumentType,
        jobs: Vec<DocumentJob>,
    },

    /// From the document generator or index writer
    Job(DocumentJob),

    /// Reported failure from any pool
    Failure(FailureSignal),

    /// A pool worker crashed
    ChildFailed(ChildFailure),
}

/// Counter snapshot taken just before a session resets
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct CompletionStats {
    pub documents_queued: u64,
    pub documents_completed: u64,
    pub generation_failures: u64,
    pub index_failures: u64,
}

impl CompletionStats {
    /// Documents that were actually written to the index
    pub fn documents_indexed(&self) -> u64 {
        self.documents_completed.saturating_sub(self.index_failures)
    }
}

/// Notifications sent from a coordinator session to its master
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub enum ParentNotification {
    /// All documents of the session are drained
    DocumentTypeComplete {
        session_id: SessionId,
        document_type: DocumentType,
        stats: CompletionStats,
    },

    /// Data generation for a document type failed before any document was queued
    DocumentTypeFailed {
        session_id: SessionId,
        document_type: DocumentType,
        reason: String,
    },

    /// The coordinator's own message handling failed
    CoordinatorFault {
        session_id: SessionId,
        document_type: Option<DocumentType>,
        message: String,
    },

    /// A child failure the coordinator would not handle itself
    Escalated {
        session_id: SessionId,
        document_type: Option<DocumentType>,
        failure: ChildFailure,
    },
}

impl ParentNotification {
    pub fn session_id(&self) -> SessionId {
        match self {
            ParentNotification::DocumentTypeComplete { session_id, .. }
            | ParentNotification::DocumentTypeFailed { session_id, .. }
            | ParentNotification::CoordinatorFault { session_id, .. }
            | ParentNotification::Escalated { session_id, .. } => *session_id,
        }
    }
}
