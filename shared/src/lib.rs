//! Shared types for the catalog indexing system
//!
//! Contains the message protocol spoken between the indexing master, the
//! per-document-type coordinators and their worker pools, together with the
//! error and logging helpers every component uses.

pub mod errors;
pub mod logging;
pub mod messages;
pub mod types;

pub use errors::*;
pub use types::*;

// Re-export the coordinator protocol
pub use messages::{
    // Master ↔ Coordinator communication
    CompletionStats, ParentNotification,

    // Coordinator inbox
    CoordinatorMessage,

    // Documents moving through the pipeline
    DocumentBody, DocumentJob, DocumentTypeRequest, GenerationParams, JobPhase,

    // Failure reporting
    ChildFailure, FailureSignal, FaultCategory, PoolKind,
};
