//! Message types for the catalog indexing system
//!
//! - `document`: requests and jobs moving through the pipeline
//! - `failure`: reported failures and worker crash descriptions
//! - `coordinator`: coordinator inbox and notifications to the master

pub mod coordinator;
pub mod document;
pub mod failure;

pub use coordinator::{CompletionStats, CoordinatorMessage, ParentNotification};

pub use document::{DocumentBody, DocumentJob, DocumentTypeRequest, GenerationParams, JobPhase};

pub use failure::{ChildFailure, FailureSignal, FaultCategory, PoolKind};
