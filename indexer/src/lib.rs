//! Catalog indexing coordinator library
//!
//! One coordinator session per document type fans a request out to three
//! worker pools (data generation, document generation, index writing),
//! tracks how many documents are in flight and reports completion to its
//! master. Crashing workers are supervised with a bounded restart budget.

pub mod config;
pub mod coordinator;
pub mod core;
pub mod error;
pub mod master;
pub mod services;
pub mod traits;

// Re-export commonly used types
pub use crate::core::{CoordinatorState, Directive, RestartBudget, RestartBudgetConfig, Supervisor, directive_for};
pub use config::{IndexerConfig, PoolConfig};
pub use coordinator::{CoordinatorHandle, DocumentTypeCoordinator, SessionControl, SessionEnd, SessionSummary};
pub use error::{IndexerError, IndexerResult, WorkerError, WorkerResult};
pub use master::{IndexingMaster, IndexingReport, SessionOutcome, SessionReport};
pub use services::{Delivery, MailboxConfig, OverflowPolicy, PoolServices};
pub use traits::{
    DataGenerator, DocumentGenerator, IndexWriter, JobDispatcher, MockDataGenerator, MockDocumentGenerator,
    MockIndexWriter, MockJobDispatcher,
};
