//! Trait definitions with mockall annotations for testing
//!
//! The three collaborator traits are the seams to the data generation,
//! document generation and index write implementations. `JobDispatcher` is
//! the coordinator's view of its child pools.

use shared::{DocumentBody, DocumentJob, DocumentTypeRequest, PoolKind};

use crate::error::{IndexerResult, WorkerResult};
use crate::services::mailbox::Delivery;

/// Produces one placeholder job per item to generate for a document type
#[mockall::automock]
#[async_trait::async_trait]
pub trait DataGenerator: Send + Sync {
    /// Called once by every worker before its first request
    async fn initialize(&self) -> WorkerResult<()>;

    async fn generate(&self, request: &DocumentTypeRequest) -> WorkerResult<Vec<DocumentJob>>;
}

/// Fills in the body of a placeholder job
#[mockall::automock]
#[async_trait::async_trait]
pub trait DocumentGenerator: Send + Sync {
    /// Called once by every worker before its first job
    async fn initialize(&self) -> WorkerResult<()>;

    async fn generate(&self, job: &DocumentJob) -> WorkerResult<DocumentBody>;
}

/// Writes a generated document to the search index
#[mockall::automock]
#[async_trait::async_trait]
pub trait IndexWriter: Send + Sync {
    /// Called once by every worker before its first job
    async fn initialize(&self) -> WorkerResult<()>;

    async fn write(&self, job: &DocumentJob) -> WorkerResult<()>;
}

/// Routes coordinator work into the child pools and applies supervision
/// directives to their workers
#[mockall::automock]
#[async_trait::async_trait]
pub trait JobDispatcher: Send + Sync {
    /// Forward a request to the data generator pool
    async fn dispatch_request(&self, request: DocumentTypeRequest) -> IndexerResult<Delivery>;

    /// Forward a placeholder to the document generator pool
    async fn dispatch_generation(&self, job: DocumentJob) -> IndexerResult<Delivery>;

    /// Forward a generated document to the index writer pool
    async fn dispatch_indexing(&self, job: DocumentJob) -> IndexerResult<Delivery>;

    /// Respawn a crashed worker slot
    fn restart_worker(&self, pool: PoolKind, worker: usize) -> IndexerResult<()>;

    /// Retire a worker slot for good
    fn stop_worker(&self, pool: PoolKind, worker: usize) -> IndexerResult<()>;

    /// Number of worker slots still alive in a pool
    fn live_workers(&self, pool: PoolKind) -> usize;

    /// Stop every worker of every pool
    fn shutdown(&self);
}
