//! Worker pools
//!
//! A pool is a fixed number of worker slots draining one shared queue. Each
//! slot runs as a tokio task watched by a monitor task; when a worker dies the
//! monitor reports a [`ChildFailure`] to the coordinator, which decides
//! whether the slot is restarted, stopped, or the failure escalated.

use async_trait::async_trait;
use shared::{
    ChildFailure, Component, CoordinatorMessage, DocumentJob, DocumentTypeRequest, FailureSignal, FaultCategory,
    PoolKind, SessionId, component_debug, component_warn,
};
use std::any::Any;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::Mutex as AsyncMutex;
use tokio::task::{AbortHandle, JoinHandle};

use crate::config::{IndexerConfig, PoolConfig};
use crate::error::{IndexerError, IndexerResult, WorkerError};
use crate::services::mailbox::{Delivery, MailboxReceiver, MailboxSender, mailbox};
use crate::traits::{DataGenerator, DocumentGenerator, IndexWriter, JobDispatcher};

/// The collaborators backing a coordinator's three pools
#[derive(Clone)]
pub struct PoolServices {
    pub data: Arc<dyn DataGenerator>,
    pub documents: Arc<dyn DocumentGenerator>,
    pub writer: Arc<dyn IndexWriter>,
}

/// Why a worker stopped running
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerFault {
    pub category: FaultCategory,
    pub message: String,
}

/// One phase of the pipeline as seen by a pool worker
#[async_trait]
pub trait Stage: Send + Sync + 'static {
    type Input: Send + 'static;

    fn kind(&self) -> PoolKind;

    async fn initialize(&self) -> Result<(), WorkerFault>;

    /// Process one input into the reply for the coordinator
    ///
    /// Reported failures become `Ok(CoordinatorMessage::Failure)`; only
    /// crashes are returned as `Err`.
    async fn process(&self, input: Self::Input) -> Result<CoordinatorMessage, WorkerFault>;
}

fn initialization_fault(error: WorkerError) -> WorkerFault {
    WorkerFault {
        category: FaultCategory::Initialization,
        message: error.to_string(),
    }
}

/// Split a collaborator result into a reply or a crash
fn reply_or_fault<T>(
    result: Result<T, WorkerError>,
    on_success: impl FnOnce(T) -> CoordinatorMessage,
    on_reported: impl FnOnce(String) -> FailureSignal,
) -> Result<CoordinatorMessage, WorkerFault> {
    match result {
        Ok(value) => Ok(on_success(value)),
        Err(WorkerError::Reported { reason }) => Ok(CoordinatorMessage::Failure(on_reported(reason))),
        Err(WorkerError::Fault { category, message }) => Err(WorkerFault { category, message }),
    }
}

pub struct DataGenerationStage(pub Arc<dyn DataGenerator>);

#[async_trait]
impl Stage for DataGenerationStage {
    type Input = DocumentTypeRequest;

    fn kind(&self) -> PoolKind {
        PoolKind::DataGenerator
    }

    async fn initialize(&self) -> Result<(), WorkerFault> {
        self.0.initialize().await.map_err(initialization_fault)
    }

    async fn process(&self, request: DocumentTypeRequest) -> Result<CoordinatorMessage, WorkerFault> {
        let document_type = request.document_type.clone();
        reply_or_fault(
            self.0.generate(&request).await,
            |jobs| CoordinatorMessage::Placeholders {
                document_type: document_type.clone(),
                jobs,
            },
            |reason| FailureSignal::DataGeneration {
                document_type: document_type.clone(),
                reason,
            },
        )
    }
}

pub struct DocumentGenerationStage(pub Arc<dyn DocumentGenerator>);

#[async_trait]
impl Stage for DocumentGenerationStage {
    type Input = DocumentJob;

    fn kind(&self) -> PoolKind {
        PoolKind::DocumentGenerator
    }

    async fn initialize(&self) -> Result<(), WorkerFault> {
        self.0.initialize().await.map_err(initialization_fault)
    }

    async fn process(&self, job: DocumentJob) -> Result<CoordinatorMessage, WorkerFault> {
        let result = self.0.generate(&job).await;
        let document_type = job.document_type.clone();
        reply_or_fault(
            result,
            |body| CoordinatorMessage::Job(job.with_payload(body)),
            |reason| FailureSignal::DocumentGeneration { document_type, reason },
        )
    }
}

pub struct IndexingStage(pub Arc<dyn IndexWriter>);

#[async_trait]
impl Stage for IndexingStage {
    type Input = DocumentJob;

    fn kind(&self) -> PoolKind {
        PoolKind::IndexWriter
    }

    async fn initialize(&self) -> Result<(), WorkerFault> {
        self.0.initialize().await.map_err(initialization_fault)
    }

    async fn process(&self, job: DocumentJob) -> Result<CoordinatorMessage, WorkerFault> {
        let result = self.0.write(&job).await;
        let document_type = job.document_type.clone();
        reply_or_fault(
            result,
            |()| CoordinatorMessage::Job(job.into_indexed()),
            |reason| FailureSignal::Index { document_type, reason },
        )
    }
}

fn component_for(kind: PoolKind) -> Component {
    match kind {
        PoolKind::DataGenerator => Component::DataGenerator,
        PoolKind::DocumentGenerator => Component::DocumentGenerator,
        PoolKind::IndexWriter => Component::IndexWriter,
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "worker panicked".to_string()
    }
}

/// Body of one worker slot
async fn run_worker<S: Stage>(
    stage: Arc<S>,
    backlog: Arc<AsyncMutex<MailboxReceiver<S::Input>>>,
    outbox: MailboxSender<CoordinatorMessage>,
    slot: usize,
) -> Result<(), WorkerFault> {
    let component = component_for(stage.kind());
    stage.initialize().await?;
    component_debug!(component, worker = slot, "Worker ready");

    loop {
        let next = {
            let mut receiver = backlog.lock().await;
            receiver.recv().await
        };
        let Some(input) = next else {
            component_debug!(component, worker = slot, "Queue closed, worker exiting");
            return Ok(());
        };

        let reply = stage.process(input).await?;
        // Replies carry counted work, so they wait for inbox space
        if let Err(e) = outbox.send_wait(reply).await {
            component_debug!(component, worker = slot, error = %e, "Coordinator gone, worker exiting");
            return Ok(());
        }
    }
}

struct WorkerSlot {
    worker: AbortHandle,
    monitor: JoinHandle<()>,
}

/// A fixed-size group of workers sharing one queue
pub struct WorkerPool<S: Stage> {
    stage: Arc<S>,
    queue: MailboxSender<S::Input>,
    backlog: Arc<AsyncMutex<MailboxReceiver<S::Input>>>,
    outbox: MailboxSender<CoordinatorMessage>,
    slots: Mutex<HashMap<usize, WorkerSlot>>,
    size: usize,
    session_id: SessionId,
}

impl<S: Stage> WorkerPool<S> {
    /// Create the pool and spawn every worker slot
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(stage: S, config: &PoolConfig, outbox: MailboxSender<CoordinatorMessage>, session_id: SessionId) -> Self {
        let (queue, backlog) = mailbox(&config.queue);
        let pool = Self {
            stage: Arc::new(stage),
            queue,
            backlog: Arc::new(AsyncMutex::new(backlog)),
            outbox,
            slots: Mutex::new(HashMap::new()),
            size: config.workers,
            session_id,
        };
        for slot in 0..pool.size {
            pool.spawn_worker(slot);
        }
        component_debug!(
            component_for(pool.kind()),
            session = %session_id.short(),
            workers = pool.size,
            "Pool started"
        );
        pool
    }

    pub fn kind(&self) -> PoolKind {
        self.stage.kind()
    }

    pub fn size(&self) -> usize {
        self.size
    }

    fn slots(&self) -> std::sync::MutexGuard<'_, HashMap<usize, WorkerSlot>> {
        // A poisoned map is still structurally valid
        self.slots.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn spawn_worker(&self, slot: usize) {
        let kind = self.kind();
        let worker = tokio::spawn(run_worker(
            Arc::clone(&self.stage),
            Arc::clone(&self.backlog),
            self.outbox.clone(),
            slot,
        ));
        let abort = worker.abort_handle();

        let outbox = self.outbox.clone();
        let session = self.session_id.short();
        let monitor = tokio::spawn(async move {
            let fault = match worker.await {
                Ok(Ok(())) => return,
                Ok(Err(fault)) => fault,
                Err(e) if e.is_panic() => WorkerFault {
                    category: FaultCategory::Panic,
                    message: panic_message(e.into_panic()),
                },
                Err(_) => WorkerFault {
                    category: FaultCategory::Killed,
                    message: "worker was terminated".to_string(),
                },
            };

            let failure = ChildFailure {
                pool: kind,
                worker: slot,
                category: fault.category,
                message: fault.message,
            };
            component_warn!(component_for(kind), session = %session, "💥 {}", failure);
            if outbox.send_wait(CoordinatorMessage::ChildFailed(failure)).await.is_err() {
                component_debug!(component_for(kind), session = %session, "Coordinator gone, crash not reported");
            }
        });

        if let Some(previous) = self.slots().insert(slot, WorkerSlot { worker: abort, monitor }) {
            previous.worker.abort();
        }
    }

    pub async fn dispatch(&self, input: S::Input) -> IndexerResult<Delivery> {
        if self.live_workers() == 0 {
            return Err(IndexerError::PoolUnavailable { pool: self.kind() });
        }
        Ok(self.queue.send(input).await?)
    }

    pub fn restart_worker(&self, slot: usize) -> IndexerResult<()> {
        if slot >= self.size || !self.slots().contains_key(&slot) {
            return Err(IndexerError::PoolUnavailable { pool: self.kind() });
        }
        self.spawn_worker(slot);
        Ok(())
    }

    pub fn stop_worker(&self, slot: usize) -> IndexerResult<()> {
        let removed = self.slots().remove(&slot);
        match removed {
            Some(stopped) => {
                stopped.worker.abort();
                Ok(())
            }
            None => Err(IndexerError::PoolUnavailable { pool: self.kind() }),
        }
    }

    /// Forcibly terminate a worker; its monitor reports it as killed
    pub fn kill_worker(&self, slot: usize) {
        if let Some(entry) = self.slots().get(&slot) {
            entry.worker.abort();
        }
    }

    /// Slots that have not been retired
    pub fn live_workers(&self) -> usize {
        self.slots().len()
    }

    pub fn shutdown(&self) {
        for (_, slot) in self.slots().drain() {
            slot.monitor.abort();
            slot.worker.abort();
        }
    }
}

impl<S: Stage> Drop for WorkerPool<S> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// The three pools owned by one coordinator session
pub struct PoolSet {
    data: WorkerPool<DataGenerationStage>,
    documents: WorkerPool<DocumentGenerationStage>,
    writer: WorkerPool<IndexingStage>,
}

impl PoolSet {
    pub fn start(
        config: &IndexerConfig,
        services: &PoolServices,
        outbox: MailboxSender<CoordinatorMessage>,
        session_id: SessionId,
    ) -> Self {
        Self {
            data: WorkerPool::start(
                DataGenerationStage(Arc::clone(&services.data)),
                &config.data_generator,
                outbox.clone(),
                session_id,
            ),
            documents: WorkerPool::start(
                DocumentGenerationStage(Arc::clone(&services.documents)),
                &config.document_generator,
                outbox.clone(),
                session_id,
            ),
            writer: WorkerPool::start(
                IndexingStage(Arc::clone(&services.writer)),
                &config.index_writer,
                outbox,
                session_id,
            ),
        }
    }

    pub fn kill_worker(&self, pool: PoolKind, worker: usize) {
        match pool {
            PoolKind::DataGenerator => self.data.kill_worker(worker),
            PoolKind::DocumentGenerator => self.documents.kill_worker(worker),
            PoolKind::IndexWriter => self.writer.kill_worker(worker),
        }
    }
}

#[async_trait]
impl JobDispatcher for PoolSet {
    async fn dispatch_request(&self, request: DocumentTypeRequest) -> IndexerResult<Delivery> {
        self.data.dispatch(request).await
    }

    async fn dispatch_generation(&self, job: DocumentJob) -> IndexerResult<Delivery> {
        self.documents.dispatch(job).await
    }

    async fn dispatch_indexing(&self, job: DocumentJob) -> IndexerResult<Delivery> {
        self.writer.dispatch(job).await
    }

    fn restart_worker(&self, pool: PoolKind, worker: usize) -> IndexerResult<()> {
        match pool {
            PoolKind::DataGenerator => self.data.restart_worker(worker),
            PoolKind::DocumentGenerator => self.documents.restart_worker(worker),
            PoolKind::IndexWriter => self.writer.restart_worker(worker),
        }
    }

    fn stop_worker(&self, pool: PoolKind, worker: usize) -> IndexerResult<()> {
        match pool {
            PoolKind::DataGenerator => self.data.stop_worker(worker),
            PoolKind::DocumentGenerator => self.documents.stop_worker(worker),
            PoolKind::IndexWriter => self.writer.stop_worker(worker),
        }
    }

    fn live_workers(&self, pool: PoolKind) -> usize {
        match pool {
            PoolKind::DataGenerator => self.data.live_workers(),
            PoolKind::DocumentGenerator => self.documents.live_workers(),
            PoolKind::IndexWriter => self.writer.live_workers(),
        }
    }

    fn shutdown(&self) {
        self.data.shutdown();
        self.documents.shutdown();
        self.writer.shutdown();
    }
}
