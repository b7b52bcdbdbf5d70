//! Test helpers and builder patterns for indexer tests
//!
//! This module provides convenient helper functions and builder patterns
//! to reduce test boilerplate and improve maintainability.

use indexer::*;
use shared::{CoordinatorMessage, DocumentJob, DocumentType, ParentNotification};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

use super::fixtures::TestFixtures;

/// Type alias for a coordinator driven by a mock dispatcher
pub type TestCoordinator = DocumentTypeCoordinator<MockJobDispatcher>;

/// Builder pattern for creating test coordinators with sensible defaults
pub struct CoordinatorBuilder {
    request_delivery: Delivery,
    generation_delivery: Delivery,
    indexing_delivery: Delivery,
    live_workers: usize,
    budget: RestartBudgetConfig,
    dispatcher: Option<MockJobDispatcher>,
}

impl CoordinatorBuilder {
    /// Create a new builder where every dispatch is enqueued
    pub fn new() -> Self {
        Self {
            request_delivery: Delivery::Enqueued,
            generation_delivery: Delivery::Enqueued,
            indexing_delivery: Delivery::Enqueued,
            live_workers: 4,
            budget: RestartBudgetConfig::default(),
            dispatcher: None,
        }
    }

    pub fn with_request_delivery(mut self, delivery: Delivery) -> Self {
        self.request_delivery = delivery;
        self
    }

    pub fn with_generation_delivery(mut self, delivery: Delivery) -> Self {
        self.generation_delivery = delivery;
        self
    }

    pub fn with_indexing_delivery(mut self, delivery: Delivery) -> Self {
        self.indexing_delivery = delivery;
        self
    }

    /// Workers reported alive after a stop
    pub fn with_live_workers(mut self, live_workers: usize) -> Self {
        self.live_workers = live_workers;
        self
    }

    pub fn with_restart_budget(mut self, max_restarts: u32, window_secs: u64) -> Self {
        self.budget = RestartBudgetConfig {
            max_restarts,
            window_secs,
        };
        self
    }

    /// Replace the default mock with a fully configured one
    pub fn with_dispatcher(mut self, dispatcher: MockJobDispatcher) -> Self {
        self.dispatcher = Some(dispatcher);
        self
    }

    fn default_dispatcher(&self) -> MockJobDispatcher {
        let mut dispatcher = MockJobDispatcher::new();
        let (request, generation, indexing) =
            (self.request_delivery, self.generation_delivery, self.indexing_delivery);
        let live_workers = self.live_workers;

        dispatcher
            .expect_dispatch_request()
            .returning(move |_| Ok(request))
            .times(0..);
        dispatcher
            .expect_dispatch_generation()
            .returning(move |_| Ok(generation))
            .times(0..);
        dispatcher
            .expect_dispatch_indexing()
            .returning(move |_| Ok(indexing))
            .times(0..);
        dispatcher.expect_restart_worker().returning(|_, _| Ok(())).times(0..);
        dispatcher.expect_stop_worker().returning(|_, _| Ok(())).times(0..);
        dispatcher.expect_live_workers().returning(move |_| live_workers).times(0..);
        dispatcher.expect_shutdown().returning(|| ()).times(0..);
        dispatcher
    }

    /// Build the coordinator and the receiving end of its parent channel
    pub fn build(mut self) -> (TestCoordinator, mpsc::UnboundedReceiver<ParentNotification>) {
        let dispatcher = match self.dispatcher.take() {
            Some(custom) => custom,
            None => self.default_dispatcher(),
        };

        let (parent, notifications) = mpsc::unbounded_channel();
        let supervisor = Supervisor::new(RestartBudget::from_config(&self.budget));
        let coordinator = DocumentTypeCoordinator::new(TestFixtures::session_id(), dispatcher, supervisor, parent);
        (coordinator, notifications)
    }
}

impl Default for CoordinatorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Document generator that panics on every job
pub struct PanickingGenerator;

#[async_trait::async_trait]
impl DocumentGenerator for PanickingGenerator {
    async fn initialize(&self) -> WorkerResult<()> {
        Ok(())
    }

    async fn generate(&self, job: &DocumentJob) -> WorkerResult<shared::DocumentBody> {
        panic!("corrupt template for document {}", job.sequence)
    }
}

/// Helper functions for common test operations
pub struct TestHelpers;

impl TestHelpers {
    /// Create a coordinator with every dispatch enqueued
    pub fn simple_coordinator() -> (TestCoordinator, mpsc::UnboundedReceiver<ParentNotification>) {
        CoordinatorBuilder::new().build()
    }

    /// Everything the coordinator has sent to its parent so far
    pub fn notifications(receiver: &mut mpsc::UnboundedReceiver<ParentNotification>) -> Vec<ParentNotification> {
        let mut received = Vec::new();
        while let Ok(notification) = receiver.try_recv() {
            received.push(notification);
        }
        received
    }

    /// Accept a request and the placeholder batch answering it
    pub async fn start_session(
        coordinator: &mut TestCoordinator,
        document_type: &DocumentType,
        count: u32,
    ) -> (Vec<DocumentJob>, SessionControl) {
        let control = coordinator
            .handle(CoordinatorMessage::Request(TestFixtures::request(document_type, count)))
            .await;
        assert_eq!(control, SessionControl::Continue);

        let jobs = TestFixtures::placeholders(document_type, count);
        let control = coordinator
            .handle(CoordinatorMessage::Placeholders {
                document_type: document_type.clone(),
                jobs: jobs.clone(),
            })
            .await;
        (jobs, control)
    }

    /// Return every job as generated and then as indexed
    pub async fn complete_jobs(coordinator: &mut TestCoordinator, jobs: &[DocumentJob]) -> Vec<SessionControl> {
        let mut controls = Vec::new();
        for job in jobs {
            controls.push(coordinator.handle(CoordinatorMessage::Job(TestFixtures::generated(job))).await);
        }
        for job in jobs {
            controls.push(coordinator.handle(CoordinatorMessage::Job(TestFixtures::indexed(job))).await);
        }
        controls
    }

    /// Sample collaborators wired into pool services
    pub fn sample_services(seed: u64) -> (PoolServices, Arc<services::InMemoryIndexWriter>) {
        let writer = Arc::new(services::InMemoryIndexWriter::new());
        let services = PoolServices {
            data: Arc::new(services::SampleDataGenerator::new()),
            documents: Arc::new(services::SampleDocumentGenerator::new(seed)),
            writer: writer.clone(),
        };
        (services, writer)
    }

    /// Small pools with a timeout so a stuck session cannot hang the suite
    pub fn test_config() -> IndexerConfig {
        IndexerConfig {
            data_generator: PoolConfig::with_workers(1),
            document_generator: PoolConfig::with_workers(2),
            index_writer: PoolConfig::with_workers(2),
            session_timeout_secs: Some(5),
            ..IndexerConfig::default()
        }
    }

    /// Guard against a test waiting forever
    pub async fn within<T>(future: impl std::future::Future<Output = T>) -> T {
        tokio::time::timeout(Duration::from_secs(10), future)
            .await
            .expect("Test should not time out")
    }
}
