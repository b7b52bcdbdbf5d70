//! Per-document-type coordinator
//!
//! A coordinator session fans one document-type request out to its three
//! child pools, routes every reply to the next phase, keeps the session
//! counters and tells its master when the work is drained. It processes one
//! inbox message at a time, so the counters need no locking.

use serde::Serialize;
use shared::{
    ChildFailure, Component, CoordinatorMessage, DocumentJob, DocumentType, DocumentTypeRequest, FailureSignal,
    JobPhase, ParentNotification, SessionId, component_debug, component_error, component_info, component_warn,
};
use std::collections::HashSet;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::config::IndexerConfig;
use crate::core::{CoordinatorState, Directive, RestartBudget, Supervisor};
use crate::error::{IndexerError, IndexerResult};
use crate::services::mailbox::{Delivery, MailboxReceiver, MailboxSender, mailbox};
use crate::services::pool::{PoolServices, PoolSet};
use crate::traits::JobDispatcher;

/// Whether the session keeps running after a message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionControl {
    Continue,
    Finished,
}

/// How a session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SessionEnd {
    Completed,
    Faulted,
    Escalated,
    /// Every sender to the inbox went away before completion
    InboxClosed,
}

/// What a finished session reports back to whoever awaits it
#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    pub session_id: SessionId,
    pub document_type: Option<DocumentType>,
    pub end: SessionEnd,
    pub messages_handled: u64,
    pub unhandled_messages: u64,
    pub restarts: u32,
}

fn describe(message: &CoordinatorMessage) -> String {
    match message {
        CoordinatorMessage::Request(request) => format!("request for '{}'", request.document_type),
        CoordinatorMessage::Placeholders { document_type, jobs } => {
            format!("{} placeholders for '{}'", jobs.len(), document_type)
        }
        CoordinatorMessage::Job(job) => format!("{:?} job {} for '{}'", job.phase(), job.id, job.document_type),
        CoordinatorMessage::Failure(signal) => format!("failure signal: {signal}"),
        CoordinatorMessage::ChildFailed(failure) => format!("child failure: {failure}"),
    }
}

/// Coordinator for one document-type session
pub struct DocumentTypeCoordinator<D: JobDispatcher> {
    session_id: SessionId,
    /// First document type accepted, used in notifications
    document_type: Option<DocumentType>,
    accepted_types: HashSet<DocumentType>,
    state: CoordinatorState,
    supervisor: Supervisor,
    dispatcher: D,
    parent: mpsc::UnboundedSender<ParentNotification>,

    end: Option<SessionEnd>,
    messages_handled: u64,
    unhandled_messages: u64,
    restarts: u32,
}

impl<D: JobDispatcher> DocumentTypeCoordinator<D> {
    pub fn new(
        session_id: SessionId,
        dispatcher: D,
        supervisor: Supervisor,
        parent: mpsc::UnboundedSender<ParentNotification>,
    ) -> Self {
        Self {
            session_id,
            document_type: None,
            accepted_types: HashSet::new(),
            state: CoordinatorState::new(),
            supervisor,
            dispatcher,
            parent,
            end: None,
            messages_handled: 0,
            unhandled_messages: 0,
            restarts: 0,
        }
    }

    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    pub fn state(&self) -> &CoordinatorState {
        &self.state
    }

    pub fn dispatcher(&self) -> &D {
        &self.dispatcher
    }

    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            session_id: self.session_id,
            document_type: self.document_type.clone(),
            end: self.end.unwrap_or(SessionEnd::InboxClosed),
            messages_handled: self.messages_handled,
            unhandled_messages: self.unhandled_messages,
            restarts: self.restarts,
        }
    }

    /// Drain the inbox until the session finishes, then tear the pools down
    pub async fn run(mut self, mut inbox: MailboxReceiver<CoordinatorMessage>) -> SessionSummary {
        component_debug!(Component::Coordinator, session = %self.session_id.short(), "Session started");

        while let Some(message) = inbox.recv().await {
            if self.handle(message).await == SessionControl::Finished {
                break;
            }
        }

        inbox.close();
        if !inbox.is_empty() {
            component_debug!(
                Component::Coordinator,
                session = %self.session_id.short(),
                discarded = inbox.len(),
                "Discarding messages queued after session end"
            );
        }
        self.dispatcher.shutdown();

        let summary = self.summary();
        component_debug!(
            Component::Coordinator,
            session = %self.session_id.short(),
            end = ?summary.end,
            messages = summary.messages_handled,
            "Session retired"
        );
        summary
    }

    /// Handle one message; any error ends the session with a fault
    pub async fn handle(&mut self, message: CoordinatorMessage) -> SessionControl {
        self.messages_handled += 1;
        let description = describe(&message);

        match self.process(message).await {
            Ok(control) => control,
            Err(error) => {
                self.fail_session(&error, &description);
                SessionControl::Finished
            }
        }
    }

    async fn process(&mut self, message: CoordinatorMessage) -> IndexerResult<SessionControl> {
        match message {
            CoordinatorMessage::Request(request) => self.handle_request(request).await,
            CoordinatorMessage::Placeholders { document_type, jobs } => {
                self.handle_placeholders(document_type, jobs).await
            }
            CoordinatorMessage::Job(job) => self.handle_job(job).await,
            CoordinatorMessage::Failure(signal) => self.handle_failure(signal).await,
            CoordinatorMessage::ChildFailed(failure) => self.handle_child_failure(failure),
        }
    }

    async fn handle_request(&mut self, request: DocumentTypeRequest) -> IndexerResult<SessionControl> {
        let document_type = request.document_type.clone();
        component_info!(
            Component::Coordinator,
            session = %self.session_id.short(),
            "📋 Accepted document type '{}' ({} documents into '{}')",
            document_type,
            request.params.document_count,
            request.params.index_name
        );

        self.state.accept_document_type();
        self.accepted_types.insert(document_type.clone());
        self.document_type.get_or_insert_with(|| document_type.clone());

        if self.dispatcher.dispatch_request(request).await? == Delivery::Dropped {
            component_warn!(
                Component::Coordinator,
                session = %self.session_id.short(),
                "Data generator queue full, request for '{}' dropped",
                document_type
            );
            return self
                .handle_failure(FailureSignal::DataGeneration {
                    document_type,
                    reason: "data generator queue full, request dropped".to_string(),
                })
                .await;
        }
        Ok(SessionControl::Continue)
    }

    async fn handle_placeholders(
        &mut self,
        document_type: DocumentType,
        jobs: Vec<DocumentJob>,
    ) -> IndexerResult<SessionControl> {
        if !self.accepted_types.contains(&document_type) {
            return Ok(self.unhandled(&format!("placeholders for '{document_type}'")));
        }

        component_debug!(
            Component::Coordinator,
            session = %self.session_id.short(),
            count = jobs.len(),
            "Routing placeholders for '{}'",
            document_type
        );
        for job in jobs {
            self.queue_placeholder(job).await?;
        }
        self.evaluate_completion()
    }

    async fn handle_job(&mut self, job: DocumentJob) -> IndexerResult<SessionControl> {
        if !self.accepted_types.contains(&job.document_type) {
            return Ok(self.unhandled(&format!("job for '{}'", job.document_type)));
        }

        match job.phase() {
            JobPhase::Placeholder => {
                if self.queue_placeholder(job).await? {
                    return self.evaluate_completion();
                }
                Ok(SessionControl::Continue)
            }
            JobPhase::Generated => {
                // Already counted when it was queued
                if self.dispatcher.dispatch_indexing(job).await? == Delivery::Dropped {
                    component_warn!(
                        Component::Coordinator,
                        session = %self.session_id.short(),
                        "Index writer queue full, document dropped"
                    );
                    self.state.document_index_failed();
                    return self.evaluate_completion();
                }
                Ok(SessionControl::Continue)
            }
            JobPhase::Indexed => {
                self.state.document_completed();
                self.evaluate_completion()
            }
        }
    }

    /// Send a placeholder to the document generator and count it
    ///
    /// Returns `true` when the pool dropped it and the count was rebalanced.
    async fn queue_placeholder(&mut self, job: DocumentJob) -> IndexerResult<bool> {
        let delivery = self.dispatcher.dispatch_generation(job).await?;
        self.state.document_queued();

        if delivery == Delivery::Dropped {
            component_warn!(
                Component::Coordinator,
                session = %self.session_id.short(),
                "Document generator queue full, placeholder dropped"
            );
            self.state.document_generation_failed()?;
            return Ok(true);
        }
        Ok(false)
    }

    async fn handle_failure(&mut self, signal: FailureSignal) -> IndexerResult<SessionControl> {
        if !self.accepted_types.contains(signal.document_type()) {
            return Ok(self.unhandled(&format!("failure signal for '{}'", signal.document_type())));
        }

        match signal {
            FailureSignal::DataGeneration { document_type, reason } => {
                component_warn!(
                    Component::Coordinator,
                    session = %self.session_id.short(),
                    "Data generation failed for '{}': {}",
                    document_type,
                    reason
                );
                self.state.release_document_type()?;
                self.notify_parent(ParentNotification::DocumentTypeFailed {
                    session_id: self.session_id,
                    document_type,
                    reason,
                });
            }
            FailureSignal::DocumentGeneration { document_type, reason } => {
                component_warn!(
                    Component::Coordinator,
                    session = %self.session_id.short(),
                    "Document generation failed for '{}': {}",
                    document_type,
                    reason
                );
                self.state.document_generation_failed()?;
            }
            FailureSignal::Index { document_type, reason } => {
                component_warn!(
                    Component::Coordinator,
                    session = %self.session_id.short(),
                    "Indexing failed for '{}': {}",
                    document_type,
                    reason
                );
                self.state.document_index_failed();
            }
        }

        self.evaluate_completion()
    }

    fn handle_child_failure(&mut self, failure: ChildFailure) -> IndexerResult<SessionControl> {
        let directive = self.supervisor.decide(&failure);
        component_warn!(
            Component::Coordinator,
            session = %self.session_id.short(),
            directive = ?directive,
            "Supervising {}",
            failure
        );

        match directive {
            Directive::Restart => {
                self.dispatcher.restart_worker(failure.pool, failure.worker)?;
                self.restarts += 1;
                Ok(SessionControl::Continue)
            }
            Directive::Stop => {
                self.dispatcher.stop_worker(failure.pool, failure.worker)?;
                if self.dispatcher.live_workers(failure.pool) == 0 {
                    return Err(IndexerError::PoolUnavailable { pool: failure.pool });
                }
                Ok(SessionControl::Continue)
            }
            Directive::Escalate => {
                component_error!(
                    Component::Coordinator,
                    session = %self.session_id.short(),
                    "Escalating {} to master",
                    failure
                );
                self.notify_parent(ParentNotification::Escalated {
                    session_id: self.session_id,
                    document_type: self.document_type.clone(),
                    failure,
                });
                self.state.reset();
                self.end = Some(SessionEnd::Escalated);
                Ok(SessionControl::Finished)
            }
        }
    }

    /// Notify the master once per in-flight document type if drained
    fn evaluate_completion(&mut self) -> IndexerResult<SessionControl> {
        component_debug!(
            Component::Coordinator,
            session = %self.session_id.short(),
            queued = self.state.documents_queued(),
            completed = self.state.documents_completed(),
            "Indexing stats for document type"
        );
        if !self.state.is_drained() {
            return Ok(SessionControl::Continue);
        }

        let document_type = self.document_type.clone().ok_or_else(|| shared::SharedError::ProtocolError {
            message: "completion evaluated before any request".to_string(),
        })?;
        let notifications = self.state.document_types_in_flight();
        let stats = self.state.completion_stats();

        component_info!(
            Component::Coordinator,
            session = %self.session_id.short(),
            "✅ Document type '{}' drained: {} completed, {} index failures, {} generation failures",
            document_type,
            stats.documents_completed,
            stats.index_failures,
            stats.generation_failures
        );
        for _ in 0..notifications {
            self.notify_parent(ParentNotification::DocumentTypeComplete {
                session_id: self.session_id,
                document_type: document_type.clone(),
                stats: stats.clone(),
            });
        }

        self.state.reset();
        self.end = Some(SessionEnd::Completed);
        Ok(SessionControl::Finished)
    }

    fn fail_session(&mut self, error: &IndexerError, description: &str) {
        component_error!(
            Component::Coordinator,
            session = %self.session_id.short(),
            error = %error,
            "❌ Error while indexing document type, message: {}",
            description
        );
        self.state.abandon_document_type();
        self.notify_parent(ParentNotification::CoordinatorFault {
            session_id: self.session_id,
            document_type: self.document_type.clone(),
            message: error.to_string(),
        });
        self.end = Some(SessionEnd::Faulted);
    }

    fn unhandled(&mut self, what: &str) -> SessionControl {
        self.unhandled_messages += 1;
        component_warn!(
            Component::Coordinator,
            session = %self.session_id.short(),
            "Unhandled message: {}",
            what
        );
        SessionControl::Continue
    }

    fn notify_parent(&self, notification: ParentNotification) {
        if self.parent.send(notification).is_err() {
            component_warn!(
                Component::Coordinator,
                session = %self.session_id.short(),
                "Master is gone, notification dropped"
            );
        }
    }
}

/// Handle to a running coordinator session
pub struct CoordinatorHandle {
    session_id: SessionId,
    inbox: MailboxSender<CoordinatorMessage>,
    task: JoinHandle<SessionSummary>,
}

impl CoordinatorHandle {
    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    /// Sender into the coordinator inbox
    pub fn inbox(&self) -> MailboxSender<CoordinatorMessage> {
        self.inbox.clone()
    }

    pub async fn submit(&self, request: DocumentTypeRequest) -> IndexerResult<Delivery> {
        Ok(self.inbox.send(CoordinatorMessage::Request(request)).await?)
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    pub fn abort(&self) {
        self.task.abort();
    }

    pub async fn join(self) -> IndexerResult<SessionSummary> {
        self.task.await.map_err(|e| IndexerError::SessionAborted {
            session: self.session_id.to_string(),
            message: e.to_string(),
        })
    }
}

/// Start a coordinator session with its own three pools
///
/// Must be called from within a tokio runtime.
pub fn spawn(
    config: &IndexerConfig,
    services: &PoolServices,
    parent: mpsc::UnboundedSender<ParentNotification>,
) -> CoordinatorHandle {
    let session_id = SessionId::new();
    let (inbox, inbox_rx) = mailbox(&config.inbox);
    let pools = PoolSet::start(config, services, inbox.clone(), session_id);
    let supervisor = Supervisor::new(RestartBudget::from_config(&config.restart_budget));
    let coordinator = DocumentTypeCoordinator::new(session_id, pools, supervisor, parent);

    CoordinatorHandle {
        session_id,
        inbox,
        task: tokio::spawn(coordinator.run(inbox_rx)),
    }
}
