//! Indexing master
//!
//! Runs one coordinator session per document-type request and folds the
//! notifications they send back into a report.

use chrono::{DateTime, Utc};
use serde::Serialize;
use shared::logging::{log_error, log_progress};
use shared::{
    ChildFailure, CompletionStats, Component, DocumentType, DocumentTypeRequest, ParentNotification, SessionId,
    component_debug, component_info, component_warn,
};
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;

use crate::config::IndexerConfig;
use crate::coordinator::{self, CoordinatorHandle};
use crate::services::pool::PoolServices;

/// Final state of one session as seen by the master
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum SessionOutcome {
    Completed(CompletionStats),
    DataGenerationFailed { reason: String },
    Faulted { message: String },
    Escalated(ChildFailure),
    TimedOut,
    /// No terminal notification arrived
    Pending,
}

impl SessionOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, SessionOutcome::Completed(_))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionReport {
    pub session_id: SessionId,
    pub document_type: DocumentType,
    pub outcome: SessionOutcome,
    /// Completion notifications received for this session
    pub completions: u32,
    pub restarts: u32,
    pub unhandled_messages: u64,
}

impl SessionReport {
    fn pending(session_id: SessionId, document_type: DocumentType) -> Self {
        Self {
            session_id,
            document_type,
            outcome: SessionOutcome::Pending,
            completions: 0,
            restarts: 0,
            unhandled_messages: 0,
        }
    }

    fn record(&mut self, notification: ParentNotification) {
        match notification {
            ParentNotification::DocumentTypeComplete { stats, .. } => {
                self.completions += 1;
                if self.outcome == SessionOutcome::Pending {
                    self.outcome = SessionOutcome::Completed(stats);
                }
            }
            ParentNotification::DocumentTypeFailed { reason, .. } => {
                self.outcome = SessionOutcome::DataGenerationFailed { reason };
            }
            ParentNotification::CoordinatorFault { message, .. } => {
                self.outcome = SessionOutcome::Faulted { message };
            }
            ParentNotification::Escalated { failure, .. } => {
                self.outcome = SessionOutcome::Escalated(failure);
            }
        }
    }
}

/// Outcome of an `index_all` run, in request order
#[derive(Debug, Clone, Serialize)]
pub struct IndexingReport {
    pub started_at: DateTime<Utc>,
    pub sessions: Vec<SessionReport>,
    pub elapsed: Duration,
}

impl IndexingReport {
    pub fn completed(&self) -> usize {
        self.sessions.iter().filter(|s| s.outcome.is_completed()).count()
    }

    pub fn all_completed(&self) -> bool {
        self.completed() == self.sessions.len()
    }

    /// Documents indexed without an index failure, over all sessions
    pub fn documents_indexed(&self) -> u64 {
        self.sessions
            .iter()
            .filter_map(|s| match &s.outcome {
                SessionOutcome::Completed(stats) => Some(stats.documents_indexed()),
                _ => None,
            })
            .sum()
    }

    pub fn session(&self, document_type: &DocumentType) -> Option<&SessionReport> {
        self.sessions.iter().find(|s| &s.document_type == document_type)
    }
}

/// Parent of the coordinator sessions
pub struct IndexingMaster {
    config: IndexerConfig,
    services: PoolServices,
}

impl IndexingMaster {
    pub fn new(config: IndexerConfig, services: PoolServices) -> Self {
        Self { config, services }
    }

    pub fn config(&self) -> &IndexerConfig {
        &self.config
    }

    /// Index every request in its own session and wait for all of them
    pub async fn index_all(&self, requests: Vec<DocumentTypeRequest>) -> IndexingReport {
        let started_at = Utc::now();
        let started = Instant::now();
        let (parent, mut notifications) = mpsc::unbounded_channel();
        let mut handles = Vec::with_capacity(requests.len());
        let mut reports = Vec::with_capacity(requests.len());
        let mut positions = HashMap::new();

        for request in requests {
            let handle = coordinator::spawn(&self.config, &self.services, parent.clone());
            let mut report = SessionReport::pending(handle.session_id(), request.document_type.clone());

            log_progress(
                Component::Master,
                "Starting session",
                &format!("{} for '{}'", handle.session_id().short(), request.document_type),
            );
            if let Err(e) = handle.submit(request).await {
                log_error(Component::Master, "Failed to submit request", &e);
                report.outcome = SessionOutcome::Faulted { message: e.to_string() };
                handle.abort();
            }

            positions.insert(handle.session_id(), reports.len());
            reports.push(report);
            handles.push(handle);
        }
        // Only the sessions hold senders now; the channel closes when they all end
        drop(parent);

        let deadline = self.config.session_timeout().map(|timeout| started + timeout);
        loop {
            let next = match deadline {
                Some(deadline) => match tokio::time::timeout_at(deadline, notifications.recv()).await {
                    Ok(next) => next,
                    Err(_) => {
                        while let Ok(notification) = notifications.try_recv() {
                            Self::record(&mut reports, &positions, notification);
                        }
                        Self::abort_unfinished(&handles, &mut reports, &positions);
                        break;
                    }
                },
                None => notifications.recv().await,
            };

            let Some(notification) = next else {
                break;
            };
            Self::record(&mut reports, &positions, notification);
        }

        for handle in handles {
            let session_id = handle.session_id();
            match handle.join().await {
                Ok(summary) => {
                    if let Some(&index) = positions.get(&session_id) {
                        reports[index].restarts = summary.restarts;
                        reports[index].unhandled_messages = summary.unhandled_messages;
                    }
                }
                Err(e) => {
                    component_debug!(Component::Master, session = %session_id.short(), error = %e, "Session did not return a summary");
                }
            }
        }

        IndexingReport {
            started_at,
            sessions: reports,
            elapsed: started.elapsed(),
        }
    }

    fn record(reports: &mut [SessionReport], positions: &HashMap<SessionId, usize>, notification: ParentNotification) {
        let session_id = notification.session_id();
        let Some(&index) = positions.get(&session_id) else {
            component_warn!(Component::Master, session = %session_id.short(), "Notification from unknown session");
            return;
        };

        match &notification {
            ParentNotification::DocumentTypeComplete { document_type, stats, .. } => {
                component_info!(
                    Component::Master,
                    session = %session_id.short(),
                    "🎉 '{}' complete: {} documents indexed",
                    document_type,
                    stats.documents_indexed()
                );
            }
            ParentNotification::DocumentTypeFailed { document_type, reason, .. } => {
                component_warn!(Component::Master, session = %session_id.short(), "'{}' failed: {}", document_type, reason);
            }
            ParentNotification::CoordinatorFault { message, .. } => {
                component_warn!(Component::Master, session = %session_id.short(), "Coordinator fault: {}", message);
            }
            ParentNotification::Escalated { failure, .. } => {
                component_warn!(Component::Master, session = %session_id.short(), "Escalated: {}", failure);
            }
        }
        reports[index].record(notification);
    }

    fn abort_unfinished(
        handles: &[CoordinatorHandle],
        reports: &mut [SessionReport],
        positions: &HashMap<SessionId, usize>,
    ) {
        for handle in handles.iter().filter(|h| !h.is_finished()) {
            let Some(&index) = positions.get(&handle.session_id()) else {
                continue;
            };
            let report = &mut reports[index];
            if report.outcome == SessionOutcome::Pending {
                component_warn!(
                    Component::Master,
                    session = %handle.session_id().short(),
                    "⏱️ Session for '{}' timed out, aborting",
                    report.document_type
                );
                handle.abort();
                report.outcome = SessionOutcome::TimedOut;
            }
        }
    }
}
