//! Per-session coordinator counters
//!
//! Pure bookkeeping with no I/O. The coordinator owns exactly one of these
//! and mutates it one message at a time.

use serde::{Deserialize, Serialize};
use shared::CompletionStats;

use crate::error::{IndexerError, IndexerResult};

/// Counters for one coordinator session
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoordinatorState {
    /// Outstanding document-type requests
    document_types_in_flight: u32,
    /// Documents dispatched into the generate/index pipeline
    documents_queued: u64,
    /// Documents that finished indexing, successfully or not
    documents_completed: u64,

    /// Informational only, never used for completion
    generation_failures: u64,
    index_failures: u64,
}

impl CoordinatorState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn document_types_in_flight(&self) -> u32 {
        self.document_types_in_flight
    }

    pub fn documents_queued(&self) -> u64 {
        self.documents_queued
    }

    pub fn documents_completed(&self) -> u64 {
        self.documents_completed
    }

    pub fn accept_document_type(&mut self) {
        self.document_types_in_flight += 1;
    }

    pub fn release_document_type(&mut self) -> IndexerResult<()> {
        self.document_types_in_flight = self
            .document_types_in_flight
            .checked_sub(1)
            .ok_or(IndexerError::CounterUnderflow {
                counter: "document_types_in_flight",
            })?;
        Ok(())
    }

    /// Used on the fault path, where a second error must not be raised
    pub fn abandon_document_type(&mut self) {
        self.document_types_in_flight = self.document_types_in_flight.saturating_sub(1);
    }

    pub fn document_queued(&mut self) {
        self.documents_queued += 1;
    }

    pub fn document_completed(&mut self) {
        self.documents_completed += 1;
    }

    /// One expected document will never arrive
    pub fn document_generation_failed(&mut self) -> IndexerResult<()> {
        self.documents_queued = self
            .documents_queued
            .checked_sub(1)
            .ok_or(IndexerError::CounterUnderflow {
                counter: "documents_queued",
            })?;
        self.generation_failures += 1;
        Ok(())
    }

    /// A failed index write counts as done
    pub fn document_index_failed(&mut self) {
        self.documents_completed += 1;
        self.index_failures += 1;
    }

    /// Every queued document has reached a terminal outcome
    pub fn is_drained(&self) -> bool {
        self.documents_queued == self.documents_completed
    }

    pub fn completion_stats(&self) -> CompletionStats {
        CompletionStats {
            documents_queued: self.documents_queued,
            documents_completed: self.documents_completed,
            generation_failures: self.generation_failures,
            index_failures: self.index_failures,
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
