//! Test fixtures and data for indexer tests
//!
//! This module provides consistent test data and fixtures used across all test suites.

use serde_json::{Map, json};
use shared::{
    ChildFailure, DocumentBody, DocumentJob, DocumentType, DocumentTypeRequest, FailureSignal, FaultCategory,
    PoolKind, SessionId,
};

/// Standard test data and fixtures
pub struct TestFixtures;

impl TestFixtures {
    /// Standard test session ID using proper UUID format
    pub const SESSION_1: &'static str = "550e8400-e29b-41d4-a716-446655440001";

    pub const BOOKS: &'static str = "books";
    pub const TOYS: &'static str = "toys";
    pub const INDEX_NAME: &'static str = "catalog";

    pub fn session_id() -> SessionId {
        SessionId::from_string(Self::SESSION_1).unwrap()
    }

    pub fn document_type(name: &str) -> DocumentType {
        DocumentType::parse(name).unwrap()
    }

    pub fn books() -> DocumentType {
        Self::document_type(Self::BOOKS)
    }

    pub fn toys() -> DocumentType {
        Self::document_type(Self::TOYS)
    }

    pub fn request(document_type: &DocumentType, count: u32) -> DocumentTypeRequest {
        DocumentTypeRequest::new(document_type.clone(), Self::INDEX_NAME, count)
    }

    /// Placeholder jobs as a data generator would emit them
    pub fn placeholders(document_type: &DocumentType, count: u32) -> Vec<DocumentJob> {
        (0..count)
            .map(|sequence| DocumentJob::placeholder(document_type.clone(), Self::INDEX_NAME, sequence))
            .collect()
    }

    pub fn body(name: &str) -> DocumentBody {
        let mut fields = Map::new();
        fields.insert("name".to_string(), json!(name));
        fields.insert("price".to_string(), json!(9.99));
        DocumentBody::new(fields)
    }

    pub fn generated(job: &DocumentJob) -> DocumentJob {
        job.clone().with_payload(Self::body(&format!("item {}", job.sequence)))
    }

    pub fn indexed(job: &DocumentJob) -> DocumentJob {
        Self::generated(job).into_indexed()
    }

    pub fn generation_failure(document_type: &DocumentType) -> FailureSignal {
        FailureSignal::DocumentGeneration {
            document_type: document_type.clone(),
            reason: "template rendering failed".to_string(),
        }
    }

    pub fn index_failure(document_type: &DocumentType) -> FailureSignal {
        FailureSignal::Index {
            document_type: document_type.clone(),
            reason: "mapping conflict".to_string(),
        }
    }

    pub fn data_failure(document_type: &DocumentType) -> FailureSignal {
        FailureSignal::DataGeneration {
            document_type: document_type.clone(),
            reason: "source unavailable".to_string(),
        }
    }

    pub fn child_failure(pool: PoolKind, worker: usize, category: FaultCategory) -> ChildFailure {
        ChildFailure {
            pool,
            worker,
            category,
            message: format!("{category} in worker {worker}"),
        }
    }
}
