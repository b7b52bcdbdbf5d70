//! Documents moving through the generate → index pipeline

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{DocumentId, DocumentType};

/// Generation parameters carried by a document-type request
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct GenerationParams {
    /// Search index the generated documents are written to
    pub index_name: String,
    /// Number of documents the data generator should emit
    pub document_count: u32,
}

/// Request to generate and index every document of one type
///
/// Sent by the master to a coordinator, and forwarded unchanged to the
/// data generator pool.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct DocumentTypeRequest {
    pub document_type: DocumentType,
    pub params: GenerationParams,
}

impl DocumentTypeRequest {
    pub fn new(document_type: DocumentType, index_name: impl Into<String>, document_count: u32) -> Self {
        Self {
            document_type,
            params: GenerationParams {
                index_name: index_name.into(),
                document_count,
            },
        }
    }
}

/// Generated document body
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct DocumentBody {
    pub fields: serde_json::Map<String, serde_json::Value>,
    pub generated_at: DateTime<Utc>,
}

impl DocumentBody {
    pub fn new(fields: serde_json::Map<String, serde_json::Value>) -> Self {
        Self {
            fields,
            generated_at: Utc::now(),
        }
    }
}

/// Where a job currently sits in the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobPhase {
    /// No body yet, needs document generation
    Placeholder,
    /// Body generated, needs indexing
    Generated,
    /// Acknowledged by the index writer
    Indexed,
}

/// One document moving through the pipeline
///
/// Phase transitions consume the job and hand back the next copy, so a pool
/// never mutates a job owned by someone else.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct DocumentJob {
    pub id: DocumentId,
    pub document_type: DocumentType,
    pub index_name: String,
    pub sequence: u32,
    pub payload: Option<DocumentBody>,
    pub index_done: bool,
}

impl DocumentJob {
    /// A job that still needs its body generated
    pub fn placeholder(document_type: DocumentType, index_name: impl Into<String>, sequence: u32) -> Self {
        Self {
            id: DocumentId::new(),
            document_type,
            index_name: index_name.into(),
            sequence,
            payload: None,
            index_done: false,
        }
    }

    pub fn with_payload(self, body: DocumentBody) -> Self {
        Self {
            payload: Some(body),
            ..self
        }
    }

    pub fn into_indexed(self) -> Self {
        Self {
            index_done: true,
            ..self
        }
    }

    pub fn phase(&self) -> JobPhase {
        match (self.index_done, &self.payload) {
            (true, _) => JobPhase::Indexed,
            (false, None) => JobPhase::Placeholder,
            (false, Some(_)) => JobPhase::Generated,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn books() -> DocumentType {
        DocumentType::parse("books").unwrap()
    }

    #[test]
    fn test_job_phase_transitions() {
        let job = DocumentJob::placeholder(books(), "catalog", 0);
        assert_eq!(job.phase(), JobPhase::Placeholder);

        let id = job.id;
        let generated = job.with_payload(DocumentBody::new(serde_json::Map::new()));
        assert_eq!(generated.phase(), JobPhase::Generated);
        assert_eq!(generated.id, id);

        let indexed = generated.into_indexed();
        assert_eq!(indexed.phase(), JobPhase::Indexed);
        assert!(indexed.payload.is_some());
    }

    #[test]
    fn test_index_done_wins_over_missing_payload() {
        let job = DocumentJob::placeholder(books(), "catalog", 3).into_indexed();
        assert_eq!(job.phase(), JobPhase::Indexed);
    }
}
