//! Sample data generator
//!
//! Emits one placeholder per requested document. Used by the CLI and the
//! integration tests in place of a real catalog source.

use async_trait::async_trait;
use shared::{Component, DocumentJob, DocumentType, DocumentTypeRequest, component_debug};
use std::collections::HashSet;

use crate::error::{WorkerError, WorkerResult};
use crate::traits::DataGenerator;

/// Largest batch a single request may ask for
pub const DEFAULT_MAX_DOCUMENTS: u32 = 100_000;

pub struct SampleDataGenerator {
    max_documents: u32,
    failing_types: HashSet<DocumentType>,
}

impl SampleDataGenerator {
    pub fn new() -> Self {
        Self {
            max_documents: DEFAULT_MAX_DOCUMENTS,
            failing_types: HashSet::new(),
        }
    }

    /// Configure the per-request limit (fluent API)
    pub fn with_max_documents(mut self, max_documents: u32) -> Self {
        self.max_documents = max_documents;
        self
    }

    /// Report a data generation failure for these types (fluent API)
    pub fn with_failing_types(mut self, types: impl IntoIterator<Item = DocumentType>) -> Self {
        self.failing_types.extend(types);
        self
    }
}

impl Default for SampleDataGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DataGenerator for SampleDataGenerator {
    async fn initialize(&self) -> WorkerResult<()> {
        Ok(())
    }

    async fn generate(&self, request: &DocumentTypeRequest) -> WorkerResult<Vec<DocumentJob>> {
        if self.failing_types.contains(&request.document_type) {
            return Err(WorkerError::reported(format!(
                "no sample data source for '{}'",
                request.document_type
            )));
        }

        let count = request.params.document_count;
        if count > self.max_documents {
            return Err(WorkerError::reported(format!(
                "requested {count} documents, limit is {}",
                self.max_documents
            )));
        }

        component_debug!(
            Component::DataGenerator,
            "Generating {} placeholders for '{}'",
            count,
            request.document_type
        );
        Ok((0..count)
            .map(|sequence| {
                DocumentJob::placeholder(request.document_type.clone(), request.params.index_name.clone(), sequence)
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::JobPhase;

    fn request(document_type: &str, count: u32) -> DocumentTypeRequest {
        DocumentTypeRequest::new(DocumentType::parse(document_type).unwrap(), "catalog", count)
    }

    #[tokio::test]
    async fn test_emits_one_placeholder_per_document() {
        let generator = SampleDataGenerator::new();
        let jobs = generator.generate(&request("books", 3)).await.unwrap();

        assert_eq!(jobs.len(), 3);
        assert!(jobs.iter().all(|job| job.phase() == JobPhase::Placeholder));
        assert_eq!(jobs.iter().map(|job| job.sequence).collect::<Vec<_>>(), vec![0, 1, 2]);
        assert!(jobs.iter().all(|job| job.index_name == "catalog"));
    }

    #[tokio::test]
    async fn test_limit_and_failing_types_are_reported() {
        let generator = SampleDataGenerator::new()
            .with_max_documents(2)
            .with_failing_types([DocumentType::parse("toys").unwrap()]);

        assert!(matches!(
            generator.generate(&request("books", 3)).await,
            Err(WorkerError::Reported { .. })
        ));
        assert!(matches!(
            generator.generate(&request("toys", 1)).await,
            Err(WorkerError::Reported { .. })
        ));
        assert!(generator.generate(&request("books", 0)).await.unwrap().is_empty());
    }
}
