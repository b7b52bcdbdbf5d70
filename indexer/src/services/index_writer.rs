//! In-memory index writer
//!
//! Stores generated documents per index name. Stands in for the search
//! engine client in the CLI and in tests.

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use shared::{DocumentBody, DocumentId, DocumentJob, FaultCategory};
use std::collections::HashMap;
use std::sync::{Mutex, RwLock};

use crate::error::{WorkerError, WorkerResult};
use crate::traits::IndexWriter;

type Index = HashMap<DocumentId, DocumentBody>;

pub struct InMemoryIndexWriter {
    indices: RwLock<HashMap<String, Index>>,
    failure_rate: f64,
    rng: Mutex<StdRng>,
}

impl InMemoryIndexWriter {
    pub fn new() -> Self {
        Self {
            indices: RwLock::new(HashMap::new()),
            failure_rate: 0.0,
            rng: Mutex::new(StdRng::seed_from_u64(0)),
        }
    }

    /// Share of writes reported as failed, clamped to 0..=1, non-finite means never (fluent API)
    pub fn with_failure_rate(mut self, failure_rate: f64, seed: u64) -> Self {
        self.failure_rate = if failure_rate.is_finite() { failure_rate.clamp(0.0, 1.0) } else { 0.0 };
        self.rng = Mutex::new(StdRng::seed_from_u64(seed));
        self
    }

    pub fn document_count(&self, index_name: &str) -> usize {
        self.indices
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(index_name)
            .map_or(0, HashMap::len)
    }

    pub fn document(&self, index_name: &str, id: &DocumentId) -> Option<DocumentBody> {
        self.indices
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(index_name)
            .and_then(|index| index.get(id).cloned())
    }

    /// Document count per index name
    pub fn summary(&self) -> HashMap<String, usize> {
        self.indices
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .iter()
            .map(|(name, index)| (name.clone(), index.len()))
            .collect()
    }

    fn should_fail(&self) -> bool {
        self.failure_rate > 0.0
            && self
                .rng
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner())
                .gen_bool(self.failure_rate)
    }
}

impl Default for InMemoryIndexWriter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl IndexWriter for InMemoryIndexWriter {
    async fn initialize(&self) -> WorkerResult<()> {
        Ok(())
    }

    async fn write(&self, job: &DocumentJob) -> WorkerResult<()> {
        let Some(body) = &job.payload else {
            return Err(WorkerError::fault(
                FaultCategory::IndexWrite,
                format!("document {} has no body", job.id),
            ));
        };

        if self.should_fail() {
            return Err(WorkerError::reported(format!(
                "index '{}' rejected document {}",
                job.index_name, job.id
            )));
        }

        self.indices
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .entry(job.index_name.clone())
            .or_default()
            .insert(job.id, body.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::DocumentType;

    fn generated(index_name: &str) -> DocumentJob {
        DocumentJob::placeholder(DocumentType::parse("toys").unwrap(), index_name, 0)
            .with_payload(DocumentBody::new(serde_json::Map::new()))
    }

    #[tokio::test]
    async fn test_writes_are_grouped_by_index() {
        let writer = InMemoryIndexWriter::new();
        let first = generated("catalog");
        writer.write(&first).await.unwrap();
        writer.write(&generated("catalog")).await.unwrap();
        writer.write(&generated("archive")).await.unwrap();

        assert_eq!(writer.document_count("catalog"), 2);
        assert_eq!(writer.document_count("archive"), 1);
        assert_eq!(writer.document_count("missing"), 0);
        assert!(writer.document("catalog", &first.id).is_some());
        assert_eq!(writer.summary().len(), 2);
    }

    #[tokio::test]
    async fn test_missing_body_is_a_fault() {
        let writer = InMemoryIndexWriter::new();
        let placeholder = DocumentJob::placeholder(DocumentType::parse("toys").unwrap(), "catalog", 0);

        match writer.write(&placeholder).await {
            Err(WorkerError::Fault { category, .. }) => assert_eq!(category, FaultCategory::IndexWrite),
            other => panic!("expected index write fault, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_failure_rate_reports_instead_of_writing() {
        let writer = InMemoryIndexWriter::new().with_failure_rate(1.0, 3);
        assert!(matches!(
            writer.write(&generated("catalog")).await,
            Err(WorkerError::Reported { .. })
        ));
        assert_eq!(writer.document_count("catalog"), 0);
    }

    #[tokio::test]
    async fn test_non_finite_failure_rate_never_fails() {
        for rate in [f64::NAN, f64::INFINITY] {
            let writer = InMemoryIndexWriter::new().with_failure_rate(rate, 9);
            for _ in 0..5 {
                writer.write(&generated("catalog")).await.unwrap();
            }
            assert_eq!(writer.document_count("catalog"), 5);
        }
    }
}
