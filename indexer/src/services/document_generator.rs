//! Sample document generator
//!
//! Fills placeholder jobs with a small product-like JSON body. A seeded RNG
//! keeps runs reproducible; an optional failure rate reports some documents
//! as failed.

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::{Map, Value, json};
use shared::{DocumentBody, DocumentJob};
use std::sync::Mutex;

use crate::error::{WorkerError, WorkerResult};
use crate::traits::DocumentGenerator;

pub struct SampleDocumentGenerator {
    failure_rate: f64,
    rng: Mutex<StdRng>,
}

impl SampleDocumentGenerator {
    pub fn new(seed: u64) -> Self {
        Self {
            failure_rate: 0.0,
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    /// Share of documents reported as failed, clamped to 0..=1, non-finite means never (fluent API)
    pub fn with_failure_rate(mut self, failure_rate: f64) -> Self {
        self.failure_rate = if failure_rate.is_finite() { failure_rate.clamp(0.0, 1.0) } else { 0.0 };
        self
    }
}

#[async_trait]
impl DocumentGenerator for SampleDocumentGenerator {
    async fn initialize(&self) -> WorkerResult<()> {
        Ok(())
    }

    async fn generate(&self, job: &DocumentJob) -> WorkerResult<DocumentBody> {
        let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

        if rng.gen_bool(self.failure_rate) {
            return Err(WorkerError::reported(format!(
                "could not generate document {} of '{}'",
                job.sequence, job.document_type
            )));
        }

        let price = (rng.gen_range(1.0..500.0_f64) * 100.0).round() / 100.0;
        let mut fields = Map::new();
        fields.insert("id".to_string(), json!(job.id.to_string()));
        fields.insert("category".to_string(), json!(job.document_type.as_str()));
        fields.insert(
            "name".to_string(),
            json!(format!("{} item {}", job.document_type, job.sequence)),
        );
        fields.insert("price".to_string(), json!(price));
        fields.insert("in_stock".to_string(), Value::Bool(rng.gen_bool(0.8)));

        Ok(DocumentBody::new(fields))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::DocumentType;

    fn placeholder(sequence: u32) -> DocumentJob {
        DocumentJob::placeholder(DocumentType::parse("books").unwrap(), "catalog", sequence)
    }

    #[tokio::test]
    async fn test_generates_product_fields() {
        let generator = SampleDocumentGenerator::new(7);
        let body = generator.generate(&placeholder(4)).await.unwrap();

        assert_eq!(body.fields["name"], json!("books item 4"));
        assert_eq!(body.fields["category"], json!("books"));
        let price = body.fields["price"].as_f64().unwrap();
        assert!((1.0..=500.0).contains(&price));
        assert!(body.fields["in_stock"].is_boolean());
    }

    #[tokio::test]
    async fn test_same_seed_same_documents() {
        let first = SampleDocumentGenerator::new(42);
        let second = SampleDocumentGenerator::new(42);
        let job = placeholder(1);

        let a = first.generate(&job).await.unwrap();
        let b = second.generate(&job).await.unwrap();
        assert_eq!(a.fields, b.fields);
    }

    #[tokio::test]
    async fn test_full_failure_rate_reports_every_document() {
        let generator = SampleDocumentGenerator::new(1).with_failure_rate(1.5);
        for sequence in 0..5 {
            assert!(matches!(
                generator.generate(&placeholder(sequence)).await,
                Err(WorkerError::Reported { .. })
            ));
        }
    }

    #[tokio::test]
    async fn test_non_finite_failure_rate_never_fails() {
        for rate in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let generator = SampleDocumentGenerator::new(3).with_failure_rate(rate);
            for sequence in 0..5 {
                assert!(generator.generate(&placeholder(sequence)).await.is_ok());
            }
        }
    }
}
