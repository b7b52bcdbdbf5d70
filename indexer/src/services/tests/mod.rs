//! Service-specific tests
//!
//! Mailbox policies and worker pool supervision hooks, exercised against
//! mockall collaborators.


// Common test utilities for services
#[cfg(test)]
pub mod common {
    use shared::{DocumentJob, DocumentType};
    use std::time::Duration;
    use tokio::time::timeout;

    /// Standard timeout for async operations in tests
    pub const TEST_TIMEOUT: Duration = Duration::from_millis(500);

    /// Helper to run async operations with timeout
    pub async fn with_timeout<T, F>(future: F) -> Result<T, tokio::time::error::Elapsed>
    where
        F: std::future::Future<Output = T>,
    {
        timeout(TEST_TIMEOUT, future).await
    }

    pub fn books() -> DocumentType {
        DocumentType::parse("books").expect("Valid test document type")
    }

    pub fn placeholder(sequence: u32) -> DocumentJob {
        DocumentJob::placeholder(books(), "catalog", sequence)
    }
}
