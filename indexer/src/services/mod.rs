//! Service implementations
//!
//! Mailboxes and worker pools carry the coordinator's traffic. The sample
//! collaborators are the implementations wired up by the binary.

pub mod document_generator;
pub mod index_writer;
pub mod mailbox;
pub mod pool;
pub mod sample_data;

#[cfg(test)]
mod tests;

// Re-export all service implementations
pub use document_generator::SampleDocumentGenerator;
pub use index_writer::InMemoryIndexWriter;
pub use mailbox::{Delivery, MailboxConfig, MailboxError, MailboxReceiver, MailboxSender, OverflowPolicy, mailbox};
pub use pool::{PoolServices, PoolSet, WorkerPool};
pub use sample_data::SampleDataGenerator;
