//! Main entry point for the indexer binary
//!
//! Wires the sample collaborators into an `IndexingMaster` and indexes one
//! session per document type given on the command line.

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;

use indexer::services::{InMemoryIndexWriter, SampleDataGenerator, SampleDocumentGenerator};
use indexer::{IndexerConfig, IndexerResult, IndexingMaster, MailboxConfig, OverflowPolicy, PoolServices, SessionOutcome};
use shared::{Component, DocumentType, DocumentTypeRequest, component_debug, component_info, logging};

/// Catalog indexer: generates and indexes documents per document type
#[derive(Parser)]
#[command(name = "indexer")]
#[command(about = "Generates catalog documents per document type and writes them to a search index")]
pub struct Args {
    /// Document types to index, comma separated
    #[arg(long, value_delimiter = ',', default_value = "product,product-property,product-group")]
    pub types: Vec<String>,

    /// Documents to generate per document type
    #[arg(long, default_value = "100")]
    pub documents: u32,

    /// Target index name
    #[arg(long, default_value = "catalog")]
    pub index_name: String,

    /// JSON configuration file
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    pub log_level: String,

    /// Data generator workers
    #[arg(long)]
    pub data_workers: Option<usize>,

    /// Document generator workers
    #[arg(long)]
    pub document_workers: Option<usize>,

    /// Index writer workers
    #[arg(long)]
    pub index_workers: Option<usize>,

    /// Bound the coordinator inbox to this many messages
    #[arg(long)]
    pub inbox_capacity: Option<usize>,

    /// What a full inbox does with submitted requests (block, drop-newest, reject)
    #[arg(long)]
    pub inbox_overflow: Option<OverflowPolicy>,

    /// Give up on sessions still running after this many seconds
    #[arg(long)]
    pub session_timeout_secs: Option<u64>,

    /// Share of documents the sample generator reports as failed
    #[arg(long, default_value = "0.0", value_parser = parse_rate)]
    pub generation_failure_rate: f64,

    /// Share of writes the in-memory index reports as failed
    #[arg(long, default_value = "0.0", value_parser = parse_rate)]
    pub index_failure_rate: f64,

    /// Seed for the sample generators
    #[arg(long, default_value = "42")]
    pub seed: u64,

    /// Print the final report as JSON
    #[arg(long)]
    pub json: bool,
}

/// A failure rate must be a finite share between 0 and 1
fn parse_rate(input: &str) -> Result<f64, String> {
    let rate: f64 = input.parse().map_err(|e| format!("'{input}' is not a number: {e}"))?;
    if !rate.is_finite() || !(0.0..=1.0).contains(&rate) {
        return Err(format!("'{input}' must be between 0 and 1"));
    }
    Ok(rate)
}

impl Args {
    /// Layer defaults, config file, environment and flags
    fn resolve_config(&self) -> IndexerResult<IndexerConfig> {
        let config = match &self.config {
            Some(path) => IndexerConfig::from_file(path)?,
            None => IndexerConfig::default(),
        };
        let mut config = config.apply_env()?;

        if let Some(workers) = self.data_workers {
            config.data_generator.workers = workers;
        }
        if let Some(workers) = self.document_workers {
            config.document_generator.workers = workers;
        }
        if let Some(workers) = self.index_workers {
            config.index_writer.workers = workers;
        }
        if let Some(capacity) = self.inbox_capacity {
            config.inbox = MailboxConfig::bounded(capacity, self.inbox_overflow.unwrap_or(config.inbox.overflow));
        } else if let Some(overflow) = self.inbox_overflow {
            config.inbox.overflow = overflow;
        }
        if self.session_timeout_secs.is_some() {
            config.session_timeout_secs = self.session_timeout_secs;
        }

        config.validate()?;
        Ok(config)
    }

    fn requests(&self) -> IndexerResult<Vec<DocumentTypeRequest>> {
        self.types
            .iter()
            .map(|raw| {
                let document_type = DocumentType::parse(raw)?;
                Ok(DocumentTypeRequest::new(document_type, self.index_name.clone(), self.documents))
            })
            .collect()
    }
}

#[tokio::main]
async fn main() -> IndexerResult<()> {
    // Load .env before anything reads the environment
    dotenv::dotenv().ok();
    let args = Args::parse();
    logging::init_tracing(Some(&args.log_level));

    let config = args.resolve_config()?;
    let requests = args.requests()?;

    logging::log_startup(Component::Master, &format!("indexer for {} document types", requests.len()));
    component_debug!(Component::Master, config = ?config, "Resolved configuration");

    let writer = Arc::new(InMemoryIndexWriter::new().with_failure_rate(args.index_failure_rate, args.seed));
    let services = PoolServices {
        data: Arc::new(SampleDataGenerator::new()),
        documents: Arc::new(SampleDocumentGenerator::new(args.seed).with_failure_rate(args.generation_failure_rate)),
        writer: writer.clone(),
    };
    let master = IndexingMaster::new(config, services);

    let report = tokio::select! {
        report = master.index_all(requests) => report,
        result = signal::ctrl_c() => {
            match result {
                Ok(()) => logging::log_shutdown(Component::Master, "Received Ctrl+C signal"),
                Err(err) => logging::log_error(Component::Master, "Signal handling", &err),
            }
            return Ok(());
        }
    };

    for session in &report.sessions {
        match &session.outcome {
            SessionOutcome::Completed(stats) => {
                component_info!(
                    Component::Master,
                    "'{}': {} indexed, {} index failures, {} generation failures",
                    session.document_type,
                    stats.documents_indexed(),
                    stats.index_failures,
                    stats.generation_failures
                );
            }
            other => {
                component_info!(Component::Master, "'{}': {:?}", session.document_type, other);
            }
        }
    }
    for (index_name, count) in writer.summary() {
        component_info!(Component::Master, "Index '{}' holds {} documents", index_name, count);
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    }

    if report.all_completed() {
        logging::log_success(
            Component::Master,
            &format!("Indexed {} documents in {:.2?}", report.documents_indexed(), report.elapsed),
        );
    } else {
        logging::log_shutdown(
            Component::Master,
            &format!("{} of {} sessions completed", report.completed(), report.sessions.len()),
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_rates_must_be_finite_shares() {
        assert_eq!(parse_rate("0.25"), Ok(0.25));
        assert_eq!(parse_rate("1"), Ok(1.0));
        for bad in ["NaN", "inf", "-inf", "1.5", "-0.1", "often"] {
            assert!(parse_rate(bad).is_err(), "{bad} should be rejected");
        }
    }

    #[test]
    fn test_cli_rejects_nan_failure_rate() {
        let result = Args::try_parse_from(["indexer", "--generation-failure-rate", "NaN"]);
        assert!(result.is_err());

        let args = Args::try_parse_from(["indexer", "--index-failure-rate", "0.5"]).unwrap();
        assert_eq!(args.index_failure_rate, 0.5);
        assert_eq!(args.generation_failure_rate, 0.0);
    }
}
