//! Indexer configuration
//!
//! Values are layered: defaults, then an optional JSON file, then
//! environment variables, then command-line flags (applied in `main`).

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::core::RestartBudgetConfig;
use crate::error::{IndexerError, IndexerResult};
use crate::services::mailbox::{MailboxConfig, OverflowPolicy};

pub const ENV_DATA_WORKERS: &str = "INDEXER_DATA_WORKERS";
pub const ENV_DOCUMENT_WORKERS: &str = "INDEXER_DOCUMENT_WORKERS";
pub const ENV_INDEX_WORKERS: &str = "INDEXER_INDEX_WORKERS";
pub const ENV_INBOX_CAPACITY: &str = "INDEXER_INBOX_CAPACITY";
pub const ENV_INBOX_OVERFLOW: &str = "INDEXER_INBOX_OVERFLOW";
pub const ENV_MAX_RESTARTS: &str = "INDEXER_MAX_RESTARTS";
pub const ENV_RESTART_WINDOW_SECS: &str = "INDEXER_RESTART_WINDOW_SECS";

/// Worker count and queue policy for one pool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    pub workers: usize,
    pub queue: MailboxConfig,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            queue: MailboxConfig::unbounded(),
        }
    }
}

impl PoolConfig {
    pub fn with_workers(workers: usize) -> Self {
        Self {
            workers,
            ..Self::default()
        }
    }
}

/// Configuration shared by every coordinator session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexerConfig {
    pub data_generator: PoolConfig,
    pub document_generator: PoolConfig,
    pub index_writer: PoolConfig,
    /// Coordinator inbox. The overflow policy applies to submitted
    /// requests; pool replies always wait for space.
    pub inbox: MailboxConfig,
    pub restart_budget: RestartBudgetConfig,
    /// Master gives up on a session after this long
    pub session_timeout_secs: Option<u64>,
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self {
            data_generator: PoolConfig::with_workers(1),
            document_generator: PoolConfig::with_workers(4),
            index_writer: PoolConfig::with_workers(4),
            inbox: MailboxConfig::unbounded(),
            restart_budget: RestartBudgetConfig::default(),
            session_timeout_secs: None,
        }
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, raw: String) -> IndexerResult<T> {
    raw.trim()
        .parse()
        .map_err(|_| IndexerError::config(key, format!("cannot parse '{raw}'")))
}

impl IndexerConfig {
    /// Load from a JSON file; missing fields keep their defaults
    pub fn from_file(path: &Path) -> IndexerResult<Self> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Overlay values from the process environment
    pub fn apply_env(self) -> IndexerResult<Self> {
        self.apply_env_with(|key| std::env::var(key).ok())
    }

    /// Overlay values from any key lookup
    pub fn apply_env_with(mut self, lookup: impl Fn(&str) -> Option<String>) -> IndexerResult<Self> {
        if let Some(raw) = lookup(ENV_DATA_WORKERS) {
            self.data_generator.workers = parse_env(ENV_DATA_WORKERS, raw)?;
        }
        if let Some(raw) = lookup(ENV_DOCUMENT_WORKERS) {
            self.document_generator.workers = parse_env(ENV_DOCUMENT_WORKERS, raw)?;
        }
        if let Some(raw) = lookup(ENV_INDEX_WORKERS) {
            self.index_writer.workers = parse_env(ENV_INDEX_WORKERS, raw)?;
        }
        if let Some(raw) = lookup(ENV_INBOX_CAPACITY) {
            self.inbox.capacity = Some(parse_env(ENV_INBOX_CAPACITY, raw)?);
        }
        if let Some(raw) = lookup(ENV_INBOX_OVERFLOW) {
            self.inbox.overflow = parse_env::<OverflowPolicy>(ENV_INBOX_OVERFLOW, raw)?;
        }
        if let Some(raw) = lookup(ENV_MAX_RESTARTS) {
            self.restart_budget.max_restarts = parse_env(ENV_MAX_RESTARTS, raw)?;
        }
        if let Some(raw) = lookup(ENV_RESTART_WINDOW_SECS) {
            self.restart_budget.window_secs = parse_env(ENV_RESTART_WINDOW_SECS, raw)?;
        }
        Ok(self)
    }

    pub fn session_timeout(&self) -> Option<Duration> {
        self.session_timeout_secs.map(Duration::from_secs)
    }

    pub fn validate(&self) -> IndexerResult<()> {
        let pools = [
            ("data_generator", &self.data_generator),
            ("document_generator", &self.document_generator),
            ("index_writer", &self.index_writer),
        ];

        for (name, pool) in pools {
            if pool.workers == 0 {
                return Err(IndexerError::config(
                    format!("{name}.workers"),
                    "a pool needs at least one worker",
                ));
            }
            if pool.queue.capacity == Some(0) {
                return Err(IndexerError::config(format!("{name}.queue.capacity"), "must be positive"));
            }
        }

        if self.inbox.capacity == Some(0) {
            return Err(IndexerError::config("inbox.capacity", "must be positive"));
        }
        if self.restart_budget.window_secs == 0 {
            return Err(IndexerError::config("restart_budget.window_secs", "must be positive"));
        }
        if self.session_timeout_secs == Some(0) {
            return Err(IndexerError::config("session_timeout_secs", "must be positive"));
        }

        // Workers wait on a full bounded inbox whatever its policy, so the
        // coordinator must never wait on a full pool queue
        if self.inbox.capacity.is_some() {
            if let Some((name, _)) = pools.iter().find(|(_, pool)| pool.queue.can_block()) {
                return Err(IndexerError::config(
                    format!("{name}.queue"),
                    "a blocking bounded pool queue cannot be combined with a bounded inbox",
                ));
            }
        }

        Ok(())
    }
}
