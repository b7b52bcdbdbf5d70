//! Mailboxes with explicit capacity and overflow policy
//!
//! Every queue in the system (coordinator inbox and each pool queue) is a
//! mailbox. A mailbox is either unbounded or bounded, and a bounded mailbox
//! decides what happens when it is full: wait for space, drop the new
//! message, or refuse it with an error.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

/// What a full bounded mailbox does with a new message
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverflowPolicy {
    /// Wait until there is room
    #[default]
    Block,
    /// Discard the incoming message
    DropNewest,
    /// Fail fast with [`MailboxError::Full`]
    Reject,
}

impl std::str::FromStr for OverflowPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "block" => Ok(OverflowPolicy::Block),
            "drop" | "drop_newest" | "drop-newest" => Ok(OverflowPolicy::DropNewest),
            "reject" => Ok(OverflowPolicy::Reject),
            _ => Err(format!("Unknown overflow policy: {s}")),
        }
    }
}

/// Capacity and overflow policy for one mailbox
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MailboxConfig {
    /// `None` means unbounded
    pub capacity: Option<usize>,
    pub overflow: OverflowPolicy,
}

impl Default for MailboxConfig {
    fn default() -> Self {
        Self::unbounded()
    }
}

impl MailboxConfig {
    pub fn unbounded() -> Self {
        Self {
            capacity: None,
            overflow: OverflowPolicy::Block,
        }
    }

    pub fn bounded(capacity: usize, overflow: OverflowPolicy) -> Self {
        Self {
            capacity: Some(capacity),
            overflow,
        }
    }

    /// A sender to this mailbox can be suspended by a full queue
    pub fn can_block(&self) -> bool {
        self.capacity.is_some() && self.overflow == OverflowPolicy::Block
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MailboxError {
    #[error("mailbox full (capacity {capacity})")]
    Full { capacity: usize },

    #[error("mailbox closed")]
    Closed,
}

/// Outcome of a send that did not fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Enqueued,
    /// The mailbox was full and its policy discarded the message
    Dropped,
}

/// Create a mailbox from its configuration
pub fn mailbox<T>(config: &MailboxConfig) -> (MailboxSender<T>, MailboxReceiver<T>) {
    match config.capacity {
        Some(capacity) => {
            let capacity = capacity.max(1);
            let (tx, rx) = mpsc::channel(capacity);
            (
                MailboxSender {
                    inner: SenderInner::Bounded {
                        tx,
                        capacity,
                        overflow: config.overflow,
                    },
                },
                MailboxReceiver {
                    inner: ReceiverInner::Bounded(rx),
                },
            )
        }
        None => {
            let (tx, rx) = mpsc::unbounded_channel();
            (
                MailboxSender {
                    inner: SenderInner::Unbounded(tx),
                },
                MailboxReceiver {
                    inner: ReceiverInner::Unbounded(rx),
                },
            )
        }
    }
}

/// Sending half of a mailbox
pub struct MailboxSender<T> {
    inner: SenderInner<T>,
}

enum SenderInner<T> {
    Bounded {
        tx: mpsc::Sender<T>,
        capacity: usize,
        overflow: OverflowPolicy,
    },
    Unbounded(mpsc::UnboundedSender<T>),
}

impl<T> Clone for MailboxSender<T> {
    fn clone(&self) -> Self {
        let inner = match &self.inner {
            SenderInner::Bounded { tx, capacity, overflow } => SenderInner::Bounded {
                tx: tx.clone(),
                capacity: *capacity,
                overflow: *overflow,
            },
            SenderInner::Unbounded(tx) => SenderInner::Unbounded(tx.clone()),
        };
        Self { inner }
    }
}

impl<T> fmt::Debug for MailboxSender<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.inner {
            SenderInner::Bounded { capacity, overflow, .. } => f
                .debug_struct("MailboxSender")
                .field("capacity", capacity)
                .field("overflow", overflow)
                .finish(),
            SenderInner::Unbounded(_) => f.debug_struct("MailboxSender").field("capacity", &"unbounded").finish(),
        }
    }
}

impl<T> MailboxSender<T> {
    /// Deliver a message according to the mailbox policy
    pub async fn send(&self, message: T) -> Result<Delivery, MailboxError> {
        match &self.inner {
            SenderInner::Unbounded(tx) => tx
                .send(message)
                .map(|_| Delivery::Enqueued)
                .map_err(|_| MailboxError::Closed),
            SenderInner::Bounded { tx, capacity, overflow } => match overflow {
                OverflowPolicy::Block => tx
                    .send(message)
                    .await
                    .map(|_| Delivery::Enqueued)
                    .map_err(|_| MailboxError::Closed),
                OverflowPolicy::DropNewest => match tx.try_send(message) {
                    Ok(()) => Ok(Delivery::Enqueued),
                    Err(TrySendError::Full(_)) => Ok(Delivery::Dropped),
                    Err(TrySendError::Closed(_)) => Err(MailboxError::Closed),
                },
                OverflowPolicy::Reject => match tx.try_send(message) {
                    Ok(()) => Ok(Delivery::Enqueued),
                    Err(TrySendError::Full(_)) => Err(MailboxError::Full { capacity: *capacity }),
                    Err(TrySendError::Closed(_)) => Err(MailboxError::Closed),
                },
            },
        }
    }

    /// Deliver a message, waiting for space whatever the overflow policy
    ///
    /// Used for replies that carry counted work and must never be lost.
    pub async fn send_wait(&self, message: T) -> Result<(), MailboxError> {
        match &self.inner {
            SenderInner::Unbounded(tx) => tx.send(message).map_err(|_| MailboxError::Closed),
            SenderInner::Bounded { tx, .. } => tx.send(message).await.map_err(|_| MailboxError::Closed),
        }
    }

    pub fn is_closed(&self) -> bool {
        match &self.inner {
            SenderInner::Bounded { tx, .. } => tx.is_closed(),
            SenderInner::Unbounded(tx) => tx.is_closed(),
        }
    }
}

/// Receiving half of a mailbox
pub struct MailboxReceiver<T> {
    inner: ReceiverInner<T>,
}

enum ReceiverInner<T> {
    Bounded(mpsc::Receiver<T>),
    Unbounded(mpsc::UnboundedReceiver<T>),
}

impl<T> fmt::Debug for MailboxReceiver<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MailboxReceiver").finish_non_exhaustive()
    }
}

impl<T> MailboxReceiver<T> {
    /// Next message, or `None` once every sender is gone and the queue is empty
    pub async fn recv(&mut self) -> Option<T> {
        match &mut self.inner {
            ReceiverInner::Bounded(rx) => rx.recv().await,
            ReceiverInner::Unbounded(rx) => rx.recv().await,
        }
    }

    /// Stop accepting new messages; queued ones can still be received
    pub fn close(&mut self) {
        match &mut self.inner {
            ReceiverInner::Bounded(rx) => rx.close(),
            ReceiverInner::Unbounded(rx) => rx.close(),
        }
    }

    pub fn len(&self) -> usize {
        match &self.inner {
            ReceiverInner::Bounded(rx) => rx.len(),
            ReceiverInner::Unbounded(rx) => rx.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
