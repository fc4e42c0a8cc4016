//! Message types for the Messenger monitor

use std::fmt;

use thiserror::Error;
use tokio::sync::oneshot;
use uuid::Uuid;

use super::endpoint::Endpoint;

/// Errors returned to Messenger callers
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MessengerError {
    /// The messenger was shut down; no new endpoints are handed out
    #[error("can't subscribe, messenger killed")]
    Closed,
}

/// Lifecycle of the monitor task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessengerState {
    Running,
    Killed,
}

/// Internal requests to the monitor task
pub(crate) enum MessengerRequest<T> {
    /// Create and register a new endpoint
    Subscribe {
        reply: oneshot::Sender<Result<Endpoint<T>, MessengerError>>,
    },

    /// Remove and close an endpoint
    Unsubscribe { id: Uuid, ack: oneshot::Sender<()> },

    /// Deliver a message to every registered endpoint
    Broadcast { msg: T, done: oneshot::Sender<()> },

    /// Close and remove every endpoint
    Reset { ack: oneshot::Sender<()> },

    /// Close every endpoint and stop accepting requests
    Shutdown { ack: oneshot::Sender<()> },

    /// Number of registered endpoints
    Size { reply: oneshot::Sender<usize> },

    /// Buffered message count of each registered endpoint
    QueueLengths { reply: oneshot::Sender<Vec<usize>> },

    /// Get current metrics
    GetMetrics {
        reply: oneshot::Sender<MessengerMetrics>,
    },
}

impl<T> MessengerRequest<T> {
    /// Request name for logging
    pub(crate) fn kind(&self) -> &'static str {
        match self {
            Self::Subscribe { .. } => "Subscribe",
            Self::Unsubscribe { .. } => "Unsubscribe",
            Self::Broadcast { .. } => "Broadcast",
            Self::Reset { .. } => "Reset",
            Self::Shutdown { .. } => "Shutdown",
            Self::Size { .. } => "Size",
            Self::QueueLengths { .. } => "QueueLengths",
            Self::GetMetrics { .. } => "GetMetrics",
        }
    }
}

impl<T> fmt::Debug for MessengerRequest<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MessengerRequest").field("kind", &self.kind()).finish_non_exhaustive()
    }
}

/// Messenger metrics for observability
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessengerMetrics {
    /// Endpoints currently registered
    pub subscribers: usize,
    /// Broadcast requests processed
    pub broadcasts: u64,
    /// Messages handed to endpoints
    pub delivered: u64,
    /// Messages discarded because an endpoint was full
    pub dropped: u64,
    /// Endpoints removed because their consumer went away without unsubscribing
    pub pruned: u64,
    /// Reset requests processed
    pub resets: u64,
}
