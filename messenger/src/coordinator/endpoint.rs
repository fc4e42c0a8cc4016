//! Subscriber endpoints and the delivery policy applied to them

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::{TryRecvError, TrySendError};
use tracing::debug;
use uuid::Uuid;

/// Create a connected endpoint pair for a subscriber
///
/// `capacity == 0` yields a rendezvous endpoint: the queue holds a single message and
/// delivery only completes once the consumer has taken it.
pub(crate) fn channel<T>(capacity: usize) -> (Endpoint<T>, EndpointSender<T>) {
    let id = Uuid::now_v7();
    debug!(%id, %capacity, "endpoint::channel: called");
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (
        Endpoint { id, rx },
        EndpointSender {
            tx,
            rendezvous: capacity == 0,
        },
    )
}

/// A subscriber's receiving half
///
/// Returned by [`Messenger::subscribe`](super::Messenger::subscribe). Once the messenger
/// closes the endpoint (unsubscribe, reset, shutdown) buffered messages can still be
/// read, after which `recv` returns `None` and the consumer should stop reading.
#[derive(Debug)]
pub struct Endpoint<T> {
    id: Uuid,
    rx: mpsc::Receiver<T>,
}

impl<T> Endpoint<T> {
    /// Identity of this endpoint in the messenger registry
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Wait for the next message
    ///
    /// Returns `None` once the endpoint is closed and drained.
    pub async fn recv(&mut self) -> Option<T> {
        self.rx.recv().await
    }

    /// Wait for the next message, reporting whether the endpoint is still open
    pub async fn recv_open(&mut self) -> (Option<T>, bool) {
        let msg = self.rx.recv().await;
        let open = msg.is_some();
        (msg, open)
    }

    /// Take a message if one is buffered
    pub fn try_recv(&mut self) -> Option<T> {
        match self.rx.try_recv() {
            Ok(msg) => Some(msg),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }

    /// Number of buffered messages
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }

    /// True once the messenger has closed this endpoint
    ///
    /// Buffered messages may remain readable.
    pub fn is_closed(&self) -> bool {
        self.rx.is_closed()
    }
}

/// Outcome of delivering one message to one endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Delivery {
    Delivered,
    Dropped,
    /// The consumer dropped its endpoint
    Closed,
}

/// The monitor's sending half of an endpoint
pub(crate) struct EndpointSender<T> {
    tx: mpsc::Sender<T>,
    rendezvous: bool,
}

impl<T> EndpointSender<T> {
    /// Deliver `msg` according to the drop policy
    ///
    /// With `drop_on_full` a full queue discards the message. Otherwise this waits for
    /// room, and for rendezvous endpoints until the consumer has taken the message.
    /// Either wait ends early if the consumer goes away.
    pub(crate) async fn deliver(&self, msg: T, drop_on_full: bool) -> Delivery {
        if drop_on_full {
            return match self.tx.try_send(msg) {
                Ok(()) => Delivery::Delivered,
                Err(TrySendError::Full(_)) => Delivery::Dropped,
                Err(TrySendError::Closed(_)) => Delivery::Closed,
            };
        }

        if self.tx.send(msg).await.is_err() {
            return Delivery::Closed;
        }

        if self.rendezvous {
            // The slot frees up once the consumer has received the message
            match self.tx.reserve().await {
                Ok(permit) => drop(permit),
                Err(_) => return Delivery::Closed,
            }
        }

        Delivery::Delivered
    }

    /// Messages currently buffered in the endpoint
    pub(crate) fn queued(&self) -> usize {
        self.tx.max_capacity() - self.tx.capacity()
    }

    /// True if the consumer dropped its endpoint
    pub(crate) fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}
