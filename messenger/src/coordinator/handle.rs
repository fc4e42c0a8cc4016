//! Messenger - client interface to the monitor task

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

use super::config::MessengerConfig;
use super::core::Monitor;
use super::endpoint::Endpoint;
use super::messages::{MessengerError, MessengerMetrics, MessengerRequest};

/// Handle to a broadcast domain
///
/// Cloneable; every clone talks to the same monitor task. Each operation is a request
/// to that task, so all operations observe a single order. Once shut down, `subscribe`
/// fails with [`MessengerError::Closed`] and every other operation is a no-op.
pub struct Messenger<T> {
    tx: mpsc::Sender<MessengerRequest<T>>,
    config: MessengerConfig,
}

impl<T> Clone for Messenger<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            config: self.config.clone(),
        }
    }
}

impl<T: Clone + Send + 'static> Messenger<T> {
    /// Create a messenger and spawn its monitor on the current tokio runtime
    ///
    /// `capacity` is the buffer size of each endpoint, 0 for rendezvous delivery.
    /// With `drop_on_full`, broadcasts skip endpoints whose buffer is full instead of
    /// waiting; it is ignored when `capacity` is 0.
    pub fn new(capacity: usize, drop_on_full: bool) -> Self {
        Self::spawn(MessengerConfig::new(capacity, drop_on_full))
    }

    /// Create a messenger from a config and spawn its monitor
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    pub fn spawn(config: MessengerConfig) -> Self {
        let config = config.normalized();
        debug!(?config, "Messenger::spawn: called");
        let (tx, rx) = mpsc::channel(config.channel_buffer);

        tokio::spawn(Monitor::new(config.clone(), rx).run());

        info!("Messenger spawned");
        Self { tx, config }
    }
}

impl<T> Messenger<T> {
    /// Effective configuration of this messenger
    pub fn config(&self) -> &MessengerConfig {
        &self.config
    }

    /// True once the monitor no longer accepts requests
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    /// Send a request and wait for its reply
    ///
    /// Returns `None` if the monitor is gone or dropped the request.
    async fn request<R>(&self, build: impl FnOnce(oneshot::Sender<R>) -> MessengerRequest<T>) -> Option<R> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx.send(build(reply_tx)).await.ok()?;
        reply_rx.await.ok()
    }

    /// Get a new endpoint that receives every subsequent broadcast
    ///
    /// Unless `drop_on_full` is set, a consumer that stops reading blocks
    /// broadcasts; consumers should read until `recv` returns `None`.
    pub async fn subscribe(&self) -> Result<Endpoint<T>, MessengerError> {
        debug!("Messenger::subscribe: called");
        let endpoint = self
            .request(|reply| MessengerRequest::Subscribe { reply })
            .await
            .ok_or(MessengerError::Closed)??;
        debug!(id = %endpoint.id(), "Messenger::subscribe: subscribed");
        Ok(endpoint)
    }

    /// Remove an endpoint and close it
    ///
    /// Without `drop_on_full` a broadcast may be waiting on this very endpoint, so
    /// pending messages are discarded until the monitor acknowledges the removal.
    pub async fn unsubscribe(&self, mut endpoint: Endpoint<T>) {
        let id = endpoint.id();
        debug!(%id, "Messenger::unsubscribe: called");

        let removal = self.request(|ack| MessengerRequest::Unsubscribe { id, ack });

        if self.config.drop_on_full {
            removal.await;
            debug!(%id, "Messenger::unsubscribe: removed");
            return;
        }

        tokio::pin!(removal);
        loop {
            tokio::select! {
                _ = &mut removal => {
                    debug!(%id, "Messenger::unsubscribe: removed");
                    break;
                }
                msg = endpoint.recv() => {
                    if msg.is_none() {
                        // Closed by the monitor, nothing left to unblock
                        debug!(%id, "Messenger::unsubscribe: endpoint closed");
                        break;
                    }
                    debug!(%id, "Messenger::unsubscribe: discarded pending message");
                }
            }
        }
    }

    /// Deliver a message to every current endpoint
    ///
    /// Returns once the message has been delivered to, or dropped for, each endpoint.
    /// A no-op after shutdown.
    pub async fn broadcast(&self, msg: T) {
        debug!("Messenger::broadcast: called");
        if self
            .request(|done| MessengerRequest::Broadcast { msg, done })
            .await
            .is_none()
        {
            debug!("Messenger::broadcast: messenger closed, message discarded");
        }
    }

    /// Close and remove every endpoint
    pub async fn reset(&self) {
        debug!("Messenger::reset: called");
        self.request(|ack| MessengerRequest::Reset { ack }).await;
    }

    /// Close every endpoint and stop the monitor
    ///
    /// Idempotent; later calls, including concurrent ones, return immediately.
    pub async fn shutdown(&self) {
        debug!("Messenger::shutdown: called");
        if self.request(|ack| MessengerRequest::Shutdown { ack }).await.is_none() {
            debug!("Messenger::shutdown: already shut down");
        }
    }

    /// Number of registered endpoints, 0 after shutdown
    pub async fn size(&self) -> usize {
        debug!("Messenger::size: called");
        self.request(|reply| MessengerRequest::Size { reply }).await.unwrap_or(0)
    }

    /// Buffered message count of each registered endpoint, in no particular order
    pub async fn queue_lengths(&self) -> Vec<usize> {
        debug!("Messenger::queue_lengths: called");
        self.request(|reply| MessengerRequest::QueueLengths { reply })
            .await
            .unwrap_or_default()
    }

    /// Get current messenger metrics
    pub async fn metrics(&self) -> MessengerMetrics {
        debug!("Messenger::metrics: called");
        self.request(|reply| MessengerRequest::GetMetrics { reply })
            .await
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_new_normalizes_config() {
        let messenger: Messenger<u32> = Messenger::new(0, true);
        assert_eq!(messenger.config().capacity, 0);
        assert!(!messenger.config().drop_on_full);
        messenger.shutdown().await;
    }

    #[tokio::test]
    async fn test_clones_share_registry() {
        let messenger: Messenger<u32> = Messenger::new(1, false);
        let other = messenger.clone();

        let _endpoint = messenger.subscribe().await.unwrap();
        assert_eq!(other.size().await, 1);

        other.shutdown().await;
        assert_eq!(messenger.size().await, 0);
        assert!(messenger.is_closed());
    }

    #[tokio::test]
    async fn test_subscribe_endpoints_are_distinct() {
        let messenger: Messenger<u32> = Messenger::new(1, false);

        let a = messenger.subscribe().await.unwrap();
        let b = messenger.subscribe().await.unwrap();
        assert_ne!(a.id(), b.id());

        messenger.shutdown().await;
    }

    #[tokio::test]
    async fn test_broadcast_without_subscribers() {
        let messenger: Messenger<&'static str> = Messenger::new(0, false);
        messenger.broadcast("nobody listening").await;

        let metrics = messenger.metrics().await;
        assert_eq!(metrics.broadcasts, 1);
        assert_eq!(metrics.delivered, 0);
    }

    #[tokio::test]
    async fn test_unsubscribe_unknown_endpoint_is_noop() {
        let messenger: Messenger<u32> = Messenger::new(1, false);
        let endpoint = messenger.subscribe().await.unwrap();
        let _kept = messenger.subscribe().await.unwrap();

        messenger.reset().await;
        // Already closed by reset
        messenger.unsubscribe(endpoint).await;
        assert_eq!(messenger.size().await, 0);
    }
}
