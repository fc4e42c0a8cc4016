//! Monitor task: the single loop that owns the endpoint registry

use std::collections::HashMap;

use tokio::sync::mpsc;
use tracing::{debug, info};
use uuid::Uuid;

use super::config::MessengerConfig;
use super::endpoint::{self, Delivery, EndpointSender};
use super::messages::{MessengerError, MessengerMetrics, MessengerRequest, MessengerState};

/// Processes Messenger requests one at a time
///
/// Every registry mutation happens here, so the registry needs no locking.
pub(crate) struct Monitor<T> {
    config: MessengerConfig,
    rx: mpsc::Receiver<MessengerRequest<T>>,
    registry: HashMap<Uuid, EndpointSender<T>>,
    state: MessengerState,
    metrics: MessengerMetrics,
}

impl<T: Clone + Send + 'static> Monitor<T> {
    pub(crate) fn new(config: MessengerConfig, rx: mpsc::Receiver<MessengerRequest<T>>) -> Self {
        Self {
            config: config.normalized(),
            rx,
            registry: HashMap::new(),
            state: MessengerState::Running,
            metrics: MessengerMetrics::default(),
        }
    }

    /// Run the monitor
    ///
    /// Runs until every Messenger handle is dropped, or until shutdown and the
    /// requests queued before it have been answered.
    pub(crate) async fn run(mut self) {
        info!(
            capacity = self.config.capacity,
            drop_on_full = self.config.drop_on_full,
            "Messenger started"
        );

        while let Some(req) = self.rx.recv().await {
            debug!(kind = req.kind(), state = ?self.state, "Monitor::run: request");
            match self.state {
                MessengerState::Running => self.handle(req).await,
                MessengerState::Killed => Self::reject(req),
            }
        }

        info!(subscribers = self.registry.len(), "Messenger stopped");
    }

    async fn handle(&mut self, req: MessengerRequest<T>) {
        match req {
            MessengerRequest::Subscribe { reply } => {
                let (endpoint, sender) = endpoint::channel(self.config.capacity);
                let id = endpoint.id();
                self.registry.insert(id, sender);
                if reply.send(Ok(endpoint)).is_err() {
                    // Caller gave up before the endpoint reached it
                    debug!(%id, "Subscriber went away before receiving endpoint");
                    self.registry.remove(&id);
                } else {
                    debug!(%id, subscribers = self.registry.len(), "Subscribed");
                }
            }

            MessengerRequest::Unsubscribe { id, ack } => {
                if self.registry.remove(&id).is_some() {
                    debug!(%id, subscribers = self.registry.len(), "Unsubscribed");
                }
                let _ = ack.send(());
            }

            MessengerRequest::Broadcast { msg, done } => {
                self.broadcast(msg).await;
                let _ = done.send(());
            }

            MessengerRequest::Reset { ack } => {
                let closed = self.close_all();
                self.metrics.resets += 1;
                info!(closed, "Messenger reset");
                let _ = ack.send(());
            }

            MessengerRequest::Shutdown { ack } => {
                let closed = self.close_all();
                self.state = MessengerState::Killed;
                // Refuse new requests; those already queued are answered by reject()
                self.rx.close();
                info!(closed, "Messenger shutting down");
                let _ = ack.send(());
            }

            MessengerRequest::Size { reply } => {
                self.prune_closed();
                let _ = reply.send(self.registry.len());
            }

            MessengerRequest::QueueLengths { reply } => {
                self.prune_closed();
                let _ = reply.send(self.registry.values().map(EndpointSender::queued).collect());
            }

            MessengerRequest::GetMetrics { reply } => {
                self.metrics.subscribers = self.registry.len();
                let _ = reply.send(self.metrics.clone());
            }
        }
    }

    /// Answer a request after shutdown
    fn reject(req: MessengerRequest<T>) {
        match req {
            MessengerRequest::Subscribe { reply } => {
                let _ = reply.send(Err(MessengerError::Closed));
            }
            MessengerRequest::Unsubscribe { ack, .. }
            | MessengerRequest::Reset { ack }
            | MessengerRequest::Shutdown { ack }
            | MessengerRequest::Broadcast { done: ack, .. } => {
                let _ = ack.send(());
            }
            MessengerRequest::Size { reply } => {
                let _ = reply.send(0);
            }
            MessengerRequest::QueueLengths { reply } => {
                let _ = reply.send(Vec::new());
            }
            MessengerRequest::GetMetrics { reply } => {
                let _ = reply.send(MessengerMetrics::default());
            }
        }
    }

    async fn broadcast(&mut self, msg: T) {
        self.prune_closed();
        self.metrics.broadcasts += 1;
        let drop_on_full = self.config.drop_on_full;

        let mut gone = Vec::new();
        for (id, sender) in &self.registry {
            match sender.deliver(msg.clone(), drop_on_full).await {
                Delivery::Delivered => self.metrics.delivered += 1,
                Delivery::Dropped => {
                    debug!(%id, "Endpoint full, dropping message");
                    self.metrics.dropped += 1;
                }
                Delivery::Closed => gone.push(*id),
            }
        }

        for id in gone {
            debug!(%id, "Pruning endpoint closed during broadcast");
            self.registry.remove(&id);
            self.metrics.pruned += 1;
        }
    }

    /// Close and remove every endpoint, returning how many were closed
    fn close_all(&mut self) -> usize {
        let closed = self.registry.len();
        // Dropping the senders closes the endpoints
        self.registry.clear();
        closed
    }

    /// Remove endpoints whose consumer dropped them without unsubscribing
    fn prune_closed(&mut self) {
        let before = self.registry.len();
        self.registry.retain(|_, sender| !sender.is_closed());
        let pruned = before - self.registry.len();
        if pruned > 0 {
            debug!(pruned, "Pruned abandoned endpoints");
            self.metrics.pruned += pruned as u64;
        }
    }
}
