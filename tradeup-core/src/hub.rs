//! Connection registry and local fan-out.
//!
//! The [`Hub`] is an actor: it alone owns the set of live connections and
//! their subscriptions, and every change goes through its command queue.
//! Delivery to a connection is a non-blocking push onto that connection's
//! bounded outbound queue. A connection whose queue is full is removed, so
//! one slow client never holds up the others.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, error, info, warn};
use tradeup_sdk::objects::ws::{WsCloseCode, WsServerMessage};
use tradeup_sdk::objects::{TradeupId, UserId};
use uuid::Uuid;

use crate::config::HubConfig;
use crate::events::DEFAULT_CHANNEL_BUFFER;
use crate::snapshot::{Snapshot, SnapshotCache, SnapshotTarget};
use crate::store::TradeupStore;

pub type ConnectionId = Uuid;

/// A message queued for one connection. Shared between every recipient of
/// the same delivery.
pub type Outbound = Arc<WsServerMessage>;
pub type OutboundReceiver = mpsc::Receiver<Outbound>;

/// What a connection currently watches. Mutually exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Subscription {
    #[default]
    None,
    All,
    Tradeup(TradeupId),
}

impl Subscription {
    fn target(self) -> Option<SnapshotTarget> {
        match self {
            Subscription::None => None,
            Subscription::All => Some(SnapshotTarget::AllOpen),
            Subscription::Tradeup(id) => Some(SnapshotTarget::Tradeup(id)),
        }
    }
}

/// Who a message goes to.
#[derive(Debug, Clone)]
pub enum Recipients {
    /// Connections subscribed to the open list.
    AllSubscribers,
    /// Connections subscribed to one tradeup.
    TradeupSubscribers(TradeupId),
    /// Every connection of a user, whatever it is subscribed to.
    User(UserId),
}

#[derive(Debug, Error)]
pub enum HubError {
    #[error("hub is not running")]
    Stopped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HubStats {
    pub connections: usize,
    pub watching_all: usize,
    pub watching_tradeup: usize,
}

enum HubCommand {
    Register {
        id: ConnectionId,
        user: UserId,
        outbound: mpsc::Sender<Outbound>,
    },
    Unregister {
        id: ConnectionId,
    },
    Subscribe {
        id: ConnectionId,
        subscription: Subscription,
    },
    /// Initial state fetched for a subscription. Dropped if the connection
    /// has moved on to another subscription since.
    Synced {
        id: ConnectionId,
        subscription: Subscription,
        message: Outbound,
    },
    Deliver {
        recipients: Recipients,
        message: Outbound,
    },
    Targets {
        reply: oneshot::Sender<HashSet<SnapshotTarget>>,
    },
    Stats {
        reply: oneshot::Sender<HubStats>,
    },
}

struct Connection {
    user: UserId,
    subscription: Subscription,
    outbound: mpsc::Sender<Outbound>,
}

/// Cloneable handle for talking to a running [`Hub`].
#[derive(Clone)]
pub struct HubHandle {
    tx: mpsc::Sender<HubCommand>,
    outbound_queue: usize,
}

impl HubHandle {
    /// Register a new connection for `user`. The returned receiver yields
    /// the connection's outbound messages and closes when the hub drops it.
    pub async fn register(&self, user: UserId) -> Result<(ConnectionId, OutboundReceiver), HubError> {
        let id = Uuid::new_v4();
        let (outbound, rx) = mpsc::channel(self.outbound_queue);
        self.send(HubCommand::Register { id, user, outbound }).await?;
        Ok((id, rx))
    }

    pub async fn unregister(&self, id: ConnectionId) -> Result<(), HubError> {
        self.send(HubCommand::Unregister { id }).await
    }

    /// Replace the connection's subscription and push it the current state
    /// of what it now watches, or `unsync` for [`Subscription::None`].
    pub async fn subscribe(&self, id: ConnectionId, subscription: Subscription) -> Result<(), HubError> {
        self.send(HubCommand::Subscribe { id, subscription }).await
    }

    pub async fn deliver(&self, recipients: Recipients, message: WsServerMessage) -> Result<(), HubError> {
        self.send(HubCommand::Deliver {
            recipients,
            message: Arc::new(message),
        })
        .await
    }

    /// Targets that at least one local connection is subscribed to.
    pub async fn targets(&self) -> Result<HashSet<SnapshotTarget>, HubError> {
        let (reply, rx) = oneshot::channel();
        self.send(HubCommand::Targets { reply }).await?;
        rx.await.map_err(|_| HubError::Stopped)
    }

    pub async fn stats(&self) -> Result<HubStats, HubError> {
        let (reply, rx) = oneshot::channel();
        self.send(HubCommand::Stats { reply }).await?;
        rx.await.map_err(|_| HubError::Stopped)
    }

    async fn send(&self, command: HubCommand) -> Result<(), HubError> {
        self.tx.send(command).await.map_err(|_| HubError::Stopped)
    }
}

pub struct Hub {
    store: Arc<dyn TradeupStore>,
    snapshots: Arc<SnapshotCache>,
    commands: mpsc::Receiver<HubCommand>,
    /// Used by sync tasks to report back without keeping the hub alive.
    weak_tx: mpsc::WeakSender<HubCommand>,
    connections: HashMap<ConnectionId, Connection>,
}

impl Hub {
    pub fn new(
        store: Arc<dyn TradeupStore>,
        snapshots: Arc<SnapshotCache>,
        config: &HubConfig,
    ) -> (Self, HubHandle) {
        let (tx, commands) = mpsc::channel(DEFAULT_CHANNEL_BUFFER);
        let hub = Self {
            store,
            snapshots,
            commands,
            weak_tx: tx.downgrade(),
            connections: HashMap::new(),
        };
        let handle = HubHandle {
            tx,
            outbound_queue: config.outbound_queue.max(1),
        };
        (hub, handle)
    }

    /// Run the hub until shutdown is signaled or every handle is dropped.
    ///
    /// Dropping the hub closes every outbound queue, which ends the
    /// connections' writer loops.
    pub async fn run(mut self, mut shutdown_rx: watch::Receiver<bool>) {
        info!("Hub started");

        loop {
            tokio::select! {
                biased;

                _ = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        info!("Hub received shutdown signal");
                        break;
                    }
                }

                command = self.commands.recv() => match command {
                    Some(command) => self.handle(command),
                    None => {
                        info!("Hub command channel closed");
                        break;
                    }
                },
            }
        }

        let open = self.connections.len();
        self.connections.clear();
        info!(connections = open, "Hub shutdown complete");
    }

    fn handle(&mut self, command: HubCommand) {
        match command {
            HubCommand::Register { id, user, outbound } => {
                debug!(connection_id = %id, user = %user, "Connection registered");
                self.connections.insert(
                    id,
                    Connection {
                        user,
                        subscription: Subscription::None,
                        outbound,
                    },
                );
            }
            HubCommand::Unregister { id } => {
                if self.connections.remove(&id).is_some() {
                    debug!(connection_id = %id, "Connection unregistered");
                }
            }
            HubCommand::Subscribe { id, subscription } => self.subscribe(id, subscription),
            HubCommand::Synced {
                id,
                subscription,
                message,
            } => {
                let current = self.connections.get(&id).map(|c| c.subscription);
                if current == Some(subscription) {
                    self.push(id, message);
                }
            }
            HubCommand::Deliver { recipients, message } => self.deliver(&recipients, message),
            HubCommand::Targets { reply } => {
                let targets = self
                    .connections
                    .values()
                    .filter_map(|c| c.subscription.target())
                    .collect();
                let _ = reply.send(targets);
            }
            HubCommand::Stats { reply } => {
                let mut stats = HubStats {
                    connections: self.connections.len(),
                    ..Default::default()
                };
                for connection in self.connections.values() {
                    match connection.subscription {
                        Subscription::All => stats.watching_all += 1,
                        Subscription::Tradeup(_) => stats.watching_tradeup += 1,
                        Subscription::None => {}
                    }
                }
                let _ = reply.send(stats);
            }
        }
    }

    fn subscribe(&mut self, id: ConnectionId, subscription: Subscription) {
        let Some(connection) = self.connections.get_mut(&id) else {
            return;
        };
        connection.subscription = subscription;
        debug!(connection_id = %id, subscription = ?subscription, "Subscription changed");

        match subscription {
            Subscription::None => {
                self.push(id, Arc::new(WsServerMessage::Unsync));
            }
            Subscription::All | Subscription::Tradeup(_) => self.spawn_sync(id, subscription),
        }
    }

    /// Fetch the current state for a new subscription off the hub loop and
    /// hand it back as [`HubCommand::Synced`].
    fn spawn_sync(&self, id: ConnectionId, subscription: Subscription) {
        let store = Arc::clone(&self.store);
        let snapshots = Arc::clone(&self.snapshots);
        let weak_tx = self.weak_tx.clone();

        tokio::spawn(async move {
            let message = match initial_state(store.as_ref(), &snapshots, subscription).await {
                Ok(message) => message,
                Err(e) => {
                    error!(connection_id = %id, error = %e, "Failed to load subscription state");
                    WsServerMessage::Error {
                        code: WsCloseCode::INTERNAL_ERROR,
                        reason: "failed to load tradeups".to_string(),
                    }
                }
            };
            if let Some(tx) = weak_tx.upgrade() {
                let _ = tx
                    .send(HubCommand::Synced {
                        id,
                        subscription,
                        message: Arc::new(message),
                    })
                    .await;
            }
        });
    }

    fn deliver(&mut self, recipients: &Recipients, message: Outbound) {
        let ids: Vec<ConnectionId> = self
            .connections
            .iter()
            .filter(|(_, c)| match recipients {
                Recipients::AllSubscribers => c.subscription == Subscription::All,
                Recipients::TradeupSubscribers(tradeup_id) => {
                    c.subscription == Subscription::Tradeup(*tradeup_id)
                }
                Recipients::User(user) => &c.user == user,
            })
            .map(|(id, _)| *id)
            .collect();

        for id in ids {
            self.push(id, Arc::clone(&message));
        }
    }

    /// Queue `message` for one connection, dropping the connection if its
    /// queue is full or its writer is gone.
    fn push(&mut self, id: ConnectionId, message: Outbound) {
        let Some(connection) = self.connections.get(&id) else {
            return;
        };
        match connection.outbound.try_send(message) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                warn!(connection_id = %id, user = %connection.user, "Outbound queue full, dropping slow connection");
                self.connections.remove(&id);
            }
            Err(TrySendError::Closed(_)) => {
                debug!(connection_id = %id, "Outbound queue closed, removing connection");
                self.connections.remove(&id);
            }
        }
    }
}

async fn initial_state(
    store: &dyn TradeupStore,
    snapshots: &SnapshotCache,
    subscription: Subscription,
) -> Result<WsServerMessage, crate::store::StoreError> {
    let ticket = snapshots.ticket();
    match subscription {
        Subscription::None => Ok(WsServerMessage::Unsync),
        Subscription::All => {
            let pools: Vec<_> = store
                .open_tradeups()
                .await?
                .into_iter()
                .map(Into::into)
                .collect();
            snapshots.seed(SnapshotTarget::AllOpen, Snapshot::AllOpen(pools.clone()), ticket);
            Ok(WsServerMessage::SyncState { pools })
        }
        Subscription::Tradeup(id) => match store.tradeup(id).await? {
            Some(record) => {
                let pool: tradeup_sdk::objects::Tradeup = record.into();
                snapshots.seed(SnapshotTarget::Tradeup(id), Snapshot::Tradeup(pool.clone()), ticket);
                Ok(WsServerMessage::SyncPool { pool })
            }
            None => Ok(WsServerMessage::Error {
                code: WsCloseCode::TRADEUP_NOT_FOUND,
                reason: format!("tradeup {id} not found"),
            }),
        },
    }
}
