//! Presence Hub
//!
//! Tracks one live connection per user and fans messages out to all of
//! them. A dropped connection does not make its user offline right away:
//! the offline transition waits for a grace period and is cancelled by a
//! reconnect, so page reloads do not flicker the friend list.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::network::matchmaking::{BroadcastReport, Broadcaster};
use crate::network::protocol::{PresenceStatus, ServerMessage};
use crate::records::RecordError;

/// Frames queued for a connection's writer task.
#[derive(Debug, Clone, PartialEq)]
pub enum Outbound {
    /// JSON message
    Message(ServerMessage),
    /// Keepalive ping
    Ping,
}

/// Identifies one socket of a user.
pub type ConnectionId = u64;

/// Persistent user status (the `users.status` column).
pub trait StatusStore: Send + Sync {
    /// Last stored status.
    fn load(&self, user_id: &str) -> Option<PresenceStatus>;
    /// Store a status.
    fn save(&self, user_id: &str, status: PresenceStatus) -> Result<(), RecordError>;
}

/// In-memory status store.
#[derive(Debug, Default)]
pub struct MemoryStatusStore {
    statuses: Mutex<BTreeMap<String, PresenceStatus>>,
    writes: AtomicU64,
}

impl MemoryStatusStore {
    /// Number of writes performed.
    pub fn writes(&self) -> u64 {
        self.writes.load(Ordering::Relaxed)
    }
}

impl StatusStore for MemoryStatusStore {
    fn load(&self, user_id: &str) -> Option<PresenceStatus> {
        let statuses = self.statuses.lock().unwrap_or_else(PoisonError::into_inner);
        statuses.get(user_id).copied()
    }

    fn save(&self, user_id: &str, status: PresenceStatus) -> Result<(), RecordError> {
        let mut statuses = self.statuses.lock().unwrap_or_else(PoisonError::into_inner);
        statuses.insert(user_id.to_string(), status);
        self.writes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

/// Presence timing.
#[derive(Debug, Clone)]
pub struct PresenceConfig {
    /// Delay before a disconnected user is marked offline.
    pub offline_grace: Duration,
}

impl Default for PresenceConfig {
    fn default() -> Self {
        Self {
            offline_grace: Duration::from_millis(2000),
        }
    }
}

struct Connection {
    id: ConnectionId,
    sender: mpsc::UnboundedSender<Outbound>,
}

/// Live connections keyed by user id.
pub struct PresenceHub {
    connections: RwLock<BTreeMap<String, Connection>>,
    next_id: AtomicU64,
    store: Arc<dyn StatusStore>,
    config: PresenceConfig,
}

impl PresenceHub {
    /// Create an empty hub.
    pub fn new(config: PresenceConfig, store: Arc<dyn StatusStore>) -> Self {
        Self {
            connections: RwLock::new(BTreeMap::new()),
            next_id: AtomicU64::new(1),
            store,
            config,
        }
    }

    /// Register a connection for `user_id`, replacing any older one, and
    /// announce the user as online.
    pub fn connect(&self, user_id: &str) -> (ConnectionId, mpsc::UnboundedReceiver<Outbound>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);

        let replaced = self
            .connections
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(user_id.to_string(), Connection { id, sender })
            .is_some();
        info!(user_id, connection = id, replaced, "Connection opened");

        self.update_status(user_id, PresenceStatus::Online);
        self.broadcast(&ServerMessage::UserStatus {
            user_id: user_id.to_string(),
            status: PresenceStatus::Online,
        });

        (id, receiver)
    }

    /// Drop a closed connection and schedule the offline check.
    ///
    /// Ignored when the user has since reconnected on a newer socket.
    /// Returns whether `connection` was the user's current one.
    pub fn disconnect(self: &Arc<Self>, user_id: &str, connection: ConnectionId) -> bool {
        let removed = {
            let mut connections = self.connections.write().unwrap_or_else(PoisonError::into_inner);
            match connections.get(user_id) {
                Some(c) if c.id == connection => connections.remove(user_id).is_some(),
                _ => false,
            }
        };

        if removed {
            info!(user_id, connection, "Connection closed");
            self.schedule_offline(user_id.to_string());
        } else {
            debug!(user_id, connection, "Stale connection closed");
        }
        removed
    }

    /// Apply a status announced by a client. Refreshes are stored silently.
    pub fn announce_status(&self, user_id: &str, status: PresenceStatus, is_refresh: bool) {
        self.update_status(user_id, status);
        if is_refresh {
            debug!(user_id, "Status refresh, not broadcast");
            return;
        }
        self.broadcast(&ServerMessage::UserStatus {
            user_id: user_id.to_string(),
            status,
        });
    }

    /// Send a message to one user.
    pub fn send_to(&self, user_id: &str, message: ServerMessage) -> bool {
        let connections = self.connections.read().unwrap_or_else(PoisonError::into_inner);
        connections
            .get(user_id)
            .is_some_and(|c| c.sender.send(Outbound::Message(message)).is_ok())
    }

    /// Ping every connection and prune the ones that are gone.
    ///
    /// Returns the pruned users; each gets the grace-period offline check.
    pub fn heartbeat(self: &Arc<Self>) -> Vec<String> {
        let pruned: Vec<String> = {
            let mut connections = self.connections.write().unwrap_or_else(PoisonError::into_inner);
            let dead: Vec<String> = connections
                .iter()
                .filter(|(_, c)| c.sender.send(Outbound::Ping).is_err())
                .map(|(user, _)| user.clone())
                .collect();
            for user in &dead {
                connections.remove(user);
            }
            dead
        };

        for user in &pruned {
            debug!(user_id = %user, "Pruned dead connection");
            self.schedule_offline(user.clone());
        }
        pruned
    }

    /// Whether `user_id` has a live connection.
    pub fn is_connected(&self, user_id: &str) -> bool {
        let connections = self.connections.read().unwrap_or_else(PoisonError::into_inner);
        connections.contains_key(user_id)
    }

    /// Number of connected users.
    pub fn connection_count(&self) -> usize {
        self.connections.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Stored status of a user.
    pub fn status(&self, user_id: &str) -> Option<PresenceStatus> {
        self.store.load(user_id)
    }

    fn schedule_offline(self: &Arc<Self>, user_id: String) {
        let hub = Arc::clone(self);
        let grace = self.config.offline_grace;

        tokio::spawn(async move {
            tokio::time::sleep(grace).await;
            if hub.is_connected(&user_id) {
                debug!(user_id = %user_id, "Reconnected within grace period");
                return;
            }
            info!(user_id = %user_id, "User offline");
            hub.update_status(&user_id, PresenceStatus::Offline);
            hub.broadcast(&ServerMessage::UserStatus {
                user_id,
                status: PresenceStatus::Offline,
            });
        });
    }

    /// Persist only actual changes.
    fn update_status(&self, user_id: &str, status: PresenceStatus) {
        if self.store.load(user_id) == Some(status) {
            return;
        }
        if let Err(e) = self.store.save(user_id, status) {
            warn!(user_id, error = %e, "Failed to store status");
        }
    }
}

impl Broadcaster for PresenceHub {
    fn broadcast(&self, message: &ServerMessage) -> BroadcastReport {
        let connections = self.connections.read().unwrap_or_else(PoisonError::into_inner);
        let mut report = BroadcastReport::default();

        for (user, connection) in connections.iter() {
            match connection.sender.send(Outbound::Message(message.clone())) {
                Ok(()) => report.delivered += 1,
                Err(_) => {
                    warn!(user_id = %user, "Broadcast send failed");
                    report.failed += 1;
                }
            }
        }
        report
    }
}
