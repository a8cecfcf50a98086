//! WebSocket Presence Server
//!
//! Clients connect to `/ws?userId=<id>`. The socket carries presence
//! updates, the matchmaking queue and its `match_found` announcements.
//! Game simulation never runs here; paired players start their match
//! locally.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, Mutex};
use tokio::time::{interval, MissedTickBehavior};
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::{accept_hdr_async, tungstenite::Message};
use tracing::{debug, error, info, instrument, warn};

use crate::network::matchmaking::{MatchmakingError, MatchmakingQueue};
use crate::network::presence::{
    ConnectionId, MemoryStatusStore, Outbound, PresenceConfig, PresenceHub, StatusStore,
};
use crate::network::protocol::{ClientMessage, ErrorCode, ServerMessage};

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address.
    pub bind_addr: SocketAddr,
    /// Maximum concurrent connections.
    pub max_connections: usize,
    /// Keepalive ping period.
    pub heartbeat_interval: Duration,
    /// Delay before a disconnected user is marked offline.
    pub offline_grace: Duration,
    /// Server version string.
    pub version: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 3000)),
            max_connections: 1000,
            heartbeat_interval: Duration::from_secs(5),
            offline_grace: Duration::from_millis(2000),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

impl ServerConfig {
    /// Load from `PONG_*` environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        fn parsed<T: std::str::FromStr>(key: &str, raw: Option<String>, default: T) -> T {
            match raw {
                Some(value) => value.trim().parse().unwrap_or_else(|_| {
                    warn!(key, value = %value, "Invalid setting, using default");
                    default
                }),
                None => default,
            }
        }

        Self {
            bind_addr: parsed("PONG_BIND_ADDR", get("PONG_BIND_ADDR"), defaults.bind_addr),
            max_connections: parsed(
                "PONG_MAX_CONNECTIONS",
                get("PONG_MAX_CONNECTIONS"),
                defaults.max_connections,
            ),
            heartbeat_interval: Duration::from_secs(parsed(
                "PONG_HEARTBEAT_SECS",
                get("PONG_HEARTBEAT_SECS"),
                defaults.heartbeat_interval.as_secs(),
            ).max(1)),
            offline_grace: Duration::from_millis(parsed(
                "PONG_OFFLINE_GRACE_MS",
                get("PONG_OFFLINE_GRACE_MS"),
                defaults.offline_grace.as_millis() as u64,
            )),
            version: defaults.version,
        }
    }
}

/// Game server errors.
#[derive(Debug, thiserror::Error)]
pub enum GameServerError {
    /// Failed to bind to address.
    #[error("Failed to bind: {0}")]
    BindFailed(#[from] std::io::Error),

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
}

/// The presence and matchmaking server.
pub struct GameServer {
    /// Server configuration.
    config: ServerConfig,
    /// Live connections.
    presence: Arc<PresenceHub>,
    /// Matchmaking queue.
    queue: Arc<Mutex<MatchmakingQueue>>,
    /// Shutdown signal.
    shutdown_tx: broadcast::Sender<()>,
}

impl GameServer {
    /// Create a server with an in-memory status store.
    pub fn new(config: ServerConfig) -> Self {
        Self::with_store(config, Arc::new(MemoryStatusStore::default()))
    }

    /// Create a server persisting statuses through `store`.
    pub fn with_store(config: ServerConfig, store: Arc<dyn StatusStore>) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        let presence = Arc::new(PresenceHub::new(
            PresenceConfig { offline_grace: config.offline_grace },
            store,
        ));
        let queue = MatchmakingQueue::with_broadcaster(presence.clone());

        Self {
            config,
            presence,
            queue: Arc::new(Mutex::new(queue)),
            shutdown_tx,
        }
    }

    /// Bind the configured address and serve until shutdown.
    #[instrument(skip(self))]
    pub async fn run(&self) -> Result<(), GameServerError> {
        let listener = TcpListener::bind(&self.config.bind_addr).await?;
        self.serve(listener).await
    }

    /// Serve an already bound listener until shutdown.
    pub async fn serve(&self, listener: TcpListener) -> Result<(), GameServerError> {
        info!("Presence server listening on {}", listener.local_addr()?);

        let presence = self.presence.clone();
        let period = self.config.heartbeat_interval;
        let heartbeat_handle = tokio::spawn(async move {
            Self::run_heartbeat_loop(presence, period).await;
        });

        let mut shutdown_rx = self.shutdown_tx.subscribe();

        loop {
            tokio::select! {
                result = listener.accept() => {
                    match result {
                        Ok((stream, addr)) => {
                            if self.presence.connection_count() >= self.config.max_connections {
                                warn!("Connection limit reached, rejecting {}", addr);
                                continue;
                            }
                            debug!("New connection from {}", addr);
                            self.handle_connection(stream, addr);
                        }
                        Err(e) => {
                            error!("Accept error: {}", e);
                        }
                    }
                }
                _ = shutdown_rx.recv() => {
                    info!("Shutdown signal received");
                    break;
                }
            }
        }

        heartbeat_handle.abort();
        Ok(())
    }

    /// Handle a new WebSocket connection.
    fn handle_connection(&self, stream: TcpStream, addr: SocketAddr) {
        let presence = self.presence.clone();
        let queue = self.queue.clone();
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        tokio::spawn(async move {
            let mut user_id = None;
            let handshake = accept_hdr_async(stream, |req: &Request, response: Response| {
                user_id = user_id_from_query(req.uri().query());
                Ok::<_, ErrorResponse>(response)
            })
            .await;

            let mut ws_stream = match handshake {
                Ok(ws) => ws,
                Err(e) => {
                    error!("WebSocket handshake failed for {}: {}", addr, e);
                    return;
                }
            };

            let Some(user_id) = user_id else {
                debug!("Connection from {} without userId, closing", addr);
                let _ = ws_stream.close(None).await;
                return;
            };

            let (connection, mut outbound) = presence.connect(&user_id);
            let (mut ws_sender, mut ws_receiver) = ws_stream.split();

            let sender_task = tokio::spawn(async move {
                while let Some(frame) = outbound.recv().await {
                    let message = match frame {
                        Outbound::Ping => Message::Ping(Vec::new()),
                        Outbound::Message(msg) => match msg.to_json() {
                            Ok(text) => Message::Text(text),
                            Err(e) => {
                                error!("Failed to serialize message: {}", e);
                                continue;
                            }
                        },
                    };
                    if ws_sender.send(message).await.is_err() {
                        break;
                    }
                }
            });

            loop {
                tokio::select! {
                    msg = ws_receiver.next() => {
                        match msg {
                            Some(Ok(Message::Text(text))) => {
                                match ClientMessage::from_json(&text) {
                                    Ok(client_msg) => {
                                        Self::handle_client_message(&user_id, client_msg, &presence, &queue).await;
                                    }
                                    Err(e) => {
                                        debug!("Invalid message from {}: {}", user_id, e);
                                        presence.send_to(
                                            &user_id,
                                            ServerMessage::error(ErrorCode::InvalidInput, "Invalid message format"),
                                        );
                                    }
                                }
                            }
                            Some(Ok(Message::Pong(_))) => {
                                debug!("Pong from {}", user_id);
                            }
                            Some(Ok(Message::Close(_))) | None => {
                                break;
                            }
                            Some(Err(e)) => {
                                warn!("WebSocket error for {}: {}", user_id, e);
                                break;
                            }
                            _ => {}
                        }
                    }
                    _ = shutdown_rx.recv() => {
                        presence.send_to(&user_id, ServerMessage::Shutdown {
                            reason: "Server shutting down".to_string(),
                        });
                        break;
                    }
                }
            }

            Self::release_connection(&user_id, connection, &presence, &queue).await;
            sender_task.abort();
        });
    }

    /// Drop a closed socket. The user leaves the queue only when this was
    /// their current connection; a newer socket keeps its queue entry.
    async fn release_connection(
        user_id: &str,
        connection: ConnectionId,
        presence: &Arc<PresenceHub>,
        queue: &Arc<Mutex<MatchmakingQueue>>,
    ) -> bool {
        let current = presence.disconnect(user_id, connection);
        if current {
            queue.lock().await.leave(user_id);
        }
        current
    }

    /// Handle a client message.
    async fn handle_client_message(
        user_id: &str,
        msg: ClientMessage,
        presence: &Arc<PresenceHub>,
        queue: &Arc<Mutex<MatchmakingQueue>>,
    ) {
        match msg {
            ClientMessage::JoinQueue { user_id: requested } => {
                if requested != user_id {
                    presence.send_to(user_id, ServerMessage::error(ErrorCode::WrongUser, "userId mismatch"));
                    return;
                }
                let mut queue = queue.lock().await;
                match queue.join(user_id) {
                    // The pairing was broadcast to everyone, including us
                    Ok(Some(_)) => {}
                    Ok(None) => {
                        presence.send_to(user_id, ServerMessage::Queued { queue: queue.waiting() });
                    }
                    Err(e @ MatchmakingError::AlreadyQueued(_)) => {
                        presence.send_to(user_id, ServerMessage::error(ErrorCode::AlreadyQueued, e.to_string()));
                    }
                    Err(e @ MatchmakingError::EmptyPlayerId) => {
                        presence.send_to(user_id, ServerMessage::error(ErrorCode::InvalidInput, e.to_string()));
                    }
                }
            }
            ClientMessage::LeaveQueue { user_id: requested } => {
                if requested == user_id {
                    queue.lock().await.leave(user_id);
                }
            }
            ClientMessage::UserStatus { user_id: requested, status, is_refresh } => {
                if requested != user_id {
                    presence.send_to(user_id, ServerMessage::error(ErrorCode::WrongUser, "userId mismatch"));
                    return;
                }
                presence.announce_status(user_id, status, is_refresh);
            }
            ClientMessage::Ping { timestamp } => {
                presence.send_to(user_id, ServerMessage::Pong {
                    timestamp,
                    server_time: chrono::Utc::now().timestamp_millis().max(0) as u64,
                });
            }
        }
    }

    /// Ping connections and prune dead ones on a fixed period.
    async fn run_heartbeat_loop(presence: Arc<PresenceHub>, period: Duration) {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;
            let pruned = presence.heartbeat();
            if !pruned.is_empty() {
                debug!(count = pruned.len(), "Heartbeat pruned connections");
            }
        }
    }

    /// Shutdown the server.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }

    /// Presence hub shared with the connections.
    pub fn presence(&self) -> &Arc<PresenceHub> {
        &self.presence
    }

    /// Get active connection count.
    pub fn connection_count(&self) -> usize {
        self.presence.connection_count()
    }

    /// Get matchmaking queue size.
    pub async fn queue_size(&self) -> usize {
        self.queue.lock().await.len()
    }
}

/// Extract `userId` from a request query string.
fn user_id_from_query(query: Option<&str>) -> Option<String> {
    query?
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(key, _)| *key == "userId")
        .map(|(_, value)| value.to_string())
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use tokio_tungstenite::connect_async;

    #[test]
    fn test_server_config_default() {
        let config = ServerConfig::default();
        assert_eq!(config.bind_addr.port(), 3000);
        assert_eq!(config.max_connections, 1000);
        assert_eq!(config.heartbeat_interval, Duration::from_secs(5));
        assert_eq!(config.offline_grace, Duration::from_millis(2000));
    }

    #[test]
    fn test_config_lookup_with_fallbacks() {
        let vars: BTreeMap<&str, &str> = [
            ("PONG_BIND_ADDR", "127.0.0.1:9000"),
            ("PONG_MAX_CONNECTIONS", "not-a-number"),
            ("PONG_OFFLINE_GRACE_MS", "500"),
        ]
        .into_iter()
        .collect();
        let config = ServerConfig::from_lookup(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.bind_addr, "127.0.0.1:9000".parse().unwrap());
        assert_eq!(config.max_connections, 1000);
        assert_eq!(config.heartbeat_interval, Duration::from_secs(5));
        assert_eq!(config.offline_grace, Duration::from_millis(500));
    }

    #[test]
    fn test_user_id_from_query() {
        assert_eq!(user_id_from_query(Some("userId=12")), Some("12".to_string()));
        assert_eq!(user_id_from_query(Some("x=1&userId=ab")), Some("ab".to_string()));
        assert_eq!(user_id_from_query(Some("userId=")), None);
        assert_eq!(user_id_from_query(Some("user=3")), None);
        assert_eq!(user_id_from_query(None), None);
    }

    #[tokio::test]
    async fn test_server_creation() {
        let server = GameServer::new(ServerConfig::default());
        assert_eq!(server.connection_count(), 0);
        assert_eq!(server.queue_size().await, 0);
        server.shutdown();
    }

    #[tokio::test]
    async fn test_stale_socket_keeps_queue_entry() {
        let server = GameServer::new(ServerConfig::default());
        let presence = server.presence().clone();

        let (first, _rx1) = presence.connect("u");
        let (second, _rx2) = presence.connect("u");
        GameServer::handle_client_message(
            "u",
            ClientMessage::JoinQueue { user_id: "u".into() },
            &presence,
            &server.queue,
        )
        .await;
        assert_eq!(server.queue_size().await, 1);

        // Old socket closes after the reconnect
        assert!(!GameServer::release_connection("u", first, &presence, &server.queue).await);
        assert_eq!(server.queue_size().await, 1);
        assert!(presence.is_connected("u"));

        assert!(GameServer::release_connection("u", second, &presence, &server.queue).await);
        assert_eq!(server.queue_size().await, 0);
    }

    async fn next_of_type(
        ws: &mut tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<TcpStream>>,
        kind: &str,
    ) -> ServerMessage {
        loop {
            let frame = tokio::time::timeout(Duration::from_secs(2), ws.next())
                .await
                .expect("timed out")
                .expect("stream ended")
                .expect("socket error");
            if let Message::Text(text) = frame {
                if text.contains(&format!("\"type\":\"{kind}\"")) {
                    return ServerMessage::from_json(&text).unwrap();
                }
            }
        }
    }

    #[tokio::test]
    async fn test_queue_pairs_over_websocket() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = Arc::new(GameServer::new(ServerConfig::default()));
        let serving = server.clone();
        tokio::spawn(async move { serving.serve(listener).await });

        let (mut alice, _) = connect_async(format!("ws://{addr}/ws?userId=1")).await.unwrap();
        let (mut bob, _) = connect_async(format!("ws://{addr}/ws?userId=2")).await.unwrap();

        let join = |id: &str| ClientMessage::JoinQueue { user_id: id.into() }.to_json().unwrap();
        alice.send(Message::Text(join("1"))).await.unwrap();
        assert_eq!(
            next_of_type(&mut alice, "queued").await,
            ServerMessage::Queued { queue: vec!["1".into()] }
        );

        alice.send(Message::Text(join("1"))).await.unwrap();
        match next_of_type(&mut alice, "error").await {
            ServerMessage::Error(e) => assert_eq!(e.code, ErrorCode::AlreadyQueued),
            other => panic!("Wrong message type: {other:?}"),
        }

        bob.send(Message::Text(join("2"))).await.unwrap();
        for ws in [&mut alice, &mut bob] {
            match next_of_type(ws, "match_found").await {
                ServerMessage::MatchFound { pairing } => {
                    assert_eq!(pairing.match_id, "1-2");
                    assert_eq!(pairing.player1, "1");
                }
                other => panic!("Wrong message type: {other:?}"),
            }
        }

        assert_eq!(server.queue_size().await, 0);
        server.shutdown();
    }
}
