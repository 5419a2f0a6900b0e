//! WebSocket Relay Server
//!
//! Async WebSocket server for realtime telemetry connections. Each
//! connection gets a random principal id, a writer task fed from an mpsc
//! channel, and an auto-subscription to the four topics of every game it
//! sends an event for. Invalid messages are dropped without a reply, in
//! line with the fire-and-forget delivery model.

use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;
use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, mpsc, RwLock};
use tokio::time::Instant;
use tokio_tungstenite::{accept_async, tungstenite::Message};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::RelayConfig;
use crate::realtime::broker::{topic, Broker};
use crate::realtime::gateway::RealtimeGateway;
use crate::realtime::protocol::{ClientEvent, ServerEvent};

/// Channels fanned back to every connection subscribed to a game.
const GAME_CHANNELS: [&str; 4] = ["presence", "leaderboard", "chat", "match"];

/// Outbound queue depth per connection.
const OUTBOUND_QUEUE: usize = 64;

/// Relay server errors.
#[derive(Debug, thiserror::Error)]
pub enum RelayServerError {
    /// Failed to bind to address.
    #[error("failed to bind: {0}")]
    BindFailed(#[from] std::io::Error),
}

/// Connected client state.
struct ConnectedClient {
    /// Transport-level identity handed to the gateway.
    principal_id: String,
    /// Connection time.
    connected_at: Instant,
}

/// The relay server.
pub struct RelayServer {
    config: RelayConfig,
    gateway: Arc<RealtimeGateway>,
    broker: Arc<Broker>,
    clients: Arc<RwLock<HashMap<SocketAddr, ConnectedClient>>>,
    shutdown_tx: broadcast::Sender<()>,
}

impl RelayServer {
    /// Create a new relay server.
    pub fn new(config: RelayConfig, gateway: Arc<RealtimeGateway>, broker: Arc<Broker>) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        Self {
            config,
            gateway,
            broker,
            clients: Arc::new(RwLock::new(HashMap::new())),
            shutdown_tx,
        }
    }

    /// Run the server until shutdown.
    pub async fn run(&self) -> Result<(), RelayServerError> {
        let listener = TcpListener::bind(&self.config.bind_addr).await?;
        info!(
            "Relay server v{} listening on {}",
            self.config.version, self.config.bind_addr
        );

        let mut shutdown_rx = self.shutdown_tx.subscribe();

        loop {
            tokio::select! {
                result = listener.accept() => {
                    match result {
                        Ok((stream, addr)) => {
                            let client_count = self.clients.read().await.len();
                            if client_count >= self.config.max_connections {
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

        Ok(())
    }

    /// Handle a new WebSocket connection.
    fn handle_connection(&self, stream: TcpStream, addr: SocketAddr) {
        let clients = self.clients.clone();
        let gateway = self.gateway.clone();
        let broker = self.broker.clone();
        let idle_timeout = self.config.idle_timeout;
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        tokio::spawn(async move {
            let ws_stream = match accept_async(stream).await {
                Ok(ws) => ws,
                Err(e) => {
                    warn!("WebSocket handshake failed for {}: {}", addr, e);
                    return;
                }
            };

            let (mut ws_sender, mut ws_receiver) = ws_stream.split();
            let (out_tx, mut out_rx) = mpsc::channel::<ServerEvent>(OUTBOUND_QUEUE);
            let principal_id = Uuid::new_v4().to_string();

            {
                let mut clients = clients.write().await;
                clients.insert(
                    addr,
                    ConnectedClient {
                        principal_id: principal_id.clone(),
                        connected_at: Instant::now(),
                    },
                );
            }

            // Writer task: everything broadcast to this connection goes
            // through one queue.
            let writer_task = tokio::spawn(async move {
                while let Some(event) = out_rx.recv().await {
                    let text = match event.to_json() {
                        Ok(t) => t,
                        Err(e) => {
                            error!("Failed to serialize broadcast: {}", e);
                            continue;
                        }
                    };
                    if ws_sender.send(Message::Text(text)).await.is_err() {
                        break;
                    }
                }
            });

            let mut subscribed_games: HashSet<String> = HashSet::new();
            let mut forward_tasks = Vec::new();

            loop {
                tokio::select! {
                    result = tokio::time::timeout(idle_timeout, ws_receiver.next()) => {
                        match result {
                            Err(_) => {
                                info!("Client {} idle, disconnecting", addr);
                                break;
                            }
                            Ok(Some(Ok(Message::Text(text)))) => {
                                let event = match ClientEvent::from_json(&text) {
                                    Ok(event) => event,
                                    Err(e) => {
                                        debug!("Invalid message from {}: {}", addr, e);
                                        continue;
                                    }
                                };
                                let Some(game) = event.game().map(str::to_string) else {
                                    debug!("Unroutable message from {}: no room.game", addr);
                                    continue;
                                };

                                if subscribed_games.insert(game.clone()) {
                                    for channel in GAME_CHANNELS {
                                        forward_tasks.push(spawn_forwarder(
                                            broker.clone(),
                                            topic(&game, channel),
                                            out_tx.clone(),
                                        ).await);
                                    }
                                }

                                if let Err(e) = gateway.handle(&game, event, Some(&principal_id)).await {
                                    // Retryable store failure; the client sees
                                    // nothing and may resubmit.
                                    warn!("Handler failed for {}: {}", addr, e);
                                }
                            }
                            Ok(Some(Ok(Message::Close(_)))) | Ok(None) => {
                                debug!("Client {} disconnected", addr);
                                break;
                            }
                            Ok(Some(Ok(_))) => {}
                            Ok(Some(Err(e))) => {
                                debug!("WebSocket error for {}: {}", addr, e);
                                break;
                            }
                        }
                    }
                    _ = shutdown_rx.recv() => {
                        break;
                    }
                }
            }

            writer_task.abort();
            for task in forward_tasks {
                task.abort();
            }

            let removed = {
                let mut clients = clients.write().await;
                clients.remove(&addr)
            };
            if let Some(client) = removed {
                debug!(
                    "Client {} ({}) cleaned up after {:?}",
                    addr,
                    client.principal_id,
                    client.connected_at.elapsed()
                );
            }
        });
    }

    /// Signal the server and all connections to shut down.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }

    /// Get active connection count.
    pub async fn connection_count(&self) -> usize {
        self.clients.read().await.len()
    }
}

/// Pipe one topic into a connection's outbound queue. Ends when the
/// connection closes; lagged receivers skip to the newest events.
async fn spawn_forwarder(
    broker: Arc<Broker>,
    topic: String,
    out_tx: mpsc::Sender<ServerEvent>,
) -> tokio::task::JoinHandle<()> {
    let mut rx = broker.subscribe(&topic).await;
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(event) => {
                    if out_tx.send(event).await.is_err() {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    debug!("Subscriber lagged on {}, skipped {}", topic, skipped);
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}
