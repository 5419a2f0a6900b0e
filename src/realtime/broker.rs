//! Topic Broker
//!
//! Fanout of outbound envelopes to topic subscribers, one
//! `tokio::sync::broadcast` channel per topic. Slow receivers that fall
//! behind skip messages (`RecvError::Lagged`); telemetry consumers only
//! care about the latest state.

use std::collections::HashMap;
use tokio::sync::{broadcast, RwLock};

use crate::realtime::protocol::ServerEvent;

/// Per-topic channel capacity.
const BROADCAST_CAPACITY: usize = 256;

/// Build the broadcast destination for a game channel,
/// e.g. `topic("snake", "presence")` -> `"topic/snake/presence"`.
pub fn topic(game: &str, channel: &str) -> String {
    format!("topic/{game}/{channel}")
}

/// Topic-keyed broadcast hub.
#[derive(Default)]
pub struct Broker {
    topics: RwLock<HashMap<String, broadcast::Sender<ServerEvent>>>,
}

impl Broker {
    /// Create an empty broker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to a topic, creating its channel on first use.
    pub async fn subscribe(&self, topic: &str) -> broadcast::Receiver<ServerEvent> {
        let mut topics = self.topics.write().await;
        topics
            .entry(topic.to_string())
            .or_insert_with(|| broadcast::channel(BROADCAST_CAPACITY).0)
            .subscribe()
    }

    /// Publish an event to every subscriber of a topic. Returns the number
    /// of receivers reached; zero when nobody is listening.
    pub async fn publish(&self, topic: &str, event: ServerEvent) -> usize {
        let topics = self.topics.read().await;
        match topics.get(topic) {
            Some(sender) => sender.send(event).unwrap_or(0),
            None => 0,
        }
    }
}
