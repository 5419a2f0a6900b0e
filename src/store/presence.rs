//! Presence Registry
//!
//! Tracks per-room, per-member liveness with TTL expiry. An entry is
//! created or refreshed on join/heartbeat and removed on explicit leave;
//! everything else is handled by the deadline. Reads never report a
//! member whose TTL has lapsed, even before a sweep pass runs.
//!
//! Presence is advisory, not authoritative: no operation here can fail
//! from the caller's point of view. A lost write degrades the published
//! count until the next heartbeat, nothing more.

use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;

/// Default liveness window for a presence entry.
pub const DEFAULT_PRESENCE_TTL: Duration = Duration::from_secs(45);

/// Per-room member liveness with TTL expiry.
pub struct PresenceRegistry {
    ttl: Duration,
    /// room id -> member id -> liveness deadline
    rooms: RwLock<HashMap<String, HashMap<String, Instant>>>,
}

impl Default for PresenceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl PresenceRegistry {
    /// Create a registry with the default TTL.
    pub fn new() -> Self {
        Self::with_ttl(DEFAULT_PRESENCE_TTL)
    }

    /// Create a registry with a custom TTL.
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            ttl,
            rooms: RwLock::new(HashMap::new()),
        }
    }

    /// Mark a member live in a room. Idempotent; same as a heartbeat.
    pub async fn join(&self, room: &str, member: &str) {
        self.heartbeat(room, member).await;
    }

    /// Refresh a member's liveness, rearming the full TTL window.
    pub async fn heartbeat(&self, room: &str, member: &str) {
        let deadline = Instant::now() + self.ttl;
        let mut rooms = self.rooms.write().await;
        rooms
            .entry(room.to_string())
            .or_default()
            .insert(member.to_string(), deadline);
    }

    /// Remove a member immediately, regardless of remaining TTL.
    pub async fn leave(&self, room: &str, member: &str) {
        let mut rooms = self.rooms.write().await;
        if let Some(members) = rooms.get_mut(room) {
            members.remove(member);
            if members.is_empty() {
                rooms.remove(room);
            }
        }
    }

    /// Number of currently-live members in a room.
    pub async fn count(&self, room: &str) -> usize {
        let now = Instant::now();
        let rooms = self.rooms.read().await;
        rooms
            .get(room)
            .map(|members| members.values().filter(|&&deadline| deadline > now).count())
            .unwrap_or(0)
    }

    /// Up to `limit` live member identifiers. Order is unspecified.
    pub async fn sample(&self, room: &str, limit: usize) -> Vec<String> {
        let now = Instant::now();
        let rooms = self.rooms.read().await;
        rooms
            .get(room)
            .map(|members| {
                members
                    .iter()
                    .filter(|(_, &deadline)| deadline > now)
                    .take(limit)
                    .map(|(member, _)| member.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Drop lapsed entries and empty rooms. Returns the number of entries
    /// removed. Reads already expire lazily; the sweep only bounds memory.
    pub async fn sweep(&self) -> usize {
        let now = Instant::now();
        let mut rooms = self.rooms.write().await;
        let mut removed = 0;
        rooms.retain(|_, members| {
            let before = members.len();
            members.retain(|_, &mut deadline| deadline > now);
            removed += before - members.len();
            !members.is_empty()
        });
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::advance;

    #[tokio::test]
    async fn test_join_then_count() {
        let registry = PresenceRegistry::new();
        registry.join("snake:global", "ada|p1").await;
        assert!(registry.count("snake:global").await >= 1);
    }

    #[tokio::test]
    async fn test_leave_removes_immediately() {
        let registry = PresenceRegistry::new();
        registry.join("snake:global", "ada|p1").await;
        registry.leave("snake:global", "ada|p1").await;
        assert_eq!(registry.count("snake:global").await, 0);
    }

    #[tokio::test]
    async fn test_join_is_idempotent() {
        let registry = PresenceRegistry::new();
        registry.join("snake:global", "ada|p1").await;
        registry.join("snake:global", "ada|p1").await;
        assert_eq!(registry.count("snake:global").await, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ttl_lapse_excludes_member() {
        let registry = PresenceRegistry::new();
        registry.join("snake:global", "ada|p1").await;
        advance(DEFAULT_PRESENCE_TTL).await;
        assert_eq!(registry.count("snake:global").await, 0);
        assert!(registry.sample("snake:global", 20).await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_heartbeat_rearms_ttl() {
        let registry = PresenceRegistry::new();
        registry.join("snake:global", "ada|p1").await;
        advance(Duration::from_secs(30)).await;
        registry.heartbeat("snake:global", "ada|p1").await;
        advance(Duration::from_secs(30)).await;
        // 60s since join, but only 30s since the last heartbeat
        assert_eq!(registry.count("snake:global").await, 1);
    }

    #[tokio::test]
    async fn test_sample_respects_limit_and_membership() {
        let registry = PresenceRegistry::new();
        for i in 0..5 {
            registry
                .join("snake:global", &format!("player{i}|p{i}"))
                .await;
        }
        let sampled = registry.sample("snake:global", 3).await;
        assert_eq!(sampled.len(), 3);
        for member in &sampled {
            assert!(member.starts_with("player"));
        }
        let all = registry.sample("snake:global", 20).await;
        assert_eq!(all.len(), 5);
    }

    #[tokio::test]
    async fn test_rooms_are_isolated() {
        let registry = PresenceRegistry::new();
        registry.join("snake:global", "ada|p1").await;
        assert_eq!(registry.count("checkers:global").await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweep_removes_lapsed_entries() {
        let registry = PresenceRegistry::new();
        registry.join("snake:global", "ada|p1").await;
        registry.join("snake:global", "bob|p2").await;
        advance(Duration::from_secs(30)).await;
        registry.heartbeat("snake:global", "bob|p2").await;
        advance(Duration::from_secs(20)).await;
        // ada lapsed at 45s, bob is live until 75s
        assert_eq!(registry.sweep().await, 1);
        assert_eq!(registry.count("snake:global").await, 1);
    }
}
