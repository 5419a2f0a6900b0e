//! # Arcade Relay
//!
//! Realtime telemetry coordinator for casual web games: room presence,
//! best-score leaderboards, filtered chat, and single-use anti-cheat run
//! tokens gating score submission.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      ARCADE RELAY                            │
//! ├─────────────────────────────────────────────────────────────┤
//! │  store/            - Backing state (ephemeral, TTL-based)    │
//! │  ├── presence.rs   - Per-room liveness with TTL expiry       │
//! │  ├── leaderboard.rs- Per-scope best-score sets               │
//! │  └── tokens.rs     - Single-use anti-cheat run tokens        │
//! │                                                              │
//! │  realtime/         - Message handling                        │
//! │  ├── protocol.rs   - Envelope model and event unions         │
//! │  ├── broker.rs     - Topic broadcast fanout                  │
//! │  └── gateway.rs    - Presence/score/chat/move handlers       │
//! │                                                              │
//! │  network/          - Transport binding                       │
//! │  └── server.rs     - WebSocket front                         │
//! │                                                              │
//! │  flags.rs          - Runtime-togglable feature gate          │
//! │  filter.rs         - Chat profanity filter                   │
//! │  config.rs         - Environment-sourced configuration       │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Delivery Model
//!
//! The transport is fire-and-forget telemetry, not a command protocol:
//! malformed input, disabled feature flags, and anti-cheat rejections are
//! all dropped without any response to the sender. The only feedback a
//! client ever sees is the next broadcast on a topic it subscribes to.
//! The gateway itself is stateless; every mutable piece of state lives in
//! the stores, which are safe under concurrent multi-writer access.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod config;
pub mod filter;
pub mod flags;
pub mod network;
pub mod realtime;
pub mod store;

// Re-export commonly used types
pub use config::{FlagDefaults, RelayConfig};
pub use filter::ProfanityFilter;
pub use flags::FeatureGate;
pub use realtime::broker::Broker;
pub use realtime::gateway::RealtimeGateway;
pub use realtime::protocol::{ClientEvent, Envelope, ServerEvent};
pub use store::leaderboard::LeaderboardStore;
pub use store::presence::PresenceRegistry;
pub use store::tokens::RunTokenStore;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Highest score value accepted for a leaderboard submission (inclusive).
pub const MAX_SCORE: i64 = 1_000_000;

/// Maximum broadcast chat message length, applied after filtering.
pub const MAX_CHAT_LEN: usize = 300;

/// Maximum number of members included in a presence broadcast.
pub const PRESENCE_SAMPLE_LIMIT: usize = 20;

/// Number of entries included in a leaderboard broadcast.
pub const LEADERBOARD_TOP_N: usize = 10;
