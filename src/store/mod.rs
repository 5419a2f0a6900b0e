//! Backing Stores
//!
//! All mutable relay state lives here: presence liveness, best-score
//! leaderboards, and single-use run tokens. Each store is safe under
//! concurrent multi-writer access; its single-key critical sections are
//! atomic, so multiple gateway instances could share one backing service
//! without extra coordination. These implementations are in-memory with
//! TTL deadlines; a remote key-value backend with sorted-set and expiry
//! support can be swapped in behind the same signatures.

pub mod leaderboard;
pub mod presence;
pub mod tokens;

pub use leaderboard::{LeaderboardStore, ScoreEntry};
pub use presence::PresenceRegistry;
pub use tokens::RunTokenStore;

use thiserror::Error;

/// Backing store failure, retryable by the caller.
///
/// The in-memory stores never produce this, but it is part of every
/// leaderboard and token signature: losing a submitted score or falsely
/// accepting a run token is a correctness issue, so those failures must
/// reach the gateway's caller. Presence is advisory and converts failures
/// into no-ops internally instead.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backing store rejected or failed the operation.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}
