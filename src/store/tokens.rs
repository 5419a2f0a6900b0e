//! Run Token Store
//!
//! Anti-cheat run tokens: a client asks for a token before playing and
//! presents it exactly once with a score submission. Tokens are
//! unguessable (128 bits of OS randomness, hex-encoded), bound to the
//! issuing identity, and expire after a TTL. Check-and-delete is atomic:
//! two concurrent consumers of the same token can never both succeed.

use std::collections::HashMap;
use std::time::Duration;
use rand::RngCore;
use tokio::sync::RwLock;
use tokio::time::Instant;

use crate::store::StoreError;

/// Default run token lifetime.
pub const DEFAULT_RUN_TOKEN_TTL: Duration = Duration::from_secs(600);

struct TokenRecord {
    identity: String,
    expires_at: Instant,
}

/// Issues and single-use-consumes short-lived run tokens.
pub struct RunTokenStore {
    ttl: Duration,
    tokens: RwLock<HashMap<String, TokenRecord>>,
}

impl Default for RunTokenStore {
    fn default() -> Self {
        Self::new()
    }
}

impl RunTokenStore {
    /// Create a store with the default TTL.
    pub fn new() -> Self {
        Self::with_ttl(DEFAULT_RUN_TOKEN_TTL)
    }

    /// Create a store with a custom TTL.
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            ttl,
            tokens: RwLock::new(HashMap::new()),
        }
    }

    /// Issue a fresh token bound to `identity` (or `"guest"`), with the
    /// TTL clock started.
    pub async fn start(&self, identity: Option<&str>) -> Result<String, StoreError> {
        let token = {
            let mut bytes = [0u8; 16];
            rand::thread_rng().fill_bytes(&mut bytes);
            hex::encode(bytes)
        };
        let record = TokenRecord {
            identity: identity.unwrap_or("guest").to_string(),
            expires_at: Instant::now() + self.ttl,
        };
        self.tokens.write().await.insert(token.clone(), record);
        Ok(token)
    }

    /// Atomically check that a token exists, is unexpired and unconsumed,
    /// and delete it. Returns `true` at most once per issued token;
    /// blank, unknown and expired tokens return `false`.
    pub async fn validate_and_consume(&self, token: &str) -> Result<bool, StoreError> {
        if token.trim().is_empty() {
            return Ok(false);
        }
        let mut tokens = self.tokens.write().await;
        match tokens.remove(token) {
            Some(record) => Ok(record.expires_at > Instant::now()),
            None => Ok(false),
        }
    }

    /// Read-only existence check. Returns the issuing identity without
    /// consuming the token; purely diagnostic.
    pub async fn peek(&self, token: &str) -> Result<Option<String>, StoreError> {
        let tokens = self.tokens.read().await;
        Ok(tokens
            .get(token)
            .filter(|record| record.expires_at > Instant::now())
            .map(|record| record.identity.clone()))
    }

    /// Drop expired tokens. Returns the number removed.
    pub async fn sweep(&self) -> usize {
        let now = Instant::now();
        let mut tokens = self.tokens.write().await;
        let before = tokens.len();
        tokens.retain(|_, record| record.expires_at > now);
        before - tokens.len()
    }
}
