//! Relay Configuration
//!
//! All tunables come from the environment with sensible defaults, so the
//! binary runs with zero configuration in development.

use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

/// Environment-sourced defaults for the feature gate.
///
/// These are only the *defaults*: the [`crate::FeatureGate`] overlay can
/// flip any of them at runtime for the lifetime of the process.
#[derive(Debug, Clone)]
pub struct FlagDefaults {
    /// Master switch for all realtime handlers.
    pub realtime_enabled: bool,
    /// Chat broadcasting.
    pub chat_enabled: bool,
    /// Require a valid run token for score submission.
    pub anti_cheat_enabled: bool,
    /// Snake game namespace.
    pub snake_enabled: bool,
    /// Checkers game namespace.
    pub checkers_enabled: bool,
    /// Snake leaderboard surface (consumed by the HTTP collaborator).
    pub snake_leaderboard_enabled: bool,
}

impl Default for FlagDefaults {
    fn default() -> Self {
        Self {
            realtime_enabled: true,
            chat_enabled: true,
            anti_cheat_enabled: false,
            snake_enabled: true,
            checkers_enabled: true,
            snake_leaderboard_enabled: true,
        }
    }
}

impl FlagDefaults {
    /// Read flag defaults from `FEATURES_*` environment variables.
    pub fn from_env() -> Self {
        let base = Self::default();
        Self {
            realtime_enabled: env_bool("FEATURES_REALTIME_ENABLED", base.realtime_enabled),
            chat_enabled: env_bool("FEATURES_CHAT_ENABLED", base.chat_enabled),
            anti_cheat_enabled: env_bool("FEATURES_ANTI_CHEAT_ENABLED", base.anti_cheat_enabled),
            snake_enabled: env_bool("FEATURES_SNAKE_ENABLED", base.snake_enabled),
            checkers_enabled: env_bool("FEATURES_CHECKERS_ENABLED", base.checkers_enabled),
            snake_leaderboard_enabled: env_bool(
                "FEATURES_SNAKE_LEADERBOARD_ENABLED",
                base.snake_leaderboard_enabled,
            ),
        }
    }
}

/// Relay server configuration.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Bind address.
    pub bind_addr: SocketAddr,
    /// Maximum concurrent connections.
    pub max_connections: usize,
    /// Disconnect a client after this much inactivity.
    pub idle_timeout: Duration,
    /// Presence liveness window.
    pub presence_ttl: Duration,
    /// Run token lifetime.
    pub run_token_ttl: Duration,
    /// Interval between store sweep passes.
    pub sweep_interval: Duration,
    /// Feature flag defaults.
    pub flags: FlagDefaults,
    /// Server version string.
    pub version: String,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8080".parse().unwrap(),
            max_connections: 1000,
            idle_timeout: Duration::from_secs(300),
            presence_ttl: Duration::from_secs(45),
            run_token_ttl: Duration::from_secs(600),
            sweep_interval: Duration::from_secs(60),
            flags: FlagDefaults::default(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

impl RelayConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let base = Self::default();
        Self {
            bind_addr: env_parse("RELAY_BIND_ADDR", base.bind_addr),
            max_connections: env_parse("RELAY_MAX_CONNECTIONS", base.max_connections),
            idle_timeout: env_secs("RELAY_IDLE_TIMEOUT_SECS", base.idle_timeout),
            presence_ttl: env_secs("PRESENCE_TTL_SECS", base.presence_ttl),
            run_token_ttl: env_secs("RUN_TOKEN_TTL_SECS", base.run_token_ttl),
            sweep_interval: env_secs("RELAY_SWEEP_INTERVAL_SECS", base.sweep_interval),
            flags: FlagDefaults::from_env(),
            version: base.version,
        }
    }
}

fn env_parse<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_secs(key: &str, default: Duration) -> Duration {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .map(Duration::from_secs)
        .unwrap_or(default)
}

fn env_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .map(|v| v == "true" || v == "1")
        .unwrap_or(default)
}
