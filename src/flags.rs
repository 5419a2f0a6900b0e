//! Feature Gate
//!
//! Runtime-togglable boolean flags. Defaults come from the environment
//! ([`FlagDefaults`]); an in-memory overlay takes precedence and lives for
//! the process lifetime only. Every realtime handler consults the gate
//! before touching any store or broadcasting anything.

use std::collections::{BTreeMap, HashMap};
use thiserror::Error;
use tokio::sync::RwLock;

use crate::config::FlagDefaults;

/// Rejected toggle of a flag that is not in the known set.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown feature flag: {0}")]
pub struct UnknownFlag(pub String);

/// Runtime feature flag resolver.
pub struct FeatureGate {
    defaults: HashMap<String, bool>,
    overrides: RwLock<HashMap<String, bool>>,
}

impl FeatureGate {
    /// Create a gate from flag defaults.
    pub fn new(defaults: &FlagDefaults) -> Self {
        let defaults = HashMap::from([
            ("realtime_enabled".to_string(), defaults.realtime_enabled),
            ("chat_enabled".to_string(), defaults.chat_enabled),
            ("anti_cheat_enabled".to_string(), defaults.anti_cheat_enabled),
            ("snake_enabled".to_string(), defaults.snake_enabled),
            ("checkers_enabled".to_string(), defaults.checkers_enabled),
            (
                "snake_leaderboard_enabled".to_string(),
                defaults.snake_leaderboard_enabled,
            ),
        ]);
        Self {
            defaults,
            overrides: RwLock::new(HashMap::new()),
        }
    }

    /// Resolve a flag: overlay first, then default, then `false` for
    /// anything unrecognized.
    pub async fn is_enabled(&self, flag: &str) -> bool {
        if let Some(&overridden) = self.overrides.read().await.get(flag) {
            return overridden;
        }
        self.defaults.get(flag).copied().unwrap_or(false)
    }

    /// Set a runtime override, effective immediately for all subsequent
    /// checks. Unknown flags are rejected at this boundary.
    pub async fn toggle(&self, flag: &str, enabled: bool) -> Result<(), UnknownFlag> {
        if !self.defaults.contains_key(flag) {
            return Err(UnknownFlag(flag.to_string()));
        }
        self.overrides
            .write()
            .await
            .insert(flag.to_string(), enabled);
        Ok(())
    }

    /// Every known flag with its effective value.
    pub async fn evaluate_all(&self) -> BTreeMap<String, bool> {
        let overrides = self.overrides.read().await;
        self.defaults
            .iter()
            .map(|(name, &default)| {
                let effective = overrides.get(name).copied().unwrap_or(default);
                (name.clone(), effective)
            })
            .collect()
    }

    /// The set of valid flag names.
    pub fn known_flags(&self) -> Vec<String> {
        let mut names: Vec<String> = self.defaults.keys().cloned().collect();
        names.sort();
        names
    }
}
