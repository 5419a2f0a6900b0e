//! Leaderboard Store
//!
//! Per-scope mapping from nickname to the best score ever observed.
//! Submission is a max-merge: a stored best only increases, and the merge
//! for one (scope, nickname) pair is atomic under concurrent submits.
//! Scopes (e.g. `"snake:global"`) are fully isolated collections.

use std::collections::HashMap;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::store::StoreError;

/// One leaderboard row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreEntry {
    /// Player nickname.
    pub nickname: String,
    /// Best score observed for this player.
    pub value: i64,
}

/// Best-score-per-player leaderboards, one collection per scope.
#[derive(Default)]
pub struct LeaderboardStore {
    /// scope -> nickname -> best score
    scopes: RwLock<HashMap<String, HashMap<String, i64>>>,
}

impl LeaderboardStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge a score into a player's stored best: replaced only if
    /// strictly greater. Returns the resulting best, which may be the
    /// prior value if `score` did not win.
    pub async fn submit(
        &self,
        scope: &str,
        nickname: &str,
        score: i64,
    ) -> Result<i64, StoreError> {
        let mut scopes = self.scopes.write().await;
        let board = scopes.entry(scope.to_string()).or_default();
        let best = board
            .entry(nickname.to_string())
            .and_modify(|best| {
                if score > *best {
                    *best = score;
                }
            })
            .or_insert(score);
        Ok(*best)
    }

    /// The top `n` entries of a scope, descending by score. Ties break by
    /// nickname so the order is consistent within one query.
    pub async fn top_n(&self, scope: &str, n: usize) -> Result<Vec<ScoreEntry>, StoreError> {
        let scopes = self.scopes.read().await;
        let Some(board) = scopes.get(scope) else {
            return Ok(Vec::new());
        };
        let mut entries: Vec<ScoreEntry> = board
            .iter()
            .map(|(nickname, &value)| ScoreEntry {
                nickname: nickname.clone(),
                value,
            })
            .collect();
        entries.sort_by(|a, b| b.value.cmp(&a.value).then_with(|| a.nickname.cmp(&b.nickname)));
        entries.truncate(n);
        Ok(entries)
    }

    /// A player's 1-based rank in a scope: one more than the number of
    /// entries with a strictly greater score. `None` if the player has no
    /// entry, so equal scores share a rank.
    pub async fn rank_of(
        &self,
        scope: &str,
        nickname: &str,
    ) -> Result<Option<usize>, StoreError> {
        let scopes = self.scopes.read().await;
        let Some(board) = scopes.get(scope) else {
            return Ok(None);
        };
        let Some(&own) = board.get(nickname) else {
            return Ok(None);
        };
        let greater = board.values().filter(|&&value| value > own).count();
        Ok(Some(greater + 1))
    }
}
