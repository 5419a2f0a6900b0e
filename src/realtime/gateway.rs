//! Realtime Gateway
//!
//! Stateless per-game message handlers. Each inbound event is validated,
//! enriched from the stores, and broadcast to the matching topic. Every
//! rejection (malformed payload, disabled flag, failed anti-cheat check)
//! is a silent drop: no broadcast, nothing surfaced to the sender, and a
//! policy rejection is indistinguishable from a validation one. Backing
//! store failures on the score path are the single exception; they
//! propagate to the transport as retryable errors.

use std::sync::Arc;
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use crate::filter::ProfanityFilter;
use crate::flags::FeatureGate;
use crate::realtime::broker::{topic, Broker};
use crate::realtime::protocol::{
    ChatIn, ChatOut, ClientEvent, Envelope, LeaderboardOut, MoveIn, MoveOut, PresenceIn,
    PresenceOut, PresenceStatus, PublicUser, Room, ScoreIn, ServerEvent,
};
use crate::store::leaderboard::ScoreEntry;
use crate::store::{LeaderboardStore, PresenceRegistry, RunTokenStore, StoreError};
use crate::{LEADERBOARD_TOP_N, MAX_CHAT_LEN, MAX_SCORE, PRESENCE_SAMPLE_LIMIT};

/// Gateway errors. Only store failures on correctness-critical paths
/// surface; everything else is dropped silently.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Backing store failure, retryable.
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// The realtime message handling layer. Stateless and cheap to share;
/// all mutable state lives in the injected stores.
pub struct RealtimeGateway {
    flags: Arc<FeatureGate>,
    presence: Arc<PresenceRegistry>,
    leaderboard: Arc<LeaderboardStore>,
    tokens: Arc<RunTokenStore>,
    broker: Arc<Broker>,
    filter: ProfanityFilter,
}

impl RealtimeGateway {
    /// Create a gateway over the given stores.
    pub fn new(
        flags: Arc<FeatureGate>,
        presence: Arc<PresenceRegistry>,
        leaderboard: Arc<LeaderboardStore>,
        tokens: Arc<RunTokenStore>,
        broker: Arc<Broker>,
    ) -> Self {
        Self {
            flags,
            presence,
            leaderboard,
            tokens,
            broker,
            filter: ProfanityFilter::new(),
        }
    }

    /// Replace the default profanity dictionary.
    pub fn with_filter(mut self, filter: ProfanityFilter) -> Self {
        self.filter = filter;
        self
    }

    /// Dispatch one inbound event for a game namespace. `principal` is
    /// the transport-level identity of the sender, if any.
    pub async fn handle(
        &self,
        game: &str,
        event: ClientEvent,
        principal: Option<&str>,
    ) -> Result<(), GatewayError> {
        match event {
            ClientEvent::Presence(env) => self.handle_presence(game, env, principal).await,
            ClientEvent::Score(env) => self.handle_score(game, env).await,
            ClientEvent::Chat(env) => self.handle_chat(game, env).await,
            ClientEvent::Move(env) => self.handle_move(game, env).await,
        }
    }

    /// Master gate: realtime switched on AND the game namespace enabled.
    async fn game_enabled(&self, game: &str) -> bool {
        self.flags.is_enabled("realtime_enabled").await
            && self.flags.is_enabled(&format!("{game}_enabled")).await
    }

    async fn handle_presence(
        &self,
        game: &str,
        env: Envelope<PresenceIn>,
        principal: Option<&str>,
    ) -> Result<(), GatewayError> {
        if !self.game_enabled(game).await {
            debug!(game, "presence dropped: gate disabled");
            return Ok(());
        }
        let nickname = match env.user.as_ref().and_then(|u| u.nickname.as_deref()) {
            Some(n) if !nickname_valid(n) => {
                debug!(game, "presence dropped: invalid nickname");
                return Ok(());
            }
            Some(n) => n.to_string(),
            None => "guest".to_string(),
        };
        let principal_id = principal
            .map(str::to_string)
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let member_id = format!("{nickname}|{principal_id}");
        let room_id = room_or_default(&env.room, game);

        let status = env.payload.as_ref().map(|p| p.status).unwrap_or_default();
        match status {
            PresenceStatus::Join => self.presence.join(&room_id, &member_id).await,
            PresenceStatus::Leave => self.presence.leave(&room_id, &member_id).await,
            PresenceStatus::Heartbeat => self.presence.heartbeat(&room_id, &member_id).await,
        }

        let mut users: Vec<PublicUser> = self
            .presence
            .sample(&room_id, PRESENCE_SAMPLE_LIMIT)
            .await
            .into_iter()
            .map(|id| PublicUser {
                nickname: nickname_of(&id),
                id,
            })
            .collect();
        // The registry may not reflect this member yet (or the member just
        // left); the acting member is always part of their own snapshot.
        if !users.iter().any(|u| u.nickname == nickname) {
            users.push(PublicUser {
                id: member_id,
                nickname,
            });
        }
        let count = self.presence.count(&room_id).await.max(users.len());

        let out = PresenceOut { count, users };
        self.broker
            .publish(
                &topic(game, "presence"),
                ServerEvent::Presence(Envelope::reply_to(&env, out)),
            )
            .await;
        Ok(())
    }

    async fn handle_score(&self, game: &str, env: Envelope<ScoreIn>) -> Result<(), GatewayError> {
        if !self.game_enabled(game).await {
            debug!(game, "score dropped: gate disabled");
            return Ok(());
        }
        let Some(nickname) = env.user.as_ref().and_then(|u| u.nickname.clone()) else {
            debug!(game, "score dropped: no nickname");
            return Ok(());
        };
        if !nickname_valid(&nickname) {
            debug!(game, "score dropped: invalid nickname");
            return Ok(());
        }
        let Some(payload) = env.payload.clone() else {
            debug!(game, "score dropped: no payload");
            return Ok(());
        };

        let value = payload.value.max(0);
        if value > MAX_SCORE {
            debug!(game, value, "score dropped: over limit");
            return Ok(());
        }
        if self.flags.is_enabled("anti_cheat_enabled").await {
            let run_id = payload.run_id.as_deref().unwrap_or("");
            if !self.tokens.validate_and_consume(run_id).await? {
                debug!(game, "score dropped: run token rejected");
                return Ok(());
            }
        }

        let scope = room_or_default(&env.room, game);
        self.leaderboard.submit(&scope, &nickname, value).await?;

        let mut top = self.leaderboard.top_n(&scope, LEADERBOARD_TOP_N).await?;
        // Read-back may lag the write; the submitter always sees themself.
        if !top.iter().any(|entry| entry.nickname == nickname) {
            top.insert(
                0,
                ScoreEntry {
                    nickname: nickname.clone(),
                    value,
                },
            );
        }
        let your_rank = self.leaderboard.rank_of(&scope, &nickname).await?;

        let out = LeaderboardOut { top, your_rank };
        self.broker
            .publish(
                &topic(game, "leaderboard"),
                ServerEvent::Leaderboard(Envelope::reply_to(&env, out)),
            )
            .await;
        Ok(())
    }

    async fn handle_chat(&self, game: &str, env: Envelope<ChatIn>) -> Result<(), GatewayError> {
        if !self.game_enabled(game).await || !self.flags.is_enabled("chat_enabled").await {
            debug!(game, "chat dropped: gate disabled");
            return Ok(());
        }
        let Some(nickname) = env.user.as_ref().and_then(|u| u.nickname.clone()) else {
            debug!(game, "chat dropped: no nickname");
            return Ok(());
        };
        if !nickname_valid(&nickname) {
            debug!(game, "chat dropped: invalid nickname");
            return Ok(());
        }
        let Some(payload) = env.payload.as_ref() else {
            debug!(game, "chat dropped: no payload");
            return Ok(());
        };

        let text = payload.text.trim();
        if text.is_empty() {
            return Ok(());
        }
        let mut text = self.filter.filter(text);
        if text.chars().count() > MAX_CHAT_LEN {
            text = text.chars().take(MAX_CHAT_LEN).collect();
        }

        let out = ChatOut { nickname, text };
        self.broker
            .publish(
                &topic(game, "chat"),
                ServerEvent::Chat(Envelope::reply_to(&env, out)),
            )
            .await;
        Ok(())
    }

    async fn handle_move(&self, game: &str, env: Envelope<MoveIn>) -> Result<(), GatewayError> {
        if !self.game_enabled(game).await {
            debug!(game, "move dropped: gate disabled");
            return Ok(());
        }
        let Some(user) = env.user.as_ref() else {
            debug!(game, "move dropped: no user");
            return Ok(());
        };
        if !user.nickname.as_deref().is_some_and(nickname_valid) {
            debug!(game, "move dropped: missing or invalid nickname");
            return Ok(());
        }
        let Some(payload) = env.payload.clone() else {
            debug!(game, "move dropped: no payload");
            return Ok(());
        };

        // Best-effort relay: no legality checks, only role annotation.
        let out = MoveOut {
            from: payload.from,
            to: payload.to,
            promo: payload.promo,
            notation: payload.notation,
            side: user.role.as_str().to_string(),
        };
        self.broker
            .publish(
                &topic(game, "match"),
                ServerEvent::Move(Envelope::reply_to(&env, out)),
            )
            .await;
        Ok(())
    }
}

/// A usable display name: not blank and at most 32 characters.
fn nickname_valid(nickname: &str) -> bool {
    !nickname.trim().is_empty() && nickname.chars().count() <= 32
}

fn nickname_of(member_id: &str) -> String {
    member_id.split('|').next().unwrap_or_default().to_string()
}

fn room_or_default(room: &Option<Room>, game: &str) -> String {
    room.as_ref()
        .and_then(|r| r.id.clone())
        .unwrap_or_else(|| format!("{game}:global"))
}
