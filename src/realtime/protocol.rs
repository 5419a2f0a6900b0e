//! Protocol Messages
//!
//! Wire format for the realtime relay. Every message is an [`Envelope`]
//! carrying room, user and payload; the payload kind is a serde tag on
//! the [`ClientEvent`] / [`ServerEvent`] unions, resolved once at the
//! transport boundary. Field names follow the web client's camelCase.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::store::leaderboard::ScoreEntry;

// =============================================================================
// ENVELOPE
// =============================================================================

fn generated_event_id() -> String {
    Uuid::new_v4().to_string()
}

fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

fn default_visibility() -> String {
    "public".to_string()
}

/// Common wrapper for every realtime message. `event_id` and `ts` are
/// generated when the sender omits them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope<T> {
    /// Unique event identifier.
    #[serde(default = "generated_event_id")]
    pub event_id: String,
    /// Milliseconds since the Unix epoch.
    #[serde(default = "now_millis")]
    pub ts: i64,
    /// Room the event belongs to.
    #[serde(default)]
    pub room: Option<Room>,
    /// Sending user.
    #[serde(default)]
    pub user: Option<User>,
    /// Event payload; kind must match the union tag.
    #[serde(default)]
    pub payload: Option<T>,
}

impl<T> Envelope<T> {
    /// Build an outbound envelope answering `source`: fresh id and
    /// timestamp, room and user echoed back.
    pub fn reply_to<U>(source: &Envelope<U>, payload: T) -> Self {
        Self {
            event_id: generated_event_id(),
            ts: now_millis(),
            room: source.room.clone(),
            user: source.user.clone(),
            payload: Some(payload),
        }
    }
}

/// A logical channel grouping presence, chat and leaderboard traffic for
/// one game instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Room {
    /// Room identifier, e.g. `"snake:global"`.
    #[serde(default)]
    pub id: Option<String>,
    /// Game namespace, e.g. `"snake"`.
    #[serde(default)]
    pub game: Option<String>,
    /// Room visibility.
    #[serde(default = "default_visibility")]
    pub visibility: String,
}

/// Sending user as presented by the transport.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Stable user identifier, if authenticated.
    #[serde(default)]
    pub id: Option<String>,
    /// User role.
    #[serde(default)]
    pub role: Role,
    /// Display name, 1-32 characters.
    #[serde(default)]
    pub nickname: Option<String>,
    /// Subscription tier.
    #[serde(default)]
    pub subscription: Subscription,
}

/// User role.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Unauthenticated visitor.
    #[default]
    Guest,
    /// Registered user.
    User,
    /// Moderator.
    Mod,
    /// Administrator.
    Admin,
}

impl Role {
    /// Wire representation of the role.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Guest => "guest",
            Role::User => "user",
            Role::Mod => "mod",
            Role::Admin => "admin",
        }
    }
}

/// Subscription tier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Subscription {
    /// No paid plan.
    #[default]
    Free,
    /// Monthly plan.
    Monthly,
    /// Yearly plan.
    Yearly,
    /// Lifetime plan.
    Lifetime,
}

// =============================================================================
// CLIENT -> RELAY PAYLOADS
// =============================================================================

/// Presence lifecycle action.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PresenceStatus {
    /// Member entered the room.
    Join,
    /// Member left the room.
    Leave,
    /// Member is still here. Unknown statuses land here too.
    #[default]
    #[serde(other)]
    Heartbeat,
}

/// Inbound presence payload.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PresenceIn {
    /// Lifecycle action; heartbeat when absent.
    #[serde(default)]
    pub status: PresenceStatus,
}

/// Inbound score submission.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ScoreIn {
    /// Reported score.
    pub value: i64,
    /// Run token issued before play; required when anti-cheat is on.
    #[serde(default)]
    pub run_id: Option<String>,
    /// Opaque client proof blob, unused by the relay.
    #[serde(default)]
    pub proof: Option<String>,
}

/// Inbound chat payload.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ChatIn {
    /// Raw message text.
    #[serde(default)]
    pub text: String,
}

/// Inbound move payload. Relayed best-effort, never rule-checked.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct MoveIn {
    /// Origin square.
    #[serde(default)]
    pub from: Option<String>,
    /// Destination square.
    #[serde(default)]
    pub to: Option<String>,
    /// Promotion piece, if any.
    #[serde(default)]
    pub promo: Option<String>,
    /// Move in game notation.
    #[serde(default)]
    pub notation: Option<String>,
}

/// Inbound events, tagged by payload kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientEvent {
    /// Presence join/leave/heartbeat.
    Presence(Envelope<PresenceIn>),
    /// Score submission.
    Score(Envelope<ScoreIn>),
    /// Chat message.
    Chat(Envelope<ChatIn>),
    /// Game move relay.
    Move(Envelope<MoveIn>),
}

impl ClientEvent {
    /// Game namespace this event targets, from the envelope room.
    pub fn game(&self) -> Option<&str> {
        let room = match self {
            ClientEvent::Presence(env) => env.room.as_ref(),
            ClientEvent::Score(env) => env.room.as_ref(),
            ClientEvent::Chat(env) => env.room.as_ref(),
            ClientEvent::Move(env) => env.room.as_ref(),
        };
        room.and_then(|r| r.game.as_deref())
    }

    /// Deserialize from JSON string.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }

    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

// =============================================================================
// RELAY -> CLIENT PAYLOADS
// =============================================================================

/// A room member as published in presence broadcasts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicUser {
    /// Member identifier (`nickname|principal`).
    pub id: String,
    /// Display name, derived from the member identifier.
    pub nickname: String,
}

/// Outbound presence snapshot.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PresenceOut {
    /// Live member count; never less than `users.len()`.
    pub count: usize,
    /// Sampled live members, acting member always included.
    pub users: Vec<PublicUser>,
}

/// Outbound leaderboard snapshot.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardOut {
    /// Top entries, descending by score.
    pub top: Vec<ScoreEntry>,
    /// Submitter's 1-based rank in the scope.
    pub your_rank: Option<usize>,
}

/// Outbound chat message.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ChatOut {
    /// Sender nickname.
    pub nickname: String,
    /// Filtered, length-capped text.
    pub text: String,
}

/// Outbound move echo.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct MoveOut {
    /// Origin square.
    pub from: Option<String>,
    /// Destination square.
    pub to: Option<String>,
    /// Promotion piece, if any.
    pub promo: Option<String>,
    /// Move in game notation.
    pub notation: Option<String>,
    /// Sender role, annotated by the relay.
    pub side: String,
}

/// Outbound broadcasts, tagged by payload kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    /// Presence snapshot for a room.
    Presence(Envelope<PresenceOut>),
    /// Leaderboard snapshot after an accepted submission.
    Leaderboard(Envelope<LeaderboardOut>),
    /// Filtered chat message.
    Chat(Envelope<ChatOut>),
    /// Relayed move.
    Move(Envelope<MoveOut>),
}

impl ServerEvent {
    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON string.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_event_json_roundtrip() {
        let json = r#"{
            "type": "score",
            "eventId": "e-1",
            "ts": 1700000000000,
            "room": {"id": "snake:global", "game": "snake"},
            "user": {"nickname": "ada", "role": "user"},
            "payload": {"value": 420, "runId": "abc123"}
        }"#;
        let event = ClientEvent::from_json(json).unwrap();
        let ClientEvent::Score(env) = &event else {
            panic!("wrong event kind");
        };
        assert_eq!(env.event_id, "e-1");
        assert_eq!(env.user.as_ref().unwrap().role, Role::User);
        let payload = env.payload.as_ref().unwrap();
        assert_eq!(payload.value, 420);
        assert_eq!(payload.run_id.as_deref(), Some("abc123"));

        let round = ClientEvent::from_json(&event.to_json().unwrap()).unwrap();
        assert!(matches!(round, ClientEvent::Score(_)));
    }

    #[test]
    fn test_missing_metadata_is_generated() {
        let json = r#"{"type": "chat", "payload": {"text": "hi"}}"#;
        let ClientEvent::Chat(env) = ClientEvent::from_json(json).unwrap() else {
            panic!("wrong event kind");
        };
        assert!(!env.event_id.is_empty());
        assert!(env.ts > 0);
        assert!(env.room.is_none());
        assert!(env.user.is_none());
    }

    #[test]
    fn test_unknown_presence_status_is_heartbeat() {
        let json = r#"{"type": "presence", "payload": {"status": "lurking"}}"#;
        let ClientEvent::Presence(env) = ClientEvent::from_json(json).unwrap() else {
            panic!("wrong event kind");
        };
        assert_eq!(env.payload.unwrap().status, PresenceStatus::Heartbeat);
    }

    #[test]
    fn test_missing_payload_is_none() {
        let json = r#"{"type": "presence", "room": {"game": "snake"}}"#;
        let ClientEvent::Presence(env) = ClientEvent::from_json(json).unwrap() else {
            panic!("wrong event kind");
        };
        assert!(env.payload.is_none());
    }

    #[test]
    fn test_event_game_from_room() {
        let json = r#"{"type": "move", "room": {"game": "checkers"}, "payload": {}}"#;
        let event = ClientEvent::from_json(json).unwrap();
        assert_eq!(event.game(), Some("checkers"));

        let json = r#"{"type": "move", "payload": {}}"#;
        let event = ClientEvent::from_json(json).unwrap();
        assert_eq!(event.game(), None);
    }

    #[test]
    fn test_server_event_wire_shape() {
        let env = Envelope {
            event_id: "e-2".to_string(),
            ts: 1,
            room: None,
            user: None,
            payload: Some(LeaderboardOut {
                top: vec![ScoreEntry {
                    nickname: "ada".to_string(),
                    value: 420,
                }],
                your_rank: Some(1),
            }),
        };
        let json = ServerEvent::Leaderboard(env).to_json().unwrap();
        assert!(json.contains(r#""type":"leaderboard""#));
        assert!(json.contains(r#""yourRank":1"#));
        assert!(json.contains(r#""eventId":"e-2""#));

        let ServerEvent::Leaderboard(round) = ServerEvent::from_json(&json).unwrap() else {
            panic!("wrong event kind");
        };
        let payload = round.payload.unwrap();
        assert_eq!(payload.your_rank, Some(1));
        assert_eq!(payload.top[0].nickname, "ada");
    }

    #[test]
    fn test_reply_to_echoes_room_and_user() {
        let json = r#"{
            "type": "chat",
            "room": {"id": "snake:eu-1", "game": "snake"},
            "user": {"nickname": "ada"},
            "payload": {"text": "hi"}
        }"#;
        let ClientEvent::Chat(env) = ClientEvent::from_json(json).unwrap() else {
            panic!("wrong event kind");
        };
        let reply = Envelope::reply_to(
            &env,
            ChatOut {
                nickname: "ada".to_string(),
                text: "hi".to_string(),
            },
        );
        assert_eq!(reply.room.as_ref().unwrap().id.as_deref(), Some("snake:eu-1"));
        assert_eq!(
            reply.user.as_ref().unwrap().nickname.as_deref(),
            Some("ada")
        );
        assert_ne!(reply.event_id, env.event_id);
    }

    #[test]
    fn test_role_defaults_to_guest() {
        let json = r#"{"type": "chat", "user": {"nickname": "ada"}, "payload": {"text": "x"}}"#;
        let ClientEvent::Chat(env) = ClientEvent::from_json(json).unwrap() else {
            panic!("wrong event kind");
        };
        let user = env.user.unwrap();
        assert_eq!(user.role, Role::Guest);
        assert_eq!(user.subscription, Subscription::Free);
    }
}
