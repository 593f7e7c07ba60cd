//! Payloads exchanged with the homeserver.
//!
//! Every container field in [`SyncBatch`] defaults to empty so that a
//! server omitting `rooms`, `invite` or `join` (which it does whenever there
//! is nothing to report) still decodes. Event fields are decoded leniently:
//! `null` reads as the default, and content that is not shaped like a
//! message reads as empty content. One malformed event must not make the
//! whole batch undecodable, or the same batch would be served forever.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

use crate::{EventId, RoomId, SyncToken, UserId, WireError};

/// Event kind of a room message.
pub const ROOM_MESSAGE: &str = "m.room.message";

/// Message subtype of a plain-text message.
pub const MSGTYPE_TEXT: &str = "m.text";

/// Decode a JSON response body.
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, WireError> {
    serde_json::from_slice(bytes).map_err(WireError::Decode)
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn lenient_content<'de, D>(deserializer: D) -> Result<MessageContent, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value
        .and_then(|v| serde_json::from_value(v).ok())
        .unwrap_or_default())
}

/// Response of the identity ("who am I") endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WhoamiResponse {
    /// The authenticated account.
    pub user_id: UserId,
    /// Device the access token belongs to, when the server reports one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,
}

/// Response of the send endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendResponse {
    /// Identifier the server assigned to the new event.
    pub event_id: EventId,
}

/// Response of the join endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinResponse {
    /// The joined room.
    pub room_id: RoomId,
}

/// Content of a room message, both received and sent.
#[derive(Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MessageContent {
    /// Message subtype (`m.text`, `m.notice`, `m.image`, ...).
    #[serde(default, deserialize_with = "null_as_default")]
    pub msgtype: String,
    /// Plain-text body.
    #[serde(default, deserialize_with = "null_as_default")]
    pub body: String,
}

impl MessageContent {
    /// Plain-text content.
    pub fn text(body: impl Into<String>) -> Self {
        Self {
            msgtype: MSGTYPE_TEXT.to_string(),
            body: body.into(),
        }
    }

    /// Encode as a request body.
    pub fn to_value(&self) -> Result<serde_json::Value, WireError> {
        serde_json::to_value(self).map_err(WireError::Encode)
    }
}

impl std::fmt::Debug for MessageContent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageContent")
            .field("msgtype", &self.msgtype)
            .field("body", &format!("[{} chars]", self.body.chars().count()))
            .finish()
    }
}

/// One entry of a room timeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelineEvent {
    /// Event identifier. Absent for some non-message events.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_id: Option<EventId>,
    /// Event kind (`m.room.message`, `m.room.member`, ...).
    #[serde(rename = "type", default, deserialize_with = "null_as_default")]
    pub kind: String,
    /// Account that sent the event.
    #[serde(default, deserialize_with = "null_as_default")]
    pub sender: UserId,
    /// Event content; only meaningful for room messages.
    #[serde(default, deserialize_with = "lenient_content")]
    pub content: MessageContent,
}

impl TimelineEvent {
    /// Build a text message event.
    pub fn text(event_id: impl Into<String>, sender: UserId, body: impl Into<String>) -> Self {
        Self {
            event_id: Some(EventId::new(event_id)),
            kind: ROOM_MESSAGE.to_string(),
            sender,
            content: MessageContent::text(body),
        }
    }

    /// The event identifier, treating an empty string as absent.
    pub fn id(&self) -> Option<&EventId> {
        self.event_id.as_ref().filter(|id| !id.is_empty())
    }

    /// Whether this is a room message with the text subtype.
    pub fn is_text_message(&self) -> bool {
        self.kind == ROOM_MESSAGE && self.content.msgtype == MSGTYPE_TEXT
    }

    /// The message body (empty for non-message events).
    pub fn body(&self) -> &str {
        &self.content.body
    }
}

/// Timeline section of a joined room.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Timeline {
    /// Events in server order.
    #[serde(default, deserialize_with = "null_as_default")]
    pub events: Vec<TimelineEvent>,
    /// Whether the server truncated the timeline to the filter limit.
    #[serde(default, deserialize_with = "null_as_default")]
    pub limited: bool,
}

/// A room the account has joined.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct JoinedRoom {
    /// New timeline events since the previous token.
    #[serde(default, deserialize_with = "null_as_default")]
    pub timeline: Timeline,
}

/// A room the account has been invited to.
///
/// The invite state is not used, only the key in [`Rooms::invite`] matters.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct InvitedRoom {}

/// Per-room sections of a sync batch.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Rooms {
    /// Pending invitations.
    #[serde(default, deserialize_with = "null_as_default")]
    pub invite: BTreeMap<RoomId, InvitedRoom>,
    /// Joined rooms with new timeline data.
    #[serde(default, deserialize_with = "null_as_default")]
    pub join: BTreeMap<RoomId, JoinedRoom>,
}

/// One `/sync` response.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SyncBatch {
    /// Token to present as `since` on the next poll.
    pub next_batch: SyncToken,
    /// Room sections.
    #[serde(default, deserialize_with = "null_as_default")]
    pub rooms: Rooms,
}

impl SyncBatch {
    /// An empty batch carrying only a token.
    pub fn empty(next_batch: impl Into<String>) -> Self {
        Self {
            next_batch: SyncToken::new(next_batch),
            rooms: Rooms::default(),
        }
    }

    /// Decode a `/sync` response body.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, WireError> {
        decode(bytes)
    }

    /// Add an invitation (builder style, for tests and mocks).
    pub fn with_invite(mut self, room: RoomId) -> Self {
        self.rooms.invite.insert(room, InvitedRoom::default());
        self
    }

    /// Append timeline events to a joined room (builder style).
    pub fn with_events(mut self, room: RoomId, events: Vec<TimelineEvent>) -> Self {
        self.rooms
            .join
            .entry(room)
            .or_default()
            .timeline
            .events
            .extend(events);
        self
    }

    /// Rooms the account is invited to, in identifier order.
    pub fn invited_rooms(&self) -> impl Iterator<Item = &RoomId> {
        self.rooms.invite.keys()
    }

    /// Timeline of a joined room, if the room appears in this batch.
    pub fn timeline(&self, room: &RoomId) -> Option<&[TimelineEvent]> {
        self.rooms
            .join
            .get(room)
            .map(|joined| joined.timeline.events.as_slice())
    }

    /// Total number of timeline events across all joined rooms.
    pub fn event_count(&self) -> usize {
        self.rooms
            .join
            .values()
            .map(|joined| joined.timeline.events.len())
            .sum()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct TimelineFilter {
    types: Vec<String>,
    limit: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct RoomFilter {
    timeline: TimelineFilter,
}

/// Server-side filter restricting the event kinds and timeline depth of a poll.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncFilter {
    room: RoomFilter,
}

impl SyncFilter {
    /// Only room messages, at most `limit` per room timeline.
    pub fn room_messages(limit: u32) -> Self {
        Self {
            room: RoomFilter {
                timeline: TimelineFilter {
                    types: vec![ROOM_MESSAGE.to_string()],
                    limit,
                },
            },
        }
    }

    /// Timeline depth limit.
    pub fn limit(&self) -> u32 {
        self.room.timeline.limit
    }

    /// Inline JSON form, sent as the `filter` query parameter.
    pub fn to_json(&self) -> Result<String, WireError> {
        serde_json::to_string(self).map_err(WireError::Encode)
    }
}

impl Default for SyncFilter {
    fn default() -> Self {
        Self::room_messages(20)
    }
}
