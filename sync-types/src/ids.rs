//! Identity and ordering types for roomsync.
//!
//! Identifiers received from the server are accepted as-is; only values that
//! come from configuration go through [`UserId::parse`] / [`RoomId::parse`].

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::WireError;

/// Check `value` has the `<sigil><localpart>:<server>` shape.
fn has_sigil_and_server(value: &str, sigil: char) -> bool {
    let Some(rest) = value.strip_prefix(sigil) else {
        return false;
    };
    match rest.split_once(':') {
        Some((local, server)) => !local.is_empty() && !server.is_empty(),
        None => false,
    }
}

/// A user account identifier, e.g. `@bot:example.org`.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    /// Wrap a server-provided identifier without validation.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Parse a configured identifier, requiring `@localpart:server`.
    pub fn parse(value: &str) -> Result<Self, WireError> {
        let value = value.trim();
        if has_sigil_and_server(value, '@') {
            Ok(Self(value.to_string()))
        } else {
            Err(WireError::InvalidIdentifier {
                kind: "user",
                value: value.to_string(),
            })
        }
    }

    /// Get the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UserId({})", self.0)
    }
}

/// A room identifier, e.g. `!abc123:example.org`.
///
/// Room aliases (`#room:server`) are not accepted: joined rooms in a sync
/// batch are keyed by room id only.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(String);

impl RoomId {
    /// Wrap a server-provided identifier without validation.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Parse a configured identifier, requiring `!opaque:server`.
    pub fn parse(value: &str) -> Result<Self, WireError> {
        let value = value.trim();
        if has_sigil_and_server(value, '!') {
            Ok(Self(value.to_string()))
        } else {
            Err(WireError::InvalidIdentifier {
                kind: "room",
                value: value.to_string(),
            })
        }
    }

    /// Get the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RoomId({})", self.0)
    }
}

/// A timeline event identifier, e.g. `$Rqnc-F-dvnEYJTyHq_iKxU2bZ1CI92-kuZq3a5lr5Zg`.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(String);

impl EventId {
    /// Wrap an event identifier.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Get the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the identifier is the empty string.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EventId({})", self.0)
    }
}

/// Unique identifier for one outbound send.
///
/// UUID v4, so a retried request is recognised by the server as the same
/// send while two distinct sends never collide.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransactionId(uuid::Uuid);

impl TransactionId {
    /// Create a new random TransactionId.
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }

    /// Get the inner UUID.
    pub fn as_uuid(&self) -> &uuid::Uuid {
        &self.0
    }
}

impl Default for TransactionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TransactionId({})", self.0)
    }
}

/// The continuation token (`next_batch`) issued by the server.
///
/// Opaque: the client never interprets it, it only replays the latest one
/// as `since` on the next poll. Tokens are not ordered by value.
#[derive(Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SyncToken(String);

impl SyncToken {
    /// Wrap a token string.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Get the token as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the server sent an empty token.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for SyncToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for SyncToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SyncToken({})", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_id_parse_accepts_full_id() {
        let id = UserId::parse("@alice:example.org").unwrap();
        assert_eq!(id.as_str(), "@alice:example.org");
    }

    #[test]
    fn user_id_parse_trims_whitespace() {
        let id = UserId::parse("  @alice:example.org\n").unwrap();
        assert_eq!(id.to_string(), "@alice:example.org");
    }

    #[test]
    fn user_id_parse_rejects_bad_shapes() {
        for bad in ["", "alice", "@alice", "@:example.org", "@alice:", "!room:example.org"] {
            assert!(UserId::parse(bad).is_err(), "accepted {:?}", bad);
        }
    }

    #[test]
    fn room_id_parse_requires_bang_sigil() {
        assert!(RoomId::parse("!abc:example.org").is_ok());
        assert!(RoomId::parse("#lobby:example.org").is_err());
        assert!(RoomId::parse("abc:example.org").is_err());
    }

    #[test]
    fn ids_are_transparent_on_the_wire() {
        let json = serde_json::to_string(&RoomId::new("!r:hs")).unwrap();
        assert_eq!(json, "\"!r:hs\"");
        let user: UserId = serde_json::from_str("\"@bot:hs\"").unwrap();
        assert_eq!(user, UserId::new("@bot:hs"));
    }

    #[test]
    fn debug_includes_type_name() {
        assert_eq!(format!("{:?}", EventId::new("$e1")), "EventId($e1)");
        assert_eq!(format!("{:?}", SyncToken::new("s72")), "SyncToken(s72)");
    }

    #[test]
    fn transaction_id_is_uuid_v4() {
        let id = TransactionId::new();
        assert_eq!(id.as_uuid().get_version_num(), 4);
    }

    #[test]
    fn transaction_ids_are_distinct() {
        let a = TransactionId::new();
        let b = TransactionId::new();
        assert_ne!(a, b);
        assert_ne!(a.to_string(), b.to_string());
    }

    #[test]
    fn sync_token_empty() {
        assert!(SyncToken::default().is_empty());
        assert!(!SyncToken::new("t0").is_empty());
    }
}
