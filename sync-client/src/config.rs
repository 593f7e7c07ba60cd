//! Client configuration.
//!
//! Required values are constructor arguments; everything else has a default
//! and a `with_*` setter. [`ClientConfig::validate`] runs once, when the
//! client is built.

use std::time::Duration;
use thiserror::Error;

use roomsync_core::{PollSettings, DEFAULT_SEEN_CAPACITY};
use roomsync_types::{RoomId, SyncFilter, UserId};

/// Default homeserver.
pub const DEFAULT_HOMESERVER: &str = "https://matrix.org";

/// Default server-side hold time of a long poll.
pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_secs(30);

/// Default wait after a failed poll.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(2);

/// Default HTTP request timeout; must exceed the poll timeout.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(45);

/// Default number of timeline events per room per poll.
pub const DEFAULT_TIMELINE_LIMIT: u32 = 20;

/// Configuration errors. All are fatal before any network call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// No access token.
    #[error("access token is required")]
    MissingAccessToken,

    /// No room id.
    #[error("room id is required")]
    MissingRoomId,

    /// Homeserver URL is not http(s).
    #[error("invalid homeserver URL: {0:?}")]
    InvalidHomeserver(String),

    /// A user or room identifier is malformed.
    #[error("{0}")]
    InvalidIdentifier(String),

    /// Poll timeout of zero would turn the loop into a busy poll.
    #[error("poll timeout must be greater than zero")]
    ZeroPollTimeout,

    /// The HTTP client would give up on an idle long poll before the server answers.
    #[error("request timeout ({request:?}) must exceed the poll timeout ({poll:?})")]
    RequestTimeoutTooShort {
        /// Configured HTTP request timeout.
        request: Duration,
        /// Configured long-poll timeout.
        poll: Duration,
    },
}

/// Configuration for [`crate::RoomClient`].
#[derive(Clone)]
pub struct ClientConfig {
    /// Homeserver base URL.
    pub homeserver: String,
    /// Bot account access token.
    pub access_token: String,
    /// The room to follow.
    pub room_id: RoomId,
    /// The only sender whose messages are delivered.
    pub human_id: UserId,
    /// Long-poll hold time.
    pub poll_timeout: Duration,
    /// Wait after a failed poll.
    pub retry_delay: Duration,
    /// Delivered identifiers remembered for dedup.
    pub seen_capacity: usize,
    /// Timeline events per room per poll.
    pub timeline_limit: u32,
    /// HTTP request timeout.
    pub request_timeout: Duration,
}

impl ClientConfig {
    /// Create a configuration with default timings.
    pub fn new(access_token: &str, room_id: RoomId, human_id: UserId) -> Self {
        Self {
            homeserver: DEFAULT_HOMESERVER.to_string(),
            access_token: access_token.to_string(),
            room_id,
            human_id,
            poll_timeout: DEFAULT_POLL_TIMEOUT,
            retry_delay: DEFAULT_RETRY_DELAY,
            seen_capacity: DEFAULT_SEEN_CAPACITY,
            timeline_limit: DEFAULT_TIMELINE_LIMIT,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// Set the homeserver URL.
    pub fn with_homeserver(mut self, homeserver: &str) -> Self {
        self.homeserver = homeserver.to_string();
        self
    }

    /// Set the long-poll timeout.
    pub fn with_poll_timeout(mut self, timeout: Duration) -> Self {
        self.poll_timeout = timeout;
        self
    }

    /// Set the retry delay after a failed poll.
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Set the seen-set capacity.
    pub fn with_seen_capacity(mut self, capacity: usize) -> Self {
        self.seen_capacity = capacity;
        self
    }

    /// Set the timeline limit of the server-side filter.
    pub fn with_timeline_limit(mut self, limit: u32) -> Self {
        self.timeline_limit = limit;
        self
    }

    /// Set the HTTP request timeout.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Check required fields and value ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.access_token.trim().is_empty() {
            return Err(ConfigError::MissingAccessToken);
        }
        if self.room_id.as_str().trim().is_empty() {
            return Err(ConfigError::MissingRoomId);
        }
        RoomId::parse(self.room_id.as_str())
            .map_err(|e| ConfigError::InvalidIdentifier(e.to_string()))?;
        UserId::parse(self.human_id.as_str())
            .map_err(|e| ConfigError::InvalidIdentifier(e.to_string()))?;

        let homeserver = self.homeserver.trim();
        let host = homeserver
            .strip_prefix("https://")
            .or_else(|| homeserver.strip_prefix("http://"));
        if !matches!(host, Some(h) if !h.trim_end_matches('/').is_empty()) {
            return Err(ConfigError::InvalidHomeserver(self.homeserver.clone()));
        }

        if self.poll_timeout.is_zero() {
            return Err(ConfigError::ZeroPollTimeout);
        }
        if self.request_timeout <= self.poll_timeout {
            return Err(ConfigError::RequestTimeoutTooShort {
                request: self.request_timeout,
                poll: self.poll_timeout,
            });
        }
        Ok(())
    }

    /// Loop settings for the state machine.
    pub fn poll_settings(&self) -> PollSettings {
        PollSettings {
            long_poll_timeout: self.poll_timeout,
            retry_delay: self.retry_delay,
            seen_capacity: self.seen_capacity,
        }
    }

    /// Server-side filter sent with every poll.
    pub fn sync_filter(&self) -> SyncFilter {
        SyncFilter::room_messages(self.timeline_limit)
    }
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("homeserver", &self.homeserver)
            .field("access_token", &"[REDACTED]")
            .field("room_id", &self.room_id)
            .field("human_id", &self.human_id)
            .field("poll_timeout", &self.poll_timeout)
            .field("retry_delay", &self.retry_delay)
            .field("seen_capacity", &self.seen_capacity)
            .field("timeline_limit", &self.timeline_limit)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}
