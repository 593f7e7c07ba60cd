//! Continuation token tracking.
//!
//! The server hands out an opaque `next_batch` token with every sync batch.
//! Presenting it as `since` on the next poll resumes exactly after the last
//! batch. The tracker holds the latest token and nothing else: tokens are not
//! ordered, so there is no "highest" to keep, only "most recent".

use roomsync_types::SyncToken;

/// Holds the token to replay on the next poll.
///
/// Starts empty. The first successful poll (the bootstrap) fills it; every
/// later successful poll replaces it, even when the batch had no events.
/// Failed polls never touch it.
#[derive(Debug, Clone, Default)]
pub struct TokenTracker {
    current: Option<SyncToken>,
}

impl TokenTracker {
    /// Create a tracker with no token.
    pub fn new() -> Self {
        Self { current: None }
    }

    /// The token to send as `since`, if bootstrapped.
    pub fn since(&self) -> Option<&SyncToken> {
        self.current.as_ref()
    }

    /// Replace the token with one from a successful poll.
    ///
    /// Returns the previous token.
    pub fn advance(&mut self, next: SyncToken) -> Option<SyncToken> {
        self.current.replace(next)
    }

    /// Whether a token has been obtained yet.
    pub fn is_bootstrapped(&self) -> bool {
        self.current.is_some()
    }
}
