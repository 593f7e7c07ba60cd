//! Timeline event filtering.
//!
//! Decides whether a raw timeline event is a message worth surfacing: a text
//! message with an identifier, written by the one human the bot talks to.
//! The check is split in two so the state machine can consult the seen set
//! between them; an event from the bot itself is still recorded as seen.

use std::fmt;

use roomsync_types::{EventId, TimelineEvent, UserId};

/// Why an event was not delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// No event identifier (or an empty one).
    MissingId,
    /// Not an `m.room.message` with `m.text` content.
    NotTextMessage,
    /// Already delivered.
    Duplicate,
    /// Sent by the bot account itself.
    OwnMessage,
    /// Sent by someone other than the expected human.
    UnexpectedSender,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            Self::MissingId => "missing event id",
            Self::NotTextMessage => "not a text message",
            Self::Duplicate => "already delivered",
            Self::OwnMessage => "sent by the bot",
            Self::UnexpectedSender => "unexpected sender",
        };
        f.write_str(reason)
    }
}

/// Sender and shape checks for timeline events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventFilter {
    bot: UserId,
    human: UserId,
}

impl EventFilter {
    /// Filter for a conversation between `bot` and `human`.
    pub fn new(bot: UserId, human: UserId) -> Self {
        Self { bot, human }
    }

    /// The bot account.
    pub fn bot(&self) -> &UserId {
        &self.bot
    }

    /// The expected human sender.
    pub fn human(&self) -> &UserId {
        &self.human
    }

    /// Require an identifier and text-message shape, returning the identifier.
    pub fn check_shape<'e>(&self, event: &'e TimelineEvent) -> Result<&'e EventId, Rejection> {
        let id = event.id().ok_or(Rejection::MissingId)?;
        if !event.is_text_message() {
            return Err(Rejection::NotTextMessage);
        }
        Ok(id)
    }

    /// Require the event to come from the human, not the bot.
    pub fn check_sender(&self, event: &TimelineEvent) -> Result<(), Rejection> {
        if event.sender == self.bot {
            return Err(Rejection::OwnMessage);
        }
        if event.sender != self.human {
            return Err(Rejection::UnexpectedSender);
        }
        Ok(())
    }

    /// Both checks, ignoring duplicates.
    pub fn accepts(&self, event: &TimelineEvent) -> bool {
        self.check_shape(event).is_ok() && self.check_sender(event).is_ok()
    }
}
