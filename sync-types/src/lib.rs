//! # sync-types
//!
//! Wire format types for the roomsync long-poll chat client.
//!
//! This crate provides the foundational types used across all roomsync crates:
//! - [`UserId`], [`RoomId`], [`EventId`], [`TransactionId`] - Identity types
//! - [`SyncToken`] - The opaque continuation token replayed on every poll
//! - [`SyncBatch`], [`TimelineEvent`] - The `/sync` response payload
//! - [`SyncFilter`] - The server-side filter sent with every poll
//! - [`WireError`] - Error types

#![warn(missing_docs)]
#![warn(clippy::all)]

mod error;
mod events;
mod ids;

pub use error::WireError;
pub use events::{
    decode, InvitedRoom, JoinResponse, JoinedRoom, MessageContent, Rooms, SendResponse, SyncBatch,
    SyncFilter, Timeline, TimelineEvent, WhoamiResponse, MSGTYPE_TEXT, ROOM_MESSAGE,
};
pub use ids::{EventId, RoomId, SyncToken, TransactionId, UserId};
