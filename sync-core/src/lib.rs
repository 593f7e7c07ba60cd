//! # sync-core
//!
//! Pure logic for roomsync (no I/O, instant tests).
//!
//! This crate implements the long-poll state machine and its helpers
//! without any network or timer I/O, enabling fast unit tests.
//!
//! ## Design Philosophy
//!
//! All modules in this crate are **pure** - they take input and produce output
//! without side effects. This enables:
//! - Instant unit tests (no mocks, no async)
//! - Deterministic behavior (same input → same output)
//! - Easy reasoning about state transitions
//!
//! The actual I/O (HTTP, sleeping, cancellation) is performed by
//! `sync-client`, which interprets the actions produced by [`SyncMachine`].

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod filter;
pub mod seen;
pub mod state;
pub mod token;

pub use filter::{EventFilter, Rejection};
pub use seen::{SeenSet, DEFAULT_SEEN_CAPACITY};
pub use state::{Action, Event, Phase, PollRequest, PollSettings, Resume, SyncMachine};
pub use token::TokenTracker;
