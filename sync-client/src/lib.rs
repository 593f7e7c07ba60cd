//! # sync-client
//!
//! Long-poll sync client for a single Matrix room.
//!
//! This is the main library that applications use to follow a room.
//!
//! ## Features
//!
//! - **Resumable Sync**: continuation token replayed on every poll
//! - **At-Least-Once Tolerant**: redelivered events are dropped by a bounded seen set
//! - **Transport Abstraction**: Pluggable transport layer (reqwest, mock)
//! - **Pure State Machine**: Uses sync-core for side-effect-free logic
//!
//! ## Example
//!
//! ```ignore
//! use sync_client::{ClientConfig, RoomClient};
//! use tokio_util::sync::CancellationToken;
//!
//! let config = ClientConfig::new(&token, room_id, human_id);
//! let mut client = RoomClient::connect(config)?;
//! client.whoami().await?;
//!
//! let mut stream = client.sync(CancellationToken::new())?;
//! while let Some(item) = stream.next().await {
//!     match item {
//!         Ok(event) => println!("{}", event.body()),
//!         Err(e) => eprintln!("poll failed: {}", e),
//!     }
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod client;
pub mod config;
pub mod engine;
pub mod transport;

pub use client::{BestEffort, ClientError, RoomClient};
pub use config::{ClientConfig, ConfigError};
pub use engine::SyncStream;
pub use transport::{
    ApiRequest, HttpTransport, Method, MockTransport, Transport, TransportError, API_PREFIX,
};
