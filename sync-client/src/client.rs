//! RoomClient - the main interface for roomsync.
//!
//! This module provides [`RoomClient`], the API applications use to follow
//! one room: resolve the bot identity, open the sync stream, send replies
//! and accept invitations.
//!
//! # Architecture
//!
//! The sync loop uses a pure state machine (from sync-core) for protocol
//! logic and interprets its actions to perform actual I/O via the Transport
//! trait.
//!
//! ```text
//! Application → RoomClient → Transport → Homeserver
//!                   ↓
//!              SyncStream ← sync-core (pure state machine)
//! ```
//!
//! # Example
//!
//! ```ignore
//! use roomsync_client::{ClientConfig, MockTransport, RoomClient};
//!
//! let config = ClientConfig::new("syt_token", room_id, human_id);
//! let mut client = RoomClient::new(config, MockTransport::new())?;
//!
//! client.whoami().await?;
//! let mut stream = client.sync(cancel.clone())?;
//! while let Some(item) = stream.next().await {
//!     let event = item?;
//!     client.send_message(&format!("Ack: {:?}", event.body())).await;
//! }
//! ```

use thiserror::Error;
use tokio_util::sync::CancellationToken;

use roomsync_core::{EventFilter, PollRequest, SyncMachine};
use roomsync_types::{
    decode, EventId, JoinResponse, MessageContent, RoomId, SendResponse, SyncBatch, TransactionId,
    UserId, WhoamiResponse, WireError,
};

use crate::config::{ClientConfig, ConfigError};
use crate::engine::SyncStream;
use crate::transport::{ApiRequest, HttpTransport, Transport, TransportError};

/// Client errors.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Invalid configuration.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Transport error.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// A payload could not be encoded or a response decoded.
    #[error("wire format error: {0}")]
    Decode(#[from] WireError),

    /// The sync stream needs the bot identity; call `whoami` first.
    #[error("bot identity not resolved")]
    IdentityUnresolved,
}

/// Outcome of a call whose failure is tolerated.
///
/// Failures are already logged by the time this is returned; callers may
/// ignore it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BestEffort {
    /// The call succeeded.
    Done,
    /// The call failed; the reason has been logged.
    Failed(String),
}

impl BestEffort {
    /// Check if the call succeeded.
    pub fn is_done(&self) -> bool {
        matches!(self, Self::Done)
    }
}

/// The main room client.
///
/// Owns the transport and the configuration. The sync stream borrows the
/// client, so replies can be sent while the stream is being consumed.
pub struct RoomClient<T: Transport> {
    config: ClientConfig,
    transport: T,
    identity: Option<UserId>,
}

impl RoomClient<HttpTransport> {
    /// Create a client talking to the configured homeserver over HTTPS.
    pub fn connect(config: ClientConfig) -> Result<Self, ClientError> {
        config.validate()?;
        let transport = HttpTransport::new(
            &config.homeserver,
            &config.access_token,
            config.request_timeout,
        )?;
        Self::new(config, transport)
    }
}

impl<T: Transport> RoomClient<T> {
    /// Create a new RoomClient, validating the configuration.
    pub fn new(config: ClientConfig, transport: T) -> Result<Self, ClientError> {
        config.validate()?;
        Ok(Self {
            config,
            transport,
            identity: None,
        })
    }

    /// Resolve the bot's own identity and remember it.
    ///
    /// Doubles as a credential check: a bad token fails here.
    pub async fn whoami(&mut self) -> Result<UserId, ClientError> {
        let body = self.transport.execute(ApiRequest::whoami()).await?;
        let response: WhoamiResponse = decode(&body)?;

        tracing::info!(user_id = %response.user_id, "Resolved bot identity");
        self.identity = Some(response.user_id.clone());
        Ok(response.user_id)
    }

    /// The bot identity, once [`RoomClient::whoami`] has succeeded.
    pub fn identity(&self) -> Option<&UserId> {
        self.identity.as_ref()
    }

    /// Open the sync stream for the configured room.
    ///
    /// Nothing is sent until the first [`SyncStream::next`]. Cancelling
    /// `cancel` ends the stream, aborting an in-flight poll.
    pub fn sync(&self, cancel: CancellationToken) -> Result<SyncStream<'_, T>, ClientError> {
        let bot = self
            .identity
            .clone()
            .ok_or(ClientError::IdentityUnresolved)?;
        let filter_json = self.config.sync_filter().to_json()?;

        let machine = SyncMachine::new(
            self.config.room_id.clone(),
            EventFilter::new(bot, self.config.human_id.clone()),
            self.config.poll_settings(),
        );
        Ok(SyncStream::new(self, machine, cancel, filter_json))
    }

    /// Send a text message to the configured room.
    ///
    /// Each call uses a fresh transaction id. Returns the new event's id.
    pub async fn try_send_message(&self, body: &str) -> Result<EventId, ClientError> {
        let txn = TransactionId::new();
        let content = MessageContent::text(body).to_value()?;
        let request = ApiRequest::send_message(&self.config.room_id, &txn, content);

        let response = self.transport.execute(request).await?;
        let sent: SendResponse = decode(&response)?;

        tracing::debug!(event_id = %sent.event_id, txn_id = %txn, "Message sent");
        Ok(sent.event_id)
    }

    /// Send a text message, logging instead of returning a failure.
    pub async fn send_message(&self, body: &str) -> BestEffort {
        match self.try_send_message(body).await {
            Ok(_) => BestEffort::Done,
            Err(e) => {
                tracing::warn!(room_id = %self.config.room_id, error = %e, "Failed to send message");
                BestEffort::Failed(e.to_string())
            }
        }
    }

    /// Accept an invitation to `room`.
    ///
    /// Not retried: an invite that could not be accepted shows up again in
    /// a later sync batch.
    pub async fn join_room(&self, room: &RoomId) -> BestEffort {
        match self.transport.execute(ApiRequest::join(room)).await {
            Ok(body) => {
                // The membership is already in place; an odd body only costs the log field
                let joined = decode::<JoinResponse>(&body)
                    .map(|response| response.room_id)
                    .unwrap_or_else(|_| room.clone());
                tracing::info!(room_id = %joined, "Joined room");
                BestEffort::Done
            }
            Err(e) => {
                tracing::warn!(room_id = %room, error = %e, "Failed to join room");
                BestEffort::Failed(e.to_string())
            }
        }
    }

    /// Execute one sync poll and decode the batch.
    pub(crate) async fn poll(
        &self,
        request: &PollRequest,
        filter_json: &str,
    ) -> Result<SyncBatch, ClientError> {
        let api = ApiRequest::sync(request.since.as_ref(), request.timeout, filter_json);
        let body = self.transport.execute(api).await?;
        Ok(SyncBatch::from_slice(&body)?)
    }

    /// The configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Get a reference to the underlying transport (for testing).
    pub fn transport(&self) -> &T {
        &self.transport
    }
}
