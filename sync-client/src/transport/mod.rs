//! Transport abstraction for roomsync.
//!
//! This module provides a pluggable transport layer that abstracts how an
//! authenticated request reaches the homeserver (reqwest over HTTPS, or a
//! mock for testing). Transports know nothing about sync semantics: they
//! take a request and return the raw response body.
//!
//! # Design
//!
//! The transport trait is async and request/response oriented:
//! - `execute()` sends one [`ApiRequest`] and returns the body bytes
//! - any non-2xx status is an error ([`TransportError::Status`])
//! - authentication is the transport's concern, not the caller's
//!
//! # Example
//!
//! ```ignore
//! let transport = MockTransport::new();
//! transport.set_whoami(UserId::new("@bot:example.org"));
//! let body = transport.execute(ApiRequest::whoami()).await?;
//! ```

mod http;
mod mock;

pub use http::HttpTransport;
pub use mock::MockTransport;

use async_trait::async_trait;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

use roomsync_types::{RoomId, SyncToken, TransactionId, ROOM_MESSAGE};

/// Client-server API prefix.
pub const API_PREFIX: &str = "/_matrix/client/v3";

/// Transport errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The request could not be sent or the response not read.
    #[error("request failed: {0}")]
    Request(String),

    /// The server answered with a non-success status.
    #[error("server returned {status}: {reason}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body or status text.
        reason: String,
    },

    /// The request timed out.
    #[error("request timeout")]
    Timeout,

    /// The transport has been shut down.
    #[error("transport closed")]
    Closed,
}

/// HTTP method of an API call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// GET
    Get,
    /// POST
    Post,
    /// PUT
    Put,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
        })
    }
}

/// One API call, relative to the homeserver base URL.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    /// HTTP method.
    pub method: Method,
    /// Path including [`API_PREFIX`], with path segments already escaped.
    pub path: String,
    /// Query parameters, unescaped.
    pub query: Vec<(String, String)>,
    /// JSON body, if any.
    pub body: Option<serde_json::Value>,
}

impl ApiRequest {
    /// A request with no query and no body.
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
        }
    }

    /// Append a query parameter.
    pub fn with_query(mut self, key: &str, value: impl Into<String>) -> Self {
        self.query.push((key.to_string(), value.into()));
        self
    }

    /// Attach a JSON body.
    pub fn with_body(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Look up a query parameter.
    pub fn query_param(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// `GET /account/whoami`
    pub fn whoami() -> Self {
        Self::new(Method::Get, format!("{}/account/whoami", API_PREFIX))
    }

    /// `POST /join/{room}`
    pub fn join(room: &RoomId) -> Self {
        Self::new(
            Method::Post,
            format!("{}/join/{}", API_PREFIX, urlencoding::encode(room.as_str())),
        )
        .with_body(serde_json::json!({}))
    }

    /// `PUT /rooms/{room}/send/m.room.message/{txn}`
    pub fn send_message(room: &RoomId, txn: &TransactionId, content: serde_json::Value) -> Self {
        Self::new(
            Method::Put,
            format!(
                "{}/rooms/{}/send/{}/{}",
                API_PREFIX,
                urlencoding::encode(room.as_str()),
                ROOM_MESSAGE,
                urlencoding::encode(&txn.to_string()),
            ),
        )
        .with_body(content)
    }

    /// `GET /sync` with the poll parameters.
    ///
    /// `since` is omitted entirely when there is no token.
    pub fn sync(since: Option<&SyncToken>, timeout: Duration, filter_json: &str) -> Self {
        let mut request = Self::new(Method::Get, format!("{}/sync", API_PREFIX))
            .with_query("timeout", timeout.as_millis().to_string())
            .with_query("set_presence", "offline")
            .with_query("filter", filter_json);
        if let Some(token) = since {
            request = request.with_query("since", token.as_str());
        }
        request
    }

    /// Whether this is a `/sync` poll.
    pub fn is_sync(&self) -> bool {
        self.path == format!("{}/sync", API_PREFIX)
    }
}

/// Transport trait for executing homeserver API calls.
///
/// Implementations handle the underlying mechanism (reqwest, mock, etc)
/// and the access token.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Execute a request and return the response body.
    ///
    /// Blocks until the server answers; for a long poll that is up to the
    /// requested timeout.
    async fn execute(&self, request: ApiRequest) -> Result<Vec<u8>, TransportError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sync_request_without_token_omits_since() {
        let req = ApiRequest::sync(None, Duration::ZERO, "{}");

        assert_eq!(req.method, Method::Get);
        assert_eq!(req.path, "/_matrix/client/v3/sync");
        assert_eq!(req.query_param("timeout"), Some("0"));
        assert_eq!(req.query_param("set_presence"), Some("offline"));
        assert_eq!(req.query_param("filter"), Some("{}"));
        assert_eq!(req.query_param("since"), None);
        assert!(req.is_sync());
    }

    #[test]
    fn sync_request_with_token() {
        let token = SyncToken::new("s72_1");
        let req = ApiRequest::sync(Some(&token), Duration::from_secs(30), "{}");

        assert_eq!(req.query_param("timeout"), Some("30000"));
        assert_eq!(req.query_param("since"), Some("s72_1"));
    }

    #[test]
    fn join_path_escapes_room_id() {
        let req = ApiRequest::join(&RoomId::new("!abc:example.org"));
        assert_eq!(req.method, Method::Post);
        assert_eq!(req.path, "/_matrix/client/v3/join/%21abc%3Aexample.org");
        assert!(!req.is_sync());
    }

    #[test]
    fn send_path_layout() {
        let txn = TransactionId::new();
        let req = ApiRequest::send_message(
            &RoomId::new("!r:hs"),
            &txn,
            serde_json::json!({"msgtype": "m.text", "body": "hi"}),
        );

        assert_eq!(req.method, Method::Put);
        assert_eq!(
            req.path,
            format!("/_matrix/client/v3/rooms/%21r%3Ahs/send/m.room.message/{}", txn)
        );
        assert_eq!(req.body.unwrap()["body"], "hi");
    }

    #[test]
    fn whoami_path() {
        let req = ApiRequest::whoami();
        assert_eq!(req.method.to_string(), "GET");
        assert_eq!(req.path, "/_matrix/client/v3/account/whoami");
        assert!(req.body.is_none());
    }

    #[test]
    fn status_error_display() {
        let err = TransportError::Status {
            status: 502,
            reason: "Bad Gateway".into(),
        };
        assert_eq!(err.to_string(), "server returned 502: Bad Gateway");
    }
}
