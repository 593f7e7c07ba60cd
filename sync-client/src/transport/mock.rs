//! Mock transport for testing.
//!
//! Answers each endpoint from scripted state and captures every request for
//! verification. Sync polls are answered from a queue, one entry per poll.

use super::{ApiRequest, Transport, TransportError, API_PREFIX};
use async_trait::async_trait;
use roomsync_types::{SyncBatch, UserId};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// Mock transport for testing.
///
/// Clones share state, so a test can keep a handle while the client owns
/// another.
#[derive(Debug, Default)]
pub struct MockTransport {
    inner: Arc<Mutex<MockTransportInner>>,
}

#[derive(Debug, Default)]
struct MockTransportInner {
    requests: Vec<ApiRequest>,
    sync_queue: VecDeque<Result<Vec<u8>, TransportError>>,
    whoami: Option<UserId>,
    hang_when_empty: bool,
    fail_next_join: Option<String>,
    fail_next_send: Option<String>,
    sent_count: u64,
}

/// What `execute` should do once the lock is released.
enum Reply {
    Ready(Result<Vec<u8>, TransportError>),
    Hang,
}

impl MockTransport {
    /// Create a new mock transport.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a batch to be returned by the next sync poll.
    pub fn queue_sync(&self, batch: SyncBatch) {
        let body = serde_json::to_vec(&batch).map_err(|e| TransportError::Request(e.to_string()));
        let mut inner = self.inner.lock().unwrap();
        inner.sync_queue.push_back(body);
    }

    /// Queue a raw body for the next sync poll (for malformed responses).
    pub fn queue_sync_raw(&self, body: &[u8]) {
        let mut inner = self.inner.lock().unwrap();
        inner.sync_queue.push_back(Ok(body.to_vec()));
    }

    /// Cause the next sync poll (in queue order) to fail with the given error.
    pub fn queue_sync_failure(&self, error: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner
            .sync_queue
            .push_back(Err(TransportError::Request(error.to_string())));
    }

    /// Set the identity returned by whoami. Unset, whoami answers 401.
    pub fn set_whoami(&self, user: UserId) {
        let mut inner = self.inner.lock().unwrap();
        inner.whoami = Some(user);
    }

    /// Make sync polls block forever once the queue is empty, like an idle
    /// long poll. Otherwise an empty queue answers [`TransportError::Closed`].
    pub fn hang_when_empty(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.hang_when_empty = true;
    }

    /// Cause the next join to fail with the given error.
    pub fn fail_next_join(&self, error: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner.fail_next_join = Some(error.to_string());
    }

    /// Cause the next send to fail with the given error.
    pub fn fail_next_send(&self, error: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner.fail_next_send = Some(error.to_string());
    }

    /// All requests, in order.
    pub fn requests(&self) -> Vec<ApiRequest> {
        let inner = self.inner.lock().unwrap();
        inner.requests.clone()
    }

    /// Only the sync polls, in order.
    pub fn sync_requests(&self) -> Vec<ApiRequest> {
        self.requests().into_iter().filter(|r| r.is_sync()).collect()
    }

    /// Paths of the join requests, in order.
    pub fn join_requests(&self) -> Vec<String> {
        self.requests()
            .into_iter()
            .filter(|r| r.path.starts_with(&format!("{}/join/", API_PREFIX)))
            .map(|r| r.path)
            .collect()
    }

    /// Send requests, in order.
    pub fn send_requests(&self) -> Vec<ApiRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.path.contains("/send/"))
            .collect()
    }

    /// Bodies of the messages sent, in order.
    pub fn sent_messages(&self) -> Vec<String> {
        self.send_requests()
            .into_iter()
            .filter_map(|r| r.body)
            .filter_map(|b| b["body"].as_str().map(str::to_string))
            .collect()
    }

    /// Number of sync responses still queued.
    pub fn pending_syncs(&self) -> usize {
        let inner = self.inner.lock().unwrap();
        inner.sync_queue.len()
    }

    /// Clear all state (requests, queue, scripted failures).
    pub fn reset(&self) {
        let mut inner = self.inner.lock().unwrap();
        *inner = MockTransportInner::default();
    }

    fn respond(&self, request: ApiRequest) -> Reply {
        let mut inner = self.inner.lock().unwrap();
        inner.requests.push(request.clone());

        if request.is_sync() {
            return match inner.sync_queue.pop_front() {
                Some(result) => Reply::Ready(result),
                None if inner.hang_when_empty => Reply::Hang,
                None => Reply::Ready(Err(TransportError::Closed)),
            };
        }

        if request.path == format!("{}/account/whoami", API_PREFIX) {
            let result = match &inner.whoami {
                Some(user) => Ok(serde_json::json!({ "user_id": user }).to_string().into_bytes()),
                None => Err(TransportError::Status {
                    status: 401,
                    reason: "M_UNKNOWN_TOKEN".into(),
                }),
            };
            return Reply::Ready(result);
        }

        if let Some(encoded) = request.path.strip_prefix(&format!("{}/join/", API_PREFIX)) {
            if let Some(error) = inner.fail_next_join.take() {
                return Reply::Ready(Err(TransportError::Status {
                    status: 403,
                    reason: error,
                }));
            }
            let room = urlencoding::decode(encoded)
                .map(|r| r.into_owned())
                .unwrap_or_else(|_| encoded.to_string());
            return Reply::Ready(Ok(serde_json::json!({ "room_id": room })
                .to_string()
                .into_bytes()));
        }

        if request.path.contains("/send/") {
            if let Some(error) = inner.fail_next_send.take() {
                return Reply::Ready(Err(TransportError::Request(error)));
            }
            inner.sent_count += 1;
            let event_id = format!("$mock{}", inner.sent_count);
            return Reply::Ready(Ok(serde_json::json!({ "event_id": event_id })
                .to_string()
                .into_bytes()));
        }

        Reply::Ready(Err(TransportError::Status {
            status: 404,
            reason: "M_UNRECOGNIZED".into(),
        }))
    }
}

impl Clone for MockTransport {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn execute(&self, request: ApiRequest) -> Result<Vec<u8>, TransportError> {
        match self.respond(request) {
            Reply::Ready(result) => result,
            Reply::Hang => std::future::pending().await,
        }
    }
}
