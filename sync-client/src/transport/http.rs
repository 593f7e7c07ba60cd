//! HTTPS transport backed by reqwest.
//!
//! Every request carries `Authorization: Bearer <access token>`. The
//! client-wide request timeout must exceed the long-poll window, otherwise
//! every idle poll would end in [`TransportError::Timeout`].

use async_trait::async_trait;
use reqwest::Client;
use std::fmt;
use std::time::Duration;

use super::{ApiRequest, Method, Transport, TransportError};

/// Transport talking to a real homeserver.
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
    homeserver: String,
    access_token: String,
}

impl HttpTransport {
    /// Build a transport for `homeserver` (e.g. `https://matrix.org`).
    pub fn new(
        homeserver: &str,
        access_token: &str,
        request_timeout: Duration,
    ) -> Result<Self, TransportError> {
        let client = Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| TransportError::Request(e.to_string()))?;

        Ok(Self {
            client,
            homeserver: homeserver.trim_end_matches('/').to_string(),
            access_token: access_token.to_string(),
        })
    }

    /// Base URL requests are resolved against.
    pub fn homeserver(&self) -> &str {
        &self.homeserver
    }

    fn url(&self, request: &ApiRequest) -> String {
        format!("{}{}", self.homeserver, request.path)
    }
}

impl fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpTransport")
            .field("homeserver", &self.homeserver)
            .field("access_token", &"[REDACTED]")
            .finish()
    }
}

fn map_reqwest_error(e: reqwest::Error) -> TransportError {
    if e.is_timeout() {
        TransportError::Timeout
    } else {
        TransportError::Request(e.to_string())
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn execute(&self, request: ApiRequest) -> Result<Vec<u8>, TransportError> {
        let url = self.url(&request);
        let mut builder = match request.method {
            Method::Get => self.client.get(&url),
            Method::Post => self.client.post(&url),
            Method::Put => self.client.put(&url),
        };

        builder = builder.bearer_auth(&self.access_token);
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(map_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            let reason = response
                .text()
                .await
                .ok()
                .filter(|text| !text.is_empty())
                .unwrap_or_else(|| status.canonical_reason().unwrap_or("unknown").to_string());
            return Err(TransportError::Status {
                status: status.as_u16(),
                reason,
            });
        }

        let bytes = response.bytes().await.map_err(map_reqwest_error)?;
        Ok(bytes.to_vec())
    }
}
