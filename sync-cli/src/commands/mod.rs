//! CLI command implementations.

pub mod run;
pub mod send;
pub mod whoami;

use anyhow::{Context, Result};
use roomsync_client::{HttpTransport, RoomClient};

use crate::config::BotConfig;

/// Build an HTTPS client from the resolved configuration.
fn connect(config: &BotConfig) -> Result<RoomClient<HttpTransport>> {
    RoomClient::connect(config.client_config()).context("Invalid client configuration")
}
