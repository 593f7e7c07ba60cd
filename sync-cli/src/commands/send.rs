//! Send one message to the configured room.

use anyhow::{Context, Result};

use crate::config::BotConfig;

/// Run the send command. Unlike the bot's replies, a failure here is an error.
pub async fn run(config: &BotConfig, message: &str) -> Result<()> {
    let client = super::connect(config)?;
    let event_id = client
        .try_send_message(message)
        .await
        .context("Failed to send message")?;

    println!("Sent {} to {}", event_id, config.room_id);
    Ok(())
}
