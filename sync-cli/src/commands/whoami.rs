//! Print the bot identity (credential check).

use anyhow::{Context, Result};

use crate::config::BotConfig;

/// Run the whoami command.
pub async fn run(config: &BotConfig) -> Result<()> {
    let mut client = super::connect(config)?;
    let user = client
        .whoami()
        .await
        .context("Failed to resolve bot identity (check the access token)")?;

    println!("Homeserver: {}", config.homeserver);
    println!("Bot:        {}", user);
    println!("Room:       {}", config.room_id);
    println!("Human:      {}", config.human_id);
    Ok(())
}
