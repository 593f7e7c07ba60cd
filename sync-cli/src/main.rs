//! # roomsync-bot
//!
//! Echo bot for a single Matrix room.
//!
//! ## Commands
//!
//! - `run`: Acknowledge every message from the human until "exit" (default)
//! - `whoami`: Check the access token and print the bot identity
//! - `send`: Post one message to the room
//!
//! ## Example
//!
//! ```bash
//! export MATRIX_BOT_ACCESS_TOKEN=syt_...
//! export MATRIX_ROOM_ID='!abc:matrix.org'
//! export MATRIX_HUMAN_ID='@alice:matrix.org'
//!
//! # Check credentials
//! roomsync-bot whoami
//!
//! # Run the bot with a config file
//! roomsync-bot --config bot.toml run
//! ```
//!
//! Values come from flags, then environment (a `.env` file is honoured),
//! then the config file.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

mod bot;
mod commands;
mod config;
mod heartbeat;

use commands::{run, send, whoami};
use config::{BotConfig, FileConfig, Overrides};

/// Echo bot for a single Matrix room.
#[derive(Parser, Debug)]
#[command(name = "roomsync-bot")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to a TOML configuration file
    #[arg(long, short, global = true, env = "ROOMSYNC_CONFIG")]
    config: Option<PathBuf>,

    /// Log filter used when RUST_LOG is not set
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(flatten)]
    matrix: MatrixArgs,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Connection settings; each one beats the config file.
#[derive(Args, Debug)]
struct MatrixArgs {
    /// Homeserver base URL
    #[arg(long, global = true, env = "MATRIX_HOMESERVER")]
    homeserver: Option<String>,

    /// Bot access token
    #[arg(long, global = true, env = "MATRIX_BOT_ACCESS_TOKEN", hide_env_values = true)]
    access_token: Option<String>,

    /// Room to watch
    #[arg(long, global = true, env = "MATRIX_ROOM_ID")]
    room_id: Option<String>,

    /// The human the bot talks to
    #[arg(long, global = true, env = "MATRIX_HUMAN_ID")]
    human_id: Option<String>,
}

impl From<MatrixArgs> for Overrides {
    fn from(args: MatrixArgs) -> Self {
        Self {
            homeserver: args.homeserver,
            access_token: args.access_token,
            room_id: args.room_id,
            human_id: args.human_id,
        }
    }
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
enum Commands {
    /// Run the echo bot (default)
    Run {
        /// Skip the greeting on startup
        #[arg(long)]
        no_welcome: bool,

        /// Heartbeat interval in seconds (0 disables)
        #[arg(long)]
        heartbeat_secs: Option<u64>,
    },

    /// Print the identity behind the access token
    Whoami,

    /// Send a single message to the room
    Send {
        /// Message body
        message: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Missing .env is fine
    dotenv::dotenv().ok();

    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level)))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let file = FileConfig::load(cli.config.as_deref()).context("Failed to load config file")?;
    let mut config =
        BotConfig::resolve(file, cli.matrix.into()).context("Incomplete configuration")?;

    let command = cli.command.unwrap_or(Commands::Run {
        no_welcome: false,
        heartbeat_secs: None,
    });

    match command {
        Commands::Run {
            no_welcome,
            heartbeat_secs,
        } => {
            if no_welcome {
                config.bot.send_welcome = false;
            }
            if let Some(secs) = heartbeat_secs {
                config.bot.heartbeat_secs = secs;
            }
            run::run(&config).await?;
        }
        Commands::Whoami => {
            whoami::run(&config).await?;
        }
        Commands::Send { message } => {
            send::run(&config, &message).await?;
        }
    }

    Ok(())
}
