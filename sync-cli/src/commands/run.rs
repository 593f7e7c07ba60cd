//! Run the echo bot until "exit" or a shutdown signal.

use anyhow::{Context, Result};
use roomsync_client::{RoomClient, Transport};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::bot::{self, Ending};
use crate::config::BotConfig;
use crate::heartbeat::spawn_heartbeat;

/// Run the bot against the configured homeserver.
pub async fn run(config: &BotConfig) -> Result<()> {
    let client = super::connect(config)?;
    let cancel = CancellationToken::new();
    let signals = spawn_signal_listener(cancel.clone());

    let result = serve(client, config, cancel).await;
    signals.abort();
    result
}

/// Bot lifecycle over any transport: identity, heartbeat, greeting, loop.
pub async fn serve<T: Transport>(
    mut client: RoomClient<T>,
    config: &BotConfig,
    cancel: CancellationToken,
) -> Result<()> {
    let bot_id = client
        .whoami()
        .await
        .context("Failed to resolve bot identity (check the access token)")?;
    tracing::info!(bot_id = %bot_id, room_id = %config.room_id, "Logged in");

    let heartbeat = spawn_heartbeat(config.heartbeat_period(), cancel.clone());

    if let Some(welcome) = config.welcome() {
        // Failure is logged by the client
        let _ = client.send_message(welcome).await;
    }

    let outcome = bot::converse(&client, cancel.clone()).await;

    tracing::info!("Shutting down...");
    cancel.cancel();
    let ticks = heartbeat.await.context("Heartbeat task failed")?;

    let (ending, summary) = outcome.context("Sync loop failed")?;
    match ending {
        Ending::ExitRequested => tracing::info!("Stopped on request"),
        Ending::Cancelled => tracing::info!("Stopped by signal"),
    }
    tracing::info!(
        received = summary.received,
        errors = summary.errors,
        heartbeats = ticks,
        "End of main loop"
    );
    Ok(())
}

/// Cancel `cancel` on SIGINT or SIGTERM.
fn spawn_signal_listener(cancel: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        let ctrl_c = async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::warn!("Failed to listen for Ctrl+C: {}", e);
                std::future::pending::<()>().await;
            }
        };

        #[cfg(unix)]
        let terminate = async {
            use tokio::signal::unix::{signal, SignalKind};
            match signal(SignalKind::terminate()) {
                Ok(mut stream) => {
                    stream.recv().await;
                }
                Err(e) => {
                    tracing::warn!("Failed to listen for SIGTERM: {}", e);
                    std::future::pending::<()>().await;
                }
            }
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            () = ctrl_c => tracing::info!("Received Ctrl+C, shutting down gracefully..."),
            () = terminate => tracing::info!("Received SIGTERM, shutting down gracefully..."),
            () = cancel.cancelled() => return,
        }
        cancel.cancel();
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{FileConfig, Overrides};
    use roomsync_client::MockTransport;
    use roomsync_types::{SyncBatch, TimelineEvent, UserId};

    fn bot_config(welcome: bool) -> BotConfig {
        let mut file = FileConfig::default();
        file.bot.heartbeat_secs = 0;
        file.bot.send_welcome = welcome;
        file.sync.retry_delay_ms = 1;
        let overrides = Overrides {
            homeserver: None,
            access_token: Some("syt_token".into()),
            room_id: Some("!room:example.org".into()),
            human_id: Some("@jni:example.org".into()),
        };
        BotConfig::resolve(file, overrides).unwrap()
    }

    fn client(config: &BotConfig, transport: &MockTransport) -> RoomClient<MockTransport> {
        RoomClient::new(config.client_config(), transport.clone()).unwrap()
    }

    #[tokio::test]
    async fn greets_acks_and_exits() {
        let config = bot_config(true);
        let transport = MockTransport::new();
        transport.set_whoami(UserId::new("@bot:example.org"));
        transport.queue_sync(SyncBatch::empty("t0"));
        transport.queue_sync(SyncBatch::empty("t1").with_events(
            config.room_id.clone(),
            vec![
                TimelineEvent::text("$1", config.human_id.clone(), "ping"),
                TimelineEvent::text("$2", config.human_id.clone(), "exit"),
            ],
        ));

        let cancel = CancellationToken::new();
        serve(client(&config, &transport), &config, cancel.clone())
            .await
            .unwrap();

        assert!(cancel.is_cancelled());
        assert_eq!(
            transport.sent_messages(),
            vec![
                crate::config::DEFAULT_WELCOME.to_string(),
                "Ack: \"ping\"".to_string(),
                "Received your 'exit'".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn no_welcome_when_disabled() {
        let config = bot_config(false);
        let transport = MockTransport::new();
        transport.set_whoami(UserId::new("@bot:example.org"));
        transport.queue_sync(SyncBatch::empty("t0"));
        transport.queue_sync(SyncBatch::empty("t1").with_events(
            config.room_id.clone(),
            vec![TimelineEvent::text("$1", config.human_id.clone(), "EXIT")],
        ));

        serve(client(&config, &transport), &config, CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(
            transport.sent_messages(),
            vec!["Received your 'exit'".to_string()]
        );
    }

    #[tokio::test]
    async fn bad_credentials_fail_before_syncing() {
        let config = bot_config(true);
        let transport = MockTransport::new();

        let result = serve(client(&config, &transport), &config, CancellationToken::new()).await;

        let err = result.unwrap_err();
        assert!(err.to_string().contains("bot identity"), "got: {}", err);
        assert!(transport.sync_requests().is_empty());
        assert!(transport.sent_messages().is_empty());
    }

    #[tokio::test]
    async fn cancelled_token_ends_run() {
        let config = bot_config(false);
        let transport = MockTransport::new();
        transport.set_whoami(UserId::new("@bot:example.org"));
        transport.hang_when_empty();

        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
            trigger.cancel();
        });

        serve(client(&config, &transport), &config, cancel)
            .await
            .unwrap();
        assert_eq!(transport.sync_requests().len(), 1);
    }
}
