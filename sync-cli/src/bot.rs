//! The echo bot: acknowledges every message and leaves on "exit".

use roomsync_client::{ClientError, RoomClient, Transport};
use roomsync_types::TimelineEvent;
use tokio_util::sync::CancellationToken;

/// Reply sent before shutting down on request.
pub const EXIT_REPLY: &str = "Received your 'exit'";

/// Whether a message body asks the bot to stop.
///
/// Case-insensitive, surrounding whitespace ignored.
pub fn is_exit_command(body: &str) -> bool {
    body.trim().eq_ignore_ascii_case("exit")
}

/// The acknowledgement for a message body.
pub fn ack_reply(body: &str) -> String {
    format!("Ack: \"{}\"", body)
}

/// Why the conversation loop returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ending {
    /// The human sent "exit".
    ExitRequested,
    /// The cancellation token fired (signal or caller).
    Cancelled,
}

/// Counters for the end-of-run log line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Summary {
    /// Messages received from the human.
    pub received: u64,
    /// Poll errors seen.
    pub errors: u64,
}

/// Consume the sync stream until "exit" or cancellation.
///
/// The stream's errors are logged and skipped. On "exit" the token is
/// cancelled so sibling tasks (the heartbeat) stop as well.
pub async fn converse<T: Transport>(
    client: &RoomClient<T>,
    cancel: CancellationToken,
) -> Result<(Ending, Summary), ClientError> {
    let mut stream = client.sync(cancel.clone())?;
    let mut summary = Summary::default();

    tracing::info!("Starting sync loop");
    while let Some(item) = stream.next().await {
        let event = match item {
            Ok(event) => event,
            Err(e) => {
                summary.errors += 1;
                tracing::error!(error = %e, "Sync error");
                continue;
            }
        };
        summary.received += 1;

        if respond(client, &event).await {
            cancel.cancel();
            return Ok((Ending::ExitRequested, summary));
        }
    }

    Ok((Ending::Cancelled, summary))
}

/// React to one delivered message. Returns true when asked to exit.
async fn respond<T: Transport>(client: &RoomClient<T>, event: &TimelineEvent) -> bool {
    tracing::info!(sender = %event.sender, body = %event.body(), "Message received");

    if is_exit_command(event.body()) {
        tracing::info!("'exit' received from user");
        let _ = client.send_message(EXIT_REPLY).await;
        return true;
    }

    let _ = client.send_message(&ack_reply(event.body())).await;
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use roomsync_client::{ClientConfig, MockTransport};
    use roomsync_types::{RoomId, SyncBatch, UserId};
    use std::time::Duration;

    fn room() -> RoomId {
        RoomId::new("!room:example.org")
    }

    fn human() -> UserId {
        UserId::new("@jni:example.org")
    }

    async fn ready_client(transport: &MockTransport) -> RoomClient<MockTransport> {
        transport.set_whoami(UserId::new("@bot:example.org"));
        let config = ClientConfig::new("syt_token", room(), human())
            .with_retry_delay(Duration::from_millis(1));
        let mut client = RoomClient::new(config, transport.clone()).unwrap();
        client.whoami().await.unwrap();
        client
    }

    #[test]
    fn exit_detection() {
        assert!(is_exit_command("exit"));
        assert!(is_exit_command("  EXIT\n"));
        assert!(is_exit_command("Exit"));
        assert!(!is_exit_command("exit now"));
        assert!(!is_exit_command("e x i t"));
        assert!(!is_exit_command(""));
    }

    #[test]
    fn ack_quotes_body_verbatim() {
        assert_eq!(ack_reply("hi"), "Ack: \"hi\"");
        assert_eq!(ack_reply("say \"x\""), "Ack: \"say \"x\"\"");
    }

    #[tokio::test]
    async fn acks_then_exits() {
        let transport = MockTransport::new();
        transport.queue_sync(SyncBatch::empty("t0"));
        transport.queue_sync(SyncBatch::empty("t1").with_events(
            room(),
            vec![
                TimelineEvent::text("$1", human(), "hello"),
                TimelineEvent::text("$2", human(), " Exit "),
                TimelineEvent::text("$3", human(), "never seen"),
            ],
        ));
        let client = ready_client(&transport).await;
        let cancel = CancellationToken::new();

        let (ending, summary) = converse(&client, cancel.clone()).await.unwrap();

        assert_eq!(ending, Ending::ExitRequested);
        assert_eq!(summary.received, 2);
        assert!(cancel.is_cancelled());
        assert_eq!(
            transport.sent_messages(),
            vec!["Ack: \"hello\"".to_string(), EXIT_REPLY.to_string()]
        );
    }

    #[tokio::test]
    async fn errors_are_skipped() {
        let transport = MockTransport::new();
        transport.queue_sync(SyncBatch::empty("t0"));
        transport.queue_sync_failure("bad gateway");
        transport.queue_sync(
            SyncBatch::empty("t1")
                .with_events(room(), vec![TimelineEvent::text("$1", human(), "exit")]),
        );
        let client = ready_client(&transport).await;

        let (ending, summary) = converse(&client, CancellationToken::new()).await.unwrap();

        assert_eq!(ending, Ending::ExitRequested);
        assert_eq!(summary.errors, 1);
        assert_eq!(summary.received, 1);
    }

    #[tokio::test]
    async fn failed_ack_does_not_stop_the_bot() {
        let transport = MockTransport::new();
        transport.fail_next_send("connection reset");
        transport.queue_sync(SyncBatch::empty("t0"));
        transport.queue_sync(SyncBatch::empty("t1").with_events(
            room(),
            vec![
                TimelineEvent::text("$1", human(), "first"),
                TimelineEvent::text("$2", human(), "exit"),
            ],
        ));
        let client = ready_client(&transport).await;

        let (ending, _) = converse(&client, CancellationToken::new()).await.unwrap();

        assert_eq!(ending, Ending::ExitRequested);
        assert_eq!(transport.sent_messages(), vec![EXIT_REPLY.to_string()]);
    }

    #[tokio::test]
    async fn cancellation_ends_quietly() {
        let transport = MockTransport::new();
        transport.hang_when_empty();
        transport.queue_sync(SyncBatch::empty("t0"));
        let client = ready_client(&transport).await;
        let cancel = CancellationToken::new();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let (ending, summary) = converse(&client, cancel).await.unwrap();
        assert_eq!(ending, Ending::Cancelled);
        assert_eq!(summary, Summary::default());
        assert!(transport.sent_messages().is_empty());
    }

    #[tokio::test]
    async fn requires_identity() {
        let transport = MockTransport::new();
        let config = ClientConfig::new("syt_token", room(), human());
        let client = RoomClient::new(config, transport).unwrap();

        let result = converse(&client, CancellationToken::new()).await;
        assert!(matches!(result, Err(ClientError::IdentityUnresolved)));
    }
}
