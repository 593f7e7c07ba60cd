//! The sync stream.
//!
//! [`SyncStream`] interprets the actions of a [`SyncMachine`]: it performs
//! polls and joins through the client's transport, sleeps out backoffs and
//! hands delivered events to the consumer one at a time.
//!
//! The stream is pull-based. Nothing happens between calls to
//! [`SyncStream::next`], so at most one poll is ever outstanding, and a
//! consumer that stops pulling stops the loop. Failed polls surface as
//! `Err` items; the stream keeps going after them.

use std::collections::VecDeque;

use futures_util::stream::{self, Stream};
use tokio_util::sync::CancellationToken;

use roomsync_core::{Action, Event, PollRequest, SyncMachine};
use roomsync_types::{SyncToken, TimelineEvent};

use crate::client::{ClientError, RoomClient};
use crate::transport::Transport;

/// Lazy, cancellable sequence of messages from one room.
pub struct SyncStream<'a, T: Transport> {
    client: &'a RoomClient<T>,
    machine: SyncMachine,
    pending: VecDeque<Action>,
    cancel: CancellationToken,
    filter_json: String,
    finished: bool,
}

impl<'a, T: Transport> SyncStream<'a, T> {
    pub(crate) fn new(
        client: &'a RoomClient<T>,
        mut machine: SyncMachine,
        cancel: CancellationToken,
        filter_json: String,
    ) -> Self {
        let mut pending = VecDeque::new();
        pending.push_back(machine.start());
        Self {
            client,
            machine,
            pending,
            cancel,
            filter_json,
            finished: false,
        }
    }

    /// Wait for the next message.
    ///
    /// Returns `None` once the cancellation token fires. A failed poll
    /// returns `Some(Err(..))`; the following call waits out the retry delay
    /// and polls again with the same token.
    pub async fn next(&mut self) -> Option<Result<TimelineEvent, ClientError>> {
        let client = self.client;

        loop {
            if self.finished {
                return None;
            }
            if self.cancel.is_cancelled() {
                self.stop();
                return None;
            }

            let Some(action) = self.pending.pop_front() else {
                // The machine always schedules a follow-up; an empty queue
                // means it stopped.
                self.stop();
                return None;
            };

            match action {
                Action::Poll(request) => {
                    log_poll(&request);
                    let outcome = tokio::select! {
                        biased;
                        _ = self.cancel.cancelled() => None,
                        result = client.poll(&request, &self.filter_json) => Some(result),
                    };
                    let Some(result) = outcome else {
                        self.stop();
                        return None;
                    };

                    match result {
                        Ok(batch) => {
                            tracing::debug!(
                                next_batch = %batch.next_batch,
                                events = batch.event_count(),
                                "Sync batch received"
                            );
                            let actions = self.machine.on_event(Event::PollSucceeded(batch));
                            if request.is_bootstrap() {
                                tracing::info!(
                                    room_id = %self.machine.room(),
                                    since = ?self.machine.since(),
                                    "Sync bootstrapped"
                                );
                            }
                            self.pending.extend(actions);
                        }
                        Err(e) => {
                            tracing::warn!(error = %e, since = ?request.since, "Sync poll failed");
                            let actions = self.machine.on_event(Event::PollFailed {
                                error: e.to_string(),
                            });
                            self.pending.extend(actions);
                            return Some(Err(e));
                        }
                    }
                }

                Action::Join(room) => {
                    let joined = tokio::select! {
                        biased;
                        _ = self.cancel.cancelled() => None,
                        outcome = client.join_room(&room) => Some(outcome),
                    };
                    if joined.is_none() {
                        self.stop();
                        return None;
                    }
                }

                Action::Deliver(event) => return Some(Ok(event)),

                Action::Discard { event_id, reason } => {
                    tracing::debug!(event_id = ?event_id, %reason, "Dropped timeline event");
                }

                Action::Backoff(delay) => {
                    tracing::debug!("Retrying sync in {:?}", delay);
                    let elapsed = tokio::select! {
                        biased;
                        _ = self.cancel.cancelled() => false,
                        _ = tokio::time::sleep(delay) => true,
                    };
                    if !elapsed {
                        self.stop();
                        return None;
                    }
                    let actions = self.machine.on_event(Event::BackoffElapsed);
                    self.pending.extend(actions);
                }
            }
        }
    }

    /// Convert into a [`Stream`].
    pub fn into_stream(self) -> impl Stream<Item = Result<TimelineEvent, ClientError>> + 'a {
        stream::unfold(self, |mut sync| async move {
            let item = sync.next().await?;
            Some((item, sync))
        })
    }

    /// Token the next steady-state poll will send.
    pub fn since(&self) -> Option<&SyncToken> {
        self.machine.since()
    }

    /// Check if the stream has ended.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// End the stream. No further polls are issued.
    pub fn stop(&mut self) {
        if !self.finished {
            tracing::debug!(room_id = %self.machine.room(), "Sync stream stopped");
        }
        self.machine.on_event(Event::StopRequested);
        self.pending.clear();
        self.finished = true;
    }
}

fn log_poll(request: &PollRequest) {
    tracing::debug!(
        "Polling: since={:?} timeout={}ms",
        request.since.as_ref().map(|t| t.as_str()),
        request.timeout.as_millis()
    );
}
