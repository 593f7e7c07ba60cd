//! Sync loop state machine.
//!
//! This module provides a pure, side-effect-free state machine for the
//! long-poll loop. It takes poll outcomes as input and produces a list of
//! actions to execute: issue the next poll, join a room, deliver an event,
//! wait before retrying.
//!
//! The actual I/O (HTTP calls, sleeping, cancellation) is performed by
//! sync-client, not by this module. This enables instant unit testing
//! without network mocks.

use std::time::Duration;

use roomsync_types::{EventId, RoomId, SyncBatch, SyncToken, TimelineEvent};

use crate::filter::{EventFilter, Rejection};
use crate::seen::{SeenSet, DEFAULT_SEEN_CAPACITY};
use crate::token::TokenTracker;

/// Timing and sizing knobs for the loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    /// How long the server may hold a steady-state poll open.
    pub long_poll_timeout: Duration,
    /// Fixed wait after a failed poll.
    pub retry_delay: Duration,
    /// Number of delivered event identifiers remembered for dedup.
    pub seen_capacity: usize,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            long_poll_timeout: Duration::from_secs(30),
            retry_delay: Duration::from_secs(2),
            seen_capacity: DEFAULT_SEEN_CAPACITY,
        }
    }
}

/// Parameters of one poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollRequest {
    /// Token to resume from; `None` for the bootstrap poll.
    pub since: Option<SyncToken>,
    /// Server-side hold time; zero for the bootstrap poll.
    pub timeout: Duration,
}

impl PollRequest {
    /// Whether this is the token-less bootstrap poll.
    pub fn is_bootstrap(&self) -> bool {
        self.since.is_none()
    }
}

/// Which poll a backoff resumes into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resume {
    /// No token yet: bootstrap again.
    Bootstrap,
    /// Long-poll with the stored token.
    Poll,
}

/// Loop phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Waiting for the zero-timeout poll that yields the first token.
    Bootstrapping,
    /// Steady-state long-polling.
    Polling,
    /// A poll failed; waiting out the retry delay.
    BackingOff {
        /// Phase to return to once the delay has elapsed.
        resume: Resume,
    },
    /// No further polls.
    Stopped,
}

/// Inputs to the machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// A poll returned a decoded batch.
    PollSucceeded(SyncBatch),
    /// A poll failed (transport, status or decode).
    PollFailed {
        /// Error message describing the failure.
        error: String,
    },
    /// The retry delay has passed.
    BackoffElapsed,
    /// The consumer cancelled.
    StopRequested,
}

/// Actions to be executed by sync-client.
///
/// These are instructions, not side effects. Actions from one call to
/// [`SyncMachine::on_event`] must be executed in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Issue a poll.
    Poll(PollRequest),
    /// Accept an invitation (best-effort).
    Join(RoomId),
    /// Hand an event to the consumer.
    Deliver(TimelineEvent),
    /// An event was dropped; informational only.
    Discard {
        /// Identifier of the dropped event, when it had one.
        event_id: Option<EventId>,
        /// Why it was dropped.
        reason: Rejection,
    },
    /// Wait before the next poll, then report [`Event::BackoffElapsed`].
    Backoff(Duration),
}

/// The long-poll loop for one room - NO I/O, just state transitions.
///
/// Owns the continuation token, the seen set and the event filter.
#[derive(Debug, Clone)]
pub struct SyncMachine {
    room: RoomId,
    filter: EventFilter,
    settings: PollSettings,
    token: TokenTracker,
    seen: SeenSet,
    phase: Phase,
}

impl SyncMachine {
    /// Create a machine for `room`, not yet started.
    pub fn new(room: RoomId, filter: EventFilter, settings: PollSettings) -> Self {
        Self {
            room,
            filter,
            seen: SeenSet::new(settings.seen_capacity),
            settings,
            token: TokenTracker::new(),
            phase: Phase::Bootstrapping,
        }
    }

    /// The first action: a bootstrap poll with no token and zero timeout.
    pub fn start(&mut self) -> Action {
        self.phase = Phase::Bootstrapping;
        Action::Poll(self.bootstrap_request())
    }

    /// Process an event and return the actions to execute.
    ///
    /// This is a pure function of the machine state and the event. Invalid
    /// combinations leave the state unchanged and return no actions.
    pub fn on_event(&mut self, event: Event) -> Vec<Action> {
        match (self.phase, event) {
            (Phase::Stopped, _) => vec![],
            (_, Event::StopRequested) => {
                self.phase = Phase::Stopped;
                vec![]
            }

            // Bootstrap only establishes the starting point
            (Phase::Bootstrapping, Event::PollSucceeded(batch)) => {
                self.token.advance(batch.next_batch);
                self.phase = Phase::Polling;
                vec![Action::Poll(self.long_poll_request())]
            }
            (Phase::Polling, Event::PollSucceeded(batch)) => {
                let mut actions = self.process_batch(batch);
                actions.push(Action::Poll(self.long_poll_request()));
                actions
            }

            (Phase::Bootstrapping, Event::PollFailed { .. }) => {
                self.phase = Phase::BackingOff {
                    resume: Resume::Bootstrap,
                };
                vec![Action::Backoff(self.settings.retry_delay)]
            }
            (Phase::Polling, Event::PollFailed { .. }) => {
                self.phase = Phase::BackingOff {
                    resume: Resume::Poll,
                };
                vec![Action::Backoff(self.settings.retry_delay)]
            }

            (Phase::BackingOff { resume }, Event::BackoffElapsed) => match resume {
                Resume::Bootstrap => {
                    self.phase = Phase::Bootstrapping;
                    vec![Action::Poll(self.bootstrap_request())]
                }
                Resume::Poll => {
                    self.phase = Phase::Polling;
                    vec![Action::Poll(self.long_poll_request())]
                }
            },

            // Invalid transitions - stay in current state
            _ => vec![],
        }
    }

    /// The token the next steady-state poll will send.
    pub fn since(&self) -> Option<&SyncToken> {
        self.token.since()
    }

    /// Current phase.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Check if the loop has been stopped.
    pub fn is_stopped(&self) -> bool {
        self.phase == Phase::Stopped
    }

    /// Number of identifiers in the seen set.
    pub fn seen_len(&self) -> usize {
        self.seen.len()
    }

    /// The room being followed.
    pub fn room(&self) -> &RoomId {
        &self.room
    }

    /// Loop settings.
    pub fn settings(&self) -> &PollSettings {
        &self.settings
    }

    fn bootstrap_request(&self) -> PollRequest {
        PollRequest {
            since: None,
            timeout: Duration::ZERO,
        }
    }

    fn long_poll_request(&self) -> PollRequest {
        match self.token.since() {
            Some(token) => PollRequest {
                since: Some(token.clone()),
                timeout: self.settings.long_poll_timeout,
            },
            None => self.bootstrap_request(),
        }
    }

    fn process_batch(&mut self, batch: SyncBatch) -> Vec<Action> {
        let SyncBatch { next_batch, mut rooms } = batch;
        self.token.advance(next_batch);

        let mut actions: Vec<Action> = rooms.invite.into_keys().map(Action::Join).collect();

        let Some(joined) = rooms.join.remove(&self.room) else {
            return actions;
        };

        for event in joined.timeline.events {
            match self.admit(&event) {
                Ok(()) => actions.push(Action::Deliver(event)),
                Err(reason) => actions.push(Action::Discard {
                    event_id: event.id().cloned(),
                    reason,
                }),
            }
        }
        actions
    }

    /// Shape check, then dedup, then sender check.
    ///
    /// The seen set records every well-formed text message, including the
    /// bot's own and foreign ones.
    fn admit(&mut self, event: &TimelineEvent) -> Result<(), Rejection> {
        let id = self.filter.check_shape(event)?;
        if self.seen.was_seen(id) {
            return Err(Rejection::Duplicate);
        }
        self.filter.check_sender(event)
    }
}
