//! Chat sync client: polling loop, group switching, and sends.
//!
//! DESIGN
//! ======
//! A single background task owns the poll cadence. It selects over an
//! interval and a `watch` receiver carrying the selected group; a group change
//! replaces the interval inside the same task, so there is never more than one
//! timer. Requests run as child tasks, so a group change is polled at once even
//! while an older request is outstanding. Each poll is tagged with the group it
//! was issued for and the reducer drops responses for a group that is no
//! longer selected.
//!
//! State lives inside a `watch::Sender<ChatState>`: every transition runs the
//! reducer under the channel's lock and subscribers see only real changes.
//! One-shot cues (focus, send failure) go out on a `broadcast` channel.
//!
//! ERROR HANDLING
//! ==============
//! Poll failures of every kind are logged and otherwise ignored; the next tick
//! is the retry. Send failures mark the send record `Failed` and emit
//! `ClientEvent::SendFailed`.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::{broadcast, watch};
use tokio::task::{AbortHandle, JoinHandle, JoinSet};
use tokio::time::{Interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use super::state::{ChatAction, ChatState, Submission};
use crate::api::MessageApi;
use crate::message::{Group, OutgoingMessage};

pub const DEFAULT_FOCUS_DELAY: Duration = Duration::from_millis(300);
const EVENT_CAPACITY: usize = 64;
/// Floor for the poll period; a zero interval would spin.
const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// One-shot UI cues that are not part of the state snapshot.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ClientEvent {
    /// Move keyboard focus back to the input.
    FocusInput,
    SendFailed { id: u64, error: String },
}

/// Result of `ChatClient::submit`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Blank input; nothing happened.
    Ignored,
    /// Input over the length bound; nothing was sent.
    TooLong,
    /// POST dispatched; track it by id in `ChatState::sends`.
    Dispatched { id: u64 },
}

#[derive(Clone, Copy, Debug)]
pub struct ClientOptions {
    pub poll_interval: Duration,
    pub focus_delay: Duration,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(crate::config::DEFAULT_POLL_INTERVAL_MS),
            focus_delay: DEFAULT_FOCUS_DELAY,
        }
    }
}

// =============================================================================
// CLIENT
// =============================================================================

pub struct ChatClient {
    api: Arc<dyn MessageApi>,
    state: Arc<watch::Sender<ChatState>>,
    events: broadcast::Sender<ClientEvent>,
    group_tx: watch::Sender<Group>,
    poller: JoinHandle<()>,
    next_send_id: AtomicU64,
    options: ClientOptions,
}

impl ChatClient {
    /// Start a client for `username` viewing `group`. Polling begins immediately.
    ///
    /// Must be called inside a Tokio runtime.
    pub fn start(api: Arc<dyn MessageApi>, username: String, group: Group, options: ClientOptions) -> Self {
        let state = Arc::new(watch::Sender::new(ChatState::new(username, group)));
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let (group_tx, group_rx) = watch::channel(group);

        info!(%group, poll_interval_ms = options.poll_interval.as_millis(), "chat client started");
        let poller = tokio::spawn(run_poller(Arc::clone(&api), group_rx, Arc::clone(&state), options.poll_interval));

        Self { api, state, events, group_tx, poller, next_send_id: AtomicU64::new(1), options }
    }

    /// Current snapshot.
    #[must_use]
    pub fn snapshot(&self) -> ChatState {
        self.state.borrow().clone()
    }

    /// Receive every new snapshot.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<ChatState> {
        self.state.subscribe()
    }

    #[must_use]
    pub fn events(&self) -> broadcast::Receiver<ClientEvent> {
        self.events.subscribe()
    }

    pub fn set_input(&self, input: impl Into<String>) {
        apply(&self.state, ChatAction::SetInput(input.into()));
    }

    pub fn toggle_sidebar(&self) {
        apply(&self.state, ChatAction::ToggleSidebar);
    }

    /// Switch groups: clear the list, close the sidebar, restart polling for
    /// `group`, and cue input focus after the focus delay.
    pub fn select_group(&self, group: Group) {
        apply(&self.state, ChatAction::SelectGroup(group));
        let changed = self.group_tx.send_if_modified(|current| {
            if *current == group {
                return false;
            }
            *current = group;
            true
        });
        if changed {
            info!(%group, "group selected");
        }

        let events = self.events.clone();
        let delay = self.options.focus_delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = events.send(ClientEvent::FocusInput);
        });
    }

    /// Send the input buffer. The buffer clears and focus is cued right away;
    /// the POST runs in the background and only updates the send record.
    pub fn submit(&self) -> SubmitOutcome {
        let id = self.next_send_id.fetch_add(1, Ordering::Relaxed);
        let mut outcome = SubmitOutcome::Ignored;
        let mut dispatched = None;

        self.state.send_if_modified(|state| match state.submission() {
            Submission::Empty => false,
            Submission::TooLong => {
                outcome = SubmitOutcome::TooLong;
                false
            }
            Submission::Ready(text) => {
                let Some(next) = state.reduce(ChatAction::Submit { id }) else {
                    return false;
                };
                dispatched = Some(OutgoingMessage::stamped(&state.username, &text, state.current_group));
                outcome = SubmitOutcome::Dispatched { id };
                *state = next;
                true
            }
        });

        match outcome {
            SubmitOutcome::TooLong => warn!("message over length limit not sent"),
            SubmitOutcome::Dispatched { .. } => {
                let _ = self.events.send(ClientEvent::FocusInput);
            }
            SubmitOutcome::Ignored => {}
        }

        if let Some(message) = dispatched {
            let api = Arc::clone(&self.api);
            let state = Arc::clone(&self.state);
            let events = self.events.clone();
            tokio::spawn(async move {
                let delivered = match api.post_message(&message).await {
                    Ok(()) => {
                        debug!(id, group = %message.group, "message posted");
                        true
                    }
                    Err(e) => {
                        warn!(id, group = %message.group, error = %e, "message post failed");
                        let _ = events.send(ClientEvent::SendFailed { id, error: e.to_string() });
                        false
                    }
                };
                apply(&state, ChatAction::SendSettled { id, delivered });
            });
        }
        outcome
    }

    /// Stop polling and wait for the poll task to end.
    pub async fn shutdown(mut self) {
        self.poller.abort();
        let _ = (&mut self.poller).await;
    }
}

impl Drop for ChatClient {
    fn drop(&mut self) {
        self.poller.abort();
    }
}

fn apply(state: &watch::Sender<ChatState>, action: ChatAction) -> bool {
    state.send_if_modified(|current| match current.reduce(action) {
        Some(next) => {
            *current = next;
            true
        }
        None => false,
    })
}

// =============================================================================
// POLLER
// =============================================================================

fn poll_ticker(period: Duration) -> Interval {
    let mut ticker = tokio::time::interval(period.max(MIN_POLL_INTERVAL));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker
}

/// Poll the selected group immediately, then every `period`, restarting the
/// cadence whenever the group changes. Ends when the group sender is dropped.
///
/// Each poll runs as its own task in a `JoinSet`, so a slow request never
/// delays the first poll of a newly selected group. A tick is skipped while the
/// current group's previous poll is still running. Polls left behind by a
/// group change finish on their own and their results are dropped as stale.
/// Dropping the set (poller aborted) aborts every poll still in flight.
async fn run_poller(
    api: Arc<dyn MessageApi>,
    mut group_rx: watch::Receiver<Group>,
    state: Arc<watch::Sender<ChatState>>,
    period: Duration,
) {
    let mut ticker = poll_ticker(period);
    let mut polls = JoinSet::new();
    let mut current: Option<AbortHandle> = None;
    loop {
        tokio::select! {
            changed = group_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                current = None;
                ticker = poll_ticker(period);
            }
            _ = ticker.tick() => {
                if current.as_ref().is_some_and(|poll| !poll.is_finished()) {
                    debug!("previous poll still running; skipping tick");
                } else {
                    let group = *group_rx.borrow_and_update();
                    let api = Arc::clone(&api);
                    let state = Arc::clone(&state);
                    current = Some(polls.spawn(async move { poll_once(api.as_ref(), group, &state).await }));
                }
            }
            Some(_) = polls.join_next(), if !polls.is_empty() => {}
        }
    }
    debug!("poller stopped");
}

async fn poll_once(api: &dyn MessageApi, group: Group, state: &watch::Sender<ChatState>) {
    match api.fetch_messages(group).await {
        Ok(messages) => {
            let count = messages.len();
            let stale = state.borrow().current_group != group;
            if stale {
                debug!(%group, "discarding poll response for deselected group");
                return;
            }
            if apply(state, ChatAction::PollSucceeded { group, messages }) {
                debug!(%group, count, "messages updated");
            }
        }
        Err(e) => warn!(%group, error = %e, "poll failed"),
    }
}

#[cfg(test)]
#[path = "client_test.rs"]
mod tests;
