//! Chat state snapshots and the reducer that produces them.
//!
//! DESIGN
//! ======
//! `ChatState` is an immutable snapshot. `ChatState::reduce` takes an action
//! and returns the next snapshot, or `None` when the action does not change
//! anything (stale poll, empty submit, reselecting the same group with the
//! sidebar already closed). The client publishes only the `Some` cases.

use crate::message::{Group, Message};

pub const MAX_MESSAGE_CHARS: usize = 300;
pub const LENGTH_WARNING: &str = "Message too long! Max 300 characters.";

/// How many send records a snapshot keeps.
const MAX_SEND_RECORDS: usize = 50;

// =============================================================================
// SEND RECORDS
// =============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SendStatus {
    Sending,
    Sent,
    Failed,
}

/// Delivery status for one submitted message. The message itself only shows
/// up in `messages` once a poll returns it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SendRecord {
    pub id: u64,
    pub group: Group,
    pub message: String,
    pub status: SendStatus,
}

// =============================================================================
// ACTIONS
// =============================================================================

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ChatAction {
    /// Replace the input buffer.
    SetInput(String),
    /// Switch to another group. Clears the list and closes the sidebar.
    SelectGroup(Group),
    ToggleSidebar,
    /// A poll issued for `group` returned `messages`.
    PollSucceeded { group: Group, messages: Vec<Message> },
    /// Take the input buffer as a new send with this id.
    Submit { id: u64 },
    /// The POST for send `id` finished.
    SendSettled { id: u64, delivered: bool },
}

/// What submitting the current input would do.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Submission {
    /// Blank after trimming; nothing is sent.
    Empty,
    /// Over the length bound; the send control is disabled.
    TooLong,
    Ready(String),
}

// =============================================================================
// STATE
// =============================================================================

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChatState {
    pub username: String,
    pub current_group: Group,
    /// Last accepted poll response for `current_group`.
    pub messages: Vec<Message>,
    pub input: String,
    pub sidebar_open: bool,
    pub sends: Vec<SendRecord>,
}

impl ChatState {
    #[must_use]
    pub fn new(username: impl Into<String>, group: Group) -> Self {
        Self {
            username: username.into(),
            current_group: group,
            messages: Vec::new(),
            input: String::new(),
            sidebar_open: false,
            sends: Vec::new(),
        }
    }

    /// Input length in characters, the unit the 300 limit is expressed in.
    #[must_use]
    pub fn input_len(&self) -> usize {
        self.input.chars().count()
    }

    #[must_use]
    pub fn show_length_warning(&self) -> bool {
        self.input_len() > MAX_MESSAGE_CHARS
    }

    #[must_use]
    pub fn submission(&self) -> Submission {
        if self.show_length_warning() {
            Submission::TooLong
        } else if self.input.trim().is_empty() {
            Submission::Empty
        } else {
            Submission::Ready(self.input.clone())
        }
    }

    #[must_use]
    pub fn send_status(&self, id: u64) -> Option<SendStatus> {
        self.sends.iter().find(|s| s.id == id).map(|s| s.status)
    }

    /// Apply `action`, returning the next snapshot or `None` if nothing changes.
    #[must_use]
    pub fn reduce(&self, action: ChatAction) -> Option<ChatState> {
        match action {
            ChatAction::SetInput(input) => {
                if input == self.input {
                    return None;
                }
                Some(Self { input, ..self.clone() })
            }
            ChatAction::SelectGroup(group) => {
                if group == self.current_group {
                    if !self.sidebar_open {
                        return None;
                    }
                    return Some(Self { sidebar_open: false, ..self.clone() });
                }
                Some(Self {
                    current_group: group,
                    messages: Vec::new(),
                    sidebar_open: false,
                    ..self.clone()
                })
            }
            ChatAction::ToggleSidebar => Some(Self { sidebar_open: !self.sidebar_open, ..self.clone() }),
            ChatAction::PollSucceeded { group, messages } => {
                if group != self.current_group || messages == self.messages {
                    return None;
                }
                Some(Self { messages, ..self.clone() })
            }
            ChatAction::Submit { id } => {
                let Submission::Ready(message) = self.submission() else {
                    return None;
                };
                let mut sends = self.sends.clone();
                sends.push(SendRecord { id, group: self.current_group, message, status: SendStatus::Sending });
                if sends.len() > MAX_SEND_RECORDS {
                    let excess = sends.len() - MAX_SEND_RECORDS;
                    sends.drain(..excess);
                }
                Some(Self { input: String::new(), sends, ..self.clone() })
            }
            ChatAction::SendSettled { id, delivered } => {
                let index = self.sends.iter().position(|s| s.id == id)?;
                let mut sends = self.sends.clone();
                sends[index].status = if delivered { SendStatus::Sent } else { SendStatus::Failed };
                Some(Self { sends, ..self.clone() })
            }
        }
    }
}

#[cfg(test)]
#[path = "state_test.rs"]
mod tests;
