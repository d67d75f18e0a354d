//! Projection of a `ChatState` snapshot into display rows.
//!
//! Front ends render a `ChatView` and never read `ChatState` fields directly.

use std::fmt::Write as _;

use super::state::{ChatState, LENGTH_WARNING, SendStatus};
use crate::message::{Group, format_time_label};

/// One message row.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MessageBubble {
    pub key: String,
    pub sender: String,
    pub text: String,
    pub time_label: String,
    /// Sent by this client's username.
    pub is_own: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GroupEntry {
    pub group: Group,
    pub active: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChatView {
    pub title: &'static str,
    pub username: String,
    pub header: String,
    pub groups: Vec<GroupEntry>,
    pub sidebar_open: bool,
    pub bubbles: Vec<MessageBubble>,
    /// Shown instead of bubbles when the list is empty.
    pub empty_placeholder: Option<String>,
    pub input_placeholder: String,
    pub can_send: bool,
    pub warning: Option<&'static str>,
    pub failed_sends: usize,
}

impl ChatView {
    #[must_use]
    pub fn from_state(state: &ChatState) -> Self {
        let group = state.current_group;
        let bubbles: Vec<MessageBubble> = state
            .messages
            .iter()
            .enumerate()
            .map(|(index, msg)| MessageBubble {
                key: msg.key(index),
                sender: msg.sender.clone(),
                text: msg.message.clone(),
                time_label: format_time_label(&msg.timestamp),
                is_own: msg.sender == state.username,
            })
            .collect();
        let empty_placeholder = bubbles.is_empty().then(|| format!("No messages in #{group}"));

        Self {
            title: "EmbedCord",
            username: state.username.clone(),
            header: format!("#{group}"),
            groups: Group::ALL.iter().map(|&g| GroupEntry { group: g, active: g == group }).collect(),
            sidebar_open: state.sidebar_open,
            bubbles,
            empty_placeholder,
            input_placeholder: format!("Message #{group}"),
            can_send: !state.show_length_warning(),
            warning: state.show_length_warning().then_some(LENGTH_WARNING),
            failed_sends: state.sends.iter().filter(|s| s.status == SendStatus::Failed).count(),
        }
    }

    /// Plain-text rendering for terminal front ends.
    #[must_use]
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "{} | {} | {}", self.title, self.header, self.username);
        if let Some(placeholder) = &self.empty_placeholder {
            let _ = writeln!(out, "  {placeholder}");
        }
        for bubble in &self.bubbles {
            let marker = if bubble.is_own { '>' } else { ' ' };
            let _ = writeln!(out, "{marker} [{}] {}: {}", bubble.time_label, bubble.sender, bubble.text);
        }
        if let Some(warning) = self.warning {
            let _ = writeln!(out, "! {warning}");
        }
        if self.failed_sends > 0 {
            let _ = writeln!(out, "! {} message(s) failed to send", self.failed_sends);
        }
        out
    }
}

#[cfg(test)]
#[path = "render_test.rs"]
mod tests;
