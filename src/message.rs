//! Message and group types shared by the sync client and its renderer.
//!
//! DESIGN
//! ======
//! `Message` mirrors the device's JSON wire shape exactly. Messages are never
//! edited after they arrive; the list is replaced wholesale on every poll.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;

// =============================================================================
// GROUP
// =============================================================================

/// A named partition of the message stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Group {
    #[default]
    General,
    Secret,
    Talks,
    Random,
}

impl Group {
    /// Every group, in sidebar order.
    pub const ALL: [Group; 4] = [Group::General, Group::Secret, Group::Talks, Group::Random];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::General => "General",
            Self::Secret => "Secret",
            Self::Talks => "Talks",
            Self::Random => "Random",
        }
    }
}

impl fmt::Display for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown group: {0}")]
pub struct UnknownGroup(pub String);

impl FromStr for Group {
    type Err = UnknownGroup;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Group::ALL
            .into_iter()
            .find(|g| g.as_str() == s)
            .ok_or_else(|| UnknownGroup(s.to_owned()))
    }
}

// =============================================================================
// MESSAGE
// =============================================================================

/// A chat message as stored by the device.
///
/// `group` stays a plain string: the device may hold groups this client does
/// not know about, and those must still decode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub sender: String,
    pub message: String,
    pub timestamp: String,
    pub group: String,
}

impl Message {
    /// Rendering key. Timestamps alone are not unique, so the list index breaks ties.
    #[must_use]
    pub fn key(&self, index: usize) -> String {
        format!("{}-{index}", self.timestamp)
    }
}

/// A message about to be posted, form-encoded on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutgoingMessage {
    pub sender: String,
    pub message: String,
    pub group: Group,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

impl OutgoingMessage {
    /// Build an outgoing message stamped with the current UTC time.
    #[must_use]
    pub fn stamped(sender: &str, message: &str, group: Group) -> Self {
        Self {
            sender: sender.to_owned(),
            message: message.to_owned(),
            group,
            timestamp: Some(now_timestamp()),
        }
    }
}

// =============================================================================
// TIMESTAMPS
// =============================================================================

/// Current UTC time as RFC 3339.
#[must_use]
pub fn now_timestamp() -> String {
    // Formatting a valid UTC datetime as RFC 3339 only fails for years outside 0..=9999.
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_default()
}

/// Format a message timestamp as a 12-hour clock label (`hh:mm AM`).
///
/// Accepts RFC 3339 and the device's local `YYYY-MM-DD HH:MM:SS` form.
/// Anything else renders as `Invalid Time`.
#[must_use]
pub fn format_time_label(timestamp: &str) -> String {
    let clock = format_description!("[hour repr:12]:[minute] [period]");
    let parsed = OffsetDateTime::parse(timestamp, &Rfc3339).map(|dt| (dt.hour(), dt.minute())).or_else(|_| {
        time::PrimitiveDateTime::parse(timestamp, format_description!("[year]-[month]-[day] [hour]:[minute]:[second]"))
            .map(|dt| (dt.hour(), dt.minute()))
    });
    let Ok((hour, minute)) = parsed else {
        return "Invalid Time".to_owned();
    };
    time::Time::from_hms(hour, minute, 0)
        .ok()
        .and_then(|t| t.format(clock).ok())
        .unwrap_or_else(|| "Invalid Time".to_owned())
}

#[cfg(test)]
#[path = "message_test.rs"]
mod tests;
