//! Auto-scroll decision for the message list.
//!
//! A reader scrolled up into history keeps their position; a reader already at
//! (or within a small buffer of) the bottom follows new messages.

/// Distance from the bottom, in pixels, that still counts as "at the bottom".
pub const AUTOSCROLL_THRESHOLD_PX: f64 = 50.0;

/// Scroll geometry of the message container, sampled before an update is shown.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ScrollMetrics {
    pub scroll_height: f64,
    pub scroll_top: f64,
    pub client_height: f64,
}

impl ScrollMetrics {
    #[must_use]
    pub fn is_near_bottom(&self) -> bool {
        self.scroll_height - self.scroll_top <= self.client_height + AUTOSCROLL_THRESHOLD_PX
    }
}

/// Whether the view should jump to the newest message after a list update.
#[must_use]
pub fn should_autoscroll(before: &ScrollMetrics) -> bool {
    before.is_near_bottom()
}

#[cfg(test)]
#[path = "scroll_test.rs"]
mod tests;
