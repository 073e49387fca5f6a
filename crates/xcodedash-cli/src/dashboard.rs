//! Compose the watch view frame from the current dashboard state.
//!
//! Pure over its inputs so frames can be asserted in tests without a
//! terminal; the binary feeds the lines to the incremental painter.

use chrono::{DateTime, Utc};

use crate::notify::NotificationSlot;
use crate::repo_store::RepositoryStore;
use crate::status::StatusView;

/// Render one full watch frame.
#[must_use]
pub fn frame_lines(
    status: &StatusView,
    store: &RepositoryStore,
    notifications: &NotificationSlot,
    now: DateTime<Utc>,
    refresh_secs: u64,
) -> Vec<String> {
    let mut lines = Vec::new();
    lines.push("xcodedash — assistant dashboard".to_owned());
    lines.push(status.strip_line());
    lines.push(String::new());
    lines.extend(store.panel_lines());
    if let Some(notification) = notifications.current(now) {
        lines.push(String::new());
        lines.push(format!(
            "{} {}",
            notification.severity.glyph(),
            notification.message
        ));
    }
    lines.push(String::new());
    lines.push(format!("refresh: {refresh_secs}s | exit: Ctrl+C"));
    lines
}
