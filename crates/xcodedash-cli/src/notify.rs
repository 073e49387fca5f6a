//! Single-slot transient notifications.
//!
//! One message at a time with a severity tag; a new notification pre-empts
//! whatever is showing, and the slot auto-clears after a fixed lifetime.
//! All expiry decisions take an injected `now`, so tests need no timers.

use chrono::{DateTime, Duration, Utc};

/// How long a notification stays visible.
pub const NOTIFICATION_TTL_SECS: i64 = 3;

/// Severity tag controlling how the view styles the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    Success,
    Error,
    Info,
}

impl Severity {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Error => "error",
            Self::Info => "info",
        }
    }

    /// Prefix glyph used by the terminal renderer.
    #[must_use]
    pub fn glyph(self) -> &'static str {
        match self {
            Self::Success => "✔",
            Self::Error => "✖",
            Self::Info => "·",
        }
    }
}

/// A displayed notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub severity: Severity,
    pub message: String,
    pub shown_at: DateTime<Utc>,
}

impl Notification {
    #[must_use]
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.shown_at + Duration::seconds(NOTIFICATION_TTL_SECS)
    }
}

/// The one notification slot shared by every dashboard component.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NotificationSlot {
    current: Option<Notification>,
}

impl NotificationSlot {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Show a message, pre-empting any current one. No queue.
    pub fn show(&mut self, severity: Severity, message: impl Into<String>, now: DateTime<Utc>) {
        self.current = Some(Notification {
            severity,
            message: message.into(),
            shown_at: now,
        });
    }

    /// The visible notification, if any; expired messages read as absent.
    #[must_use]
    pub fn current(&self, now: DateTime<Utc>) -> Option<&Notification> {
        self.current
            .as_ref()
            .filter(|notification| now < notification.expires_at())
    }

    /// Drop an expired notification so renders stop carrying it.
    pub fn tick(&mut self, now: DateTime<Utc>) {
        if self.current(now).is_none() {
            self.current = None;
        }
    }

    pub fn clear(&mut self) {
        self.current = None;
    }
}
