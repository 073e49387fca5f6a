//! Server status view and the periodic health poller.
//!
//! Poll failures flip the connection indicator to disconnected but leave the
//! counters at their last good values — stale data stays visible rather than
//! blanking. The poller is a self-rescheduling loop: the next tick is armed
//! only after the previous round trip finishes, so cadence drifts under
//! latency.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;

use xcodedash_client::service::ApiClient;
use xcodedash_client::types::ServerStatus;

/// Fixed period between health polls.
pub const STATUS_POLL_PERIOD: Duration = Duration::from_secs(15);

/// Backend reachability as last observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Connection {
    Connected,
    #[default]
    Disconnected,
}

impl Connection {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Connected => "connected",
            Self::Disconnected => "disconnected",
        }
    }

    #[must_use]
    pub fn glyph(self) -> &'static str {
        match self {
            Self::Connected => "●",
            Self::Disconnected => "○",
        }
    }
}

/// Connection indicator plus the four summary counters and the last-sync label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusView {
    pub connection: Connection,
    pub repositories: u64,
    pub total_files: u64,
    pub context_files: u64,
    pub critical_files: u64,
    pub last_sync_label: String,
    pub sync_in_progress: bool,
}

impl Default for StatusView {
    fn default() -> Self {
        Self {
            connection: Connection::Disconnected,
            repositories: 0,
            total_files: 0,
            context_files: 0,
            critical_files: 0,
            last_sync_label: "Never".to_owned(),
            sync_in_progress: false,
        }
    }
}

impl StatusView {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a successful poll.
    pub fn apply(&mut self, status: &ServerStatus, now: DateTime<Utc>) {
        self.connection = Connection::Connected;
        self.repositories = status.repositories;
        self.total_files = status.total_files;
        self.context_files = status.context_files;
        self.critical_files = status.critical_files;
        self.last_sync_label = format_last_sync(status.last_sync, now);
        self.sync_in_progress = status.sync_in_progress.unwrap_or(false);
    }

    /// Record a failed poll: indicator only, counters stay stale-but-visible.
    pub fn mark_offline(&mut self) {
        self.connection = Connection::Disconnected;
    }

    /// One-line summary for the status strip.
    #[must_use]
    pub fn strip_line(&self) -> String {
        let syncing = if self.sync_in_progress {
            " | syncing"
        } else {
            ""
        };
        format!(
            "{} {} | repos {} | files {} | context {} | critical {} | last sync {}{syncing}",
            self.connection.glyph(),
            self.connection.as_str(),
            self.repositories,
            self.total_files,
            self.context_files,
            self.critical_files,
            self.last_sync_label
        )
    }
}

/// Human-relative last-sync label.
///
/// "Just now" under one minute, whole minutes under an hour, whole hours
/// beyond that.
#[must_use]
pub fn format_last_sync(last_sync: Option<DateTime<Utc>>, now: DateTime<Utc>) -> String {
    let Some(last) = last_sync else {
        return "Never".to_owned();
    };
    let elapsed = now - last;
    if elapsed.num_seconds() < 60 {
        return "Just now".to_owned();
    }
    let minutes = elapsed.num_minutes();
    if minutes < 60 {
        format!("{minutes}m ago")
    } else {
        format!("{}h ago", minutes / 60)
    }
}

/// Poll server health on a fixed period until cancelled.
///
/// Failures are logged and flip the indicator; there is no backoff — the next
/// attempt happens on the next tick regardless of outcome.
pub async fn run_status_poller<C: ApiClient + ?Sized>(
    client: Arc<C>,
    view: Arc<Mutex<StatusView>>,
    period: Duration,
    cancel: CancellationToken,
) {
    loop {
        match client.server_status().await {
            Ok(status) => {
                let now = Utc::now();
                view.lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .apply(&status, now);
            }
            Err(err) => {
                tracing::warn!(error = %err, "status poll failed");
                view.lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .mark_offline();
            }
        }
        tokio::select! {
            biased;
            () = cancel.cancelled() => return,
            () = tokio::time::sleep(period) => {}
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};

    use xcodedash_client::types::ServerStatus;

    use super::{format_last_sync, Connection, StatusView};

    fn now() -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 8, 27, 12, 0, 0).unwrap()
    }

    #[test]
    fn last_sync_buckets_match_the_documented_boundaries() {
        let reference = now();
        let label = |secs: i64| format_last_sync(Some(reference - Duration::seconds(secs)), reference);

        assert_eq!(label(0), "Just now");
        assert_eq!(label(59), "Just now");
        assert_eq!(label(60), "1m ago");
        assert_eq!(label(59 * 60 + 59), "59m ago");
        assert_eq!(label(60 * 60), "1h ago");
        assert_eq!(label(125 * 60), "2h ago");
        assert_eq!(format_last_sync(None, reference), "Never");
    }

    #[test]
    fn future_timestamps_read_as_just_now() {
        let reference = now();
        let label = format_last_sync(Some(reference + Duration::seconds(30)), reference);
        assert_eq!(label, "Just now");
    }

    #[test]
    fn apply_updates_counters_and_connects() {
        let mut view = StatusView::new();
        let status = ServerStatus {
            repositories: 3,
            total_files: 120,
            context_files: 40,
            critical_files: 9,
            last_sync: Some(now() - Duration::minutes(5)),
            ..ServerStatus::default()
        };
        view.apply(&status, now());

        assert_eq!(view.connection, Connection::Connected);
        assert_eq!(view.repositories, 3);
        assert_eq!(view.last_sync_label, "5m ago");
        assert!(view.strip_line().contains("repos 3"));
    }

    #[test]
    fn mark_offline_keeps_stale_counters_visible() {
        let mut view = StatusView::new();
        view.apply(
            &ServerStatus {
                repositories: 2,
                total_files: 50,
                ..ServerStatus::default()
            },
            now(),
        );
        view.mark_offline();

        assert_eq!(view.connection, Connection::Disconnected);
        assert_eq!(view.repositories, 2);
        assert_eq!(view.total_files, 50);
    }
}
