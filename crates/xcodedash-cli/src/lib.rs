//! Terminal dashboard for the Xcode AI coding assistant backend.
//!
//! The library is view-toolkit free: every module produces plain data
//! (lines, notices, regions) that the binary paints, so all behavior is
//! testable against the mock client without a terminal.

pub mod actions;
pub mod cli;
pub mod config;
pub mod dashboard;
pub mod job_tracker;
pub mod notify;
pub mod paint;
pub mod presenter;
pub mod repo_store;
pub mod status;

/// Identifying label used in diagnostics.
#[must_use]
pub fn crate_label() -> String {
    format!("xcodedash-cli v{}", env!("CARGO_PKG_VERSION"))
}
