//! xcodedash-client: API model and HTTP client for the assistant backend.
//!
//! Provides a transport-agnostic `ApiClient` trait with implementations for:
//! - `HttpApiClient`: reqwest-backed client for the assistant's JSON API
//! - `MockApiClient`: configurable mock for unit testing
//!
//! All types are plain data, decoupled from wire specifics, so dashboard
//! state and rendering can be exercised without a running backend.

pub mod error;
pub mod http;
pub mod mock;
pub mod service;
pub mod types;

/// Stable crate label used for bootstrap smoke tests.
pub fn crate_label() -> &'static str {
    "xcodedash-client"
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn crate_label_is_stable() {
        assert_eq!(crate_label(), "xcodedash-client");
    }
}
