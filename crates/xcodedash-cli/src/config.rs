//! Dashboard configuration: flags over environment over file over defaults.

use std::time::Duration;

use serde::Deserialize;

use crate::job_tracker::{JobPollConfig, JOB_POLL_INTERVAL};
use crate::status::STATUS_POLL_PERIOD;

pub const ENV_BASE_URL: &str = "XCODEDASH_BASE_URL";
pub const ENV_STATUS_POLL_SECS: &str = "XCODEDASH_STATUS_POLL_SECS";
pub const ENV_JOB_POLL_SECS: &str = "XCODEDASH_JOB_POLL_SECS";
pub const ENV_TIMEOUT_SECS: &str = "XCODEDASH_TIMEOUT_SECS";
pub const ENV_RETRY_TRANSPORT: &str = "XCODEDASH_RETRY_TRANSPORT";
pub const ENV_MAX_ATTEMPTS: &str = "XCODEDASH_MAX_ATTEMPTS";
/// Path of an optional TOML config file.
pub const ENV_CONFIG_PATH: &str = "XCODEDASH_CONFIG";

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000";

/// Resolved runtime configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashConfig {
    pub base_url: String,
    pub status_poll_period: Duration,
    pub job_poll_interval: Duration,
    pub request_timeout: Duration,
    pub retry_on_transport: bool,
    pub max_attempts: Option<u32>,
}

impl Default for DashConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_owned(),
            status_poll_period: STATUS_POLL_PERIOD,
            job_poll_interval: JOB_POLL_INTERVAL,
            request_timeout: Duration::from_secs(30),
            retry_on_transport: true,
            max_attempts: None,
        }
    }
}

impl DashConfig {
    /// Job polling policy derived from this configuration.
    #[must_use]
    pub fn job_poll_config(&self) -> JobPollConfig {
        JobPollConfig {
            poll_interval: self.job_poll_interval,
            max_attempts: self.max_attempts,
            retry_on_transport: self.retry_on_transport,
        }
    }
}

/// On-disk configuration shape. Every field is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ConfigFile {
    pub base_url: Option<String>,
    pub status_poll_secs: Option<u64>,
    pub job_poll_secs: Option<u64>,
    pub timeout_secs: Option<u64>,
    pub retry_on_transport: Option<bool>,
    pub max_attempts: Option<u32>,
}

/// Command-line overrides, highest precedence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigOverrides {
    pub base_url: Option<String>,
    pub status_poll_secs: Option<u64>,
    pub job_poll_secs: Option<u64>,
    pub timeout_secs: Option<u64>,
    pub retry_on_transport: Option<bool>,
    pub max_attempts: Option<u32>,
}

/// Resolve configuration from all sources.
///
/// `env` is injected so tests never touch the process environment.
pub fn load_config(
    env: &dyn Fn(&str) -> Option<String>,
    file_contents: Option<&str>,
    overrides: &ConfigOverrides,
) -> Result<DashConfig, String> {
    let mut config = DashConfig::default();

    if let Some(contents) = file_contents {
        let file: ConfigFile =
            toml::from_str(contents).map_err(|err| format!("config file: {err}"))?;
        apply_file(&mut config, &file);
    }

    apply_env(&mut config, env)?;
    apply_overrides(&mut config, overrides);
    Ok(config)
}

fn apply_file(config: &mut DashConfig, file: &ConfigFile) {
    if let Some(base_url) = &file.base_url {
        config.base_url = base_url.clone();
    }
    if let Some(secs) = file.status_poll_secs {
        config.status_poll_period = Duration::from_secs(secs.max(1));
    }
    if let Some(secs) = file.job_poll_secs {
        config.job_poll_interval = Duration::from_secs(secs.max(1));
    }
    if let Some(secs) = file.timeout_secs {
        config.request_timeout = Duration::from_secs(secs.max(1));
    }
    if let Some(retry) = file.retry_on_transport {
        config.retry_on_transport = retry;
    }
    if file.max_attempts.is_some() {
        config.max_attempts = file.max_attempts;
    }
}

fn apply_env(
    config: &mut DashConfig,
    env: &dyn Fn(&str) -> Option<String>,
) -> Result<(), String> {
    if let Some(base_url) = env(ENV_BASE_URL) {
        config.base_url = base_url;
    }
    if let Some(secs) = parse_env_u64(env, ENV_STATUS_POLL_SECS)? {
        config.status_poll_period = Duration::from_secs(secs.max(1));
    }
    if let Some(secs) = parse_env_u64(env, ENV_JOB_POLL_SECS)? {
        config.job_poll_interval = Duration::from_secs(secs.max(1));
    }
    if let Some(secs) = parse_env_u64(env, ENV_TIMEOUT_SECS)? {
        config.request_timeout = Duration::from_secs(secs.max(1));
    }
    if let Some(raw) = env(ENV_RETRY_TRANSPORT) {
        config.retry_on_transport = parse_bool(&raw)
            .ok_or_else(|| format!("{ENV_RETRY_TRANSPORT}: expected true/false, got {raw:?}"))?;
    }
    if let Some(raw) = env(ENV_MAX_ATTEMPTS) {
        let attempts: u32 = raw
            .trim()
            .parse()
            .map_err(|_| format!("{ENV_MAX_ATTEMPTS}: expected a number, got {raw:?}"))?;
        config.max_attempts = Some(attempts);
    }
    Ok(())
}

fn apply_overrides(config: &mut DashConfig, overrides: &ConfigOverrides) {
    if let Some(base_url) = &overrides.base_url {
        config.base_url = base_url.clone();
    }
    if let Some(secs) = overrides.status_poll_secs {
        config.status_poll_period = Duration::from_secs(secs.max(1));
    }
    if let Some(secs) = overrides.job_poll_secs {
        config.job_poll_interval = Duration::from_secs(secs.max(1));
    }
    if let Some(secs) = overrides.timeout_secs {
        config.request_timeout = Duration::from_secs(secs.max(1));
    }
    if let Some(retry) = overrides.retry_on_transport {
        config.retry_on_transport = retry;
    }
    if overrides.max_attempts.is_some() {
        config.max_attempts = overrides.max_attempts;
    }
}

fn parse_env_u64(
    env: &dyn Fn(&str) -> Option<String>,
    key: &str,
) -> Result<Option<u64>, String> {
    match env(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<u64>()
            .map(Some)
            .map_err(|_| format!("{key}: expected a number, got {raw:?}")),
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
