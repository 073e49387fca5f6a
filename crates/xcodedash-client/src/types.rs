//! Transport-agnostic types for the assistant backend API.
//!
//! These mirror the JSON shapes of the backend's dashboard endpoints but as
//! plain Rust data, so state stores and rendering never touch wire specifics.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Default branch forwarded when the user leaves the field blank.
pub const DEFAULT_BRANCH: &str = "main";

/// Default sync interval forwarded with every add-repository request.
pub const DEFAULT_SYNC_INTERVAL_SECS: u64 = 300;

/// Health classification of a tracked repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RepoHealth {
    Healthy,
    Unhealthy,
    #[serde(other)]
    Unknown,
}

impl RepoHealth {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Healthy => "healthy",
            Self::Unhealthy => "unhealthy",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for RepoHealth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Aggregate snapshot of one repository as reported by the backend.
///
/// Replaced wholesale on every fetch; the client never mutates one directly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositorySummary {
    pub name: String,
    #[serde(default = "RepositorySummary::default_status")]
    pub status: RepoHealth,
    #[serde(default)]
    pub total_files: u64,
    #[serde(default)]
    pub critical_files: u64,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub branch: Option<String>,
    #[serde(default)]
    pub last_sync: Option<String>,
}

impl RepositorySummary {
    fn default_status() -> RepoHealth {
        RepoHealth::Unknown
    }
}

/// Server health snapshot, overwritten on every status poll.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct ServerStatus {
    #[serde(default)]
    pub repositories: u64,
    #[serde(default)]
    pub total_files: u64,
    #[serde(default)]
    pub context_files: u64,
    #[serde(default)]
    pub critical_files: u64,
    #[serde(default, deserialize_with = "de_flexible_timestamp")]
    pub last_sync: Option<DateTime<Utc>>,
    #[serde(default)]
    pub healthy_repositories: Option<u64>,
    #[serde(default)]
    pub active_jobs: Option<u64>,
    #[serde(default)]
    pub sync_in_progress: Option<bool>,
    #[serde(default)]
    pub version: Option<String>,
}

/// Opaque identifier of a server-side asynchronous job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub String);

impl JobId {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lifecycle state of a job.
///
/// The backend answers `not_found` for evicted job ids; that and any future
/// status strings fold into `Unknown`, which is non-terminal so polling
/// continues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    #[serde(other)]
    Unknown,
}

impl JobStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Unknown => "unknown",
        }
    }

    /// Whether polling stops at this status.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One observation of a job, as returned by the job status endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct JobSnapshot {
    pub status: JobStatus,
    pub result: Option<AnalysisResult>,
    pub progress: Option<u8>,
    pub message: Option<String>,
}

impl JobSnapshot {
    /// Snapshot with just a status, as the backend reports mid-flight.
    #[must_use]
    pub fn status_only(status: JobStatus) -> Self {
        Self {
            status,
            result: None,
            progress: None,
            message: None,
        }
    }
}

/// Completed analysis payload, immutable once received.
///
/// Typed accessors cover the fields the presenter renders; the raw value is
/// retained verbatim for the diagnostics dump.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AnalysisResult {
    pub collaborative_analysis: Option<String>,
    pub deepseek_analysis: Option<String>,
    pub gemini_analysis: Option<String>,
    pub code_sections: Option<BTreeMap<String, String>>,
    raw: Value,
}

impl AnalysisResult {
    /// Extract the rendered fields from a raw result value.
    ///
    /// Extraction is per-field so one malformed field never discards the
    /// others; non-string code section entries are skipped.
    #[must_use]
    pub fn from_value(raw: Value) -> Self {
        let take_str = |key: &str| -> Option<String> {
            raw.get(key)
                .and_then(Value::as_str)
                .map(std::borrow::ToOwned::to_owned)
        };
        let code_sections = raw
            .get("code_sections")
            .and_then(Value::as_object)
            .map(|sections| {
                sections
                    .iter()
                    .filter_map(|(name, content)| {
                        content.as_str().map(|text| (name.clone(), text.to_owned()))
                    })
                    .collect::<BTreeMap<String, String>>()
            });
        Self {
            collaborative_analysis: take_str("collaborative_analysis"),
            deepseek_analysis: take_str("deepseek_analysis"),
            gemini_analysis: take_str("gemini_analysis"),
            code_sections,
            raw,
        }
    }

    /// The result exactly as the backend sent it.
    #[must_use]
    pub fn raw(&self) -> &Value {
        &self.raw
    }

    /// Pretty-printed raw result for the diagnostics region.
    #[must_use]
    pub fn raw_pretty(&self) -> String {
        serde_json::to_string_pretty(&self.raw).unwrap_or_else(|_| self.raw.to_string())
    }
}

/// Model selection forwarded to analysis and query endpoints.
///
/// The backend's `use_deepseek` field takes the strings `both`, `deepseek`,
/// or `gemini`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelChoice {
    #[default]
    Both,
    Deepseek,
    Gemini,
}

impl ModelChoice {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Both => "both",
            Self::Deepseek => "deepseek",
            Self::Gemini => "gemini",
        }
    }

    /// Parse a command-line value.
    #[must_use]
    pub fn from_flag(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "both" => Some(Self::Both),
            "deepseek" => Some(Self::Deepseek),
            "gemini" => Some(Self::Gemini),
            _ => None,
        }
    }
}

impl fmt::Display for ModelChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Wire-ready add-repository request.
///
/// The access token is forwarded exactly as given, empty string included.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AddRepositoryParams {
    pub name: String,
    pub url: String,
    pub branch: String,
    pub access_token: Option<String>,
    pub sync_interval: u64,
}

impl AddRepositoryParams {
    /// Request with the backend's defaults for branch and sync interval.
    #[must_use]
    pub fn new(name: &str, url: &str) -> Self {
        Self {
            name: name.to_owned(),
            url: url.to_owned(),
            branch: DEFAULT_BRANCH.to_owned(),
            access_token: None,
            sync_interval: DEFAULT_SYNC_INTERVAL_SECS,
        }
    }
}

/// Wire-ready error analysis request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnalyzeErrorParams {
    pub error_message: String,
    #[serde(rename = "use_deepseek")]
    pub model: ModelChoice,
    pub force_sync: bool,
}

/// Wire-ready general query request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueryParams {
    pub query: String,
    #[serde(rename = "use_deepseek")]
    pub model: ModelChoice,
}

/// Outcome of a mutating request that received a response.
///
/// Transport failure is not a variant here: it travels as the error side of
/// the operation's `Result`, keeping the three cases distinct by type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationOutcome {
    /// The server accepted the mutation.
    Accepted { message: String },
    /// The server rejected the mutation with its own message.
    Rejected { message: String },
}

impl MutationOutcome {
    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            Self::Accepted { message } | Self::Rejected { message } => message,
        }
    }

    #[must_use]
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted { .. })
    }
}

/// Parse a backend timestamp leniently.
///
/// The backend emits Python `isoformat()` strings, which may or may not carry
/// a UTC offset; offset-free values are taken as UTC.
#[must_use]
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| Utc.from_utc_datetime(&naive))
}

fn de_flexible_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(parse_timestamp))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    use super::{
        parse_timestamp, AnalysisResult, AnalyzeErrorParams, JobStatus, ModelChoice, RepoHealth,
        RepositorySummary, ServerStatus,
    };

    #[test]
    fn repo_health_folds_unrecognized_values_to_unknown() {
        let healthy: RepoHealth = serde_json::from_value(json!("healthy")).unwrap();
        let odd: RepoHealth = serde_json::from_value(json!("syncing")).unwrap();
        assert_eq!(healthy, RepoHealth::Healthy);
        assert_eq!(odd, RepoHealth::Unknown);
    }

    #[test]
    fn job_status_folds_not_found_to_unknown_and_keeps_it_non_terminal() {
        let status: JobStatus = serde_json::from_value(json!("not_found")).unwrap();
        assert_eq!(status, JobStatus::Unknown);
        assert!(!status.is_terminal());
        assert!(JobStatus::Completed.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
        assert!(!JobStatus::Processing.is_terminal());
    }

    #[test]
    fn model_choice_serializes_to_wire_strings() {
        let body = AnalyzeErrorParams {
            error_message: "undefined symbol".to_owned(),
            model: ModelChoice::Gemini,
            force_sync: false,
        };
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["use_deepseek"], json!("gemini"));
        assert_eq!(ModelChoice::from_flag("DeepSeek"), Some(ModelChoice::Deepseek));
        assert_eq!(ModelChoice::from_flag("claude"), None);
    }

    #[test]
    fn timestamp_parsing_accepts_offset_free_isoformat() {
        let naive = parse_timestamp("2026-08-27T10:15:30.123456").unwrap();
        let expected = Utc.with_ymd_and_hms(2026, 8, 27, 10, 15, 30).unwrap();
        assert_eq!(naive.date_naive(), expected.date_naive());
        assert!(parse_timestamp("2026-08-27T10:15:30+00:00").is_some());
        assert!(parse_timestamp("Never").is_none());
        assert!(parse_timestamp("").is_none());
    }

    #[test]
    fn server_status_tolerates_missing_and_odd_fields() {
        let status: ServerStatus = serde_json::from_value(json!({
            "repositories": 2,
            "total_files": 40,
            "last_sync": "Never"
        }))
        .unwrap();
        assert_eq!(status.repositories, 2);
        assert_eq!(status.context_files, 0);
        assert_eq!(status.last_sync, None);
    }

    #[test]
    fn repository_summary_defaults_status_to_unknown() {
        let repo: RepositorySummary =
            serde_json::from_value(json!({ "name": "app", "total_files": 7 })).unwrap();
        assert_eq!(repo.status, RepoHealth::Unknown);
        assert_eq!(repo.critical_files, 0);
    }

    #[test]
    fn analysis_result_extracts_fields_without_discarding_raw() {
        let raw = json!({
            "collaborative_analysis": "joint verdict",
            "gemini_analysis": "gemini says",
            "code_sections": { "App.swift": "let x = 1", "bad": 7 },
            "model_used": "both"
        });
        let result = AnalysisResult::from_value(raw.clone());
        assert_eq!(result.collaborative_analysis.as_deref(), Some("joint verdict"));
        assert_eq!(result.deepseek_analysis, None);
        let sections = result.code_sections.as_ref().unwrap();
        assert_eq!(sections.len(), 1);
        assert_eq!(sections["App.swift"], "let x = 1");
        assert_eq!(result.raw(), &raw);
        assert!(result.raw_pretty().contains("model_used"));
    }
}
