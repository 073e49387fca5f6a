//! User-initiated mutations: validate, send, map the response to a notice.
//!
//! Every action follows the same contract: required local inputs are checked
//! first and an invalid form short-circuits with an error notice — no request
//! is sent. On send an in-progress notice is shown; the response maps to a
//! success notice, the server's own rejection message, or a generic failure
//! notice for transport errors (the real cause goes to the diagnostic log
//! only).

use chrono::Utc;

use xcodedash_client::error::ClientError;
use xcodedash_client::service::ApiClient;
use xcodedash_client::types::{
    AddRepositoryParams, AnalyzeErrorParams, JobId, ModelChoice, MutationOutcome, QueryParams,
    DEFAULT_BRANCH, DEFAULT_SYNC_INTERVAL_SECS,
};

use crate::notify::{NotificationSlot, Severity};

/// User-facing text when no response was obtained at all.
pub const GENERIC_FAILURE_MESSAGE: &str = "Request failed: assistant backend unreachable";

/// Final notice produced by an action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub severity: Severity,
    pub message: String,
}

impl Notice {
    fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            severity,
            message: message.into(),
        }
    }
}

/// What an action did, beyond its notice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionReport {
    pub notice: Notice,
    /// Whether the repository list should be re-fetched.
    pub reload_repositories: bool,
    /// Job to start tracking, for job-producing actions.
    pub started_job: Option<JobId>,
}

impl ActionReport {
    fn notice_only(notice: Notice) -> Self {
        Self {
            notice,
            reload_repositories: false,
            started_job: None,
        }
    }
}

/// Raw add-repository inputs as the user typed them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddRepoForm {
    pub name: String,
    pub url: String,
    pub branch: String,
    pub access_token: Option<String>,
    pub sync_interval: Option<u64>,
}

/// Check required inputs and normalize defaults.
///
/// A blank branch becomes `main`; the access token travels exactly as given,
/// empty string included.
pub fn validate_add_form(form: &AddRepoForm) -> Result<AddRepositoryParams, String> {
    let name = form.name.trim();
    let url = form.url.trim();
    if name.is_empty() {
        return Err("Repository name is required".to_owned());
    }
    if url.is_empty() {
        return Err("Repository URL is required".to_owned());
    }
    let branch = form.branch.trim();
    Ok(AddRepositoryParams {
        name: name.to_owned(),
        url: url.to_owned(),
        branch: if branch.is_empty() {
            DEFAULT_BRANCH.to_owned()
        } else {
            branch.to_owned()
        },
        access_token: form.access_token.clone(),
        sync_interval: form.sync_interval.unwrap_or(DEFAULT_SYNC_INTERVAL_SECS),
    })
}

/// Add a repository; an accepted outcome asks for a repository reload.
pub async fn add_repository<C: ApiClient + ?Sized>(
    client: &C,
    form: &AddRepoForm,
    slot: &mut NotificationSlot,
) -> ActionReport {
    let params = match validate_add_form(form) {
        Ok(params) => params,
        Err(message) => {
            let notice = Notice::new(Severity::Error, message);
            slot.show(notice.severity, notice.message.clone(), Utc::now());
            return ActionReport::notice_only(notice);
        }
    };
    slot.show(Severity::Info, "Adding repository...", Utc::now());
    let report = match client.add_repository(params).await {
        Ok(MutationOutcome::Accepted { message }) => ActionReport {
            notice: Notice::new(Severity::Success, message),
            reload_repositories: true,
            started_job: None,
        },
        Ok(MutationOutcome::Rejected { message }) => {
            ActionReport::notice_only(Notice::new(Severity::Error, message))
        }
        Err(err) => ActionReport::notice_only(failure_notice(&err, "add repository")),
    };
    slot.show(report.notice.severity, report.notice.message.clone(), Utc::now());
    report
}

/// Kick off a backend-wide repository sync.
pub async fn trigger_sync<C: ApiClient + ?Sized>(
    client: &C,
    slot: &mut NotificationSlot,
) -> ActionReport {
    slot.show(Severity::Info, "Starting sync...", Utc::now());
    let report = match client.trigger_sync().await {
        Ok(message) => ActionReport::notice_only(Notice::new(Severity::Success, message)),
        Err(err) => ActionReport::notice_only(failure_notice(&err, "trigger sync")),
    };
    slot.show(report.notice.severity, report.notice.message.clone(), Utc::now());
    report
}

/// Drop the assistant's accumulated file context.
pub async fn clear_context<C: ApiClient + ?Sized>(
    client: &C,
    slot: &mut NotificationSlot,
) -> ActionReport {
    slot.show(Severity::Info, "Clearing context...", Utc::now());
    let report = match client.clear_context().await {
        Ok(message) => ActionReport::notice_only(Notice::new(Severity::Success, message)),
        Err(err) => ActionReport::notice_only(failure_notice(&err, "clear context")),
    };
    slot.show(report.notice.severity, report.notice.message.clone(), Utc::now());
    report
}

/// Queue an error analysis job.
pub async fn analyze_error<C: ApiClient + ?Sized>(
    client: &C,
    error_text: &str,
    model: ModelChoice,
    force_sync: bool,
    slot: &mut NotificationSlot,
) -> ActionReport {
    let error_message = error_text.trim();
    if error_message.is_empty() {
        let notice = Notice::new(Severity::Error, "Error text is required");
        slot.show(notice.severity, notice.message.clone(), Utc::now());
        return ActionReport::notice_only(notice);
    }
    slot.show(Severity::Info, "Analyzing error...", Utc::now());
    let params = AnalyzeErrorParams {
        error_message: error_message.to_owned(),
        model,
        force_sync,
    };
    let report = match client.analyze_error(params).await {
        Ok(job_id) => ActionReport {
            notice: Notice::new(Severity::Info, format!("Analysis started ({job_id})")),
            reload_repositories: false,
            started_job: Some(job_id),
        },
        Err(err) => ActionReport::notice_only(failure_notice(&err, "analyze error")),
    };
    slot.show(report.notice.severity, report.notice.message.clone(), Utc::now());
    report
}

/// Queue a general coding query job.
pub async fn submit_query<C: ApiClient + ?Sized>(
    client: &C,
    query_text: &str,
    model: ModelChoice,
    slot: &mut NotificationSlot,
) -> ActionReport {
    let query = query_text.trim();
    if query.is_empty() {
        let notice = Notice::new(Severity::Error, "Query text is required");
        slot.show(notice.severity, notice.message.clone(), Utc::now());
        return ActionReport::notice_only(notice);
    }
    slot.show(Severity::Info, "Submitting query...", Utc::now());
    let params = QueryParams {
        query: query.to_owned(),
        model,
    };
    let report = match client.submit_query(params).await {
        Ok(job_id) => ActionReport {
            notice: Notice::new(Severity::Info, format!("Query started ({job_id})")),
            reload_repositories: false,
            started_job: Some(job_id),
        },
        Err(err) => ActionReport::notice_only(failure_notice(&err, "submit query")),
    };
    slot.show(report.notice.severity, report.notice.message.clone(), Utc::now());
    report
}

/// Map a failed round trip to its user-facing notice.
///
/// Transport failures degrade to the generic message; server-reported
/// failures surface the server's own detail verbatim.
fn failure_notice(err: &ClientError, context: &str) -> Notice {
    tracing::warn!(error = %err, context, "action failed");
    if err.is_transport() {
        Notice::new(Severity::Error, GENERIC_FAILURE_MESSAGE)
    } else {
        Notice::new(Severity::Error, err.to_string())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::{validate_add_form, AddRepoForm};

    #[test]
    fn blank_branch_defaults_to_main() {
        let form = AddRepoForm {
            name: " app ".to_owned(),
            url: "https://github.com/me/app.git".to_owned(),
            branch: "  ".to_owned(),
            access_token: Some(String::new()),
            sync_interval: None,
        };
        let params = validate_add_form(&form).unwrap();
        assert_eq!(params.name, "app");
        assert_eq!(params.branch, "main");
        assert_eq!(params.sync_interval, 300);
        assert_eq!(params.access_token.as_deref(), Some(""));
    }

    #[test]
    fn missing_name_or_url_fails_validation() {
        let mut form = AddRepoForm {
            url: "https://github.com/me/app.git".to_owned(),
            ..AddRepoForm::default()
        };
        assert!(validate_add_form(&form).is_err());
        form.name = "app".to_owned();
        form.url = String::new();
        assert!(validate_add_form(&form).is_err());
    }
}
