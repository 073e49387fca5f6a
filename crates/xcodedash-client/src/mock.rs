//! Mock backend client for unit testing.
//!
//! Records every call and returns pre-configured responses; job status
//! observations can be scripted as a sequence so polling loops can be driven
//! through processing → terminal transitions.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use serde_json::Value;

use crate::error::ClientError;
use crate::service::ApiClient;
use crate::types::{
    AddRepositoryParams, AnalysisResult, AnalyzeErrorParams, JobId, JobSnapshot, JobStatus,
    MutationOutcome, QueryParams, RepoHealth, RepositorySummary, ServerStatus,
};

/// A recorded call to the mock client.
#[derive(Debug, Clone)]
pub enum MockCall {
    ServerStatus,
    ListRepositories,
    AddRepository(AddRepositoryParams),
    TriggerSync,
    ClearContext,
    AnalyzeError(AnalyzeErrorParams),
    SubmitQuery(QueryParams),
    JobSnapshot(JobId),
}

/// Mock implementation of `ApiClient` for testing.
pub struct MockApiClient {
    calls: Mutex<Vec<MockCall>>,
    status: Mutex<Result<ServerStatus, ClientError>>,
    repositories: Mutex<Result<Vec<RepositorySummary>, ClientError>>,
    add_outcome: Mutex<Result<MutationOutcome, ClientError>>,
    sync_outcome: Mutex<Result<String, ClientError>>,
    clear_outcome: Mutex<Result<String, ClientError>>,
    analyze_outcome: Mutex<Result<JobId, ClientError>>,
    query_outcome: Mutex<Result<JobId, ClientError>>,
    job_script: Mutex<VecDeque<Result<JobSnapshot, ClientError>>>,
    job_fallback: Mutex<Result<JobSnapshot, ClientError>>,
}

impl Default for MockApiClient {
    fn default() -> Self {
        Self::new()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MockApiClient {
    #[must_use]
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            status: Mutex::new(Ok(ServerStatus::default())),
            repositories: Mutex::new(Ok(Vec::new())),
            add_outcome: Mutex::new(Ok(MutationOutcome::Accepted {
                message: "Repository added successfully".to_owned(),
            })),
            sync_outcome: Mutex::new(Ok("Batch sync started".to_owned())),
            clear_outcome: Mutex::new(Ok("Context cleared".to_owned())),
            analyze_outcome: Mutex::new(Ok(JobId("job-1".to_owned()))),
            query_outcome: Mutex::new(Ok(JobId("job-1".to_owned()))),
            job_script: Mutex::new(VecDeque::new()),
            job_fallback: Mutex::new(Ok(processing_snapshot())),
        }
    }

    /// Configure the health endpoint response.
    #[must_use]
    pub fn with_status(self, status: Result<ServerStatus, ClientError>) -> Self {
        *lock(&self.status) = status;
        self
    }

    /// Configure the repository list response.
    #[must_use]
    pub fn with_repositories(self, repos: Result<Vec<RepositorySummary>, ClientError>) -> Self {
        *lock(&self.repositories) = repos;
        self
    }

    /// Configure the add-repository outcome.
    #[must_use]
    pub fn with_add_outcome(self, outcome: Result<MutationOutcome, ClientError>) -> Self {
        *lock(&self.add_outcome) = outcome;
        self
    }

    /// Configure the sync trigger outcome.
    #[must_use]
    pub fn with_sync_outcome(self, outcome: Result<String, ClientError>) -> Self {
        *lock(&self.sync_outcome) = outcome;
        self
    }

    /// Configure the clear-context outcome.
    #[must_use]
    pub fn with_clear_outcome(self, outcome: Result<String, ClientError>) -> Self {
        *lock(&self.clear_outcome) = outcome;
        self
    }

    /// Configure the analyze-error response.
    #[must_use]
    pub fn with_analyze_outcome(self, outcome: Result<JobId, ClientError>) -> Self {
        *lock(&self.analyze_outcome) = outcome;
        self
    }

    /// Configure the query response.
    #[must_use]
    pub fn with_query_outcome(self, outcome: Result<JobId, ClientError>) -> Self {
        *lock(&self.query_outcome) = outcome;
        self
    }

    /// Script job observations in order; once exhausted the fallback repeats.
    #[must_use]
    pub fn with_job_script(self, script: Vec<Result<JobSnapshot, ClientError>>) -> Self {
        *lock(&self.job_script) = script.into();
        self
    }

    /// Configure the observation returned once the script is exhausted.
    ///
    /// The default fallback reports `processing` forever.
    #[must_use]
    pub fn with_job_fallback(self, fallback: Result<JobSnapshot, ClientError>) -> Self {
        *lock(&self.job_fallback) = fallback;
        self
    }

    /// Return all recorded calls.
    #[must_use]
    pub fn calls(&self) -> Vec<MockCall> {
        lock(&self.calls).clone()
    }

    /// Return the number of recorded calls.
    #[must_use]
    pub fn call_count(&self) -> usize {
        lock(&self.calls).len()
    }

    /// Number of job status observations so far.
    #[must_use]
    pub fn job_poll_count(&self) -> usize {
        lock(&self.calls)
            .iter()
            .filter(|call| matches!(call, MockCall::JobSnapshot(_)))
            .count()
    }

    fn record(&self, call: MockCall) {
        lock(&self.calls).push(call);
    }
}

#[async_trait]
impl ApiClient for MockApiClient {
    async fn server_status(&self) -> Result<ServerStatus, ClientError> {
        self.record(MockCall::ServerStatus);
        lock(&self.status).clone()
    }

    async fn list_repositories(&self) -> Result<Vec<RepositorySummary>, ClientError> {
        self.record(MockCall::ListRepositories);
        lock(&self.repositories).clone()
    }

    async fn add_repository(
        &self,
        params: AddRepositoryParams,
    ) -> Result<MutationOutcome, ClientError> {
        self.record(MockCall::AddRepository(params));
        lock(&self.add_outcome).clone()
    }

    async fn trigger_sync(&self) -> Result<String, ClientError> {
        self.record(MockCall::TriggerSync);
        lock(&self.sync_outcome).clone()
    }

    async fn clear_context(&self) -> Result<String, ClientError> {
        self.record(MockCall::ClearContext);
        lock(&self.clear_outcome).clone()
    }

    async fn analyze_error(&self, params: AnalyzeErrorParams) -> Result<JobId, ClientError> {
        self.record(MockCall::AnalyzeError(params));
        lock(&self.analyze_outcome).clone()
    }

    async fn submit_query(&self, params: QueryParams) -> Result<JobId, ClientError> {
        self.record(MockCall::SubmitQuery(params));
        lock(&self.query_outcome).clone()
    }

    async fn job_snapshot(&self, id: &JobId) -> Result<JobSnapshot, ClientError> {
        self.record(MockCall::JobSnapshot(id.clone()));
        if let Some(next) = lock(&self.job_script).pop_front() {
            return next;
        }
        lock(&self.job_fallback).clone()
    }
}

/// Repository summary for tests.
#[must_use]
pub fn test_repository(
    name: &str,
    status: RepoHealth,
    total_files: u64,
    critical_files: u64,
) -> RepositorySummary {
    RepositorySummary {
        name: name.to_owned(),
        status,
        total_files,
        critical_files,
        url: None,
        branch: None,
        last_sync: None,
    }
}

/// A `processing` observation with no result.
#[must_use]
pub fn processing_snapshot() -> JobSnapshot {
    JobSnapshot::status_only(JobStatus::Processing)
}

/// A `completed` observation carrying the given raw result.
#[must_use]
pub fn completed_snapshot(result: Value) -> JobSnapshot {
    JobSnapshot {
        status: JobStatus::Completed,
        result: Some(AnalysisResult::from_value(result)),
        progress: None,
        message: None,
    }
}

/// A `failed` observation with an optional backend message.
#[must_use]
pub fn failed_snapshot(message: Option<&str>) -> JobSnapshot {
    JobSnapshot {
        status: JobStatus::Failed,
        result: None,
        progress: None,
        message: message.map(std::borrow::ToOwned::to_owned),
    }
}

/// A transport failure, as the tracker sees a network hiccup.
#[must_use]
pub fn transport_error(message: &str) -> ClientError {
    ClientError::Transport {
        message: message.to_owned(),
    }
}
