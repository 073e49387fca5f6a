//! Backend service trait — the primary abstraction for dashboard operations.
//!
//! Implementations can run against the assistant backend over HTTP or be
//! mocked for testing.

use async_trait::async_trait;

use crate::error::ClientError;
use crate::types::{
    AddRepositoryParams, AnalyzeErrorParams, JobId, JobSnapshot, MutationOutcome, QueryParams,
    RepositorySummary, ServerStatus,
};

/// The backend API surface the dashboard consumes.
///
/// Read operations return the latest snapshot; mutating operations return a
/// `MutationOutcome` or a job id the caller then tracks to a terminal state.
#[async_trait]
pub trait ApiClient: Send + Sync {
    /// Fetch the current server health snapshot.
    async fn server_status(&self) -> Result<ServerStatus, ClientError>;

    /// Fetch the full repository list.
    async fn list_repositories(&self) -> Result<Vec<RepositorySummary>, ClientError>;

    /// Register a repository. The server may accept or reject with a message.
    async fn add_repository(
        &self,
        params: AddRepositoryParams,
    ) -> Result<MutationOutcome, ClientError>;

    /// Kick off a background sync of all repositories.
    async fn trigger_sync(&self) -> Result<String, ClientError>;

    /// Drop the assistant's accumulated file context.
    async fn clear_context(&self) -> Result<String, ClientError>;

    /// Queue an error analysis job. Returns the id to poll.
    async fn analyze_error(&self, params: AnalyzeErrorParams) -> Result<JobId, ClientError>;

    /// Queue a general query job. Returns the id to poll.
    async fn submit_query(&self, params: QueryParams) -> Result<JobId, ClientError>;

    /// Observe a job once by id.
    async fn job_snapshot(&self, id: &JobId) -> Result<JobSnapshot, ClientError>;
}
