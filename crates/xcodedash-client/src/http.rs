//! reqwest-backed `ApiClient` against the assistant backend's JSON API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ClientError;
use crate::service::ApiClient;
use crate::types::{
    AddRepositoryParams, AnalyzeErrorParams, JobId, JobSnapshot, JobStatus, MutationOutcome,
    QueryParams, RepositorySummary, ServerStatus,
};

/// Default per-request timeout.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP client for the assistant backend.
#[derive(Debug, Clone)]
pub struct HttpApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl HttpApiClient {
    /// Build a client for the given deployment origin.
    ///
    /// The base URL must be absolute; a trailing slash is tolerated.
    pub fn new(base_url: &str, request_timeout: Duration) -> Result<Self, ClientError> {
        let trimmed = base_url.trim().trim_end_matches('/');
        let parsed = Url::parse(trimmed).map_err(|err| ClientError::InvalidBaseUrl {
            message: format!("{trimmed}: {err}"),
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ClientError::InvalidBaseUrl {
                message: format!("{trimmed}: unsupported scheme {:?}", parsed.scheme()),
            });
        }
        let http = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|err| ClientError::Transport {
                message: err.to_string(),
            })?;
        Ok(Self {
            http,
            base_url: trimmed.to_owned(),
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        tracing::debug!(path, "GET");
        let response = self
            .http
            .get(self.endpoint(path))
            .send()
            .await
            .map_err(transport_error)?;
        decode_success(response).await
    }

    async fn post_json<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ClientError> {
        tracing::debug!(path, "POST");
        let response = self
            .http
            .post(self.endpoint(path))
            .json(body)
            .send()
            .await
            .map_err(transport_error)?;
        decode_success(response).await
    }

    async fn post_empty<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        self.post_json(path, &Value::Null).await
    }
}

#[async_trait]
impl ApiClient for HttpApiClient {
    async fn server_status(&self) -> Result<ServerStatus, ClientError> {
        self.get_json("/api/health").await
    }

    async fn list_repositories(&self) -> Result<Vec<RepositorySummary>, ClientError> {
        let wire: RepositoryListWire = self.get_json("/api/repositories").await?;
        Ok(wire.repositories)
    }

    async fn add_repository(
        &self,
        params: AddRepositoryParams,
    ) -> Result<MutationOutcome, ClientError> {
        tracing::debug!(name = %params.name, "POST /api/repositories/add");
        let response = self
            .http
            .post(self.endpoint("/api/repositories/add"))
            .json(&params)
            .send()
            .await
            .map_err(transport_error)?;
        let status = response.status();
        if status.is_success() {
            let wire: AddRepositoryWire = decode_body(response).await?;
            if wire.success {
                return Ok(MutationOutcome::Accepted {
                    message: wire.message,
                });
            }
            return Ok(MutationOutcome::Rejected {
                message: wire.message,
            });
        }
        let detail = response_detail(response).await;
        // Validation-style rejections arrive as 4xx with a detail message.
        if status.is_client_error() {
            return Ok(MutationOutcome::Rejected { message: detail });
        }
        Err(ClientError::Api {
            status: status.as_u16(),
            detail,
        })
    }

    async fn trigger_sync(&self) -> Result<String, ClientError> {
        let wire: MessageWire = self.post_empty("/api/repositories/sync").await?;
        Ok(wire.message)
    }

    async fn clear_context(&self) -> Result<String, ClientError> {
        let wire: MessageWire = self.post_empty("/api/context/clear").await?;
        Ok(wire.message)
    }

    async fn analyze_error(&self, params: AnalyzeErrorParams) -> Result<JobId, ClientError> {
        let wire: JobQueuedWire = self.post_json("/api/xcode/analyze-error", &params).await?;
        Ok(wire.job_id)
    }

    async fn submit_query(&self, params: QueryParams) -> Result<JobId, ClientError> {
        let wire: JobQueuedWire = self.post_json("/api/query", &params).await?;
        Ok(wire.job_id)
    }

    async fn job_snapshot(&self, id: &JobId) -> Result<JobSnapshot, ClientError> {
        let wire: JobWire = self
            .get_json(&format!("/api/job/{}", id.as_str()))
            .await?;
        Ok(snapshot_from_wire(wire))
    }
}

fn transport_error(err: reqwest::Error) -> ClientError {
    ClientError::Transport {
        message: err.to_string(),
    }
}

async fn decode_success<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
    let status = response.status();
    if !status.is_success() {
        let detail = response_detail(response).await;
        return Err(ClientError::Api {
            status: status.as_u16(),
            detail,
        });
    }
    decode_body(response).await
}

async fn decode_body<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
    response.json().await.map_err(|err| ClientError::Decode {
        message: err.to_string(),
    })
}

/// Best-effort error detail: the backend wraps failures as `{"detail": …}`.
async fn response_detail(response: Response) -> String {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    detail_from_body(status, &body)
}

fn detail_from_body(status: StatusCode, body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<Value>(body) {
        if let Some(detail) = value.get("detail").and_then(Value::as_str) {
            return detail.to_owned();
        }
    }
    let trimmed = body.trim();
    if trimmed.is_empty() {
        status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_owned()
    } else {
        trimmed.to_owned()
    }
}

#[derive(Debug, Deserialize)]
struct RepositoryListWire {
    #[serde(default)]
    repositories: Vec<RepositorySummary>,
}

#[derive(Debug, Deserialize)]
struct AddRepositoryWire {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct MessageWire {
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct JobQueuedWire {
    job_id: JobId,
}

#[derive(Debug, Deserialize)]
struct JobWire {
    #[serde(default = "unknown_status")]
    status: JobStatus,
    #[serde(default)]
    result: Option<Value>,
    // Integer percentage while processing, free-text progress note otherwise.
    #[serde(default)]
    progress: Option<Value>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

fn unknown_status() -> JobStatus {
    JobStatus::Unknown
}

fn snapshot_from_wire(wire: JobWire) -> JobSnapshot {
    let progress = wire
        .progress
        .as_ref()
        .and_then(Value::as_u64)
        .map(|pct| u8::try_from(pct.min(100)).unwrap_or(100));
    let progress_note = wire
        .progress
        .as_ref()
        .and_then(Value::as_str)
        .map(std::borrow::ToOwned::to_owned);
    JobSnapshot {
        status: wire.status,
        result: wire.result.map(crate::types::AnalysisResult::from_value),
        progress,
        message: wire.message.or(wire.error).or(progress_note),
    }
}
