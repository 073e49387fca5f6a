//! Polling of a single tracked backend job until it reaches a terminal state.
//!
//! The first poll is immediate; every non-terminal (or unrecognized)
//! observation schedules the next poll after a fixed delay, so cadence drifts
//! with round-trip latency by design. Transport failures are swallowed and
//! retried by default — the original dashboard behavior — but the policy is
//! explicit configuration here, and an optional attempt budget turns a stuck
//! job into a `TimedOut` outcome distinct from `Failed`.

use std::time::Duration;

use tokio_util::sync::CancellationToken;

use xcodedash_client::error::ClientError;
use xcodedash_client::service::ApiClient;
use xcodedash_client::types::{AnalysisResult, JobId, JobStatus};

/// Fixed delay between job polls.
pub const JOB_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Polling policy for one tracked job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobPollConfig {
    /// Delay between observations.
    pub poll_interval: Duration,
    /// Attempt budget; `None` polls forever, matching the backend dashboard's
    /// original contract.
    pub max_attempts: Option<u32>,
    /// Whether a transport failure counts as a non-terminal observation and
    /// polling continues. Disabling surfaces the error instead.
    pub retry_on_transport: bool,
}

impl Default for JobPollConfig {
    fn default() -> Self {
        Self {
            poll_interval: JOB_POLL_INTERVAL,
            max_attempts: None,
            retry_on_transport: true,
        }
    }
}

/// Terminal outcome of tracking a job.
#[derive(Debug, Clone, PartialEq)]
pub enum JobOutcome {
    /// The backend reported `completed`; a missing result renders empty.
    Completed(AnalysisResult),
    /// The backend reported `failed`, with whatever detail it gave.
    Failed { message: Option<String> },
    /// The attempt budget ran out before a terminal status.
    TimedOut { attempts: u32 },
    /// The tracking token was cancelled, usually by a newer job.
    Cancelled,
}

/// Poll `job_id` until terminal, cancelled, or out of attempts.
///
/// Errors are returned only for non-transport failures, or for transport
/// failures when `retry_on_transport` is off.
pub async fn track_job<C: ApiClient + ?Sized>(
    client: &C,
    job_id: &JobId,
    config: &JobPollConfig,
    cancel: &CancellationToken,
) -> Result<JobOutcome, ClientError> {
    let mut attempts: u32 = 0;
    loop {
        if cancel.is_cancelled() {
            return Ok(JobOutcome::Cancelled);
        }
        attempts = attempts.saturating_add(1);
        match client.job_snapshot(job_id).await {
            Ok(snapshot) => match snapshot.status {
                JobStatus::Completed => {
                    let result = snapshot.result.unwrap_or_default();
                    return Ok(JobOutcome::Completed(result));
                }
                JobStatus::Failed => {
                    return Ok(JobOutcome::Failed {
                        message: snapshot.message,
                    });
                }
                status => {
                    tracing::debug!(job = %job_id, %status, attempts, "job still in flight");
                }
            },
            Err(err) if err.is_transport() && config.retry_on_transport => {
                tracing::warn!(job = %job_id, error = %err, "transport failure while polling; retrying");
            }
            Err(err) => return Err(err),
        }
        if let Some(max) = config.max_attempts {
            if attempts >= max {
                return Ok(JobOutcome::TimedOut { attempts });
            }
        }
        tokio::select! {
            biased;
            () = cancel.cancelled() => return Ok(JobOutcome::Cancelled),
            () = tokio::time::sleep(config.poll_interval) => {}
        }
    }
}

/// Handle for one tracked job.
#[derive(Debug, Clone)]
pub struct ActiveJob {
    pub job_id: JobId,
    pub generation: u64,
    pub cancel: CancellationToken,
}

/// Single-slot owner of the "current job".
///
/// Starting a new job cancels the token held by any in-flight poll loop and
/// bumps the generation; late outcomes from a superseded generation must be
/// discarded by the caller.
#[derive(Debug, Default)]
pub struct JobTracker {
    active: Option<ActiveJob>,
    generation: u64,
}

impl JobTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Begin tracking `job_id`, abandoning any previous job.
    pub fn start(&mut self, job_id: JobId) -> ActiveJob {
        if let Some(previous) = self.active.take() {
            previous.cancel.cancel();
        }
        self.generation += 1;
        let handle = ActiveJob {
            job_id,
            generation: self.generation,
            cancel: CancellationToken::new(),
        };
        self.active = Some(handle.clone());
        handle
    }

    /// Cancel the current job without starting a new one.
    pub fn cancel_active(&mut self) {
        if let Some(active) = self.active.take() {
            active.cancel.cancel();
        }
    }

    /// Whether an outcome from `generation` is still the one to render.
    #[must_use]
    pub fn is_current(&self, generation: u64) -> bool {
        self.active
            .as_ref()
            .is_some_and(|active| active.generation == generation)
    }

    #[must_use]
    pub fn active(&self) -> Option<&ActiveJob> {
        self.active.as_ref()
    }
}
