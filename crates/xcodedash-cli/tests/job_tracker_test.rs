#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::time::Duration;

use serde_json::json;
use tokio_util::sync::CancellationToken;

use xcodedash_cli::job_tracker::{track_job, JobOutcome, JobPollConfig, JobTracker};
use xcodedash_client::error::ClientError;
use xcodedash_client::mock::{
    completed_snapshot, failed_snapshot, processing_snapshot, transport_error, MockApiClient,
};
use xcodedash_client::types::JobId;

fn fast_config() -> JobPollConfig {
    JobPollConfig {
        poll_interval: Duration::from_millis(5),
        ..JobPollConfig::default()
    }
}

fn job() -> JobId {
    JobId("job-1".to_owned())
}

// ── terminal transitions ──

#[tokio::test]
async fn polls_until_the_completed_observation() {
    let client = MockApiClient::new().with_job_script(vec![
        Ok(processing_snapshot()),
        Ok(processing_snapshot()),
        Ok(completed_snapshot(json!({
            "collaborative_analysis": "Use a weak reference"
        }))),
    ]);

    let outcome = track_job(&client, &job(), &fast_config(), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(client.job_poll_count(), 3);
    match outcome {
        JobOutcome::Completed(result) => {
            assert_eq!(
                result.collaborative_analysis.as_deref(),
                Some("Use a weak reference")
            );
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
}

#[tokio::test]
async fn failed_jobs_surface_the_backend_message() {
    let client = MockApiClient::new()
        .with_job_script(vec![Ok(failed_snapshot(Some("model quota exceeded")))]);

    let outcome = track_job(&client, &job(), &fast_config(), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(
        outcome,
        JobOutcome::Failed {
            message: Some("model quota exceeded".to_owned()),
        }
    );
}

#[tokio::test]
async fn completed_without_a_result_yields_an_empty_result() {
    let client = MockApiClient::new().with_job_script(vec![Ok(xcodedash_client::types::JobSnapshot {
        status: xcodedash_client::types::JobStatus::Completed,
        result: None,
        progress: None,
        message: None,
    })]);

    let outcome = track_job(&client, &job(), &fast_config(), &CancellationToken::new())
        .await
        .unwrap();

    match outcome {
        JobOutcome::Completed(result) => {
            assert!(result.collaborative_analysis.is_none());
            assert!(result.code_sections.is_none());
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
}

// ── transport policy ──

#[tokio::test]
async fn transport_failures_are_retried_by_default() {
    let client = MockApiClient::new().with_job_script(vec![
        Err(transport_error("connection refused")),
        Err(transport_error("connection refused")),
        Ok(completed_snapshot(json!({"gemini_analysis": "done"}))),
    ]);

    let outcome = track_job(&client, &job(), &fast_config(), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(client.job_poll_count(), 3);
    assert!(matches!(outcome, JobOutcome::Completed(_)));
}

#[tokio::test]
async fn transport_failures_are_fatal_when_retry_is_off() {
    let client = MockApiClient::new()
        .with_job_script(vec![Err(transport_error("connection refused"))]);
    let config = JobPollConfig {
        retry_on_transport: false,
        ..fast_config()
    };

    let err = track_job(&client, &job(), &config, &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(err.is_transport());
    assert_eq!(client.job_poll_count(), 1);
}

#[tokio::test]
async fn non_transport_errors_always_stop_tracking() {
    let client = MockApiClient::new().with_job_script(vec![Err(ClientError::Api {
        status: 500,
        detail: "internal error".to_owned(),
    })]);

    let err = track_job(&client, &job(), &fast_config(), &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(!err.is_transport());
    assert_eq!(client.job_poll_count(), 1);
}

// ── attempt budget ──

#[tokio::test]
async fn a_stuck_job_times_out_at_the_attempt_budget() {
    let client = MockApiClient::new();
    let config = JobPollConfig {
        max_attempts: Some(4),
        ..fast_config()
    };

    let outcome = track_job(&client, &job(), &config, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(outcome, JobOutcome::TimedOut { attempts: 4 });
    assert_eq!(client.job_poll_count(), 4);
}

#[tokio::test]
async fn an_unbounded_stuck_job_keeps_polling_without_an_outcome() {
    let client = std::sync::Arc::new(MockApiClient::new());
    let cancel = CancellationToken::new();

    let poll_client = std::sync::Arc::clone(&client);
    let poll_cancel = cancel.clone();
    let handle = tokio::spawn(async move {
        let config = JobPollConfig {
            poll_interval: Duration::from_millis(5),
            ..JobPollConfig::default()
        };
        track_job(poll_client.as_ref(), &JobId("job-1".to_owned()), &config, &poll_cancel).await
    });

    tokio::time::sleep(Duration::from_millis(40)).await;
    assert!(!handle.is_finished());
    assert!(client.job_poll_count() >= 3);

    cancel.cancel();
    assert_eq!(handle.await.unwrap().unwrap(), JobOutcome::Cancelled);
}

// ── cancellation ──

#[tokio::test]
async fn a_pre_cancelled_token_never_polls() {
    let client = MockApiClient::new();
    let cancel = CancellationToken::new();
    cancel.cancel();

    let outcome = track_job(&client, &job(), &fast_config(), &cancel)
        .await
        .unwrap();

    assert_eq!(outcome, JobOutcome::Cancelled);
    assert_eq!(client.job_poll_count(), 0);
}

#[tokio::test]
async fn starting_a_second_job_stops_the_first_poll_loop() {
    let client = std::sync::Arc::new(MockApiClient::new());
    let mut tracker = JobTracker::new();
    let first = tracker.start(JobId("job-1".to_owned()));

    let poll_client = std::sync::Arc::clone(&client);
    let handle = tokio::spawn(async move {
        let config = JobPollConfig {
            poll_interval: Duration::from_millis(5),
            ..JobPollConfig::default()
        };
        track_job(poll_client.as_ref(), &first.job_id, &config, &first.cancel).await
    });

    tokio::time::sleep(Duration::from_millis(20)).await;
    let second = tracker.start(JobId("job-2".to_owned()));

    let outcome = handle.await.unwrap().unwrap();
    assert_eq!(outcome, JobOutcome::Cancelled);
    assert!(tracker.is_current(second.generation));
}

#[tokio::test]
async fn cancelling_mid_flight_stops_the_loop() {
    let client = std::sync::Arc::new(MockApiClient::new());
    let cancel = CancellationToken::new();

    let poll_client = std::sync::Arc::clone(&client);
    let poll_cancel = cancel.clone();
    let handle = tokio::spawn(async move {
        let config = JobPollConfig {
            poll_interval: Duration::from_millis(5),
            ..JobPollConfig::default()
        };
        track_job(poll_client.as_ref(), &JobId("job-1".to_owned()), &config, &poll_cancel).await
    });

    tokio::time::sleep(Duration::from_millis(20)).await;
    cancel.cancel();
    let outcome = handle.await.unwrap().unwrap();

    assert_eq!(outcome, JobOutcome::Cancelled);
    assert!(client.job_poll_count() >= 1);
}
