//! Baseline adapter tests: counts, naming, pause, clean spelling, retry
//! stamps.

use std::sync::Arc;

use serde_json::json;

use crate::adapter::{BullAdapter, QueueAdapter};
use crate::backend::BullClient;
use crate::protocol::types::{JobOptions, JobStatus};
use crate::ErrorKind;

fn setup() -> (Arc<BullClient>, BullAdapter) {
    let client = Arc::new(BullClient::new("emails"));
    let adapter = BullAdapter::new(client.clone(), None);
    (client, adapter)
}

#[tokio::test]
async fn add_then_get_roundtrip() {
    let (_, adapter) = setup();
    let data = json!({"to": "ops@example.com", "retries": 3});
    let added = adapter.add_job(data.clone(), None).await.unwrap();

    let fetched = adapter.job(&added.id).await.unwrap().unwrap();
    assert_eq!(fetched.data, data);
    assert!(fetched.created_at > 0);
    assert!(fetched.processed_at.is_none());
    assert!(fetched.finished_at.is_none());
    assert!(fetched.failed_reason.is_none());
}

#[tokio::test]
async fn get_job_not_found_is_none_not_error() {
    let (_, adapter) = setup();
    assert!(adapter.job("424242").await.unwrap().is_none());
    // Unparsable ids behave the same way
    assert!(adapter.job("not-a-number").await.unwrap().is_none());
}

#[tokio::test]
async fn counts_use_caller_facing_spelling() {
    let (client, adapter) = setup();
    for i in 0..3 {
        client.add(None, json!({"i": i}), json!({}));
    }
    client.add(None, json!({"late": true}), json!({"delay": 60000}));

    let counts = adapter.job_counts().await.unwrap();
    assert_eq!(counts.get(&JobStatus::Waiting), Some(&3));
    assert_eq!(counts.get(&JobStatus::Delayed), Some(&1));
    assert_eq!(counts.get(&JobStatus::Completed), Some(&0));
    // Statuses this backend does not expose are simply absent
    assert!(!counts.contains_key(&JobStatus::Prioritized));
}

#[tokio::test]
async fn display_name_prefers_configured_function() {
    let client = Arc::new(BullClient::new("emails"));
    let adapter = BullAdapter::new(
        client.clone(),
        Some(Arc::new(|data: &serde_json::Value| {
            data.get("to")
                .and_then(|v| v.as_str())
                .unwrap_or("unknown")
                .to_string()
        })),
    );

    let job = adapter
        .add_job(json!({"to": "ops@example.com"}), None)
        .await
        .unwrap();
    assert_eq!(job.name, "ops@example.com");
}

#[tokio::test]
async fn default_sentinel_renders_as_default() {
    let (_, adapter) = setup();
    let job = adapter.add_job(json!({}), None).await.unwrap();
    assert_eq!(job.name, "Default");
}

#[tokio::test]
async fn pause_parks_waiting_jobs_and_resume_restores() {
    let (client, adapter) = setup();
    client.add(None, json!({}), json!({}));
    client.add(None, json!({}), json!({}));

    adapter.pause().await.unwrap();
    assert!(adapter.is_paused().await.unwrap());
    let counts = adapter.job_counts().await.unwrap();
    assert_eq!(counts.get(&JobStatus::Paused), Some(&2));
    assert_eq!(counts.get(&JobStatus::Waiting), Some(&0));

    adapter.resume().await.unwrap();
    assert!(!adapter.is_paused().await.unwrap());
    let counts = adapter.job_counts().await.unwrap();
    assert_eq!(counts.get(&JobStatus::Waiting), Some(&2));
}

#[tokio::test]
async fn clean_translates_waiting_to_native_wait() {
    let (client, adapter) = setup();
    client.add(None, json!({}), json!({}));
    client.add(None, json!({}), json!({}));

    // The client itself rejects the caller spelling; the adapter must
    // translate before calling through
    assert!(client.clean("waiting", 0).is_err());
    adapter.clean(JobStatus::Waiting, 0).await.unwrap();

    let counts = adapter.job_counts().await.unwrap();
    assert_eq!(counts.get(&JobStatus::Waiting), Some(&0));
}

#[tokio::test]
async fn retry_moves_failed_job_and_stamps_retried_at() {
    let (client, adapter) = setup();
    let job = client.add(None, json!({}), json!({}));
    let taken = client.take_next().unwrap();
    client.fail(taken.id, "boom", vec!["at worker.rs:1".to_string()]).unwrap();

    adapter.retry_job(&job.id.to_string()).await.unwrap();

    let retried = adapter.job(&job.id.to_string()).await.unwrap().unwrap();
    assert!(retried.retried_at.is_some());
    assert!(retried.failed_reason.is_none());
    let counts = adapter.job_counts().await.unwrap();
    assert_eq!(counts.get(&JobStatus::Failed), Some(&0));
    assert_eq!(counts.get(&JobStatus::Waiting), Some(&1));
}

#[tokio::test]
async fn retry_unknown_id_is_not_found() {
    let (_, adapter) = setup();
    let err = adapter.retry_job("9999").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert!(err.to_string().contains("9999"));
}

#[tokio::test]
async fn promote_is_unsupported_and_names_the_backend() {
    let (client, adapter) = setup();
    client.add(None, json!({}), json!({"delay": 60000}));
    let err = adapter.promote_job("1").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnsupportedOperation);
    assert!(err.to_string().contains("bull"));
}

#[tokio::test]
async fn empty_drains_everything_but_active() {
    let (client, adapter) = setup();
    client.add(None, json!({}), json!({}));
    client.add(None, json!({}), json!({"delay": 60000}));
    let still_waiting = client.add(None, json!({}), json!({}));
    // First waiting job becomes active
    let taken = client.take_next().unwrap();

    adapter.empty().await.unwrap();

    let counts = adapter.job_counts().await.unwrap();
    assert_eq!(counts.get(&JobStatus::Active), Some(&1));
    assert_eq!(counts.get(&JobStatus::Waiting), Some(&0));
    assert_eq!(counts.get(&JobStatus::Delayed), Some(&0));
    // The active job survives; the waiting one is gone entirely
    assert!(adapter.job(&taken.id.to_string()).await.unwrap().is_some());
    assert!(adapter
        .job(&still_waiting.id.to_string())
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn completed_job_carries_return_value() {
    let (client, adapter) = setup();
    let job = client.add(None, json!({}), json!({}));
    client.take_next().unwrap();
    client.complete(job.id, json!({"sent": true})).unwrap();

    let fetched = adapter.job(&job.id.to_string()).await.unwrap().unwrap();
    assert_eq!(fetched.return_value, Some(json!({"sent": true})));
    assert!(fetched.processed_at.is_some());
    assert!(fetched.finished_at.is_some());
}

#[tokio::test]
async fn failed_job_carries_reason_and_stacktrace() {
    let (client, adapter) = setup();
    let job = client.add(None, json!({}), json!({}));
    client.take_next().unwrap();
    client
        .fail(job.id, "connection refused", vec!["at send()".to_string()])
        .unwrap();

    let fetched = adapter.job(&job.id.to_string()).await.unwrap().unwrap();
    assert_eq!(fetched.failed_reason.as_deref(), Some("connection refused"));
    assert_eq!(fetched.stacktrace, vec!["at send()".to_string()]);
    // finished implies processed
    assert!(fetched.processed_at.is_some());
}

#[tokio::test]
async fn opts_passthrough_keeps_unknown_keys() {
    let (_, adapter) = setup();
    let job = adapter
        .add_job(
            json!({}),
            Some(JobOptions {
                priority: Some(5),
                extra: [("backoff".to_string(), json!({"type": "fixed"}))]
                    .into_iter()
                    .collect(),
                ..JobOptions::default()
            }),
        )
        .await
        .unwrap();
    assert_eq!(job.opts.priority, Some(5));
    assert_eq!(job.opts.extra.get("backoff"), Some(&json!({"type": "fixed"})));
}
