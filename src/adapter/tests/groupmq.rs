//! Group-partitioned adapter tests: group ids, queue-level retry and
//! promote, restricted clean.

use std::sync::Arc;

use serde_json::json;

use crate::adapter::{GroupMqAdapter, QueueAdapter};
use crate::backend::GroupMqClient;
use crate::protocol::types::{JobOptions, JobStatus};
use crate::ErrorKind;

fn setup() -> (Arc<GroupMqClient>, GroupMqAdapter) {
    let client = Arc::new(GroupMqClient::new("invoices"));
    let adapter = GroupMqAdapter::new(client.clone(), None);
    (client, adapter)
}

fn with_group(group: &str) -> JobOptions {
    JobOptions {
        extra: [("group".to_string(), json!(group))].into_iter().collect(),
        ..JobOptions::default()
    }
}

#[tokio::test]
async fn group_rides_in_on_the_option_bag() {
    let (_, adapter) = setup();
    let job = adapter
        .add_job(json!({"invoice": 7}), Some(with_group("tenant-a")))
        .await
        .unwrap();
    assert_eq!(job.group_id.as_deref(), Some("tenant-a"));
    // The group key is consumed, not passed through as an opt
    assert!(!job.opts.extra.contains_key("group"));
}

#[tokio::test]
async fn ungrouped_jobs_get_a_generated_group() {
    let (_, adapter) = setup();
    let job = adapter.add_job(json!({}), None).await.unwrap();
    let group = job.group_id.expect("group is always assigned");
    assert!(!group.is_empty());

    // Distinct jobs get distinct generated groups
    let other = adapter.add_job(json!({}), None).await.unwrap();
    assert_ne!(Some(group), other.group_id);
}

#[tokio::test]
async fn waiting_spans_group_lanes_in_creation_order() {
    let (_, adapter) = setup();
    adapter
        .add_job(json!({"n": 1}), Some(with_group("a")))
        .await
        .unwrap();
    adapter
        .add_job(json!({"n": 2}), Some(with_group("b")))
        .await
        .unwrap();
    adapter
        .add_job(json!({"n": 3}), Some(with_group("a")))
        .await
        .unwrap();

    let jobs = adapter.jobs(JobStatus::Waiting, 0, 9).await.unwrap();
    assert_eq!(jobs.len(), 3);
    // Lane a drains fully before lane b
    let groups: Vec<_> = jobs.iter().filter_map(|j| j.group_id.as_deref()).collect();
    assert_eq!(groups, vec!["a", "a", "b"]);
}

#[tokio::test]
async fn queue_level_retry_returns_job_to_its_lane() {
    let (client, adapter) = setup();
    let job = adapter
        .add_job(json!({}), Some(with_group("a")))
        .await
        .unwrap();
    let native: u64 = job.id.parse().unwrap();
    client.take_next().unwrap();
    client.fail(native, "boom", vec![]).unwrap();

    adapter.retry_job(&job.id).await.unwrap();

    let counts = adapter.job_counts().await.unwrap();
    assert_eq!(counts.get(&JobStatus::Failed), Some(&0));
    assert_eq!(counts.get(&JobStatus::Waiting), Some(&1));
    let retried = adapter.job(&job.id).await.unwrap().unwrap();
    assert_eq!(retried.group_id.as_deref(), Some("a"));
    // No retry timestamp on this backend
    assert!(retried.retried_at.is_none());
}

#[tokio::test]
async fn queue_level_promote_moves_delayed_into_lane() {
    let (_, adapter) = setup();
    let job = adapter
        .add_job(
            json!({}),
            Some(JobOptions {
                delay: Some(60_000),
                extra: [("group".to_string(), json!("a"))].into_iter().collect(),
                ..JobOptions::default()
            }),
        )
        .await
        .unwrap();

    adapter.promote_job(&job.id).await.unwrap();

    let counts = adapter.job_counts().await.unwrap();
    assert_eq!(counts.get(&JobStatus::Delayed), Some(&0));
    assert_eq!(counts.get(&JobStatus::Waiting), Some(&1));
}

#[tokio::test]
async fn clean_only_covers_terminal_statuses() {
    let (client, adapter) = setup();
    assert!(adapter
        .supports()
        .can_clean_status(JobStatus::Completed));
    assert!(!adapter.supports().can_clean_status(JobStatus::Waiting));

    let err = adapter.clean(JobStatus::Waiting, 0).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnsupportedOperation);

    // Cleaning a supported status works
    let job = adapter.add_job(json!({}), None).await.unwrap();
    let native: u64 = job.id.parse().unwrap();
    client.take_next().unwrap();
    client.complete(native, json!(null)).unwrap();
    adapter.clean(JobStatus::Completed, 0).await.unwrap();
    let counts = adapter.job_counts().await.unwrap();
    assert_eq!(counts.get(&JobStatus::Completed), Some(&0));
}

#[tokio::test]
async fn empty_is_unsupported() {
    let (_, adapter) = setup();
    let err = adapter.empty().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnsupportedOperation);
    assert!(err.to_string().contains("groupmq"));
}

#[tokio::test]
async fn discard_aliases_to_remove() {
    let (_, adapter) = setup();
    let job = adapter.add_job(json!({}), None).await.unwrap();
    adapter.discard_job(&job.id).await.unwrap();
    assert!(adapter.job(&job.id).await.unwrap().is_none());
}

#[tokio::test]
async fn pause_parks_new_jobs() {
    let (_, adapter) = setup();
    adapter.pause().await.unwrap();
    adapter.add_job(json!({}), None).await.unwrap();

    let counts = adapter.job_counts().await.unwrap();
    assert_eq!(counts.get(&JobStatus::Paused), Some(&1));
    assert_eq!(counts.get(&JobStatus::Waiting), Some(&0));

    adapter.resume().await.unwrap();
    let counts = adapter.job_counts().await.unwrap();
    assert_eq!(counts.get(&JobStatus::Waiting), Some(&1));
}
