//! Bulk mutation tests: atomic pre-check for removal, best-effort
//! accounting for everything else.

use std::sync::Arc;

use serde_json::json;

use super::{bull_fixture, groupmq_fixture};
use crate::adapter::{BeeAdapter, QueueAdapter};
use crate::backend::BeeClient;
use crate::engine::{bulk_remove, bulk_retry, remove_jobs_by_group, retry_jobs_by_filter};
use crate::protocol::types::JobStatus;
use crate::ErrorKind;

#[tokio::test]
async fn bulk_remove_is_all_or_nothing_on_lookup() {
    let (_, adapter) = bull_fixture(4, 0, 0);
    let mut ids: Vec<String> = (1..=4).map(|id| id.to_string()).collect();
    ids.push("999".to_string());

    let err = bulk_remove(&adapter, &ids).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert!(err.to_string().contains("999"));

    // Atomic pre-check: none of the valid jobs were removed
    let counts = adapter.job_counts().await.unwrap();
    assert_eq!(counts.get(&JobStatus::Waiting), Some(&4));
}

#[tokio::test]
async fn bulk_remove_returns_the_removed_jobs() {
    let (_, adapter) = bull_fixture(3, 0, 0);
    let ids: Vec<String> = (1..=3).map(|id| id.to_string()).collect();

    let removed = bulk_remove(&adapter, &ids).await.unwrap();
    assert_eq!(removed.len(), 3);

    let counts = adapter.job_counts().await.unwrap();
    assert_eq!(counts.get(&JobStatus::Waiting), Some(&0));
}

#[tokio::test]
async fn bulk_retry_counts_failures_without_aborting() {
    // 5 failed jobs, ids 1..=5
    let (_, adapter) = bull_fixture(0, 0, 5);
    let mut ids: Vec<String> = (1..=5).map(|id| id.to_string()).collect();
    ids.push("12345".to_string());

    let summary = bulk_retry(&adapter, &ids).await.unwrap();
    assert_eq!(summary.total, 6);
    assert_eq!(summary.succeeded, 5);
    assert_eq!(summary.failed, 1);

    // The valid jobs really were retried
    let counts = adapter.job_counts().await.unwrap();
    assert_eq!(counts.get(&JobStatus::Failed), Some(&0));
    assert_eq!(counts.get(&JobStatus::Waiting), Some(&5));
}

#[tokio::test]
async fn bulk_retry_gates_capability_before_any_item() {
    let client = Arc::new(BeeClient::new("thumbs"));
    let job = client.create_job(json!({}), None, None);
    let adapter = BeeAdapter::new(client, None);

    let err = bulk_retry(&adapter, &[job.id.clone()]).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnsupportedOperation);
    // Fail-fast: the job was never touched
    assert!(adapter.job(&job.id).await.unwrap().is_some());
}

#[tokio::test]
async fn retry_by_filter_targets_one_status() {
    let (_, adapter) = bull_fixture(3, 2, 4);

    let summary = retry_jobs_by_filter(&adapter, JobStatus::Failed, None).await.unwrap();
    assert_eq!(summary.total, 4);
    assert_eq!(summary.succeeded, 4);
    assert_eq!(summary.failed, 0);

    let counts = adapter.job_counts().await.unwrap();
    assert_eq!(counts.get(&JobStatus::Failed), Some(&0));
    // 3 original waiting + 4 retried
    assert_eq!(counts.get(&JobStatus::Waiting), Some(&7));
    // Completed jobs untouched
    assert_eq!(counts.get(&JobStatus::Completed), Some(&2));
}

#[tokio::test]
async fn retry_by_filter_respects_group() {
    let (client, adapter) = groupmq_fixture(&["a", "b"], 3);
    // Fail every waiting job
    while let Some(job) = client.take_next() {
        client.fail(job.id, "boom", vec![]).unwrap();
    }

    let summary = retry_jobs_by_filter(&adapter, JobStatus::Failed, Some("a")).await.unwrap();
    assert_eq!(summary.total, 3);
    assert_eq!(summary.succeeded, 3);

    let counts = adapter.job_counts().await.unwrap();
    assert_eq!(counts.get(&JobStatus::Failed), Some(&3));
    assert_eq!(counts.get(&JobStatus::Waiting), Some(&3));
}

#[tokio::test]
async fn remove_by_group_spans_statuses_and_dedupes() {
    let (client, adapter) = groupmq_fixture(&["keep", "drop"], 4);
    // Spread the "drop" group across statuses: fail one of its jobs so
    // the scan has to union waiting and failed partitions
    let drop_job = crate::engine::scan_status(&adapter, JobStatus::Waiting)
        .await
        .unwrap()
        .into_iter()
        .find(|j| j.group_id.as_deref() == Some("drop"))
        .unwrap();
    client
        .fail(drop_job.id.parse().unwrap(), "boom", vec![])
        .unwrap();

    let summary = remove_jobs_by_group(&adapter, "drop").await.unwrap();
    assert_eq!(summary.failed, 0);
    assert_eq!(summary.total, summary.succeeded);
    assert_eq!(summary.total, 4);

    // Nothing from the other group was touched
    let remaining = crate::engine::scan_status(&adapter, JobStatus::Waiting).await.unwrap();
    assert!(remaining.iter().all(|j| j.group_id.as_deref() == Some("keep")));
}

#[tokio::test]
async fn remove_by_group_with_no_matches_is_a_clean_zero() {
    let (_, adapter) = groupmq_fixture(&["a"], 2);
    let summary = remove_jobs_by_group(&adapter, "ghost").await.unwrap();
    assert_eq!(summary.total, 0);
    assert_eq!(summary.succeeded, 0);
    assert_eq!(summary.failed, 0);
}
