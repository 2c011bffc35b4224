//! Exhaustive scan tests.

use serde_json::json;

use super::bull_fixture;
use crate::engine::{scan_status, SCAN_BATCH};
use crate::protocol::types::JobStatus;

#[tokio::test]
async fn scan_matches_counts_at_quiescence() {
    let (_, adapter) = bull_fixture(250, 40, 9);

    let waiting = scan_status(&adapter, JobStatus::Waiting).await.unwrap();
    assert_eq!(waiting.len(), 250);
    let completed = scan_status(&adapter, JobStatus::Completed).await.unwrap();
    assert_eq!(completed.len(), 40);
    let failed = scan_status(&adapter, JobStatus::Failed).await.unwrap();
    assert_eq!(failed.len(), 9);
}

#[tokio::test]
async fn scan_crosses_batch_boundaries() {
    // 2.5 batches: two full fetches then a short one terminates the loop
    let (client, adapter) = bull_fixture(0, 0, 0);
    let total = SCAN_BATCH * 2 + SCAN_BATCH / 2;
    for i in 0..total {
        client.add(None, json!({"n": i}), json!({}));
    }

    let jobs = scan_status(&adapter, JobStatus::Waiting).await.unwrap();
    assert_eq!(jobs.len(), total);
}

#[tokio::test]
async fn scan_handles_exact_batch_multiple() {
    // A full final batch forces one extra (empty) fetch to terminate
    let (client, adapter) = bull_fixture(0, 0, 0);
    for i in 0..SCAN_BATCH {
        client.add(None, json!({"n": i}), json!({}));
    }

    let jobs = scan_status(&adapter, JobStatus::Waiting).await.unwrap();
    assert_eq!(jobs.len(), SCAN_BATCH);
}

#[tokio::test]
async fn scan_of_empty_partition_is_empty() {
    let (_, adapter) = bull_fixture(5, 0, 0);
    let jobs = scan_status(&adapter, JobStatus::Delayed).await.unwrap();
    assert!(jobs.is_empty());
}
