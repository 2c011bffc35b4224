//! Windowed listing tests.

use std::collections::HashSet;

use super::{bull_fixture, groupmq_fixture};
use crate::engine::{list_jobs, list_jobs_by_group};
use crate::protocol::types::JobStatus;

#[tokio::test]
async fn distinct_counts_per_status() {
    // 7 completed and 13 failed: distinct counts catch status mixups
    let (_, adapter) = bull_fixture(0, 7, 13);

    let completed = list_jobs(&adapter, JobStatus::Completed, 0, 10).await.unwrap();
    assert_eq!(completed.total_count, 7);
    assert_eq!(completed.jobs.len(), 7);
    assert_eq!(completed.num_of_pages, 1);
    assert!(completed.next_cursor.is_none());

    let failed = list_jobs(&adapter, JobStatus::Failed, 0, 10).await.unwrap();
    assert_eq!(failed.total_count, 13);
    assert_eq!(failed.jobs.len(), 10);
    assert_eq!(failed.num_of_pages, 2);
    assert_eq!(failed.next_cursor, Some(10));
}

#[tokio::test]
async fn paging_to_the_end_yields_every_job_once() {
    let (_, adapter) = bull_fixture(37, 0, 0);

    for limit in [1usize, 3, 7, 10, 37, 100] {
        let mut seen = HashSet::new();
        let mut fetched = 0usize;
        let mut cursor = Some(0usize);

        while let Some(at) = cursor {
            let page = list_jobs(&adapter, JobStatus::Waiting, at, limit).await.unwrap();
            assert_eq!(page.total_count, 37);
            for job in &page.jobs {
                // No duplicates across pages
                assert!(seen.insert(job.id.clone()), "duplicate at limit {}", limit);
            }
            fetched += page.jobs.len();
            cursor = page.next_cursor;
        }

        // No gaps either
        assert_eq!(fetched, 37, "gap at limit {}", limit);
    }
}

#[tokio::test]
async fn terminal_page_has_no_next_cursor() {
    let (_, adapter) = bull_fixture(10, 0, 0);

    let page = list_jobs(&adapter, JobStatus::Waiting, 0, 10).await.unwrap();
    assert!(page.next_cursor.is_none());

    let page = list_jobs(&adapter, JobStatus::Waiting, 5, 5).await.unwrap();
    assert!(page.next_cursor.is_none());
    assert_eq!(page.jobs.len(), 5);
}

#[tokio::test]
async fn empty_status_lists_cleanly() {
    let (_, adapter) = bull_fixture(0, 0, 0);
    let page = list_jobs(&adapter, JobStatus::Failed, 0, 10).await.unwrap();
    assert_eq!(page.total_count, 0);
    assert_eq!(page.num_of_pages, 0);
    assert!(page.jobs.is_empty());
    assert!(page.next_cursor.is_none());
}

#[tokio::test]
async fn group_filtered_listing_windows_the_filtered_set() {
    let (_, adapter) = groupmq_fixture(&["a", "b"], 12);

    let page = list_jobs_by_group(&adapter, JobStatus::Waiting, "a", 0, 5).await.unwrap();
    // total_count is the filtered set's size, not the partition's
    assert_eq!(page.total_count, 12);
    assert_eq!(page.num_of_pages, 3);
    assert_eq!(page.jobs.len(), 5);
    assert_eq!(page.next_cursor, Some(5));
    assert!(page.jobs.iter().all(|j| j.group_id.as_deref() == Some("a")));

    let last = list_jobs_by_group(&adapter, JobStatus::Waiting, "a", 10, 5).await.unwrap();
    assert_eq!(last.jobs.len(), 2);
    assert!(last.next_cursor.is_none());
}

#[tokio::test]
async fn group_filter_with_no_matches_is_empty() {
    let (_, adapter) = groupmq_fixture(&["a"], 3);
    let page = list_jobs_by_group(&adapter, JobStatus::Waiting, "zzz", 0, 10).await.unwrap();
    assert_eq!(page.total_count, 0);
    assert!(page.jobs.is_empty());
}
