//! Windowed job listing.

use crate::adapter::QueueAdapter;
use crate::error::Result;
use crate::protocol::types::{AdaptedJob, JobListPage, JobStatus};

use super::scan::scan_status;

/// One page of jobs in `status`, with totals fetched independently of
/// the page itself.
///
/// `next_cursor` is present only while another page exists; the terminal
/// page leaves it unset.
pub async fn list_jobs(
    adapter: &dyn QueueAdapter,
    status: JobStatus,
    cursor: usize,
    limit: usize,
) -> Result<JobListPage> {
    let limit = limit.max(1);
    let jobs = adapter.jobs(status, cursor, cursor + limit - 1).await?;
    let counts = adapter.job_counts().await?;
    let total_count = counts.get(&status).copied().unwrap_or(0);

    Ok(page_from(jobs, total_count, cursor, limit))
}

/// Group-filtered listing: materialize the whole partition, filter by
/// group equality, then apply the same windowing arithmetic over the
/// filtered set.
pub async fn list_jobs_by_group(
    adapter: &dyn QueueAdapter,
    status: JobStatus,
    group_id: &str,
    cursor: usize,
    limit: usize,
) -> Result<JobListPage> {
    let limit = limit.max(1);
    let matching: Vec<_> = scan_status(adapter, status)
        .await?
        .into_iter()
        .filter(|job| job.group_id.as_deref() == Some(group_id))
        .collect();

    let total_count = matching.len();
    let jobs = matching
        .into_iter()
        .skip(cursor)
        .take(limit)
        .collect();
    Ok(page_from(jobs, total_count, cursor, limit))
}

fn page_from(jobs: Vec<AdaptedJob>, total_count: usize, cursor: usize, limit: usize) -> JobListPage {
    let num_of_pages = total_count.div_ceil(limit);
    let next_cursor = if cursor + limit < total_count {
        Some(cursor + limit)
    } else {
        None
    };
    JobListPage {
        total_count,
        num_of_pages,
        next_cursor,
        jobs,
    }
}
