//! Bulk mutations.
//!
//! One uniform policy: capability and lookup pre-flight failures abort
//! the whole call; once per-item work starts, every item succeeds or
//! fails independently and only aggregate counts are reported.

use std::collections::HashSet;

use futures::future::join_all;
use tracing::{debug, warn};

use crate::adapter::QueueAdapter;
use crate::error::Result;
use crate::protocol::types::{AdaptedJob, BulkActionSummary, JobStatus};
use crate::QueueError;

use super::scan::scan_status;

/// Remove a set of jobs by id.
///
/// Unlike the other bulk operations the lookup is checked eagerly: one
/// unresolved id fails the entire call before anything is removed.
pub async fn bulk_remove(
    adapter: &dyn QueueAdapter,
    ids: &[String],
) -> Result<Vec<AdaptedJob>> {
    let lookups = join_all(ids.iter().map(|id| adapter.job(id))).await;

    let mut jobs = Vec::with_capacity(ids.len());
    for (id, lookup) in ids.iter().zip(lookups) {
        match lookup? {
            Some(job) => jobs.push(job),
            None => return Err(QueueError::job_not_found(id)),
        }
    }

    let removals = join_all(ids.iter().map(|id| adapter.remove_job(id))).await;
    for removal in removals {
        removal?;
    }
    Ok(jobs)
}

/// Retry a set of jobs by id, best-effort.
pub async fn bulk_retry(adapter: &dyn QueueAdapter, ids: &[String]) -> Result<BulkActionSummary> {
    if !adapter.supports().retry {
        return Err(QueueError::unsupported(adapter.backend(), "retrying jobs"));
    }
    Ok(dispatch(ids, |id| adapter.retry_job(id)).await)
}

/// Retry every job in `status`, optionally narrowed to one group.
///
/// Materializes the candidate set with an exhaustive scan first; no
/// backend can retry "all matching jobs" natively.
pub async fn retry_jobs_by_filter(
    adapter: &dyn QueueAdapter,
    status: JobStatus,
    group_id: Option<&str>,
) -> Result<BulkActionSummary> {
    if !adapter.supports().retry {
        return Err(QueueError::unsupported(adapter.backend(), "retrying jobs"));
    }

    let ids: Vec<String> = scan_status(adapter, status)
        .await?
        .into_iter()
        .filter(|job| match group_id {
            Some(group) => job.group_id.as_deref() == Some(group),
            None => true,
        })
        .map(|job| job.id)
        .collect();

    Ok(dispatch(&ids, |id| adapter.retry_job(id)).await)
}

/// Remove every job belonging to a group, across all supported statuses.
///
/// O(total jobs in the queue): each supported status is scanned
/// exhaustively. Scans run concurrently per status; ids are unioned
/// into a set so a job is only removed once.
pub async fn remove_jobs_by_group(
    adapter: &dyn QueueAdapter,
    group_id: &str,
) -> Result<BulkActionSummary> {
    let statuses = adapter.supports().statuses.clone();
    let scans = join_all(statuses.iter().map(|status| scan_status(adapter, *status))).await;

    let mut ids = HashSet::new();
    for scan in scans {
        for job in scan? {
            if job.group_id.as_deref() == Some(group_id) {
                ids.insert(job.id);
            }
        }
    }

    let ids: Vec<String> = ids.into_iter().collect();
    debug!(group = group_id, candidates = ids.len(), "removing jobs by group");
    Ok(dispatch(&ids, |id| adapter.remove_job(id)).await)
}

/// Fire one operation per id concurrently and collect settled results
/// into aggregate counts. A single bad id never stops the rest.
async fn dispatch<'a, F, Fut>(ids: &'a [String], op: F) -> BulkActionSummary
where
    F: Fn(&'a str) -> Fut,
    Fut: std::future::Future<Output = Result<()>>,
{
    let results = join_all(ids.iter().map(|id| op(id))).await;

    let mut succeeded = 0;
    let mut failed = 0;
    for (id, result) in ids.iter().zip(results) {
        match result {
            Ok(()) => succeeded += 1,
            Err(error) => {
                warn!(job_id = %id, error = %error, "bulk operation item failed");
                failed += 1;
            }
        }
    }
    BulkActionSummary {
        total: ids.len(),
        succeeded,
        failed,
    }
}
