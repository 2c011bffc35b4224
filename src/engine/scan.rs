//! Exhaustive same-status scanning.
//!
//! No backend offers "all jobs matching a field" as a primitive, so
//! group filters and filter-driven bulk operations materialize the full
//! status partition and filter client-side.

use tracing::debug;

use crate::adapter::QueueAdapter;
use crate::error::Result;
use crate::protocol::types::{AdaptedJob, JobStatus};

/// Fixed batch size for exhaustive scans.
pub const SCAN_BATCH: usize = 1000;

/// Fetch an entire status partition.
///
/// Advances in fixed-size batches and stops when a batch comes back
/// short - never on a total count, which could change mid-scan under
/// concurrent producers. Strictly sequential: each step needs to know
/// the previous batch was full.
pub async fn scan_status(
    adapter: &dyn QueueAdapter,
    status: JobStatus,
) -> Result<Vec<AdaptedJob>> {
    let mut jobs = Vec::new();
    let mut start = 0usize;

    loop {
        let batch = adapter.jobs(status, start, start + SCAN_BATCH - 1).await?;
        let batch_len = batch.len();
        jobs.extend(batch);

        if batch_len < SCAN_BATCH {
            break;
        }
        start += SCAN_BATCH;
    }

    debug!(status = %status, total = jobs.len(), "exhaustive scan finished");
    Ok(jobs)
}
