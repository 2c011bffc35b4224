//! Adapter for the group-partitioned backend.
//!
//! The only adapter that surfaces `group_id`. Retry and promote go
//! through queue-level calls, discard aliases to remove, clean covers
//! only completed/failed/delayed, and there is no empty/drain.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use crate::backend::{GroupMqClient, GroupMqJob};
use crate::error::Result;
use crate::protocol::types::{
    AdaptedJob, CleanSupport, FeatureSupport, JobCounts, JobOptions, JobStatus,
};
use crate::QueueError;

use super::{
    job_display_name, options_from_value, options_to_value, parse_server_info, BackendKind,
    JobNameFn, QueueAdapter,
};

/// Option key carrying the group assignment at add time.
const GROUP_OPT_KEY: &str = "group";

pub struct GroupMqAdapter {
    client: Arc<GroupMqClient>,
    name_fn: Option<JobNameFn>,
    supports: FeatureSupport,
}

impl GroupMqAdapter {
    pub fn new(client: Arc<GroupMqClient>, name_fn: Option<JobNameFn>) -> Self {
        Self {
            client,
            name_fn,
            supports: FeatureSupport {
                statuses: vec![
                    JobStatus::Waiting,
                    JobStatus::Active,
                    JobStatus::Completed,
                    JobStatus::Failed,
                    JobStatus::Delayed,
                    JobStatus::Paused,
                ],
                pause: true,
                resume: true,
                clean: CleanSupport::Statuses(vec![
                    JobStatus::Completed,
                    JobStatus::Failed,
                    JobStatus::Delayed,
                ]),
                retry: true,
                promote: true,
                discard: true,
                logs: false,
                schedulers: false,
                flows: false,
                priorities: true,
                empty: false,
                metrics: false,
            },
        }
    }

    fn map_job(&self, job: GroupMqJob) -> AdaptedJob {
        AdaptedJob {
            id: job.id.to_string(),
            name: job_display_name(&self.name_fn, &job.data, &job.name),
            data: job.data,
            opts: options_from_value(&job.opts),
            created_at: job.timestamp,
            processed_at: job.processed_on,
            finished_at: job.finished_on,
            failed_reason: job.failed_reason,
            stacktrace: job.stacktrace,
            retried_at: None,
            return_value: job.returnvalue,
            group_id: Some(job.group_id),
            progress: None,
            attempts_made: Some(job.attempts_made),
        }
    }

    fn native_id(&self, id: &str) -> Result<u64> {
        id.parse::<u64>()
            .map_err(|_| QueueError::job_not_found(id))
    }

    fn require_status(&self, status: JobStatus, operation: &str) -> Result<()> {
        if self.supports.has_status(status) {
            Ok(())
        } else {
            Err(QueueError::unsupported(
                self.backend(),
                format!("{} for status {}", operation, status),
            ))
        }
    }
}

#[async_trait]
impl QueueAdapter for GroupMqAdapter {
    fn backend(&self) -> BackendKind {
        BackendKind::GroupMq
    }

    fn queue_name(&self) -> String {
        self.client.name().to_string()
    }

    fn supports(&self) -> &FeatureSupport {
        &self.supports
    }

    async fn job_counts(&self) -> Result<JobCounts> {
        let native = self.client.counts();
        let mut counts = JobCounts::new();
        for status in &self.supports.statuses {
            if let Some(count) = native.get(status.as_str()) {
                counts.insert(*status, *count);
            }
        }
        Ok(counts)
    }

    async fn is_paused(&self) -> Result<bool> {
        Ok(self.client.is_paused())
    }

    async fn pause(&self) -> Result<()> {
        self.client.pause();
        Ok(())
    }

    async fn resume(&self) -> Result<()> {
        self.client.resume();
        Ok(())
    }

    async fn empty(&self) -> Result<()> {
        Err(QueueError::unsupported(self.backend(), "emptying"))
    }

    async fn clean(&self, status: JobStatus, grace_ms: u64) -> Result<()> {
        if !self.supports.can_clean_status(status) {
            return Err(QueueError::unsupported(
                self.backend(),
                format!("cleaning status {}", status),
            ));
        }
        let removed = self
            .client
            .clean(status.as_str(), grace_ms)
            .map_err(QueueError::internal)?;
        debug!(queue = %self.client.name(), status = %status, removed = removed.len(), "cleaned jobs");
        Ok(())
    }

    async fn server_info(&self) -> Result<BTreeMap<String, String>> {
        Ok(parse_server_info(&self.client.connection_info()))
    }

    async fn jobs(&self, status: JobStatus, start: usize, end: usize) -> Result<Vec<AdaptedJob>> {
        self.require_status(status, "listing jobs")?;
        let jobs = self.client.jobs_in_state(status.as_str(), start, end);
        Ok(jobs.into_iter().map(|job| self.map_job(job)).collect())
    }

    async fn job(&self, id: &str) -> Result<Option<AdaptedJob>> {
        let Ok(native) = id.parse::<u64>() else {
            return Ok(None);
        };
        Ok(self.client.get_job(native).map(|job| self.map_job(job)))
    }

    /// The group assignment rides in on the option bag; the backend
    /// generates a group id when none is given.
    async fn add_job(&self, data: Value, opts: Option<JobOptions>) -> Result<AdaptedJob> {
        let mut opts = opts.unwrap_or_default();
        let group_id = opts
            .extra
            .remove(GROUP_OPT_KEY)
            .and_then(|group| group.as_str().map(str::to_string));
        let raw_opts = options_to_value(&opts);
        let job = self.client.add(None, data, group_id, raw_opts);
        Ok(self.map_job(job))
    }

    async fn remove_job(&self, id: &str) -> Result<()> {
        let native = self.native_id(id)?;
        self.client
            .remove_job(native)
            .map_err(|_| QueueError::job_not_found(id))
    }

    async fn retry_job(&self, id: &str) -> Result<()> {
        let native = self.native_id(id)?;
        if self.client.get_job(native).is_none() {
            return Err(QueueError::job_not_found(id));
        }
        self.client.retry_job(native).map_err(QueueError::internal)
    }

    async fn promote_job(&self, id: &str) -> Result<()> {
        let native = self.native_id(id)?;
        if self.client.get_job(native).is_none() {
            return Err(QueueError::job_not_found(id));
        }
        self.client
            .promote_job(native)
            .map_err(QueueError::internal)
    }

    /// No discard concept distinct from removal.
    async fn discard_job(&self, id: &str) -> Result<()> {
        self.remove_job(id).await
    }
}
