//! Adapter for the baseline single-node backend.
//!
//! Full pause/clean/empty support, retry and discard but no promote, no
//! logs/schedulers/metrics. The caller-facing `waiting` status maps to
//! the backend-native `wait` spelling for cleaning only.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use crate::backend::{BullClient, BullJob};
use crate::error::Result;
use crate::protocol::types::{
    AdaptedJob, CleanSupport, FeatureSupport, JobCounts, JobOptions, JobStatus,
};
use crate::QueueError;

use super::{
    job_display_name, options_from_value, options_to_value, parse_server_info, BackendKind,
    JobNameFn, QueueAdapter,
};

pub struct BullAdapter {
    client: Arc<BullClient>,
    name_fn: Option<JobNameFn>,
    supports: FeatureSupport,
}

impl BullAdapter {
    pub fn new(client: Arc<BullClient>, name_fn: Option<JobNameFn>) -> Self {
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
                clean: CleanSupport::All,
                retry: true,
                promote: false,
                discard: true,
                logs: false,
                schedulers: false,
                flows: false,
                priorities: true,
                empty: true,
                metrics: false,
            },
        }
    }

    fn map_job(&self, job: BullJob) -> AdaptedJob {
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
            // Non-standard backend field; best-effort metadata
            retried_at: job.retried_on,
            return_value: job.returnvalue,
            group_id: None,
            progress: None,
            attempts_made: Some(job.attempts_made),
        }
    }

    /// Resolve a contract id to the backend's numeric id. Unparsable ids
    /// behave as not-found.
    fn native_id(&self, id: &str) -> Result<u64> {
        id.parse::<u64>()
            .map_err(|_| QueueError::job_not_found(id))
    }

    /// Status spelling for reads: the client accepts the caller alias.
    fn read_state(status: JobStatus) -> &'static str {
        status.as_str()
    }

    /// Status spelling for cleaning: `waiting` becomes native `wait`.
    fn clean_state(status: JobStatus) -> &'static str {
        match status {
            JobStatus::Waiting => "wait",
            other => other.as_str(),
        }
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
impl QueueAdapter for BullAdapter {
    fn backend(&self) -> BackendKind {
        BackendKind::Bull
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
        self.client.empty();
        Ok(())
    }

    async fn clean(&self, status: JobStatus, grace_ms: u64) -> Result<()> {
        self.require_status(status, "clean")?;
        let removed = self
            .client
            .clean(Self::clean_state(status), grace_ms)
            .map_err(QueueError::internal)?;
        debug!(queue = %self.client.name(), status = %status, removed = removed.len(), "cleaned jobs");
        Ok(())
    }

    async fn server_info(&self) -> Result<BTreeMap<String, String>> {
        Ok(parse_server_info(&self.client.client_info()))
    }

    async fn jobs(&self, status: JobStatus, start: usize, end: usize) -> Result<Vec<AdaptedJob>> {
        self.require_status(status, "listing jobs")?;
        let jobs = self.client.jobs_in_state(Self::read_state(status), start, end);
        Ok(jobs.into_iter().map(|job| self.map_job(job)).collect())
    }

    async fn job(&self, id: &str) -> Result<Option<AdaptedJob>> {
        let Ok(native) = id.parse::<u64>() else {
            return Ok(None);
        };
        Ok(self.client.get_job(native).map(|job| self.map_job(job)))
    }

    async fn add_job(&self, data: Value, opts: Option<JobOptions>) -> Result<AdaptedJob> {
        let raw_opts = options_to_value(&opts.unwrap_or_default());
        let job = self.client.add(None, data, raw_opts);
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

    async fn promote_job(&self, _id: &str) -> Result<()> {
        Err(QueueError::unsupported(self.backend(), "promoting jobs"))
    }

    async fn discard_job(&self, id: &str) -> Result<()> {
        let native = self.native_id(id)?;
        self.client
            .discard_job(native)
            .map_err(|_| QueueError::job_not_found(id))
    }
}
