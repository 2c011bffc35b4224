//! Adapter for the minimal backend.
//!
//! No pause/resume, no clean, no empty, no retry/promote, no logs. The
//! caller-facing `completed` status maps to the backend-native
//! `succeeded` spelling everywhere. Discard aliases to remove. Jobs
//! never carry return values, and the retry timestamp is synthetic.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::backend::{BeeClient, BeeJob, BeePage};
use crate::error::Result;
use crate::protocol::time::now_ms;
use crate::protocol::types::{
    AdaptedJob, CleanSupport, FeatureSupport, JobCounts, JobOptions, JobStatus,
};
use crate::QueueError;

use super::{job_display_name, BackendKind, JobNameFn, QueueAdapter};

pub struct BeeAdapter {
    client: Arc<BeeClient>,
    name_fn: Option<JobNameFn>,
    supports: FeatureSupport,
}

impl BeeAdapter {
    pub fn new(client: Arc<BeeClient>, name_fn: Option<JobNameFn>) -> Self {
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
                ],
                pause: false,
                resume: false,
                clean: CleanSupport::Unsupported,
                retry: false,
                promote: false,
                discard: true,
                logs: false,
                schedulers: false,
                flows: false,
                priorities: false,
                empty: false,
                metrics: false,
            },
        }
    }

    fn map_job(&self, job: BeeJob) -> AdaptedJob {
        AdaptedJob {
            id: job.id,
            name: job_display_name(&self.name_fn, &job.data, "__default__"),
            data: job.data,
            opts: JobOptions {
                attempts: Some(job.retries + 1),
                delay: job.delay_until.map(|until| until.saturating_sub(job.created)),
                ..JobOptions::default()
            },
            created_at: job.created,
            processed_at: job.started_at,
            finished_at: job.ended_at,
            failed_reason: job.failed_reason,
            stacktrace: job.stacktrace,
            // Synthetic: this backend keeps no retry timestamp at all
            retried_at: Some(now_ms()),
            return_value: None,
            group_id: None,
            progress: Some(job.progress),
            attempts_made: None,
        }
    }

    /// `completed` is spelled `succeeded` on this backend.
    fn native_state(status: JobStatus) -> &'static str {
        match status {
            JobStatus::Completed => "succeeded",
            other => other.as_str(),
        }
    }

    fn unsupported(&self, operation: &str) -> QueueError {
        QueueError::unsupported(self.backend(), operation)
    }
}

#[async_trait]
impl QueueAdapter for BeeAdapter {
    fn backend(&self) -> BackendKind {
        BackendKind::Bee
    }

    fn queue_name(&self) -> String {
        self.client.name().to_string()
    }

    fn supports(&self) -> &FeatureSupport {
        &self.supports
    }

    async fn job_counts(&self) -> Result<JobCounts> {
        let health = self.client.check_health();
        let mut counts = JobCounts::new();
        counts.insert(JobStatus::Waiting, health.waiting);
        counts.insert(JobStatus::Active, health.active);
        counts.insert(JobStatus::Completed, health.succeeded);
        counts.insert(JobStatus::Failed, health.failed);
        counts.insert(JobStatus::Delayed, health.delayed);
        Ok(counts)
    }

    async fn is_paused(&self) -> Result<bool> {
        // No pause concept; never paused
        Ok(false)
    }

    async fn pause(&self) -> Result<()> {
        Err(self.unsupported("pausing"))
    }

    async fn resume(&self) -> Result<()> {
        Err(self.unsupported("resuming"))
    }

    async fn empty(&self) -> Result<()> {
        Err(self.unsupported("emptying"))
    }

    async fn clean(&self, _status: JobStatus, _grace_ms: u64) -> Result<()> {
        Err(self.unsupported("cleaning"))
    }

    async fn server_info(&self) -> Result<BTreeMap<String, String>> {
        // Already key/value pairs; nothing to parse
        Ok(self.client.raw_server_info())
    }

    async fn jobs(&self, status: JobStatus, start: usize, end: usize) -> Result<Vec<AdaptedJob>> {
        if !self.supports.has_status(status) {
            return Err(QueueError::unsupported(
                self.backend(),
                format!("listing jobs for status {}", status),
            ));
        }
        let jobs = self
            .client
            .get_jobs(Self::native_state(status), BeePage { start, end });
        Ok(jobs.into_iter().map(|job| self.map_job(job)).collect())
    }

    async fn job(&self, id: &str) -> Result<Option<AdaptedJob>> {
        Ok(self.client.get_job(id).map(|job| self.map_job(job)))
    }

    async fn add_job(&self, data: Value, opts: Option<JobOptions>) -> Result<AdaptedJob> {
        let opts = opts.unwrap_or_default();
        let retries = opts.attempts.map(|attempts| attempts.saturating_sub(1));
        let job = self.client.create_job(data, opts.delay, retries);
        Ok(self.map_job(job))
    }

    async fn remove_job(&self, id: &str) -> Result<()> {
        self.client
            .remove_job(id)
            .map_err(|_| QueueError::job_not_found(id))
    }

    async fn retry_job(&self, _id: &str) -> Result<()> {
        Err(self.unsupported("retrying jobs"))
    }

    async fn promote_job(&self, _id: &str) -> Result<()> {
        Err(self.unsupported("promoting jobs"))
    }

    /// No discard concept distinct from removal.
    async fn discard_job(&self, id: &str) -> Result<()> {
        self.remove_job(id).await
    }
}
