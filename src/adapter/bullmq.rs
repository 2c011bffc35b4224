//! Adapter for the advanced backend.
//!
//! The only adapter with logs, job schedulers, and metrics. `empty` maps
//! to the backend's `drain`; both `waiting` and `waiting-children` map
//! to the native `wait` spelling for cleaning.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use crate::backend::{BullMqClient, BullMqJob, SchedulerEntry};
use crate::error::Result;
use crate::protocol::types::{
    AdaptedJob, CleanSupport, FeatureSupport, JobCounts, JobOptions, JobStatus, JobTemplate,
    MetricsKind, MetricsSeries, RepeatSpec, SchedulerInfo,
};
use crate::QueueError;

use super::{
    job_display_name, options_from_value, options_to_value, parse_server_info, BackendKind,
    JobNameFn, QueueAdapter,
};

pub struct BullMqAdapter {
    client: Arc<BullMqClient>,
    name_fn: Option<JobNameFn>,
    supports: FeatureSupport,
}

impl BullMqAdapter {
    pub fn new(client: Arc<BullMqClient>, name_fn: Option<JobNameFn>) -> Self {
        Self {
            client,
            name_fn,
            supports: FeatureSupport {
                statuses: vec![
                    JobStatus::Waiting,
                    JobStatus::WaitingChildren,
                    JobStatus::Active,
                    JobStatus::Completed,
                    JobStatus::Failed,
                    JobStatus::Delayed,
                    JobStatus::Paused,
                    JobStatus::Prioritized,
                ],
                pause: true,
                resume: true,
                clean: CleanSupport::All,
                retry: true,
                promote: true,
                discard: true,
                logs: true,
                schedulers: true,
                flows: true,
                priorities: true,
                empty: true,
                metrics: true,
            },
        }
    }

    fn map_job(&self, job: BullMqJob) -> AdaptedJob {
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
            // This backend does not track retry timestamps
            retried_at: None,
            return_value: job.returnvalue,
            group_id: None,
            progress: Some(job.progress),
            attempts_made: Some(job.attempts_made),
        }
    }

    fn map_scheduler(entry: SchedulerEntry) -> SchedulerInfo {
        SchedulerInfo {
            key: entry.key.clone(),
            name: entry.name,
            id: Some(entry.key),
            pattern: entry.pattern,
            every: entry.every,
            tz: entry.tz,
            next: entry.next_run,
            iteration_count: entry.iteration_count,
            limit: entry.limit,
            template: Some(JobTemplate {
                name: None,
                data: entry.template_data,
                opts: options_from_value(&entry.template_opts),
            }),
        }
    }

    fn native_id(&self, id: &str) -> Result<u64> {
        id.parse::<u64>()
            .map_err(|_| QueueError::job_not_found(id))
    }

    /// Both waiting flavors clean through the native `wait` list.
    fn clean_state(status: JobStatus) -> &'static str {
        match status {
            JobStatus::Waiting | JobStatus::WaitingChildren => "wait",
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
impl QueueAdapter for BullMqAdapter {
    fn backend(&self) -> BackendKind {
        BackendKind::BullMq
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
        self.client.drain();
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
        let raw = self.client.connection_info().await;
        Ok(parse_server_info(&raw))
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

    async fn promote_job(&self, id: &str) -> Result<()> {
        let native = self.native_id(id)?;
        if self.client.get_job(native).is_none() {
            return Err(QueueError::job_not_found(id));
        }
        self.client.promote(native).map_err(QueueError::internal)
    }

    async fn discard_job(&self, id: &str) -> Result<()> {
        let native = self.native_id(id)?;
        self.client
            .discard_job(native)
            .map_err(|_| QueueError::job_not_found(id))
    }

    async fn job_logs(&self, id: &str) -> Result<Option<Vec<String>>> {
        let native = self.native_id(id)?;
        if self.client.get_job(native).is_none() {
            return Err(QueueError::job_not_found(id));
        }
        Ok(Some(self.client.get_job_logs(native)))
    }

    async fn schedulers(&self) -> Result<Vec<SchedulerInfo>> {
        Ok(self
            .client
            .job_schedulers()
            .into_iter()
            .map(Self::map_scheduler)
            .collect())
    }

    async fn add_scheduler(
        &self,
        name: &str,
        repeat: RepeatSpec,
        template: JobTemplate,
    ) -> Result<SchedulerInfo> {
        let entry = self
            .client
            .upsert_job_scheduler(
                name,
                repeat.pattern,
                repeat.every,
                repeat.tz,
                repeat.limit,
                template.name.clone(),
                template.data,
                options_to_value(&template.opts),
            )
            .map_err(QueueError::internal)?;
        Ok(Self::map_scheduler(entry))
    }

    async fn remove_scheduler(&self, key: &str) -> Result<()> {
        if self.client.remove_job_scheduler(key) {
            Ok(())
        } else {
            Err(QueueError::job_not_found(key))
        }
    }

    /// The backend's own `count` field is the number of stored data
    /// points; the true job total is the sum of the buckets.
    async fn metrics(&self, kind: MetricsKind, start: usize, end: usize) -> Result<MetricsSeries> {
        let native_kind = match kind {
            MetricsKind::Completed => "completed",
            MetricsKind::Failed => "failed",
        };
        let raw = self.client.get_metrics(native_kind, start, end);
        let count = raw.data.iter().sum();
        Ok(MetricsSeries {
            kind,
            data: raw.data,
            count,
            start: start as u64,
            end: end as u64,
        })
    }
}
