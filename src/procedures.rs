//! Typed procedure surface.
//!
//! Transport-agnostic queries and mutations, one per operation, each
//! taking a request that names its queue and resolving it through the
//! registry before delegating to the adapter or the engine. The host
//! application owns serialization and mounting; nothing here knows
//! about HTTP.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::engine;
use crate::error::Result;
use crate::protocol::types::{
    AdaptedJob, BulkActionSummary, FeatureSupport, JobCounts, JobListPage, JobOptions, JobStatus,
    JobTemplate, MetricsKind, MetricsSeries, RepeatSpec, SchedulerInfo,
};
use crate::registry::{QueueEntry, QueueRegistry};
use crate::{BackendKind, QueueError};

/// Everything the dashboard needs to render one queue tile.
#[derive(Debug, Clone, Serialize)]
pub struct QueueInfo {
    pub name: String,
    pub display_name: String,
    pub backend: BackendKind,
    pub counts: JobCounts,
    pub paused: bool,
    pub supports: FeatureSupport,
}

async fn queue_info(name: &str, entry: &QueueEntry) -> Result<QueueInfo> {
    Ok(QueueInfo {
        name: name.to_string(),
        display_name: entry.display_name.clone(),
        backend: entry.adapter.backend(),
        counts: entry.adapter.job_counts().await?,
        paused: entry.adapter.is_paused().await?,
        supports: entry.adapter.supports().clone(),
    })
}

// ===== Queries =====

/// All registered queues, in registration order.
pub async fn list_queues(registry: &QueueRegistry) -> Result<Vec<QueueInfo>> {
    let mut out = Vec::with_capacity(registry.len());
    for (name, entry) in registry.iter() {
        out.push(queue_info(name, entry).await?);
    }
    Ok(out)
}

#[derive(Debug, Deserialize)]
pub struct QueueRequest {
    pub queue_name: String,
}

pub async fn get_queue(registry: &QueueRegistry, req: QueueRequest) -> Result<QueueInfo> {
    let entry = registry.resolve(&req.queue_name)?;
    queue_info(&req.queue_name, entry).await
}

fn default_limit() -> usize {
    20
}

#[derive(Debug, Deserialize)]
pub struct ListJobsRequest {
    pub queue_name: String,
    pub status: JobStatus,
    #[serde(default)]
    pub cursor: usize,
    #[serde(default = "default_limit")]
    pub limit: usize,
    /// Narrows the listing to one group; forces an exhaustive scan.
    #[serde(default)]
    pub group_id: Option<String>,
}

pub async fn list_jobs(registry: &QueueRegistry, req: ListJobsRequest) -> Result<JobListPage> {
    let entry = registry.resolve(&req.queue_name)?;
    let adapter = entry.adapter.as_ref();
    match req.group_id {
        Some(ref group_id) => {
            engine::list_jobs_by_group(adapter, req.status, group_id, req.cursor, req.limit).await
        }
        None => engine::list_jobs(adapter, req.status, req.cursor, req.limit).await,
    }
}

#[derive(Debug, Deserialize)]
pub struct JobRequest {
    pub queue_name: String,
    pub job_id: String,
}

/// Not-found resolves to `None`, matching the adapter contract.
pub async fn get_job(registry: &QueueRegistry, req: JobRequest) -> Result<Option<AdaptedJob>> {
    let entry = registry.resolve(&req.queue_name)?;
    entry.adapter.job(&req.job_id).await
}

pub async fn get_job_logs(
    registry: &QueueRegistry,
    req: JobRequest,
) -> Result<Option<Vec<String>>> {
    let entry = registry.resolve(&req.queue_name)?;
    entry.adapter.job_logs(&req.job_id).await
}

pub async fn list_schedulers(
    registry: &QueueRegistry,
    req: QueueRequest,
) -> Result<Vec<SchedulerInfo>> {
    let entry = registry.resolve(&req.queue_name)?;
    require(entry, entry.adapter.supports().schedulers, "job schedulers")?;
    entry.adapter.schedulers().await
}

#[derive(Debug, Deserialize)]
pub struct MetricsRequest {
    pub queue_name: String,
    pub kind: MetricsKind,
    #[serde(default)]
    pub start: usize,
    pub end: usize,
}

pub async fn get_metrics(registry: &QueueRegistry, req: MetricsRequest) -> Result<MetricsSeries> {
    let entry = registry.resolve(&req.queue_name)?;
    require(entry, entry.adapter.supports().metrics, "metrics")?;
    entry.adapter.metrics(req.kind, req.start, req.end).await
}

pub async fn get_server_info(
    registry: &QueueRegistry,
    req: QueueRequest,
) -> Result<std::collections::BTreeMap<String, String>> {
    let entry = registry.resolve(&req.queue_name)?;
    entry.adapter.server_info().await
}

// ===== Mutations =====

#[derive(Debug, Deserialize)]
pub struct AddJobRequest {
    pub queue_name: String,
    pub data: Value,
    #[serde(default)]
    pub opts: Option<JobOptions>,
}

pub async fn add_job(registry: &QueueRegistry, req: AddJobRequest) -> Result<AdaptedJob> {
    let entry = registry.resolve(&req.queue_name)?;
    entry.adapter.add_job(req.data, req.opts).await
}

pub async fn pause_queue(registry: &QueueRegistry, req: QueueRequest) -> Result<()> {
    let entry = registry.resolve(&req.queue_name)?;
    require(entry, entry.adapter.supports().pause, "pausing")?;
    entry.adapter.pause().await
}

pub async fn resume_queue(registry: &QueueRegistry, req: QueueRequest) -> Result<()> {
    let entry = registry.resolve(&req.queue_name)?;
    require(entry, entry.adapter.supports().resume, "resuming")?;
    entry.adapter.resume().await
}

pub async fn empty_queue(registry: &QueueRegistry, req: QueueRequest) -> Result<()> {
    let entry = registry.resolve(&req.queue_name)?;
    require(entry, entry.adapter.supports().empty, "emptying")?;
    entry.adapter.empty().await
}

#[derive(Debug, Deserialize)]
pub struct CleanQueueRequest {
    pub queue_name: String,
    pub status: JobStatus,
    pub grace_ms: u64,
}

pub async fn clean_queue(registry: &QueueRegistry, req: CleanQueueRequest) -> Result<()> {
    let entry = registry.resolve(&req.queue_name)?;
    if !entry.adapter.supports().can_clean_status(req.status) {
        return Err(QueueError::unsupported(
            entry.adapter.backend(),
            format!("cleaning status {}", req.status),
        ));
    }
    entry.adapter.clean(req.status, req.grace_ms).await
}

pub async fn retry_job(registry: &QueueRegistry, req: JobRequest) -> Result<()> {
    let entry = registry.resolve(&req.queue_name)?;
    require(entry, entry.adapter.supports().retry, "retrying jobs")?;
    entry.adapter.retry_job(&req.job_id).await
}

pub async fn promote_job(registry: &QueueRegistry, req: JobRequest) -> Result<()> {
    let entry = registry.resolve(&req.queue_name)?;
    require(entry, entry.adapter.supports().promote, "promoting jobs")?;
    entry.adapter.promote_job(&req.job_id).await
}

pub async fn discard_job(registry: &QueueRegistry, req: JobRequest) -> Result<()> {
    let entry = registry.resolve(&req.queue_name)?;
    require(entry, entry.adapter.supports().discard, "discarding jobs")?;
    entry.adapter.discard_job(&req.job_id).await
}

pub async fn remove_job(registry: &QueueRegistry, req: JobRequest) -> Result<()> {
    let entry = registry.resolve(&req.queue_name)?;
    entry.adapter.remove_job(&req.job_id).await
}

#[derive(Debug, Deserialize)]
pub struct BulkJobsRequest {
    pub queue_name: String,
    pub job_ids: Vec<String>,
}

pub async fn bulk_remove_jobs(
    registry: &QueueRegistry,
    req: BulkJobsRequest,
) -> Result<Vec<AdaptedJob>> {
    let entry = registry.resolve(&req.queue_name)?;
    engine::bulk_remove(entry.adapter.as_ref(), &req.job_ids).await
}

pub async fn bulk_retry_jobs(
    registry: &QueueRegistry,
    req: BulkJobsRequest,
) -> Result<BulkActionSummary> {
    let entry = registry.resolve(&req.queue_name)?;
    engine::bulk_retry(entry.adapter.as_ref(), &req.job_ids).await
}

#[derive(Debug, Deserialize)]
pub struct RetryByFilterRequest {
    pub queue_name: String,
    pub status: JobStatus,
    #[serde(default)]
    pub group_id: Option<String>,
}

pub async fn retry_jobs_by_filter(
    registry: &QueueRegistry,
    req: RetryByFilterRequest,
) -> Result<BulkActionSummary> {
    let entry = registry.resolve(&req.queue_name)?;
    engine::retry_jobs_by_filter(entry.adapter.as_ref(), req.status, req.group_id.as_deref())
        .await
}

#[derive(Debug, Deserialize)]
pub struct RemoveByGroupRequest {
    pub queue_name: String,
    pub group_id: String,
}

pub async fn remove_jobs_by_group(
    registry: &QueueRegistry,
    req: RemoveByGroupRequest,
) -> Result<BulkActionSummary> {
    let entry = registry.resolve(&req.queue_name)?;
    engine::remove_jobs_by_group(entry.adapter.as_ref(), &req.group_id).await
}

#[derive(Debug, Deserialize)]
pub struct AddSchedulerRequest {
    pub queue_name: String,
    pub scheduler_name: String,
    pub repeat: RepeatSpec,
    pub template: JobTemplate,
}

pub async fn add_scheduler(
    registry: &QueueRegistry,
    req: AddSchedulerRequest,
) -> Result<SchedulerInfo> {
    let entry = registry.resolve(&req.queue_name)?;
    require(entry, entry.adapter.supports().schedulers, "job schedulers")?;
    entry
        .adapter
        .add_scheduler(&req.scheduler_name, req.repeat, req.template)
        .await
}

#[derive(Debug, Deserialize)]
pub struct RemoveSchedulerRequest {
    pub queue_name: String,
    pub scheduler_key: String,
}

pub async fn remove_scheduler(
    registry: &QueueRegistry,
    req: RemoveSchedulerRequest,
) -> Result<()> {
    let entry = registry.resolve(&req.queue_name)?;
    require(entry, entry.adapter.supports().schedulers, "job schedulers")?;
    entry.adapter.remove_scheduler(&req.scheduler_key).await
}

/// Capability gate: validated before any backend call is attempted.
fn require(entry: &QueueEntry, supported: bool, operation: &str) -> Result<()> {
    if supported {
        Ok(())
    } else {
        Err(QueueError::unsupported(entry.adapter.backend(), operation))
    }
}
