//! Queue adapter contract.
//!
//! One `QueueAdapter` hides one backend client behind the common,
//! capability-aware interface. Callers consult `supports()` before
//! invoking status-bearing or optional operations; adapters still refuse
//! unsupported calls with `QueueError::Unsupported` as a backstop.
//!
//! ## Module Organization
//!
//! - `bull.rs` / `bullmq.rs` / `bee.rs` / `groupmq.rs` - per-backend adapters
//! - `factory.rs` - structural backend detection and adapter construction

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use crate::error::Result;
use crate::protocol::types::{
    AdaptedJob, FeatureSupport, JobCounts, JobOptions, JobStatus, JobTemplate, MetricsKind,
    MetricsSeries, RepeatSpec, SchedulerInfo,
};
use crate::QueueError;

mod bee;
mod bull;
mod bullmq;
pub mod factory;
mod groupmq;

#[cfg(test)]
mod tests;

pub use bee::BeeAdapter;
pub use bull::BullAdapter;
pub use bullmq::BullMqAdapter;
pub use groupmq::GroupMqAdapter;

/// Caller-supplied display-name function applied to the job payload.
pub type JobNameFn = Arc<dyn Fn(&Value) -> String + Send + Sync>;

/// Which backend engine an adapter wraps. Used in error messages so
/// operators can see why an action is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Bull,
    BullMq,
    Bee,
    GroupMq,
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            BackendKind::Bull => "bull",
            BackendKind::BullMq => "bullmq",
            BackendKind::Bee => "bee",
            BackendKind::GroupMq => "groupmq",
        };
        f.write_str(name)
    }
}

/// Common contract over one backend queue.
///
/// `jobs(status, start, end)` is the only job-read primitive: there is no
/// "all jobs regardless of status" call on any backend, so anything
/// cross-status is synthesized by the engine on top of this trait.
#[async_trait]
pub trait QueueAdapter: Send + Sync {
    fn backend(&self) -> BackendKind;

    /// Backend-native queue name; the registry key.
    fn queue_name(&self) -> String;

    /// Capability descriptor - the single source of truth for what this
    /// queue can do.
    fn supports(&self) -> &FeatureSupport;

    /// Per-status counts. Unsupported statuses are omitted, never an
    /// error.
    async fn job_counts(&self) -> Result<JobCounts>;

    async fn is_paused(&self) -> Result<bool>;
    async fn pause(&self) -> Result<()>;
    async fn resume(&self) -> Result<()>;

    /// Irreversibly drain all non-active jobs.
    async fn empty(&self) -> Result<()>;

    /// Remove jobs in `status` older than `grace_ms`.
    async fn clean(&self, status: JobStatus, grace_ms: u64) -> Result<()>;

    /// Parsed backend connection/server telemetry.
    async fn server_info(&self) -> Result<BTreeMap<String, String>>;

    /// Inclusive index range fetch within one status partition.
    async fn jobs(&self, status: JobStatus, start: usize, end: usize) -> Result<Vec<AdaptedJob>>;

    /// Not-found is a normal outcome, not an error.
    async fn job(&self, id: &str) -> Result<Option<AdaptedJob>>;

    async fn add_job(&self, data: Value, opts: Option<JobOptions>) -> Result<AdaptedJob>;

    async fn remove_job(&self, id: &str) -> Result<()>;
    async fn retry_job(&self, id: &str) -> Result<()>;
    async fn promote_job(&self, id: &str) -> Result<()>;
    async fn discard_job(&self, id: &str) -> Result<()>;

    /// Ordered log lines, or `None` when the backend has no job logs.
    async fn job_logs(&self, _id: &str) -> Result<Option<Vec<String>>> {
        Ok(None)
    }

    // Scheduler operations: only meaningful when `supports().schedulers`.

    async fn schedulers(&self) -> Result<Vec<SchedulerInfo>> {
        Err(QueueError::unsupported(self.backend(), "job schedulers"))
    }

    async fn add_scheduler(
        &self,
        _name: &str,
        _repeat: RepeatSpec,
        _template: JobTemplate,
    ) -> Result<SchedulerInfo> {
        Err(QueueError::unsupported(self.backend(), "job schedulers"))
    }

    async fn remove_scheduler(&self, _key: &str) -> Result<()> {
        Err(QueueError::unsupported(self.backend(), "job schedulers"))
    }

    /// Time-bucketed metric series. Only meaningful when
    /// `supports().metrics`.
    async fn metrics(&self, _kind: MetricsKind, _start: usize, _end: usize) -> Result<MetricsSeries> {
        Err(QueueError::unsupported(self.backend(), "metrics"))
    }
}

/// Display-name rule shared by all adapters: the configured naming
/// function wins, then the backend-native name, with the `"__default__"`
/// sentinel rendered as `"Default"`.
pub(crate) fn job_display_name(name_fn: &Option<JobNameFn>, data: &Value, native: &str) -> String {
    if let Some(f) = name_fn {
        return f(data);
    }
    if native == "__default__" {
        "Default".to_string()
    } else {
        native.to_string()
    }
}

/// Parse raw CRLF `key:value` INFO text into key/value pairs, skipping
/// section headers.
pub(crate) fn parse_server_info(raw: &str) -> BTreeMap<String, String> {
    let mut out = BTreeMap::new();
    for line in raw.split("\r\n") {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some((key, value)) = line.split_once(':') {
            out.insert(key.to_string(), value.to_string());
        }
    }
    out
}

/// Lift a raw backend option bag into the normalized form. Known keys
/// are typed; everything else passes through `extra`.
pub(crate) fn options_from_value(raw: &Value) -> JobOptions {
    let mut opts = JobOptions {
        priority: raw.get("priority").and_then(Value::as_i64).map(|p| p as i32),
        attempts: raw.get("attempts").and_then(Value::as_u64).map(|a| a as u32),
        delay: raw.get("delay").and_then(Value::as_u64),
        lifo: raw.get("lifo").and_then(Value::as_bool).unwrap_or(false),
        repeat: raw
            .get("repeat")
            .and_then(|r| serde_json::from_value(r.clone()).ok()),
        extra: BTreeMap::new(),
    };
    if let Some(map) = raw.as_object() {
        for (key, value) in map {
            if !matches!(key.as_str(), "priority" | "attempts" | "delay" | "lifo" | "repeat") {
                opts.extra.insert(key.clone(), value.clone());
            }
        }
    }
    opts
}

/// Lower normalized options back into the raw bag a backend expects.
pub(crate) fn options_to_value(opts: &JobOptions) -> Value {
    let mut map = serde_json::Map::new();
    if let Some(priority) = opts.priority {
        map.insert("priority".to_string(), priority.into());
    }
    if let Some(attempts) = opts.attempts {
        map.insert("attempts".to_string(), attempts.into());
    }
    if let Some(delay) = opts.delay {
        map.insert("delay".to_string(), delay.into());
    }
    if opts.lifo {
        map.insert("lifo".to_string(), true.into());
    }
    if let Some(ref repeat) = opts.repeat {
        if let Ok(value) = serde_json::to_value(repeat) {
            map.insert("repeat".to_string(), value);
        }
    }
    for (key, value) in &opts.extra {
        map.insert(key.clone(), value.clone());
    }
    Value::Object(map)
}
