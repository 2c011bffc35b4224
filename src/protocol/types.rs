//! Core protocol types for dashq.
//!
//! Backend-independent job snapshots, capability descriptors, and the
//! value shapes returned by the query/bulk engine.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Canonical job status vocabulary - superset across all backends.
///
/// Each adapter declares which subset it actually exposes; callers never
/// see backend-native spellings like `wait` or `succeeded`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum JobStatus {
    Waiting,
    WaitingChildren,
    Active,
    Completed,
    Failed,
    Delayed,
    Paused,
    Prioritized,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Waiting => "waiting",
            JobStatus::WaitingChildren => "waiting-children",
            JobStatus::Active => "active",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
            JobStatus::Delayed => "delayed",
            JobStatus::Paused => "paused",
            JobStatus::Prioritized => "prioritized",
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Repeat specification for recurring jobs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepeatSpec {
    /// Cron expression, e.g. "0 3 * * *".
    #[serde(default)]
    pub pattern: Option<String>,
    /// Fixed interval in ms. Mutually exclusive with `pattern`.
    #[serde(default)]
    pub every: Option<u64>,
    #[serde(default)]
    pub tz: Option<String>,
    /// Stop after this many materialized runs.
    #[serde(default)]
    pub limit: Option<u32>,
}

/// Normalized job option bag.
///
/// Known options are typed; anything backend-specific travels through
/// `extra` untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobOptions {
    #[serde(default)]
    pub priority: Option<i32>,
    #[serde(default)]
    pub attempts: Option<u32>,
    #[serde(default)]
    pub delay: Option<u64>,
    #[serde(default)]
    pub lifo: bool,
    #[serde(default)]
    pub repeat: Option<RepeatSpec>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, Value>,
}

/// Backend-independent snapshot of one job.
///
/// Invariants: `created_at` is always set; `finished_at` implies
/// `processed_at`; `failed_reason` implies the job reached failed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdaptedJob {
    pub id: String,
    pub name: String,
    pub data: Value,
    pub opts: JobOptions,
    pub created_at: u64,
    #[serde(default)]
    pub processed_at: Option<u64>,
    #[serde(default)]
    pub finished_at: Option<u64>,
    #[serde(default)]
    pub failed_reason: Option<String>,
    #[serde(default)]
    pub stacktrace: Vec<String>,
    /// Best-effort: only some backends track when a job was retried.
    #[serde(default)]
    pub retried_at: Option<u64>,
    #[serde(default)]
    pub return_value: Option<Value>,
    #[serde(default)]
    pub group_id: Option<String>,
    #[serde(default)]
    pub progress: Option<u8>,
    #[serde(default)]
    pub attempts_made: Option<u32>,
}

/// Sparse status -> count mapping. Absent keys mean zero.
pub type JobCounts = BTreeMap<JobStatus, usize>;

/// Which statuses a backend can bulk-delete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase", tag = "kind", content = "statuses")]
pub enum CleanSupport {
    /// Every supported status can be cleaned.
    All,
    /// Only the listed statuses can be cleaned.
    Statuses(Vec<JobStatus>),
    /// The backend has no clean operation.
    Unsupported,
}

/// Capability descriptor attached to each adapter instance.
///
/// The single source of truth for "is X possible on this queue":
/// status-bearing operations must be validated against it before any
/// backend call is attempted.
#[derive(Debug, Clone, Serialize)]
pub struct FeatureSupport {
    /// Authoritative status set the backend exposes.
    pub statuses: Vec<JobStatus>,
    pub pause: bool,
    pub resume: bool,
    pub clean: CleanSupport,
    pub retry: bool,
    pub promote: bool,
    pub discard: bool,
    pub logs: bool,
    pub schedulers: bool,
    pub flows: bool,
    pub priorities: bool,
    pub empty: bool,
    pub metrics: bool,
}

impl FeatureSupport {
    /// True iff `status` is both exposed by the backend and cleanable.
    pub fn can_clean_status(&self, status: JobStatus) -> bool {
        if !self.statuses.contains(&status) {
            return false;
        }
        match &self.clean {
            CleanSupport::All => true,
            CleanSupport::Statuses(statuses) => statuses.contains(&status),
            CleanSupport::Unsupported => false,
        }
    }

    pub fn has_status(&self, status: JobStatus) -> bool {
        self.statuses.contains(&status)
    }
}

/// Job template a scheduler instantiates on each fire.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobTemplate {
    #[serde(default)]
    pub name: Option<String>,
    pub data: Value,
    #[serde(default)]
    pub opts: JobOptions,
}

/// Recurring-job template descriptor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerInfo {
    pub key: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub pattern: Option<String>,
    #[serde(default)]
    pub every: Option<u64>,
    #[serde(default)]
    pub tz: Option<String>,
    /// Next fire time in epoch ms.
    #[serde(default)]
    pub next: Option<u64>,
    #[serde(default)]
    pub iteration_count: u32,
    #[serde(default)]
    pub limit: Option<u32>,
    #[serde(default)]
    pub template: Option<JobTemplate>,
}

/// Which metric series to fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricsKind {
    Completed,
    Failed,
}

/// Time-bucketed count series.
///
/// `count` is the sum of `data` - re-derived by the adapter, because
/// backend-native metrics report data-point counts, not job counts.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSeries {
    pub kind: MetricsKind,
    pub data: Vec<u64>,
    pub count: u64,
    pub start: u64,
    pub end: u64,
}

/// One page of a windowed job listing.
#[derive(Debug, Clone, Serialize)]
pub struct JobListPage {
    pub total_count: usize,
    pub num_of_pages: usize,
    /// Present only when another page exists.
    pub next_cursor: Option<usize>,
    pub jobs: Vec<AdaptedJob>,
}

/// Aggregate outcome of a best-effort bulk mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BulkActionSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
}
