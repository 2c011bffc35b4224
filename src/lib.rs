//! dashq - inspect and manage background job queues across incompatible
//! backend engines through one capability-aware interface.
//!
//! ## Module Organization
//!
//! - `protocol/` - Shared value types (AdaptedJob, FeatureSupport, ...)
//! - `backend/` - Native queue clients (Bull, BullMQ, Bee, GroupMQ flavors)
//! - `adapter/` - The QueueAdapter contract, per-backend adapters, factory
//! - `registry.rs` - Immutable queue-name -> adapter resolution
//! - `engine/` - Pagination, exhaustive scans, bulk mutations
//! - `procedures.rs` - Transport-agnostic typed procedure surface

pub mod adapter;
pub mod backend;
pub mod engine;
mod error;
pub mod procedures;
pub mod protocol;
mod registry;

pub use adapter::factory::{build_adapter, detect_backend, RawQueueHandle};
pub use adapter::{BackendKind, JobNameFn, QueueAdapter};
pub use error::{ErrorKind, QueueError, Result};
pub use protocol::types::{
    AdaptedJob, BulkActionSummary, CleanSupport, FeatureSupport, JobCounts, JobListPage,
    JobOptions, JobStatus, JobTemplate, MetricsKind, MetricsSeries, RepeatSpec, SchedulerInfo,
};
pub use registry::{QueueConfig, QueueEntry, QueueRegistry};
