//! Native queue clients.
//!
//! Each module is one backend engine with its own API surface, status
//! vocabulary, and job shape. The adapters in `crate::adapter` are the
//! only consumers that should reach into these directly.
//!
//! - `bull.rs` - baseline single-node client (`wait` list spelling)
//! - `bullmq.rs` - advanced client (workers, logs, schedulers, metrics)
//! - `bee.rs` - minimal client (`succeeded` spelling, health counts)
//! - `groupmq.rs` - group-partitioned client

mod bee;
mod bull;
mod bullmq;
mod groupmq;

pub use bee::{BeeClient, BeeHealthCounts, BeeJob, BeePage, BeeSettings};
pub use bull::{BullClient, BullJob};
pub use bullmq::{BullMqClient, BullMqJob, RawMetrics, SchedulerEntry, WorkerInfo};
pub use groupmq::{GroupMqClient, GroupMqJob};
