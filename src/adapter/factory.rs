//! Backend detection and adapter construction.
//!
//! A raw queue handle is an opaque `Any`; classification probes it with
//! structural predicates in strict precedence order, most specific
//! first. The ordering is load-bearing: the advanced backend is a
//! structural superset of the baseline one, so probing the baseline
//! marker first would misclassify it.

use std::any::Any;
use std::sync::Arc;

use tracing::debug;

use crate::backend::{BeeClient, BullClient, BullMqClient, GroupMqClient};
use crate::error::Result;
use crate::QueueError;

use super::{BackendKind, BeeAdapter, BullAdapter, BullMqAdapter, GroupMqAdapter, JobNameFn, QueueAdapter};

/// Opaque backend handle as supplied by caller configuration.
pub type RawQueueHandle = Arc<dyn Any + Send + Sync>;

/// Classify a raw handle by structural probing.
///
/// Precedence: group-partition markers, then worker introspection, then
/// health-check + settings, then the baseline client shape. No match is
/// `DetectionFailed` - the caller should pass the type explicitly.
pub fn detect_backend(handle: &RawQueueHandle) -> Result<BackendKind> {
    // 1. Group-partition marker (get_groups + group lanes)
    if handle.downcast_ref::<GroupMqClient>().is_some() {
        return Ok(BackendKind::GroupMq);
    }
    // 2. Worker introspection marks the advanced backend; it must be
    //    probed before the baseline shape it is a superset of
    if handle.downcast_ref::<BullMqClient>().is_some() {
        return Ok(BackendKind::BullMq);
    }
    // 3. Health-check + public settings mark the minimal backend
    if handle.downcast_ref::<BeeClient>().is_some() {
        return Ok(BackendKind::Bee);
    }
    // 4. Baseline: client + add + process, without the advanced marker
    if handle.downcast_ref::<BullClient>().is_some() {
        return Ok(BackendKind::Bull);
    }
    Err(QueueError::DetectionFailed)
}

/// Build the adapter for a raw handle.
///
/// An explicit `kind` tag skips detection; a tag that does not match the
/// handle's actual shape is still `DetectionFailed` rather than a
/// misbehaving adapter.
pub fn build_adapter(
    handle: RawQueueHandle,
    kind: Option<BackendKind>,
    name_fn: Option<JobNameFn>,
) -> Result<Arc<dyn QueueAdapter>> {
    let kind = match kind {
        Some(kind) => kind,
        None => detect_backend(&handle)?,
    };
    debug!(backend = %kind, "building queue adapter");

    match kind {
        BackendKind::Bull => {
            let client = handle
                .downcast::<BullClient>()
                .map_err(|_| QueueError::DetectionFailed)?;
            Ok(Arc::new(BullAdapter::new(client, name_fn)))
        }
        BackendKind::BullMq => {
            let client = handle
                .downcast::<BullMqClient>()
                .map_err(|_| QueueError::DetectionFailed)?;
            Ok(Arc::new(BullMqAdapter::new(client, name_fn)))
        }
        BackendKind::Bee => {
            let client = handle
                .downcast::<BeeClient>()
                .map_err(|_| QueueError::DetectionFailed)?;
            Ok(Arc::new(BeeAdapter::new(client, name_fn)))
        }
        BackendKind::GroupMq => {
            let client = handle
                .downcast::<GroupMqClient>()
                .map_err(|_| QueueError::DetectionFailed)?;
            Ok(Arc::new(GroupMqAdapter::new(client, name_fn)))
        }
    }
}
