//! Engine tests: windowed listing, exhaustive scans, bulk mutations.

use std::sync::Arc;

use serde_json::json;

use crate::adapter::{BullAdapter, GroupMqAdapter};
use crate::backend::{BullClient, GroupMqClient};

mod bulk;
mod list;
mod scan;

/// A baseline queue driven into a known state: `waiting` jobs still
/// queued, `completed` and `failed` jobs pushed through the worker path.
pub(super) fn bull_fixture(
    waiting: usize,
    completed: usize,
    failed: usize,
) -> (Arc<BullClient>, BullAdapter) {
    let client = Arc::new(BullClient::new("fixture"));

    for i in 0..completed {
        let job = client.add(None, json!({"n": i}), json!({}));
        client.take_next().unwrap();
        client.complete(job.id, json!(null)).unwrap();
    }
    for i in 0..failed {
        let job = client.add(None, json!({"n": i}), json!({}));
        client.take_next().unwrap();
        client.fail(job.id, "boom", vec![]).unwrap();
    }
    for i in 0..waiting {
        client.add(None, json!({"n": i}), json!({}));
    }

    let adapter = BullAdapter::new(client.clone(), None);
    (client, adapter)
}

/// A group-partitioned queue with `per_group` waiting jobs in each of
/// the given groups.
pub(super) fn groupmq_fixture(
    groups: &[&str],
    per_group: usize,
) -> (Arc<GroupMqClient>, GroupMqAdapter) {
    let client = Arc::new(GroupMqClient::new("grouped"));
    for group in groups {
        for i in 0..per_group {
            client.add(
                None,
                json!({"group": group, "n": i}),
                Some(group.to_string()),
                json!({}),
            );
        }
    }
    let adapter = GroupMqAdapter::new(client.clone(), None);
    (client, adapter)
}
