//! Group-partitioned queue client.
//!
//! Waiting jobs are partitioned into per-group FIFO lanes; a job added
//! without a group gets a generated one. Retry and promote are
//! queue-level calls, and clean only covers terminal-ish states.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use serde_json::Value;
use uuid::Uuid;

use crate::protocol::time::now_ms;

/// States `clean` accepts; everything else is rejected by the backend.
pub const GROUPMQ_CLEANABLE_STATES: [&str; 3] = ["completed", "failed", "delayed"];

#[derive(Debug, Clone)]
pub struct GroupMqJob {
    pub id: u64,
    pub name: String,
    pub data: Value,
    pub opts: Value,
    pub group_id: String,
    pub timestamp: u64,
    pub processed_on: Option<u64>,
    pub finished_on: Option<u64>,
    pub failed_reason: Option<String>,
    pub stacktrace: Vec<String>,
    pub returnvalue: Option<Value>,
    pub attempts_made: u32,
    pub delay: u64,
    pub priority: i32,
}

struct GroupMqState {
    jobs: HashMap<u64, GroupMqJob>,
    /// Per-group FIFO lanes for waiting jobs, in group creation order.
    group_lanes: HashMap<String, VecDeque<u64>>,
    group_order: Vec<String>,
    /// Non-waiting states share flat lists.
    lists: HashMap<&'static str, VecDeque<u64>>,
    paused: bool,
}

impl GroupMqState {
    fn lane_mut(&mut self, group_id: &str) -> &mut VecDeque<u64> {
        if !self.group_lanes.contains_key(group_id) {
            self.group_order.push(group_id.to_string());
            self.group_lanes.insert(group_id.to_string(), VecDeque::new());
        }
        self.group_lanes.get_mut(group_id).expect("inserted above")
    }

    fn detach(&mut self, id: u64) {
        for lane in self.group_lanes.values_mut() {
            lane.retain(|j| *j != id);
        }
        for list in self.lists.values_mut() {
            list.retain(|j| *j != id);
        }
    }

    /// Waiting ids across all groups, in group creation order.
    fn waiting_ids(&self) -> Vec<u64> {
        let mut out = Vec::new();
        for group in &self.group_order {
            if let Some(lane) = self.group_lanes.get(group) {
                out.extend(lane.iter().copied());
            }
        }
        out
    }
}

pub struct GroupMqClient {
    name: String,
    next_id: AtomicU64,
    inner: RwLock<GroupMqState>,
}

impl GroupMqClient {
    pub fn new(name: impl Into<String>) -> Self {
        let mut lists = HashMap::new();
        for state in ["active", "completed", "failed", "delayed", "paused"] {
            lists.insert(state, VecDeque::new());
        }
        Self {
            name: name.into(),
            next_id: AtomicU64::new(1),
            inner: RwLock::new(GroupMqState {
                jobs: HashMap::new(),
                group_lanes: HashMap::new(),
                group_order: Vec::new(),
                lists,
                paused: false,
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Add a job to its group lane. Jobs without a group get a generated
    /// group id.
    pub fn add(
        &self,
        name: Option<&str>,
        data: Value,
        group_id: Option<String>,
        opts: Value,
    ) -> GroupMqJob {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let group_id = group_id.unwrap_or_else(|| Uuid::new_v4().to_string());
        let delay = opts.get("delay").and_then(Value::as_u64).unwrap_or(0);
        let priority = opts.get("priority").and_then(Value::as_i64).unwrap_or(0) as i32;

        let job = GroupMqJob {
            id,
            name: name.unwrap_or("__default__").to_string(),
            data,
            opts,
            group_id: group_id.clone(),
            timestamp: now_ms(),
            processed_on: None,
            finished_on: None,
            failed_reason: None,
            stacktrace: Vec::new(),
            returnvalue: None,
            attempts_made: 0,
            delay,
            priority,
        };

        let mut inner = self.inner.write();
        if delay > 0 {
            inner.lists.get_mut("delayed").expect("list").push_back(id);
        } else if inner.paused {
            inner.lists.get_mut("paused").expect("list").push_back(id);
        } else {
            inner.lane_mut(&group_id).push_back(id);
        }
        inner.jobs.insert(id, job.clone());
        job
    }

    pub fn get_job(&self, id: u64) -> Option<GroupMqJob> {
        self.inner.read().jobs.get(&id).cloned()
    }

    /// Group ids with live lanes, in creation order.
    pub fn get_groups(&self) -> Vec<String> {
        self.inner.read().group_order.clone()
    }

    /// Inclusive range fetch. Waiting spans all group lanes.
    pub fn jobs_in_state(&self, native_state: &str, start: usize, end: usize) -> Vec<GroupMqJob> {
        if end < start {
            return Vec::new();
        }
        let inner = self.inner.read();
        let ids: Vec<u64> = if native_state == "waiting" {
            inner.waiting_ids()
        } else {
            match inner.lists.get(native_state) {
                Some(list) => list.iter().copied().collect(),
                None => return Vec::new(),
            }
        };
        ids.into_iter()
            .skip(start)
            .take(end - start + 1)
            .filter_map(|id| inner.jobs.get(&id).cloned())
            .collect()
    }

    pub fn counts(&self) -> HashMap<String, usize> {
        let inner = self.inner.read();
        let mut out = HashMap::new();
        out.insert("waiting".to_string(), inner.waiting_ids().len());
        for state in ["active", "completed", "failed", "delayed", "paused"] {
            out.insert(state.to_string(), inner.lists[state].len());
        }
        out
    }

    pub fn is_paused(&self) -> bool {
        self.inner.read().paused
    }

    pub fn pause(&self) {
        self.inner.write().paused = true;
    }

    pub fn resume(&self) {
        let mut inner = self.inner.write();
        if !inner.paused {
            return;
        }
        inner.paused = false;
        // Parked jobs rejoin their group lanes
        let parked: Vec<u64> = inner.lists.get_mut("paused").expect("list").drain(..).collect();
        for id in parked {
            let group_id = match inner.jobs.get(&id) {
                Some(job) => job.group_id.clone(),
                None => continue,
            };
            inner.lane_mut(&group_id).push_back(id);
        }
    }

    /// Clean is restricted to completed/failed/delayed.
    pub fn clean(&self, native_state: &str, grace_ms: u64) -> Result<Vec<u64>, String> {
        if !GROUPMQ_CLEANABLE_STATES.contains(&native_state) {
            return Err(format!("State {} cannot be cleaned", native_state));
        }
        let cutoff = now_ms().saturating_sub(grace_ms);
        let mut inner = self.inner.write();
        let stale: Vec<u64> = inner.lists[native_state]
            .iter()
            .copied()
            .filter(|id| {
                inner
                    .jobs
                    .get(id)
                    .map(|job| job.finished_on.unwrap_or(job.timestamp) <= cutoff)
                    .unwrap_or(false)
            })
            .collect();
        for id in &stale {
            inner.detach(*id);
            inner.jobs.remove(id);
        }
        Ok(stale)
    }

    /// Queue-level retry: move a failed job back to its group lane.
    pub fn retry_job(&self, id: u64) -> Result<(), String> {
        let mut inner = self.inner.write();
        let in_failed = inner.lists["failed"].contains(&id);
        if !in_failed {
            return Err(format!("Job {} is not in failed state", id));
        }
        inner.detach(id);
        let group_id = inner.jobs.get(&id).expect("listed job exists").group_id.clone();
        if inner.paused {
            inner.lists.get_mut("paused").expect("list").push_back(id);
        } else {
            inner.lane_mut(&group_id).push_back(id);
        }
        let job = inner.jobs.get_mut(&id).expect("listed job exists");
        job.finished_on = None;
        job.failed_reason = None;
        job.stacktrace.clear();
        Ok(())
    }

    /// Queue-level promote: move a delayed job into its group lane.
    pub fn promote_job(&self, id: u64) -> Result<(), String> {
        let mut inner = self.inner.write();
        let in_delayed = inner.lists["delayed"].contains(&id);
        if !in_delayed {
            return Err(format!("Job {} is not delayed", id));
        }
        inner.detach(id);
        let group_id = inner.jobs.get(&id).expect("listed job exists").group_id.clone();
        if inner.paused {
            inner.lists.get_mut("paused").expect("list").push_back(id);
        } else {
            inner.lane_mut(&group_id).push_back(id);
        }
        Ok(())
    }

    pub fn remove_job(&self, id: u64) -> Result<(), String> {
        let mut inner = self.inner.write();
        if inner.jobs.remove(&id).is_none() {
            return Err(format!("Job {} not found", id));
        }
        inner.detach(id);
        Ok(())
    }

    /// Raw server INFO text from the group-partitioned client.
    pub fn connection_info(&self) -> String {
        let inner = self.inner.read();
        format!(
            "# Server\r\nredis_version:7.2.4\r\nredis_mode:standalone\r\nuptime_in_seconds:43200\r\n\
             # Clients\r\nconnected_clients:3\r\n\
             # Memory\r\nused_memory:2097152\r\nused_memory_human:2.00M\r\n\
             # Keyspace\r\ndb0:keys={},expires=0\r\n",
            inner.jobs.len()
        )
    }

    // ===== Worker-side helpers =====

    /// Claim the next waiting job, scanning group lanes in creation
    /// order.
    pub fn take_next(&self) -> Option<GroupMqJob> {
        let mut inner = self.inner.write();
        let mut claimed = None;
        for group in inner.group_order.clone() {
            if let Some(lane) = inner.group_lanes.get_mut(&group) {
                if let Some(id) = lane.pop_front() {
                    claimed = Some(id);
                    break;
                }
            }
        }
        let id = claimed?;
        inner.lists.get_mut("active").expect("list").push_back(id);
        let now = now_ms();
        let job = inner.jobs.get_mut(&id).expect("listed job exists");
        job.processed_on = Some(now);
        job.attempts_made += 1;
        Some(job.clone())
    }

    pub fn complete(&self, id: u64, returnvalue: Value) -> Result<(), String> {
        let mut inner = self.inner.write();
        let in_active = inner.lists["active"].contains(&id);
        if !in_active {
            return Err(format!("Job {} is not active", id));
        }
        inner.detach(id);
        inner.lists.get_mut("completed").expect("list").push_back(id);
        let job = inner.jobs.get_mut(&id).expect("listed job exists");
        job.finished_on = Some(now_ms());
        job.returnvalue = Some(returnvalue);
        Ok(())
    }

    pub fn fail(&self, id: u64, reason: &str, stacktrace: Vec<String>) -> Result<(), String> {
        let mut inner = self.inner.write();
        if !inner.jobs.contains_key(&id) {
            return Err(format!("Job {} not found", id));
        }
        inner.detach(id);
        inner.lists.get_mut("failed").expect("list").push_back(id);
        let now = now_ms();
        let job = inner.jobs.get_mut(&id).expect("checked above");
        if job.processed_on.is_none() {
            job.processed_on = Some(now);
        }
        job.finished_on = Some(now);
        job.failed_reason = Some(reason.to_string());
        job.stacktrace = stacktrace;
        Ok(())
    }
}
