//! Baseline single-node queue client.
//!
//! Keeps one list per native state. The waiting list is spelled `wait`
//! internally; `counts()` reports it as `waiting`. `clean` accepts only
//! native spellings.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use serde_json::Value;

use crate::protocol::time::now_ms;

pub const BULL_NATIVE_STATES: [&str; 6] =
    ["wait", "active", "completed", "failed", "delayed", "paused"];

/// Sentinel name assigned to jobs added without an explicit name.
pub const DEFAULT_JOB_NAME: &str = "__default__";

#[derive(Debug, Clone)]
pub struct BullJob {
    pub id: u64,
    pub name: String,
    pub data: Value,
    /// Raw option bag as supplied at add time.
    pub opts: Value,
    pub timestamp: u64,
    pub processed_on: Option<u64>,
    pub finished_on: Option<u64>,
    pub failed_reason: Option<String>,
    pub stacktrace: Vec<String>,
    /// Non-standard field: stamped when the job is retried.
    pub retried_on: Option<u64>,
    pub returnvalue: Option<Value>,
    pub attempts_made: u32,
    pub delay: u64,
    pub priority: i32,
}

struct BullState {
    jobs: HashMap<u64, BullJob>,
    lists: HashMap<&'static str, VecDeque<u64>>,
    paused: bool,
}

impl BullState {
    fn list_of(&self, id: u64) -> Option<&'static str> {
        for state in BULL_NATIVE_STATES {
            if self.lists[state].contains(&id) {
                return Some(state);
            }
        }
        None
    }

    fn detach(&mut self, id: u64) {
        for state in BULL_NATIVE_STATES {
            if let Some(list) = self.lists.get_mut(state) {
                list.retain(|j| *j != id);
            }
        }
    }

    fn push(&mut self, state: &'static str, id: u64, lifo: bool) {
        let list = self.lists.get_mut(state).expect("known state");
        if lifo {
            list.push_front(id);
        } else {
            list.push_back(id);
        }
    }
}

pub struct BullClient {
    name: String,
    next_id: AtomicU64,
    inner: RwLock<BullState>,
}

impl BullClient {
    pub fn new(name: impl Into<String>) -> Self {
        let mut lists = HashMap::new();
        for state in BULL_NATIVE_STATES {
            lists.insert(state, VecDeque::new());
        }
        Self {
            name: name.into(),
            next_id: AtomicU64::new(1),
            inner: RwLock::new(BullState {
                jobs: HashMap::new(),
                lists,
                paused: false,
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Add a job. Lands in `delayed` when a delay is set, otherwise in
    /// `wait` (`paused` while the queue is paused).
    pub fn add(&self, name: Option<&str>, data: Value, opts: Value) -> BullJob {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let delay = opts.get("delay").and_then(Value::as_u64).unwrap_or(0);
        let priority = opts.get("priority").and_then(Value::as_i64).unwrap_or(0) as i32;
        let lifo = opts.get("lifo").and_then(Value::as_bool).unwrap_or(false);

        let job = BullJob {
            id,
            name: name.unwrap_or(DEFAULT_JOB_NAME).to_string(),
            data,
            opts,
            timestamp: now_ms(),
            processed_on: None,
            finished_on: None,
            failed_reason: None,
            stacktrace: Vec::new(),
            retried_on: None,
            returnvalue: None,
            attempts_made: 0,
            delay,
            priority,
        };

        let mut state = self.inner.write();
        let target = if delay > 0 {
            "delayed"
        } else if state.paused {
            "paused"
        } else {
            "wait"
        };
        state.push(target, id, lifo);
        state.jobs.insert(id, job.clone());
        job
    }

    pub fn get_job(&self, id: u64) -> Option<BullJob> {
        self.inner.read().jobs.get(&id).cloned()
    }

    /// Inclusive range fetch within one state list.
    ///
    /// Accepts the caller-facing `waiting` alias for reads; `clean` does
    /// not.
    pub fn jobs_in_state(&self, native_state: &str, start: usize, end: usize) -> Vec<BullJob> {
        let state = if native_state == "waiting" {
            "wait"
        } else {
            native_state
        };
        let inner = self.inner.read();
        let Some(list) = inner.lists.get(state) else {
            return Vec::new();
        };
        if end < start {
            return Vec::new();
        }
        list.iter()
            .skip(start)
            .take(end - start + 1)
            .filter_map(|id| inner.jobs.get(id).cloned())
            .collect()
    }

    /// Per-state counts, keyed by the caller-facing spelling.
    pub fn counts(&self) -> HashMap<String, usize> {
        let inner = self.inner.read();
        let mut out = HashMap::new();
        for state in BULL_NATIVE_STATES {
            let key = if state == "wait" { "waiting" } else { state };
            out.insert(key.to_string(), inner.lists[state].len());
        }
        out
    }

    pub fn is_paused(&self) -> bool {
        self.inner.read().paused
    }

    /// Pause the queue: the wait list is parked under `paused`.
    pub fn pause(&self) {
        let mut inner = self.inner.write();
        if inner.paused {
            return;
        }
        inner.paused = true;
        let parked: Vec<u64> = inner.lists.get_mut("wait").expect("wait list").drain(..).collect();
        inner.lists.get_mut("paused").expect("paused list").extend(parked);
    }

    pub fn resume(&self) {
        let mut inner = self.inner.write();
        if !inner.paused {
            return;
        }
        inner.paused = false;
        let parked: Vec<u64> = inner
            .lists
            .get_mut("paused")
            .expect("paused list")
            .drain(..)
            .collect();
        inner.lists.get_mut("wait").expect("wait list").extend(parked);
    }

    /// Remove jobs in `native_state` older than `grace_ms`. Returns the
    /// removed ids. Only native spellings are accepted (`wait`, not
    /// `waiting`).
    pub fn clean(&self, native_state: &str, grace_ms: u64) -> Result<Vec<u64>, String> {
        if !BULL_NATIVE_STATES.contains(&native_state) {
            return Err(format!("Cannot clean unknown state {}", native_state));
        }
        let cutoff = now_ms().saturating_sub(grace_ms);
        let mut inner = self.inner.write();

        let list = inner.lists.get(native_state).expect("known state");
        let stale: Vec<u64> = list
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

    /// Irreversibly drain every non-active job.
    pub fn empty(&self) {
        let mut inner = self.inner.write();
        for state in ["wait", "delayed", "paused", "completed", "failed"] {
            let drained: Vec<u64> = inner
                .lists
                .get_mut(state)
                .expect("known state")
                .drain(..)
                .collect();
            for id in drained {
                inner.jobs.remove(&id);
            }
        }
    }

    /// Move a failed job back to `wait`, stamping `retried_on`.
    pub fn retry_job(&self, id: u64) -> Result<(), String> {
        let mut inner = self.inner.write();
        if inner.list_of(id) != Some("failed") {
            return Err(format!("Job {} is not in failed state", id));
        }
        inner.detach(id);
        let target = if inner.paused { "paused" } else { "wait" };
        inner.push(target, id, false);
        let job = inner.jobs.get_mut(&id).expect("listed job exists");
        job.retried_on = Some(now_ms());
        job.finished_on = None;
        job.failed_reason = None;
        job.stacktrace.clear();
        Ok(())
    }

    /// Mark a job as non-retryable.
    pub fn discard_job(&self, id: u64) -> Result<(), String> {
        let mut inner = self.inner.write();
        let job = inner
            .jobs
            .get_mut(&id)
            .ok_or_else(|| format!("Job {} not found", id))?;
        let max = job.opts.get("attempts").and_then(Value::as_u64).unwrap_or(1) as u32;
        job.attempts_made = job.attempts_made.max(max);
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

    /// Raw server INFO text, CRLF-separated `key:value` lines.
    pub fn client_info(&self) -> String {
        let inner = self.inner.read();
        format!(
            "# Server\r\nredis_version:7.2.4\r\nredis_mode:standalone\r\nuptime_in_seconds:86400\r\n\
             # Clients\r\nconnected_clients:4\r\n\
             # Memory\r\nused_memory:1048576\r\nused_memory_human:1.00M\r\n\
             # Keyspace\r\ndb0:keys={},expires=0\r\n",
            inner.jobs.len()
        )
    }

    // ===== Worker-side helpers (lifecycle driving) =====

    /// Claim the next waiting job, moving it to `active`.
    pub fn take_next(&self) -> Option<BullJob> {
        let mut inner = self.inner.write();
        let id = inner.lists.get_mut("wait").expect("wait list").pop_front()?;
        inner.push("active", id, false);
        let now = now_ms();
        let job = inner.jobs.get_mut(&id).expect("listed job exists");
        job.processed_on = Some(now);
        job.attempts_made += 1;
        Some(job.clone())
    }

    /// Finish an active job successfully.
    pub fn complete(&self, id: u64, returnvalue: Value) -> Result<(), String> {
        let mut inner = self.inner.write();
        if inner.list_of(id) != Some("active") {
            return Err(format!("Job {} is not active", id));
        }
        inner.detach(id);
        inner.push("completed", id, false);
        let job = inner.jobs.get_mut(&id).expect("listed job exists");
        job.finished_on = Some(now_ms());
        job.returnvalue = Some(returnvalue);
        Ok(())
    }

    /// Fail a job, recording the reason and stacktrace.
    pub fn fail(&self, id: u64, reason: &str, stacktrace: Vec<String>) -> Result<(), String> {
        let mut inner = self.inner.write();
        if inner.list_of(id).is_none() {
            return Err(format!("Job {} not found", id));
        }
        inner.detach(id);
        inner.push("failed", id, false);
        let now = now_ms();
        let job = inner.jobs.get_mut(&id).expect("listed job exists");
        if job.processed_on.is_none() {
            job.processed_on = Some(now);
        }
        job.finished_on = Some(now);
        job.failed_reason = Some(reason.to_string());
        job.stacktrace = stacktrace;
        Ok(())
    }
}
