//! Advanced queue client.
//!
//! Structural superset of the baseline client: adds prioritized and
//! waiting-children states, worker introspection, per-job logs, job
//! schedulers, and bucketed metrics. The waiting list is spelled `wait`
//! internally; `clean` accepts only native spellings.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use croner::Cron;
use parking_lot::RwLock;
use serde_json::Value;

use crate::protocol::time::now_ms;

pub const BULLMQ_NATIVE_STATES: [&str; 8] = [
    "wait",
    "prioritized",
    "waiting-children",
    "active",
    "completed",
    "failed",
    "delayed",
    "paused",
];

pub const DEFAULT_JOB_NAME: &str = "__default__";

#[derive(Debug, Clone)]
pub struct BullMqJob {
    pub id: u64,
    pub name: String,
    pub data: Value,
    pub opts: Value,
    pub timestamp: u64,
    pub processed_on: Option<u64>,
    pub finished_on: Option<u64>,
    pub failed_reason: Option<String>,
    pub stacktrace: Vec<String>,
    pub returnvalue: Option<Value>,
    pub attempts_made: u32,
    pub progress: u8,
    pub delay: u64,
    pub priority: i32,
}

/// One connected worker, as reported by introspection.
#[derive(Debug, Clone, serde::Serialize)]
pub struct WorkerInfo {
    pub id: String,
    pub name: String,
    pub addr: String,
}

/// Scheduler entry as the backend stores it.
#[derive(Debug, Clone)]
pub struct SchedulerEntry {
    pub key: String,
    pub name: Option<String>,
    pub pattern: Option<String>,
    pub every: Option<u64>,
    pub tz: Option<String>,
    pub next_run: Option<u64>,
    pub iteration_count: u32,
    pub limit: Option<u32>,
    pub template_data: Value,
    pub template_opts: Value,
}

/// Raw metrics as the backend reports them.
///
/// `count` is the number of stored data points, NOT the number of jobs;
/// consumers wanting a job total must sum `data` themselves.
#[derive(Debug, Clone)]
pub struct RawMetrics {
    pub count: u64,
    pub data: Vec<u64>,
}

struct BullMqState {
    jobs: HashMap<u64, BullMqJob>,
    lists: HashMap<&'static str, VecDeque<u64>>,
    paused: bool,
    logs: HashMap<u64, Vec<String>>,
    schedulers: BTreeMap<String, SchedulerEntry>,
    metrics: HashMap<&'static str, Vec<u64>>,
    workers: Vec<WorkerInfo>,
}

pub struct BullMqClient {
    name: String,
    next_id: AtomicU64,
    inner: RwLock<BullMqState>,
}

impl BullMqClient {
    pub fn new(name: impl Into<String>) -> Self {
        let mut lists = HashMap::new();
        for state in BULLMQ_NATIVE_STATES {
            lists.insert(state, VecDeque::new());
        }
        let mut metrics = HashMap::new();
        metrics.insert("completed", Vec::new());
        metrics.insert("failed", Vec::new());
        Self {
            name: name.into(),
            next_id: AtomicU64::new(1),
            inner: RwLock::new(BullMqState {
                jobs: HashMap::new(),
                lists,
                paused: false,
                logs: HashMap::new(),
                schedulers: BTreeMap::new(),
                metrics,
                workers: Vec::new(),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Add a job. Priority routes to `prioritized`, delay to `delayed`,
    /// otherwise `wait` (`paused` while the queue is paused).
    pub fn add(&self, name: Option<&str>, data: Value, opts: Value) -> BullMqJob {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let delay = opts.get("delay").and_then(Value::as_u64).unwrap_or(0);
        let priority = opts.get("priority").and_then(Value::as_i64).unwrap_or(0) as i32;
        let lifo = opts.get("lifo").and_then(Value::as_bool).unwrap_or(false);

        let job = BullMqJob {
            id,
            name: name.unwrap_or(DEFAULT_JOB_NAME).to_string(),
            data,
            opts,
            timestamp: now_ms(),
            processed_on: None,
            finished_on: None,
            failed_reason: None,
            stacktrace: Vec::new(),
            returnvalue: None,
            attempts_made: 0,
            progress: 0,
            delay,
            priority,
        };

        let mut state = self.inner.write();
        let target = if delay > 0 {
            "delayed"
        } else if priority > 0 {
            "prioritized"
        } else if state.paused {
            "paused"
        } else {
            "wait"
        };
        let list = state.lists.get_mut(target).expect("known state");
        if lifo {
            list.push_front(id);
        } else {
            list.push_back(id);
        }
        state.jobs.insert(id, job.clone());
        job
    }

    pub fn get_job(&self, id: u64) -> Option<BullMqJob> {
        self.inner.read().jobs.get(&id).cloned()
    }

    /// Inclusive range fetch. Accepts the `waiting` alias for reads.
    pub fn jobs_in_state(&self, native_state: &str, start: usize, end: usize) -> Vec<BullMqJob> {
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

    pub fn counts(&self) -> HashMap<String, usize> {
        let inner = self.inner.read();
        let mut out = HashMap::new();
        for state in BULLMQ_NATIVE_STATES {
            let key = if state == "wait" { "waiting" } else { state };
            out.insert(key.to_string(), inner.lists[state].len());
        }
        out
    }

    pub fn is_paused(&self) -> bool {
        self.inner.read().paused
    }

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

    /// Remove jobs in `native_state` older than `grace_ms`.
    pub fn clean(&self, native_state: &str, grace_ms: u64) -> Result<Vec<u64>, String> {
        if !BULLMQ_NATIVE_STATES.contains(&native_state) {
            return Err(format!("Cannot clean unknown state {}", native_state));
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
            Self::detach(&mut inner, *id);
            inner.jobs.remove(id);
            inner.logs.remove(id);
        }
        Ok(stale)
    }

    /// Drain every non-active job.
    pub fn drain(&self) {
        let mut inner = self.inner.write();
        for state in [
            "wait",
            "prioritized",
            "waiting-children",
            "delayed",
            "paused",
            "completed",
            "failed",
        ] {
            let drained: Vec<u64> = inner
                .lists
                .get_mut(state)
                .expect("known state")
                .drain(..)
                .collect();
            for id in drained {
                inner.jobs.remove(&id);
                inner.logs.remove(&id);
            }
        }
    }

    pub fn retry_job(&self, id: u64) -> Result<(), String> {
        let mut inner = self.inner.write();
        if Self::list_of(&inner, id) != Some("failed") {
            return Err(format!("Job {} is not in failed state", id));
        }
        Self::detach(&mut inner, id);
        let target = if inner.paused { "paused" } else { "wait" };
        inner.lists.get_mut(target).expect("known state").push_back(id);
        let job = inner.jobs.get_mut(&id).expect("listed job exists");
        job.finished_on = None;
        job.failed_reason = None;
        job.stacktrace.clear();
        Ok(())
    }

    /// Promote a delayed job to waiting.
    pub fn promote(&self, id: u64) -> Result<(), String> {
        let mut inner = self.inner.write();
        if Self::list_of(&inner, id) != Some("delayed") {
            return Err(format!("Job {} is not delayed", id));
        }
        Self::detach(&mut inner, id);
        let target = if inner.paused { "paused" } else { "wait" };
        inner.lists.get_mut(target).expect("known state").push_back(id);
        Ok(())
    }

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
        Self::detach(&mut inner, id);
        inner.logs.remove(&id);
        Ok(())
    }

    // ===== Logs =====

    pub fn add_log(&self, id: u64, line: impl Into<String>) -> Result<(), String> {
        let mut inner = self.inner.write();
        if !inner.jobs.contains_key(&id) {
            return Err(format!("Job {} not found", id));
        }
        inner.logs.entry(id).or_default().push(line.into());
        Ok(())
    }

    pub fn get_job_logs(&self, id: u64) -> Vec<String> {
        self.inner.read().logs.get(&id).cloned().unwrap_or_default()
    }

    // ===== Workers =====

    /// Worker introspection - the structural marker that distinguishes
    /// this client from the baseline one.
    pub fn get_workers(&self) -> Vec<WorkerInfo> {
        self.inner.read().workers.clone()
    }

    pub fn register_worker(&self, id: impl Into<String>, name: impl Into<String>) {
        self.inner.write().workers.push(WorkerInfo {
            id: id.into(),
            name: name.into(),
            addr: "127.0.0.1:0".to_string(),
        });
    }

    // ===== Job schedulers =====

    /// Create or replace a scheduler keyed by `key`.
    pub fn upsert_job_scheduler(
        &self,
        key: impl Into<String>,
        pattern: Option<String>,
        every: Option<u64>,
        tz: Option<String>,
        limit: Option<u32>,
        name: Option<String>,
        template_data: Value,
        template_opts: Value,
    ) -> Result<SchedulerEntry, String> {
        if let Some(ref pattern) = pattern {
            Self::validate_cron(pattern)?;
        }
        if pattern.is_none() && every.is_none() {
            return Err("Scheduler needs a cron pattern or an interval".to_string());
        }

        let key = key.into();
        let now = now_ms();
        let next_run = if let Some(interval) = every {
            Some(now + interval)
        } else {
            pattern.as_deref().map(|p| Self::next_cron_run(p, now))
        };

        let entry = SchedulerEntry {
            key: key.clone(),
            name,
            pattern,
            every,
            tz,
            next_run,
            iteration_count: 0,
            limit,
            template_data,
            template_opts,
        };
        self.inner.write().schedulers.insert(key, entry.clone());
        Ok(entry)
    }

    pub fn remove_job_scheduler(&self, key: &str) -> bool {
        self.inner.write().schedulers.remove(key).is_some()
    }

    pub fn job_schedulers(&self) -> Vec<SchedulerEntry> {
        self.inner.read().schedulers.values().cloned().collect()
    }

    fn next_cron_run(schedule: &str, now: u64) -> u64 {
        if let Ok(cron) = Cron::new(schedule).with_seconds_optional().parse() {
            let now_secs = (now / 1000) as i64;
            if let Some(now_dt) = DateTime::<Utc>::from_timestamp(now_secs, 0) {
                if let Ok(next) = cron.find_next_occurrence(&now_dt, false) {
                    return (next.timestamp() as u64) * 1000;
                }
            }
        }
        now + 60_000
    }

    fn validate_cron(schedule: &str) -> Result<(), String> {
        Cron::new(schedule)
            .with_seconds_optional()
            .parse()
            .map(|_| ())
            .map_err(|e| format!("Invalid cron expression '{}': {}", schedule, e))
    }

    // ===== Metrics =====

    /// Append one time bucket to a metric series.
    pub fn record_metric(&self, kind: &str, completed_in_bucket: u64) {
        let mut inner = self.inner.write();
        if let Some(series) = inner.metrics.get_mut(kind) {
            series.push(completed_in_bucket);
        }
    }

    /// Bucketed series for `kind` over the inclusive bucket index range.
    ///
    /// The returned `count` is the number of data points in the full
    /// series, mirroring the backend's own (misleading) count field.
    pub fn get_metrics(&self, kind: &str, start: usize, end: usize) -> RawMetrics {
        let inner = self.inner.read();
        let series = inner.metrics.get(kind).cloned().unwrap_or_default();
        let data: Vec<u64> = if end < start {
            Vec::new()
        } else {
            series
                .iter()
                .copied()
                .skip(start)
                .take(end - start + 1)
                .collect()
        };
        RawMetrics {
            count: series.len() as u64,
            data,
        }
    }

    /// Server INFO text; the connection is only reachable asynchronously.
    pub async fn connection_info(&self) -> String {
        let inner = self.inner.read();
        format!(
            "# Server\r\nredis_version:7.4.0\r\nredis_mode:standalone\r\nuptime_in_seconds:172800\r\n\
             # Clients\r\nconnected_clients:9\r\n\
             # Memory\r\nused_memory:4194304\r\nused_memory_human:4.00M\r\n\
             # Keyspace\r\ndb0:keys={},expires=0\r\n",
            inner.jobs.len()
        )
    }

    // ===== Worker-side helpers =====

    pub fn take_next(&self) -> Option<BullMqJob> {
        let mut inner = self.inner.write();
        let id = match inner.lists.get_mut("prioritized").expect("list").pop_front() {
            Some(id) => id,
            None => inner.lists.get_mut("wait").expect("list").pop_front()?,
        };
        inner.lists.get_mut("active").expect("list").push_back(id);
        let now = now_ms();
        let job = inner.jobs.get_mut(&id).expect("listed job exists");
        job.processed_on = Some(now);
        job.attempts_made += 1;
        Some(job.clone())
    }

    pub fn complete(&self, id: u64, returnvalue: Value) -> Result<(), String> {
        let mut inner = self.inner.write();
        if Self::list_of(&inner, id) != Some("active") {
            return Err(format!("Job {} is not active", id));
        }
        Self::detach(&mut inner, id);
        inner.lists.get_mut("completed").expect("list").push_back(id);
        let job = inner.jobs.get_mut(&id).expect("listed job exists");
        job.finished_on = Some(now_ms());
        job.returnvalue = Some(returnvalue);
        job.progress = 100;
        Ok(())
    }

    pub fn fail(&self, id: u64, reason: &str, stacktrace: Vec<String>) -> Result<(), String> {
        let mut inner = self.inner.write();
        if Self::list_of(&inner, id).is_none() {
            return Err(format!("Job {} not found", id));
        }
        Self::detach(&mut inner, id);
        inner.lists.get_mut("failed").expect("list").push_back(id);
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

    fn list_of(state: &BullMqState, id: u64) -> Option<&'static str> {
        for list in BULLMQ_NATIVE_STATES {
            if state.lists[list].contains(&id) {
                return Some(list);
            }
        }
        None
    }

    fn detach(state: &mut BullMqState, id: u64) {
        for list in BULLMQ_NATIVE_STATES {
            if let Some(queue) = state.lists.get_mut(list) {
                queue.retain(|j| *j != id);
            }
        }
    }
}
