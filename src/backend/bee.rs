//! Minimal queue client.
//!
//! String job ids, no job names, no pause/clean/retry surface. Completed
//! jobs live in a `succeeded` list and there is no stored return value.
//! Health counts are the only counting primitive.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use serde_json::Value;

use crate::protocol::time::now_ms;

pub const BEE_NATIVE_STATES: [&str; 5] = ["waiting", "active", "succeeded", "failed", "delayed"];

#[derive(Debug, Clone)]
pub struct BeeJob {
    pub id: String,
    pub data: Value,
    pub created: u64,
    pub delay_until: Option<u64>,
    pub started_at: Option<u64>,
    pub ended_at: Option<u64>,
    pub failed_reason: Option<String>,
    pub stacktrace: Vec<String>,
    pub retries: u32,
    pub progress: u8,
}

/// Inclusive page window for `get_jobs`.
#[derive(Debug, Clone, Copy)]
pub struct BeePage {
    pub start: usize,
    pub end: usize,
}

/// Queue-level counts as reported by the health check.
#[derive(Debug, Clone, Copy, serde::Serialize)]
pub struct BeeHealthCounts {
    pub waiting: usize,
    pub active: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub delayed: usize,
}

/// Client settings - part of the structural fingerprint of this backend.
#[derive(Debug, Clone)]
pub struct BeeSettings {
    pub stall_interval_ms: u64,
    pub activate_delayed_jobs: bool,
}

impl Default for BeeSettings {
    fn default() -> Self {
        Self {
            stall_interval_ms: 5_000,
            activate_delayed_jobs: true,
        }
    }
}

struct BeeState {
    jobs: HashMap<String, BeeJob>,
    lists: HashMap<&'static str, VecDeque<String>>,
}

pub struct BeeClient {
    name: String,
    pub settings: BeeSettings,
    next_id: AtomicU64,
    inner: RwLock<BeeState>,
}

impl BeeClient {
    pub fn new(name: impl Into<String>) -> Self {
        let mut lists = HashMap::new();
        for state in BEE_NATIVE_STATES {
            lists.insert(state, VecDeque::new());
        }
        Self {
            name: name.into(),
            settings: BeeSettings::default(),
            next_id: AtomicU64::new(1),
            inner: RwLock::new(BeeState {
                jobs: HashMap::new(),
                lists,
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn create_job(&self, data: Value, delay_ms: Option<u64>, retries: Option<u32>) -> BeeJob {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed).to_string();
        let now = now_ms();
        let job = BeeJob {
            id: id.clone(),
            data,
            created: now,
            delay_until: delay_ms.map(|d| now + d),
            started_at: None,
            ended_at: None,
            failed_reason: None,
            stacktrace: Vec::new(),
            retries: retries.unwrap_or(0),
            progress: 0,
        };
        let mut inner = self.inner.write();
        let target = if job.delay_until.is_some() {
            "delayed"
        } else {
            "waiting"
        };
        inner.lists.get_mut(target).expect("known state").push_back(id.clone());
        inner.jobs.insert(id, job.clone());
        job
    }

    pub fn get_job(&self, id: &str) -> Option<BeeJob> {
        self.inner.read().jobs.get(id).cloned()
    }

    /// Page through one native state list. `succeeded` is the completed
    /// state here.
    pub fn get_jobs(&self, native_state: &str, page: BeePage) -> Vec<BeeJob> {
        let inner = self.inner.read();
        let Some(list) = inner.lists.get(native_state) else {
            return Vec::new();
        };
        if page.end < page.start {
            return Vec::new();
        }
        list.iter()
            .skip(page.start)
            .take(page.end - page.start + 1)
            .filter_map(|id| inner.jobs.get(id).cloned())
            .collect()
    }

    pub fn check_health(&self) -> BeeHealthCounts {
        let inner = self.inner.read();
        BeeHealthCounts {
            waiting: inner.lists["waiting"].len(),
            active: inner.lists["active"].len(),
            succeeded: inner.lists["succeeded"].len(),
            failed: inner.lists["failed"].len(),
            delayed: inner.lists["delayed"].len(),
        }
    }

    pub fn remove_job(&self, id: &str) -> Result<(), String> {
        let mut inner = self.inner.write();
        if inner.jobs.remove(id).is_none() {
            return Err(format!("Job {} not found", id));
        }
        for state in BEE_NATIVE_STATES {
            if let Some(list) = inner.lists.get_mut(state) {
                list.retain(|j| j != id);
            }
        }
        Ok(())
    }

    /// Server telemetry, already parsed into key/value pairs.
    pub fn raw_server_info(&self) -> BTreeMap<String, String> {
        let inner = self.inner.read();
        let mut info = BTreeMap::new();
        info.insert("redis_version".to_string(), "6.2.14".to_string());
        info.insert("redis_mode".to_string(), "standalone".to_string());
        info.insert("connected_clients".to_string(), "2".to_string());
        info.insert("used_memory".to_string(), "524288".to_string());
        info.insert("db0_keys".to_string(), inner.jobs.len().to_string());
        info
    }

    // ===== Worker-side helpers =====

    pub fn take_next(&self) -> Option<BeeJob> {
        let mut inner = self.inner.write();
        let id = inner.lists.get_mut("waiting").expect("list").pop_front()?;
        inner.lists.get_mut("active").expect("list").push_back(id.clone());
        let job = inner.jobs.get_mut(&id).expect("listed job exists");
        job.started_at = Some(now_ms());
        Some(job.clone())
    }

    pub fn succeed(&self, id: &str) -> Result<(), String> {
        let mut inner = self.inner.write();
        if !inner.jobs.contains_key(id) {
            return Err(format!("Job {} not found", id));
        }
        for state in BEE_NATIVE_STATES {
            inner.lists.get_mut(state).expect("list").retain(|j| j != id);
        }
        inner.lists.get_mut("succeeded").expect("list").push_back(id.to_string());
        let now = now_ms();
        let job = inner.jobs.get_mut(id).expect("checked above");
        if job.started_at.is_none() {
            job.started_at = Some(now);
        }
        job.ended_at = Some(now);
        job.progress = 100;
        Ok(())
    }

    pub fn fail(&self, id: &str, reason: &str) -> Result<(), String> {
        let mut inner = self.inner.write();
        if !inner.jobs.contains_key(id) {
            return Err(format!("Job {} not found", id));
        }
        for state in BEE_NATIVE_STATES {
            inner.lists.get_mut(state).expect("list").retain(|j| j != id);
        }
        inner.lists.get_mut("failed").expect("list").push_back(id.to_string());
        let now = now_ms();
        let job = inner.jobs.get_mut(id).expect("checked above");
        if job.started_at.is_none() {
            job.started_at = Some(now);
        }
        job.ended_at = Some(now);
        job.failed_reason = Some(reason.to_string());
        job.stacktrace = vec![format!("Error: {}", reason)];
        Ok(())
    }
}
