//! Queue registry.
//!
//! Built once from caller-supplied configuration and immutable for the
//! lifetime of the context; every procedure resolves its queue here
//! before touching a backend.

use std::collections::HashMap;
use std::sync::Arc;

use crate::adapter::factory::{build_adapter, RawQueueHandle};
use crate::adapter::{BackendKind, JobNameFn, QueueAdapter};
use crate::error::Result;
use crate::QueueError;

/// One queue as supplied by the host application.
pub struct QueueConfig {
    pub handle: RawQueueHandle,
    pub display_name: String,
    /// Explicit backend type; detection runs when absent.
    pub kind: Option<BackendKind>,
    pub job_name_fn: Option<JobNameFn>,
}

impl QueueConfig {
    pub fn new(handle: RawQueueHandle, display_name: impl Into<String>) -> Self {
        Self {
            handle,
            display_name: display_name.into(),
            kind: None,
            job_name_fn: None,
        }
    }

    pub fn with_kind(mut self, kind: BackendKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn with_job_name_fn(mut self, name_fn: JobNameFn) -> Self {
        self.job_name_fn = Some(name_fn);
        self
    }
}

#[derive(Clone)]
pub struct QueueEntry {
    pub adapter: Arc<dyn QueueAdapter>,
    pub display_name: String,
}

/// Immutable name -> {adapter, display name} mapping, keyed by the
/// backend-native queue name.
pub struct QueueRegistry {
    entries: HashMap<String, QueueEntry>,
    /// Insertion order for stable listing.
    order: Vec<String>,
}

impl QueueRegistry {
    pub fn from_configs(configs: Vec<QueueConfig>) -> Result<Self> {
        let mut entries = HashMap::new();
        let mut order = Vec::new();
        for config in configs {
            let adapter = build_adapter(config.handle, config.kind, config.job_name_fn)?;
            let name = adapter.queue_name();
            if entries
                .insert(
                    name.clone(),
                    QueueEntry {
                        adapter,
                        display_name: config.display_name,
                    },
                )
                .is_none()
            {
                order.push(name);
            }
        }
        Ok(Self { entries, order })
    }

    pub fn resolve(&self, queue_name: &str) -> Result<&QueueEntry> {
        self.entries
            .get(queue_name)
            .ok_or_else(|| QueueError::QueueNotFound {
                queue: queue_name.to_string(),
            })
    }

    /// Entries in registration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &QueueEntry)> {
        self.order
            .iter()
            .filter_map(|name| self.entries.get(name).map(|entry| (name.as_str(), entry)))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::backend::{BeeClient, BullClient};

    #[test]
    fn resolves_by_native_queue_name() {
        let registry = QueueRegistry::from_configs(vec![
            QueueConfig::new(Arc::new(BullClient::new("emails")), "Email delivery"),
            QueueConfig::new(Arc::new(BeeClient::new("thumbnails")), "Thumbnail builds"),
        ])
        .unwrap();

        assert_eq!(registry.len(), 2);
        let entry = registry.resolve("emails").unwrap();
        assert_eq!(entry.display_name, "Email delivery");
        assert!(registry.resolve("missing").is_err());
    }

    #[test]
    fn unknown_queue_error_names_the_queue() {
        let registry = QueueRegistry::from_configs(Vec::new()).unwrap();
        let err = registry.resolve("billing").err().unwrap();
        assert!(err.to_string().contains("billing"));
    }

    #[test]
    fn iterates_in_registration_order() {
        let registry = QueueRegistry::from_configs(vec![
            QueueConfig::new(Arc::new(BullClient::new("b")), "B"),
            QueueConfig::new(Arc::new(BullClient::new("a")), "A"),
        ])
        .unwrap();
        let names: Vec<&str> = registry.iter().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["b", "a"]);
    }
}
