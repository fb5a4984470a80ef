//! History service with scripted latency and failures

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use vireo_core::error::{VireoError, VireoResult};
use vireo_storage::{Collection, HistoryService, Reconstruction, SnapshotHistory};

/// Wraps a [`SnapshotHistory`], tracking how many reconstructions overlap
#[derive(Debug, Default)]
pub struct ScriptedHistory {
    inner: SnapshotHistory,
    delay: Option<Duration>,
    record_delays: HashMap<String, Duration>,
    completed: Mutex<Vec<String>>,
    failing: Mutex<HashSet<(String, u32)>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    calls: AtomicUsize,
}

impl ScriptedHistory {
    pub fn new(inner: SnapshotHistory) -> Self {
        Self {
            inner,
            ..Self::default()
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Delay for `record_id` only, taking precedence over [`Self::with_delay`]
    pub fn with_delay_for(mut self, record_id: &str, delay: Duration) -> Self {
        self.record_delays.insert(record_id.to_string(), delay);
        self
    }

    /// Make reconstruction of `record_id` at `version` fail
    pub fn fail_on(self, record_id: &str, version: u32) -> Self {
        self.failing.lock().insert((record_id.to_string(), version));
        self
    }

    pub fn inner(&self) -> &SnapshotHistory {
        &self.inner
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Highest number of reconstructions observed running at once
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    /// Record ids in the order their reconstructions finished
    pub fn completion_order(&self) -> Vec<String> {
        self.completed.lock().clone()
    }
}

#[async_trait]
impl HistoryService for ScriptedHistory {
    async fn reconstruct_at_version(
        &self,
        collection: Collection,
        record_id: &str,
        version: u32,
    ) -> VireoResult<Reconstruction> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);

        if let Some(delay) = self.record_delays.get(record_id).copied().or(self.delay) {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.completed.lock().push(record_id.to_string());

        if self.failing.lock().contains(&(record_id.to_string(), version)) {
            return Err(VireoError::Reconstruction {
                otu_id: record_id.to_string(),
                version,
                reason: "diff chain is corrupt".to_string(),
            });
        }

        self.inner.reconstruct_at_version(collection, record_id, version).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_scripted_failure_and_delegation() {
        let inner = SnapshotHistory::new();
        inner.record(Collection::Otus, "A", 1, json!({"_id": "A"}));
        inner.record(Collection::Otus, "B", 1, json!({"_id": "B"}));
        let history = ScriptedHistory::new(inner).fail_on("B", 1);

        assert!(history.reconstruct_at_version(Collection::Otus, "A", 1).await.is_ok());
        let err = history
            .reconstruct_at_version(Collection::Otus, "B", 1)
            .await
            .unwrap_err();

        assert!(matches!(err, VireoError::Reconstruction { .. }));
        assert_eq!(history.calls(), 2);
        assert_eq!(history.max_in_flight(), 1);
    }
}
