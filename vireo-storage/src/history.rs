//! History service contract
//!
//! Reconstruction rebuilds a record as it stood at an earlier version. The
//! diff chain itself is the service's concern; the build only consumes the
//! reconstructed document.

use crate::document::Collection;
use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashMap};
use vireo_core::error::{VireoError, VireoResult};

/// Output of one reconstruction request
#[derive(Debug, Clone, PartialEq)]
pub struct Reconstruction {
    pub diff_meta: Option<Value>,
    pub document: Value,
    pub patch_meta: Option<Value>,
}

#[async_trait]
pub trait HistoryService: Send + Sync {
    /// Rebuild `record_id` in `collection` at `version`.
    ///
    /// Either succeeds completely or returns [`VireoError::Reconstruction`].
    async fn reconstruct_at_version(
        &self,
        collection: Collection,
        record_id: &str,
        version: u32,
    ) -> VireoResult<Reconstruction>;
}

/// History backed by full per-version snapshots
#[derive(Debug, Default)]
pub struct SnapshotHistory {
    snapshots: RwLock<HashMap<(Collection, String), BTreeMap<u32, Value>>>,
}

impl SnapshotHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store the state of a record at `version`
    pub fn record(&self, collection: Collection, record_id: &str, version: u32, document: Value) {
        self.snapshots
            .write()
            .entry((collection, record_id.to_string()))
            .or_default()
            .insert(version, document);
    }

    /// Versions known for a record, ascending
    pub fn versions(&self, collection: Collection, record_id: &str) -> Vec<u32> {
        self.snapshots
            .read()
            .get(&(collection, record_id.to_string()))
            .map(|versions| versions.keys().copied().collect())
            .unwrap_or_default()
    }
}

#[async_trait]
impl HistoryService for SnapshotHistory {
    async fn reconstruct_at_version(
        &self,
        collection: Collection,
        record_id: &str,
        version: u32,
    ) -> VireoResult<Reconstruction> {
        let snapshots = self.snapshots.read();
        let versions = snapshots
            .get(&(collection, record_id.to_string()))
            .ok_or_else(|| VireoError::Reconstruction {
                otu_id: record_id.to_string(),
                version,
                reason: format!("no history in {}", collection),
            })?;

        let document = versions
            .get(&version)
            .cloned()
            .ok_or_else(|| VireoError::Reconstruction {
                otu_id: record_id.to_string(),
                version,
                reason: "version not present in history".to_string(),
            })?;

        let latest = versions.keys().next_back().copied().unwrap_or(version);

        Ok(Reconstruction {
            diff_meta: Some(json!({"id": format!("{}.{}", record_id, version)})),
            document,
            patch_meta: Some(json!({"reverted_from": latest})),
        })
    }
}
