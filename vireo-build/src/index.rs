//! BuildIndex control record
//!
//! The record is reserved before reconstruction starts and flipped to `ready`
//! as the very last write of a successful build. Every mutation goes through
//! a conditional update keyed on the index id.

use crate::manifest::Manifest;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use vireo_bio::{ReferenceLink, SequenceOtuMap};
use vireo_core::error::{VireoError, VireoResult};
use vireo_storage::{Collection, DocumentStore, Filter, Patch, UpdateResult};

/// Marker written to history entries whose build was rolled back
pub const UNBUILT: &str = "unbuilt";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    Fasta,
    Bowtie2,
    Json,
}

impl FileKind {
    pub fn for_name(name: &str) -> Self {
        if name.ends_with(".bt2") {
            FileKind::Bowtie2
        } else if name.ends_with(".json.gz") {
            FileKind::Json
        } else {
            FileKind::Fasta
        }
    }
}

/// One artifact transferred into the final index directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexFile {
    pub name: String,
    pub size: u64,
    pub kind: FileKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildIndex {
    #[serde(rename = "_id")]
    pub id: String,
    pub ready: bool,
    pub has_json: bool,
    #[serde(default)]
    pub sequence_otu_map: SequenceOtuMap,
    pub reference: ReferenceLink,
    #[serde(default)]
    pub manifest: Manifest,
    #[serde(default)]
    pub files: Vec<IndexFile>,
    pub created_at: DateTime<Utc>,
}

/// Short random identifier for a new index
pub fn generate_index_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()[..8].to_string()
}

impl BuildIndex {
    pub fn new(id: impl Into<String>, reference_id: impl Into<String>, manifest: Manifest) -> Self {
        Self {
            id: id.into(),
            ready: false,
            has_json: false,
            sequence_otu_map: SequenceOtuMap::new(),
            reference: ReferenceLink {
                id: reference_id.into(),
            },
            manifest,
            files: Vec::new(),
            created_at: Utc::now(),
        }
    }

    /// Insert the record unless the host already reserved one with this id.
    ///
    /// Returns true when a new record was inserted.
    pub async fn reserve(&self, store: &dyn DocumentStore) -> VireoResult<bool> {
        if store.get(Collection::Indexes, &self.id, &["_id"]).await?.is_some() {
            tracing::debug!(index_id = %self.id, "reusing reserved index record");
            return Ok(false);
        }

        store
            .insert_one(Collection::Indexes, serde_json::to_value(self)?)
            .await
            .map_err(|e| VireoError::Store(format!("failed to reserve index {}: {}", self.id, e)))?;
        Ok(true)
    }

    pub async fn set_sequence_otu_map(
        store: &dyn DocumentStore,
        index_id: &str,
        map: &SequenceOtuMap,
    ) -> VireoResult<()> {
        let patch = Patch::new().set("sequence_otu_map", serde_json::to_value(map)?);
        update(store, index_id, patch).await
    }

    pub async fn set_has_json(store: &dyn DocumentStore, index_id: &str) -> VireoResult<()> {
        update(store, index_id, Patch::new().set("has_json", true)).await
    }

    pub async fn set_files(
        store: &dyn DocumentStore,
        index_id: &str,
        files: &[IndexFile],
    ) -> VireoResult<()> {
        update(store, index_id, Patch::new().set("files", serde_json::to_value(files)?)).await
    }

    pub async fn mark_ready(store: &dyn DocumentStore, index_id: &str) -> VireoResult<()> {
        update(store, index_id, Patch::new().set("ready", true)).await
    }

    /// Remove the record; returns whether anything was deleted
    pub async fn delete(store: &dyn DocumentStore, index_id: &str) -> VireoResult<bool> {
        let deleted = store
            .delete_one(Collection::Indexes, &Filter::by_id(index_id))
            .await?;
        Ok(deleted > 0)
    }

    /// Point every history entry pinned to `index_id` back at the unbuilt marker
    pub async fn reset_history(
        store: &dyn DocumentStore,
        index_id: &str,
    ) -> VireoResult<UpdateResult> {
        store
            .update_many(
                Collection::History,
                &Filter::new().eq("index.id", index_id),
                &Patch::new()
                    .set("index.id", Value::from(UNBUILT))
                    .set("index.version", Value::from(UNBUILT)),
            )
            .await
    }

    pub async fn load(store: &dyn DocumentStore, index_id: &str) -> VireoResult<Option<Self>> {
        vireo_storage::fetch(store, Collection::Indexes, index_id, &[]).await
    }
}

async fn update(store: &dyn DocumentStore, index_id: &str, patch: Patch) -> VireoResult<()> {
    let result = store
        .update_one(Collection::Indexes, &Filter::by_id(index_id), &patch)
        .await
        .map_err(|e| VireoError::Store(format!("failed to update index {}: {}", index_id, e)))?;

    if result.matched == 0 {
        return Err(VireoError::Store(format!("index record {} is missing", index_id)));
    }
    Ok(())
}
