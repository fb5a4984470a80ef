//! Last-indexed version bookkeeping
//!
//! OTUs under a reference are grouped by their current `version`, restricted to
//! those whose `last_indexed_version` differs. Each group is advanced with a
//! single conditional bulk update, so an already reconciled reference touches
//! nothing. The values being replaced are kept in the summary so a failed
//! build can put them back with [`restore`].

use futures::TryStreamExt;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use vireo_core::error::{VireoError, VireoResult};
use vireo_storage::{Collection, DocumentStore, Filter, Group, GroupQuery, Patch};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileSummary {
    /// Distinct version values that needed advancing
    pub groups: usize,
    /// Records whose `last_indexed_version` was written
    pub updated: u64,
    /// Bookkeeping as it was before this run, one entry per replaced value
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub prior: Vec<PriorIndexed>,
}

/// Records that moved from `last_indexed_version` to `advanced_to`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriorIndexed {
    pub last_indexed_version: Value,
    pub advanced_to: Value,
    pub ids: Vec<String>,
}

#[derive(Deserialize)]
struct IndexedOtu {
    #[serde(rename = "_id")]
    id: String,
    #[serde(default)]
    last_indexed_version: Value,
}

pub async fn reconcile(
    store: &dyn DocumentStore,
    reference_id: &str,
) -> VireoResult<ReconcileSummary> {
    let query = GroupQuery::new(Filter::new().eq("reference.id", reference_id), "version")
        .where_fields_differ("version", "last_indexed_version");

    let groups: Vec<Group> = store
        .aggregate(Collection::Otus, &query)
        .await?
        .try_collect()
        .await?;

    let mut summary = ReconcileSummary::default();

    for group in groups {
        if group.key.is_null() {
            tracing::warn!(ids = group.ids.len(), "skipping OTUs without a version");
            continue;
        }

        // The version guard keeps a record that moved on since grouping untouched
        let filter = Filter::new()
            .is_in("_id", group.ids.iter().cloned().map(Value::from))
            .eq("version", group.key.clone());

        let current: Vec<IndexedOtu> = vireo_storage::fetch_all(store, Collection::Otus, &filter)
            .await
            .map_err(|e| {
                VireoError::Store(format!("failed to read OTUs at version {}: {}", group.key, e))
            })?;

        let patch = Patch::new().set("last_indexed_version", group.key.clone());
        let result = store
            .update_many(Collection::Otus, &filter, &patch)
            .await
            .map_err(|e| {
                VireoError::Store(format!("failed to advance version {}: {}", group.key, e))
            })?;

        tracing::debug!(
            version = %group.key,
            matched = result.matched,
            modified = result.modified,
            "advanced last indexed version"
        );

        summary.groups += 1;
        summary.updated += result.modified;
        summary.prior.extend(group_prior(current, &group.key));
    }

    tracing::info!(
        reference_id,
        groups = summary.groups,
        updated = summary.updated,
        "reconciled last indexed versions"
    );

    Ok(summary)
}

/// Bucket a group's records by the value they held before advancing
fn group_prior(records: Vec<IndexedOtu>, advanced_to: &Value) -> Vec<PriorIndexed> {
    let mut buckets: BTreeMap<String, PriorIndexed> = BTreeMap::new();

    for record in records {
        if record.last_indexed_version == *advanced_to {
            continue;
        }
        buckets
            .entry(record.last_indexed_version.to_string())
            .or_insert_with(|| PriorIndexed {
                last_indexed_version: record.last_indexed_version.clone(),
                advanced_to: advanced_to.clone(),
                ids: Vec::new(),
            })
            .ids
            .push(record.id);
    }

    buckets.into_values().collect()
}

/// Put back the bookkeeping a reconcile replaced.
///
/// Only records still holding the advanced value are rewritten. Returns the
/// number of records restored.
pub async fn restore(store: &dyn DocumentStore, summary: &ReconcileSummary) -> VireoResult<u64> {
    let mut restored = 0;

    for prior in &summary.prior {
        let filter = Filter::new()
            .is_in("_id", prior.ids.iter().cloned().map(Value::from))
            .eq("last_indexed_version", prior.advanced_to.clone());
        let patch = Patch::new().set("last_indexed_version", prior.last_indexed_version.clone());

        let result = store
            .update_many(Collection::Otus, &filter, &patch)
            .await
            .map_err(|e| {
                VireoError::Store(format!(
                    "failed to restore last indexed version {}: {}",
                    prior.last_indexed_version, e
                ))
            })?;

        tracing::debug!(
            from = %prior.advanced_to,
            to = %prior.last_indexed_version,
            modified = result.modified,
            "restored last indexed version"
        );
        restored += result.modified;
    }

    Ok(restored)
}
