//! In-memory document store
//!
//! Each collection lives behind one `DashMap` shard entry, so a multi-document
//! update holds the collection lock for its whole duration and is atomic with
//! respect to other callers.

use crate::document::{Collection, Filter, Group, GroupQuery, Patch, UpdateResult};
use crate::store::{DocumentStore, DocumentStream, GroupStream};
use async_trait::async_trait;
use dashmap::DashMap;
use futures::stream::{self, StreamExt};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use vireo_core::error::{VireoError, VireoResult};

type Documents = BTreeMap<String, Value>;

#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: DashMap<Collection, Documents>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace documents without going through the async contract
    pub fn seed<I>(&self, collection: Collection, documents: I) -> VireoResult<()>
    where
        I: IntoIterator<Item = Value>,
    {
        let mut entry = self.collections.entry(collection).or_default();
        for document in documents {
            let id = document_id(&document)?;
            entry.insert(id, document);
        }
        Ok(())
    }

    pub fn count(&self, collection: Collection) -> usize {
        self.collections
            .get(&collection)
            .map(|documents| documents.len())
            .unwrap_or(0)
    }

    /// Copy of every document in a collection, ordered by id
    pub fn documents(&self, collection: Collection) -> Vec<Value> {
        self.collections
            .get(&collection)
            .map(|documents| documents.values().cloned().collect())
            .unwrap_or_default()
    }

    pub fn document(&self, collection: Collection, id: &str) -> Option<Value> {
        self.collections
            .get(&collection)
            .and_then(|documents| documents.get(id).cloned())
    }

    fn apply_patch(
        &self,
        collection: Collection,
        filter: &Filter,
        patch: &Patch,
        limit: Option<usize>,
    ) -> UpdateResult {
        let mut result = UpdateResult::default();
        let Some(mut documents) = self.collections.get_mut(&collection) else {
            return result;
        };

        let matching = documents
            .values_mut()
            .filter(|document| filter.matches(document))
            .take(limit.unwrap_or(usize::MAX));

        for document in matching {
            result.matched += 1;
            if patch.apply(document) {
                result.modified += 1;
            }
        }

        tracing::trace!(
            collection = %collection,
            matched = result.matched,
            modified = result.modified,
            "applied patch"
        );
        result
    }
}

fn document_id(document: &Value) -> VireoResult<String> {
    document
        .get("_id")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| VireoError::InvalidInput("document is missing a string _id".to_string()))
}

fn project(document: &Value, projection: &[&str]) -> Value {
    if projection.is_empty() {
        return document.clone();
    }

    let mut projected = Map::new();
    if let Some(object) = document.as_object() {
        for (key, value) in object {
            if key == "_id" || projection.contains(&key.as_str()) {
                projected.insert(key.clone(), value.clone());
            }
        }
    }
    Value::Object(projected)
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get(
        &self,
        collection: Collection,
        id: &str,
        projection: &[&str],
    ) -> VireoResult<Option<Value>> {
        Ok(self
            .collections
            .get(&collection)
            .and_then(|documents| documents.get(id).map(|d| project(d, projection))))
    }

    async fn find_many(
        &self,
        collection: Collection,
        filter: &Filter,
    ) -> VireoResult<DocumentStream> {
        let matching: Vec<VireoResult<Value>> = self
            .collections
            .get(&collection)
            .map(|documents| {
                documents
                    .values()
                    .filter(|document| filter.matches(document))
                    .cloned()
                    .map(Ok)
                    .collect()
            })
            .unwrap_or_default();

        Ok(stream::iter(matching).boxed())
    }

    async fn insert_one(&self, collection: Collection, document: Value) -> VireoResult<String> {
        let id = document_id(&document)?;
        let mut documents = self.collections.entry(collection).or_default();

        if documents.contains_key(&id) {
            return Err(VireoError::AlreadyExists(format!("{}/{}", collection, id)));
        }

        documents.insert(id.clone(), document);
        Ok(id)
    }

    async fn update_one(
        &self,
        collection: Collection,
        filter: &Filter,
        patch: &Patch,
    ) -> VireoResult<UpdateResult> {
        Ok(self.apply_patch(collection, filter, patch, Some(1)))
    }

    async fn update_many(
        &self,
        collection: Collection,
        filter: &Filter,
        patch: &Patch,
    ) -> VireoResult<UpdateResult> {
        Ok(self.apply_patch(collection, filter, patch, None))
    }

    async fn delete_one(&self, collection: Collection, filter: &Filter) -> VireoResult<u64> {
        let Some(mut documents) = self.collections.get_mut(&collection) else {
            return Ok(0);
        };

        let target = documents
            .iter()
            .find(|(_, document)| filter.matches(document))
            .map(|(id, _)| id.clone());

        Ok(match target {
            Some(id) => {
                documents.remove(&id);
                1
            }
            None => 0,
        })
    }

    async fn aggregate(
        &self,
        collection: Collection,
        query: &GroupQuery,
    ) -> VireoResult<GroupStream> {
        // Keyed by the serialized group value for a stable output order
        let mut groups: BTreeMap<String, Group> = BTreeMap::new();

        if let Some(documents) = self.collections.get(&collection) {
            for (id, document) in documents.iter() {
                if !query.matches(document) {
                    continue;
                }
                let key = query.key_of(document);
                groups
                    .entry(key.to_string())
                    .or_insert_with(|| Group {
                        key,
                        ids: Vec::new(),
                    })
                    .ids
                    .push(id.clone());
            }
        }

        let groups: Vec<VireoResult<Group>> = groups.into_values().map(Ok).collect();
        Ok(stream::iter(groups).boxed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::TryStreamExt;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn seeded() -> MemoryStore {
        let store = MemoryStore::new();
        store
            .seed(
                Collection::Otus,
                vec![
                    json!({"_id": "a", "version": 2, "last_indexed_version": 1, "reference": {"id": "r1"}}),
                    json!({"_id": "b", "version": 2, "last_indexed_version": null, "reference": {"id": "r1"}}),
                    json!({"_id": "c", "version": 3, "last_indexed_version": 3, "reference": {"id": "r1"}}),
                    json!({"_id": "d", "version": 5, "reference": {"id": "r2"}}),
                ],
            )
            .unwrap();
        store
    }

    #[tokio::test]
    async fn test_get_with_projection() {
        let store = seeded();

        let doc = store.get(Collection::Otus, "a", &["version"]).await.unwrap().unwrap();
        assert_eq!(doc, json!({"_id": "a", "version": 2}));

        let full = store.get(Collection::Otus, "a", &[]).await.unwrap().unwrap();
        assert_eq!(full["reference"]["id"], json!("r1"));

        assert!(store.get(Collection::Otus, "zzz", &[]).await.unwrap().is_none());
        assert!(store.get(Collection::Indexes, "a", &[]).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_find_many_filters() {
        let store = seeded();

        let docs: Vec<Value> = store
            .find_many(Collection::Otus, &Filter::new().eq("reference.id", "r1"))
            .await
            .unwrap()
            .try_collect()
            .await
            .unwrap();

        let ids: Vec<&str> = docs.iter().map(|d| d["_id"].as_str().unwrap()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_insert_rejects_duplicates_and_missing_ids() {
        let store = MemoryStore::new();

        let id = store
            .insert_one(Collection::Indexes, json!({"_id": "idx", "ready": false}))
            .await
            .unwrap();
        assert_eq!(id, "idx");

        let duplicate = store
            .insert_one(Collection::Indexes, json!({"_id": "idx"}))
            .await;
        assert!(matches!(duplicate, Err(VireoError::AlreadyExists(_))));

        let missing = store.insert_one(Collection::Indexes, json!({"ready": true})).await;
        assert!(matches!(missing, Err(VireoError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_update_one_and_many() {
        let store = seeded();
        let filter = Filter::new().eq("reference.id", "r1");
        let patch = Patch::new().set("flag", true);

        let one = store.update_one(Collection::Otus, &filter, &patch).await.unwrap();
        assert_eq!(one, UpdateResult { matched: 1, modified: 1 });

        let many = store.update_many(Collection::Otus, &filter, &patch).await.unwrap();
        assert_eq!(many, UpdateResult { matched: 3, modified: 2 });

        assert_eq!(store.document(Collection::Otus, "d").unwrap().get("flag"), None);
    }

    #[tokio::test]
    async fn test_delete_one() {
        let store = seeded();

        let deleted = store.delete_one(Collection::Otus, &Filter::by_id("b")).await.unwrap();
        assert_eq!(deleted, 1);
        assert_eq!(store.count(Collection::Otus), 3);

        let again = store.delete_one(Collection::Otus, &Filter::by_id("b")).await.unwrap();
        assert_eq!(again, 0);
    }

    #[tokio::test]
    async fn test_aggregate_groups_diverging_versions() {
        let store = seeded();
        let query = GroupQuery::new(Filter::new().eq("reference.id", "r1"), "version")
            .where_fields_differ("version", "last_indexed_version");

        let groups: Vec<Group> = store
            .aggregate(Collection::Otus, &query)
            .await
            .unwrap()
            .try_collect()
            .await
            .unwrap();

        assert_eq!(
            groups,
            vec![Group {
                key: json!(2),
                ids: vec!["a".to_string(), "b".to_string()],
            }]
        );
    }
}
