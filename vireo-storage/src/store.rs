/// Document store contract
use crate::document::{Collection, Filter, Group, GroupQuery, Patch, UpdateResult};
use async_trait::async_trait;
use futures::stream::{BoxStream, TryStreamExt};
use serde::de::DeserializeOwned;
use serde_json::Value;
use vireo_core::error::VireoResult;

pub type DocumentStream = BoxStream<'static, VireoResult<Value>>;
pub type GroupStream = BoxStream<'static, VireoResult<Group>>;

/// Transactional collection store.
///
/// Multi-document updates are atomic per call: either every matching document
/// receives the patch or none does.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Point read. An empty projection returns the whole document; `_id` is
    /// always included.
    async fn get(
        &self,
        collection: Collection,
        id: &str,
        projection: &[&str],
    ) -> VireoResult<Option<Value>>;

    /// Stream every document matching `filter`
    async fn find_many(&self, collection: Collection, filter: &Filter)
        -> VireoResult<DocumentStream>;

    /// Insert a document carrying a string `_id`; returns that id
    async fn insert_one(&self, collection: Collection, document: Value) -> VireoResult<String>;

    /// Patch the first document matching `filter`
    async fn update_one(
        &self,
        collection: Collection,
        filter: &Filter,
        patch: &Patch,
    ) -> VireoResult<UpdateResult>;

    /// Patch every document matching `filter`
    async fn update_many(
        &self,
        collection: Collection,
        filter: &Filter,
        patch: &Patch,
    ) -> VireoResult<UpdateResult>;

    /// Delete the first document matching `filter`; returns the deleted count
    async fn delete_one(&self, collection: Collection, filter: &Filter) -> VireoResult<u64>;

    /// Group matching documents by a field value
    async fn aggregate(&self, collection: Collection, query: &GroupQuery)
        -> VireoResult<GroupStream>;
}

/// Point read deserialized into a typed record
pub async fn fetch<T: DeserializeOwned>(
    store: &dyn DocumentStore,
    collection: Collection,
    id: &str,
    projection: &[&str],
) -> VireoResult<Option<T>> {
    match store.get(collection, id, projection).await? {
        Some(document) => Ok(Some(serde_json::from_value(document)?)),
        None => Ok(None),
    }
}

/// Scan deserialized into typed records
pub async fn fetch_all<T: DeserializeOwned>(
    store: &dyn DocumentStore,
    collection: Collection,
    filter: &Filter,
) -> VireoResult<Vec<T>> {
    let documents: Vec<Value> = store.find_many(collection, filter).await?.try_collect().await?;

    documents
        .into_iter()
        .map(|document| Ok(serde_json::from_value(document)?))
        .collect()
}
