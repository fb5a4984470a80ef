//! Document store that injects failures per operation and collection

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use vireo_core::error::{VireoError, VireoResult};
use vireo_storage::{
    Collection, DocumentStore, DocumentStream, Filter, GroupQuery, GroupStream, MemoryStore, Patch,
    UpdateResult,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOperation {
    Get,
    FindMany,
    InsertOne,
    UpdateOne,
    UpdateMany,
    DeleteOne,
    Aggregate,
}

#[derive(Debug, Default)]
struct Fault {
    /// Calls allowed through before failures start
    succeed_first: usize,
    seen: usize,
}

/// Delegates to a [`MemoryStore`] unless a fault is armed for the call
#[derive(Debug)]
pub struct FaultyStore {
    inner: Arc<MemoryStore>,
    faults: Mutex<HashMap<(StoreOperation, Collection), Fault>>,
}

impl FaultyStore {
    pub fn new(inner: Arc<MemoryStore>) -> Self {
        Self {
            inner,
            faults: Mutex::new(HashMap::new()),
        }
    }

    pub fn inner(&self) -> &Arc<MemoryStore> {
        &self.inner
    }

    /// Fail every `operation` against `collection`
    pub fn fail_on(self, operation: StoreOperation, collection: Collection) -> Self {
        self.fail_after(operation, collection, 0)
    }

    /// Let the first `calls` succeed, then fail every later one
    pub fn fail_after(
        self,
        operation: StoreOperation,
        collection: Collection,
        calls: usize,
    ) -> Self {
        self.faults.lock().insert(
            (operation, collection),
            Fault {
                succeed_first: calls,
                seen: 0,
            },
        );
        self
    }

    fn check(&self, operation: StoreOperation, collection: Collection) -> VireoResult<()> {
        let mut faults = self.faults.lock();
        let Some(fault) = faults.get_mut(&(operation, collection)) else {
            return Ok(());
        };

        fault.seen += 1;
        if fault.seen > fault.succeed_first {
            return Err(VireoError::Store(format!(
                "injected {:?} failure on {}",
                operation, collection
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for FaultyStore {
    async fn get(
        &self,
        collection: Collection,
        id: &str,
        projection: &[&str],
    ) -> VireoResult<Option<serde_json::Value>> {
        self.check(StoreOperation::Get, collection)?;
        self.inner.get(collection, id, projection).await
    }

    async fn find_many(
        &self,
        collection: Collection,
        filter: &Filter,
    ) -> VireoResult<DocumentStream> {
        self.check(StoreOperation::FindMany, collection)?;
        self.inner.find_many(collection, filter).await
    }

    async fn insert_one(
        &self,
        collection: Collection,
        document: serde_json::Value,
    ) -> VireoResult<String> {
        self.check(StoreOperation::InsertOne, collection)?;
        self.inner.insert_one(collection, document).await
    }

    async fn update_one(
        &self,
        collection: Collection,
        filter: &Filter,
        patch: &Patch,
    ) -> VireoResult<UpdateResult> {
        self.check(StoreOperation::UpdateOne, collection)?;
        self.inner.update_one(collection, filter, patch).await
    }

    async fn update_many(
        &self,
        collection: Collection,
        filter: &Filter,
        patch: &Patch,
    ) -> VireoResult<UpdateResult> {
        self.check(StoreOperation::UpdateMany, collection)?;
        self.inner.update_many(collection, filter, patch).await
    }

    async fn delete_one(&self, collection: Collection, filter: &Filter) -> VireoResult<u64> {
        self.check(StoreOperation::DeleteOne, collection)?;
        self.inner.delete_one(collection, filter).await
    }

    async fn aggregate(
        &self,
        collection: Collection,
        query: &GroupQuery,
    ) -> VireoResult<GroupStream> {
        self.check(StoreOperation::Aggregate, collection)?;
        self.inner.aggregate(collection, query).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_fail_after_lets_early_calls_through() {
        let store = FaultyStore::new(Arc::new(MemoryStore::new())).fail_after(
            StoreOperation::InsertOne,
            Collection::Indexes,
            1,
        );

        assert!(store
            .insert_one(Collection::Indexes, json!({"_id": "a"}))
            .await
            .is_ok());
        let err = store
            .insert_one(Collection::Indexes, json!({"_id": "b"}))
            .await
            .unwrap_err();
        assert!(matches!(err, VireoError::Store(_)));

        // Other collections are unaffected
        assert!(store
            .insert_one(Collection::Otus, json!({"_id": "b"}))
            .await
            .is_ok());
        assert_eq!(store.inner().count(Collection::Indexes), 1);
    }
}
