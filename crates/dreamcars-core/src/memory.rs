//! # In-Memory Document Store
//!
//! A `DocumentStore` kept entirely in process. Backs the test suites and
//! local runs with `DREAMCARS_DB_PATH=:memory:`.

use crate::error::{MarketError, MarketResult};
use crate::store::{
    apply_set, document_id, Collection, DeleteOutcome, Document, DocumentStore, Filter,
    InsertOutcome, UpdateOutcome,
};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

#[derive(Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<Collection, Vec<Document>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn find(&self, collection: Collection, filter: &Filter) -> MarketResult<Vec<Document>> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(&collection)
            .map(|docs| docs.iter().filter(|d| filter.matches(d)).cloned().collect())
            .unwrap_or_default())
    }

    async fn insert_one(
        &self,
        collection: Collection,
        document: Document,
    ) -> MarketResult<InsertOutcome> {
        let id = document_id(&document)?;
        let mut collections = self.collections.write().await;
        let docs = collections.entry(collection).or_default();

        if docs.iter().any(|d| d.get("id") == document.get("id")) {
            return Err(MarketError::Store(format!(
                "duplicate id {} in {}",
                id, collection
            )));
        }

        docs.push(document);
        Ok(InsertOutcome::inserted(id))
    }

    async fn update_one(
        &self,
        collection: Collection,
        filter: &Filter,
        set: Document,
    ) -> MarketResult<UpdateOutcome> {
        let mut collections = self.collections.write().await;
        let Some(doc) = collections
            .get_mut(&collection)
            .and_then(|docs| docs.iter_mut().find(|d| filter.matches(d)))
        else {
            return Ok(UpdateOutcome::new(0, 0));
        };

        let modified = apply_set(doc, &set);
        Ok(UpdateOutcome::new(1, modified as u64))
    }

    async fn update_many(
        &self,
        collection: Collection,
        filter: &Filter,
        set: Document,
    ) -> MarketResult<UpdateOutcome> {
        let mut collections = self.collections.write().await;
        let (mut matched, mut modified) = (0, 0);

        if let Some(docs) = collections.get_mut(&collection) {
            for doc in docs.iter_mut().filter(|d| filter.matches(d)) {
                matched += 1;
                if apply_set(doc, &set) {
                    modified += 1;
                }
            }
        }

        Ok(UpdateOutcome::new(matched, modified))
    }

    async fn delete_one(
        &self,
        collection: Collection,
        filter: &Filter,
    ) -> MarketResult<DeleteOutcome> {
        let mut collections = self.collections.write().await;
        let Some(docs) = collections.get_mut(&collection) else {
            return Ok(DeleteOutcome::new(0));
        };

        match docs.iter().position(|d| filter.matches(d)) {
            Some(index) => {
                docs.remove(index);
                Ok(DeleteOutcome::new(1))
            }
            None => Ok(DeleteOutcome::new(0)),
        }
    }

    async fn delete_many(
        &self,
        collection: Collection,
        filter: &Filter,
    ) -> MarketResult<DeleteOutcome> {
        let mut collections = self.collections.write().await;
        let Some(docs) = collections.get_mut(&collection) else {
            return Ok(DeleteOutcome::new(0));
        };

        let before = docs.len();
        docs.retain(|d| !filter.matches(d));
        Ok(DeleteOutcome::new((before - docs.len()) as u64))
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::fields;
    use serde_json::json;

    fn doc(id: &str, owner: &str) -> Document {
        fields(json!({ "id": id, "owner_email": owner, "advertise": false }))
    }

    #[tokio::test]
    async fn test_insert_and_find() {
        let store = MemoryStore::new();
        store.insert_one(Collection::Products, doc("p1", "a@x.com")).await.unwrap();
        store.insert_one(Collection::Products, doc("p2", "b@x.com")).await.unwrap();

        let all = store.find(Collection::Products, &Filter::all()).await.unwrap();
        assert_eq!(all.len(), 2);

        let mine = store
            .find(Collection::Products, &Filter::all().eq("owner_email", "a@x.com"))
            .await
            .unwrap();
        assert_eq!(mine.len(), 1);
        assert!(store.find(Collection::Users, &Filter::all()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_id_rejected() {
        let store = MemoryStore::new();
        store.insert_one(Collection::Products, doc("p1", "a@x.com")).await.unwrap();
        assert!(store.insert_one(Collection::Products, doc("p1", "a@x.com")).await.is_err());
    }

    #[tokio::test]
    async fn test_update_counts() {
        let store = MemoryStore::new();
        store.insert_one(Collection::Products, doc("p1", "a@x.com")).await.unwrap();
        store.insert_one(Collection::Products, doc("p2", "a@x.com")).await.unwrap();

        let set = fields(json!({ "advertise": true }));
        let one = store
            .update_one(Collection::Products, &Filter::by_id("p1"), set.clone())
            .await
            .unwrap();
        assert_eq!((one.matched_count, one.modified_count), (1, 1));

        let many = store
            .update_many(Collection::Products, &Filter::all().eq("owner_email", "a@x.com"), set)
            .await
            .unwrap();
        assert_eq!((many.matched_count, many.modified_count), (2, 1));

        let none = store
            .update_one(Collection::Products, &Filter::by_id("zzz"), Document::new())
            .await
            .unwrap();
        assert!(none.is_noop());
    }

    #[tokio::test]
    async fn test_delete_counts() {
        let store = MemoryStore::new();
        store.insert_one(Collection::Products, doc("p1", "a@x.com")).await.unwrap();
        store.insert_one(Collection::Products, doc("p2", "a@x.com")).await.unwrap();
        store.insert_one(Collection::Products, doc("p3", "b@x.com")).await.unwrap();

        let one = store.delete_one(Collection::Products, &Filter::by_id("p3")).await.unwrap();
        assert_eq!(one.deleted_count, 1);
        let again = store.delete_one(Collection::Products, &Filter::by_id("p3")).await.unwrap();
        assert_eq!(again.deleted_count, 0);

        let many = store
            .delete_many(Collection::Products, &Filter::all().eq("owner_email", "a@x.com"))
            .await
            .unwrap();
        assert_eq!(many.deleted_count, 2);
        assert_eq!(store.count(Collection::Products, &Filter::all()).await.unwrap(), 0);
    }
}
