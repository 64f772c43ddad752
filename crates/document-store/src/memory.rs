use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
    Document, DocumentQuery, Result, Revision, StoreError, WriteBatch, WriteOp,
    store::{DocumentStore, validate_batch},
};

type Key = (String, Uuid);

#[derive(Debug, Clone)]
struct Entry {
    document: Document,
    /// Insertion sequence, breaks ties between equal `created_at` values.
    seq: u64,
}

#[derive(Debug, Default)]
struct State {
    documents: HashMap<Key, Entry>,
    next_seq: u64,
}

/// In-memory document store implementation.
///
/// Provides the same interface and atomicity as the PostgreSQL
/// implementation. A whole batch is applied under one write lock.
#[derive(Clone, Default)]
pub struct InMemoryDocumentStore {
    state: Arc<RwLock<State>>,
}

impl InMemoryDocumentStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the total number of documents across all collections.
    pub async fn document_count(&self) -> usize {
        self.state.read().await.documents.len()
    }

    /// Removes every document.
    pub async fn clear(&self) {
        let mut state = self.state.write().await;
        state.documents.clear();
        state.next_seq = 0;
    }
}

fn current_revision(state: &State, collection: &str, id: Uuid) -> Revision {
    state
        .documents
        .get(&(collection.to_string(), id))
        .map(|e| e.document.revision)
        .unwrap_or(Revision::initial())
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn get(&self, collection: &str, id: Uuid) -> Result<Option<Document>> {
        let state = self.state.read().await;
        Ok(state
            .documents
            .get(&(collection.to_string(), id))
            .map(|e| e.document.clone()))
    }

    async fn find(&self, query: DocumentQuery) -> Result<Vec<Document>> {
        let state = self.state.read().await;
        let mut entries: Vec<&Entry> = state
            .documents
            .values()
            .filter(|e| e.document.collection == query.collection && query.matches(&e.document.body))
            .collect();

        entries.sort_by(|a, b| {
            a.document
                .created_at
                .cmp(&b.document.created_at)
                .then(a.seq.cmp(&b.seq))
        });

        let limit = query.limit.unwrap_or(usize::MAX);
        Ok(entries
            .into_iter()
            .take(limit)
            .map(|e| e.document.clone())
            .collect())
    }

    async fn commit(&self, batch: WriteBatch) -> Result<Vec<Revision>> {
        validate_batch(&batch)?;

        let mut state = self.state.write().await;

        // Check every expected revision before applying anything
        for op in batch.ops() {
            let actual = current_revision(&state, op.collection(), op.id());
            if actual != op.expected() {
                metrics::counter!("store_conflicts_total").increment(1);
                return Err(StoreError::ConcurrencyConflict {
                    collection: op.collection().to_string(),
                    id: op.id(),
                    expected: op.expected(),
                    actual,
                });
            }
        }

        let state = &mut *state;
        let now = Utc::now();
        let mut revisions = Vec::with_capacity(batch.len());
        for op in batch.into_ops() {
            match op {
                WriteOp::Put {
                    collection,
                    id,
                    body,
                    expected,
                } => {
                    let key = (collection.clone(), id);
                    let revision = expected.next();
                    match state.documents.get_mut(&key) {
                        Some(entry) => {
                            entry.document.body = body;
                            entry.document.revision = revision;
                            entry.document.updated_at = now;
                        }
                        None => {
                            let seq = state.next_seq;
                            state.next_seq += 1;
                            state.documents.insert(
                                key,
                                Entry {
                                    document: Document {
                                        collection,
                                        id,
                                        revision,
                                        body,
                                        created_at: now,
                                        updated_at: now,
                                    },
                                    seq,
                                },
                            );
                        }
                    }
                    revisions.push(revision);
                }
                WriteOp::Delete { collection, id, .. } => {
                    state.documents.remove(&(collection, id));
                    revisions.push(Revision::initial());
                }
            }
        }

        Ok(revisions)
    }

    async fn count(&self, collection: &str) -> Result<usize> {
        let state = self.state.read().await;
        Ok(state
            .documents
            .values()
            .filter(|e| e.document.collection == collection)
            .count())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::store::DocumentStoreExt;

    #[tokio::test]
    async fn put_and_get_document() {
        let store = InMemoryDocumentStore::new();
        let id = Uuid::new_v4();

        let revision = store
            .put("products", id, &json!({"name": "Widget"}), Revision::initial())
            .await
            .unwrap();
        assert_eq!(revision, Revision::first());

        let doc = store.get("products", id).await.unwrap().unwrap();
        assert_eq!(doc.revision, Revision::first());
        assert_eq!(doc.body["name"], "Widget");
        assert_eq!(doc.created_at, doc.updated_at);
    }

    #[tokio::test]
    async fn update_increments_revision_and_keeps_created_at() {
        let store = InMemoryDocumentStore::new();
        let id = Uuid::new_v4();

        store
            .put("products", id, &json!({"stock": 5}), Revision::initial())
            .await
            .unwrap();
        let created = store.get("products", id).await.unwrap().unwrap().created_at;

        let revision = store
            .put("products", id, &json!({"stock": 4}), Revision::first())
            .await
            .unwrap();
        assert_eq!(revision, Revision::new(2));

        let doc = store.get("products", id).await.unwrap().unwrap();
        assert_eq!(doc.body["stock"], 4);
        assert_eq!(doc.created_at, created);
    }

    #[tokio::test]
    async fn stale_revision_is_rejected() {
        let store = InMemoryDocumentStore::new();
        let id = Uuid::new_v4();

        store
            .put("products", id, &json!({"stock": 5}), Revision::initial())
            .await
            .unwrap();

        let result = store
            .put("products", id, &json!({"stock": 1}), Revision::initial())
            .await;

        match result {
            Err(StoreError::ConcurrencyConflict {
                expected, actual, ..
            }) => {
                assert_eq!(expected, Revision::initial());
                assert_eq!(actual, Revision::first());
            }
            other => panic!("expected conflict, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn failed_batch_applies_nothing() {
        let store = InMemoryDocumentStore::new();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();

        store
            .put("products", a, &json!({"stock": 5}), Revision::initial())
            .await
            .unwrap();

        // Second op targets a document that does not exist at revision 1
        let batch = WriteBatch::new()
            .with(WriteOp::put("products", a, json!({"stock": 0}), Revision::first()))
            .with(WriteOp::delete("carts", b, Revision::first()));

        let err = store.commit(batch).await.unwrap_err();
        assert!(err.is_conflict());

        let doc = store.get("products", a).await.unwrap().unwrap();
        assert_eq!(doc.body["stock"], 5);
        assert_eq!(doc.revision, Revision::first());
    }

    #[tokio::test]
    async fn batch_applies_puts_and_deletes() {
        let store = InMemoryDocumentStore::new();
        let product = Uuid::new_v4();
        let cart = Uuid::new_v4();
        let order = Uuid::new_v4();

        store
            .put("products", product, &json!({"stock": 5}), Revision::initial())
            .await
            .unwrap();
        store
            .put("carts", cart, &json!({"items": []}), Revision::initial())
            .await
            .unwrap();

        let batch = WriteBatch::new()
            .with(WriteOp::put("products", product, json!({"stock": 3}), Revision::first()))
            .with(WriteOp::put("orders", order, json!({"qty": 2}), Revision::initial()))
            .with(WriteOp::delete("carts", cart, Revision::first()));

        let revisions = store.commit(batch).await.unwrap();
        assert_eq!(
            revisions,
            vec![Revision::new(2), Revision::first(), Revision::initial()]
        );

        assert!(!store.exists("carts", cart).await.unwrap());
        assert!(store.exists("orders", order).await.unwrap());
        assert_eq!(store.document_count().await, 2);
    }

    #[tokio::test]
    async fn find_filters_and_orders_by_creation() {
        let store = InMemoryDocumentStore::new();
        let user = "user-1";

        let mut ids = Vec::new();
        for n in 0..3 {
            let id = Uuid::new_v4();
            ids.push(id);
            store
                .put("orders", id, &json!({"user_id": user, "n": n}), Revision::initial())
                .await
                .unwrap();
        }
        store
            .put(
                "orders",
                Uuid::new_v4(),
                &json!({"user_id": "someone-else"}),
                Revision::initial(),
            )
            .await
            .unwrap();

        let docs = store
            .find(DocumentQuery::collection("orders").where_eq("user_id", user))
            .await
            .unwrap();
        let found: Vec<Uuid> = docs.iter().map(|d| d.id).collect();
        assert_eq!(found, ids);

        let limited = store
            .find(DocumentQuery::collection("orders").limit(2))
            .await
            .unwrap();
        assert_eq!(limited.len(), 2);

        assert_eq!(store.count("orders").await.unwrap(), 4);
        assert_eq!(store.count("carts").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn clear_removes_everything() {
        let store = InMemoryDocumentStore::new();
        store
            .put("products", Uuid::new_v4(), &json!({}), Revision::initial())
            .await
            .unwrap();

        store.clear().await;
        assert_eq!(store.document_count().await, 0);
    }
}
