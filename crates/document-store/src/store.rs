use std::collections::HashSet;

use async_trait::async_trait;
use serde::Serialize;
use uuid::Uuid;

use crate::{Document, DocumentQuery, Result, Revision, StoreError, WriteBatch, WriteOp};

/// Core trait for document store implementations.
///
/// A document store keeps JSON documents grouped in collections. Every write
/// carries the revision the caller last observed, so check-then-act sequences
/// fail cleanly instead of overwriting a concurrent change.
/// All implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Loads a document by collection and id.
    async fn get(&self, collection: &str, id: Uuid) -> Result<Option<Document>>;

    /// Returns the documents matching a query, oldest first.
    async fn find(&self, query: DocumentQuery) -> Result<Vec<Document>>;

    /// Applies a batch of writes atomically.
    ///
    /// Either every op's expected revision matches and all ops are applied,
    /// or nothing is written and `ConcurrencyConflict` is returned.
    ///
    /// Returns the resulting revision of each op, in order. Deletes report
    /// `Revision::initial()`.
    async fn commit(&self, batch: WriteBatch) -> Result<Vec<Revision>>;

    /// Returns the number of documents in a collection.
    async fn count(&self, collection: &str) -> Result<usize>;
}

/// Extension trait providing convenience methods for document stores.
#[async_trait]
pub trait DocumentStoreExt: DocumentStore {
    /// Writes a single document at the expected revision.
    async fn put<T: Serialize + Sync>(
        &self,
        collection: &str,
        id: Uuid,
        value: &T,
        expected: Revision,
    ) -> Result<Revision> {
        let op = WriteOp::put_json(collection, id, value, expected)?;
        let revisions = self.commit(WriteBatch::new().with(op)).await?;
        Ok(revisions.first().copied().unwrap_or_default())
    }

    /// Deletes a single document at the expected revision.
    async fn delete(&self, collection: &str, id: Uuid, expected: Revision) -> Result<()> {
        self.commit(WriteBatch::new().with(WriteOp::delete(collection, id, expected)))
            .await?;
        Ok(())
    }

    /// Checks if a document exists.
    async fn exists(&self, collection: &str, id: Uuid) -> Result<bool> {
        Ok(self.get(collection, id).await?.is_some())
    }
}

// Blanket implementation for all DocumentStore implementations
impl<T: DocumentStore + ?Sized> DocumentStoreExt for T {}

/// Validates a batch before committing it.
///
/// A batch must not be empty and must touch each document at most once.
pub fn validate_batch(batch: &WriteBatch) -> Result<()> {
    if batch.is_empty() {
        return Err(StoreError::InvalidBatch(
            "cannot commit an empty batch".to_string(),
        ));
    }

    let mut seen = HashSet::new();
    for op in batch.ops() {
        if !seen.insert((op.collection(), op.id())) {
            return Err(StoreError::InvalidBatch(format!(
                "document {}/{} appears more than once",
                op.collection(),
                op.id()
            )));
        }
    }

    Ok(())
}
