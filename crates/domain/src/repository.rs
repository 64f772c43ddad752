//! Typed access to entities kept in the document store.

use std::marker::PhantomData;

use chrono::{DateTime, Utc};
use document_store::{
    Document, DocumentQuery, DocumentStore, Revision, WriteBatch, WriteOp,
};
use serde::{Serialize, de::DeserializeOwned};
use uuid::Uuid;

use crate::error::DomainError;

/// An entity persisted as one document.
pub trait Entity: Serialize + DeserializeOwned + Send + Sync {
    /// Collection the entity's documents live in.
    const COLLECTION: &'static str;

    /// Document key of this entity.
    fn document_id(&self) -> Uuid;
}

/// An entity together with the storage metadata it was loaded with.
///
/// The revision is what a later write must expect, so holding a `Versioned`
/// value is what makes a read-then-write sequence safe.
#[derive(Debug, Clone)]
pub struct Versioned<T> {
    pub value: T,
    pub revision: Revision,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl<T: Entity> Versioned<T> {
    /// Wraps a value that has not been stored yet.
    pub fn new(value: T) -> Self {
        let now = Utc::now();
        Self {
            value,
            revision: Revision::initial(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Returns true if the value has never been written.
    pub fn is_new(&self) -> bool {
        self.revision == Revision::initial()
    }

    /// Returns a write op storing the current value at the loaded revision.
    pub fn save_op(&self) -> Result<WriteOp, DomainError> {
        Ok(WriteOp::put_json(
            T::COLLECTION,
            self.value.document_id(),
            &self.value,
            self.revision,
        )?)
    }

    /// Returns a write op deleting the document at the loaded revision.
    pub fn delete_op(&self) -> WriteOp {
        WriteOp::delete(T::COLLECTION, self.value.document_id(), self.revision)
    }

    fn from_document(doc: Document) -> Result<Self, DomainError> {
        Ok(Self {
            value: doc.decode()?,
            revision: doc.revision,
            created_at: doc.created_at,
            updated_at: doc.updated_at,
        })
    }
}

impl<T> std::ops::Deref for Versioned<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.value
    }
}

/// Repository for one entity type.
///
/// The repository is responsible for:
/// 1. Loading entities with their revision
/// 2. Turning modified entities back into revision-guarded writes
/// 3. Committing those writes
pub struct Repository<S, T>
where
    S: DocumentStore,
    T: Entity,
{
    store: S,
    _phantom: PhantomData<T>,
}

impl<S: DocumentStore + Clone, T: Entity> Clone for Repository<S, T> {
    fn clone(&self) -> Self {
        Self::new(self.store.clone())
    }
}

impl<S, T> Repository<S, T>
where
    S: DocumentStore,
    T: Entity,
{
    /// Creates a new repository over the given store.
    pub fn new(store: S) -> Self {
        Self {
            store,
            _phantom: PhantomData,
        }
    }

    /// Returns a reference to the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Loads an entity by key.
    pub async fn load(&self, id: Uuid) -> Result<Option<Versioned<T>>, DomainError> {
        match self.store.get(T::COLLECTION, id).await? {
            Some(doc) => Ok(Some(Versioned::from_document(doc)?)),
            None => Ok(None),
        }
    }

    /// Loads every entity whose `field` equals `value`, oldest first.
    pub async fn find_by(
        &self,
        field: &str,
        value: impl Into<serde_json::Value>,
    ) -> Result<Vec<Versioned<T>>, DomainError> {
        let query = DocumentQuery::collection(T::COLLECTION).where_eq(field, value);
        self.find(query).await
    }

    /// Loads every entity of the collection, oldest first.
    pub async fn all(&self) -> Result<Vec<Versioned<T>>, DomainError> {
        self.find(DocumentQuery::collection(T::COLLECTION)).await
    }

    async fn find(&self, query: DocumentQuery) -> Result<Vec<Versioned<T>>, DomainError> {
        self.store
            .find(query)
            .await?
            .into_iter()
            .map(Versioned::from_document)
            .collect()
    }

    /// Writes a single entity and returns it with its new revision.
    pub async fn save(&self, mut entity: Versioned<T>) -> Result<Versioned<T>, DomainError> {
        let revisions = self
            .store
            .commit(WriteBatch::new().with(entity.save_op()?))
            .await?;
        entity.revision = revisions.first().copied().unwrap_or_default();
        entity.updated_at = Utc::now();
        Ok(entity)
    }

    /// Deletes a single entity at its loaded revision.
    pub async fn delete(&self, entity: &Versioned<T>) -> Result<(), DomainError> {
        self.store
            .commit(WriteBatch::new().with(entity.delete_op()))
            .await?;
        Ok(())
    }

    /// Commits a batch prepared by the caller.
    pub async fn commit(&self, batch: WriteBatch) -> Result<Vec<Revision>, DomainError> {
        Ok(self.store.commit(batch).await?)
    }
}
