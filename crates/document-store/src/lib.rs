//! Revisioned JSON document store.
//!
//! Documents live in named collections and carry a [`Revision`] that every
//! write must match. Writes are grouped into a [`WriteBatch`] and committed
//! atomically, which lets callers turn a read-check-write sequence into a
//! single all-or-nothing step.

pub mod document;
pub mod error;
pub mod memory;
pub mod postgres;
pub mod query;
pub mod store;

pub use document::{Document, Revision, WriteBatch, WriteOp};
pub use error::{Result, StoreError};
pub use memory::InMemoryDocumentStore;
pub use postgres::PostgresDocumentStore;
pub use query::DocumentQuery;
pub use store::{DocumentStore, DocumentStoreExt, validate_batch};
