//! Domain error types.

use common::{ProductId, UserId};
use document_store::StoreError;
use thiserror::Error;

use crate::cart::CartError;
use crate::order::OrderError;

/// Errors that can occur during domain operations.
#[derive(Debug, Error)]
pub enum DomainError {
    /// An error occurred in the document store.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// A stored document could not be decoded or encoded.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The product does not exist or is no longer sold.
    #[error("Product not found: {0}")]
    ProductNotFound(ProductId),

    /// The requested quantity exceeds the inventory ledger.
    #[error("Only {available} units of {name} available in stock (requested {requested})")]
    InsufficientStock {
        product_id: ProductId,
        name: String,
        available: u32,
        requested: u64,
    },

    /// The user does not exist.
    #[error("User not found: {0}")]
    UserNotFound(UserId),

    /// A user with this email already exists.
    #[error("Email already registered: {0}")]
    DuplicateEmail(String),

    /// An error occurred in the cart aggregator.
    #[error("{0}")]
    Cart(#[from] CartError),

    /// An error occurred in order placement or the status machine.
    #[error("{0}")]
    Order(#[from] OrderError),
}

impl DomainError {
    /// Returns true if the failure was a lost race against a concurrent write.
    pub fn is_conflict(&self) -> bool {
        matches!(self, DomainError::Store(err) if err.is_conflict())
    }
}
