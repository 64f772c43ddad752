//! Per-user shopping cart.

mod model;
mod service;

pub use model::{Cart, CartItem, CartLine, CartView};
pub use service::CartService;

use common::ProductId;
use thiserror::Error;

/// Errors that can occur during cart operations.
#[derive(Debug, Error)]
pub enum CartError {
    /// Quantity must be at least one when adding.
    #[error("Invalid quantity: {quantity} (must be at least 1)")]
    InvalidQuantity { quantity: i64 },

    /// The user has no cart.
    #[error("Cart not found")]
    CartNotFound,

    /// The cart has no line for this product.
    #[error("Product not in cart: {product_id}")]
    ItemNotInCart { product_id: ProductId },
}
