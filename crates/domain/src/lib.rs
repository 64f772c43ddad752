//! Domain layer for the storefront order lifecycle.
//!
//! This crate provides:
//! - Cart aggregator: one cart per user with price snapshots
//! - Order placer: cart to order with stock decrement, committed atomically
//! - Order status machine with stock restoration on cancel
//! - Inventory ledger checks over product stock counts
//! - Users and bearer-token resolution

pub mod cart;
pub mod catalog;
pub mod error;
pub mod money;
pub mod order;
pub mod repository;
pub mod user;

pub use cart::{Cart, CartError, CartItem, CartLine, CartService, CartView};
pub use catalog::{InventoryLedger, Product, ProductCatalog};
pub use common::{OrderId, ProductId, UserId};
pub use error::DomainError;
pub use money::Money;
pub use order::{
    AdminOrderEntry, Order, OrderError, OrderItem, OrderService, OrderStatus, PaymentMethod,
    PaymentStatus, ShippingAddress,
};
pub use repository::{Entity, Repository, Versioned};
pub use user::{Role, User, UserService, hash_token};
