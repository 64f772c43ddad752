//! Order placement and the order status machine.

mod model;
mod service;
mod state;

pub use model::{Order, OrderItem, ShippingAddress};
pub use service::{AdminOrderEntry, OrderService};
pub use state::{OrderStatus, PaymentMethod, PaymentStatus};

use thiserror::Error;

/// Errors that can occur during order operations.
#[derive(Debug, Error)]
pub enum OrderError {
    /// Placement was attempted without any cart items.
    #[error("Cart is empty")]
    EmptyCart,

    /// The order does not exist.
    #[error("Order not found")]
    NotFound,

    /// The acting user does not own the order.
    #[error("Access denied")]
    Forbidden,

    /// The status machine does not allow this change.
    #[error("Cannot change status from {from} to {to}")]
    IllegalTransition { from: OrderStatus, to: OrderStatus },

    /// Delivered orders cannot be cancelled.
    #[error("Delivered order cannot be cancelled")]
    AlreadyDelivered,

    /// The order is already cancelled.
    #[error("Order already cancelled")]
    AlreadyCancelled,
}
