//! Order entity.

use common::{OrderId, ProductId, UserId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{OrderError, OrderStatus, PaymentMethod, PaymentStatus};
use crate::money::Money;
use crate::repository::Entity;

/// A line of a placed order.
///
/// Name and price are copies taken at placement, so later product edits or
/// removal never change what the order says.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub product_id: ProductId,
    pub name: String,
    pub quantity: u32,
    pub price: Money,
}

impl OrderItem {
    /// Returns price × quantity.
    pub fn line_total(&self) -> Money {
        self.price.multiply(self.quantity)
    }
}

/// Free-form delivery address.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ShippingAddress {
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub postal_code: String,
    #[serde(default)]
    pub country: String,
}

/// A placed order.
///
/// Items, address and total are fixed at creation. Only `status` and
/// `payment_status` change afterwards, and only through [`Order::transition_to`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    id: OrderId,
    user_id: UserId,
    items: Vec<OrderItem>,
    shipping_address: ShippingAddress,
    payment_method: PaymentMethod,
    payment_status: PaymentStatus,
    total_price: Money,
    status: OrderStatus,
}

impl Order {
    /// Creates a pending, unpaid cash-on-delivery order.
    pub fn new(
        user_id: UserId,
        items: Vec<OrderItem>,
        shipping_address: ShippingAddress,
        total_price: Money,
    ) -> Self {
        Self {
            id: OrderId::new(),
            user_id,
            items,
            shipping_address,
            payment_method: PaymentMethod::CashOnDelivery,
            payment_status: PaymentStatus::Pending,
            total_price,
            status: OrderStatus::Pending,
        }
    }

    pub fn id(&self) -> OrderId {
        self.id
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn items(&self) -> &[OrderItem] {
        &self.items
    }

    pub fn shipping_address(&self) -> &ShippingAddress {
        &self.shipping_address
    }

    pub fn payment_method(&self) -> PaymentMethod {
        self.payment_method
    }

    pub fn payment_status(&self) -> PaymentStatus {
        self.payment_status
    }

    pub fn total_price(&self) -> Money {
        self.total_price
    }

    pub fn status(&self) -> OrderStatus {
        self.status
    }

    /// Returns true if `user_id` placed this order.
    pub fn is_owned_by(&self, user_id: UserId) -> bool {
        self.user_id == user_id
    }

    /// Moves the order to `next` if the status machine allows it.
    ///
    /// Delivery also marks the order as paid.
    pub fn transition_to(&mut self, next: OrderStatus) -> Result<(), OrderError> {
        if !self.status.can_transition_to(next) {
            return Err(OrderError::IllegalTransition {
                from: self.status,
                to: next,
            });
        }

        self.status = next;
        if next == OrderStatus::Delivered {
            self.payment_status = PaymentStatus::Paid;
        }
        Ok(())
    }

    /// Checks the cancel preconditions shared by user and admin cancellation.
    pub fn ensure_cancellable(&self) -> Result<(), OrderError> {
        match self.status {
            OrderStatus::Delivered => Err(OrderError::AlreadyDelivered),
            OrderStatus::Cancelled => Err(OrderError::AlreadyCancelled),
            OrderStatus::Pending | OrderStatus::Shipped => Ok(()),
        }
    }
}

impl Entity for Order {
    const COLLECTION: &'static str = "orders";

    fn document_id(&self) -> Uuid {
        self.id.as_uuid()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order() -> Order {
        Order::new(
            UserId::new(),
            vec![OrderItem {
                product_id: ProductId::new(),
                name: "Widget".to_string(),
                quantity: 2,
                price: Money::from_cents(100),
            }],
            ShippingAddress::default(),
            Money::from_cents(200),
        )
    }

    #[test]
    fn new_order_is_pending_cod_unpaid() {
        let order = order();
        assert_eq!(order.status(), OrderStatus::Pending);
        assert_eq!(order.payment_method(), PaymentMethod::CashOnDelivery);
        assert_eq!(order.payment_status(), PaymentStatus::Pending);
    }

    #[test]
    fn pending_shipped_delivered_marks_paid() {
        let mut order = order();
        order.transition_to(OrderStatus::Shipped).unwrap();
        assert_eq!(order.payment_status(), PaymentStatus::Pending);
        order.transition_to(OrderStatus::Delivered).unwrap();
        assert_eq!(order.status(), OrderStatus::Delivered);
        assert_eq!(order.payment_status(), PaymentStatus::Paid);
    }

    #[test]
    fn pending_to_delivered_is_rejected() {
        let mut order = order();
        let err = order.transition_to(OrderStatus::Delivered).unwrap_err();
        assert!(matches!(
            err,
            OrderError::IllegalTransition {
                from: OrderStatus::Pending,
                to: OrderStatus::Delivered
            }
        ));
        assert_eq!(order.status(), OrderStatus::Pending);
    }

    #[test]
    fn cancel_preconditions() {
        let mut order = order();
        assert!(order.ensure_cancellable().is_ok());

        order.transition_to(OrderStatus::Shipped).unwrap();
        assert!(order.ensure_cancellable().is_ok());

        order.transition_to(OrderStatus::Delivered).unwrap();
        assert!(matches!(
            order.ensure_cancellable(),
            Err(OrderError::AlreadyDelivered)
        ));

        let mut cancelled = self::order();
        cancelled.transition_to(OrderStatus::Cancelled).unwrap();
        assert!(matches!(
            cancelled.ensure_cancellable(),
            Err(OrderError::AlreadyCancelled)
        ));
    }

    #[test]
    fn ownership() {
        let order = order();
        assert!(order.is_owned_by(order.user_id()));
        assert!(!order.is_owned_by(UserId::new()));
    }
}
