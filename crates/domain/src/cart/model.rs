//! Cart entity and its display form.

use common::{ProductId, UserId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::CartError;
use crate::catalog::Product;
use crate::money::Money;
use crate::repository::Entity;

/// A line in a cart.
///
/// `price` is the unit price captured when the product was first added. It
/// is a point-in-time snapshot and is not re-read from the product later.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub product_id: ProductId,
    pub quantity: u32,
    pub price: Money,
}

impl CartItem {
    /// Returns price × quantity.
    pub fn line_total(&self) -> Money {
        self.price.multiply(self.quantity)
    }
}

/// A user's cart. One per user, stored under the user's id.
///
/// `total_price` always equals the sum of the line totals; every mutation
/// recomputes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    user_id: UserId,
    items: Vec<CartItem>,
    total_price: Money,
}

impl Cart {
    /// Creates an empty cart for a user.
    pub fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            items: Vec::new(),
            total_price: Money::zero(),
        }
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    pub fn total_price(&self) -> Money {
        self.total_price
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Returns the line for a product, if any.
    pub fn item(&self, product_id: ProductId) -> Option<&CartItem> {
        self.items.iter().find(|i| i.product_id == product_id)
    }

    /// Returns how many units of a product are in the cart.
    pub fn quantity_of(&self, product_id: ProductId) -> u32 {
        self.item(product_id).map(|i| i.quantity).unwrap_or(0)
    }

    /// Adds units of a product.
    ///
    /// An existing line keeps its captured price and grows by `quantity`;
    /// otherwise a new line is appended at `price`.
    pub fn add(&mut self, product_id: ProductId, quantity: u32, price: Money) {
        match self.items.iter_mut().find(|i| i.product_id == product_id) {
            Some(item) => item.quantity = item.quantity.saturating_add(quantity),
            None => self.items.push(CartItem {
                product_id,
                quantity,
                price,
            }),
        }
        self.recompute_total();
    }

    /// Sets a line to an exact quantity. Zero removes the line.
    pub fn set_quantity(&mut self, product_id: ProductId, quantity: u32) -> Result<(), CartError> {
        let item = self
            .items
            .iter_mut()
            .find(|i| i.product_id == product_id)
            .ok_or(CartError::ItemNotInCart { product_id })?;

        if quantity == 0 {
            self.remove(product_id);
        } else {
            item.quantity = quantity;
            self.recompute_total();
        }
        Ok(())
    }

    /// Removes the line for a product. Returns true if a line was removed.
    pub fn remove(&mut self, product_id: ProductId) -> bool {
        let before = self.items.len();
        self.items.retain(|i| i.product_id != product_id);
        self.recompute_total();
        self.items.len() != before
    }

    /// Keeps only the lines for which `keep` returns true.
    pub fn retain(&mut self, mut keep: impl FnMut(&CartItem) -> bool) {
        self.items.retain(|i| keep(i));
        self.recompute_total();
    }

    fn recompute_total(&mut self) {
        self.total_price = self.items.iter().map(CartItem::line_total).sum();
    }
}

impl Entity for Cart {
    const COLLECTION: &'static str = "carts";

    fn document_id(&self) -> Uuid {
        self.user_id.as_uuid()
    }
}

/// A cart line with its product resolved for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CartLine {
    pub product: Product,
    pub quantity: u32,
    pub price: Money,
    pub line_total: Money,
}

/// A cart as shown to its owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CartView {
    pub user_id: UserId,
    pub items: Vec<CartLine>,
    pub total_price: Money,
}

impl CartView {
    /// The shape returned when the user has no cart yet.
    pub fn empty(user_id: UserId) -> Self {
        Self {
            user_id,
            items: Vec::new(),
            total_price: Money::zero(),
        }
    }
}
