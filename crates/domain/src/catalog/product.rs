use common::ProductId;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::money::Money;
use crate::repository::Entity;

/// A catalog product.
///
/// `count_in_stock` is the inventory ledger: the single source of truth for
/// how many units can still be ordered. Products are deactivated, never
/// deleted, by this crate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub price: Money,
    pub count_in_stock: u32,
    pub is_active: bool,
}

impl Product {
    /// Creates a new active product.
    pub fn new(name: impl Into<String>, price: Money, count_in_stock: u32) -> Self {
        Self {
            id: ProductId::new(),
            name: name.into(),
            price,
            count_in_stock,
            is_active: true,
        }
    }

    /// Returns true if `quantity` units can be taken from the ledger.
    pub fn has_stock_for(&self, quantity: u64) -> bool {
        quantity <= u64::from(self.count_in_stock)
    }
}

impl Entity for Product {
    const COLLECTION: &'static str = "products";

    fn document_id(&self) -> Uuid {
        self.id.as_uuid()
    }
}
