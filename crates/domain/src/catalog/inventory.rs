//! Inventory ledger accessors.
//!
//! Stock never changes through a blind write: every decrement or increment is
//! turned into a [`WriteOp`] guarded by the product revision that was read
//! when the sufficiency check ran. Committing that op in the same batch as
//! the order (or cart) change makes the check and the mutation one step.

use common::ProductId;
use document_store::{DocumentStore, WriteOp};

use super::Product;
use crate::error::DomainError;
use crate::repository::{Repository, Versioned};

/// Reads the ledger and prepares stock mutations.
pub struct InventoryLedger<S: DocumentStore> {
    products: Repository<S, Product>,
}

impl<S: DocumentStore + Clone> Clone for InventoryLedger<S> {
    fn clone(&self) -> Self {
        Self {
            products: self.products.clone(),
        }
    }
}

impl<S: DocumentStore> InventoryLedger<S> {
    /// Creates a ledger over the given store.
    pub fn new(store: S) -> Self {
        Self {
            products: Repository::new(store),
        }
    }

    /// Loads a product, whether active or not. `None` if it no longer exists.
    pub async fn product(&self, id: ProductId) -> Result<Option<Versioned<Product>>, DomainError> {
        self.products.load(id.as_uuid()).await
    }

    /// Loads a product that exists, active or not.
    pub async fn existing_product(&self, id: ProductId) -> Result<Versioned<Product>, DomainError> {
        self.product(id)
            .await?
            .ok_or(DomainError::ProductNotFound(id))
    }

    /// Loads a product that exists and is still sold.
    pub async fn active_product(&self, id: ProductId) -> Result<Versioned<Product>, DomainError> {
        match self.product(id).await? {
            Some(product) if product.is_active => Ok(product),
            _ => Err(DomainError::ProductNotFound(id)),
        }
    }

    /// Stock sufficiency check.
    pub fn ensure_available(product: &Product, requested: u64) -> Result<(), DomainError> {
        if product.has_stock_for(requested) {
            Ok(())
        } else {
            Err(insufficient(product, requested))
        }
    }

    /// Takes `quantity` units out of the ledger and returns the guarded write.
    pub fn take(product: &mut Versioned<Product>, quantity: u32) -> Result<WriteOp, DomainError> {
        let remaining = product
            .value
            .count_in_stock
            .checked_sub(quantity)
            .ok_or_else(|| insufficient(&product.value, u64::from(quantity)))?;
        product.value.count_in_stock = remaining;
        product.save_op()
    }

    /// Puts `quantity` units back into the ledger and returns the guarded write.
    pub fn restore(product: &mut Versioned<Product>, quantity: u32) -> Result<WriteOp, DomainError> {
        product.value.count_in_stock = product.value.count_in_stock.saturating_add(quantity);
        product.save_op()
    }
}

fn insufficient(product: &Product, requested: u64) -> DomainError {
    DomainError::InsufficientStock {
        product_id: product.id,
        name: product.name.clone(),
        available: product.count_in_stock,
        requested,
    }
}

#[cfg(test)]
mod tests {
    use document_store::{InMemoryDocumentStore, Revision};

    use super::*;
    use crate::money::Money;

    type Ledger = InventoryLedger<InMemoryDocumentStore>;

    fn stored(count: u32) -> Versioned<Product> {
        let mut product = Versioned::new(Product::new("Widget", Money::from_cents(500), count));
        product.revision = Revision::new(3);
        product
    }

    #[test]
    fn ensure_available_reports_shortfall() {
        let product = stored(2);
        assert!(Ledger::ensure_available(&product, 2).is_ok());

        match Ledger::ensure_available(&product, 3) {
            Err(DomainError::InsufficientStock {
                available,
                requested,
                name,
                ..
            }) => {
                assert_eq!(available, 2);
                assert_eq!(requested, 3);
                assert_eq!(name, "Widget");
            }
            other => panic!("expected InsufficientStock, got {other:?}"),
        }
    }

    #[test]
    fn take_never_goes_negative() {
        let mut product = stored(2);
        assert!(Ledger::take(&mut product, 3).is_err());
        assert_eq!(product.count_in_stock, 2);

        let op = Ledger::take(&mut product, 2).unwrap();
        assert_eq!(product.count_in_stock, 0);
        assert_eq!(op.expected(), Revision::new(3));
    }

    #[test]
    fn restore_adds_back() {
        let mut product = stored(0);
        let op = Ledger::restore(&mut product, 5).unwrap();
        assert_eq!(product.count_in_stock, 5);
        assert_eq!(op.id(), product.id.as_uuid());
    }

    #[tokio::test]
    async fn active_product_rejects_inactive() {
        let store = InMemoryDocumentStore::new();
        let repo: Repository<_, Product> = Repository::new(store.clone());
        let mut product = Product::new("Gone", Money::from_cents(100), 1);
        product.is_active = false;
        let id = product.id;
        repo.save(Versioned::new(product)).await.unwrap();

        let ledger = InventoryLedger::new(store);
        assert!(ledger.existing_product(id).await.is_ok());
        assert!(matches!(
            ledger.active_product(id).await,
            Err(DomainError::ProductNotFound(missing)) if missing == id
        ));
        assert!(ledger.product(ProductId::new()).await.unwrap().is_none());
    }
}
