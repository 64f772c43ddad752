use common::ProductId;
use document_store::DocumentStore;

use super::{InventoryLedger, Product};
use crate::error::DomainError;
use crate::money::Money;
use crate::repository::{Repository, Versioned};

/// Admin-side access to catalog products.
///
/// Search, categories and images belong to the catalog service proper; this
/// covers what the cart and order workflows need to exist.
pub struct ProductCatalog<S: DocumentStore> {
    products: Repository<S, Product>,
    ledger: InventoryLedger<S>,
}

impl<S: DocumentStore + Clone> ProductCatalog<S> {
    /// Creates a catalog over the given store.
    pub fn new(store: S) -> Self {
        Self {
            products: Repository::new(store.clone()),
            ledger: InventoryLedger::new(store),
        }
    }

    /// Adds a product to the catalog.
    #[tracing::instrument(skip(self))]
    pub async fn create_product(
        &self,
        name: &str,
        price: Money,
        count_in_stock: u32,
    ) -> Result<Product, DomainError> {
        let product = Product::new(name, price, count_in_stock);
        let saved = self.products.save(Versioned::new(product)).await?;
        tracing::info!(product_id = %saved.id, "product created");
        Ok(saved.value)
    }

    /// Loads a product, active or not.
    pub async fn get_product(&self, id: ProductId) -> Result<Option<Product>, DomainError> {
        Ok(self.ledger.product(id).await?.map(|p| p.value))
    }

    /// Lists every product, deactivated ones included.
    pub async fn all_products(&self) -> Result<Vec<Product>, DomainError> {
        Ok(self.products.all().await?.into_iter().map(|p| p.value).collect())
    }

    /// Lists products that are still sold.
    pub async fn active_products(&self) -> Result<Vec<Product>, DomainError> {
        Ok(self
            .all_products()
            .await?
            .into_iter()
            .filter(|p| p.is_active)
            .collect())
    }

    /// Soft-deletes a product. Existing carts and orders keep referencing it.
    #[tracing::instrument(skip(self))]
    pub async fn deactivate_product(&self, id: ProductId) -> Result<Product, DomainError> {
        let mut product = self.ledger.existing_product(id).await?;
        product.value.is_active = false;
        Ok(self.products.save(product).await?.value)
    }

    /// Overwrites the stock count (admin restock).
    #[tracing::instrument(skip(self))]
    pub async fn set_stock(&self, id: ProductId, count_in_stock: u32) -> Result<Product, DomainError> {
        let mut product = self.ledger.existing_product(id).await?;
        product.value.count_in_stock = count_in_stock;
        Ok(self.products.save(product).await?.value)
    }
}

#[cfg(test)]
mod tests {
    use document_store::InMemoryDocumentStore;

    use super::*;

    #[tokio::test]
    async fn create_and_deactivate() {
        let catalog = ProductCatalog::new(InMemoryDocumentStore::new());
        let product = catalog
            .create_product("Widget", Money::from_cents(1000), 5)
            .await
            .unwrap();

        assert_eq!(catalog.active_products().await.unwrap().len(), 1);

        let product = catalog.deactivate_product(product.id).await.unwrap();
        assert!(!product.is_active);
        assert!(catalog.active_products().await.unwrap().is_empty());

        // Still loadable for order history
        assert!(catalog.get_product(product.id).await.unwrap().is_some());
        assert_eq!(catalog.all_products().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn set_stock_on_missing_product_fails() {
        let catalog = ProductCatalog::new(InMemoryDocumentStore::new());
        let result = catalog.set_stock(ProductId::new(), 3).await;
        assert!(matches!(result, Err(DomainError::ProductNotFound(_))));
    }
}
