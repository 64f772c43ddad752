//! Cart aggregator.

use common::{ProductId, UserId};
use document_store::DocumentStore;

use super::{Cart, CartError, CartLine, CartView};
use crate::catalog::InventoryLedger;
use crate::error::DomainError;
use crate::repository::{Repository, Versioned};

/// Service for a user's cart.
///
/// A cart is created lazily by the first add and never by a read. Every
/// write is guarded by the revision the cart was loaded at, so two requests
/// racing on the same cart cannot silently overwrite each other.
pub struct CartService<S: DocumentStore> {
    carts: Repository<S, Cart>,
    ledger: InventoryLedger<S>,
}

impl<S: DocumentStore + Clone> CartService<S> {
    /// Creates a new cart service with the given store.
    pub fn new(store: S) -> Self {
        Self {
            carts: Repository::new(store.clone()),
            ledger: InventoryLedger::new(store),
        }
    }

    async fn load(&self, user_id: UserId) -> Result<Option<Versioned<Cart>>, DomainError> {
        self.carts.load(user_id.as_uuid()).await
    }

    /// Adds `quantity` units of a product, creating the cart on first use.
    #[tracing::instrument(skip(self))]
    pub async fn add_item(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: i64,
    ) -> Result<CartView, DomainError> {
        if quantity < 1 {
            return Err(CartError::InvalidQuantity { quantity }.into());
        }

        let product = self.ledger.active_product(product_id).await?;

        let mut cart = self
            .load(user_id)
            .await?
            .unwrap_or_else(|| Versioned::new(Cart::new(user_id)));

        // The resulting line quantity must fit the ledger, not just the increment
        let resulting =
            u64::from(cart.quantity_of(product_id)).saturating_add(quantity.unsigned_abs());
        InventoryLedger::<S>::ensure_available(&product, resulting)?;

        // Bounded above by count_in_stock, so the conversion cannot fail
        let quantity = u32::try_from(quantity).unwrap_or(u32::MAX);

        cart.value.add(product_id, quantity, product.price);
        let cart = self.carts.save(cart).await?;

        metrics::counter!("cart_mutations_total", "op" => "add").increment(1);
        tracing::debug!(%user_id, %product_id, quantity, "item added to cart");

        self.present(cart).await
    }

    /// Returns the user's cart with products resolved.
    ///
    /// A user without a cart gets the empty shape; nothing is created.
    #[tracing::instrument(skip(self))]
    pub async fn get_cart(&self, user_id: UserId) -> Result<CartView, DomainError> {
        match self.load(user_id).await? {
            Some(cart) => self.present(cart).await,
            None => Ok(CartView::empty(user_id)),
        }
    }

    /// Sets a line to an exact quantity; zero or less removes the line.
    #[tracing::instrument(skip(self))]
    pub async fn update_quantity(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: i64,
    ) -> Result<CartView, DomainError> {
        let product = self.ledger.existing_product(product_id).await?;
        if quantity > 0 {
            InventoryLedger::<S>::ensure_available(&product, quantity.unsigned_abs())?;
        }

        let mut cart = self.load(user_id).await?.ok_or(CartError::CartNotFound)?;

        // Bounded above by count_in_stock, so the conversion cannot fail
        let quantity = u32::try_from(quantity.max(0)).unwrap_or(0);
        cart.value.set_quantity(product_id, quantity)?;
        let cart = self.carts.save(cart).await?;

        metrics::counter!("cart_mutations_total", "op" => "update").increment(1);

        self.present(cart).await
    }

    /// Removes a product's line. Removing an absent line is not an error.
    #[tracing::instrument(skip(self))]
    pub async fn remove_item(
        &self,
        user_id: UserId,
        product_id: ProductId,
    ) -> Result<CartView, DomainError> {
        let mut cart = self.load(user_id).await?.ok_or(CartError::CartNotFound)?;

        cart.value.remove(product_id);
        let cart = self.carts.save(cart).await?;

        metrics::counter!("cart_mutations_total", "op" => "remove").increment(1);

        self.present(cart).await
    }

    /// Deletes the cart outright.
    #[tracing::instrument(skip(self))]
    pub async fn clear(&self, user_id: UserId) -> Result<(), DomainError> {
        if let Some(cart) = self.load(user_id).await? {
            self.carts.delete(&cart).await?;
            metrics::counter!("cart_mutations_total", "op" => "clear").increment(1);
        }
        Ok(())
    }

    /// Resolves products for display, dropping lines whose product is gone.
    async fn present(&self, mut cart: Versioned<Cart>) -> Result<CartView, DomainError> {
        let mut lines = Vec::with_capacity(cart.items().len());
        let mut vanished = Vec::new();

        for item in cart.items() {
            match self.ledger.product(item.product_id).await? {
                Some(product) => lines.push(CartLine {
                    product: product.value,
                    quantity: item.quantity,
                    price: item.price,
                    line_total: item.line_total(),
                }),
                None => vanished.push(item.product_id),
            }
        }

        if !vanished.is_empty() {
            tracing::warn!(
                user_id = %cart.user_id(),
                dropped = vanished.len(),
                "dropping cart lines for removed products"
            );
            cart.value.retain(|i| !vanished.contains(&i.product_id));
            cart = self.carts.save(cart).await?;
        }

        Ok(CartView {
            user_id: cart.user_id(),
            items: lines,
            total_price: cart.total_price(),
        })
    }
}

#[cfg(test)]
mod tests {
    use document_store::InMemoryDocumentStore;

    use super::*;
    use crate::catalog::ProductCatalog;
    use crate::money::Money;

    #[tokio::test]
    async fn get_cart_without_cart_creates_nothing() {
        let store = InMemoryDocumentStore::new();
        let service = CartService::new(store.clone());
        let user = UserId::new();

        let view = service.get_cart(user).await.unwrap();
        assert_eq!(view, CartView::empty(user));
        assert_eq!(store.document_count().await, 0);
    }

    #[tokio::test]
    async fn add_rejects_non_positive_quantity() {
        let store = InMemoryDocumentStore::new();
        let catalog = ProductCatalog::new(store.clone());
        let product = catalog
            .create_product("Widget", Money::from_cents(100), 5)
            .await
            .unwrap();
        let service = CartService::new(store);

        for quantity in [0, -3] {
            let result = service.add_item(UserId::new(), product.id, quantity).await;
            assert!(matches!(
                result,
                Err(DomainError::Cart(CartError::InvalidQuantity { .. }))
            ));
        }
    }

    #[tokio::test]
    async fn oversized_quantity_is_insufficient_stock() {
        let store = InMemoryDocumentStore::new();
        let catalog = ProductCatalog::new(store.clone());
        let product = catalog
            .create_product("Widget", Money::from_cents(100), 5)
            .await
            .unwrap();
        let service = CartService::new(store);
        let user = UserId::new();

        let result = service.add_item(user, product.id, 5_000_000_000).await;
        match result {
            Err(DomainError::InsufficientStock {
                available,
                requested,
                ..
            }) => {
                assert_eq!(available, 5);
                assert_eq!(requested, 5_000_000_000);
            }
            other => panic!("expected InsufficientStock, got {other:?}"),
        }

        let result = service
            .update_quantity(user, product.id, 5_000_000_000)
            .await;
        assert!(matches!(
            result,
            Err(DomainError::InsufficientStock { requested: 5_000_000_000, .. })
        ));
    }
}
