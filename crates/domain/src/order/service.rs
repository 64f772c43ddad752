//! Order placer and order status machine.

use std::collections::{BTreeMap, HashMap};

use common::{OrderId, ProductId, UserId};
use document_store::{DocumentStore, WriteBatch};

use super::{Order, OrderError, OrderItem, OrderStatus, ShippingAddress};
use crate::cart::Cart;
use crate::catalog::InventoryLedger;
use crate::error::DomainError;
use crate::repository::{Repository, Versioned};
use crate::user::User;

/// An order as listed for administrators, with its owner resolved.
#[derive(Debug, Clone)]
pub struct AdminOrderEntry {
    pub order: Versioned<Order>,
    /// `None` if the owning account no longer exists.
    pub user: Option<User>,
}

/// Service for placing orders and moving them through their lifecycle.
///
/// Each workflow reads what it needs, checks it, and then commits every
/// resulting write (stock, order, cart) as one revision-guarded batch. A
/// concurrent change to any of those documents makes the whole batch fail
/// with a conflict and leaves nothing half-applied.
pub struct OrderService<S: DocumentStore> {
    orders: Repository<S, Order>,
    carts: Repository<S, Cart>,
    users: Repository<S, User>,
    ledger: InventoryLedger<S>,
}

impl<S: DocumentStore + Clone> OrderService<S> {
    /// Creates a new order service with the given store.
    pub fn new(store: S) -> Self {
        Self {
            orders: Repository::new(store.clone()),
            carts: Repository::new(store.clone()),
            users: Repository::new(store.clone()),
            ledger: InventoryLedger::new(store),
        }
    }

    /// Converts the user's cart into an order.
    ///
    /// Every line is checked against the ledger before anything is written.
    /// The stock decrements, the new order and the cart deletion are then
    /// committed together.
    #[tracing::instrument(skip(self, shipping_address))]
    pub async fn place_order(
        &self,
        user_id: UserId,
        shipping_address: ShippingAddress,
    ) -> Result<Versioned<Order>, DomainError> {
        let mut cart = self
            .carts
            .load(user_id.as_uuid())
            .await?
            .filter(|c| !c.is_empty())
            .ok_or(OrderError::EmptyCart)?;

        let mut products = Vec::with_capacity(cart.items().len());
        let mut vanished = Vec::new();
        for item in cart.items() {
            match self.ledger.product(item.product_id).await? {
                Some(product) => products.push(product),
                None => vanished.push(item.product_id),
            }
        }

        // Lines for removed products are dropped, as the cart view does
        if !vanished.is_empty() {
            tracing::warn!(
                %user_id,
                dropped = vanished.len(),
                "dropping cart lines for removed products"
            );
            cart.value.retain(|i| !vanished.contains(&i.product_id));
            if cart.is_empty() {
                return Err(OrderError::EmptyCart.into());
            }
        }

        // Sufficiency check for the whole cart before any mutation
        for (item, product) in cart.items().iter().zip(&products) {
            InventoryLedger::<S>::ensure_available(product, u64::from(item.quantity))?;
        }

        let items = cart
            .items()
            .iter()
            .zip(&products)
            .map(|(item, product)| OrderItem {
                product_id: item.product_id,
                name: product.name.clone(),
                quantity: item.quantity,
                price: item.price,
            })
            .collect();

        // The cart keeps its total in step with its lines, so it is copied as is
        let mut order = Versioned::new(Order::new(
            user_id,
            items,
            shipping_address,
            cart.total_price(),
        ));

        let mut batch = WriteBatch::new();
        for (item, product) in cart.items().iter().zip(products.iter_mut()) {
            batch.push(InventoryLedger::<S>::take(product, item.quantity)?);
        }
        batch.push(order.save_op()?);
        batch.push(cart.delete_op());

        let revisions = self.orders.commit(batch).await?;
        // Order op sits just before the trailing cart delete
        if let Some(revision) = revisions.iter().rev().nth(1) {
            order.revision = *revision;
        }

        metrics::counter!("orders_placed_total").increment(1);
        tracing::info!(
            order_id = %order.id(),
            %user_id,
            items = order.items().len(),
            total = %order.total_price(),
            "order placed"
        );

        Ok(order)
    }

    /// Loads an order by id.
    pub async fn get_order(&self, order_id: OrderId) -> Result<Versioned<Order>, DomainError> {
        Ok(self
            .orders
            .load(order_id.as_uuid())
            .await?
            .ok_or(OrderError::NotFound)?)
    }

    /// Loads an order the actor may see: their own, or any for an admin.
    pub async fn get_order_for(
        &self,
        actor: &User,
        order_id: OrderId,
    ) -> Result<Versioned<Order>, DomainError> {
        let order = self.get_order(order_id).await?;
        if !actor.is_admin() && !order.is_owned_by(actor.id) {
            return Err(OrderError::Forbidden.into());
        }
        Ok(order)
    }

    /// Lists a user's orders, newest first.
    #[tracing::instrument(skip(self))]
    pub async fn orders_for_user(
        &self,
        user_id: UserId,
    ) -> Result<Vec<Versioned<Order>>, DomainError> {
        let mut orders = self.orders.find_by("user_id", user_id.to_string()).await?;
        orders.reverse();
        Ok(orders)
    }

    /// Lists every order with its owner, newest first.
    #[tracing::instrument(skip(self))]
    pub async fn all_orders(&self) -> Result<Vec<AdminOrderEntry>, DomainError> {
        let mut orders = self.orders.all().await?;
        orders.reverse();

        let mut owners: HashMap<UserId, Option<User>> = HashMap::new();
        let mut entries = Vec::with_capacity(orders.len());
        for order in orders {
            let user_id = order.user_id();
            let user = match owners.get(&user_id) {
                Some(user) => user.clone(),
                None => {
                    let user = self.users.load(user_id.as_uuid()).await?.map(|u| u.value);
                    owners.insert(user_id, user.clone());
                    user
                }
            };
            entries.push(AdminOrderEntry { order, user });
        }
        Ok(entries)
    }

    /// Admin status change, validated against the status machine.
    ///
    /// Moving to `Cancelled` restores stock; moving to `Delivered` marks
    /// the order paid.
    #[tracing::instrument(skip(self))]
    pub async fn set_status(
        &self,
        order_id: OrderId,
        next: OrderStatus,
    ) -> Result<Versioned<Order>, DomainError> {
        let order = self.get_order(order_id).await?;
        self.transition(order, next).await
    }

    /// Cancellation requested by the order's owner.
    #[tracing::instrument(skip(self))]
    pub async fn cancel_by_user(
        &self,
        user_id: UserId,
        order_id: OrderId,
    ) -> Result<Versioned<Order>, DomainError> {
        let order = self.get_order(order_id).await?;
        if !order.is_owned_by(user_id) {
            return Err(OrderError::Forbidden.into());
        }
        order.ensure_cancellable()?;

        let order = self.transition(order, OrderStatus::Cancelled).await?;
        metrics::counter!("orders_cancelled_total", "by" => "user").increment(1);
        Ok(order)
    }

    /// Cancellation by an administrator, without the ownership check.
    #[tracing::instrument(skip(self))]
    pub async fn cancel_by_admin(&self, order_id: OrderId) -> Result<Versioned<Order>, DomainError> {
        let order = self.get_order(order_id).await?;
        order.ensure_cancellable()?;

        let order = self.transition(order, OrderStatus::Cancelled).await?;
        metrics::counter!("orders_cancelled_total", "by" => "admin").increment(1);
        Ok(order)
    }

    /// Applies a status change and commits it with any stock restoration.
    async fn transition(
        &self,
        mut order: Versioned<Order>,
        next: OrderStatus,
    ) -> Result<Versioned<Order>, DomainError> {
        let from = order.status();
        order.value.transition_to(next)?;

        let mut batch = if next == OrderStatus::Cancelled {
            self.restore_stock_for_order(&order).await?
        } else {
            WriteBatch::new()
        };
        batch.push(order.save_op()?);

        let revisions = self.orders.commit(batch).await?;
        if let Some(revision) = revisions.last() {
            order.revision = *revision;
        }

        metrics::counter!("order_status_changes_total", "status" => next.as_str()).increment(1);
        tracing::info!(order_id = %order.id(), %from, to = %next, "order status changed");

        Ok(order)
    }

    /// Prepares the writes that put an order's quantities back in stock.
    ///
    /// Products that no longer exist are skipped.
    async fn restore_stock_for_order(&self, order: &Order) -> Result<WriteBatch, DomainError> {
        let mut quantities: BTreeMap<ProductId, u32> = BTreeMap::new();
        for item in order.items() {
            let entry = quantities.entry(item.product_id).or_default();
            *entry = entry.saturating_add(item.quantity);
        }

        let mut batch = WriteBatch::new();
        for (product_id, quantity) in quantities {
            match self.ledger.product(product_id).await? {
                Some(mut product) => {
                    batch.push(InventoryLedger::<S>::restore(&mut product, quantity)?);
                }
                None => {
                    tracing::warn!(
                        order_id = %order.id(),
                        %product_id,
                        quantity,
                        "product no longer exists, skipping stock restoration"
                    );
                }
            }
        }
        Ok(batch)
    }
}
