//! Order placement, history and status endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use common::OrderId;
use document_store::DocumentStore;
use domain::{
    AdminOrderEntry, Order, OrderStatus, PaymentMethod, PaymentStatus, ShippingAddress, Versioned,
};
use serde::{Deserialize, Serialize};

use super::cart::MessageResponse;
use super::parse_id;
use crate::AppState;
use crate::auth::{AdminUser, AuthUser};
use crate::error::ApiError;
use crate::extract::{ApiJson, OptionalApiJson};

// -- Request types --

#[derive(Default, Deserialize)]
pub struct PlaceOrderRequest {
    #[serde(default)]
    pub shipping_address: ShippingAddress,
}

#[derive(Deserialize)]
pub struct SetStatusRequest {
    pub status: String,
}

// -- Response types --

#[derive(Serialize)]
pub struct OrderItemResponse {
    pub product_id: String,
    pub name: String,
    pub quantity: u32,
    pub price_cents: i64,
}

#[derive(Serialize)]
pub struct OrderResponse {
    pub id: String,
    pub user_id: String,
    pub items: Vec<OrderItemResponse>,
    pub shipping_address: ShippingAddress,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    pub total_price_cents: i64,
    pub status: OrderStatus,
    pub created_at: String,
    pub updated_at: String,
}

impl From<&Versioned<Order>> for OrderResponse {
    fn from(order: &Versioned<Order>) -> Self {
        Self {
            id: order.id().to_string(),
            user_id: order.user_id().to_string(),
            items: order
                .items()
                .iter()
                .map(|item| OrderItemResponse {
                    product_id: item.product_id.to_string(),
                    name: item.name.clone(),
                    quantity: item.quantity,
                    price_cents: item.price.cents(),
                })
                .collect(),
            shipping_address: order.shipping_address().clone(),
            payment_method: order.payment_method(),
            payment_status: order.payment_status(),
            total_price_cents: order.total_price().cents(),
            status: order.status(),
            created_at: order.created_at.to_rfc3339(),
            updated_at: order.updated_at.to_rfc3339(),
        }
    }
}

#[derive(Serialize)]
pub struct OrderOwnerResponse {
    pub id: String,
    pub name: String,
    pub email: String,
}

#[derive(Serialize)]
pub struct AdminOrderResponse {
    #[serde(flatten)]
    pub order: OrderResponse,
    pub user: Option<OrderOwnerResponse>,
}

impl From<&AdminOrderEntry> for AdminOrderResponse {
    fn from(entry: &AdminOrderEntry) -> Self {
        Self {
            order: (&entry.order).into(),
            user: entry.user.as_ref().map(|user| OrderOwnerResponse {
                id: user.id.to_string(),
                name: user.name.clone(),
                email: user.email.clone(),
            }),
        }
    }
}

// -- Handlers --

/// POST /api/orders: turn the caller's cart into an order.
#[tracing::instrument(skip(state, user, req), fields(user_id = %user.0.id))]
pub async fn create<S: DocumentStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    user: AuthUser,
    OptionalApiJson(req): OptionalApiJson<PlaceOrderRequest>,
) -> Result<(StatusCode, Json<OrderResponse>), ApiError> {
    let order = state
        .orders
        .place_order(user.0.id, req.shipping_address)
        .await?;
    Ok((StatusCode::CREATED, Json((&order).into())))
}

/// GET /api/orders/myorders: the caller's orders, newest first.
#[tracing::instrument(skip(state, user), fields(user_id = %user.0.id))]
pub async fn mine<S: DocumentStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    user: AuthUser,
) -> Result<Json<Vec<OrderResponse>>, ApiError> {
    let orders = state.orders.orders_for_user(user.0.id).await?;
    Ok(Json(orders.iter().map(OrderResponse::from).collect()))
}

/// GET /api/orders/{id}: one order, for its owner or an admin.
#[tracing::instrument(skip(state, user), fields(user_id = %user.0.id))]
pub async fn get<S: DocumentStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order_id: OrderId = parse_id(&id, "order")?;
    let order = state.orders.get_order_for(&user.0, order_id).await?;
    Ok(Json((&order).into()))
}

/// PUT /api/orders/{id}/cancel: owner cancels their order.
#[tracing::instrument(skip(state, user), fields(user_id = %user.0.id))]
pub async fn cancel<S: DocumentStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    let order_id: OrderId = parse_id(&id, "order")?;
    state.orders.cancel_by_user(user.0.id, order_id).await?;
    Ok(Json(MessageResponse {
        message: "Order cancelled",
    }))
}

/// GET /api/orders: every order with its owner (admin).
#[tracing::instrument(skip(state, _admin))]
pub async fn list_all<S: DocumentStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    _admin: AdminUser,
) -> Result<Json<Vec<AdminOrderResponse>>, ApiError> {
    let entries = state.orders.all_orders().await?;
    Ok(Json(entries.iter().map(AdminOrderResponse::from).collect()))
}

/// PUT /api/orders/{id}/status: move an order through the status machine (admin).
#[tracing::instrument(skip(state, _admin, req))]
pub async fn set_status<S: DocumentStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    _admin: AdminUser,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<SetStatusRequest>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order_id: OrderId = parse_id(&id, "order")?;
    let status: OrderStatus = req.status.parse().map_err(ApiError::BadRequest)?;
    let order = state.orders.set_status(order_id, status).await?;
    Ok(Json((&order).into()))
}

/// PUT /api/orders/{id}/admin-cancel: cancel any order (admin).
#[tracing::instrument(skip(state, _admin))]
pub async fn admin_cancel<S: DocumentStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    _admin: AdminUser,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    let order_id: OrderId = parse_id(&id, "order")?;
    state.orders.cancel_by_admin(order_id).await?;
    Ok(Json(MessageResponse {
        message: "Order cancelled by admin",
    }))
}
