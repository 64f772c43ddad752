//! Cart endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use common::ProductId;
use document_store::DocumentStore;
use domain::{CartLine, CartView, Product};
use serde::{Deserialize, Serialize};

use super::parse_id;
use crate::AppState;
use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::extract::ApiJson;

// -- Request types --

#[derive(Deserialize)]
pub struct AddToCartRequest {
    pub product_id: String,
    #[serde(default = "default_quantity")]
    pub quantity: i64,
}

fn default_quantity() -> i64 {
    1
}

#[derive(Deserialize)]
pub struct UpdateCartRequest {
    pub product_id: String,
    pub quantity: i64,
}

// -- Response types --

#[derive(Serialize)]
pub struct ProductResponse {
    pub id: String,
    pub name: String,
    pub price_cents: i64,
    pub count_in_stock: u32,
    pub is_active: bool,
}

impl From<Product> for ProductResponse {
    fn from(product: Product) -> Self {
        Self {
            id: product.id.to_string(),
            name: product.name,
            price_cents: product.price.cents(),
            count_in_stock: product.count_in_stock,
            is_active: product.is_active,
        }
    }
}

#[derive(Serialize)]
pub struct CartLineResponse {
    pub product_id: String,
    pub product: ProductResponse,
    pub quantity: u32,
    pub price_cents: i64,
    pub line_total_cents: i64,
}

impl From<CartLine> for CartLineResponse {
    fn from(line: CartLine) -> Self {
        Self {
            product_id: line.product.id.to_string(),
            product: line.product.into(),
            quantity: line.quantity,
            price_cents: line.price.cents(),
            line_total_cents: line.line_total.cents(),
        }
    }
}

#[derive(Serialize)]
pub struct CartResponse {
    pub user_id: String,
    pub items: Vec<CartLineResponse>,
    pub total_price_cents: i64,
}

impl From<CartView> for CartResponse {
    fn from(view: CartView) -> Self {
        Self {
            user_id: view.user_id.to_string(),
            items: view.items.into_iter().map(CartLineResponse::from).collect(),
            total_price_cents: view.total_price.cents(),
        }
    }
}

#[derive(Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

// -- Handlers --

/// POST /api/cart/add: add a product to the caller's cart.
#[tracing::instrument(skip(state, user, req), fields(user_id = %user.0.id))]
pub async fn add<S: DocumentStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    user: AuthUser,
    ApiJson(req): ApiJson<AddToCartRequest>,
) -> Result<Json<CartResponse>, ApiError> {
    let product_id: ProductId = parse_id(&req.product_id, "product")?;
    let cart = state
        .carts
        .add_item(user.0.id, product_id, req.quantity)
        .await?;
    Ok(Json(cart.into()))
}

/// GET /api/cart: the caller's cart, or the empty shape.
#[tracing::instrument(skip(state, user), fields(user_id = %user.0.id))]
pub async fn get<S: DocumentStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    user: AuthUser,
) -> Result<Json<CartResponse>, ApiError> {
    let cart = state.carts.get_cart(user.0.id).await?;
    Ok(Json(cart.into()))
}

/// PUT /api/cart/update: set a line to an exact quantity.
#[tracing::instrument(skip(state, user, req), fields(user_id = %user.0.id))]
pub async fn update<S: DocumentStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    user: AuthUser,
    ApiJson(req): ApiJson<UpdateCartRequest>,
) -> Result<Json<CartResponse>, ApiError> {
    let product_id: ProductId = parse_id(&req.product_id, "product")?;
    let cart = state
        .carts
        .update_quantity(user.0.id, product_id, req.quantity)
        .await?;
    Ok(Json(cart.into()))
}

/// DELETE /api/cart/remove/{product_id}: drop a line from the cart.
#[tracing::instrument(skip(state, user), fields(user_id = %user.0.id))]
pub async fn remove<S: DocumentStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    user: AuthUser,
    Path(product_id): Path<String>,
) -> Result<Json<CartResponse>, ApiError> {
    let product_id: ProductId = parse_id(&product_id, "product")?;
    let cart = state.carts.remove_item(user.0.id, product_id).await?;
    Ok(Json(cart.into()))
}

/// DELETE /api/cart/clear: delete the caller's cart.
#[tracing::instrument(skip(state, user), fields(user_id = %user.0.id))]
pub async fn clear<S: DocumentStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    user: AuthUser,
) -> Result<Json<MessageResponse>, ApiError> {
    state.carts.clear(user.0.id).await?;
    Ok(Json(MessageResponse {
        message: "Cart cleared",
    }))
}
