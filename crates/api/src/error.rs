//! API error types with HTTP response mapping.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use domain::{CartError, DomainError, OrderError};

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Bad request from the client.
    BadRequest(String),
    /// Missing or unknown bearer token.
    Unauthorized(String),
    /// Authenticated, but not allowed.
    Forbidden(String),
    /// Domain logic error.
    Domain(DomainError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            ApiError::Domain(err) => domain_error_to_response(err),
        };

        let body = serde_json::json!({ "error": message });
        (status, axum::Json(body)).into_response()
    }
}

fn domain_error_to_response(err: DomainError) -> (StatusCode, String) {
    match &err {
        DomainError::Cart(cart_err) => match cart_err {
            CartError::InvalidQuantity { .. } => (StatusCode::BAD_REQUEST, err.to_string()),
            CartError::CartNotFound | CartError::ItemNotInCart { .. } => {
                (StatusCode::NOT_FOUND, err.to_string())
            }
        },
        DomainError::Order(order_err) => match order_err {
            OrderError::NotFound => (StatusCode::NOT_FOUND, err.to_string()),
            OrderError::Forbidden => (StatusCode::FORBIDDEN, err.to_string()),
            OrderError::EmptyCart
            | OrderError::IllegalTransition { .. }
            | OrderError::AlreadyDelivered
            | OrderError::AlreadyCancelled => (StatusCode::BAD_REQUEST, err.to_string()),
        },
        DomainError::ProductNotFound(_) => (StatusCode::NOT_FOUND, "Product not found".to_string()),
        DomainError::UserNotFound(_) => (StatusCode::NOT_FOUND, "User not found".to_string()),
        DomainError::InsufficientStock { .. } | DomainError::DuplicateEmail(_) => {
            (StatusCode::BAD_REQUEST, err.to_string())
        }
        DomainError::Store(_) if err.is_conflict() => {
            tracing::warn!(error = %err, "request lost a concurrent write");
            (
                StatusCode::CONFLICT,
                "The resource was modified concurrently, please retry".to_string(),
            )
        }
        DomainError::Store(_) | DomainError::Serialization(_) => {
            tracing::error!(error = %err, "internal server error");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            )
        }
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        ApiError::Domain(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

#[cfg(test)]
mod tests {
    use common::ProductId;
    use document_store::{Revision, StoreError};

    use super::*;

    fn status_of(err: DomainError) -> StatusCode {
        domain_error_to_response(err).0
    }

    #[test]
    fn test_domain_status_mapping() {
        assert_eq!(
            status_of(DomainError::ProductNotFound(ProductId::new())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(OrderError::EmptyCart.into()),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(OrderError::Forbidden.into()),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            status_of(CartError::CartNotFound.into()),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(DomainError::InsufficientStock {
                product_id: ProductId::new(),
                name: "Widget".to_string(),
                available: 1,
                requested: 2,
            }),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_conflict_maps_to_409() {
        let err = DomainError::Store(StoreError::ConcurrencyConflict {
            collection: "products".to_string(),
            id: uuid::Uuid::new_v4(),
            expected: Revision::new(1),
            actual: Revision::new(2),
        });
        assert_eq!(status_of(err), StatusCode::CONFLICT);
    }
}
