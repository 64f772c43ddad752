//! Startup fixtures: users with bearer tokens, and catalog products.
//!
//! ```json
//! {
//!   "users": [{ "name": "Admin", "email": "admin@example.com", "role": "admin", "token": "..." }],
//!   "products": [{ "name": "Widget", "price_cents": 1999, "count_in_stock": 10 }]
//! }
//! ```
//!
//! Loading is idempotent: users are matched by email and products by name,
//! so restarting against a persistent store does not duplicate anything.

use std::path::Path;

use document_store::DocumentStore;
use domain::{DomainError, Money, Role};
use serde::Deserialize;
use thiserror::Error;

use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct SeedFile {
    #[serde(default)]
    pub users: Vec<SeedUser>,
    #[serde(default)]
    pub products: Vec<SeedProduct>,
}

#[derive(Debug, Deserialize)]
pub struct SeedUser {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub role: Role,
    pub token: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SeedProduct {
    pub name: String,
    pub price_cents: i64,
    pub count_in_stock: u32,
}

/// What a seed run added.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct SeedSummary {
    pub users_created: usize,
    pub tokens_registered: usize,
    pub products_created: usize,
}

#[derive(Debug, Error)]
pub enum SeedError {
    #[error("Failed to read seed file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid seed file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid price for {name}: {price_cents}")]
    InvalidPrice { name: String, price_cents: i64 },

    #[error(transparent)]
    Domain(#[from] DomainError),
}

/// Reads a seed file and applies it.
pub async fn load_seed_file<S: DocumentStore + Clone>(
    path: &Path,
    state: &AppState<S>,
) -> Result<SeedSummary, SeedError> {
    let raw = tokio::fs::read_to_string(path).await?;
    let seed: SeedFile = serde_json::from_str(&raw)?;
    apply(seed, state).await
}

/// Creates whatever in `seed` does not exist yet.
#[tracing::instrument(skip_all)]
pub async fn apply<S: DocumentStore + Clone>(
    seed: SeedFile,
    state: &AppState<S>,
) -> Result<SeedSummary, SeedError> {
    let mut summary = SeedSummary::default();

    for entry in seed.users {
        let user = match state.users.find_by_email(&entry.email).await? {
            Some(user) => user,
            None => {
                summary.users_created += 1;
                state
                    .users
                    .register(&entry.name, &entry.email, entry.role)
                    .await?
            }
        };

        if let Some(token) = entry.token.as_deref() {
            if state.users.authenticate(token).await?.is_none() {
                state.users.register_token(user.id, token).await?;
                summary.tokens_registered += 1;
            }
        }
    }

    // Deactivated products still count, so a restart does not resurrect them
    let existing: Vec<String> = state
        .catalog
        .all_products()
        .await?
        .into_iter()
        .map(|p| p.name)
        .collect();

    for entry in seed.products {
        if entry.price_cents < 0 {
            return Err(SeedError::InvalidPrice {
                name: entry.name,
                price_cents: entry.price_cents,
            });
        }
        if existing.contains(&entry.name) {
            continue;
        }
        state
            .catalog
            .create_product(
                &entry.name,
                Money::from_cents(entry.price_cents),
                entry.count_in_stock,
            )
            .await?;
        summary.products_created += 1;
    }

    tracing::info!(
        users = summary.users_created,
        tokens = summary.tokens_registered,
        products = summary.products_created,
        "seed data applied"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use document_store::InMemoryDocumentStore;

    use super::*;

    fn seed() -> SeedFile {
        serde_json::from_value(serde_json::json!({
            "users": [
                { "name": "Admin", "email": "admin@example.com", "role": "admin", "token": "admin-token" },
                { "name": "Ada", "email": "ada@example.com", "token": "ada-token" }
            ],
            "products": [
                { "name": "Widget", "price_cents": 1999, "count_in_stock": 10 }
            ]
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn test_seed_creates_users_tokens_and_products() {
        let state = AppState::new(InMemoryDocumentStore::new());

        let summary = apply(seed(), &state).await.unwrap();
        assert_eq!(
            summary,
            SeedSummary {
                users_created: 2,
                tokens_registered: 2,
                products_created: 1,
            }
        );

        let admin = state.users.authenticate("admin-token").await.unwrap().unwrap();
        assert!(admin.is_admin());
        let ada = state.users.authenticate("ada-token").await.unwrap().unwrap();
        assert_eq!(ada.role, Role::Customer);
    }

    #[tokio::test]
    async fn test_seed_is_idempotent() {
        let state = AppState::new(InMemoryDocumentStore::new());
        apply(seed(), &state).await.unwrap();

        let summary = apply(seed(), &state).await.unwrap();
        assert_eq!(summary, SeedSummary::default());
        assert_eq!(state.catalog.active_products().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_seed_skips_deactivated_products() {
        let state = AppState::new(InMemoryDocumentStore::new());
        apply(seed(), &state).await.unwrap();
        let widget = state.catalog.active_products().await.unwrap().remove(0);
        state.catalog.deactivate_product(widget.id).await.unwrap();

        let summary = apply(seed(), &state).await.unwrap();
        assert_eq!(summary.products_created, 0);
        assert!(state.catalog.active_products().await.unwrap().is_empty());
        assert_eq!(state.catalog.all_products().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_negative_price_is_rejected() {
        let state = AppState::new(InMemoryDocumentStore::new());
        let seed = SeedFile {
            users: Vec::new(),
            products: vec![SeedProduct {
                name: "Broken".to_string(),
                price_cents: -1,
                count_in_stock: 1,
            }],
        };
        assert!(matches!(
            apply(seed, &state).await,
            Err(SeedError::InvalidPrice { .. })
        ));
    }
}
