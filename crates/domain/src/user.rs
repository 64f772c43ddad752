//! Users and bearer-token sessions.
//!
//! Sign-up and login flows live outside this crate. What the order
//! workflows need is an identity per request and an admin flag, so this
//! module stores users and resolves opaque bearer tokens to them. Only the
//! SHA-256 digest of a token is persisted.

use common::UserId;
use document_store::DocumentStore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::error::DomainError;
use crate::repository::{Entity, Repository, Versioned};

/// What a user is allowed to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Customer,
    Admin,
}

/// A shopper or administrator account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub role: Role,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

impl Entity for User {
    const COLLECTION: &'static str = "users";

    fn document_id(&self) -> Uuid {
        self.id.as_uuid()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Session {
    id: Uuid,
    user_id: UserId,
    token_hash: String,
}

impl Entity for Session {
    const COLLECTION: &'static str = "sessions";

    fn document_id(&self) -> Uuid {
        self.id
    }
}

/// Returns the hex SHA-256 digest under which a token is stored.
pub fn hash_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

fn generate_token() -> String {
    format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple())
}

/// Service for user accounts and token resolution.
pub struct UserService<S: DocumentStore> {
    users: Repository<S, User>,
    sessions: Repository<S, Session>,
}

impl<S: DocumentStore + Clone> UserService<S> {
    /// Creates a new user service with the given store.
    pub fn new(store: S) -> Self {
        Self {
            users: Repository::new(store.clone()),
            sessions: Repository::new(store),
        }
    }

    /// Creates a user. Emails are unique, compared case-insensitively.
    #[tracing::instrument(skip(self))]
    pub async fn register(&self, name: &str, email: &str, role: Role) -> Result<User, DomainError> {
        let email = email.trim().to_lowercase();
        if self.find_by_email(&email).await?.is_some() {
            return Err(DomainError::DuplicateEmail(email));
        }

        let user = User {
            id: UserId::new(),
            name: name.trim().to_string(),
            email,
            role,
        };
        let saved = self.users.save(Versioned::new(user)).await?;
        tracing::info!(user_id = %saved.id, role = ?saved.role, "user registered");
        Ok(saved.value)
    }

    /// Loads a user by id.
    pub async fn get_user(&self, id: UserId) -> Result<Option<User>, DomainError> {
        Ok(self.users.load(id.as_uuid()).await?.map(|u| u.value))
    }

    /// Loads a user by email.
    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>, DomainError> {
        let email = email.trim().to_lowercase();
        Ok(self
            .users
            .find_by("email", email)
            .await?
            .into_iter()
            .next()
            .map(|u| u.value))
    }

    /// Issues a fresh bearer token for a user and returns it.
    ///
    /// The plain token is only ever returned here.
    #[tracing::instrument(skip(self))]
    pub async fn issue_token(&self, user_id: UserId) -> Result<String, DomainError> {
        let token = generate_token();
        self.register_token(user_id, &token).await?;
        Ok(token)
    }

    /// Binds a caller-chosen token to a user (used for provisioning fixtures).
    #[tracing::instrument(skip(self, token))]
    pub async fn register_token(&self, user_id: UserId, token: &str) -> Result<(), DomainError> {
        if self.get_user(user_id).await?.is_none() {
            return Err(DomainError::UserNotFound(user_id));
        }

        let session = Session {
            id: Uuid::new_v4(),
            user_id,
            token_hash: hash_token(token),
        };
        self.sessions.save(Versioned::new(session)).await?;
        Ok(())
    }

    /// Resolves a bearer token to its user.
    pub async fn authenticate(&self, token: &str) -> Result<Option<User>, DomainError> {
        let session = self
            .sessions
            .find_by("token_hash", hash_token(token))
            .await?
            .into_iter()
            .next();

        match session {
            Some(session) => self.get_user(session.user_id).await,
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use document_store::InMemoryDocumentStore;

    use super::*;

    #[test]
    fn token_hash_is_stable_hex() {
        let hash = hash_token("secret");
        assert_eq!(hash.len(), 64);
        assert_eq!(hash, hash_token("secret"));
        assert_ne!(hash, hash_token("Secret"));
    }

    #[tokio::test]
    async fn issued_token_authenticates() {
        let service = UserService::new(InMemoryDocumentStore::new());
        let user = service
            .register("Ada", "ada@example.com", Role::Customer)
            .await
            .unwrap();

        let token = service.issue_token(user.id).await.unwrap();
        let resolved = service.authenticate(&token).await.unwrap();
        assert_eq!(resolved, Some(user));

        assert!(service.authenticate("bogus").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected() {
        let service = UserService::new(InMemoryDocumentStore::new());
        service
            .register("Ada", "ada@example.com", Role::Customer)
            .await
            .unwrap();

        let result = service
            .register("Other", " ADA@example.com ", Role::Admin)
            .await;
        assert!(matches!(result, Err(DomainError::DuplicateEmail(_))));
    }

    #[tokio::test]
    async fn token_for_unknown_user_is_rejected() {
        let service = UserService::new(InMemoryDocumentStore::new());
        let result = service.register_token(UserId::new(), "t").await;
        assert!(matches!(result, Err(DomainError::UserNotFound(_))));
    }

    #[test]
    fn role_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Role::Admin).unwrap(), "\"admin\"");
    }
}
