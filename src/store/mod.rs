//! Credential store: users and the issued-token audit log.
//!
//! Uniqueness of username and email is enforced by the store at insert time;
//! callers never check-then-insert.

use async_trait::async_trait;
use rust_decimal::Decimal;
use uuid::Uuid;

pub mod memory;
pub mod postgres;
pub mod types;

pub use types::{DuplicateField, IssuedToken, LoginIdentifier, NewUser, Role, User};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{0} already exists")]
    Duplicate(DuplicateField),

    #[error("store unreachable: {0}")]
    Unavailable(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Inserts a user and returns its id.
    async fn create_user(&self, user: NewUser) -> Result<Uuid, StoreError>;

    async fn find_by_identifier(
        &self,
        identifier: &LoginIdentifier,
    ) -> Result<Option<User>, StoreError>;

    async fn balance_of(&self, username: &str) -> Result<Option<Decimal>, StoreError>;

    /// Appends to the audit log. Rows are never read back for verification.
    async fn record_issued_token(&self, token: &IssuedToken) -> Result<(), StoreError>;

    async fn ping(&self) -> Result<(), StoreError>;
}
