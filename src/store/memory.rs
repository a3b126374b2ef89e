use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use rust_decimal::Decimal;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{
    types::DEFAULT_BALANCE, CredentialStore, DuplicateField, IssuedToken, LoginIdentifier,
    NewUser, StoreError, User,
};

/// Process-local store with the same uniqueness rules as the database.
/// Used by tests and local demos.
#[derive(Default)]
pub struct MemoryStore {
    users: RwLock<Vec<User>>,
    tokens: RwLock<Vec<IssuedToken>>,
    offline: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a fully formed user, bypassing registration.
    pub async fn seed(&self, user: User) {
        self.users.write().await.push(user);
    }

    pub async fn issued_tokens(&self) -> Vec<IssuedToken> {
        self.tokens.read().await.clone()
    }

    /// While offline every call fails as if the database were unreachable.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn check_online(&self) -> Result<(), StoreError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("connection refused".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl CredentialStore for MemoryStore {
    async fn create_user(&self, user: NewUser) -> Result<Uuid, StoreError> {
        self.check_online()?;
        let mut users = self.users.write().await;
        if users.iter().any(|u| u.username == user.username) {
            return Err(StoreError::Duplicate(DuplicateField::Username));
        }
        if users.iter().any(|u| u.email == user.email) {
            return Err(StoreError::Duplicate(DuplicateField::Email));
        }
        let id = Uuid::new_v4();
        users.push(User {
            id,
            username: user.username,
            email: user.email,
            password_hash: user.password_hash,
            balance: DEFAULT_BALANCE,
            phone: Some(user.phone),
            role: user.role,
            created_at: OffsetDateTime::now_utc(),
        });
        Ok(id)
    }

    async fn find_by_identifier(
        &self,
        identifier: &LoginIdentifier,
    ) -> Result<Option<User>, StoreError> {
        self.check_online()?;
        let users = self.users.read().await;
        let found = users.iter().find(|u| match identifier {
            LoginIdentifier::Email(email) => &u.email == email,
            LoginIdentifier::Username(username) => &u.username == username,
        });
        Ok(found.cloned())
    }

    async fn balance_of(&self, username: &str) -> Result<Option<Decimal>, StoreError> {
        self.check_online()?;
        let users = self.users.read().await;
        Ok(users
            .iter()
            .find(|u| u.username == username)
            .map(|u| u.balance))
    }

    async fn record_issued_token(&self, token: &IssuedToken) -> Result<(), StoreError> {
        self.check_online()?;
        self.tokens.write().await.push(token.clone());
        Ok(())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.check_online()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Role;

    fn new_user(username: &str, email: &str) -> NewUser {
        NewUser {
            username: username.into(),
            email: email.into(),
            password_hash: "hash".into(),
            phone: "111".into(),
            role: Role::Customer,
        }
    }

    #[tokio::test]
    async fn duplicates_name_the_colliding_field() {
        let store = MemoryStore::new();
        store.create_user(new_user("alice", "a@x.com")).await.unwrap();

        let err = store
            .create_user(new_user("alice", "other@x.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Duplicate(DuplicateField::Username)));

        let err = store
            .create_user(new_user("bob", "a@x.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Duplicate(DuplicateField::Email)));
    }

    #[tokio::test]
    async fn lookup_by_username_or_email() {
        let store = MemoryStore::new();
        let id = store.create_user(new_user("alice", "a@x.com")).await.unwrap();

        let by_name = store
            .find_by_identifier(&LoginIdentifier::classify("alice"))
            .await
            .unwrap()
            .unwrap();
        let by_email = store
            .find_by_identifier(&LoginIdentifier::classify("a@x.com"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(by_name.id, id);
        assert_eq!(by_email.id, id);
        assert_eq!(by_name.balance, DEFAULT_BALANCE);

        let missing = store
            .find_by_identifier(&LoginIdentifier::classify("nobody"))
            .await
            .unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn offline_store_reports_unavailable() {
        let store = MemoryStore::new();
        store.set_offline(true);
        assert!(matches!(
            store.balance_of("alice").await,
            Err(StoreError::Unavailable(_))
        ));
        store.set_offline(false);
        assert_eq!(store.balance_of("alice").await.unwrap(), None);
    }
}
