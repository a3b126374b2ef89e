use anyhow::Context;
use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use tracing::debug;
use uuid::Uuid;

use super::{
    CredentialStore, DuplicateField, IssuedToken, LoginIdentifier, NewUser, StoreError, User,
};

#[derive(Clone)]
pub struct PgCredentialStore {
    db: PgPool,
}

impl PgCredentialStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[derive(Debug, FromRow)]
struct UserRow {
    id: Uuid,
    username: String,
    email: String,
    password_hash: String,
    balance: Decimal,
    phone: Option<String>,
    role: String,
    created_at: OffsetDateTime,
}

impl TryFrom<UserRow> for User {
    type Error = anyhow::Error;

    fn try_from(r: UserRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: r.id,
            username: r.username,
            email: r.email,
            password_hash: r.password_hash,
            balance: r.balance,
            phone: r.phone,
            role: r.role.parse()?,
            created_at: r.created_at,
        })
    }
}

/// Maps driver errors onto the store taxonomy. Unique violations name the
/// colliding field; connection-level failures become `Unavailable`.
fn classify(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db) = &err {
        if db.is_unique_violation() {
            return StoreError::Duplicate(DuplicateField::attribute(db.constraint(), db.message()));
        }
    }
    let offline = matches!(
        err,
        sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed
    );
    if offline {
        StoreError::Unavailable(err.to_string())
    } else {
        StoreError::Other(anyhow::Error::new(err))
    }
}

#[async_trait]
impl CredentialStore for PgCredentialStore {
    async fn create_user(&self, user: NewUser) -> Result<Uuid, StoreError> {
        let id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO users (id, username, email, password_hash, phone, role)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.phone)
        .bind(user.role.as_str())
        .fetch_one(&self.db)
        .await
        .map_err(classify)?;
        debug!(user_id = %id, "user row inserted");
        Ok(id)
    }

    async fn find_by_identifier(
        &self,
        identifier: &LoginIdentifier,
    ) -> Result<Option<User>, StoreError> {
        let (sql, value) = match identifier {
            LoginIdentifier::Email(email) => (
                r#"
                SELECT id, username, email, password_hash, balance, phone, role, created_at
                FROM users
                WHERE email = $1
                "#,
                email,
            ),
            LoginIdentifier::Username(username) => (
                r#"
                SELECT id, username, email, password_hash, balance, phone, role, created_at
                FROM users
                WHERE username = $1
                "#,
                username,
            ),
        };
        let row = sqlx::query_as::<_, UserRow>(sql)
            .bind(value)
            .fetch_optional(&self.db)
            .await
            .map_err(classify)?;
        row.map(User::try_from)
            .transpose()
            .context("decode user row")
            .map_err(StoreError::Other)
    }

    async fn balance_of(&self, username: &str) -> Result<Option<Decimal>, StoreError> {
        sqlx::query_scalar::<_, Decimal>(r#"SELECT balance FROM users WHERE username = $1"#)
            .bind(username)
            .fetch_optional(&self.db)
            .await
            .map_err(classify)
    }

    async fn record_issued_token(&self, token: &IssuedToken) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO issued_tokens (token, user_id, expires_at)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(&token.token)
        .bind(token.user_id)
        .bind(token.expires_at)
        .execute(&self.db)
        .await
        .map_err(classify)?;
        Ok(())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1")
            .execute(&self.db)
            .await
            .map_err(classify)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_failures_are_unavailable() {
        assert!(matches!(
            classify(sqlx::Error::PoolTimedOut),
            StoreError::Unavailable(_)
        ));
        let refused = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        assert!(matches!(
            classify(sqlx::Error::Io(refused)),
            StoreError::Unavailable(_)
        ));
    }

    #[test]
    fn missing_rows_are_other_errors() {
        assert!(matches!(
            classify(sqlx::Error::RowNotFound),
            StoreError::Other(_)
        ));
    }

    #[test]
    fn issued_token_column_holds_long_tokens() {
        let schema = include_str!("../../migrations/20250101000000_init.sql");
        let column = schema
            .lines()
            .find(|l| l.trim_start().starts_with("token "))
            .expect("issued_tokens.token column");
        assert!(column.contains("TEXT"), "{column}");

        let keys = crate::auth::jwt::JwtKeys::from_config(&crate::config::JwtConfig {
            secret: "s".into(),
            issuer: "kodbank".into(),
            audience: "kodbank-web".into(),
            ttl_minutes: 60,
        });
        let username = "€".repeat(100);
        let token = keys.issue(&username, crate::store::Role::Customer).unwrap().token;
        assert!(token.len() > 500);
    }

    #[test]
    fn unknown_role_fails_row_decoding() {
        let row = UserRow {
            id: Uuid::new_v4(),
            username: "bob".into(),
            email: "b@x.com".into(),
            password_hash: "h".into(),
            balance: Decimal::ZERO,
            phone: None,
            role: "teller".into(),
            created_at: OffsetDateTime::now_utc(),
        };
        assert!(User::try_from(row).is_err());
    }
}
