use std::{fmt, str::FromStr};

use lazy_static::lazy_static;
use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

/// Balance every new account starts with: 100000.00.
pub const DEFAULT_BALANCE: Decimal = Decimal::from_parts(10_000_000, 0, 0, false, 2);

pub fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    Customer,
    Manager,
    Admin,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Customer => "Customer",
            Role::Manager => "Manager",
            Role::Admin => "Admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = anyhow::Error;

    // Older rows stored the staff roles in lowercase.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "customer" => Ok(Role::Customer),
            "manager" => Ok(Role::Manager),
            "admin" => Ok(Role::Admin),
            other => anyhow::bail!("unknown role {other:?}"),
        }
    }
}

/// User record as stored.
#[derive(Debug, Clone)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub password_hash: String, // argon2 PHC string, never serialized
    pub balance: Decimal,
    pub phone: Option<String>,
    pub role: Role,
    pub created_at: OffsetDateTime,
}

/// Everything needed to insert a user; balance and timestamps come from the store.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub phone: String,
    pub role: Role,
}

/// Audit row written once per successful login.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub user_id: Uuid,
    pub expires_at: OffsetDateTime,
}

/// How a login identifier is looked up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginIdentifier {
    Email(String),
    Username(String),
}

impl LoginIdentifier {
    pub fn classify(raw: &str) -> Self {
        if is_valid_email(raw) {
            LoginIdentifier::Email(raw.to_string())
        } else {
            LoginIdentifier::Username(raw.to_string())
        }
    }
}

/// Unique column hit by a duplicate insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DuplicateField {
    Username,
    Email,
}

impl DuplicateField {
    pub fn as_str(self) -> &'static str {
        match self {
            DuplicateField::Username => "username",
            DuplicateField::Email => "email",
        }
    }

    /// Prefers the violated constraint name; otherwise falls back to looking
    /// for "username" in the driver message, which is only a heuristic.
    pub fn attribute(constraint: Option<&str>, message: &str) -> Self {
        if let Some(name) = constraint {
            if name.contains("username") {
                return DuplicateField::Username;
            }
            if name.contains("email") {
                return DuplicateField::Email;
            }
        }
        if message.contains("username") {
            DuplicateField::Username
        } else {
            DuplicateField::Email
        }
    }
}

impl fmt::Display for DuplicateField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
