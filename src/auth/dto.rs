use serde::{Deserialize, Serialize};

use crate::store::Role;

/// Request body for registration. Fields are optional so that missing ones
/// produce the API's own 400 instead of a deserializer rejection.
#[derive(Debug, Default, Deserialize)]
pub struct RegisterRequest {
    pub uname: Option<String>,
    pub password: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub role: Option<String>,
}

/// Request body for login. The identifier is taken from `username`, then
/// `uname`, then `email`.
#[derive(Debug, Default, Deserialize)]
pub struct LoginRequest {
    pub username: Option<String>,
    pub uname: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

impl LoginRequest {
    pub fn identifier(&self) -> Option<&str> {
        [&self.username, &self.uname, &self.email]
            .into_iter()
            .flatten()
            .map(String::as_str)
            .find(|v| !v.is_empty())
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterResponse {
    pub success: bool,
    pub message: &'static str,
    pub login_hint: LoginHint,
}

#[derive(Debug, Serialize)]
pub struct LoginHint {
    pub username: String,
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub success: bool,
    pub message: &'static str,
    pub user: PublicUser,
}

/// Public part of the user returned to the client.
#[derive(Debug, Serialize)]
pub struct PublicUser {
    pub username: String,
    pub email: String,
    pub role: Role,
}
