use rust_decimal::Decimal;
use serde::Serialize;
use tracing::warn;

use crate::{
    auth::jwt::Identity,
    error::{ApiError, ApiResult},
    store::CredentialStore,
};

#[derive(Debug, Serialize)]
pub struct BalanceResponse {
    pub success: bool,
    /// Exact decimal internally; a JSON number on the wire.
    #[serde(with = "rust_decimal::serde::float")]
    pub balance: Decimal,
}

/// Looks up the balance of the already verified caller.
pub async fn balance(store: &dyn CredentialStore, identity: &Identity) -> ApiResult<BalanceResponse> {
    let Some(balance) = store.balance_of(&identity.username).await? else {
        warn!(username = %identity.username, "token valid but user is gone");
        return Err(ApiError::NotFound("User not found"));
    };
    Ok(BalanceResponse {
        success: true,
        balance,
    })
}
