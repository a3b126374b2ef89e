use axum::{extract::State, routing::get, Json, Router};
use tracing::instrument;

use super::services::{self, BalanceResponse};
use crate::{auth::extractors::AuthUser, error::ErrorReply, state::AppState};

pub fn balance_routes() -> Router<AppState> {
    Router::new().route("/balance", get(get_balance))
}

#[instrument(skip_all, fields(username = %identity.username))]
pub async fn get_balance(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
) -> Result<Json<BalanceResponse>, ErrorReply> {
    services::balance(state.store.as_ref(), &identity)
        .await
        .map(Json)
        .map_err(|e| e.in_env(state.config.environment))
}
