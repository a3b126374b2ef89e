use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use tracing::instrument;

use super::{
    cookie::build_session_cookie,
    dto::{LoginRequest, RegisterRequest, RegisterResponse},
    services,
};
use crate::{
    error::{ApiError, ErrorReply},
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
}

fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload
        .map(|Json(body)| body)
        .map_err(|e| ApiError::Validation(format!("Invalid JSON body: {}", e.body_text())))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<RegisterResponse>), ErrorReply> {
    let env = state.config.environment;
    let req = json_body(payload).map_err(|e| e.in_env(env))?;
    let response = services::register(state.store.as_ref(), req)
        .await
        .map_err(|e| e.in_env(env))?;
    Ok((StatusCode::CREATED, Json(response)))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ErrorReply> {
    let env = state.config.environment;
    let req = json_body(payload).map_err(|e| e.in_env(env))?;
    let outcome = services::login(state.store.as_ref(), &state.keys, req)
        .await
        .map_err(|e| e.in_env(env))?;

    let cookie = build_session_cookie(
        &outcome.token.token,
        state.config.session_ttl_secs(),
        env.is_production(),
    );
    Ok((
        StatusCode::OK,
        [(header::SET_COOKIE, cookie)],
        Json(outcome.response),
    ))
}
