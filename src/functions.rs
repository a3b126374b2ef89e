//! Per-request function entry points for serverless hosts.
//!
//! Each function takes the raw method, headers and body of one request and
//! returns a complete response. They run the same services and auth gate as
//! the long-lived router.

use axum::{
    body::Body,
    http::{header, HeaderMap, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

use crate::{
    auth::{cookie::build_session_cookie, extractors::authenticate, services as auth_services},
    balance::services as balance_services,
    config::Environment,
    error::{ApiError, ApiResult},
    state::AppState,
};

#[derive(Debug, Clone)]
pub struct FunctionRequest {
    pub method: Method,
    pub headers: HeaderMap,
    pub body: Bytes,
}

#[derive(Debug, Clone)]
pub struct FunctionResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl FunctionResponse {
    fn json<T: Serialize>(status: StatusCode, body: &T) -> Self {
        match serde_json::to_value(body) {
            Ok(body) => Self {
                status,
                headers: HeaderMap::new(),
                body,
            },
            Err(e) => Self::from_error(
                ApiError::internal(e),
                HeaderMap::new(),
                Environment::Production,
            ),
        }
    }

    fn from_error(err: ApiError, headers: HeaderMap, env: Environment) -> Self {
        let (status, body) = err.render(env);
        Self {
            status,
            headers,
            body: serde_json::to_value(body).unwrap_or(Value::Null),
        }
    }
}

impl IntoResponse for FunctionResponse {
    fn into_response(self) -> Response {
        let mut response = Response::new(Body::from(self.body.to_string()));
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        response.headers_mut().insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        response
    }
}

fn require_method(req: &FunctionRequest, allowed: Method) -> Result<(), HeaderMap> {
    if req.method == allowed {
        return Ok(());
    }
    let mut headers = HeaderMap::new();
    if let Ok(value) = HeaderValue::from_str(allowed.as_str()) {
        headers.insert(header::ALLOW, value);
    }
    Err(headers)
}

/// An empty body reads as `{}`.
fn parse_body<T: DeserializeOwned + Default>(body: &Bytes) -> ApiResult<T> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(body)
        .map_err(|e| ApiError::Validation(format!("Invalid JSON body: {e}")))
}

fn finish(state: &AppState, result: ApiResult<FunctionResponse>) -> FunctionResponse {
    result.unwrap_or_else(|err| {
        FunctionResponse::from_error(err, HeaderMap::new(), state.config.environment)
    })
}

fn method_not_allowed(state: &AppState, allow: HeaderMap) -> FunctionResponse {
    FunctionResponse::from_error(ApiError::MethodNotAllowed, allow, state.config.environment)
}

/// `POST /api/register`
pub async fn register(state: &AppState, req: FunctionRequest) -> FunctionResponse {
    if let Err(allow) = require_method(&req, Method::POST) {
        return method_not_allowed(state, allow);
    }
    let result = async {
        let body = parse_body(&req.body)?;
        let response = auth_services::register(state.store.as_ref(), body).await?;
        Ok::<_, ApiError>(FunctionResponse::json(StatusCode::CREATED, &response))
    }
    .await;
    finish(state, result)
}

/// `POST /api/login`
pub async fn login(state: &AppState, req: FunctionRequest) -> FunctionResponse {
    if let Err(allow) = require_method(&req, Method::POST) {
        return method_not_allowed(state, allow);
    }
    let result = async {
        let body = parse_body(&req.body)?;
        let outcome = auth_services::login(state.store.as_ref(), &state.keys, body).await?;
        let cookie = build_session_cookie(
            &outcome.token.token,
            state.config.session_ttl_secs(),
            state.config.environment.is_production(),
        );
        let mut response = FunctionResponse::json(StatusCode::OK, &outcome.response);
        let cookie = HeaderValue::from_str(&cookie).map_err(ApiError::internal)?;
        response.headers.insert(header::SET_COOKIE, cookie);
        Ok::<_, ApiError>(response)
    }
    .await;
    finish(state, result)
}

/// `GET /api/balance`
pub async fn balance(state: &AppState, req: FunctionRequest) -> FunctionResponse {
    if let Err(allow) = require_method(&req, Method::GET) {
        return method_not_allowed(state, allow);
    }
    let result = async {
        let identity = authenticate(&req.headers, &state.keys)?;
        let response = balance_services::balance(state.store.as_ref(), &identity).await?;
        Ok::<_, ApiError>(FunctionResponse::json(StatusCode::OK, &response))
    }
    .await;
    finish(state, result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request(method: Method, body: Value) -> FunctionRequest {
        FunctionRequest {
            method,
            headers: HeaderMap::new(),
            body: Bytes::from(body.to_string()),
        }
    }

    fn alice() -> Value {
        json!({"uname": "alice", "email": "a@x.com", "password": "secret1", "phone": "111"})
    }

    #[tokio::test]
    async fn wrong_method_is_405_with_allow_header() {
        let state = AppState::fake();

        let res = register(&state, request(Method::GET, json!({}))).await;
        assert_eq!(res.status, StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(res.headers[header::ALLOW], "POST");
        assert_eq!(res.body["message"], "Method not allowed");

        let res = balance(&state, request(Method::POST, json!({}))).await;
        assert_eq!(res.status, StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(res.headers[header::ALLOW], "GET");
    }

    #[tokio::test]
    async fn full_flow_matches_router() {
        let state = AppState::fake();

        let res = register(&state, request(Method::POST, alice())).await;
        assert_eq!(res.status, StatusCode::CREATED);
        assert_eq!(res.body["loginHint"]["username"], "alice");

        let res = register(&state, request(Method::POST, alice())).await;
        assert_eq!(res.status, StatusCode::CONFLICT);
        assert_eq!(res.body["message"], "Username already exists");

        let res = login(
            &state,
            request(Method::POST, json!({"username": "alice", "password": "secret1"})),
        )
        .await;
        assert_eq!(res.status, StatusCode::OK);
        let set_cookie = res.headers[header::SET_COOKIE].to_str().unwrap();
        let pair = set_cookie.split(';').next().unwrap();

        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_str(pair).unwrap());
        let res = balance(
            &state,
            FunctionRequest {
                method: Method::GET,
                headers,
                body: Bytes::new(),
            },
        )
        .await;
        assert_eq!(res.status, StatusCode::OK);
        assert_eq!(res.body["balance"].as_f64(), Some(100000.0));
    }

    #[tokio::test]
    async fn empty_and_malformed_bodies() {
        let state = AppState::fake();

        let empty = FunctionRequest {
            method: Method::POST,
            headers: HeaderMap::new(),
            body: Bytes::new(),
        };
        let res = login(&state, empty).await;
        assert_eq!(res.status, StatusCode::BAD_REQUEST);
        assert_eq!(res.body["message"], "Username/email and password are required");

        let malformed = FunctionRequest {
            method: Method::POST,
            headers: HeaderMap::new(),
            body: Bytes::from_static(b"{oops"),
        };
        let res = register(&state, malformed).await;
        assert_eq!(res.status, StatusCode::BAD_REQUEST);
        assert_eq!(res.body["success"], false);
    }

    #[tokio::test]
    async fn balance_without_cookie_is_401() {
        let state = AppState::fake();
        let res = balance(
            &state,
            FunctionRequest {
                method: Method::GET,
                headers: HeaderMap::new(),
                body: Bytes::new(),
            },
        )
        .await;
        assert_eq!(res.status, StatusCode::UNAUTHORIZED);
        assert_eq!(res.body["message"], "Authentication required. Please login.");
    }
}
