//! API error taxonomy and its JSON rendering.
//!
//! Every adapter maps failures to [`ApiError`] at its boundary. The body is
//! always `{success: false, message, error?}`; `error` carries the raw
//! underlying message for 5xx responses in an explicit development
//! deployment only.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::{debug, error, Level};

use crate::{
    auth::password::PasswordError,
    config::Environment,
    store::{DuplicateField, StoreError},
};

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error("Invalid username/email or password")]
    InvalidCredentials,

    #[error("Authentication required. Please login.")]
    AuthRequired,

    #[error("Invalid or expired token. Please login again.")]
    InvalidToken,

    #[error("{0}")]
    NotFound(&'static str),

    #[error("{} already exists", capitalize(.0.as_str()))]
    Conflict(DuplicateField),

    #[error("Method not allowed")]
    MethodNotAllowed,

    #[error("Database connection error. Please try again later.")]
    Unavailable(String),

    #[error("{message}")]
    Internal {
        message: &'static str,
        detail: String,
    },
}

impl ApiError {
    pub fn internal(detail: impl std::fmt::Display) -> Self {
        ApiError::Internal {
            message: "Internal server error",
            detail: detail.to_string(),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::InvalidCredentials | ApiError::AuthRequired | ApiError::InvalidToken => {
                StatusCode::UNAUTHORIZED
            }
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            ApiError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn detail(&self) -> Option<&str> {
        match self {
            ApiError::Unavailable(detail) | ApiError::Internal { detail, .. } => Some(detail),
            _ => None,
        }
    }

    /// Server faults are logged here. Rejections are already logged with
    /// context where they are raised, so they only get a debug line.
    fn level(&self) -> Level {
        match self {
            ApiError::Unavailable(_) | ApiError::Internal { .. } => Level::ERROR,
            _ => Level::DEBUG,
        }
    }

    fn log(&self) {
        if self.level() != Level::ERROR {
            debug!(error = %self, "request rejected");
            return;
        }
        match self {
            ApiError::Unavailable(detail) => error!(error = %detail, "store unavailable"),
            ApiError::Internal { message, detail } => error!(error = %detail, "{message}"),
            _ => error!(error = %self, "request failed"),
        }
    }

    pub fn render(&self, env: Environment) -> (StatusCode, ErrorBody) {
        self.log();
        let error = if env.exposes_error_detail() {
            self.detail().map(str::to_owned)
        } else {
            None
        };
        (
            self.status_code(),
            ErrorBody {
                success: false,
                message: self.to_string(),
                error,
            },
        )
    }

    /// Binds the error to an environment so it can be returned from a handler.
    pub fn in_env(self, env: Environment) -> ErrorReply {
        ErrorReply { error: self, env }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// An [`ApiError`] paired with the environment that decides its verbosity.
#[derive(Debug)]
pub struct ErrorReply {
    error: ApiError,
    env: Environment,
}

impl IntoResponse for ErrorReply {
    fn into_response(self) -> Response {
        let (status, body) = self.error.render(self.env);
        (status, Json(body)).into_response()
    }
}

/// Without an environment at hand (extractor rejections) nothing is echoed.
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        self.in_env(Environment::Production).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Duplicate(field) => ApiError::Conflict(field),
            StoreError::Unavailable(detail) => ApiError::Unavailable(detail),
            StoreError::Other(e) => ApiError::internal(format!("{e:#}")),
        }
    }
}

impl From<PasswordError> for ApiError {
    fn from(err: PasswordError) -> Self {
        match err {
            PasswordError::MissingHash => ApiError::Internal {
                message: "Database error: Password hash missing",
                detail: err.to_string(),
            },
            other => ApiError::internal(other),
        }
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflict_message_names_field() {
        assert_eq!(
            ApiError::Conflict(DuplicateField::Username).to_string(),
            "Username already exists"
        );
        assert_eq!(
            ApiError::Conflict(DuplicateField::Email).to_string(),
            "Email already exists"
        );
    }

    #[test]
    fn status_codes() {
        assert_eq!(
            ApiError::Validation("x".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(ApiError::InvalidToken.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            ApiError::NotFound("User not found").status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::Unavailable("refused".into()).status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            ApiError::internal("boom").status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn detail_is_shown_only_in_development() {
        let err = ApiError::internal("relation \"users\" does not exist");

        let (_, dev) = err.render(Environment::Development);
        assert_eq!(dev.message, "Internal server error");
        assert_eq!(dev.error.as_deref(), Some("relation \"users\" does not exist"));

        let (_, prod) = err.render(Environment::Production);
        assert!(prod.error.is_none());
        let json = serde_json::to_value(&prod).unwrap();
        assert!(json.get("error").is_none());
        assert_eq!(json["success"], false);

        let (_, unset) = ApiError::Unavailable("connection refused".into())
            .render(Environment::Unspecified);
        assert!(unset.error.is_none());
    }

    #[test]
    fn only_server_faults_log_as_errors() {
        assert_eq!(ApiError::internal("boom").level(), Level::ERROR);
        assert_eq!(ApiError::Unavailable("down".into()).level(), Level::ERROR);
        assert_eq!(ApiError::InvalidCredentials.level(), Level::DEBUG);
        assert_eq!(ApiError::InvalidToken.level(), Level::DEBUG);
    }

    #[test]
    fn store_errors_map_to_api_errors() {
        assert!(matches!(
            ApiError::from(StoreError::Duplicate(DuplicateField::Email)),
            ApiError::Conflict(DuplicateField::Email)
        ));
        assert!(matches!(
            ApiError::from(StoreError::Unavailable("timeout".into())),
            ApiError::Unavailable(_)
        ));
        assert!(matches!(
            ApiError::from(PasswordError::MissingHash),
            ApiError::Internal { message: "Database error: Password hash missing", .. }
        ));
    }
}
