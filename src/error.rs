use axum::{extract::rejection::JsonRejection, http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};
use thiserror::Error;

use crate::auth::AuthError;
use crate::database::DatabaseError;
use crate::tenancy::ScopeError;
use crate::validation::FieldProblem;

/// Everything a handler can fail with. The body is always `{ "error": ... }`,
/// plus `details` for validation failures.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{message}")]
    ValidationFailed { message: String, details: Vec<FieldProblem> },
    #[error("{0}")]
    InvalidJson(String),
    #[error("tenantId is required when acting as system admin")]
    MissingTenantId,

    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    InvalidCredential(String),

    #[error("{0}")]
    Forbidden(String),
    #[error("Forbidden - Tenant context required")]
    TenantContextRequired,

    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    InternalServerError(String),
    #[error("{0}")]
    ServiceUnavailable(String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        use ApiError::*;
        match self {
            BadRequest(_) | ValidationFailed { .. } | InvalidJson(_) | MissingTenantId => StatusCode::BAD_REQUEST,
            Unauthorized(_) | InvalidCredential(_) => StatusCode::UNAUTHORIZED,
            Forbidden(_) | TenantContextRequired => StatusCode::FORBIDDEN,
            NotFound(_) => StatusCode::NOT_FOUND,
            Conflict(_) => StatusCode::CONFLICT,
            InternalServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    pub fn message(&self) -> String {
        self.to_string()
    }

    pub fn to_json(&self) -> Value {
        match self {
            ApiError::ValidationFailed { message, details } => json!({ "error": message, "details": details }),
            other => json!({ "error": other.to_string() }),
        }
    }

    pub fn validation_failed(details: Vec<FieldProblem>) -> Self {
        ApiError::ValidationFailed {
            message: "Validation failed".to_string(),
            details,
        }
    }
}

macro_rules! message_constructors {
    ($($name:ident => $variant:ident),* $(,)?) => {
        impl ApiError {
            $(
                pub fn $name(message: impl Into<String>) -> Self {
                    ApiError::$variant(message.into())
                }
            )*
        }
    };
}

message_constructors! {
    bad_request => BadRequest,
    invalid_json => InvalidJson,
    unauthorized => Unauthorized,
    invalid_credential => InvalidCredential,
    forbidden => Forbidden,
    not_found => NotFound,
    conflict => Conflict,
    internal_server_error => InternalServerError,
    service_unavailable => ServiceUnavailable,
}

impl From<DatabaseError> for ApiError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::NotFound(msg) => ApiError::not_found(msg),
            DatabaseError::Conflict(constraint) => {
                tracing::warn!("Unmapped constraint violation: {}", constraint);
                ApiError::conflict("Conflict")
            }
            DatabaseError::ConnectionError(msg) => {
                tracing::error!("Database connection error: {}", msg);
                ApiError::service_unavailable("Database temporarily unavailable")
            }
            DatabaseError::Filter(err) => ApiError::bad_request(err.to_string()),
            DatabaseError::Sqlx(sqlx_err) => {
                tracing::error!("SQLx error: {}", sqlx_err);
                ApiError::internal_server_error("Database error occurred")
            }
        }
    }
}

impl From<ScopeError> for ApiError {
    fn from(err: ScopeError) -> Self {
        match err {
            ScopeError::TenantContextRequired => ApiError::TenantContextRequired,
            ScopeError::MissingTenantId => ApiError::MissingTenantId,
            ScopeError::TenantNotFound => ApiError::not_found("Tenant not found"),
            ScopeError::Database(e) => e.into(),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::MissingToken => ApiError::unauthorized("Unauthorized - No token provided"),
            AuthError::InvalidToken(reason) => {
                tracing::warn!("Rejected token: {}", reason);
                ApiError::invalid_credential("Invalid or expired token")
            }
            AuthError::InvalidCredentials => ApiError::invalid_credential("Invalid credentials"),
            AuthError::Hashing(msg) | AuthError::TokenGeneration(msg) => {
                tracing::error!("Auth internals failed: {}", msg);
                ApiError::internal_server_error("An error occurred while processing your request")
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::invalid_json(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        (self.status_code(), Json(self.to_json())).into_response()
    }
}
