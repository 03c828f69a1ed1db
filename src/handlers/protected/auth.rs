// handlers/protected/auth.rs - GET /auth/me

use axum::{extract::State, Extension};
use serde_json::{json, Value};

use crate::app::AppState;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::services::AuthService;

/// GET /auth/me - Current user, freshly loaded, with its tenant
pub async fn me(State(state): State<AppState>, Extension(user): Extension<AuthUser>) -> ApiResult<Value> {
    let profile = AuthService::new(state.store.as_ref(), &state.config.security)
        .me(&user)
        .await?;
    Ok(ApiResponse::success(json!({ "user": profile })))
}
