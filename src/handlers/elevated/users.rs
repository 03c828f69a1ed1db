// handlers/elevated/users.rs - /admin/users

use axum::extract::State;
use serde_json::{json, Value};

use crate::api::payloads::CreateUserPayload;
use crate::api::ApiJson;
use crate::app::AppState;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::AdminService;

/// POST /admin/users - `{ email, password, role, tenantId? }` → `{ "user": {...} }`
///
/// SYSTEM_ADMIN must come without a tenant; every other role needs one.
pub async fn create(State(state): State<AppState>, ApiJson(payload): ApiJson<CreateUserPayload>) -> ApiResult<Value> {
    let user = AdminService::new(state.store.as_ref()).create_user(payload).await?;
    Ok(ApiResponse::created(json!({ "user": user })))
}

/// GET /admin/users - Newest first, each with `tenant { id, name }`
pub async fn list(State(state): State<AppState>) -> ApiResult<Value> {
    let users = AdminService::new(state.store.as_ref()).list_users().await?;
    Ok(ApiResponse::success(json!({ "users": users })))
}
