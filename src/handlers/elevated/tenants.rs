// handlers/elevated/tenants.rs - /admin/tenants

use axum::extract::{Path, State};
use serde_json::{json, Value};

use crate::api::payloads::CreateTenantPayload;
use crate::api::ApiJson;
use crate::app::AppState;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::AdminService;

/// POST /admin/tenants - `{ "name": "..." }` → `{ "tenant": {...} }`
pub async fn create(State(state): State<AppState>, ApiJson(payload): ApiJson<CreateTenantPayload>) -> ApiResult<Value> {
    let tenant = AdminService::new(state.store.as_ref()).create_tenant(payload).await?;
    Ok(ApiResponse::created(json!({ "tenant": tenant })))
}

/// GET /admin/tenants - Newest first, each with `_count { users, clients, invoices }`
pub async fn list(State(state): State<AppState>) -> ApiResult<Value> {
    let tenants = AdminService::new(state.store.as_ref()).list_tenants().await?;
    Ok(ApiResponse::success(json!({ "tenants": tenants })))
}

/// GET /admin/tenants/:id
pub async fn get(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<Value> {
    let tenant = AdminService::new(state.store.as_ref()).get_tenant(id).await?;
    Ok(ApiResponse::success(json!({ "tenant": tenant })))
}
