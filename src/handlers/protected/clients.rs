// handlers/protected/clients.rs - /api/clients

use axum::{
    extract::{Path, Query, State},
    Extension,
};
use serde_json::{json, Value};

use super::parse_id;
use crate::api::payloads::ClientPayload;
use crate::api::{ApiJson, ListQuery};
use crate::app::AppState;
use crate::database::models::Client;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::services::ClientService;

const NOT_FOUND: &str = "Client not found";

/// GET /api/clients - Newest first. `?search=` matches name, email or company.
pub async fn list(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Vec<Client>> {
    let clients = ClientService::new(state.store.as_ref(), &user).list(&query).await?;
    Ok(ApiResponse::success(clients))
}

/// GET /api/clients/:id
pub async fn get(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> ApiResult<Client> {
    let id = parse_id(&id, NOT_FOUND)?;
    let client = ClientService::new(state.store.as_ref(), &user).get(id).await?;
    Ok(ApiResponse::success(client))
}

/// POST /api/clients - `tenantId` is required from system admins and ignored otherwise
pub async fn create(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiJson(payload): ApiJson<ClientPayload>,
) -> ApiResult<Client> {
    let client = ClientService::new(state.store.as_ref(), &user).create(payload).await?;
    Ok(ApiResponse::created(client))
}

/// POST /api/clients/bulk - JSON array of clients, all or nothing
///
/// Output: `{ "count": n }`
pub async fn bulk(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiJson(rows): ApiJson<Vec<ClientPayload>>,
) -> ApiResult<Value> {
    let count = ClientService::new(state.store.as_ref(), &user)
        .bulk_create(rows, state.config.api.bulk_max_rows)
        .await?;
    Ok(ApiResponse::created(json!({ "count": count })))
}

/// PUT /api/clients/:id - Partial update
pub async fn update(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
    ApiJson(payload): ApiJson<ClientPayload>,
) -> ApiResult<Client> {
    let id = parse_id(&id, NOT_FOUND)?;
    let client = ClientService::new(state.store.as_ref(), &user).update(id, payload).await?;
    Ok(ApiResponse::success(client))
}

/// DELETE /api/clients/:id - 409 while invoices reference the client
pub async fn delete(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> ApiResult<()> {
    let id = parse_id(&id, NOT_FOUND)?;
    ClientService::new(state.store.as_ref(), &user).delete(id).await?;
    Ok(ApiResponse::<()>::no_content())
}
