// handlers/protected/line_items.rs - /api/invoices/:id/line-items

use axum::{
    extract::{Path, State},
    Extension,
};

use super::invoices::NOT_FOUND;
use super::parse_id;
use crate::api::payloads::LineItemPayload;
use crate::api::ApiJson;
use crate::app::AppState;
use crate::database::models::LineItem;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::services::InvoiceService;

const LINE_NOT_FOUND: &str = "Line item not found";

/// GET /api/invoices/:id/line-items - In position order
pub async fn list(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(invoice_id): Path<String>,
) -> ApiResult<Vec<LineItem>> {
    let invoice_id = parse_id(&invoice_id, NOT_FOUND)?;
    let items = InvoiceService::new(state.store.as_ref(), &user)
        .line_items(invoice_id)
        .await?;
    Ok(ApiResponse::success(items))
}

/// POST /api/invoices/:id/line-items - `{ description, quantity, unitPrice }`
pub async fn create(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(invoice_id): Path<String>,
    ApiJson(payload): ApiJson<LineItemPayload>,
) -> ApiResult<LineItem> {
    let invoice_id = parse_id(&invoice_id, NOT_FOUND)?;
    let item = InvoiceService::new(state.store.as_ref(), &user)
        .add_line_item(invoice_id, payload)
        .await?;
    Ok(ApiResponse::created(item))
}

/// PUT /api/invoices/:id/line-items/:line_item_id - Partial update
pub async fn update(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path((invoice_id, item_id)): Path<(String, String)>,
    ApiJson(payload): ApiJson<LineItemPayload>,
) -> ApiResult<LineItem> {
    let invoice_id = parse_id(&invoice_id, NOT_FOUND)?;
    let item_id = parse_id(&item_id, LINE_NOT_FOUND)?;
    let item = InvoiceService::new(state.store.as_ref(), &user)
        .update_line_item(invoice_id, item_id, payload)
        .await?;
    Ok(ApiResponse::success(item))
}

/// DELETE /api/invoices/:id/line-items/:line_item_id
pub async fn delete(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path((invoice_id, item_id)): Path<(String, String)>,
) -> ApiResult<()> {
    let invoice_id = parse_id(&invoice_id, NOT_FOUND)?;
    let item_id = parse_id(&item_id, LINE_NOT_FOUND)?;
    InvoiceService::new(state.store.as_ref(), &user)
        .delete_line_item(invoice_id, item_id)
        .await?;
    Ok(ApiResponse::<()>::no_content())
}
