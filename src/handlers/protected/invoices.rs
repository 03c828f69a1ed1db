// handlers/protected/invoices.rs - /api/invoices
//
// Money figures in request bodies are ignored; every write recomputes
// line totals, subtotal, tax and total from the line items.

use axum::{
    extract::{Path, Query, State},
    Extension,
};

use super::parse_id;
use crate::api::payloads::{InvoicePayload, MarkStatusPayload};
use crate::api::{ApiJson, ListQuery};
use crate::app::AppState;
use crate::database::models::Invoice;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::services::InvoiceService;

pub(super) const NOT_FOUND: &str = "Invoice not found";

/// GET /api/invoices - Newest first. Filters: `status`, `clientId`.
pub async fn list(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Vec<Invoice>> {
    let invoices = InvoiceService::new(state.store.as_ref(), &user).list(&query).await?;
    Ok(ApiResponse::success(invoices))
}

/// GET /api/invoices/:id - With line items
pub async fn get(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> ApiResult<Invoice> {
    let id = parse_id(&id, NOT_FOUND)?;
    let invoice = InvoiceService::new(state.store.as_ref(), &user).get(id).await?;
    Ok(ApiResponse::success(invoice))
}

/// POST /api/invoices
///
/// Input: `{ invoiceNumber, clientId, lineItems: [{ description, quantity, unitPrice }],
/// taxRate?, tax?, discount?, status?, date?, dueDate?, notes?, tenantId? }`
pub async fn create(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiJson(payload): ApiJson<InvoicePayload>,
) -> ApiResult<Invoice> {
    let invoice = InvoiceService::new(state.store.as_ref(), &user).create(payload).await?;
    Ok(ApiResponse::created(invoice))
}

/// PUT /api/invoices/:id - Partial update; `lineItems` replaces the list
pub async fn update(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
    ApiJson(payload): ApiJson<InvoicePayload>,
) -> ApiResult<Invoice> {
    let id = parse_id(&id, NOT_FOUND)?;
    let invoice = InvoiceService::new(state.store.as_ref(), &user).update(id, payload).await?;
    Ok(ApiResponse::success(invoice))
}

/// POST /api/invoices/:id/mark - `{ "status": "paid" | "unpaid" | "overdue" }`
pub async fn mark(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
    ApiJson(payload): ApiJson<MarkStatusPayload>,
) -> ApiResult<Invoice> {
    let id = parse_id(&id, NOT_FOUND)?;
    let invoice = InvoiceService::new(state.store.as_ref(), &user).mark(id, payload).await?;
    Ok(ApiResponse::success(invoice))
}

/// DELETE /api/invoices/:id
pub async fn delete(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> ApiResult<()> {
    let id = parse_id(&id, NOT_FOUND)?;
    InvoiceService::new(state.store.as_ref(), &user).delete(id).await?;
    Ok(ApiResponse::<()>::no_content())
}
