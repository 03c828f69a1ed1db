// handlers/protected/dashboard.rs - GET /api/dashboard

use axum::{
    extract::{Query, State},
    Extension,
};

use crate::api::ListQuery;
use crate::app::AppState;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::services::{DashboardService, DashboardSummary};

/// GET /api/dashboard - Counts and money figures for the caller's tenant
/// (all tenants for a system admin unless `?tenantId=` is given)
pub async fn summary(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<ListQuery>,
) -> ApiResult<DashboardSummary> {
    let summary = DashboardService::new(state.store.as_ref(), &user)
        .summary(query.tenant_id)
        .await?;
    Ok(ApiResponse::success(summary))
}
