// handlers/public/system.rs - service info and health

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde_json::{json, Value};

use crate::app::AppState;

/// GET / - Service name, version and route map
pub async fn root() -> Json<Value> {
    Json(json!({
        "name": "Invoicer API",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "auth": "/auth/login, /auth/logout (public), /auth/me (protected)",
            "admin": "/admin/tenants[/:id], /admin/users (SYSTEM_ADMIN)",
            "clients": "/api/clients[/:id], /api/clients/bulk (protected)",
            "invoices": "/api/invoices[/:id], /api/invoices/:id/mark, /api/invoices/:id/line-items[/:line_item_id] (protected)",
            "dashboard": "/api/dashboard (protected)",
        }
    }))
}

/// GET /health - Store reachability
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let now = chrono::Utc::now();
    let backend = state.store.backend();

    match state.store.health_check().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({ "status": "ok", "timestamp": now, "store": backend })),
        ),
        Err(e) => {
            tracing::error!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "status": "degraded", "timestamp": now, "store": backend, "error": "store unavailable" })),
            )
        }
    }
}
