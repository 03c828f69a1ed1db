// handlers/public/auth.rs - session issuance and removal

use axum::{
    extract::State,
    http::header,
    response::{IntoResponse, Json, Response},
};
use serde_json::json;

use crate::api::payloads::LoginPayload;
use crate::api::ApiJson;
use crate::app::AppState;
use crate::auth::{clear_cookie, session_cookie};
use crate::error::ApiError;
use crate::services::AuthService;

/// POST /auth/login - Verify credentials and set the session cookie
///
/// Input: `{ "email": "...", "password": "..." }`
/// Output: `{ "user": { id, email, role, tenantId, tenant, createdAt } }`
pub async fn login(State(state): State<AppState>, ApiJson(payload): ApiJson<LoginPayload>) -> Result<Response, ApiError> {
    let security = &state.config.security;
    let session = AuthService::new(state.store.as_ref(), security).login(payload).await?;
    let cookie = session_cookie(&session.token, security, state.config.cookie_max_age());

    Ok(([(header::SET_COOKIE, cookie)], Json(json!({ "user": session.user }))).into_response())
}

/// POST /auth/logout - Drop the session cookie
///
/// The token itself stays valid until it expires; there is no revocation list.
pub async fn logout(State(state): State<AppState>) -> Response {
    let cookie = clear_cookie(&state.config.security);
    ([(header::SET_COOKIE, cookie)], Json(json!({ "message": "Logged out successfully" }))).into_response()
}
