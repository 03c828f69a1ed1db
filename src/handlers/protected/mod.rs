// handlers/protected/mod.rs - JWT authentication and tenant context required
//
// Route prefix: /auth/me, /api/*
// Middleware: jwt_auth_middleware → tenant_middleware (not on /auth/me)

use uuid::Uuid;

use crate::error::ApiError;

pub mod auth;
pub mod clients;
pub mod dashboard;
pub mod invoices;
pub mod line_items;

/// Path ids that are not UUIDs cannot name a row, so they read as missing.
pub(crate) fn parse_id(raw: &str, not_found: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::not_found(not_found))
}
