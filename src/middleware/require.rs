use axum::{extract::Request, middleware::Next, response::Response};
use tracing::warn;

use super::auth::AuthUser;
use crate::error::ApiError;
use crate::types::Role;

/// `Forbidden` unless the caller's role is one of `allowed`.
pub fn require_role(user: &AuthUser, allowed: &[Role]) -> Result<(), ApiError> {
    if allowed.contains(&user.role) {
        Ok(())
    } else {
        warn!("User {} with role {} denied, needs one of {:?}", user.email, user.role, allowed);
        Err(ApiError::forbidden("Forbidden - Insufficient permissions"))
    }
}

/// System admins pass; everyone else needs a tenant.
pub fn require_tenant(user: &AuthUser) -> Result<(), ApiError> {
    if user.is_system_admin() || user.tenant_id.is_some() {
        Ok(())
    } else {
        warn!("User {} has no tenant", user.email);
        Err(ApiError::TenantContextRequired)
    }
}

fn caller(request: &Request) -> Result<&AuthUser, ApiError> {
    request
        .extensions()
        .get::<AuthUser>()
        .ok_or_else(|| ApiError::unauthorized("Unauthorized - No token provided"))
}

/// Layer for `/admin/*`; runs after `jwt_auth_middleware`.
pub async fn system_admin_middleware(request: Request, next: Next) -> Result<Response, ApiError> {
    require_role(caller(&request)?, &[Role::SystemAdmin])?;
    Ok(next.run(request).await)
}

/// Layer for `/api/*`; runs after `jwt_auth_middleware`.
pub async fn tenant_middleware(request: Request, next: Next) -> Result<Response, ApiError> {
    require_tenant(caller(&request)?)?;
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    fn user(role: Role, tenant_id: Option<i64>) -> AuthUser {
        AuthUser {
            user_id: 1,
            email: "u@example.com".into(),
            role,
            tenant_id,
        }
    }

    #[test]
    fn role_gate() {
        assert!(require_role(&user(Role::SystemAdmin, None), &[Role::SystemAdmin]).is_ok());
        let err = require_role(&user(Role::CompanyAdmin, Some(1)), &[Role::SystemAdmin]).unwrap_err();
        assert_eq!(err.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(err.message(), "Forbidden - Insufficient permissions");
    }

    #[test]
    fn tenant_gate() {
        assert!(require_tenant(&user(Role::SystemAdmin, None)).is_ok());
        assert!(require_tenant(&user(Role::Accountant, Some(4))).is_ok());
        let err = require_tenant(&user(Role::Accountant, None)).unwrap_err();
        assert_eq!(err.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(err.message(), "Forbidden - Tenant context required");
    }
}
