use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use tracing::{debug, warn};

use crate::app::AppState;
use crate::auth::{extract_token, validate_jwt};
use crate::database::models::User;
use crate::error::ApiError;
use crate::types::Role;

/// Authenticated caller, built from the stored user row on every request
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub user_id: i64,
    pub email: String,
    pub role: Role,
    pub tenant_id: Option<i64>,
}

impl AuthUser {
    pub fn is_system_admin(&self) -> bool {
        self.role.is_system_admin()
    }
}

impl From<&User> for AuthUser {
    fn from(user: &User) -> Self {
        Self {
            user_id: user.id,
            email: user.email.clone(),
            role: user.role,
            tenant_id: user.tenant_id,
        }
    }
}

/// JWT authentication middleware that validates tokens and injects [`AuthUser`].
///
/// The token only names the user; role and tenant come from the current row,
/// so a demoted or moved user loses access on the next request.
pub async fn jwt_auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let security = &state.config.security;
    let token = extract_token(request.headers(), &security.cookie_name)?;
    let claims = validate_jwt(&token, security)?;

    let user = state.store.get_user(claims.user_id).await?.ok_or_else(|| {
        warn!("Token for unknown user {} rejected", claims.user_id);
        ApiError::invalid_credential("Invalid or expired token")
    })?;

    let auth_user = AuthUser::from(&user);
    debug!(
        "Authenticated {} as {} (tenant {:?})",
        auth_user.email, auth_user.role, auth_user.tenant_id
    );
    request.extensions_mut().insert(auth_user);

    Ok(next.run(request).await)
}
