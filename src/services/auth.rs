use tracing::{info, warn};

use crate::api::payloads::LoginPayload;
use crate::auth::{generate_jwt, verify_password, AuthError, Claims};
use crate::config::SecurityConfig;
use crate::database::models::{TenantRef, UserProfile};
use crate::database::{DatabaseError, Store};
use crate::error::ApiError;
use crate::middleware::AuthUser;

/// A freshly issued token and the profile it belongs to.
#[derive(Debug, Clone)]
pub struct Session {
    pub token: String,
    pub user: UserProfile,
}

pub struct AuthService<'a> {
    store: &'a dyn Store,
    security: &'a SecurityConfig,
}

impl<'a> AuthService<'a> {
    pub fn new(store: &'a dyn Store, security: &'a SecurityConfig) -> Self {
        Self { store, security }
    }

    /// Unknown email and wrong password fail the same way.
    pub async fn login(&self, payload: LoginPayload) -> Result<Session, ApiError> {
        let (email, password) = payload.into_credentials()?;

        let Some(user) = self.store.find_user_by_email(&email).await? else {
            warn!("Login failed for unknown email {}", email);
            return Err(AuthError::InvalidCredentials.into());
        };
        if !verify_password(&password, &user.password_hash)? {
            warn!("Login failed for {}: wrong password", email);
            return Err(AuthError::InvalidCredentials.into());
        }

        let claims = Claims::new(
            user.id,
            user.email.clone(),
            user.role,
            user.tenant_id,
            self.security.jwt_expiry_hours,
        );
        let token = generate_jwt(&claims, self.security)?;
        let tenant = tenant_ref(self.store, user.tenant_id).await?;

        info!("User {} logged in", user.email);
        Ok(Session {
            token,
            user: user.profile(tenant),
        })
    }

    pub async fn me(&self, caller: &AuthUser) -> Result<UserProfile, ApiError> {
        let user = self
            .store
            .get_user(caller.user_id)
            .await?
            .ok_or_else(|| ApiError::not_found("User not found"))?;
        let tenant = tenant_ref(self.store, user.tenant_id).await?;
        Ok(user.profile(tenant))
    }
}

pub(crate) async fn tenant_ref(store: &dyn Store, tenant_id: Option<i64>) -> Result<Option<TenantRef>, DatabaseError> {
    let Some(id) = tenant_id else {
        return Ok(None);
    };
    Ok(store.get_tenant(id).await?.as_ref().map(TenantRef::from))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{hash_password, validate_jwt};
    use crate::config::AppConfig;
    use crate::database::models::NewUser;
    use crate::database::MemoryStore;
    use crate::types::Role;

    async fn store_with_user() -> (MemoryStore, i64) {
        let store = MemoryStore::new();
        let tenant = store.create_tenant("Acme").await.unwrap();
        store
            .create_user(NewUser {
                email: "owner@acme.com".into(),
                password_hash: hash_password("hunter22").unwrap(),
                role: Role::CompanyAdmin,
                tenant_id: Some(tenant.id),
            })
            .await
            .unwrap();
        (store, tenant.id)
    }

    fn login(email: &str, password: &str) -> LoginPayload {
        LoginPayload {
            email: Some(email.into()),
            password: Some(password.into()),
        }
    }

    #[tokio::test]
    async fn login_issues_token_with_tenant() {
        let (store, tenant_id) = store_with_user().await;
        let config = AppConfig::development();
        let service = AuthService::new(&store, &config.security);

        let session = service.login(login("owner@acme.com", "hunter22")).await.unwrap();
        assert_eq!(session.user.tenant.as_ref().map(|t| t.id), Some(tenant_id));

        let claims = validate_jwt(&session.token, &config.security).unwrap();
        assert_eq!(claims.user_id, session.user.id);
        assert_eq!(claims.role, Role::CompanyAdmin);
    }

    #[tokio::test]
    async fn wrong_password_and_unknown_email_look_alike() {
        let (store, _) = store_with_user().await;
        let config = AppConfig::development();
        let service = AuthService::new(&store, &config.security);

        let wrong = service.login(login("owner@acme.com", "nope")).await.unwrap_err();
        let unknown = service.login(login("ghost@acme.com", "hunter22")).await.unwrap_err();
        assert_eq!(wrong.message(), "Invalid credentials");
        assert_eq!(unknown.message(), wrong.message());
        assert_eq!(wrong.status_code(), unknown.status_code());
    }
}
