use tracing::info;

use super::auth::tenant_ref;
use crate::api::payloads::{CreateTenantPayload, CreateUserPayload};
use crate::auth::hash_password;
use crate::database::models::{NewUser, Tenant, TenantRef, TenantSummary, UserProfile};
use crate::database::{Store, USERS_EMAIL_KEY};
use crate::error::ApiError;

/// Tenant and user management for system admins. The role gate runs in the
/// router, so nothing here re-checks the caller.
pub struct AdminService<'a> {
    store: &'a dyn Store,
}

impl<'a> AdminService<'a> {
    pub fn new(store: &'a dyn Store) -> Self {
        Self { store }
    }

    pub async fn create_tenant(&self, payload: CreateTenantPayload) -> Result<Tenant, ApiError> {
        let name = payload.into_name()?;
        let tenant = self.store.create_tenant(&name).await?;
        info!("Created tenant '{}' (id {})", tenant.name, tenant.id);
        Ok(tenant)
    }

    pub async fn list_tenants(&self) -> Result<Vec<TenantSummary>, ApiError> {
        Ok(self.store.list_tenants().await?)
    }

    pub async fn get_tenant(&self, id: i64) -> Result<Tenant, ApiError> {
        self.store
            .get_tenant(id)
            .await?
            .ok_or_else(|| ApiError::not_found("Tenant not found"))
    }

    pub async fn create_user(&self, payload: CreateUserPayload) -> Result<UserProfile, ApiError> {
        let draft = payload.into_draft()?;

        let tenant = match draft.tenant_id {
            Some(id) => Some(TenantRef::from(&self.get_tenant(id).await?)),
            None => None,
        };

        let password_hash = hash_password(&draft.password)?;
        let user = self
            .store
            .create_user(NewUser {
                email: draft.email,
                password_hash,
                role: draft.role,
                tenant_id: draft.tenant_id,
            })
            .await
            .map_err(|e| {
                if e.violates(USERS_EMAIL_KEY) {
                    ApiError::conflict("Email already in use")
                } else {
                    e.into()
                }
            })?;

        info!("Created {} user {}", user.role, user.email);
        Ok(user.profile(tenant))
    }

    /// Newest first, each with its tenant's id and name.
    pub async fn list_users(&self) -> Result<Vec<UserProfile>, ApiError> {
        let users = self.store.list_users().await?;
        let mut profiles = Vec::with_capacity(users.len());
        for user in users {
            let tenant = tenant_ref(self.store, user.tenant_id).await?;
            profiles.push(user.profile(tenant));
        }
        Ok(profiles)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::MemoryStore;
    use axum::http::StatusCode;
    use serde_json::json;

    fn user_payload(value: serde_json::Value) -> CreateUserPayload {
        serde_json::from_value(value).unwrap()
    }

    #[tokio::test]
    async fn duplicate_email_is_a_conflict() {
        let store = MemoryStore::new();
        let admin = AdminService::new(&store);
        let tenant = admin
            .create_tenant(CreateTenantPayload { name: Some("Acme".into()) })
            .await
            .unwrap();

        let body = json!({ "email": "a@acme.com", "password": "secret1", "role": "ACCOUNTANT", "tenantId": tenant.id });
        let created = admin.create_user(user_payload(body.clone())).await.unwrap();
        assert_eq!(created.tenant.unwrap().name, "Acme");

        let err = admin.create_user(user_payload(body)).await.unwrap_err();
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
        assert_eq!(err.message(), "Email already in use");
    }

    #[tokio::test]
    async fn unknown_tenant_is_not_found() {
        let store = MemoryStore::new();
        let err = AdminService::new(&store)
            .create_user(user_payload(
                json!({ "email": "a@acme.com", "password": "secret1", "role": "COMPANY_ADMIN", "tenantId": 77 }),
            ))
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(err.message(), "Tenant not found");
    }
}
