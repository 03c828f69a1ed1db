use anyhow::{Context, Result};
use tracing::info;

use super::models::{NewUser, Tenant, User};
use super::store::Store;
use crate::auth::hash_password;
use crate::config::SeedConfig;
use crate::types::Role;

pub const SAMPLE_TENANT_NAME: &str = "Sample Company";

#[derive(Debug)]
pub struct SeedReport {
    pub system_admin: User,
    pub sample_tenant: Option<Tenant>,
    pub sample_users: Vec<User>,
}

/// Idempotent: running it twice leaves one row per account and resets
/// their passwords to the configured values.
pub async fn seed(store: &dyn Store, config: &SeedConfig) -> Result<SeedReport> {
    let system_admin = upsert(
        store,
        &config.system_admin_email,
        &config.system_admin_password,
        Role::SystemAdmin,
        None,
    )
    .await?;
    info!("Seeded system admin {}", system_admin.email);

    if !config.create_sample_tenant {
        return Ok(SeedReport {
            system_admin,
            sample_tenant: None,
            sample_users: Vec::new(),
        });
    }

    let tenant = match store.find_tenant_by_name(SAMPLE_TENANT_NAME).await? {
        Some(tenant) => tenant,
        None => store.create_tenant(SAMPLE_TENANT_NAME).await?,
    };

    let company_admin = upsert(
        store,
        &config.sample_company_admin_email,
        &config.sample_company_admin_password,
        Role::CompanyAdmin,
        Some(tenant.id),
    )
    .await?;
    let accountant = upsert(
        store,
        &config.sample_accountant_email,
        &config.sample_accountant_password,
        Role::Accountant,
        Some(tenant.id),
    )
    .await?;
    info!("Seeded sample tenant '{}' (id {})", tenant.name, tenant.id);

    Ok(SeedReport {
        system_admin,
        sample_tenant: Some(tenant),
        sample_users: vec![company_admin, accountant],
    })
}

async fn upsert(store: &dyn Store, email: &str, password: &str, role: Role, tenant_id: Option<i64>) -> Result<User> {
    let password_hash = hash_password(password).with_context(|| format!("hashing password for {email}"))?;
    let user = store
        .upsert_user(NewUser {
            email: email.to_string(),
            password_hash,
            role,
            tenant_id,
        })
        .await
        .with_context(|| format!("upserting {email}"))?;
    Ok(user)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::verify_password;
    use crate::database::MemoryStore;

    #[tokio::test]
    async fn seeds_only_admin_without_sample_tenant() {
        let store = MemoryStore::new();
        let report = seed(&store, &SeedConfig::defaults(false)).await.unwrap();

        assert_eq!(report.system_admin.role, Role::SystemAdmin);
        assert_eq!(report.system_admin.tenant_id, None);
        assert!(report.sample_tenant.is_none());
        assert_eq!(store.list_tenants().await.unwrap().len(), 0);
    }

    #[tokio::test]
    async fn seeding_twice_is_idempotent() {
        let store = MemoryStore::new();
        let config = SeedConfig::defaults(true);
        seed(&store, &config).await.unwrap();
        let second = seed(&store, &config).await.unwrap();

        assert_eq!(store.list_tenants().await.unwrap().len(), 1);
        assert_eq!(store.list_users().await.unwrap().len(), 3);

        let tenant_id = second.sample_tenant.unwrap().id;
        for user in &second.sample_users {
            assert_eq!(user.tenant_id, Some(tenant_id));
        }
        let admin = store
            .find_user_by_email(&config.system_admin_email)
            .await
            .unwrap()
            .unwrap();
        assert!(verify_password(&config.system_admin_password, &admin.password_hash).unwrap());
    }
}
