//! Tenant scoping applied to every data access.
//!
//! Reads go through [`scope`], which pins the filter to the caller's tenant.
//! Creates go through [`write_tenant`], which picks the tenant a new row lands
//! in. Updates and deletes fetch the target through [`scope`] first, so a row
//! in another tenant looks exactly like a missing one.

use serde_json::{json, Map, Value};
use thiserror::Error;
use tracing::debug;

use crate::database::{DatabaseError, Store};
use crate::filter::FilterData;
use crate::middleware::AuthUser;

pub const TENANT_COLUMN: &str = "tenant_id";

#[derive(Debug, Error)]
pub enum ScopeError {
    #[error("caller has no tenant")]
    TenantContextRequired,

    #[error("tenantId is required when acting as system admin")]
    MissingTenantId,

    #[error("tenant not found")]
    TenantNotFound,

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

/// Pin `filter` to the tenant the caller is allowed to see.
///
/// System admins see every tenant unless `requested` names one. Everyone else
/// is pinned to their own tenant, overriding any `tenant_id` they supplied.
/// A non-admin without a tenant is rejected when `enforce` is set and left
/// unfiltered otherwise.
pub fn scope(
    filter: FilterData,
    caller: &AuthUser,
    requested: Option<i64>,
    enforce: bool,
) -> Result<FilterData, ScopeError> {
    if caller.is_system_admin() {
        return Ok(match requested {
            Some(tenant_id) => pin(filter, tenant_id),
            None => filter,
        });
    }

    match caller.tenant_id {
        Some(tenant_id) => {
            debug!("Scoping user {} to tenant {}", caller.user_id, tenant_id);
            Ok(pin(filter, tenant_id))
        }
        None if enforce => Err(ScopeError::TenantContextRequired),
        None => Ok(filter),
    }
}

/// Tenant a newly created row belongs to.
///
/// Non-admins always write into their own tenant and the payload value is
/// ignored. System admins must name an existing tenant.
pub async fn write_tenant(store: &dyn Store, caller: &AuthUser, payload_tenant_id: Option<i64>) -> Result<i64, ScopeError> {
    if !caller.is_system_admin() {
        return caller.tenant_id.ok_or(ScopeError::TenantContextRequired);
    }

    let tenant_id = payload_tenant_id.ok_or(ScopeError::MissingTenantId)?;
    match store.get_tenant(tenant_id).await? {
        Some(tenant) => Ok(tenant.id),
        None => Err(ScopeError::TenantNotFound),
    }
}

fn pin(mut filter: FilterData, tenant_id: i64) -> FilterData {
    filter.where_clause = Some(match filter.where_clause.take() {
        Some(Value::Object(mut map)) => {
            map.insert(TENANT_COLUMN.to_string(), json!(tenant_id));
            Value::Object(map)
        }
        Some(Value::Null) | None => {
            let mut map = Map::new();
            map.insert(TENANT_COLUMN.to_string(), json!(tenant_id));
            Value::Object(map)
        }
        Some(other) => json!({ "$and": [other], "tenant_id": tenant_id }),
    });
    filter
}
