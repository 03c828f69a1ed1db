use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use sqlx::FromRow;

use crate::filter::FilterTarget;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Tenant {
    pub id: i64,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// The `{id, name}` pair embedded in user payloads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TenantRef {
    pub id: i64,
    pub name: String,
}

impl From<&Tenant> for TenantRef {
    fn from(tenant: &Tenant) -> Self {
        Self {
            id: tenant.id,
            name: tenant.name.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, FromRow)]
pub struct TenantCounts {
    pub users: i64,
    pub clients: i64,
    pub invoices: i64,
}

/// Admin listing row: the tenant plus how much it owns.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TenantSummary {
    #[serde(flatten)]
    pub tenant: Tenant,
    #[serde(rename = "_count")]
    pub counts: TenantCounts,
}

impl FilterTarget for Tenant {
    fn field(&self, column: &str) -> Value {
        match column {
            "id" => json!(self.id),
            "name" => json!(self.name),
            "created_at" => json!(super::sortable_timestamp(&self.created_at)),
            _ => Value::Null,
        }
    }
}
