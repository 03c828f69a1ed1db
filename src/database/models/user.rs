use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use sqlx::{postgres::PgRow, FromRow, Row};

use super::tenant::TenantRef;
use crate::filter::FilterTarget;
use crate::types::Role;

/// A stored user. The password hash never leaves the server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i64,
    pub email: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub role: Role,
    pub tenant_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn profile(&self, tenant: Option<TenantRef>) -> UserProfile {
        UserProfile {
            id: self.id,
            email: self.email.clone(),
            role: self.role,
            tenant_id: self.tenant_id,
            tenant,
            created_at: self.created_at,
        }
    }
}

impl<'r> FromRow<'r, PgRow> for User {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        let role: String = row.try_get("role")?;
        let role = role.parse::<Role>().map_err(|e| sqlx::Error::ColumnDecode {
            index: "role".to_string(),
            source: e.into(),
        })?;

        Ok(Self {
            id: row.try_get("id")?,
            email: row.try_get("email")?,
            password_hash: row.try_get("password_hash")?,
            role,
            tenant_id: row.try_get("tenant_id")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub tenant_id: Option<i64>,
}

/// What `/auth/login`, `/auth/me` and the admin listing return.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: i64,
    pub email: String,
    pub role: Role,
    pub tenant_id: Option<i64>,
    pub tenant: Option<TenantRef>,
    pub created_at: DateTime<Utc>,
}

impl FilterTarget for User {
    fn field(&self, column: &str) -> Value {
        match column {
            "id" => json!(self.id),
            "email" => json!(self.email),
            "role" => json!(self.role.as_str()),
            "tenant_id" => json!(self.tenant_id),
            "created_at" => json!(super::sortable_timestamp(&self.created_at)),
            _ => Value::Null,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_hash_is_not_serialized() {
        let user = User {
            id: 1,
            email: "a@b.test".into(),
            password_hash: "$argon2id$secret".into(),
            role: Role::CompanyAdmin,
            tenant_id: Some(2),
            created_at: Utc::now(),
        };
        let body = serde_json::to_value(&user).unwrap();
        assert!(body.get("passwordHash").is_none());
        assert_eq!(body["role"], "COMPANY_ADMIN");
        assert_eq!(body["tenantId"], 2);
    }
}
