use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use sqlx::FromRow;
use uuid::Uuid;

use crate::filter::FilterTarget;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Client {
    pub id: Uuid,
    pub tenant_id: i64,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub company: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A validated client ready to be inserted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewClient {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub company: Option<String>,
}

impl NewClient {
    pub fn into_client(self, tenant_id: i64) -> Client {
        let now = Utc::now();
        Client {
            id: Uuid::new_v4(),
            tenant_id,
            name: self.name,
            email: self.email,
            phone: self.phone,
            address: self.address,
            company: self.company,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Partial update. `None` leaves the column as it is.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClientChanges {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub company: Option<String>,
}

impl Client {
    pub fn apply(&mut self, changes: ClientChanges) {
        if let Some(name) = changes.name {
            self.name = name;
        }
        if let Some(email) = changes.email {
            self.email = email;
        }
        if let Some(phone) = changes.phone {
            self.phone = Some(phone);
        }
        if let Some(address) = changes.address {
            self.address = Some(address);
        }
        if let Some(company) = changes.company {
            self.company = Some(company);
        }
        self.updated_at = Utc::now();
    }
}

impl FilterTarget for Client {
    fn field(&self, column: &str) -> Value {
        match column {
            "id" => json!(self.id.to_string()),
            "tenant_id" => json!(self.tenant_id),
            "name" => json!(self.name),
            "email" => json!(self.email),
            "phone" => json!(self.phone),
            "address" => json!(self.address),
            "company" => json!(self.company),
            "created_at" => json!(super::sortable_timestamp(&self.created_at)),
            "updated_at" => json!(super::sortable_timestamp(&self.updated_at)),
            _ => Value::Null,
        }
    }
}
