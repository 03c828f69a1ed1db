use async_trait::async_trait;
use serde_json::json;
use uuid::Uuid;

use super::manager::DatabaseError;
use super::models::{Client, Invoice, NewUser, Tenant, TenantSummary, User};
use crate::filter::FilterData;

/// Persistence seam. Handlers never see SQL; they hand a [`FilterData`]
/// (already tenant-scoped) to one of these methods.
///
/// Invoices are saved as whole aggregates: `insert_invoice` and
/// `update_invoice` write the header and replace every line item together.
#[async_trait]
pub trait Store: Send + Sync {
    /// Short name for logs and the health endpoint.
    fn backend(&self) -> &'static str;

    async fn health_check(&self) -> Result<(), DatabaseError>;

    // Tenants
    async fn create_tenant(&self, name: &str) -> Result<Tenant, DatabaseError>;
    async fn get_tenant(&self, id: i64) -> Result<Option<Tenant>, DatabaseError>;
    async fn find_tenant_by_name(&self, name: &str) -> Result<Option<Tenant>, DatabaseError>;
    async fn list_tenants(&self) -> Result<Vec<TenantSummary>, DatabaseError>;

    // Users
    /// Fails with `Conflict` when the email is taken.
    async fn create_user(&self, user: NewUser) -> Result<User, DatabaseError>;
    /// Insert, or overwrite hash/role/tenant of the user with that email.
    async fn upsert_user(&self, user: NewUser) -> Result<User, DatabaseError>;
    async fn get_user(&self, id: i64) -> Result<Option<User>, DatabaseError>;
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, DatabaseError>;
    async fn list_users(&self) -> Result<Vec<User>, DatabaseError>;

    // Clients
    async fn list_clients(&self, filter: &FilterData) -> Result<Vec<Client>, DatabaseError>;
    async fn count_clients(&self, filter: &FilterData) -> Result<i64, DatabaseError>;
    /// All rows or none.
    async fn insert_clients(&self, clients: Vec<Client>) -> Result<u64, DatabaseError>;
    async fn update_client(&self, client: &Client) -> Result<Client, DatabaseError>;
    /// Fails with `Conflict` while an invoice still references the client.
    async fn delete_client(&self, id: Uuid) -> Result<bool, DatabaseError>;

    // Invoices
    async fn list_invoices(&self, filter: &FilterData) -> Result<Vec<Invoice>, DatabaseError>;
    async fn count_invoices(&self, filter: &FilterData) -> Result<i64, DatabaseError>;
    /// Fails with `Conflict` on a duplicate invoice number within the tenant.
    async fn insert_invoice(&self, invoice: &Invoice) -> Result<Invoice, DatabaseError>;
    async fn update_invoice(&self, invoice: &Invoice) -> Result<Invoice, DatabaseError>;
    /// Line items go with the invoice.
    async fn delete_invoice(&self, id: Uuid) -> Result<bool, DatabaseError>;

    async fn find_client(&self, filter: &FilterData) -> Result<Option<Client>, DatabaseError> {
        Ok(self.list_clients(&first_only(filter)).await?.into_iter().next())
    }

    async fn find_invoice(&self, filter: &FilterData) -> Result<Option<Invoice>, DatabaseError> {
        Ok(self.list_invoices(&first_only(filter)).await?.into_iter().next())
    }
}

fn first_only(filter: &FilterData) -> FilterData {
    FilterData {
        limit: Some(1),
        offset: None,
        ..filter.clone()
    }
}

/// Filter matching one row by primary key.
pub fn by_id(id: Uuid) -> FilterData {
    FilterData {
        where_clause: Some(json!({ "id": id.to_string() })),
        ..Default::default()
    }
}
