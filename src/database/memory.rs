use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::manager::{DatabaseError, INVOICE_NUMBER_KEY, USERS_EMAIL_KEY};
use super::models::{Client, Invoice, NewUser, Tenant, TenantCounts, TenantSummary, User};
use super::store::Store;
use crate::filter::{Filter, FilterData, FilterTarget};

#[derive(Default)]
struct Tables {
    tenants: Vec<Tenant>,
    users: Vec<User>,
    clients: Vec<Client>,
    invoices: Vec<Invoice>,
    next_tenant_id: i64,
    next_user_id: i64,
}

/// Process-local store used when no `DATABASE_URL` is configured and in
/// tests. Enforces the same uniqueness and reference rules as the SQL schema.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn select<T: FilterTarget + Clone>(table: &str, rows: &[T], filter: &FilterData) -> Result<Vec<T>, DatabaseError> {
    Ok(Filter::from_data(table, filter)?.apply(rows)?)
}

fn count<T: FilterTarget>(table: &str, rows: &[T], filter: &FilterData) -> Result<i64, DatabaseError> {
    let filter = Filter::from_data(table, filter)?;
    let mut n = 0;
    for row in rows {
        if filter.matches(row)? {
            n += 1;
        }
    }
    Ok(n)
}

fn check_invoice_number(tables: &Tables, invoice: &Invoice) -> Result<(), DatabaseError> {
    let taken = tables.invoices.iter().any(|other| {
        other.id != invoice.id
            && other.tenant_id == invoice.tenant_id
            && other.invoice_number == invoice.invoice_number
    });
    if taken {
        return Err(DatabaseError::Conflict(INVOICE_NUMBER_KEY.to_string()));
    }
    if !tables.clients.iter().any(|c| c.id == invoice.client_id) {
        return Err(DatabaseError::Conflict("invoices_client_id_fkey".to_string()));
    }
    Ok(())
}

#[async_trait]
impl Store for MemoryStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn health_check(&self) -> Result<(), DatabaseError> {
        Ok(())
    }

    async fn create_tenant(&self, name: &str) -> Result<Tenant, DatabaseError> {
        let mut tables = self.tables.write().await;
        tables.next_tenant_id += 1;
        let tenant = Tenant {
            id: tables.next_tenant_id,
            name: name.to_string(),
            created_at: Utc::now(),
        };
        tables.tenants.push(tenant.clone());
        Ok(tenant)
    }

    async fn get_tenant(&self, id: i64) -> Result<Option<Tenant>, DatabaseError> {
        let tables = self.tables.read().await;
        Ok(tables.tenants.iter().find(|t| t.id == id).cloned())
    }

    async fn find_tenant_by_name(&self, name: &str) -> Result<Option<Tenant>, DatabaseError> {
        let tables = self.tables.read().await;
        Ok(tables.tenants.iter().find(|t| t.name == name).cloned())
    }

    async fn list_tenants(&self) -> Result<Vec<TenantSummary>, DatabaseError> {
        let tables = self.tables.read().await;
        let mut out: Vec<TenantSummary> = tables
            .tenants
            .iter()
            .map(|tenant| TenantSummary {
                counts: TenantCounts {
                    users: tables.users.iter().filter(|u| u.tenant_id == Some(tenant.id)).count() as i64,
                    clients: tables.clients.iter().filter(|c| c.tenant_id == tenant.id).count() as i64,
                    invoices: tables.invoices.iter().filter(|i| i.tenant_id == tenant.id).count() as i64,
                },
                tenant: tenant.clone(),
            })
            .collect();
        out.sort_by(|a, b| b.tenant.created_at.cmp(&a.tenant.created_at).then(b.tenant.id.cmp(&a.tenant.id)));
        Ok(out)
    }

    async fn create_user(&self, user: NewUser) -> Result<User, DatabaseError> {
        let mut tables = self.tables.write().await;
        if tables.users.iter().any(|u| u.email == user.email) {
            return Err(DatabaseError::Conflict(USERS_EMAIL_KEY.to_string()));
        }
        if let Some(tenant_id) = user.tenant_id {
            if !tables.tenants.iter().any(|t| t.id == tenant_id) {
                return Err(DatabaseError::Conflict("users_tenant_id_fkey".to_string()));
            }
        }
        tables.next_user_id += 1;
        let created = User {
            id: tables.next_user_id,
            email: user.email,
            password_hash: user.password_hash,
            role: user.role,
            tenant_id: user.tenant_id,
            created_at: Utc::now(),
        };
        tables.users.push(created.clone());
        Ok(created)
    }

    async fn upsert_user(&self, user: NewUser) -> Result<User, DatabaseError> {
        {
            let mut tables = self.tables.write().await;
            if let Some(existing) = tables.users.iter_mut().find(|u| u.email == user.email) {
                existing.password_hash = user.password_hash;
                existing.role = user.role;
                existing.tenant_id = user.tenant_id;
                return Ok(existing.clone());
            }
        }
        self.create_user(user).await
    }

    async fn get_user(&self, id: i64) -> Result<Option<User>, DatabaseError> {
        let tables = self.tables.read().await;
        Ok(tables.users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, DatabaseError> {
        let tables = self.tables.read().await;
        Ok(tables.users.iter().find(|u| u.email == email).cloned())
    }

    async fn list_users(&self) -> Result<Vec<User>, DatabaseError> {
        let tables = self.tables.read().await;
        let mut users = tables.users.clone();
        users.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(users)
    }

    async fn list_clients(&self, filter: &FilterData) -> Result<Vec<Client>, DatabaseError> {
        let tables = self.tables.read().await;
        select("clients", &tables.clients, filter)
    }

    async fn count_clients(&self, filter: &FilterData) -> Result<i64, DatabaseError> {
        let tables = self.tables.read().await;
        count("clients", &tables.clients, filter)
    }

    async fn insert_clients(&self, clients: Vec<Client>) -> Result<u64, DatabaseError> {
        let mut tables = self.tables.write().await;
        for client in &clients {
            if !tables.tenants.iter().any(|t| t.id == client.tenant_id) {
                return Err(DatabaseError::Conflict("clients_tenant_id_fkey".to_string()));
            }
        }
        let n = clients.len() as u64;
        tables.clients.extend(clients);
        Ok(n)
    }

    async fn update_client(&self, client: &Client) -> Result<Client, DatabaseError> {
        let mut tables = self.tables.write().await;
        let slot = tables
            .clients
            .iter_mut()
            .find(|c| c.id == client.id)
            .ok_or_else(|| DatabaseError::NotFound(format!("client {}", client.id)))?;
        *slot = client.clone();
        Ok(client.clone())
    }

    async fn delete_client(&self, id: Uuid) -> Result<bool, DatabaseError> {
        let mut tables = self.tables.write().await;
        if tables.invoices.iter().any(|i| i.client_id == id) {
            return Err(DatabaseError::Conflict("invoices_client_id_fkey".to_string()));
        }
        let before = tables.clients.len();
        tables.clients.retain(|c| c.id != id);
        Ok(tables.clients.len() < before)
    }

    async fn list_invoices(&self, filter: &FilterData) -> Result<Vec<Invoice>, DatabaseError> {
        let tables = self.tables.read().await;
        select("invoices", &tables.invoices, filter)
    }

    async fn count_invoices(&self, filter: &FilterData) -> Result<i64, DatabaseError> {
        let tables = self.tables.read().await;
        count("invoices", &tables.invoices, filter)
    }

    async fn insert_invoice(&self, invoice: &Invoice) -> Result<Invoice, DatabaseError> {
        let mut tables = self.tables.write().await;
        check_invoice_number(&tables, invoice)?;
        tables.invoices.push(invoice.clone());
        Ok(invoice.clone())
    }

    async fn update_invoice(&self, invoice: &Invoice) -> Result<Invoice, DatabaseError> {
        let mut tables = self.tables.write().await;
        check_invoice_number(&tables, invoice)?;
        let slot = tables
            .invoices
            .iter_mut()
            .find(|i| i.id == invoice.id)
            .ok_or_else(|| DatabaseError::NotFound(format!("invoice {}", invoice.id)))?;
        *slot = invoice.clone();
        Ok(invoice.clone())
    }

    async fn delete_invoice(&self, id: Uuid) -> Result<bool, DatabaseError> {
        let mut tables = self.tables.write().await;
        let before = tables.invoices.len();
        tables.invoices.retain(|i| i.id != id);
        Ok(tables.invoices.len() < before)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::{LineItem, NewClient};
    use crate::types::{InvoiceStatus, Role};
    use rust_decimal::Decimal;
    use serde_json::json;

    fn new_user(email: &str, tenant_id: Option<i64>) -> NewUser {
        NewUser {
            email: email.to_string(),
            password_hash: "hash".to_string(),
            role: if tenant_id.is_some() { Role::Accountant } else { Role::SystemAdmin },
            tenant_id,
        }
    }

    fn client(tenant_id: i64, name: &str) -> Client {
        NewClient {
            name: name.to_string(),
            email: format!("{}@example.test", name.to_lowercase()),
            ..Default::default()
        }
        .into_client(tenant_id)
    }

    fn invoice(tenant_id: i64, client_id: Uuid, number: &str) -> Invoice {
        let now = Utc::now();
        let mut inv = Invoice {
            id: Uuid::new_v4(),
            tenant_id,
            invoice_number: number.to_string(),
            client_id,
            date: now.date_naive(),
            due_date: now.date_naive(),
            status: InvoiceStatus::Unpaid,
            line_items: vec![LineItem::new(Uuid::nil(), "Design".into(), 2, Decimal::from(50))],
            subtotal: Decimal::ZERO,
            tax_rate: Decimal::ZERO,
            tax: Decimal::ZERO,
            discount: Decimal::ZERO,
            total: Decimal::ZERO,
            notes: None,
            created_at: now,
            updated_at: now,
        };
        inv.recompute();
        inv
    }

    #[tokio::test]
    async fn duplicate_email_conflicts() {
        let store = MemoryStore::new();
        store.create_user(new_user("a@b.test", None)).await.unwrap();
        let err = store.create_user(new_user("a@b.test", None)).await.unwrap_err();
        assert!(matches!(err, DatabaseError::Conflict(_)));
    }

    #[tokio::test]
    async fn upsert_overwrites_existing_user() {
        let store = MemoryStore::new();
        let tenant = store.create_tenant("Acme").await.unwrap();
        let first = store.upsert_user(new_user("a@b.test", None)).await.unwrap();
        let second = store.upsert_user(new_user("a@b.test", Some(tenant.id))).await.unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(second.tenant_id, Some(tenant.id));
        assert_eq!(store.list_users().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn filters_clients_by_tenant() {
        let store = MemoryStore::new();
        let a = store.create_tenant("A").await.unwrap();
        let b = store.create_tenant("B").await.unwrap();
        store
            .insert_clients(vec![client(a.id, "Ann"), client(a.id, "Al"), client(b.id, "Bob")])
            .await
            .unwrap();

        let filter = FilterData { where_clause: Some(json!({ "tenant_id": a.id })), ..Default::default() };
        let rows = store.list_clients(&filter).await.unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|c| c.tenant_id == a.id));
        assert_eq!(store.count_clients(&filter).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn invoice_numbers_unique_per_tenant_only() {
        let store = MemoryStore::new();
        let a = store.create_tenant("A").await.unwrap();
        let b = store.create_tenant("B").await.unwrap();
        let ca = client(a.id, "Ann");
        let cb = client(b.id, "Bob");
        store.insert_clients(vec![ca.clone(), cb.clone()]).await.unwrap();

        store.insert_invoice(&invoice(a.id, ca.id, "INV-1")).await.unwrap();
        store.insert_invoice(&invoice(b.id, cb.id, "INV-1")).await.unwrap();
        let err = store.insert_invoice(&invoice(a.id, ca.id, "INV-1")).await.unwrap_err();
        assert!(matches!(err, DatabaseError::Conflict(_)));
    }

    #[tokio::test]
    async fn referenced_client_cannot_be_deleted() {
        let store = MemoryStore::new();
        let a = store.create_tenant("A").await.unwrap();
        let c = client(a.id, "Ann");
        store.insert_clients(vec![c.clone()]).await.unwrap();
        let inv = invoice(a.id, c.id, "INV-1");
        store.insert_invoice(&inv).await.unwrap();

        assert!(matches!(store.delete_client(c.id).await, Err(DatabaseError::Conflict(_))));
        assert!(store.delete_invoice(inv.id).await.unwrap());
        assert!(store.delete_client(c.id).await.unwrap());
    }

    #[tokio::test]
    async fn tenant_listing_counts_children() {
        let store = MemoryStore::new();
        let a = store.create_tenant("A").await.unwrap();
        store.create_user(new_user("u@a.test", Some(a.id))).await.unwrap();
        store.insert_clients(vec![client(a.id, "Ann")]).await.unwrap();

        let summaries = store.list_tenants().await.unwrap();
        assert_eq!(summaries[0].counts, TenantCounts { users: 1, clients: 1, invoices: 0 });
    }
}
