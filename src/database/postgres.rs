use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::{Executor, FromRow, PgPool, Postgres, Transaction};
use tracing::info;
use uuid::Uuid;

use super::manager::{DatabaseError, DatabaseManager};
use super::models::{Client, Invoice, LineItem, NewUser, Tenant, TenantCounts, TenantSummary, User};
use super::query_builder::QueryBuilder;
use super::store::Store;
use crate::config::DatabaseConfig;
use crate::filter::{ColumnCasts, FilterData};

/// Schema bootstrap, applied on every start. Statements are idempotent.
const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS tenants (
    id          BIGSERIAL PRIMARY KEY,
    name        TEXT NOT NULL,
    created_at  TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE TABLE IF NOT EXISTS users (
    id             BIGSERIAL PRIMARY KEY,
    email          TEXT NOT NULL,
    password_hash  TEXT NOT NULL,
    role           TEXT NOT NULL CHECK (role IN ('SYSTEM_ADMIN', 'COMPANY_ADMIN', 'ACCOUNTANT')),
    tenant_id      BIGINT REFERENCES tenants (id),
    created_at     TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT users_email_key UNIQUE (email),
    CONSTRAINT users_role_tenant_check CHECK ((role = 'SYSTEM_ADMIN') = (tenant_id IS NULL))
);

CREATE TABLE IF NOT EXISTS clients (
    id          UUID PRIMARY KEY,
    tenant_id   BIGINT NOT NULL REFERENCES tenants (id),
    name        TEXT NOT NULL,
    email       TEXT NOT NULL,
    phone       TEXT,
    address     TEXT,
    company     TEXT,
    created_at  TIMESTAMPTZ NOT NULL,
    updated_at  TIMESTAMPTZ NOT NULL
);
CREATE INDEX IF NOT EXISTS clients_tenant_id_idx ON clients (tenant_id);

CREATE TABLE IF NOT EXISTS invoices (
    id              UUID PRIMARY KEY,
    tenant_id       BIGINT NOT NULL REFERENCES tenants (id),
    invoice_number  TEXT NOT NULL,
    client_id       UUID NOT NULL REFERENCES clients (id) ON DELETE RESTRICT,
    date            DATE NOT NULL,
    due_date        DATE NOT NULL,
    status          TEXT NOT NULL DEFAULT 'unpaid' CHECK (status IN ('unpaid', 'paid', 'overdue')),
    subtotal        NUMERIC NOT NULL,
    tax_rate        NUMERIC NOT NULL,
    tax             NUMERIC NOT NULL,
    discount        NUMERIC NOT NULL,
    total           NUMERIC NOT NULL,
    notes           TEXT,
    created_at      TIMESTAMPTZ NOT NULL,
    updated_at      TIMESTAMPTZ NOT NULL,
    CONSTRAINT invoices_tenant_id_invoice_number_key UNIQUE (tenant_id, invoice_number)
);
CREATE INDEX IF NOT EXISTS invoices_client_id_idx ON invoices (client_id);

CREATE TABLE IF NOT EXISTS line_items (
    id           UUID PRIMARY KEY,
    invoice_id   UUID NOT NULL REFERENCES invoices (id) ON DELETE CASCADE,
    position     INTEGER NOT NULL,
    description  TEXT NOT NULL,
    quantity     BIGINT NOT NULL,
    unit_price   NUMERIC NOT NULL,
    total        NUMERIC NOT NULL
);
CREATE INDEX IF NOT EXISTS line_items_invoice_id_idx ON line_items (invoice_id);
"#;

const CLIENT_CASTS: ColumnCasts = ColumnCasts::new(&[("id", "uuid")]);
const INVOICE_CASTS: ColumnCasts = ColumnCasts::new(&[
    ("id", "uuid"),
    ("client_id", "uuid"),
    ("date", "date"),
    ("due_date", "date"),
]);

pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, DatabaseError> {
        let pool = DatabaseManager::connect(config).await?;
        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    async fn migrate(&self) -> Result<(), DatabaseError> {
        // Plain &str runs through the simple protocol, which allows many statements
        self.pool.execute(SCHEMA).await?;
        info!("Database schema is up to date");
        Ok(())
    }

    async fn load_line_items(&self, invoices: &mut [Invoice]) -> Result<(), DatabaseError> {
        if invoices.is_empty() {
            return Ok(());
        }
        let ids: Vec<Uuid> = invoices.iter().map(|i| i.id).collect();
        let items = sqlx::query_as::<_, LineItem>(
            "SELECT * FROM line_items WHERE invoice_id = ANY($1) ORDER BY invoice_id, position",
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        let mut grouped: HashMap<Uuid, Vec<LineItem>> = HashMap::new();
        for item in items {
            grouped.entry(item.invoice_id).or_default().push(item);
        }
        for invoice in invoices.iter_mut() {
            invoice.line_items = grouped.remove(&invoice.id).unwrap_or_default();
        }
        Ok(())
    }
}

async fn insert_line_items(tx: &mut Transaction<'_, Postgres>, invoice: &Invoice) -> Result<(), DatabaseError> {
    for item in &invoice.line_items {
        sqlx::query(
            "INSERT INTO line_items (id, invoice_id, position, description, quantity, unit_price, total)
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(item.id)
        .bind(invoice.id)
        .bind(item.position)
        .bind(&item.description)
        .bind(item.quantity)
        .bind(item.unit_price)
        .bind(item.total)
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}

#[async_trait]
impl Store for PgStore {
    fn backend(&self) -> &'static str {
        "postgres"
    }

    async fn health_check(&self) -> Result<(), DatabaseError> {
        DatabaseManager::health_check(&self.pool).await
    }

    async fn create_tenant(&self, name: &str) -> Result<Tenant, DatabaseError> {
        let tenant = sqlx::query_as::<_, Tenant>("INSERT INTO tenants (name) VALUES ($1) RETURNING *")
            .bind(name)
            .fetch_one(&self.pool)
            .await?;
        Ok(tenant)
    }

    async fn get_tenant(&self, id: i64) -> Result<Option<Tenant>, DatabaseError> {
        let tenant = sqlx::query_as::<_, Tenant>("SELECT * FROM tenants WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(tenant)
    }

    async fn find_tenant_by_name(&self, name: &str) -> Result<Option<Tenant>, DatabaseError> {
        let tenant = sqlx::query_as::<_, Tenant>("SELECT * FROM tenants WHERE name = $1 ORDER BY id LIMIT 1")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;
        Ok(tenant)
    }

    async fn list_tenants(&self) -> Result<Vec<TenantSummary>, DatabaseError> {
        let rows = sqlx::query(
            "SELECT t.id, t.name, t.created_at,
                    (SELECT COUNT(*) FROM users u WHERE u.tenant_id = t.id) AS users,
                    (SELECT COUNT(*) FROM clients c WHERE c.tenant_id = t.id) AS clients,
                    (SELECT COUNT(*) FROM invoices i WHERE i.tenant_id = t.id) AS invoices
             FROM tenants t
             ORDER BY t.created_at DESC, t.id DESC",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| -> Result<TenantSummary, DatabaseError> {
                Ok(TenantSummary {
                    tenant: Tenant::from_row(row)?,
                    counts: TenantCounts::from_row(row)?,
                })
            })
            .collect()
    }

    async fn create_user(&self, user: NewUser) -> Result<User, DatabaseError> {
        let created = sqlx::query_as::<_, User>(
            "INSERT INTO users (email, password_hash, role, tenant_id) VALUES ($1, $2, $3, $4) RETURNING *",
        )
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .bind(user.tenant_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(created)
    }

    async fn upsert_user(&self, user: NewUser) -> Result<User, DatabaseError> {
        let saved = sqlx::query_as::<_, User>(
            "INSERT INTO users (email, password_hash, role, tenant_id) VALUES ($1, $2, $3, $4)
             ON CONFLICT (email) DO UPDATE
                SET password_hash = EXCLUDED.password_hash,
                    role = EXCLUDED.role,
                    tenant_id = EXCLUDED.tenant_id
             RETURNING *",
        )
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .bind(user.tenant_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(saved)
    }

    async fn get_user(&self, id: i64) -> Result<Option<User>, DatabaseError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, DatabaseError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn list_users(&self) -> Result<Vec<User>, DatabaseError> {
        let users = sqlx::query_as::<_, User>("SELECT * FROM users ORDER BY created_at DESC, id DESC")
            .fetch_all(&self.pool)
            .await?;
        Ok(users)
    }

    async fn list_clients(&self, filter: &FilterData) -> Result<Vec<Client>, DatabaseError> {
        QueryBuilder::<Client>::new("clients", filter, CLIENT_CASTS)?
            .select_all(&self.pool)
            .await
    }

    async fn count_clients(&self, filter: &FilterData) -> Result<i64, DatabaseError> {
        QueryBuilder::<Client>::new("clients", filter, CLIENT_CASTS)?
            .count(&self.pool)
            .await
    }

    async fn insert_clients(&self, clients: Vec<Client>) -> Result<u64, DatabaseError> {
        let mut tx = self.pool.begin().await?;
        let mut inserted = 0;
        for client in &clients {
            let result = sqlx::query(
                "INSERT INTO clients (id, tenant_id, name, email, phone, address, company, created_at, updated_at)
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
            )
            .bind(client.id)
            .bind(client.tenant_id)
            .bind(&client.name)
            .bind(&client.email)
            .bind(&client.phone)
            .bind(&client.address)
            .bind(&client.company)
            .bind(client.created_at)
            .bind(client.updated_at)
            .execute(&mut *tx)
            .await?;
            inserted += result.rows_affected();
        }
        tx.commit().await?;
        Ok(inserted)
    }

    async fn update_client(&self, client: &Client) -> Result<Client, DatabaseError> {
        let updated = sqlx::query_as::<_, Client>(
            "UPDATE clients
                SET name = $2, email = $3, phone = $4, address = $5, company = $6, updated_at = $7
              WHERE id = $1
          RETURNING *",
        )
        .bind(client.id)
        .bind(&client.name)
        .bind(&client.email)
        .bind(&client.phone)
        .bind(&client.address)
        .bind(&client.company)
        .bind(client.updated_at)
        .fetch_optional(&self.pool)
        .await?;
        updated.ok_or_else(|| DatabaseError::NotFound(format!("client {}", client.id)))
    }

    async fn delete_client(&self, id: Uuid) -> Result<bool, DatabaseError> {
        let result = sqlx::query("DELETE FROM clients WHERE id = $1").bind(id).execute(&self.pool).await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_invoices(&self, filter: &FilterData) -> Result<Vec<Invoice>, DatabaseError> {
        let mut invoices = QueryBuilder::<Invoice>::new("invoices", filter, INVOICE_CASTS)?
            .select_all(&self.pool)
            .await?;
        self.load_line_items(&mut invoices).await?;
        Ok(invoices)
    }

    async fn count_invoices(&self, filter: &FilterData) -> Result<i64, DatabaseError> {
        QueryBuilder::<Invoice>::new("invoices", filter, INVOICE_CASTS)?
            .count(&self.pool)
            .await
    }

    async fn insert_invoice(&self, invoice: &Invoice) -> Result<Invoice, DatabaseError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query(
            "INSERT INTO invoices (id, tenant_id, invoice_number, client_id, date, due_date, status,
                                   subtotal, tax_rate, tax, discount, total, notes, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)",
        )
        .bind(invoice.id)
        .bind(invoice.tenant_id)
        .bind(&invoice.invoice_number)
        .bind(invoice.client_id)
        .bind(invoice.date)
        .bind(invoice.due_date)
        .bind(invoice.status.as_str())
        .bind(invoice.subtotal)
        .bind(invoice.tax_rate)
        .bind(invoice.tax)
        .bind(invoice.discount)
        .bind(invoice.total)
        .bind(&invoice.notes)
        .bind(invoice.created_at)
        .bind(invoice.updated_at)
        .execute(&mut *tx)
        .await?;
        insert_line_items(&mut tx, invoice).await?;
        tx.commit().await?;
        Ok(invoice.clone())
    }

    async fn update_invoice(&self, invoice: &Invoice) -> Result<Invoice, DatabaseError> {
        let mut tx = self.pool.begin().await?;
        let result = sqlx::query(
            "UPDATE invoices
                SET invoice_number = $2, client_id = $3, date = $4, due_date = $5, status = $6,
                    subtotal = $7, tax_rate = $8, tax = $9, discount = $10, total = $11,
                    notes = $12, updated_at = $13
              WHERE id = $1",
        )
        .bind(invoice.id)
        .bind(&invoice.invoice_number)
        .bind(invoice.client_id)
        .bind(invoice.date)
        .bind(invoice.due_date)
        .bind(invoice.status.as_str())
        .bind(invoice.subtotal)
        .bind(invoice.tax_rate)
        .bind(invoice.tax)
        .bind(invoice.discount)
        .bind(invoice.total)
        .bind(&invoice.notes)
        .bind(invoice.updated_at)
        .execute(&mut *tx)
        .await?;
        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound(format!("invoice {}", invoice.id)));
        }

        sqlx::query("DELETE FROM line_items WHERE invoice_id = $1")
            .bind(invoice.id)
            .execute(&mut *tx)
            .await?;
        insert_line_items(&mut tx, invoice).await?;
        tx.commit().await?;
        Ok(invoice.clone())
    }

    async fn delete_invoice(&self, id: Uuid) -> Result<bool, DatabaseError> {
        let result = sqlx::query("DELETE FROM invoices WHERE id = $1").bind(id).execute(&self.pool).await?;
        Ok(result.rows_affected() > 0)
    }
}
