//! Local-first view of the caller's clients and invoices.
//!
//! Every mutation is applied to the local copy first (`Pending`), written to
//! the JSON cache and published to subscribers, then sent to the server. The
//! server's answer settles the record as `Confirmed` or `Failed`. A failure is
//! never rolled back; it is recorded on the row and as a `sync_failed`
//! notification so the user can see what did not reach the server.

use std::path::PathBuf;

use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use super::api_client::{ClientRequest, InvoiceRequest, RemoteApi};
use super::config::{load_json, save_json};
use super::notifications::NotificationLog;
use super::observers::{Observers, SubscriptionId};
use crate::database::models::{Client, Invoice, LineItem};
use crate::services::invoices::DEFAULT_TERMS_DAYS;
use crate::types::InvoiceStatus;

const INVOICES_FILE: &str = "invoices.json";
const CLIENTS_FILE: &str = "clients.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncState {
    Pending,
    Confirmed,
    Failed,
}

/// A record plus where it stands with the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tracked<T> {
    pub record: T,
    pub state: SyncState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> Tracked<T> {
    fn confirmed(record: T) -> Self {
        Self {
            record,
            state: SyncState::Confirmed,
            error: None,
        }
    }

    fn pending(record: T) -> Self {
        Self {
            record,
            state: SyncState::Pending,
            error: None,
        }
    }

    fn settle(&mut self, outcome: anyhow::Result<T>) -> Option<String> {
        match outcome {
            Ok(record) => {
                self.record = record;
                self.state = SyncState::Confirmed;
                self.error = None;
                None
            }
            Err(e) => {
                let message = e.to_string();
                self.state = SyncState::Failed;
                self.error = Some(message.clone());
                Some(message)
            }
        }
    }
}

/// Where the data in a freshly opened store came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadSource {
    Server,
    Cache,
    Empty,
}

/// Everything subscribers are shown after a change.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoreState {
    /// Newest first.
    pub invoices: Vec<Tracked<Invoice>>,
    /// Newest first.
    pub clients: Vec<Tracked<Client>>,
}

pub struct ClientStore {
    dir: PathBuf,
    api: Box<dyn RemoteApi>,
    state: StoreState,
    source: LoadSource,
    observers: Observers<StoreState>,
    notifications: NotificationLog,
}

impl ClientStore {
    /// Load from the server, falling back to the cache in `dir`, then to nothing.
    pub async fn open(dir: impl Into<PathBuf>, api: Box<dyn RemoteApi>) -> anyhow::Result<Self> {
        let dir = dir.into();
        let notifications = NotificationLog::open(&dir)?;

        let fetched = match api.list_clients().await {
            Ok(clients) => api.list_invoices().await.map(|invoices| (clients, invoices)),
            Err(e) => Err(e),
        };

        let (state, source) = match fetched {
            Ok((clients, invoices)) => {
                let state = StoreState {
                    invoices: invoices.into_iter().map(Tracked::confirmed).collect(),
                    clients: clients.into_iter().map(Tracked::confirmed).collect(),
                };
                (state, LoadSource::Server)
            }
            Err(e) => {
                warn!("Server unavailable, using local cache: {}", e);
                let invoices: Option<Vec<Tracked<Invoice>>> = load_json(&dir.join(INVOICES_FILE))?;
                let clients: Option<Vec<Tracked<Client>>> = load_json(&dir.join(CLIENTS_FILE))?;
                let source = if invoices.is_some() || clients.is_some() {
                    LoadSource::Cache
                } else {
                    LoadSource::Empty
                };
                let state = StoreState {
                    invoices: invoices.unwrap_or_default(),
                    clients: clients.unwrap_or_default(),
                };
                (state, source)
            }
        };

        let store = Self {
            dir,
            api,
            state,
            source,
            observers: Observers::new(),
            notifications,
        };
        if source == LoadSource::Server {
            store.persist()?;
        }
        debug!(
            "Store opened from {:?}: {} clients, {} invoices",
            source,
            store.state.clients.len(),
            store.state.invoices.len()
        );
        Ok(store)
    }

    pub fn source(&self) -> LoadSource {
        self.source
    }

    pub fn state(&self) -> &StoreState {
        &self.state
    }

    pub fn clients(&self) -> &[Tracked<Client>] {
        &self.state.clients
    }

    pub fn invoices(&self) -> &[Tracked<Invoice>] {
        &self.state.invoices
    }

    pub fn client(&self, id: Uuid) -> Option<&Client> {
        self.state.clients.iter().map(|t| &t.record).find(|c| c.id == id)
    }

    /// By id, or by invoice number when `key` is not a UUID.
    pub fn invoice(&self, key: &str) -> Option<&Invoice> {
        let id = Uuid::parse_str(key).ok();
        self.state
            .invoices
            .iter()
            .map(|t| &t.record)
            .find(|inv| Some(inv.id) == id || inv.invoice_number == key)
    }

    pub fn notifications(&self) -> &NotificationLog {
        &self.notifications
    }

    pub fn subscribe<F>(&mut self, listener: F) -> SubscriptionId
    where
        F: Fn(&StoreState) + Send + Sync + 'static,
    {
        self.observers.subscribe(listener)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.observers.unsubscribe(id)
    }

    pub async fn add_client(&mut self, request: ClientRequest) -> anyhow::Result<Tracked<Client>> {
        let now = Utc::now();
        let placeholder = Client {
            id: Uuid::new_v4(),
            tenant_id: 0,
            name: request.name.clone(),
            email: request.email.clone(),
            phone: request.phone.clone(),
            address: request.address.clone(),
            company: request.company.clone(),
            created_at: now,
            updated_at: now,
        };
        self.state.clients.insert(0, Tracked::pending(placeholder));
        self.commit()?;

        let outcome = self.api.create_client(&request).await;
        let failure = self.settle_client(0, outcome);
        match failure {
            Some(error) => self.notifications.sync_failed(&format!("client {}", request.name), &error)?,
            None => self.notifications.client_added(&self.state.clients[0].record)?,
        }
        self.commit()?;
        Ok(self.state.clients[0].clone())
    }

    /// Local figures come from the shared totals calculator; the server
    /// recomputes them on its side.
    pub async fn create_invoice(&mut self, request: InvoiceRequest) -> anyhow::Result<Tracked<Invoice>> {
        let now = Utc::now();
        let id = Uuid::new_v4();
        let mut placeholder = Invoice {
            id,
            tenant_id: 0,
            invoice_number: request.invoice_number.clone(),
            client_id: request.client_id,
            date: request.date,
            due_date: request
                .due_date
                .unwrap_or(request.date + Duration::days(DEFAULT_TERMS_DAYS)),
            status: InvoiceStatus::Unpaid,
            line_items: request
                .line_items
                .iter()
                .map(|line| LineItem::new(id, line.description.clone(), line.quantity, line.unit_price))
                .collect(),
            subtotal: Default::default(),
            tax_rate: request.tax_rate,
            tax: Default::default(),
            discount: request.discount,
            total: Default::default(),
            notes: request.notes.clone(),
            created_at: now,
            updated_at: now,
        };
        placeholder.recompute();
        self.state.invoices.insert(0, Tracked::pending(placeholder));
        self.commit()?;

        let outcome = self.api.create_invoice(&request).await;
        let failure = settle_at(&mut self.state.invoices, 0, outcome);
        match failure {
            Some(error) => {
                let what = format!("invoice {}", request.invoice_number);
                self.notifications.sync_failed(&what, &error)?;
            }
            None => {
                let invoice = &self.state.invoices[0].record;
                if let Some(client) = self.client(invoice.client_id).cloned() {
                    self.notifications.invoice_created(invoice, &client)?;
                }
            }
        }
        self.commit()?;
        Ok(self.state.invoices[0].clone())
    }

    /// Returns `None` when no local invoice has that id.
    pub async fn mark_invoice(&mut self, id: Uuid, status: InvoiceStatus) -> anyhow::Result<Option<Tracked<Invoice>>> {
        let Some(index) = self.state.invoices.iter().position(|t| t.record.id == id) else {
            return Ok(None);
        };

        {
            let entry = &mut self.state.invoices[index];
            entry.record.status = status;
            entry.record.updated_at = Utc::now();
            entry.state = SyncState::Pending;
            entry.error = None;
        }
        self.commit()?;

        let outcome = self.api.mark_invoice(id, status).await;
        let failure = settle_at(&mut self.state.invoices, index, outcome);
        let invoice = self.state.invoices[index].record.clone();
        match failure {
            Some(error) => {
                let what = format!("invoice {}", invoice.invoice_number);
                self.notifications.sync_failed(&what, &error)?;
            }
            None => {
                if let Some(client) = self.client(invoice.client_id).cloned() {
                    match status {
                        InvoiceStatus::Paid => self.notifications.invoice_paid(&invoice, &client)?,
                        InvoiceStatus::Overdue => self.notifications.invoice_overdue(&invoice, &client)?,
                        InvoiceStatus::Unpaid => {}
                    }
                }
            }
        }
        self.commit()?;
        Ok(Some(self.state.invoices[index].clone()))
    }

    /// Removed locally straight away. A server refusal is reported but the
    /// row is not brought back.
    pub async fn delete_invoice(&mut self, id: Uuid) -> anyhow::Result<SyncState> {
        let label = self
            .state
            .invoices
            .iter()
            .find(|t| t.record.id == id)
            .map(|t| format!("deletion of invoice {}", t.record.invoice_number))
            .unwrap_or_else(|| format!("deletion of invoice {}", id));
        self.state.invoices.retain(|t| t.record.id != id);
        self.commit()?;

        let outcome = self.api.delete_invoice(id).await;
        self.finish_delete(&label, outcome)
    }

    pub async fn delete_client(&mut self, id: Uuid) -> anyhow::Result<SyncState> {
        let label = self
            .client(id)
            .map(|c| format!("deletion of client {}", c.name))
            .unwrap_or_else(|| format!("deletion of client {}", id));
        self.state.clients.retain(|t| t.record.id != id);
        self.commit()?;

        let outcome = self.api.delete_client(id).await;
        self.finish_delete(&label, outcome)
    }

    fn finish_delete(&mut self, label: &str, outcome: anyhow::Result<()>) -> anyhow::Result<SyncState> {
        match outcome {
            Ok(()) => Ok(SyncState::Confirmed),
            Err(e) => {
                warn!("Server rejected {}: {}", label, e);
                self.notifications.sync_failed(label, &e.to_string())?;
                Ok(SyncState::Failed)
            }
        }
    }

    fn settle_client(&mut self, index: usize, outcome: anyhow::Result<Client>) -> Option<String> {
        settle_at(&mut self.state.clients, index, outcome)
    }

    fn persist(&self) -> anyhow::Result<()> {
        save_json(&self.dir.join(INVOICES_FILE), &self.state.invoices)?;
        save_json(&self.dir.join(CLIENTS_FILE), &self.state.clients)
    }

    fn commit(&self) -> anyhow::Result<()> {
        self.persist()?;
        self.observers.notify(&self.state);
        Ok(())
    }
}

fn settle_at<T>(rows: &mut [Tracked<T>], index: usize, outcome: anyhow::Result<T>) -> Option<String> {
    let failure = rows[index].settle(outcome);
    if let Some(error) = &failure {
        warn!("Server write failed: {}", error);
    }
    failure
}
