//! Local, advisory event log kept next to the CLI cache. It is not an audit
//! trail: entries can be deleted and nothing on the server mirrors them.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::config::{load_json, save_json};
use super::observers::{Observers, SubscriptionId};
use crate::database::models::{Client, Invoice};

const NOTIFICATIONS_FILE: &str = "notifications.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    InvoiceCreated,
    InvoicePaid,
    InvoiceOverdue,
    ClientAdded,
    SyncFailed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub read: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invoice_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<Uuid>,
}

/// What a caller supplies; id, timestamp and read flag are filled in by [`NotificationLog::add`].
#[derive(Debug, Clone, PartialEq)]
pub struct NewNotification {
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub invoice_id: Option<Uuid>,
    pub client_id: Option<Uuid>,
}

pub struct NotificationLog {
    path: PathBuf,
    entries: Vec<Notification>,
    observers: Observers<[Notification]>,
}

impl NotificationLog {
    /// Load `notifications.json` from `dir`, starting empty when it is missing.
    pub fn open(dir: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let path = dir.into().join(NOTIFICATIONS_FILE);
        let entries = load_json(&path)?.unwrap_or_default();
        Ok(Self {
            path,
            entries,
            observers: Observers::new(),
        })
    }

    /// Newest first.
    pub fn entries(&self) -> &[Notification] {
        &self.entries
    }

    pub fn unread_count(&self) -> usize {
        self.entries.iter().filter(|n| !n.read).count()
    }

    pub fn subscribe<F>(&mut self, listener: F) -> SubscriptionId
    where
        F: Fn(&[Notification]) + Send + Sync + 'static,
    {
        self.observers.subscribe(listener)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.observers.unsubscribe(id)
    }

    pub fn add(&mut self, event: NewNotification) -> anyhow::Result<&Notification> {
        let notification = Notification {
            id: format!("notif-{}", Uuid::new_v4().simple()),
            kind: event.kind,
            title: event.title,
            message: event.message,
            timestamp: Utc::now(),
            read: false,
            invoice_id: event.invoice_id,
            client_id: event.client_id,
        };
        self.entries.insert(0, notification);
        self.commit()?;
        Ok(&self.entries[0])
    }

    /// Returns false when no entry has that id.
    pub fn mark_read(&mut self, id: &str) -> anyhow::Result<bool> {
        let found = match self.entries.iter_mut().find(|n| n.id == id) {
            Some(entry) => {
                entry.read = true;
                true
            }
            None => false,
        };
        self.commit()?;
        Ok(found)
    }

    pub fn mark_all_read(&mut self) -> anyhow::Result<()> {
        for entry in &mut self.entries {
            entry.read = true;
        }
        self.commit()
    }

    pub fn delete(&mut self, id: &str) -> anyhow::Result<bool> {
        let before = self.entries.len();
        self.entries.retain(|n| n.id != id);
        let removed = self.entries.len() != before;
        self.commit()?;
        Ok(removed)
    }

    pub fn invoice_created(&mut self, invoice: &Invoice, client: &Client) -> anyhow::Result<()> {
        self.add(NewNotification {
            kind: NotificationKind::InvoiceCreated,
            title: "Invoice Created".into(),
            message: format!("Invoice {} created for {}", invoice.invoice_number, client.name),
            invoice_id: Some(invoice.id),
            client_id: None,
        })
        .map(|_| ())
    }

    pub fn invoice_paid(&mut self, invoice: &Invoice, client: &Client) -> anyhow::Result<()> {
        self.add(NewNotification {
            kind: NotificationKind::InvoicePaid,
            title: "Payment Received".into(),
            message: format!("Invoice {} from {} has been paid", invoice.invoice_number, client.name),
            invoice_id: Some(invoice.id),
            client_id: None,
        })
        .map(|_| ())
    }

    pub fn invoice_overdue(&mut self, invoice: &Invoice, client: &Client) -> anyhow::Result<()> {
        self.add(NewNotification {
            kind: NotificationKind::InvoiceOverdue,
            title: "Invoice Overdue".into(),
            message: format!("Invoice {} for {} is overdue", invoice.invoice_number, client.name),
            invoice_id: Some(invoice.id),
            client_id: None,
        })
        .map(|_| ())
    }

    pub fn client_added(&mut self, client: &Client) -> anyhow::Result<()> {
        self.add(NewNotification {
            kind: NotificationKind::ClientAdded,
            title: "Client Added".into(),
            message: format!("{} has been added to your clients", client.name),
            invoice_id: None,
            client_id: Some(client.id),
        })
        .map(|_| ())
    }

    /// A server write that failed after the local change was already applied.
    pub fn sync_failed(&mut self, what: &str, error: &str) -> anyhow::Result<()> {
        self.add(NewNotification {
            kind: NotificationKind::SyncFailed,
            title: "Sync Failed".into(),
            message: format!("Could not save {} to the server: {}", what, error),
            invoice_id: None,
            client_id: None,
        })
        .map(|_| ())
    }

    fn commit(&self) -> anyhow::Result<()> {
        save_json(&self.path, &self.entries)?;
        self.observers.notify(&self.entries);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn event(title: &str) -> NewNotification {
        NewNotification {
            kind: NotificationKind::ClientAdded,
            title: title.into(),
            message: String::new(),
            invoice_id: None,
            client_id: None,
        }
    }

    #[test]
    fn add_prepends_unread_entries() {
        let dir = tempfile::tempdir().unwrap();
        let mut log = NotificationLog::open(dir.path()).unwrap();

        log.add(event("first")).unwrap();
        log.add(event("second")).unwrap();

        let titles: Vec<_> = log.entries().iter().map(|n| n.title.as_str()).collect();
        assert_eq!(titles, ["second", "first"]);
        assert!(log.entries()[0].id.starts_with("notif-"));
        assert_ne!(log.entries()[0].id, log.entries()[1].id);
        assert_eq!(log.unread_count(), 2);
    }

    #[test]
    fn mark_read_and_delete_touch_only_the_target() {
        let dir = tempfile::tempdir().unwrap();
        let mut log = NotificationLog::open(dir.path()).unwrap();
        log.add(event("a")).unwrap();
        log.add(event("b")).unwrap();
        log.add(event("c")).unwrap();
        let ids: Vec<String> = log.entries().iter().map(|n| n.id.clone()).collect();

        assert!(log.mark_read(&ids[1]).unwrap());
        assert_eq!(log.entries().iter().map(|n| n.read).collect::<Vec<_>>(), [false, true, false]);
        assert!(!log.mark_read("notif-missing").unwrap());

        assert!(log.delete(&ids[0]).unwrap());
        assert_eq!(log.entries().len(), 2);
        assert_eq!(log.entries()[0].id, ids[1]);

        log.mark_all_read().unwrap();
        assert_eq!(log.unread_count(), 0);
    }

    #[test]
    fn subscribers_see_every_mutation_until_unsubscribed() {
        let dir = tempfile::tempdir().unwrap();
        let mut log = NotificationLog::open(dir.path()).unwrap();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let sink = seen.clone();
        let id = log.subscribe(move |entries: &[Notification]| sink.lock().unwrap().push(entries.len()));
        log.add(event("a")).unwrap();
        log.add(event("b")).unwrap();
        let first = log.entries()[0].id.clone();
        log.mark_read(&first).unwrap();
        log.delete(&first).unwrap();
        assert!(log.unsubscribe(id));
        log.add(event("c")).unwrap();

        assert_eq!(*seen.lock().unwrap(), vec![1, 2, 2, 1]);
    }

    #[test]
    fn log_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let mut log = NotificationLog::open(dir.path()).unwrap();
            log.sync_failed("client Acme", "Email already in use (409)").unwrap();
        }

        let log = NotificationLog::open(dir.path()).unwrap();
        assert_eq!(log.entries().len(), 1);
        assert_eq!(log.entries()[0].kind, NotificationKind::SyncFailed);
        assert!(log.entries()[0].message.contains("Email already in use"));
    }
}
