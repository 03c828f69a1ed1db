use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::json;

use super::invoices::is_past_due;
use crate::database::models::Invoice;
use crate::database::Store;
use crate::error::ApiError;
use crate::filter::FilterData;
use crate::middleware::AuthUser;
use crate::tenancy::scope;
use crate::types::InvoiceStatus;

const RECENT_INVOICES: usize = 5;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusCounts {
    pub unpaid: i64,
    pub paid: i64,
    pub overdue: i64,
}

/// `GET /api/dashboard`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSummary {
    pub client_count: i64,
    pub invoice_count: i64,
    pub status_counts: StatusCounts,
    /// Unpaid invoices whose due date has passed but are not marked overdue
    pub past_due_count: i64,
    pub paid_revenue: Decimal,
    pub outstanding: Decimal,
    pub recent_invoices: Vec<Invoice>,
}

impl DashboardSummary {
    /// Figures for an already-scoped invoice list, newest first.
    pub fn from_invoices(client_count: i64, invoices: Vec<Invoice>, today: NaiveDate) -> Self {
        let mut counts = StatusCounts::default();
        let mut paid_revenue = Decimal::ZERO;
        let mut outstanding = Decimal::ZERO;
        let mut past_due_count = 0;

        for invoice in &invoices {
            match invoice.status {
                InvoiceStatus::Unpaid => counts.unpaid += 1,
                InvoiceStatus::Paid => {
                    counts.paid += 1;
                    paid_revenue += invoice.total;
                }
                InvoiceStatus::Overdue => counts.overdue += 1,
            }
            outstanding += invoice.outstanding();
            if is_past_due(invoice, today) {
                past_due_count += 1;
            }
        }

        Self {
            client_count,
            invoice_count: invoices.len() as i64,
            status_counts: counts,
            past_due_count,
            paid_revenue,
            outstanding,
            recent_invoices: invoices.into_iter().take(RECENT_INVOICES).collect(),
        }
    }
}

pub struct DashboardService<'a> {
    store: &'a dyn Store,
    caller: &'a AuthUser,
}

impl<'a> DashboardService<'a> {
    pub fn new(store: &'a dyn Store, caller: &'a AuthUser) -> Self {
        Self { store, caller }
    }

    pub async fn summary(&self, requested_tenant: Option<i64>) -> Result<DashboardSummary, ApiError> {
        let clients = scope(FilterData::default(), self.caller, requested_tenant, true)?;
        let invoices = scope(
            FilterData {
                order: Some(json!({ "created_at": "desc" })),
                ..Default::default()
            },
            self.caller,
            requested_tenant,
            true,
        )?;

        let client_count = self.store.count_clients(&clients).await?;
        let invoices = self.store.list_invoices(&invoices).await?;
        Ok(DashboardSummary::from_invoices(client_count, invoices, Utc::now().date_naive()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn invoice(status: InvoiceStatus, total: i64, due: NaiveDate) -> Invoice {
        let now = Utc::now();
        Invoice {
            id: Uuid::new_v4(),
            tenant_id: 1,
            invoice_number: Uuid::new_v4().to_string(),
            client_id: Uuid::new_v4(),
            date: due,
            due_date: due,
            status,
            line_items: Vec::new(),
            subtotal: Decimal::from(total),
            tax_rate: Decimal::ZERO,
            tax: Decimal::ZERO,
            discount: Decimal::ZERO,
            total: Decimal::from(total),
            notes: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn aggregates_by_status() {
        let day = |d| NaiveDate::from_ymd_opt(2024, 6, d).unwrap();
        let invoices = vec![
            invoice(InvoiceStatus::Paid, 100, day(1)),
            invoice(InvoiceStatus::Unpaid, 40, day(1)),
            invoice(InvoiceStatus::Unpaid, 10, day(30)),
            invoice(InvoiceStatus::Overdue, 7, day(2)),
        ];

        let summary = DashboardSummary::from_invoices(3, invoices, day(15));
        assert_eq!(summary.client_count, 3);
        assert_eq!(summary.invoice_count, 4);
        assert_eq!(summary.status_counts, StatusCounts { unpaid: 2, paid: 1, overdue: 1 });
        assert_eq!(summary.paid_revenue, Decimal::from(100));
        assert_eq!(summary.outstanding, Decimal::from(57));
        assert_eq!(summary.past_due_count, 1);
        assert_eq!(summary.recent_invoices.len(), 4);
    }
}
