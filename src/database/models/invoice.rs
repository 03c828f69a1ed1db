use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use sqlx::{postgres::PgRow, FromRow, Row};
use uuid::Uuid;

use crate::filter::FilterTarget;
use crate::totals::{self, LineInput};
use crate::types::InvoiceStatus;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    pub id: Uuid,
    pub invoice_id: Uuid,
    pub position: i32,
    pub description: String,
    pub quantity: i64,
    pub unit_price: Decimal,
    pub total: Decimal,
}

impl LineItem {
    pub fn new(invoice_id: Uuid, description: String, quantity: i64, unit_price: Decimal) -> Self {
        Self {
            id: Uuid::new_v4(),
            invoice_id,
            position: 0,
            description,
            quantity,
            unit_price,
            total: LineInput::new(quantity, unit_price).total(),
        }
    }

    pub fn input(&self) -> LineInput {
        LineInput::new(self.quantity, self.unit_price)
    }
}

/// An invoice with its ordered line items. Money figures are derived by
/// [`Invoice::recompute`] and are never taken from a request body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Invoice {
    pub id: Uuid,
    pub tenant_id: i64,
    pub invoice_number: String,
    pub client_id: Uuid,
    pub date: NaiveDate,
    pub due_date: NaiveDate,
    pub status: InvoiceStatus,
    pub line_items: Vec<LineItem>,
    pub subtotal: Decimal,
    pub tax_rate: Decimal,
    pub tax: Decimal,
    pub discount: Decimal,
    pub total: Decimal,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Invoice {
    /// Renumber line positions and rederive every money figure.
    pub fn recompute(&mut self) {
        for (position, item) in self.line_items.iter_mut().enumerate() {
            item.position = position as i32;
            item.invoice_id = self.id;
        }

        let inputs: Vec<LineInput> = self.line_items.iter().map(LineItem::input).collect();
        let figures = totals::compute(&inputs, self.tax_rate, self.discount);

        for (item, line_total) in self.line_items.iter_mut().zip(figures.line_totals) {
            item.total = line_total;
        }
        self.subtotal = figures.subtotal;
        self.tax = figures.tax_amount;
        self.total = figures.total;
    }

    /// Amount still owed: the total unless the invoice is paid.
    pub fn outstanding(&self) -> Decimal {
        match self.status {
            InvoiceStatus::Paid => Decimal::ZERO,
            _ => self.total,
        }
    }
}

/// Line items are loaded separately; this fills in the header row only.
impl<'r> FromRow<'r, PgRow> for Invoice {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        let status: String = row.try_get("status")?;
        let status = status.parse::<InvoiceStatus>().map_err(|e| sqlx::Error::ColumnDecode {
            index: "status".to_string(),
            source: e.into(),
        })?;

        Ok(Self {
            id: row.try_get("id")?,
            tenant_id: row.try_get("tenant_id")?,
            invoice_number: row.try_get("invoice_number")?,
            client_id: row.try_get("client_id")?,
            date: row.try_get("date")?,
            due_date: row.try_get("due_date")?,
            status,
            line_items: Vec::new(),
            subtotal: row.try_get("subtotal")?,
            tax_rate: row.try_get("tax_rate")?,
            tax: row.try_get("tax")?,
            discount: row.try_get("discount")?,
            total: row.try_get("total")?,
            notes: row.try_get("notes")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

impl FilterTarget for Invoice {
    fn field(&self, column: &str) -> Value {
        match column {
            "id" => json!(self.id.to_string()),
            "tenant_id" => json!(self.tenant_id),
            "invoice_number" => json!(self.invoice_number),
            "client_id" => json!(self.client_id.to_string()),
            "date" => json!(self.date.to_string()),
            "due_date" => json!(self.due_date.to_string()),
            "status" => json!(self.status.as_str()),
            "notes" => json!(self.notes),
            "created_at" => json!(super::sortable_timestamp(&self.created_at)),
            "updated_at" => json!(super::sortable_timestamp(&self.updated_at)),
            _ => Value::Null,
        }
    }
}
