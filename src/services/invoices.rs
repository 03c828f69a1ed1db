use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use crate::api::payloads::{InvoicePayload, LineDraft, LineItemPayload, MarkStatusPayload};
use crate::api::ListQuery;
use crate::database::models::{Invoice, LineItem};
use crate::database::store::by_id;
use crate::database::{DatabaseError, Store, INVOICE_NUMBER_KEY};
use crate::error::ApiError;
use crate::filter::FilterData;
use crate::middleware::AuthUser;
use crate::tenancy::{scope, write_tenant};
use crate::totals::{self, tax_rate_from_amount, LineInput};
use crate::types::InvoiceStatus;
use crate::validation::FieldProblem;

const NOT_FOUND: &str = "Invoice not found";
const LINE_NOT_FOUND: &str = "Line item not found";

/// Payment terms applied when an invoice arrives without a due date.
pub const DEFAULT_TERMS_DAYS: i64 = 30;

fn build_lines(invoice_id: Uuid, drafts: Vec<LineDraft>) -> Vec<LineItem> {
    drafts
        .into_iter()
        .map(|d| LineItem::new(invoice_id, d.description, d.quantity, d.unit_price))
        .collect()
}

/// Explicit rate wins; a bare tax amount is turned into the rate it implies
/// for these lines.
fn effective_tax_rate(
    rate: Option<Decimal>,
    amount: Option<Decimal>,
    items: &[LineItem],
) -> Result<Option<Decimal>, ApiError> {
    let (None, Some(tax)) = (rate, amount) else {
        return Ok(rate);
    };
    let inputs: Vec<LineInput> = items.iter().map(LineItem::input).collect();
    let subtotal = totals::compute(&inputs, Decimal::ZERO, Decimal::ZERO).subtotal;
    match tax_rate_from_amount(subtotal, tax) {
        Some(rate) => Ok(Some(rate)),
        None => Err(ApiError::validation_failed(vec![FieldProblem::new(
            "tax",
            format!("tax implies a rate above {}%", totals::MAX_TAX_RATE),
        )])),
    }
}

fn duplicate_number(err: DatabaseError) -> ApiError {
    if err.violates(INVOICE_NUMBER_KEY) {
        return ApiError::conflict("Invoice number already exists");
    }
    err.into()
}

pub struct InvoiceService<'a> {
    store: &'a dyn Store,
    caller: &'a AuthUser,
}

impl<'a> InvoiceService<'a> {
    pub fn new(store: &'a dyn Store, caller: &'a AuthUser) -> Self {
        Self { store, caller }
    }

    pub async fn list(&self, query: &ListQuery) -> Result<Vec<Invoice>, ApiError> {
        let filter = scope(query.invoice_filter()?, self.caller, query.tenant_id, true)?;
        Ok(self.store.list_invoices(&filter).await?)
    }

    pub async fn get(&self, id: Uuid) -> Result<Invoice, ApiError> {
        let filter = scope(by_id(id), self.caller, None, true)?;
        self.store
            .find_invoice(&filter)
            .await?
            .ok_or_else(|| ApiError::not_found(NOT_FOUND))
    }

    /// The client has to live in the invoice's tenant. The foreign key alone
    /// would accept a client from any tenant.
    async fn check_client(&self, client_id: Uuid, tenant_id: i64) -> Result<(), ApiError> {
        let filter = FilterData {
            where_clause: Some(json!({ "id": client_id.to_string(), "tenant_id": tenant_id })),
            ..Default::default()
        };
        match self.store.find_client(&filter).await? {
            Some(_) => Ok(()),
            None => Err(ApiError::not_found("Client not found")),
        }
    }

    pub async fn create(&self, payload: InvoicePayload) -> Result<Invoice, ApiError> {
        let requested_tenant = payload.tenant_id;
        let draft = payload.into_draft()?;
        let tenant_id = write_tenant(self.store, self.caller, requested_tenant).await?;
        self.check_client(draft.client_id, tenant_id).await?;

        let id = Uuid::new_v4();
        let date = draft.date.unwrap_or_else(|| Utc::now().date_naive());
        let items = build_lines(id, draft.line_items);
        let tax_rate = effective_tax_rate(draft.tax_rate, draft.tax, &items)?.unwrap_or(Decimal::ZERO);
        let now = Utc::now();

        let mut invoice = Invoice {
            id,
            tenant_id,
            invoice_number: draft.invoice_number,
            client_id: draft.client_id,
            date,
            due_date: draft.due_date.unwrap_or(date + Duration::days(DEFAULT_TERMS_DAYS)),
            status: draft.status,
            line_items: items,
            subtotal: Decimal::ZERO,
            tax_rate,
            tax: Decimal::ZERO,
            discount: draft.discount,
            total: Decimal::ZERO,
            notes: draft.notes,
            created_at: now,
            updated_at: now,
        };
        invoice.recompute();

        let saved = self.store.insert_invoice(&invoice).await.map_err(duplicate_number)?;
        info!("Invoice {} ({}) created in tenant {}", saved.invoice_number, saved.id, tenant_id);
        Ok(saved)
    }

    pub async fn update(&self, id: Uuid, payload: InvoicePayload) -> Result<Invoice, ApiError> {
        let changes = payload.into_changes()?;
        let mut invoice = self.get(id).await?;

        if let Some(client_id) = changes.client_id {
            self.check_client(client_id, invoice.tenant_id).await?;
            invoice.client_id = client_id;
        }
        if let Some(number) = changes.invoice_number {
            invoice.invoice_number = number;
        }
        if let Some(status) = changes.status {
            invoice.status = status;
        }
        if let Some(date) = changes.date {
            invoice.date = date;
        }
        if let Some(due_date) = changes.due_date {
            invoice.due_date = due_date;
        }
        if let Some(notes) = changes.notes {
            invoice.notes = (!notes.is_empty()).then_some(notes);
        }
        if let Some(discount) = changes.discount {
            invoice.discount = discount;
        }
        if let Some(drafts) = changes.line_items {
            invoice.line_items = build_lines(invoice.id, drafts);
        }
        if let Some(rate) = effective_tax_rate(changes.tax_rate, changes.tax, &invoice.line_items)? {
            invoice.tax_rate = rate;
        }

        self.save(invoice).await
    }

    pub async fn mark(&self, id: Uuid, payload: MarkStatusPayload) -> Result<Invoice, ApiError> {
        let status = payload.into_status()?;
        let mut invoice = self.get(id).await?;
        invoice.status = status;
        let saved = self.save(invoice).await?;
        info!("Invoice {} marked {}", saved.id, status);
        Ok(saved)
    }

    /// Line items go with it.
    pub async fn delete(&self, id: Uuid) -> Result<(), ApiError> {
        let invoice = self.get(id).await?;
        if !self.store.delete_invoice(invoice.id).await? {
            return Err(ApiError::not_found(NOT_FOUND));
        }
        info!("Invoice {} deleted", invoice.id);
        Ok(())
    }

    async fn save(&self, mut invoice: Invoice) -> Result<Invoice, ApiError> {
        invoice.updated_at = Utc::now();
        invoice.recompute();
        self.store.update_invoice(&invoice).await.map_err(duplicate_number)
    }

    // Line items. Each write rewrites the parent so its totals stay derived.

    pub async fn line_items(&self, invoice_id: Uuid) -> Result<Vec<LineItem>, ApiError> {
        Ok(self.get(invoice_id).await?.line_items)
    }

    pub async fn add_line_item(&self, invoice_id: Uuid, payload: LineItemPayload) -> Result<LineItem, ApiError> {
        let draft = payload.into_new()?;
        let mut invoice = self.get(invoice_id).await?;

        let item = LineItem::new(invoice.id, draft.description, draft.quantity, draft.unit_price);
        let item_id = item.id;
        invoice.line_items.push(item);

        let saved = self.save(invoice).await?;
        find_line(saved, item_id)
    }

    pub async fn update_line_item(
        &self,
        invoice_id: Uuid,
        item_id: Uuid,
        payload: LineItemPayload,
    ) -> Result<LineItem, ApiError> {
        let changes = payload.into_changes()?;
        let mut invoice = self.get(invoice_id).await?;

        let item = invoice
            .line_items
            .iter_mut()
            .find(|item| item.id == item_id)
            .ok_or_else(|| ApiError::not_found(LINE_NOT_FOUND))?;
        if let Some(description) = changes.description {
            item.description = description;
        }
        if let Some(quantity) = changes.quantity {
            item.quantity = quantity;
        }
        if let Some(unit_price) = changes.unit_price {
            item.unit_price = unit_price;
        }

        let saved = self.save(invoice).await?;
        find_line(saved, item_id)
    }

    pub async fn delete_line_item(&self, invoice_id: Uuid, item_id: Uuid) -> Result<(), ApiError> {
        let mut invoice = self.get(invoice_id).await?;
        let before = invoice.line_items.len();
        invoice.line_items.retain(|item| item.id != item_id);
        if invoice.line_items.len() == before {
            return Err(ApiError::not_found(LINE_NOT_FOUND));
        }
        self.save(invoice).await?;
        Ok(())
    }
}

fn find_line(invoice: Invoice, item_id: Uuid) -> Result<LineItem, ApiError> {
    invoice
        .line_items
        .into_iter()
        .find(|item| item.id == item_id)
        .ok_or_else(|| ApiError::not_found(LINE_NOT_FOUND))
}

/// `true` once the due date has passed on an invoice that is still unpaid.
pub fn is_past_due(invoice: &Invoice, today: chrono::NaiveDate) -> bool {
    invoice.status == InvoiceStatus::Unpaid && invoice.due_date < today
}
