//! Request bodies. Every field is optional at the serde level so that a
//! missing field is reported as a field problem rather than a parse error.
//!
//! Money figures a client sends for derived values (`subtotal`, `total`,
//! line `total`) are not modelled and therefore ignored.

use chrono::{DateTime, NaiveDate};
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;

use crate::database::models::{ClientChanges, NewClient};
use crate::error::ApiError;
use crate::totals::{MAX_AMOUNT, MAX_QUANTITY, MAX_TAX_RATE, MAX_UNIT_PRICE};
use crate::types::{InvoiceStatus, Role};
use crate::validation::Validator;

pub const MIN_PASSWORD_LEN: usize = 6;

fn trimmed(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn field(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{prefix}.{name}")
    }
}

/// Accepts `YYYY-MM-DD` or a full RFC 3339 timestamp (date part kept).
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(value).ok().map(|d| d.date_naive()))
}

fn check_date(v: &mut Validator, name: &str, value: Option<&str>) -> Option<NaiveDate> {
    let raw = value?;
    let parsed = parse_date(raw);
    if parsed.is_none() {
        v.add(name, "Invalid date");
    }
    parsed
}

fn check_status(v: &mut Validator, name: &str, value: Option<&str>) -> Option<InvoiceStatus> {
    let raw = value?;
    match raw.parse::<InvoiceStatus>() {
        Ok(status) => Some(status),
        Err(_) => {
            v.add(name, "Expected 'paid', 'unpaid' or 'overdue'");
            None
        }
    }
}

// Clients

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientPayload {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub company: Option<String>,
    /// Target tenant, read only for system admins
    pub tenant_id: Option<i64>,
}

impl ClientPayload {
    /// Checks a full row, reporting problems under `prefix`.
    pub fn check_new(self, v: &mut Validator, prefix: &str) -> Option<NewClient> {
        let name = v.required(&field(prefix, "name"), self.name.as_deref()).map(str::to_string);
        let email_field = field(prefix, "email");
        let email = v.required(&email_field, self.email.as_deref()).map(str::to_string);
        v.email(&email_field, email.as_deref());

        Some(NewClient {
            name: name?,
            email: email?,
            phone: trimmed(self.phone),
            address: trimmed(self.address),
            company: trimmed(self.company),
        })
    }

    pub fn into_new(self) -> Result<NewClient, ApiError> {
        let mut v = Validator::new();
        let client = self.check_new(&mut v, "");
        v.finish()?;
        client.ok_or_else(|| ApiError::validation_failed(Vec::new()))
    }

    pub fn into_changes(self) -> Result<ClientChanges, ApiError> {
        let mut v = Validator::new();
        v.non_blank("name", self.name.as_deref());
        v.email("email", self.email.as_deref());
        v.finish()?;

        Ok(ClientChanges {
            name: self.name.map(|s| s.trim().to_string()),
            email: self.email.map(|s| s.trim().to_string()),
            phone: self.phone.map(|s| s.trim().to_string()),
            address: self.address.map(|s| s.trim().to_string()),
            company: self.company.map(|s| s.trim().to_string()),
        })
    }
}

// Line items and invoices

#[derive(Debug, Clone, PartialEq)]
pub struct LineDraft {
    pub description: String,
    pub quantity: i64,
    pub unit_price: Decimal,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LineChanges {
    pub description: Option<String>,
    pub quantity: Option<i64>,
    pub unit_price: Option<Decimal>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItemPayload {
    pub description: Option<String>,
    pub quantity: Option<i64>,
    pub unit_price: Option<Decimal>,
}

impl LineItemPayload {
    pub fn check_new(self, v: &mut Validator, prefix: &str) -> Option<LineDraft> {
        let description = v
            .required(&field(prefix, "description"), self.description.as_deref())
            .map(str::to_string);

        let quantity_field = field(prefix, "quantity");
        if self.quantity.is_none() {
            v.add(&quantity_field, "quantity is required");
        }
        v.positive_int(&quantity_field, self.quantity);
        v.max_int(&quantity_field, self.quantity, MAX_QUANTITY);

        let price_field = field(prefix, "unitPrice");
        if self.unit_price.is_none() {
            v.add(&price_field, "unitPrice is required");
        }
        v.non_negative(&price_field, self.unit_price);
        v.max_decimal(&price_field, self.unit_price, MAX_UNIT_PRICE);

        Some(LineDraft {
            description: description?,
            quantity: self.quantity.filter(|q| *q > 0)?,
            unit_price: self.unit_price.filter(|p| *p >= Decimal::ZERO)?,
        })
    }

    pub fn into_new(self) -> Result<LineDraft, ApiError> {
        let mut v = Validator::new();
        let line = self.check_new(&mut v, "");
        v.finish()?;
        line.ok_or_else(|| ApiError::validation_failed(Vec::new()))
    }

    pub fn into_changes(self) -> Result<LineChanges, ApiError> {
        let mut v = Validator::new();
        v.non_blank("description", self.description.as_deref());
        v.positive_int("quantity", self.quantity);
        v.max_int("quantity", self.quantity, MAX_QUANTITY);
        v.non_negative("unitPrice", self.unit_price);
        v.max_decimal("unitPrice", self.unit_price, MAX_UNIT_PRICE);
        v.finish()?;

        Ok(LineChanges {
            description: self.description.map(|s| s.trim().to_string()),
            quantity: self.quantity,
            unit_price: self.unit_price,
        })
    }
}

/// A validated invoice body for create.
#[derive(Debug, Clone, PartialEq)]
pub struct InvoiceDraft {
    pub invoice_number: String,
    pub client_id: Uuid,
    pub status: InvoiceStatus,
    pub date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,
    pub tax_rate: Option<Decimal>,
    pub tax: Option<Decimal>,
    pub discount: Decimal,
    pub notes: Option<String>,
    pub line_items: Vec<LineDraft>,
}

/// A validated invoice body for update. `None` keeps the stored value;
/// `line_items` replaces the whole list when present.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InvoiceChanges {
    pub invoice_number: Option<String>,
    pub client_id: Option<Uuid>,
    pub status: Option<InvoiceStatus>,
    pub date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,
    pub tax_rate: Option<Decimal>,
    pub tax: Option<Decimal>,
    pub discount: Option<Decimal>,
    pub notes: Option<String>,
    pub line_items: Option<Vec<LineDraft>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoicePayload {
    pub invoice_number: Option<String>,
    pub client_id: Option<String>,
    pub tenant_id: Option<i64>,
    pub status: Option<String>,
    pub date: Option<String>,
    pub due_date: Option<String>,
    /// Percent
    pub tax_rate: Option<Decimal>,
    /// Amount; converted to a rate when `taxRate` is absent
    pub tax: Option<Decimal>,
    pub discount: Option<Decimal>,
    pub notes: Option<String>,
    pub line_items: Option<Vec<LineItemPayload>>,
}

impl InvoicePayload {
    fn check_client_id(v: &mut Validator, value: Option<&str>) -> Option<Uuid> {
        let raw = value?;
        match Uuid::parse_str(raw.trim()) {
            Ok(id) => Some(id),
            Err(_) => {
                v.add("clientId", "clientId must be a UUID");
                None
            }
        }
    }

    fn check_lines(v: &mut Validator, lines: Option<Vec<LineItemPayload>>) -> Option<Vec<LineDraft>> {
        let lines = lines?;
        let mut drafts = Vec::with_capacity(lines.len());
        for (index, line) in lines.into_iter().enumerate() {
            if let Some(draft) = line.check_new(v, &format!("lineItems[{index}]")) {
                drafts.push(draft);
            }
        }
        Some(drafts)
    }

    fn check_money(&self, v: &mut Validator) {
        v.non_negative("taxRate", self.tax_rate);
        v.max_decimal("taxRate", self.tax_rate, MAX_TAX_RATE);
        v.non_negative("tax", self.tax);
        v.max_decimal("tax", self.tax, MAX_AMOUNT);
        v.non_negative("discount", self.discount);
        v.max_decimal("discount", self.discount, MAX_AMOUNT);
    }

    pub fn into_draft(self) -> Result<InvoiceDraft, ApiError> {
        let mut v = Validator::new();
        let invoice_number = v
            .required("invoiceNumber", self.invoice_number.as_deref())
            .map(str::to_string);
        if self.client_id.is_none() {
            v.add("clientId", "clientId is required");
        }
        let client_id = Self::check_client_id(&mut v, self.client_id.as_deref());
        let status = check_status(&mut v, "status", self.status.as_deref());
        let date = check_date(&mut v, "date", self.date.as_deref());
        let due_date = check_date(&mut v, "dueDate", self.due_date.as_deref());
        self.check_money(&mut v);
        if self.line_items.is_none() {
            v.add("lineItems", "lineItems is required");
        }
        let line_items = Self::check_lines(&mut v, self.line_items);
        v.finish()?;

        match (invoice_number, client_id, line_items) {
            (Some(invoice_number), Some(client_id), Some(line_items)) => Ok(InvoiceDraft {
                invoice_number,
                client_id,
                status: status.unwrap_or_default(),
                date,
                due_date,
                tax_rate: self.tax_rate,
                tax: self.tax,
                discount: self.discount.unwrap_or(Decimal::ZERO),
                notes: trimmed(self.notes),
                line_items,
            }),
            _ => Err(ApiError::validation_failed(Vec::new())),
        }
    }

    pub fn into_changes(self) -> Result<InvoiceChanges, ApiError> {
        let mut v = Validator::new();
        v.non_blank("invoiceNumber", self.invoice_number.as_deref());
        let client_id = Self::check_client_id(&mut v, self.client_id.as_deref());
        let status = check_status(&mut v, "status", self.status.as_deref());
        let date = check_date(&mut v, "date", self.date.as_deref());
        let due_date = check_date(&mut v, "dueDate", self.due_date.as_deref());
        self.check_money(&mut v);
        let line_items = Self::check_lines(&mut v, self.line_items);
        v.finish()?;

        Ok(InvoiceChanges {
            invoice_number: self.invoice_number.map(|s| s.trim().to_string()),
            client_id,
            status,
            date,
            due_date,
            tax_rate: self.tax_rate,
            tax: self.tax,
            discount: self.discount,
            notes: self.notes.map(|s| s.trim().to_string()),
            line_items,
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MarkStatusPayload {
    pub status: Option<String>,
}

impl MarkStatusPayload {
    pub fn into_status(self) -> Result<InvoiceStatus, ApiError> {
        let mut v = Validator::new();
        if self.status.is_none() {
            v.add("status", "status is required");
        }
        let status = check_status(&mut v, "status", self.status.as_deref());
        v.finish()?;
        status.ok_or_else(|| ApiError::validation_failed(Vec::new()))
    }
}

// Auth and admin

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginPayload {
    pub email: Option<String>,
    pub password: Option<String>,
}

impl LoginPayload {
    /// `(email, password)`
    pub fn into_credentials(self) -> Result<(String, String), ApiError> {
        let mut v = Validator::new();
        let email = v.required("email", self.email.as_deref()).map(str::to_string);
        v.email("email", email.as_deref());
        if self.password.as_deref().map_or(true, str::is_empty) {
            v.add("password", "password is required");
        }
        v.finish()?;

        match (email, self.password) {
            (Some(email), Some(password)) => Ok((email, password)),
            _ => Err(ApiError::validation_failed(Vec::new())),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateTenantPayload {
    pub name: Option<String>,
}

impl CreateTenantPayload {
    pub fn into_name(self) -> Result<String, ApiError> {
        let mut v = Validator::new();
        let name = v.required("name", self.name.as_deref()).map(str::to_string);
        v.finish()?;
        name.ok_or_else(|| ApiError::validation_failed(Vec::new()))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct UserDraft {
    pub email: String,
    pub password: String,
    pub role: Role,
    pub tenant_id: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserPayload {
    pub email: Option<String>,
    pub password: Option<String>,
    pub role: Option<String>,
    pub tenant_id: Option<i64>,
}

impl CreateUserPayload {
    /// Field checks, then the role/tenant pairing rule.
    pub fn into_draft(self) -> Result<UserDraft, ApiError> {
        let mut v = Validator::new();
        let email = v.required("email", self.email.as_deref()).map(str::to_string);
        v.email("email", email.as_deref());
        if self.password.is_none() {
            v.add("password", "password is required");
        }
        v.min_len("password", self.password.as_deref(), MIN_PASSWORD_LEN);
        let role = match self.role.as_deref() {
            None => {
                v.add("role", "role is required");
                None
            }
            Some(raw) => match raw.parse::<Role>() {
                Ok(role) => Some(role),
                Err(_) => {
                    v.add("role", "Expected 'SYSTEM_ADMIN', 'COMPANY_ADMIN' or 'ACCOUNTANT'");
                    None
                }
            },
        };
        v.finish()?;

        let (Some(email), Some(password), Some(role)) = (email, self.password, role) else {
            return Err(ApiError::validation_failed(Vec::new()));
        };

        if role.is_system_admin() && self.tenant_id.is_some() {
            return Err(ApiError::bad_request(
                "SYSTEM_ADMIN users cannot be assigned to a tenant. Set tenantId to null.",
            ));
        }
        if !role.is_system_admin() && self.tenant_id.is_none() {
            return Err(ApiError::bad_request(
                "Non-SYSTEM_ADMIN users must be assigned to a tenant. Provide tenantId.",
            ));
        }

        Ok(UserDraft {
            email,
            password,
            role,
            tenant_id: self.tenant_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn problems(err: ApiError) -> Vec<String> {
        match err {
            ApiError::ValidationFailed { details, .. } => details.into_iter().map(|p| p.field).collect(),
            other => panic!("expected validation failure, got {other:?}"),
        }
    }

    #[test]
    fn client_requires_name_and_valid_email() {
        let payload: ClientPayload = serde_json::from_value(json!({ "email": "bad" })).unwrap();
        assert_eq!(problems(payload.into_new().unwrap_err()), ["name", "email"]);
    }

    #[test]
    fn client_blank_optionals_are_dropped() {
        let payload: ClientPayload =
            serde_json::from_value(json!({ "name": " Acme ", "email": "a@acme.com", "phone": "  " })).unwrap();
        let client = payload.into_new().unwrap();
        assert_eq!(client.name, "Acme");
        assert_eq!(client.phone, None);
    }

    #[test]
    fn invoice_line_problems_are_indexed() {
        let payload: InvoicePayload = serde_json::from_value(json!({
            "invoiceNumber": "INV-1",
            "clientId": Uuid::new_v4().to_string(),
            "lineItems": [
                { "description": "ok", "quantity": 1, "unitPrice": 10 },
                { "description": "", "quantity": 0, "unitPrice": -1 }
            ]
        }))
        .unwrap();
        assert_eq!(
            problems(payload.into_draft().unwrap_err()),
            ["lineItems[1].description", "lineItems[1].quantity", "lineItems[1].unitPrice"]
        );
    }

    #[test]
    fn amounts_above_the_ceilings_are_field_problems() {
        let payload: InvoicePayload = serde_json::from_value(json!({
            "invoiceNumber": "INV-1",
            "clientId": Uuid::new_v4().to_string(),
            "taxRate": 5000,
            "discount": 1e16,
            "lineItems": [
                { "description": "huge", "quantity": 9000000000000000000i64, "unitPrice": 1e10 }
            ]
        }))
        .unwrap();
        assert_eq!(
            problems(payload.into_draft().unwrap_err()),
            ["taxRate", "discount", "lineItems[0].quantity", "lineItems[0].unitPrice"]
        );
    }

    #[test]
    fn invoice_draft_defaults() {
        let client_id = Uuid::new_v4();
        let payload: InvoicePayload = serde_json::from_value(json!({
            "invoiceNumber": "INV-2",
            "clientId": client_id.to_string(),
            "date": "2024-03-01T00:00:00.000Z",
            "total": 999999,
            "lineItems": [{ "description": "Work", "quantity": 2, "unitPrice": 50, "total": 1 }]
        }))
        .unwrap();
        let draft = payload.into_draft().unwrap();
        assert_eq!(draft.client_id, client_id);
        assert_eq!(draft.status, InvoiceStatus::Unpaid);
        assert_eq!(draft.date, NaiveDate::from_ymd_opt(2024, 3, 1));
        assert_eq!(draft.discount, Decimal::ZERO);
        assert_eq!(draft.line_items.len(), 1);
    }

    #[test]
    fn user_role_tenant_pairing() {
        let admin_with_tenant: CreateUserPayload = serde_json::from_value(json!({
            "email": "x@y.com", "password": "secret1", "role": "SYSTEM_ADMIN", "tenantId": 3
        }))
        .unwrap();
        let err = admin_with_tenant.into_draft().unwrap_err();
        assert_eq!(err.message(), "SYSTEM_ADMIN users cannot be assigned to a tenant. Set tenantId to null.");

        let orphan: CreateUserPayload = serde_json::from_value(json!({
            "email": "x@y.com", "password": "secret1", "role": "ACCOUNTANT"
        }))
        .unwrap();
        let err = orphan.into_draft().unwrap_err();
        assert_eq!(err.message(), "Non-SYSTEM_ADMIN users must be assigned to a tenant. Provide tenantId.");
    }

    #[test]
    fn short_password_is_a_field_problem() {
        let payload: CreateUserPayload = serde_json::from_value(json!({
            "email": "x@y.com", "password": "abc", "role": "ACCOUNTANT", "tenantId": 1
        }))
        .unwrap();
        assert_eq!(problems(payload.into_draft().unwrap_err()), ["password"]);
    }

    #[test]
    fn mark_rejects_unknown_status() {
        let payload = MarkStatusPayload { status: Some("void".into()) };
        assert_eq!(problems(payload.into_status().unwrap_err()), ["status"]);
    }
}
