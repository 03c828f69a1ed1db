use std::time::Duration;

use anyhow::{anyhow, Context};
use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::{header, Method, RequestBuilder, Response, StatusCode};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::database::models::{Client, Invoice, UserProfile};
use crate::types::InvoiceStatus;

/// Body for `POST /api/clients` and each row of `POST /api/clients/bulk`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientRequest {
    pub name: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineRequest {
    pub description: String,
    pub quantity: i64,
    pub unit_price: Decimal,
}

/// Body for `POST /api/invoices`. Totals are left to the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceRequest {
    pub invoice_number: String,
    pub client_id: Uuid,
    pub date: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
    pub tax_rate: Decimal,
    pub discount: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub line_items: Vec<LineRequest>,
}

/// The server calls the CLI needs. [`ApiClient`] is the HTTP implementation.
#[async_trait]
pub trait RemoteApi: Send + Sync {
    async fn list_clients(&self) -> anyhow::Result<Vec<Client>>;
    async fn create_client(&self, client: &ClientRequest) -> anyhow::Result<Client>;
    async fn bulk_create_clients(&self, clients: &[ClientRequest]) -> anyhow::Result<u64>;
    async fn delete_client(&self, id: Uuid) -> anyhow::Result<()>;

    async fn list_invoices(&self) -> anyhow::Result<Vec<Invoice>>;
    async fn create_invoice(&self, invoice: &InvoiceRequest) -> anyhow::Result<Invoice>;
    async fn mark_invoice(&self, id: Uuid, status: InvoiceStatus) -> anyhow::Result<Invoice>;
    async fn delete_invoice(&self, id: Uuid) -> anyhow::Result<()>;
}

#[derive(Deserialize)]
struct UserEnvelope {
    user: UserProfile,
}

#[derive(Deserialize)]
struct CountEnvelope {
    count: u64,
}

pub struct ApiClient {
    base_url: String,
    token: Option<String>,
    http: reqwest::Client,
}

impl ApiClient {
    pub fn new(base_url: &str, token: Option<String>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
            http,
        }
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self.http.request(method, format!("{}{}", self.base_url, path));
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Log in and return the session token carried by the cookie.
    pub async fn login(&self, email: &str, password: &str, cookie_name: &str) -> anyhow::Result<(String, UserProfile)> {
        let response = self
            .request(Method::POST, "/auth/login")
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await
            .with_context(|| format!("Cannot reach {}", self.base_url))?;

        let token = session_token(&response, cookie_name);
        let body: UserEnvelope = read_json(response).await?;
        let token = token.ok_or_else(|| anyhow!("Server did not set the '{}' cookie", cookie_name))?;
        Ok((token, body.user))
    }

    pub async fn me(&self) -> anyhow::Result<UserProfile> {
        let body: UserEnvelope = self.send(self.request(Method::GET, "/auth/me")).await?;
        Ok(body.user)
    }

    pub async fn logout(&self) -> anyhow::Result<()> {
        let _: Value = self.send(self.request(Method::POST, "/auth/logout")).await?;
        Ok(())
    }

    async fn send<T: DeserializeOwned>(&self, builder: RequestBuilder) -> anyhow::Result<T> {
        let response = builder
            .send()
            .await
            .with_context(|| format!("Cannot reach {}", self.base_url))?;
        read_json(response).await
    }

    async fn send_empty(&self, builder: RequestBuilder) -> anyhow::Result<()> {
        let response = builder
            .send()
            .await
            .with_context(|| format!("Cannot reach {}", self.base_url))?;
        check_status(response).await.map(|_| ())
    }
}

#[async_trait]
impl RemoteApi for ApiClient {
    async fn list_clients(&self) -> anyhow::Result<Vec<Client>> {
        self.send(self.request(Method::GET, "/api/clients")).await
    }

    async fn create_client(&self, client: &ClientRequest) -> anyhow::Result<Client> {
        self.send(self.request(Method::POST, "/api/clients").json(client)).await
    }

    async fn bulk_create_clients(&self, clients: &[ClientRequest]) -> anyhow::Result<u64> {
        let body: CountEnvelope = self
            .send(self.request(Method::POST, "/api/clients/bulk").json(clients))
            .await?;
        Ok(body.count)
    }

    async fn delete_client(&self, id: Uuid) -> anyhow::Result<()> {
        self.send_empty(self.request(Method::DELETE, &format!("/api/clients/{}", id)))
            .await
    }

    async fn list_invoices(&self) -> anyhow::Result<Vec<Invoice>> {
        self.send(self.request(Method::GET, "/api/invoices")).await
    }

    async fn create_invoice(&self, invoice: &InvoiceRequest) -> anyhow::Result<Invoice> {
        self.send(self.request(Method::POST, "/api/invoices").json(invoice)).await
    }

    async fn mark_invoice(&self, id: Uuid, status: InvoiceStatus) -> anyhow::Result<Invoice> {
        self.send(
            self.request(Method::POST, &format!("/api/invoices/{}/mark", id))
                .json(&json!({ "status": status })),
        )
        .await
    }

    async fn delete_invoice(&self, id: Uuid) -> anyhow::Result<()> {
        self.send_empty(self.request(Method::DELETE, &format!("/api/invoices/{}", id)))
            .await
    }
}

/// Turn a non-2xx response into an error carrying the server's `error` text.
async fn check_status(response: Response) -> anyhow::Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body: Value = response.json().await.unwrap_or(Value::Null);
    let message = body
        .get("error")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("request failed").to_string());

    if status == StatusCode::UNAUTHORIZED {
        return Err(anyhow!("{} ({}). Run `invoicer login` first", message, status.as_u16()));
    }
    Err(anyhow!("{} ({})", message, status.as_u16()))
}

async fn read_json<T: DeserializeOwned>(response: Response) -> anyhow::Result<T> {
    let response = check_status(response).await?;
    response.json().await.context("Unexpected response body")
}

fn session_token(response: &Response, cookie_name: &str) -> Option<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .find_map(|cookie| {
            let pair = cookie.split(';').next()?.trim();
            let (name, value) = pair.split_once('=')?;
            (name == cookie_name && !value.is_empty()).then(|| value.to_string())
        })
}
