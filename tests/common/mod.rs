#![allow(dead_code)]

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use reqwest::{header, Method, StatusCode};
use serde_json::{json, Value};

use invoicer_api::config::{AppConfig, SeedConfig};
use invoicer_api::database::{seed::seed, MemoryStore};
use invoicer_api::{app, AppState};

pub const ADMIN_EMAIL: &str = "admin@system.com";
pub const ADMIN_PASSWORD: &str = "admin123";
pub const SAMPLE_ADMIN_EMAIL: &str = "admin@sample.com";
pub const SAMPLE_ADMIN_PASSWORD: &str = "Admin123!";
pub const ACCOUNTANT_EMAIL: &str = "accountant@sample.com";
pub const ACCOUNTANT_PASSWORD: &str = "Accountant123!";

/// An in-process server on its own port and seeded in-memory store.
///
/// Each test starts its own: the server task lives on the test's runtime.
pub struct TestServer {
    pub port: u16,
    pub base_url: String,
}

impl TestServer {
    pub async fn start() -> Result<Self> {
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let base_url = format!("http://127.0.0.1:{}", port);

        let mut config = AppConfig::development();
        config.server.port = port;
        config.security.jwt_secret = "integration-test-secret".to_string();
        config.seed = SeedConfig::defaults(true);

        let store = MemoryStore::new();
        seed(&store, &config.seed).await?;
        let router = app(AppState::new(Arc::new(store), config));

        let listener = tokio::net::TcpListener::bind(("127.0.0.1", port))
            .await
            .context("failed to bind test port")?;
        tokio::spawn(async move {
            let _ = axum::serve(listener, router).await;
        });

        let server = Self { port, base_url };
        server.wait_ready(Duration::from_secs(10)).await?;
        Ok(server)
    }

    async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let client = reqwest::Client::new();
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if let Ok(resp) = client.get(format!("{}/health", self.base_url)).send().await {
                if resp.status() == StatusCode::OK {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        anyhow::bail!("server did not become ready on {} within {:?}", self.base_url, timeout)
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Unauthenticated caller.
    pub fn anonymous(&self) -> Api {
        Api {
            base_url: self.base_url.clone(),
            token: None,
            http: reqwest::Client::new(),
        }
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<Api> {
        let http = reqwest::Client::new();
        let res = http
            .post(self.url("/auth/login"))
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await?;
        anyhow::ensure!(res.status() == StatusCode::OK, "login for {} failed: {}", email, res.status());

        let token = session_cookie(&res).context("login did not set the session cookie")?;
        Ok(Api {
            base_url: self.base_url.clone(),
            token: Some(token),
            http,
        })
    }

    pub async fn system_admin(&self) -> Result<Api> {
        self.login(ADMIN_EMAIL, ADMIN_PASSWORD).await
    }

    /// Creates a tenant and a company admin inside it, then logs that user in.
    pub async fn tenant_admin(&self, tenant_name: &str) -> Result<(i64, Api)> {
        let admin = self.system_admin().await?;
        let (status, body) = admin.post("/admin/tenants", json!({ "name": tenant_name })).await?;
        anyhow::ensure!(status == StatusCode::CREATED, "tenant create failed: {} {}", status, body);
        let tenant_id = body["tenant"]["id"].as_i64().context("tenant id")?;

        let email = format!("owner@{}.test", tenant_name.to_lowercase().replace(' ', "-"));
        let (status, body) = admin
            .post(
                "/admin/users",
                json!({ "email": email, "password": "secret123", "role": "COMPANY_ADMIN", "tenantId": tenant_id }),
            )
            .await?;
        anyhow::ensure!(status == StatusCode::CREATED, "user create failed: {} {}", status, body);

        Ok((tenant_id, self.login(&email, "secret123").await?))
    }
}

/// Value of the `token` cookie from a response's `Set-Cookie` headers.
pub fn session_cookie(res: &reqwest::Response) -> Option<String> {
    res.headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find_map(|cookie| {
            let pair = cookie.split(';').next()?.trim();
            let value = pair.strip_prefix("token=")?;
            (!value.is_empty()).then(|| value.to_string())
        })
}

/// A caller holding a bearer token. Every helper returns the status and JSON body.
pub struct Api {
    pub base_url: String,
    pub token: Option<String>,
    http: reqwest::Client,
}

impl Api {
    pub async fn send(&self, method: Method, path: &str, body: Option<Value>) -> Result<(StatusCode, Value)> {
        let mut req = self.http.request(method, format!("{}{}", self.base_url, path));
        if let Some(token) = &self.token {
            req = req.bearer_auth(token);
        }
        if let Some(body) = body {
            req = req.json(&body);
        }

        let res = req.send().await?;
        let status = res.status();
        let text = res.text().await?;
        let value = if text.is_empty() { Value::Null } else { serde_json::from_str(&text)? };
        Ok((status, value))
    }

    pub async fn get(&self, path: &str) -> Result<(StatusCode, Value)> {
        self.send(Method::GET, path, None).await
    }

    pub async fn post(&self, path: &str, body: Value) -> Result<(StatusCode, Value)> {
        self.send(Method::POST, path, Some(body)).await
    }

    pub async fn put(&self, path: &str, body: Value) -> Result<(StatusCode, Value)> {
        self.send(Method::PUT, path, Some(body)).await
    }

    pub async fn delete(&self, path: &str) -> Result<(StatusCode, Value)> {
        self.send(Method::DELETE, path, None).await
    }

    /// Creates a client and returns its id.
    pub async fn create_client(&self, name: &str, email: &str) -> Result<String> {
        let (status, body) = self.post("/api/clients", json!({ "name": name, "email": email })).await?;
        anyhow::ensure!(status == StatusCode::CREATED, "client create failed: {} {}", status, body);
        body["id"].as_str().map(str::to_string).context("client id")
    }
}

/// The reference invoice: two lines totalling 130, 10% tax, 5 off.
pub fn reference_invoice(number: &str, client_id: &str) -> Value {
    json!({
        "invoiceNumber": number,
        "clientId": client_id,
        "date": "2024-01-10",
        "taxRate": 10,
        "discount": 5,
        "lineItems": [
            { "description": "Design", "quantity": 2, "unitPrice": 50 },
            { "description": "Hosting", "quantity": 1, "unitPrice": 30 }
        ]
    })
}
