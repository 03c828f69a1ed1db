mod common;

use anyhow::Result;
use reqwest::{header, StatusCode};
use serde_json::json;

use common::{TestServer, ADMIN_EMAIL, ADMIN_PASSWORD, SAMPLE_ADMIN_EMAIL};

#[tokio::test]
async fn health_and_root_are_public() -> Result<()> {
    let server = TestServer::start().await?;
    let api = server.anonymous();

    let (status, body) = api.get("/health").await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["store"], "memory");

    let (status, body) = api.get("/").await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Invoicer API");
    Ok(())
}

#[tokio::test]
async fn login_sets_http_only_cookie_and_hides_hash() -> Result<()> {
    let server = TestServer::start().await?;
    let res = reqwest::Client::new()
        .post(server.url("/auth/login"))
        .json(&json!({ "email": ADMIN_EMAIL, "password": ADMIN_PASSWORD }))
        .send()
        .await?;

    assert_eq!(res.status(), StatusCode::OK);
    let cookie = res
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    assert!(cookie.starts_with("token="));
    assert!(cookie.contains("HttpOnly"));

    let body: serde_json::Value = res.json().await?;
    assert_eq!(body["user"]["email"], ADMIN_EMAIL);
    assert_eq!(body["user"]["role"], "SYSTEM_ADMIN");
    assert!(body["user"].get("passwordHash").is_none());
    assert!(body["user"].get("password").is_none());
    Ok(())
}

#[tokio::test]
async fn wrong_password_is_401_without_cookie() -> Result<()> {
    let server = TestServer::start().await?;
    let res = reqwest::Client::new()
        .post(server.url("/auth/login"))
        .json(&json!({ "email": ADMIN_EMAIL, "password": "nope" }))
        .send()
        .await?;

    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert!(res.headers().get(header::SET_COOKIE).is_none());
    let body: serde_json::Value = res.json().await?;
    assert_eq!(body["error"], "Invalid credentials");

    // Unknown email reads the same
    let (status, body) = server
        .anonymous()
        .post("/auth/login", json!({ "email": "ghost@nowhere.test", "password": "nope" }))
        .await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Invalid credentials");
    Ok(())
}

#[tokio::test]
async fn login_requires_both_fields() -> Result<()> {
    let server = TestServer::start().await?;
    let (status, body) = server.anonymous().post("/auth/login", json!({ "email": ADMIN_EMAIL })).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
    Ok(())
}

#[tokio::test]
async fn me_accepts_cookie_or_bearer() -> Result<()> {
    let server = TestServer::start().await?;

    let (status, _) = server.anonymous().get("/auth/me").await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let api = server.login(SAMPLE_ADMIN_EMAIL, common::SAMPLE_ADMIN_PASSWORD).await?;
    let (status, body) = api.get("/auth/me").await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["email"], SAMPLE_ADMIN_EMAIL);
    assert_eq!(body["user"]["tenant"]["name"], "Sample Company");

    let token = api.token.clone().unwrap_or_default();
    let res = reqwest::Client::new()
        .get(server.url("/auth/me"))
        .header(header::COOKIE, format!("token={}", token))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);

    let res = reqwest::Client::new()
        .get(server.url("/auth/me"))
        .bearer_auth("not-a-jwt")
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn logout_expires_the_cookie() -> Result<()> {
    let server = TestServer::start().await?;
    let res = reqwest::Client::new().post(server.url("/auth/logout")).send().await?;

    assert_eq!(res.status(), StatusCode::OK);
    let cookie = res
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    assert!(cookie.starts_with("token=;"));
    assert!(cookie.contains("Max-Age=0"));

    let body: serde_json::Value = res.json().await?;
    assert_eq!(body["message"], "Logged out successfully");
    Ok(())
}

#[tokio::test]
async fn malformed_json_is_a_400_with_error_body() -> Result<()> {
    let server = TestServer::start().await?;
    let res = reqwest::Client::new()
        .post(server.url("/auth/login"))
        .header(header::CONTENT_TYPE, "application/json")
        .body("{ not json")
        .send()
        .await?;

    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = res.json().await?;
    assert!(body["error"].is_string());
    Ok(())
}
