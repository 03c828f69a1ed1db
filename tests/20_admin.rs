mod common;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::json;

use common::{TestServer, ACCOUNTANT_EMAIL, ACCOUNTANT_PASSWORD};

#[tokio::test]
async fn admin_routes_need_system_admin() -> Result<()> {
    let server = TestServer::start().await?;

    let (status, _) = server.anonymous().get("/admin/tenants").await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let accountant = server.login(ACCOUNTANT_EMAIL, ACCOUNTANT_PASSWORD).await?;
    let (status, body) = accountant.get("/admin/tenants").await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "Forbidden - Insufficient permissions");
    Ok(())
}

#[tokio::test]
async fn tenants_are_listed_with_counts() -> Result<()> {
    let server = TestServer::start().await?;
    let admin = server.system_admin().await?;

    let (status, body) = admin.post("/admin/tenants", json!({ "name": "Globex" })).await?;
    assert_eq!(status, StatusCode::CREATED);
    let id = body["tenant"]["id"].as_i64().unwrap();

    let (status, body) = admin.get(&format!("/admin/tenants/{}", id)).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["tenant"]["name"], "Globex");

    let (_, body) = admin.get("/admin/tenants").await?;
    let tenants = body["tenants"].as_array().unwrap();
    assert_eq!(tenants.len(), 2);
    let sample = tenants.iter().find(|t| t["name"] == "Sample Company").unwrap();
    assert_eq!(sample["_count"]["users"], 2);

    let (status, body) = admin.get("/admin/tenants/99999").await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Tenant not found");

    let (status, _) = admin.post("/admin/tenants", json!({ "name": "  " })).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn user_role_and_tenant_must_agree() -> Result<()> {
    let server = TestServer::start().await?;
    let admin = server.system_admin().await?;
    let (_, body) = admin.post("/admin/tenants", json!({ "name": "Initech" })).await?;
    let tenant_id = body["tenant"]["id"].as_i64().unwrap();

    let (status, body) = admin
        .post(
            "/admin/users",
            json!({ "email": "root2@x.test", "password": "secret123", "role": "SYSTEM_ADMIN", "tenantId": tenant_id }),
        )
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "SYSTEM_ADMIN users cannot be assigned to a tenant. Set tenantId to null.");

    let (status, body) = admin
        .post("/admin/users", json!({ "email": "acct@x.test", "password": "secret123", "role": "ACCOUNTANT" }))
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Non-SYSTEM_ADMIN users must be assigned to a tenant. Provide tenantId.");

    let (status, body) = admin
        .post(
            "/admin/users",
            json!({ "email": "acct@x.test", "password": "12345", "role": "ACCOUNTANT", "tenantId": tenant_id }),
        )
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["details"][0]["field"], "password");

    let (status, body) = admin
        .post(
            "/admin/users",
            json!({ "email": "acct@x.test", "password": "123456", "role": "ACCOUNTANT", "tenantId": tenant_id }),
        )
        .await?;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["user"]["tenant"]["name"], "Initech");
    assert!(body["user"].get("passwordHash").is_none());

    let (status, body) = admin
        .post(
            "/admin/users",
            json!({ "email": "acct@x.test", "password": "123456", "role": "ACCOUNTANT", "tenantId": tenant_id }),
        )
        .await?;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "Email already in use");

    let (status, _) = admin
        .post(
            "/admin/users",
            json!({ "email": "ghost@x.test", "password": "123456", "role": "ACCOUNTANT", "tenantId": 99999 }),
        )
        .await?;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, body) = admin.get("/admin/users").await?;
    assert_eq!(body["users"].as_array().unwrap().len(), 4);
    Ok(())
}
