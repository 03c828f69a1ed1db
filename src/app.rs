use std::sync::Arc;

use axum::{
    http::{header, HeaderValue, Method},
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post, put},
    Router,
};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    limit::RequestBodyLimitLayer,
    trace::TraceLayer,
};
use tracing::warn;

use crate::config::AppConfig;
use crate::database::Store;
use crate::handlers::{elevated, protected, public};
use crate::middleware::{jwt_auth_middleware, system_admin_middleware, tenant_middleware};

/// Shared by every handler. Built once in `main` (or a test harness).
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, config: AppConfig) -> Self {
        Self {
            store,
            config: Arc::new(config),
        }
    }
}

pub fn app(state: AppState) -> Router {
    let body_limit = state.config.api.max_request_size_bytes;
    let cors = cors_layer(&state.config.security.cors_origins);

    Router::new()
        // Public
        .route("/", get(public::system::root))
        .route("/health", get(public::system::health))
        .route("/auth/login", post(public::auth::login))
        .route("/auth/logout", post(public::auth::logout))
        // Protected
        .merge(session_routes(&state))
        .merge(api_routes(&state))
        // Elevated
        .merge(admin_routes(&state))
        // Global middleware
        .layer(RequestBodyLimitLayer::new(body_limit))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn session_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/auth/me", get(protected::auth::me))
        .route_layer(from_fn_with_state(state.clone(), jwt_auth_middleware))
}

fn api_routes(state: &AppState) -> Router<AppState> {
    use protected::{clients, dashboard, invoices, line_items};

    Router::new()
        .route("/api/dashboard", get(dashboard::summary))
        .route("/api/clients", get(clients::list).post(clients::create))
        .route("/api/clients/bulk", post(clients::bulk))
        .route(
            "/api/clients/:id",
            get(clients::get).put(clients::update).delete(clients::delete),
        )
        .route("/api/invoices", get(invoices::list).post(invoices::create))
        .route(
            "/api/invoices/:id",
            get(invoices::get).put(invoices::update).delete(invoices::delete),
        )
        .route("/api/invoices/:id/mark", post(invoices::mark))
        .route(
            "/api/invoices/:id/line-items",
            get(line_items::list).post(line_items::create),
        )
        .route(
            "/api/invoices/:id/line-items/:line_item_id",
            put(line_items::update).delete(line_items::delete),
        )
        // Layers run bottom-up: authenticate, then require a tenant
        .route_layer(from_fn(tenant_middleware))
        .route_layer(from_fn_with_state(state.clone(), jwt_auth_middleware))
}

fn admin_routes(state: &AppState) -> Router<AppState> {
    use elevated::{tenants, users};

    Router::new()
        .route("/admin/tenants", get(tenants::list).post(tenants::create))
        .route("/admin/tenants/:id", get(tenants::get))
        .route("/admin/users", get(users::list).post(users::create))
        .route_layer(from_fn(system_admin_middleware))
        .route_layer(from_fn_with_state(state.clone(), jwt_auth_middleware))
}

/// Credentialed CORS for the configured origins; unparsable entries are skipped.
fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin '{}'", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::MemoryStore;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    fn router() -> Router {
        let mut config = AppConfig::development();
        config.security.cors_origins = vec!["http://localhost:3000".into(), "not a header\n".into()];
        app(AppState::new(Arc::new(MemoryStore::new()), config))
    }

    #[tokio::test]
    async fn health_reports_backend() {
        let res = router()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);

        let body = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["store"], "memory");
    }

    #[tokio::test]
    async fn api_and_admin_routes_need_a_token() {
        for path in ["/api/clients", "/api/dashboard", "/admin/tenants", "/auth/me"] {
            let res = router()
                .oneshot(Request::get(path).body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(res.status(), StatusCode::UNAUTHORIZED, "{path}");
        }
    }

    #[tokio::test]
    async fn cors_allows_only_configured_origins() {
        let preflight = |origin: &'static str| {
            Request::builder()
                .method(Method::OPTIONS)
                .uri("/api/clients")
                .header(header::ORIGIN, origin)
                .header(header::ACCESS_CONTROL_REQUEST_METHOD, "GET")
                .body(Body::empty())
                .unwrap()
        };

        let res = router().oneshot(preflight("http://localhost:3000")).await.unwrap();
        assert_eq!(
            res.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
            "http://localhost:3000"
        );
        assert_eq!(res.headers().get(header::ACCESS_CONTROL_ALLOW_CREDENTIALS).unwrap(), "true");

        let res = router().oneshot(preflight("http://evil.test")).await.unwrap();
        assert!(res.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).is_none());
    }
}
