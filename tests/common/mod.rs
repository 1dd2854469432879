//! Shared utilities for integration tests.

use std::net::SocketAddr;

use axum::{
    body::Body,
    http::Request,
    middleware,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use edge_governor::config::{GatewayConfig, Mode};
use edge_governor::http::{governor_middleware, GovernorState, TenantContext};
use edge_governor::security::RateLimiter;
use tokio::net::TcpListener;

/// Echoes the path and query it received, plus what the governor attached.
async fn echo(request: Request<Body>) -> Response {
    let tenant = request
        .extensions()
        .get::<TenantContext>()
        .map(|t| t.tenant.clone())
        .unwrap_or_default();
    let forwarded_host = request
        .headers()
        .get("x-forwarded-host")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    let body = request
        .uri()
        .path_and_query()
        .map(|pq| pq.to_string())
        .unwrap_or_default();

    (
        [("x-seen-tenant", tenant), ("x-seen-forwarded-host", forwarded_host)],
        body,
    )
        .into_response()
}

/// An echo app behind the governor, for driving with `oneshot`.
pub fn governed_app(config: &GatewayConfig) -> (Router, GovernorState) {
    let state = GovernorState::new(config, RateLimiter::in_memory());
    let app = Router::new()
        .fallback(echo)
        .layer(middleware::from_fn_with_state(state.clone(), governor_middleware));
    (app, state)
}

#[allow(dead_code)]
pub fn production() -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.governor.mode = Mode::Production;
    config
}

/// A request as a browser behind a proxy would send it.
#[allow(dead_code)]
pub fn request(host: &str, path: &str, client_ip: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(path).header("host", host);
    if let Some(ip) = client_ip {
        builder = builder.header("x-forwarded-for", ip);
    }
    builder.body(Body::empty()).unwrap()
}

/// Start an upstream application that echoes requests and answers `/api/health`.
#[allow(dead_code)]
pub async fn start_mock_upstream() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = Router::new()
        .route("/api/health", get(|| async { "ok" }))
        .fallback(echo);

    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    addr
}
