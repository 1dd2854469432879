//! End-to-end tests: client → gateway → mock upstream.

use std::net::SocketAddr;
use std::time::Duration;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use edge_governor::admin::setup_admin_router;
use edge_governor::config::GatewayConfig;
use edge_governor::http::HttpServer;
use edge_governor::lifecycle::Shutdown;
use serde_json::Value;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tower::ServiceExt;

mod common;

async fn start_gateway(config: GatewayConfig) -> (SocketAddr, Shutdown) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let rx = shutdown.subscribe();
    let (_updates_tx, updates) = mpsc::unbounded_channel();
    let server = HttpServer::new(config);
    tokio::spawn(async move {
        let _ = server.run(listener, updates, rx).await;
    });
    tokio::time::sleep(Duration::from_millis(100)).await;

    (addr, shutdown)
}

fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .no_proxy()
        .build()
        .unwrap()
}

fn gateway_config(upstream: SocketAddr) -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.upstream.address = upstream.to_string();
    config.health_check.interval_secs = 1;
    config.health_check.timeout_secs = 1;
    config.observability.metrics_enabled = false;
    config
}

#[tokio::test]
async fn test_tenant_request_reaches_upstream_rewritten() {
    let upstream = common::start_mock_upstream().await;
    let (gateway, shutdown) = start_gateway(gateway_config(upstream)).await;

    let res = client()
        .get(format!("http://{}/dashboard?tab=open", gateway))
        .header("host", "acme.example.org")
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers()["x-seen-forwarded-host"], "acme.example.org");
    assert!(res.headers().contains_key("x-request-id"));
    assert_eq!(res.text().await.unwrap(), "/subdomains/acme/dashboard?tab=open");

    shutdown.trigger();
}

#[tokio::test]
async fn test_plain_host_is_forwarded_and_decorated() {
    let upstream = common::start_mock_upstream().await;
    let (gateway, shutdown) = start_gateway(gateway_config(upstream)).await;

    let res = client()
        .get(format!("http://{}/api/leads", gateway))
        .header("host", "localhost:3000")
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers()["access-control-allow-origin"], "http://localhost:3000");
    assert_eq!(res.headers()["x-frame-options"], "DENY");
    assert_eq!(res.headers()["x-subdomain"], "none");
    assert_eq!(res.text().await.unwrap(), "/api/leads");

    shutdown.trigger();
}

#[tokio::test]
async fn test_www_redirect_does_not_reach_upstream() {
    // Nothing listens on the upstream port: a forwarded request would 502.
    let (gateway, shutdown) = start_gateway(gateway_config("127.0.0.1:1".parse().unwrap())).await;

    let res = client()
        .get(format!("http://{}/leads", gateway))
        .header("host", "www.example.org")
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::MOVED_PERMANENTLY);
    assert_eq!(res.headers()["location"], "https://example.org/leads");

    shutdown.trigger();
}

#[tokio::test]
async fn test_unreachable_upstream_returns_502() {
    let (gateway, shutdown) = start_gateway(gateway_config("127.0.0.1:1".parse().unwrap())).await;

    let res = client()
        .get(format!("http://{}/dashboard", gateway))
        .header("host", "example.org")
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::BAD_GATEWAY);

    shutdown.trigger();
}

#[tokio::test]
async fn test_gateway_health_and_events() {
    let upstream = common::start_mock_upstream().await;
    let (gateway, shutdown) = start_gateway(gateway_config(upstream)).await;

    let health: Value = client()
        .get(format!("http://{}/_governor/health", gateway))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(health["status"], "ok");
    assert_eq!(health["mode"], "development");

    let mut res = client()
        .get(format!("http://{}/_governor/events", gateway))
        .send()
        .await
        .unwrap();
    assert_eq!(res.headers()["content-type"], "text/event-stream");

    let received = tokio::time::timeout(Duration::from_secs(5), async {
        let mut buf = String::new();
        while let Some(chunk) = res.chunk().await.unwrap() {
            buf.push_str(&String::from_utf8_lossy(&chunk));
            if buf.contains("\"status\":\"healthy\"") {
                break;
            }
        }
        buf
    })
    .await
    .expect("no health event within 5s");

    assert!(received.contains("event: health"));
    assert!(received.contains(&upstream.to_string()));

    shutdown.trigger();
}

#[tokio::test]
async fn test_admin_api_inspects_and_resets_windows() {
    let mut config = common::production();
    config.admin.api_key = "test-key".to_string();
    config.observability.metrics_enabled = false;
    let server = HttpServer::new(config);

    let policy = edge_governor::security::RateLimitPolicy::from(&server.config().rate_limit);
    let limiter = server.state().governor.limiter().clone();
    limiter.check_and_consume("203.0.113.5", policy);
    limiter.check_and_consume("203.0.113.5", policy);
    limiter.check_and_consume("198.51.100.7", policy);

    let admin = setup_admin_router(server.state().clone());
    let call = |method: &str, uri: &str, key: Option<&str>| {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(key) = key {
            builder = builder.header("authorization", format!("Bearer {}", key));
        }
        builder.body(Body::empty()).unwrap()
    };

    let res = admin.clone().oneshot(call("GET", "/admin/status", None)).await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let res = admin
        .clone()
        .oneshot(call("GET", "/admin/status", Some("wrong")))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = admin
        .clone()
        .oneshot(call("GET", "/admin/status", Some("test-key")))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let status: Value =
        serde_json::from_slice(&to_bytes(res.into_body(), usize::MAX).await.unwrap()).unwrap();
    assert_eq!(status["mode"], "production");
    assert_eq!(status["rate_table_size"], 2);

    let res = admin
        .clone()
        .oneshot(call("GET", "/admin/rate-limits/203.0.113.5", Some("test-key")))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let window: Value =
        serde_json::from_slice(&to_bytes(res.into_body(), usize::MAX).await.unwrap()).unwrap();
    assert_eq!(window["count"], 2);
    assert_eq!(window["remaining"], 98);

    let res = admin
        .clone()
        .oneshot(call("DELETE", "/admin/rate-limits/203.0.113.5", Some("test-key")))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NO_CONTENT);
    let res = admin
        .clone()
        .oneshot(call("GET", "/admin/rate-limits/203.0.113.5", Some("test-key")))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = admin
        .clone()
        .oneshot(call("DELETE", "/admin/rate-limits", Some("test-key")))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NO_CONTENT);
    assert!(limiter.store().is_empty());
}
