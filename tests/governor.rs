//! Governor behavior driven through an axum router.

use axum::body::to_bytes;
use axum::http::{header, StatusCode};
use axum::Router;
use edge_governor::config::{GatewayConfig, Mode};
use edge_governor::http::request::UNKNOWN_CLIENT;
use tower::ServiceExt;

mod common;

const SECURITY_HEADERS: [&str; 6] = [
    "x-frame-options",
    "x-content-type-options",
    "strict-transport-security",
    "x-xss-protection",
    "referrer-policy",
    "permissions-policy",
];

async fn body_string(response: axum::response::Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

async fn send(app: &Router, host: &str, path: &str, ip: Option<&str>) -> axum::response::Response {
    app.clone()
        .oneshot(common::request(host, path, ip))
        .await
        .unwrap()
}

#[tokio::test]
async fn test_tenant_host_is_rewritten() {
    let (app, _) = common::governed_app(&GatewayConfig::default());

    let response = send(&app, "acme.example.org", "/dashboard", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["x-seen-tenant"], "acme");
    assert!(!response.headers().contains_key("x-frame-options"));
    assert_eq!(body_string(response).await, "/subdomains/acme/dashboard");

    let response = send(&app, "acme.example.org", "/leads?status=hot&page=2", None).await;
    assert_eq!(body_string(response).await, "/subdomains/acme/leads?status=hot&page=2");
}

#[tokio::test]
async fn test_malformed_tenant_label_is_not_rewritten() {
    let (app, _) = common::governed_app(&GatewayConfig::default());

    for host in [
        "acme?admin=1.example.org",
        "acme#x.example.org",
        "acme/../../internal.example.org",
    ] {
        let response = send(&app, host, "/dashboard?tab=open", None).await;
        assert_eq!(response.status(), StatusCode::OK, "{}", host);
        assert_eq!(response.headers()["x-seen-tenant"], "", "{}", host);
        assert_eq!(response.headers()["x-subdomain"], "none", "{}", host);
        assert_eq!(body_string(response).await, "/dashboard?tab=open", "{}", host);
    }
}

#[tokio::test]
async fn test_www_redirects_permanently() {
    let (app, _) = common::governed_app(&GatewayConfig::default());

    let response = send(&app, "www.example.org", "/leads", None).await;
    assert_eq!(response.status(), StatusCode::MOVED_PERMANENTLY);
    assert_eq!(response.headers()[header::LOCATION], "https://example.org/leads");

    let response = send(&app, "www.example.org", "/offers?id=7", None).await;
    assert_eq!(response.headers()[header::LOCATION], "https://example.org/offers?id=7");
}

#[tokio::test]
async fn test_redirect_keeps_forwarded_scheme_and_port() {
    let (app, _) = common::governed_app(&GatewayConfig::default());
    let request = axum::http::Request::builder()
        .uri("/tasks")
        .header("host", "www.example.org:8080")
        .header("x-forwarded-proto", "http")
        .body(axum::body::Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.headers()[header::LOCATION], "http://example.org:8080/tasks");
}

#[tokio::test]
async fn test_production_budget_then_429() {
    let (app, _) = common::governed_app(&common::production());

    let mut last_remaining = u32::MAX;
    for i in 1..=100u32 {
        let response = send(&app, "example.org", "/api/leads", Some("203.0.113.5")).await;
        assert_eq!(response.status(), StatusCode::OK, "request {} should pass", i);

        let remaining: u32 = response.headers()["x-ratelimit-remaining"]
            .to_str()
            .unwrap()
            .parse()
            .unwrap();
        assert_eq!(remaining, 100 - i);
        assert!(remaining < last_remaining);
        last_remaining = remaining;
        assert_eq!(response.headers()["x-ratelimit-limit"], "100");
        assert!(response.headers().contains_key("x-ratelimit-reset"));
    }

    let response = send(&app, "example.org", "/api/leads", Some("203.0.113.5")).await;
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(response.headers()[header::RETRY_AFTER], "60");
    assert_eq!(response.headers()["x-ratelimit-remaining"], "0");

    // Another client still has its own budget.
    let response = send(&app, "example.org", "/api/leads", Some("198.51.100.7")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["x-ratelimit-remaining"], "99");
}

#[tokio::test]
async fn test_login_and_signup_paths_are_limited() {
    let mut config = common::production();
    config.rate_limit.max_requests = 1;
    let (app, _) = common::governed_app(&config);

    for path in ["/login", "/auth/callback", "/team/signup"] {
        let ip = Some("192.0.2.10");
        assert_eq!(send(&app, "example.org", path, ip).await.status(), StatusCode::OK, "{}", path);
    }
    let response = send(&app, "example.org", "/dashboard", Some("192.0.2.10")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(!response.headers().contains_key("x-ratelimit-remaining"));

    let response = send(&app, "example.org", "/login", Some("192.0.2.10")).await;
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn test_development_mode_never_limits() {
    let (app, state) = common::governed_app(&GatewayConfig::default());

    for _ in 0..150 {
        let response = send(&app, "example.org", "/api/leads", Some("203.0.113.5")).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(!response.headers().contains_key("x-ratelimit-remaining"));
    }
    assert!(state.limiter().store().is_empty());
}

#[tokio::test]
async fn test_clients_without_identity_share_a_budget() {
    let mut config = common::production();
    config.rate_limit.max_requests = 2;
    let (app, state) = common::governed_app(&config);

    assert_eq!(send(&app, "example.org", "/api/a", None).await.status(), StatusCode::OK);
    assert_eq!(send(&app, "example.org", "/api/b", None).await.status(), StatusCode::OK);
    assert_eq!(
        send(&app, "example.org", "/api/c", None).await.status(),
        StatusCode::TOO_MANY_REQUESTS
    );
    assert_eq!(state.limiter().store().get(UNKNOWN_CLIENT).map(|r| r.count), Some(3));
}

#[tokio::test]
async fn test_localhost_passes_through_with_cors_echo() {
    let (app, _) = common::governed_app(&GatewayConfig::default());

    let response = send(&app, "localhost:3000", "/api/leads", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let headers = response.headers();
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "http://localhost:3000");
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_CREDENTIALS], "true");
    assert_eq!(headers["x-hostname"], "localhost:3000");
    assert_eq!(headers["x-subdomain"], "none");
    assert_eq!(headers["x-seen-tenant"], "");
    assert_eq!(body_string(response).await, "/api/leads");
}

#[tokio::test]
async fn test_security_headers_in_both_modes() {
    for mode in [Mode::Development, Mode::Production] {
        let mut config = GatewayConfig::default();
        config.governor.mode = mode;
        let (app, _) = common::governed_app(&config);

        let response = send(&app, "example.org", "/dashboard", None).await;
        assert_eq!(response.status(), StatusCode::OK);
        for name in SECURITY_HEADERS {
            assert!(response.headers().contains_key(name), "{} missing in {:?}", name, mode);
        }
        assert_eq!(
            response.headers().contains_key(header::CONTENT_SECURITY_POLICY),
            mode == Mode::Production
        );
        assert!(!response.headers().contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN));
    }
}

#[tokio::test]
async fn test_cors_origin_for_preview_and_unknown_hosts() {
    let (app, _) = common::governed_app(&GatewayConfig::default());

    let response = send(&app, "crm-git-offers-team.vercel.app", "/api/offers", None).await;
    assert_eq!(
        response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "https://crm-git-offers-team.vercel.app"
    );

    let response = send(&app, "crm-example.net", "/api/offers", None).await;
    assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "https://example.org");

    let response = send(&app, "example.org", "/api/offers", None).await;
    assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "https://example.org");
}

#[tokio::test]
async fn test_reload_switches_mode() {
    let (app, state) = common::governed_app(&GatewayConfig::default());

    let response = send(&app, "example.org", "/dashboard", None).await;
    assert!(!response.headers().contains_key(header::CONTENT_SECURITY_POLICY));

    state.reload(&common::production());

    let response = send(&app, "example.org", "/dashboard", None).await;
    assert!(response.headers().contains_key(header::CONTENT_SECURITY_POLICY));
    let response = send(&app, "example.org", "/api/leads", Some("203.0.113.9")).await;
    assert_eq!(response.headers()["x-ratelimit-remaining"], "99");
}
