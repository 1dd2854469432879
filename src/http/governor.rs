//! Edge request governor.
//!
//! Every inbound request ends in exactly one terminal outcome:
//!
//! ```text
//! resolve client + tenant
//!     → production && rate-limited path? ── over budget ──▶ Reject (429)
//!     → tenant present, not reserved     ──────────────────▶ Rewrite (/subdomains/<tenant>/...)
//!     → tenant == reserved ("www")       ──────────────────▶ Redirect (301, bare host)
//!     → otherwise                        ──────────────────▶ PassThrough (+ decoration)
//! ```
//!
//! Pass-through responses carry the security headers, CORS headers on API
//! paths, diagnostic headers and rate-limit accounting. Rewrites and
//! redirects are returned as the next handler / redirect produces them.

use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;

use arc_swap::ArcSwap;
use axum::{
    body::Body,
    extract::State,
    http::{header, uri::PathAndQuery, HeaderMap, HeaderName, HeaderValue, Request, StatusCode, Uri},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::config::GatewayConfig;
use crate::http::request::{client_identity, forwarded_proto, peer_addr, request_host};
use crate::observability::metrics;
use crate::routing::{AnyMatcher, Matcher, SubdomainResolver};
use crate::security::{CorsPolicy, RateLimitDecision, RateLimitPolicy, RateLimiter, SecurityHeaders};

pub const X_HOSTNAME: HeaderName = HeaderName::from_static("x-hostname");
pub const X_SUBDOMAIN: HeaderName = HeaderName::from_static("x-subdomain");
pub const X_RATELIMIT_LIMIT: HeaderName = HeaderName::from_static("x-ratelimit-limit");
pub const X_RATELIMIT_REMAINING: HeaderName = HeaderName::from_static("x-ratelimit-remaining");
pub const X_RATELIMIT_RESET: HeaderName = HeaderName::from_static("x-ratelimit-reset");

/// Tenant attached to rewritten requests for downstream handlers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TenantContext {
    pub tenant: String,
}

/// Terminal outcome of governing one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// Over budget on a rate-limited path.
    Reject { decision: RateLimitDecision },
    /// Forward under the tenant route segment.
    Rewrite { tenant: String, path_and_query: String },
    /// Permanent redirect to the bare host.
    Redirect { location: String },
    /// Forward unchanged and decorate the response.
    PassThrough { rate_limit: Option<RateLimitDecision> },
}

impl Verdict {
    /// Label used in logs and metrics.
    pub fn outcome(&self) -> &'static str {
        match self {
            Verdict::Reject { .. } => "reject",
            Verdict::Rewrite { .. } => "rewrite",
            Verdict::Redirect { .. } => "redirect",
            Verdict::PassThrough { .. } => "pass_through",
        }
    }
}

/// What the governor needs to know about a request.
#[derive(Debug, Clone, Copy)]
pub struct RequestFacts<'a> {
    pub host: &'a str,
    pub path: &'a str,
    pub query: Option<&'a str>,
    pub client: &'a str,
    pub scheme: &'a str,
}

/// Everything compiled from one configuration snapshot.
#[derive(Debug)]
pub struct GovernorPolicy {
    config: GatewayConfig,
    subdomains: SubdomainResolver,
    rate_limited: AnyMatcher,
    rate_limit: RateLimitPolicy,
    cors: CorsPolicy,
    security: SecurityHeaders,
}

impl GovernorPolicy {
    pub fn compile(config: &GatewayConfig) -> Self {
        let governor = &config.governor;
        let csp = config
            .is_production()
            .then_some(governor.content_security_policy.as_str());

        Self {
            config: config.clone(),
            subdomains: SubdomainResolver::new(governor.preview_suffix.as_str()),
            rate_limited: AnyMatcher::rate_limited(&config.rate_limit),
            rate_limit: RateLimitPolicy::from(&config.rate_limit),
            cors: CorsPolicy::new(&config.cors, &governor.preview_suffix),
            security: SecurityHeaders::new(csp),
        }
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    pub fn rate_limit(&self) -> RateLimitPolicy {
        self.rate_limit
    }

    pub fn resolve_tenant(&self, host: &str) -> Option<String> {
        self.subdomains.resolve(host)
    }

    /// Rate limiting applies in production, when enabled, on matching paths.
    pub fn is_rate_limited(&self, path: &str) -> bool {
        self.config.is_production() && self.config.rate_limit.enabled && self.rate_limited.matches(path)
    }

    /// Decide the terminal outcome. Consumes rate budget when the path is limited.
    pub fn evaluate(&self, facts: &RequestFacts<'_>, limiter: &RateLimiter, now: Instant) -> Verdict {
        let tenant = self.resolve_tenant(facts.host);

        let rate_limit = if self.is_rate_limited(facts.path) {
            let decision = limiter.check_and_consume_at(facts.client, self.rate_limit, now);
            if !decision.allowed {
                return Verdict::Reject { decision };
            }
            Some(decision)
        } else {
            None
        };

        let reserved = self.config.governor.reserved_label.as_str();
        match tenant {
            Some(tenant) if tenant == reserved => {
                let bare = facts
                    .host
                    .strip_prefix(reserved)
                    .and_then(|rest| rest.strip_prefix('.'))
                    .unwrap_or(facts.host);
                Verdict::Redirect {
                    location: format!("{}://{}{}", facts.scheme, bare, with_query(facts.path, facts.query)),
                }
            }
            Some(tenant) => {
                let prefix = self.config.governor.tenant_route_prefix.trim_end_matches('/');
                let path = format!("{}/{}{}", prefix, tenant, facts.path);
                Verdict::Rewrite {
                    path_and_query: with_query(&path, facts.query),
                    tenant,
                }
            }
            None => Verdict::PassThrough { rate_limit },
        }
    }

    /// Decorate a pass-through response.
    pub fn decorate(&self, headers: &mut HeaderMap, facts: &RequestFacts<'_>, rate_limit: Option<&RateLimitDecision>) {
        self.security.apply(headers);

        if facts.path.starts_with(&self.config.governor.api_prefix) {
            self.cors.apply(headers, facts.host);
        }

        if self.config.governor.diagnostic_headers {
            if let Ok(host) = HeaderValue::from_str(facts.host) {
                headers.insert(X_HOSTNAME, host);
            }
            let tenant = self.resolve_tenant(facts.host);
            let tenant = tenant.as_deref().unwrap_or("none");
            if let Ok(tenant) = HeaderValue::from_str(tenant) {
                headers.insert(X_SUBDOMAIN, tenant);
            }
        }

        if let Some(decision) = rate_limit {
            insert_rate_limit_headers(headers, decision);
        }
    }
}

fn with_query(path: &str, query: Option<&str>) -> String {
    match query {
        Some(q) if !q.is_empty() => format!("{}?{}", path, q),
        _ => path.to_string(),
    }
}

fn insert_rate_limit_headers(headers: &mut HeaderMap, decision: &RateLimitDecision) {
    headers.insert(X_RATELIMIT_LIMIT, HeaderValue::from(decision.limit));
    headers.insert(X_RATELIMIT_REMAINING, HeaderValue::from(decision.remaining));
    headers.insert(X_RATELIMIT_RESET, HeaderValue::from(decision.reset_epoch_secs()));
}

/// 429 with retry metadata. `Retry-After` is the window length.
pub fn rate_limited_response(decision: &RateLimitDecision) -> Response {
    let mut response = (StatusCode::TOO_MANY_REQUESTS, "Too many requests").into_response();
    let headers = response.headers_mut();
    headers.insert(header::RETRY_AFTER, HeaderValue::from(decision.window.as_secs()));
    insert_rate_limit_headers(headers, decision);
    response
}

/// Shared governor state: the current compiled policy plus the rate table.
#[derive(Clone)]
pub struct GovernorState {
    policy: Arc<ArcSwap<GovernorPolicy>>,
    limiter: RateLimiter,
}

impl GovernorState {
    pub fn new(config: &GatewayConfig, limiter: RateLimiter) -> Self {
        Self {
            policy: Arc::new(ArcSwap::from_pointee(GovernorPolicy::compile(config))),
            limiter,
        }
    }

    /// Current policy snapshot.
    pub fn policy(&self) -> Arc<GovernorPolicy> {
        self.policy.load_full()
    }

    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    /// Swap in a new configuration. The rate table is kept.
    pub fn reload(&self, config: &GatewayConfig) {
        self.policy.store(Arc::new(GovernorPolicy::compile(config)));
        tracing::info!(
            mode = config.governor.mode.as_str(),
            window_secs = config.rate_limit.window_secs,
            max_requests = config.rate_limit.max_requests,
            "Governor policy reloaded"
        );
    }
}

/// Axum middleware applying the governor to every request.
pub async fn governor_middleware(
    State(state): State<GovernorState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let policy = state.policy();
    let host = request_host(&request);
    let client = client_identity(request.headers(), peer_addr(&request));
    let scheme = forwarded_proto(request.headers()).to_string();
    let path = request.uri().path().to_string();
    let query = request.uri().query().map(str::to_string);

    let facts = RequestFacts {
        host: &host,
        path: &path,
        query: query.as_deref(),
        client: &client,
        scheme: &scheme,
    };

    let verdict = policy.evaluate(&facts, state.limiter(), Instant::now());
    metrics::record_outcome(verdict.outcome());

    match verdict {
        Verdict::Reject { decision } => {
            tracing::warn!(client = %client, path = %path, limit = decision.limit, "Rate limit exceeded");
            metrics::record_rate_limited();
            metrics::record_rate_table_size(state.limiter().store().len());
            rate_limited_response(&decision)
        }
        Verdict::Redirect { location } => {
            tracing::debug!(host = %host, location = %location, "Redirecting to bare host");
            match HeaderValue::from_str(&location) {
                Ok(value) => (StatusCode::MOVED_PERMANENTLY, [(header::LOCATION, value)]).into_response(),
                Err(_) => (StatusCode::BAD_REQUEST, "Invalid host").into_response(),
            }
        }
        Verdict::Rewrite { tenant, path_and_query } => {
            let mut parts = request.uri().clone().into_parts();
            parts.path_and_query = match PathAndQuery::from_str(&path_and_query) {
                Ok(pq) => Some(pq),
                Err(_) => return (StatusCode::BAD_REQUEST, "Invalid tenant path").into_response(),
            };
            let uri = match Uri::from_parts(parts) {
                Ok(uri) => uri,
                Err(_) => return (StatusCode::BAD_REQUEST, "Invalid tenant path").into_response(),
            };
            tracing::debug!(tenant = %tenant, from = %path, to = %uri, "Rewriting to tenant route");
            *request.uri_mut() = uri;
            request.extensions_mut().insert(TenantContext { tenant });
            next.run(request).await
        }
        Verdict::PassThrough { rate_limit } => {
            let mut response = next.run(request).await;
            policy.decorate(response.headers_mut(), &facts, rate_limit.as_ref());
            response
        }
    }
}
