//! Cross-origin header computation.
//!
//! The permitted origin is derived from the request host, not from the
//! `Origin` header: preview and loopback hosts are echoed, allow-listed hosts
//! are returned as-is, and everything else gets the canonical origin. An
//! unknown host never sees its own origin echoed back.

use axum::http::header::{
    ACCESS_CONTROL_ALLOW_CREDENTIALS, ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS,
    ACCESS_CONTROL_ALLOW_ORIGIN, ACCESS_CONTROL_MAX_AGE,
};
use axum::http::{HeaderMap, HeaderValue};

use crate::config::CorsConfig;
use crate::routing::subdomain::{is_loopback_host, SubdomainResolver};

/// Maps a request host to the single origin allowed to call it.
#[derive(Debug, Clone)]
pub struct OriginResolver {
    production: Vec<String>,
    development: Vec<String>,
    canonical: String,
    hosts: SubdomainResolver,
}

impl OriginResolver {
    pub fn new(config: &CorsConfig, preview_suffix: &str) -> Self {
        Self {
            production: config.production_origins.clone(),
            development: config.development_origins.clone(),
            canonical: config.canonical_origin.clone(),
            hosts: SubdomainResolver::new(preview_suffix),
        }
    }

    pub fn canonical(&self) -> &str {
        &self.canonical
    }

    pub fn resolve(&self, host: &str) -> String {
        if host.is_empty() {
            return self.canonical.clone();
        }
        if self.hosts.is_preview_host(host) {
            return format!("https://{}", host);
        }
        if is_loopback_host(host) {
            return format!("http://{}", host);
        }

        let https = format!("https://{}", host);
        if self.production.iter().any(|o| *o == https) {
            return https;
        }
        let http = format!("http://{}", host);
        if self.development.iter().any(|o| *o == http) {
            return http;
        }

        tracing::debug!(host = %host, fallback = %self.canonical, "Host not on an origin allow-list");
        self.canonical.clone()
    }
}

/// CORS response headers for API paths.
#[derive(Debug, Clone)]
pub struct CorsPolicy {
    origins: OriginResolver,
    allow_methods: HeaderValue,
    allow_headers: HeaderValue,
    max_age: HeaderValue,
}

impl CorsPolicy {
    pub fn new(config: &CorsConfig, preview_suffix: &str) -> Self {
        Self {
            origins: OriginResolver::new(config, preview_suffix),
            allow_methods: HeaderValue::from_str(&config.allow_methods)
                .unwrap_or_else(|_| HeaderValue::from_static("GET, POST, PUT, DELETE, OPTIONS")),
            allow_headers: HeaderValue::from_str(&config.allow_headers)
                .unwrap_or_else(|_| HeaderValue::from_static("Content-Type, Authorization")),
            max_age: HeaderValue::from(config.max_age_secs),
        }
    }

    pub fn origins(&self) -> &OriginResolver {
        &self.origins
    }

    /// Set the CORS headers for a request to `host`.
    pub fn apply(&self, headers: &mut HeaderMap, host: &str) {
        let origin = self.origins.resolve(host);
        let origin = match HeaderValue::from_str(&origin) {
            Ok(v) => v,
            // Host values are already valid header text; this only guards odd bytes.
            Err(_) => match HeaderValue::from_str(self.origins.canonical()) {
                Ok(v) => v,
                Err(_) => return,
            },
        };

        headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, origin);
        headers.insert(ACCESS_CONTROL_ALLOW_METHODS, self.allow_methods.clone());
        headers.insert(ACCESS_CONTROL_ALLOW_HEADERS, self.allow_headers.clone());
        headers.insert(ACCESS_CONTROL_ALLOW_CREDENTIALS, HeaderValue::from_static("true"));
        headers.insert(ACCESS_CONTROL_MAX_AGE, self.max_age.clone());
    }
}
