//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the governor.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the edge governor.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Application server that governed requests are forwarded to.
    pub upstream: UpstreamConfig,

    /// Host routing, mode flag and response decoration.
    pub governor: GovernorConfig,

    /// Rate limiting configuration.
    pub rate_limit: RateLimitConfig,

    /// Cross-origin allow-lists.
    pub cors: CorsConfig,

    /// Upstream health probing and event push.
    pub health_check: HealthCheckConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    pub admin: AdminConfig,

    pub security: SecurityConfig,
}

impl GatewayConfig {
    pub fn is_production(&self) -> bool {
        self.governor.mode == Mode::Production
    }
}

/// Deployment mode. Production turns on rate limiting and CSP emission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Production,
    #[default]
    Development,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Production => "production",
            Mode::Development => "development",
        }
    }
}

impl std::str::FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "production" | "prod" => Ok(Mode::Production),
            "development" | "dev" => Ok(Mode::Development),
            other => Err(format!("unknown mode '{}'", other)),
        }
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Upstream application server.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Upstream address (e.g., "127.0.0.1:3000").
    pub address: String,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1:3000".to_string(),
        }
    }
}

/// Request governor settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GovernorConfig {
    /// Production or development.
    pub mode: Mode,

    /// Wildcard preview-hosting domain suffix (hosts under it never carry a tenant).
    pub preview_suffix: String,

    /// Label that redirects to the bare host instead of naming a tenant.
    pub reserved_label: String,

    /// Route segment tenant requests are rewritten under.
    pub tenant_route_prefix: String,

    /// Path prefix that receives CORS headers.
    pub api_prefix: String,

    /// Content-Security-Policy value emitted in production.
    pub content_security_policy: String,

    /// Emit `x-hostname` / `x-subdomain` on pass-through responses.
    pub diagnostic_headers: bool,
}

impl Default for GovernorConfig {
    fn default() -> Self {
        Self {
            mode: Mode::Development,
            preview_suffix: ".vercel.app".to_string(),
            reserved_label: "www".to_string(),
            tenant_route_prefix: "/subdomains".to_string(),
            api_prefix: "/api".to_string(),
            content_security_policy: "default-src 'self'; \
                script-src 'self' 'unsafe-eval' 'unsafe-inline'; \
                style-src 'self' 'unsafe-inline'; \
                img-src 'self' data: https:; \
                font-src 'self' data:; \
                connect-src 'self' https:; \
                frame-ancestors 'none';"
                .to_string(),
            diagnostic_headers: true,
        }
    }
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Enable rate limiting (only ever applied in production mode).
    pub enabled: bool,

    /// Fixed window length in seconds.
    pub window_secs: u64,

    /// Requests admitted per client per window.
    pub max_requests: u32,

    /// Paths starting with any of these are rate limited.
    pub path_prefixes: Vec<String>,

    /// Paths containing any of these are rate limited.
    pub path_substrings: Vec<String>,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            window_secs: 60,
            max_requests: 100,
            path_prefixes: vec!["/api".to_string(), "/auth".to_string()],
            path_substrings: vec!["login".to_string(), "signup".to_string()],
        }
    }
}

/// CORS origin allow-lists.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CorsConfig {
    /// Known production origins (`https://<host>`).
    pub production_origins: Vec<String>,

    /// Known development origins.
    pub development_origins: Vec<String>,

    /// Origin returned for any host not on an allow-list.
    pub canonical_origin: String,

    pub allow_methods: String,

    pub allow_headers: String,

    pub max_age_secs: u64,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            production_origins: vec![
                "https://example.org".to_string(),
                "https://www.example.org".to_string(),
                "https://app.example.org".to_string(),
                "https://admin.example.org".to_string(),
            ],
            development_origins: vec![
                "http://localhost:3000".to_string(),
                "http://127.0.0.1:3000".to_string(),
            ],
            canonical_origin: "https://example.org".to_string(),
            allow_methods: "GET, POST, PUT, DELETE, OPTIONS".to_string(),
            allow_headers: "Content-Type, Authorization".to_string(),
            max_age_secs: 86400,
        }
    }
}

/// Health check configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HealthCheckConfig {
    /// Enable active upstream probing.
    pub enabled: bool,

    /// Probe interval in seconds.
    pub interval_secs: u64,

    /// Probe timeout in seconds.
    pub timeout_secs: u64,

    /// Upstream path to probe.
    pub path: String,

    /// Buffered events per subscriber before slow subscribers start lagging.
    pub event_buffer: usize,
}

impl Default for HealthCheckConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: 10,
            timeout_secs: 5,
            path: "/api/health".to_string(),
            event_buffer: 64,
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log filter used when `RUST_LOG` is unset.
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "edge_governor=debug,tower_http=debug".to_string(),
            metrics_enabled: true,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Admin API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Enable admin API.
    pub enabled: bool,

    /// API key for authentication (Bearer token).
    pub api_key: String,

    /// Admin API bind address.
    pub bind_address: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            // WARNING: This is a placeholder! Change this in production.
            api_key: "CHANGE_ME_IN_PRODUCTION".to_string(),
            bind_address: "127.0.0.1:8081".to_string(),
        }
    }
}

/// Security hardening configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Maximum body size in bytes.
    pub max_body_size: usize,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            max_body_size: 2 * 1024 * 1024, // 2MB
        }
    }
}
