//! Edge request governor.
//!
//! Every inbound request passes through the governor before reaching the
//! application: per-client rate limiting, tenant rewrites from the Host
//! header, `www` redirects, and security/CORS response decoration.

pub mod admin;
pub mod config;
pub mod health;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod routing;
pub mod security;

pub use config::schema::GatewayConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
