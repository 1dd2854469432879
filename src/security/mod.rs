//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → rate_limit.rs (per-client fixed window, production only)
//!     → [governor decides rewrite / redirect / pass-through]
//! Outgoing pass-through response:
//!     → headers.rs (fixed security headers, CSP in production)
//!     → cors.rs (allowed origin for API paths)
//! ```
//!
//! # Design Decisions
//! - Fail closed: unknown hosts get the canonical origin, never their own
//! - Rejections carry machine-readable retry metadata
//! - No trust in client input beyond identity headers

pub mod cors;
pub mod headers;
pub mod rate_limit;

pub use cors::{CorsPolicy, OriginResolver};
pub use headers::SecurityHeaders;
pub use rate_limit::{
    InMemoryStore, RateLimitDecision, RateLimitPolicy, RateLimitStore, RateLimiter, WindowRecord,
};
