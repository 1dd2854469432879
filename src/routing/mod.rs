//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (host, path)
//!     → subdomain.rs (host → tenant label or main site)
//!     → matcher.rs (is this path rate limited?)
//!
//! Compilation (at startup and on every config reload):
//!     RateLimitConfig → AnyMatcher
//!     GovernorConfig  → SubdomainResolver
//! ```
//!
//! # Design Decisions
//! - Matchers compiled once per config, immutable at runtime
//! - No regex in hot path (prefix/substring matching only)
//! - Deterministic: same host always resolves to the same tenant

pub mod matcher;
pub mod subdomain;

pub use matcher::{AnyMatcher, Matcher};
pub use subdomain::SubdomainResolver;
