//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, trace, timeout, body limit)
//!     → /_governor/* → status.rs (health poll + SSE push)
//!     → everything else:
//!         → request.rs (client identity, host, scheme)
//!         → governor.rs (reject / redirect / rewrite / pass-through)
//!         → server.rs forward_handler (upstream application)
//!         → governor.rs (decorate pass-through response)
//!     → Send to client
//! ```

pub mod governor;
pub mod request;
pub mod server;
pub mod status;

pub use governor::{governor_middleware, GovernorPolicy, GovernorState, TenantContext, Verdict};
pub use server::{AppState, HttpServer};
