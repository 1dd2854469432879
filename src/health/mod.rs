//! Health checking subsystem.
//!
//! # Data Flow
//! ```text
//! Active health checks (active.rs):
//!     Periodic timer
//!     → Probe upstream health path
//!     → Update state.rs
//!     → Publish events.rs
//!
//! Dashboards:
//!     GET /_governor/health  (poll: latest event + gateway liveness)
//!     GET /_governor/events  (push: Server-Sent Events stream)
//! ```
//!
//! # Design Decisions
//! - One event per probe, so a dashboard sees heartbeats even without changes
//! - Slow subscribers lag and skip events instead of blocking the monitor

pub mod active;
pub mod events;
pub mod state;

pub use active::HealthMonitor;
pub use events::{HealthEvent, HealthEvents};
pub use state::{HealthState, UpstreamHealth};
