//! Upstream health state.
//!
//! # States
//! - Unknown: no probe has completed yet
//! - Healthy: last probe returned a success status
//! - Unhealthy: last probe failed, timed out or returned a non-success status
//!
//! # Design Decisions
//! - Lock-free reads (atomics), written only by the monitor and by the
//!   forwarding path when the upstream is unreachable

use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthState {
    Unknown = 0,
    Healthy = 1,
    Unhealthy = 2,
}

impl From<u8> for HealthState {
    fn from(val: u8) -> Self {
        match val {
            1 => HealthState::Healthy,
            2 => HealthState::Unhealthy,
            _ => HealthState::Unknown,
        }
    }
}

/// Last observed health of the upstream application server.
#[derive(Debug)]
pub struct UpstreamHealth {
    address: String,
    state: AtomicU8,
    /// Unix seconds of the last state update; 0 if never.
    checked_at: AtomicU64,
}

impl UpstreamHealth {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            state: AtomicU8::new(HealthState::Unknown as u8),
            checked_at: AtomicU64::new(0),
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn state(&self) -> HealthState {
        HealthState::from(self.state.load(Ordering::Relaxed))
    }

    pub fn checked_at(&self) -> u64 {
        self.checked_at.load(Ordering::Relaxed)
    }

    /// Record a result; returns the previous state.
    pub fn record(&self, healthy: bool) -> HealthState {
        let next = if healthy { HealthState::Healthy } else { HealthState::Unhealthy };
        self.checked_at.store(unix_now(), Ordering::Relaxed);
        HealthState::from(self.state.swap(next as u8, Ordering::Relaxed))
    }
}

pub(crate) fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
