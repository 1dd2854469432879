//! Health events pushed to dashboards.
//!
//! The monitor publishes one event per probe. Dashboards either poll the
//! latest event or subscribe to the stream (served as Server-Sent Events).

use std::sync::{Arc, RwLock};

use serde::Serialize;
use tokio::sync::broadcast;

use crate::health::state::HealthState;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthEvent {
    pub upstream: String,
    pub status: HealthState,
    /// True when this event differs in status from the previous one.
    pub changed: bool,
    pub latency_ms: u64,
    /// Client identities currently tracked by the rate limiter.
    pub rate_table_size: usize,
    /// Unix seconds.
    pub checked_at: u64,
}

/// Fan-out of health events with the most recent one retained for polling.
#[derive(Debug, Clone)]
pub struct HealthEvents {
    tx: broadcast::Sender<HealthEvent>,
    latest: Arc<RwLock<Option<HealthEvent>>>,
}

impl HealthEvents {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self {
            tx,
            latest: Arc::new(RwLock::new(None)),
        }
    }

    pub fn publish(&self, event: HealthEvent) {
        match self.latest.write() {
            Ok(mut latest) => *latest = Some(event.clone()),
            Err(poisoned) => *poisoned.into_inner() = Some(event.clone()),
        }
        // No subscribers is fine; the latest event is still kept.
        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<HealthEvent> {
        self.tx.subscribe()
    }

    pub fn latest(&self) -> Option<HealthEvent> {
        match self.latest.read() {
            Ok(latest) => latest.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(status: HealthState) -> HealthEvent {
        HealthEvent {
            upstream: "127.0.0.1:3000".into(),
            status,
            changed: false,
            latency_ms: 3,
            rate_table_size: 0,
            checked_at: 1,
        }
    }

    #[tokio::test]
    async fn test_publish_reaches_subscribers_and_latest() {
        let events = HealthEvents::new(8);
        assert!(events.latest().is_none());

        let mut rx = events.subscribe();
        events.publish(event(HealthState::Healthy));

        assert_eq!(rx.recv().await.unwrap().status, HealthState::Healthy);
        assert_eq!(events.latest().unwrap().status, HealthState::Healthy);
    }

    #[test]
    fn test_publish_without_subscribers() {
        let events = HealthEvents::new(8);
        events.publish(event(HealthState::Unhealthy));
        assert_eq!(events.subscriber_count(), 0);
        assert_eq!(events.latest().unwrap().status, HealthState::Unhealthy);
    }
}
