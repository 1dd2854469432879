//! Active health checking.
//!
//! # Responsibilities
//! - Periodically probe the upstream health path
//! - Update the shared upstream state
//! - Publish one event per probe for dashboards

use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time;
use tokio::sync::broadcast;
use hyper_util::{
    client::legacy::{Client, connect::HttpConnector},
    rt::TokioExecutor,
};
use axum::http::Request;
use axum::body::Body;

use crate::config::HealthCheckConfig;
use crate::health::events::{HealthEvent, HealthEvents};
use crate::health::state::{unix_now, UpstreamHealth};
use crate::observability::metrics;
use crate::security::RateLimiter;

pub struct HealthMonitor {
    upstream: Arc<UpstreamHealth>,
    events: HealthEvents,
    limiter: RateLimiter,
    config: HealthCheckConfig,
    client: Client<HttpConnector, Body>,
}

impl HealthMonitor {
    pub fn new(
        upstream: Arc<UpstreamHealth>,
        events: HealthEvents,
        limiter: RateLimiter,
        config: HealthCheckConfig,
    ) -> Self {
        let client = Client::builder(TokioExecutor::new())
            .build(HttpConnector::new());

        Self {
            upstream,
            events,
            limiter,
            config,
            client,
        }
    }

    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        if !self.config.enabled {
            tracing::info!("Active health checks disabled");
            return;
        }

        tracing::info!(
            interval = self.config.interval_secs,
            path = %self.config.path,
            upstream = %self.upstream.address(),
            "Health monitor starting"
        );

        let mut ticker = time::interval(Duration::from_secs(self.config.interval_secs));

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.check().await;
                }
                _ = shutdown.recv() => {
                    tracing::info!("Health monitor received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }

    /// Probe once, record the result and publish an event.
    pub async fn check(&self) -> HealthEvent {
        let started = Instant::now();
        let healthy = self.probe().await;
        let latency_ms = started.elapsed().as_millis() as u64;

        let previous = self.upstream.record(healthy);
        let status = self.upstream.state();
        if previous != status {
            tracing::info!(upstream = %self.upstream.address(), from = ?previous, to = ?status, "Upstream health changed");
        }
        metrics::record_upstream_health(healthy);

        let rate_table_size = self.limiter.store().len();
        metrics::record_rate_table_size(rate_table_size);

        let event = HealthEvent {
            upstream: self.upstream.address().to_string(),
            status,
            changed: previous != status,
            latency_ms,
            rate_table_size,
            checked_at: unix_now(),
        };
        self.events.publish(event.clone());
        event
    }

    async fn probe(&self) -> bool {
        let addr = self.upstream.address();
        let uri_string = format!("http://{}{}", addr, self.config.path);

        let request = match Request::builder()
            .method("GET")
            .uri(uri_string)
            .header("user-agent", "edge-governor-health-check")
            .body(Body::empty()) {
                Ok(req) => req,
                Err(e) => {
                    tracing::error!(error = %e, "Failed to build health check request");
                    return false;
                }
            };

        let timeout = Duration::from_secs(self.config.timeout_secs);
        match time::timeout(timeout, self.client.request(request)).await {
            Ok(Ok(response)) => {
                let success = response.status().is_success();
                if !success {
                    tracing::warn!(addr = %addr, status = %response.status(), "Health check failed: non-success status");
                }
                success
            }
            Ok(Err(e)) => {
                tracing::warn!(addr = %addr, error = %e, "Health check failed: connection error");
                false
            }
            Err(_) => {
                tracing::warn!(addr = %addr, "Health check failed: timeout");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::health::state::HealthState;

    #[tokio::test]
    async fn test_unreachable_upstream_is_unhealthy() {
        // Bind and drop to get a port nothing listens on.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let events = HealthEvents::new(4);
        let mut rx = events.subscribe();
        let monitor = HealthMonitor::new(
            Arc::new(UpstreamHealth::new(addr.to_string())),
            events.clone(),
            RateLimiter::in_memory(),
            HealthCheckConfig {
                timeout_secs: 1,
                ..HealthCheckConfig::default()
            },
        );

        let event = monitor.check().await;
        assert_eq!(event.status, HealthState::Unhealthy);
        assert!(event.changed);
        assert_eq!(rx.recv().await.unwrap(), event);
    }
}
