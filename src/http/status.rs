//! Gateway health endpoints for dashboards.
//!
//! Served by the gateway itself, outside the governor.

use std::convert::Infallible;

use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use futures_util::stream::{self, Stream};
use serde::Serialize;
use tokio::sync::broadcast::error::RecvError;

use crate::health::{HealthEvent, HealthState};
use crate::http::server::AppState;

pub const HEALTH_PATH: &str = "/_governor/health";
pub const EVENTS_PATH: &str = "/_governor/events";

#[derive(Debug, Serialize)]
pub struct GatewayHealth {
    pub status: &'static str,
    pub mode: &'static str,
    pub instance_id: String,
    pub uptime_secs: u64,
    pub upstream: HealthState,
    pub last_event: Option<HealthEvent>,
}

pub async fn health_handler(State(state): State<AppState>) -> Json<GatewayHealth> {
    let policy = state.governor.policy();
    Json(GatewayHealth {
        status: "ok",
        mode: policy.config().governor.mode.as_str(),
        instance_id: state.instance_id.to_string(),
        uptime_secs: state.started_at.elapsed().as_secs(),
        upstream: state.upstream.state(),
        last_event: state.events.latest(),
    })
}

/// Server-Sent Events stream of health events. The latest event, if any, is sent first.
pub async fn events_handler(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.events.subscribe();
    let initial = state.events.latest();

    let stream = stream::unfold((initial, rx), |(pending, mut rx)| async move {
        if let Some(event) = pending {
            return Some((Ok::<_, Infallible>(to_sse(&event)), (None, rx)));
        }
        loop {
            match rx.recv().await {
                Ok(event) => return Some((Ok::<_, Infallible>(to_sse(&event)), (None, rx))),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "Health event subscriber lagging");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}

fn to_sse(event: &HealthEvent) -> Event {
    let sse = Event::default().event("health");
    match serde_json::to_string(event) {
        Ok(data) => sse.data(data),
        Err(e) => {
            tracing::error!(error = %e, "Failed to serialize health event");
            sse.data("{}")
        }
    }
}
