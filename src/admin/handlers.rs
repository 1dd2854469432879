use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use std::time::Instant;

use crate::health::HealthState;
use crate::http::server::AppState;
use crate::security::{RateLimitPolicy, WindowRecord};

#[derive(Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub status: &'static str,
    pub instance_id: String,
    pub mode: &'static str,
    pub uptime_secs: u64,
    pub upstream: String,
    pub upstream_health: HealthState,
    pub rate_table_size: usize,
    pub rate_window_secs: u64,
    pub rate_max_requests: u32,
}

#[derive(Debug, Serialize)]
pub struct ClientWindow {
    pub client: String,
    pub count: u32,
    pub remaining: u32,
    pub window_age_secs: u64,
    /// False once the window has expired; the next request starts a new one.
    pub active: bool,
}

impl ClientWindow {
    fn new(client: String, record: WindowRecord, policy: RateLimitPolicy, now: Instant) -> Self {
        let age = now.saturating_duration_since(record.window_start);
        Self {
            client,
            count: record.count,
            remaining: policy.max_requests.saturating_sub(record.count),
            window_age_secs: age.as_secs(),
            active: age <= policy.window,
        }
    }
}

pub async fn get_status(State(state): State<AppState>) -> Json<SystemStatus> {
    let policy = state.governor.policy();
    let rate = policy.rate_limit();

    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: "operational",
        instance_id: state.instance_id.to_string(),
        mode: policy.config().governor.mode.as_str(),
        uptime_secs: state.started_at.elapsed().as_secs(),
        upstream: state.upstream.address().to_string(),
        upstream_health: state.upstream.state(),
        rate_table_size: state.governor.limiter().store().len(),
        rate_window_secs: rate.window.as_secs(),
        rate_max_requests: rate.max_requests,
    })
}

pub async fn list_rate_limits(State(state): State<AppState>) -> Json<Vec<ClientWindow>> {
    let policy = state.governor.policy().rate_limit();
    let now = Instant::now();

    let mut windows: Vec<ClientWindow> = state
        .governor
        .limiter()
        .store()
        .snapshot()
        .into_iter()
        .map(|(client, record)| ClientWindow::new(client, record, policy, now))
        .collect();
    windows.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.client.cmp(&b.client)));

    Json(windows)
}

pub async fn get_rate_limit(
    State(state): State<AppState>,
    Path(client): Path<String>,
) -> Result<Json<ClientWindow>, StatusCode> {
    let policy = state.governor.policy().rate_limit();
    let record = state
        .governor
        .limiter()
        .store()
        .get(&client)
        .ok_or(StatusCode::NOT_FOUND)?;

    Ok(Json(ClientWindow::new(client, record, policy, Instant::now())))
}

pub async fn reset_rate_limit(
    State(state): State<AppState>,
    Path(client): Path<String>,
) -> StatusCode {
    if state.governor.limiter().store().reset(&client) {
        tracing::info!(client = %client, "Rate limit window reset by admin");
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}

pub async fn clear_rate_limits(State(state): State<AppState>) -> StatusCode {
    let store = state.governor.limiter().store();
    let cleared = store.len();
    store.clear();
    tracing::info!(cleared, "Rate limit table cleared by admin");
    StatusCode::NO_CONTENT
}
