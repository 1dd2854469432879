//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the governor in front of the upstream forwarder
//! - Wire up middleware (tracing, request ID, timeout, body limit)
//! - Serve gateway health endpoints outside the governor
//! - Forward governed requests to the upstream application
//! - Run the health monitor, admin API and config reload loop

use axum::{
    body::Body,
    extract::State,
    http::{header, uri::{Authority, PathAndQuery, Scheme}, HeaderValue, Request, StatusCode, Uri},
    middleware,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use hyper_util::{
    client::legacy::{Client, connect::HttpConnector},
    rt::TokioExecutor,
};
use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tower_http::{
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use uuid::Uuid;

use crate::admin;
use crate::config::GatewayConfig;
use crate::health::{HealthEvents, HealthMonitor, UpstreamHealth};
use crate::http::governor::{governor_middleware, GovernorState};
use crate::http::status::{events_handler, health_handler, EVENTS_PATH, HEALTH_PATH};
use crate::observability::metrics;
use crate::security::RateLimiter;

pub const X_FORWARDED_HOST: &str = "x-forwarded-host";

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub governor: GovernorState,
    pub upstream: Arc<UpstreamHealth>,
    pub events: HealthEvents,
    pub client: Client<HttpConnector, Body>,
    pub instance_id: Uuid,
    pub started_at: Instant,
}

/// HTTP server for the edge governor.
pub struct HttpServer {
    router: Router,
    config: GatewayConfig,
    state: AppState,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration and an in-memory rate table.
    pub fn new(config: GatewayConfig) -> Self {
        Self::with_limiter(config, RateLimiter::in_memory())
    }

    /// Create a server around an existing limiter (e.g. one backed by a shared store).
    pub fn with_limiter(config: GatewayConfig, limiter: RateLimiter) -> Self {
        let client = Client::builder(TokioExecutor::new())
            .build(HttpConnector::new());

        let state = AppState {
            governor: GovernorState::new(&config, limiter),
            upstream: Arc::new(UpstreamHealth::new(config.upstream.address.clone())),
            events: HealthEvents::new(config.health_check.event_buffer),
            client,
            instance_id: Uuid::new_v4(),
            started_at: Instant::now(),
        };

        let router = Self::build_router(&config, state.clone());
        Self {
            router,
            config,
            state,
        }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &GatewayConfig, state: AppState) -> Router {
        let governed = Router::new()
            .fallback(forward_handler)
            .layer(middleware::from_fn_with_state(state.governor.clone(), governor_middleware))
            .with_state(state.clone());

        Router::new()
            .route(HEALTH_PATH, get(health_handler))
            .route(EVENTS_PATH, get(events_handler))
            .fallback_service(governed)
            .with_state(state)
            .layer(RequestBodyLimitLayer::new(config.security.max_body_size))
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }

    /// The router, for embedding or driving in tests.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Run the server, accepting connections on the given listener until shutdown.
    pub async fn run(
        self,
        listener: TcpListener,
        mut config_updates: mpsc::UnboundedReceiver<GatewayConfig>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            instance_id = %self.state.instance_id,
            mode = self.config.governor.mode.as_str(),
            upstream = %self.config.upstream.address,
            "HTTP server starting"
        );

        if self.config.health_check.enabled {
            let monitor = HealthMonitor::new(
                self.state.upstream.clone(),
                self.state.events.clone(),
                self.state.governor.limiter().clone(),
                self.config.health_check.clone(),
            );
            let monitor_shutdown = shutdown.resubscribe();
            tokio::spawn(async move {
                monitor.run(monitor_shutdown).await;
            });
        }

        if self.config.admin.enabled {
            let admin_listener = TcpListener::bind(&self.config.admin.bind_address).await?;
            let admin_router = admin::setup_admin_router(self.state.clone());
            let mut admin_shutdown = shutdown.resubscribe();
            tracing::info!(address = %self.config.admin.bind_address, "Admin API listening");
            tokio::spawn(async move {
                let served = axum::serve(admin_listener, admin_router)
                    .with_graceful_shutdown(async move {
                        let _ = admin_shutdown.recv().await;
                    })
                    .await;
                if let Err(e) = served {
                    tracing::error!(error = %e, "Admin API stopped");
                }
            });
        }

        let governor = self.state.governor.clone();
        tokio::spawn(async move {
            while let Some(updated) = config_updates.recv().await {
                governor.reload(&updated);
            }
        });

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Forwards a governed request to the upstream application server.
async fn forward_handler(
    State(state): State<AppState>,
    request: Request<Body>,
) -> Response {
    let start_time = Instant::now();
    let upstream_addr = state.upstream.address().to_string();

    let (mut parts, body) = request.into_parts();
    let original_host = parts.headers.get(header::HOST).cloned();

    let mut uri_parts = parts.uri.clone().into_parts();
    uri_parts.scheme = Some(Scheme::HTTP);
    uri_parts.authority = match Authority::from_str(&upstream_addr) {
        Ok(authority) => Some(authority),
        Err(e) => {
            tracing::error!(upstream = %upstream_addr, error = %e, "Invalid upstream address");
            return (StatusCode::BAD_GATEWAY, "Upstream misconfigured").into_response();
        }
    };
    if uri_parts.path_and_query.is_none() {
        uri_parts.path_and_query = Some(PathAndQuery::from_static("/"));
    }
    parts.uri = match Uri::from_parts(uri_parts) {
        Ok(uri) => uri,
        Err(e) => {
            tracing::warn!(error = %e, "Could not build upstream URI");
            return (StatusCode::BAD_REQUEST, "Invalid request URI").into_response();
        }
    };
    if let Some(host) = original_host {
        parts.headers.insert(X_FORWARDED_HOST, host);
    }
    // HTTP/2 clients send :authority instead of Host.
    if !parts.headers.contains_key(header::HOST) {
        if let Ok(host) = HeaderValue::from_str(&upstream_addr) {
            parts.headers.insert(header::HOST, host);
        }
    }
    parts.version = axum::http::Version::HTTP_11;

    let method = parts.method.clone();
    let path = parts.uri.path().to_string();
    tracing::debug!(method = %method, path = %path, upstream = %upstream_addr, "Forwarding request");

    match state.client.request(Request::from_parts(parts, body)).await {
        Ok(response) => {
            metrics::record_upstream(response.status().as_u16(), start_time);
            let (parts, body): (_, hyper::body::Incoming) = response.into_parts();
            Response::from_parts(parts, Body::new(body))
        }
        Err(e) => {
            tracing::error!(method = %method, path = %path, upstream = %upstream_addr, error = %e, "Upstream error");
            metrics::record_upstream(StatusCode::BAD_GATEWAY.as_u16(), start_time);
            state.upstream.record(false);
            (StatusCode::BAD_GATEWAY, "Upstream request failed").into_response()
        }
    }
}
