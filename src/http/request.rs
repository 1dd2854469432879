//! Request facts the governor decides on.
//!
//! # Responsibilities
//! - Derive the client identity used as the rate-limit key
//! - Extract the request host (Host header, falling back to the URI authority)
//! - Extract the original scheme for redirects
//!
//! # Design Decisions
//! - Identity order: first `X-Forwarded-For` entry, `X-Real-IP`, connection
//!   address, then the shared sentinel [`UNKNOWN_CLIENT`]
//! - Every client without identifying information shares one budget

use std::net::SocketAddr;

use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::http::{header, HeaderMap, Request};

/// Identity used when nothing identifies the caller.
pub const UNKNOWN_CLIENT: &str = "unknown";

pub const X_FORWARDED_FOR: &str = "x-forwarded-for";
pub const X_REAL_IP: &str = "x-real-ip";
pub const X_FORWARDED_PROTO: &str = "x-forwarded-proto";

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

/// Rate-limit key for a request.
pub fn client_identity(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    if let Some(first) = header_str(headers, X_FORWARDED_FOR)
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
    {
        return first.to_string();
    }
    if let Some(real_ip) = header_str(headers, X_REAL_IP) {
        return real_ip.to_string();
    }
    match peer {
        Some(addr) => addr.ip().to_string(),
        None => UNKNOWN_CLIENT.to_string(),
    }
}

/// Connection address, when the server was started with connect info.
pub fn peer_addr(request: &Request<Body>) -> Option<SocketAddr> {
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr)
}

/// Lowercased host (with port, if any). Empty when the request names no host.
pub fn request_host(request: &Request<Body>) -> String {
    header_str(request.headers(), header::HOST.as_str())
        .map(str::to_string)
        .or_else(|| request.uri().authority().map(|a| a.to_string()))
        .unwrap_or_default()
        .to_ascii_lowercase()
}

/// Scheme the client used, as reported by a fronting proxy. Defaults to https.
pub fn forwarded_proto(headers: &HeaderMap) -> &str {
    match header_str(headers, X_FORWARDED_PROTO) {
        Some(proto) if proto.eq_ignore_ascii_case("http") => "http",
        _ => "https",
    }
}
