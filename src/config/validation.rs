//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (window > 0, budget > 0)
//! - Check that addresses, origins and header values parse
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use axum::http::uri::Authority;
use axum::http::HeaderValue;
use thiserror::Error;
use url::Url;

use crate::config::schema::GatewayConfig;

/// A single semantic problem found in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field}: '{value}' is not a valid socket address")]
    InvalidAddress { field: &'static str, value: String },

    #[error("{field}: '{value}' is not a valid origin")]
    InvalidOrigin { field: &'static str, value: String },

    #[error("{field}: must be greater than zero")]
    Zero { field: &'static str },

    #[error("{field}: '{value}' must start with '/'")]
    NotAPath { field: &'static str, value: String },

    #[error("{field}: not a valid header value")]
    InvalidHeaderValue { field: &'static str },

    #[error("{field}: must not be empty")]
    Empty { field: &'static str },
}

/// Validate a parsed configuration, collecting every error.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    check_address(&mut errors, "listener.bind_address", &config.listener.bind_address);
    check_authority(&mut errors, "upstream.address", &config.upstream.address);
    if config.admin.enabled {
        check_address(&mut errors, "admin.bind_address", &config.admin.bind_address);
        if config.admin.api_key.trim().is_empty() {
            errors.push(ValidationError::Empty { field: "admin.api_key" });
        }
    }

    if config.rate_limit.window_secs == 0 {
        errors.push(ValidationError::Zero { field: "rate_limit.window_secs" });
    }
    if config.rate_limit.max_requests == 0 {
        errors.push(ValidationError::Zero { field: "rate_limit.max_requests" });
    }
    for prefix in &config.rate_limit.path_prefixes {
        check_path(&mut errors, "rate_limit.path_prefixes", prefix);
    }

    check_path(&mut errors, "governor.api_prefix", &config.governor.api_prefix);
    check_path(&mut errors, "governor.tenant_route_prefix", &config.governor.tenant_route_prefix);
    if config.governor.reserved_label.is_empty() {
        errors.push(ValidationError::Empty { field: "governor.reserved_label" });
    }
    check_header(
        &mut errors,
        "governor.content_security_policy",
        &config.governor.content_security_policy,
    );

    check_origin(&mut errors, "cors.canonical_origin", &config.cors.canonical_origin);
    for origin in &config.cors.production_origins {
        check_origin(&mut errors, "cors.production_origins", origin);
    }
    for origin in &config.cors.development_origins {
        check_origin(&mut errors, "cors.development_origins", origin);
    }
    check_header(&mut errors, "cors.allow_methods", &config.cors.allow_methods);
    check_header(&mut errors, "cors.allow_headers", &config.cors.allow_headers);

    if config.health_check.enabled {
        if config.health_check.interval_secs == 0 {
            errors.push(ValidationError::Zero { field: "health_check.interval_secs" });
        }
        if config.health_check.timeout_secs == 0 {
            errors.push(ValidationError::Zero { field: "health_check.timeout_secs" });
        }
        check_path(&mut errors, "health_check.path", &config.health_check.path);
    }
    if config.health_check.event_buffer == 0 {
        errors.push(ValidationError::Zero { field: "health_check.event_buffer" });
    }
    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::Zero { field: "timeouts.request_secs" });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_address(errors: &mut Vec<ValidationError>, field: &'static str, value: &str) {
    if value.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field,
            value: value.to_string(),
        });
    }
}

/// Upstreams may be DNS names (`crm-app:3000`); anything the forwarder can
/// place in a request authority is accepted, minus userinfo.
fn check_authority(errors: &mut Vec<ValidationError>, field: &'static str, value: &str) {
    let valid = match value.parse::<Authority>() {
        Ok(authority) => {
            let host = authority.host();
            !host.is_empty()
                && !value.contains('@')
                && (host.len() == value.len() || authority.port_u16().is_some())
        }
        Err(_) => false,
    };
    if !valid {
        errors.push(ValidationError::InvalidAddress {
            field,
            value: value.to_string(),
        });
    }
}

fn check_path(errors: &mut Vec<ValidationError>, field: &'static str, value: &str) {
    if !value.starts_with('/') {
        errors.push(ValidationError::NotAPath {
            field,
            value: value.to_string(),
        });
    }
}

fn check_header(errors: &mut Vec<ValidationError>, field: &'static str, value: &str) {
    if HeaderValue::from_str(value).is_err() {
        errors.push(ValidationError::InvalidHeaderValue { field });
    }
}

/// An origin is scheme + host (+ port) with nothing after it.
fn check_origin(errors: &mut Vec<ValidationError>, field: &'static str, value: &str) {
    let valid = match Url::parse(value) {
        Ok(url) => {
            matches!(url.scheme(), "http" | "https")
                && url.host_str().is_some()
                && url.path() == "/"
                && !value.ends_with('/')
                && url.query().is_none()
        }
        Err(_) => false,
    };
    if !valid {
        errors.push(ValidationError::InvalidOrigin {
            field,
            value: value.to_string(),
        });
    }
}
