//! Security response headers.
//!
//! Six headers are always set on decorated responses; the
//! Content-Security-Policy header is added only in production.

use axum::http::header::{
    CONTENT_SECURITY_POLICY, REFERRER_POLICY, STRICT_TRANSPORT_SECURITY, X_CONTENT_TYPE_OPTIONS,
    X_FRAME_OPTIONS, X_XSS_PROTECTION,
};
use axum::http::{HeaderMap, HeaderName, HeaderValue};

pub const PERMISSIONS_POLICY: HeaderName = HeaderName::from_static("permissions-policy");

/// Headers emitted regardless of mode.
pub const FIXED_SECURITY_HEADERS: [(HeaderName, &str); 6] = [
    (X_FRAME_OPTIONS, "DENY"),
    (X_CONTENT_TYPE_OPTIONS, "nosniff"),
    (STRICT_TRANSPORT_SECURITY, "max-age=31536000; includeSubDomains; preload"),
    (X_XSS_PROTECTION, "1; mode=block"),
    (REFERRER_POLICY, "strict-origin-when-cross-origin"),
    (PERMISSIONS_POLICY, "camera=(), microphone=(), geolocation=()"),
];

/// Compiled header set for the current mode.
#[derive(Debug, Clone, Default)]
pub struct SecurityHeaders {
    csp: Option<HeaderValue>,
}

impl SecurityHeaders {
    /// `csp` is `Some` only in production.
    pub fn new(csp: Option<&str>) -> Self {
        let csp = csp.and_then(|value| match HeaderValue::from_str(value) {
            Ok(v) => Some(v),
            Err(_) => {
                tracing::warn!("Content-Security-Policy is not a valid header value, omitting it");
                None
            }
        });
        Self { csp }
    }

    pub fn emits_csp(&self) -> bool {
        self.csp.is_some()
    }

    pub fn apply(&self, headers: &mut HeaderMap) {
        for (name, value) in FIXED_SECURITY_HEADERS {
            headers.insert(name, HeaderValue::from_static(value));
        }
        if let Some(csp) = &self.csp {
            headers.insert(CONTENT_SECURITY_POLICY, csp.clone());
        }
    }
}
