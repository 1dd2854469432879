//! Tenant resolution from the Host header.
//!
//! A tenant is the first label of a host with three or more labels
//! (`acme.example.org` → `acme`). Loopback and preview-hosting hosts never
//! carry a tenant so local, dev and preview deployments keep working.
//! Only a well-formed DNS label is accepted as a tenant, since it is spliced
//! into the rewritten request path.

/// True for `localhost` and loopback literals, with or without a port.
pub fn is_loopback_host(host: &str) -> bool {
    host.contains("localhost") || host.contains("127.0.0.1") || host.contains("[::1]")
}

/// Strip a trailing `:port` from a Host value, leaving IPv6 literals intact.
pub fn strip_port(host: &str) -> &str {
    if host.starts_with('[') {
        return match host.find(']') {
            Some(end) => &host[..=end],
            None => host,
        };
    }
    match host.rsplit_once(':') {
        Some((name, port)) if port.chars().all(|c| c.is_ascii_digit()) => name,
        _ => host,
    }
}

/// True for an RFC 1123 label: ASCII letters, digits and `-`, 1..=63 bytes,
/// not starting or ending with `-`.
pub fn is_dns_label(label: &str) -> bool {
    !label.is_empty()
        && label.len() <= 63
        && !label.starts_with('-')
        && !label.ends_with('-')
        && label.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-')
}

/// Derives tenant labels from request hosts.
#[derive(Debug, Clone)]
pub struct SubdomainResolver {
    preview_suffix: String,
}

impl SubdomainResolver {
    pub fn new(preview_suffix: impl Into<String>) -> Self {
        Self {
            preview_suffix: preview_suffix.into().to_lowercase(),
        }
    }

    /// True when the host lives under the preview-hosting wildcard domain.
    pub fn is_preview_host(&self, host: &str) -> bool {
        !self.preview_suffix.is_empty() && strip_port(host).ends_with(&self.preview_suffix)
    }

    /// Return the tenant label for `host`, or `None` for the main site.
    pub fn resolve(&self, host: &str) -> Option<String> {
        if host.is_empty() || is_loopback_host(host) || self.is_preview_host(host) {
            return None;
        }

        let labels: Vec<&str> = host.split('.').collect();
        if labels.len() < 3 {
            return None;
        }
        let label = labels[0];
        if !is_dns_label(label) {
            tracing::debug!(host = %host, "Ignoring malformed tenant label");
            return None;
        }
        Some(label.to_ascii_lowercase())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver() -> SubdomainResolver {
        SubdomainResolver::new(".vercel.app")
    }

    #[test]
    fn test_first_label_is_tenant() {
        let r = resolver();
        assert_eq!(r.resolve("acme.example.org").as_deref(), Some("acme"));
        assert_eq!(r.resolve("www.example.org").as_deref(), Some("www"));
        assert_eq!(r.resolve("a.b.c.d").as_deref(), Some("a"));
        assert_eq!(r.resolve("acme.example.org:8443").as_deref(), Some("acme"));
    }

    #[test]
    fn test_two_labels_is_main_site() {
        let r = resolver();
        assert_eq!(r.resolve("example.org"), None);
        assert_eq!(r.resolve("example.org:443"), None);
        assert_eq!(r.resolve(""), None);
    }

    #[test]
    fn test_loopback_and_preview_hosts() {
        let r = resolver();
        assert_eq!(r.resolve("localhost:3000"), None);
        assert_eq!(r.resolve("tenant.localhost:3000"), None);
        assert_eq!(r.resolve("127.0.0.1:8080"), None);
        assert_eq!(r.resolve("crm-git-feature-team.vercel.app"), None);
    }

    #[test]
    fn test_empty_preview_suffix_disables_preview_check() {
        let r = SubdomainResolver::new("");
        assert_eq!(r.resolve("crm-git-feature.vercel.app").as_deref(), Some("crm-git-feature"));
    }

    #[test]
    fn test_malformed_first_label_is_not_a_tenant() {
        let r = resolver();
        assert_eq!(r.resolve("acme?admin=1.example.org"), None);
        assert_eq!(r.resolve("acme#x.example.org"), None);
        assert_eq!(r.resolve("acme/../../internal.example.org"), None);
        assert_eq!(r.resolve("acme%2f.example.org"), None);
        assert_eq!(r.resolve("-acme.example.org"), None);
        assert_eq!(r.resolve("acme-.example.org"), None);
        assert_eq!(r.resolve(".example.org"), None);
        assert_eq!(r.resolve(&format!("{}.example.org", "a".repeat(64))), None);
    }

    #[test]
    fn test_valid_labels_are_normalized() {
        let r = resolver();
        assert_eq!(r.resolve("Acme-2.example.org").as_deref(), Some("acme-2"));
        assert!(is_dns_label("a"));
        assert!(is_dns_label("crm-01"));
        assert!(!is_dns_label("crm_01"));
    }

    #[test]
    fn test_strip_port() {
        assert_eq!(strip_port("example.org:8080"), "example.org");
        assert_eq!(strip_port("example.org"), "example.org");
        assert_eq!(strip_port("[::1]:3000"), "[::1]");
    }
}
