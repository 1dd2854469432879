//! Path matching logic.
//!
//! # Responsibilities
//! - Match path prefix (case-sensitive)
//! - Match path substring (case-sensitive)
//! - Combine conditions with OR semantics
//!
//! # Design Decisions
//! - Path matching is case-sensitive
//! - Empty combination never matches
//! - No regex to guarantee O(n) matching

use crate::config::RateLimitConfig;

/// Trait for matching request paths against conditions.
pub trait Matcher: Send + Sync + std::fmt::Debug {
    /// Returns true if the path matches this condition.
    fn matches(&self, path: &str) -> bool;
}

/// Matches the request path prefix.
#[derive(Debug, Clone)]
pub struct PathPrefixMatcher {
    prefix: String,
}

impl PathPrefixMatcher {
    /// Create a new path prefix matcher.
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }
}

impl Matcher for PathPrefixMatcher {
    fn matches(&self, path: &str) -> bool {
        path.starts_with(&self.prefix)
    }
}

/// Matches any path containing a fragment.
#[derive(Debug, Clone)]
pub struct ContainsMatcher {
    fragment: String,
}

impl ContainsMatcher {
    pub fn new(fragment: impl Into<String>) -> Self {
        Self {
            fragment: fragment.into(),
        }
    }
}

impl Matcher for ContainsMatcher {
    fn matches(&self, path: &str) -> bool {
        path.contains(&self.fragment)
    }
}

/// Combines multiple matchers with OR semantics.
#[derive(Debug, Default)]
pub struct AnyMatcher {
    matchers: Vec<Box<dyn Matcher>>,
}

impl AnyMatcher {
    pub fn new(matchers: Vec<Box<dyn Matcher>>) -> Self {
        Self { matchers }
    }

    /// Paths that pass through the rate limiter: configured prefixes, or any
    /// configured substring anywhere in the path.
    pub fn rate_limited(config: &RateLimitConfig) -> Self {
        let prefixes = config
            .path_prefixes
            .iter()
            .map(|p| Box::new(PathPrefixMatcher::new(p.as_str())) as Box<dyn Matcher>);
        let substrings = config
            .path_substrings
            .iter()
            .filter(|s| !s.is_empty())
            .map(|s| Box::new(ContainsMatcher::new(s.as_str())) as Box<dyn Matcher>);
        Self::new(prefixes.chain(substrings).collect())
    }
}

impl Matcher for AnyMatcher {
    fn matches(&self, path: &str) -> bool {
        self.matchers.iter().any(|m| m.matches(path))
    }
}
