//! URL handling module for Sumi-Mirror
//!
//! This module provides URL normalization, domain extraction, wildcard matching,
//! and the link scope that decides which discovered links are followed.

mod matcher;
mod normalize;

use crate::config::ScopeConfig;
use ::url::Url;

// Re-export main functions
pub use matcher::matches_wildcard;
pub use normalize::{normalize_url, visited_key};

/// Extracts the lowercase host of a URL
///
/// Returns `None` for URLs without a host (e.g. `data:` URLs).
pub fn extract_domain(url: &Url) -> Option<String> {
    url.host_str().map(|h| h.to_lowercase())
}

/// Returns true if the URL is absolute and uses HTTP or HTTPS
pub fn is_web_url(url: &Url) -> bool {
    matches!(url.scheme(), "http" | "https")
}

/// Host-based filter applied to every discovered link
///
/// Patterns are checked in the following priority order:
/// 1. Deny list (highest priority)
/// 2. Allow list
/// 3. Anything else is followed when the allow list is empty
#[derive(Debug, Clone, Default)]
pub struct LinkScope {
    allow: Vec<String>,
    deny: Vec<String>,
}

impl LinkScope {
    /// A scope that follows every HTTP(S) link
    pub fn unrestricted() -> Self {
        Self::default()
    }

    pub fn new(allow: Vec<String>, deny: Vec<String>) -> Self {
        Self {
            allow: allow.into_iter().map(|p| p.to_lowercase()).collect(),
            deny: deny.into_iter().map(|p| p.to_lowercase()).collect(),
        }
    }

    pub fn from_config(config: &ScopeConfig) -> Self {
        Self::new(config.allow.clone(), config.deny.clone())
    }

    /// Returns true if the link should be followed
    ///
    /// # Examples
    ///
    /// ```
    /// use sumi_mirror::url::LinkScope;
    /// use url::Url;
    ///
    /// let scope = LinkScope::new(vec!["*.example.com".into()], vec!["ads.example.com".into()]);
    /// assert!(scope.permits(&Url::parse("https://blog.example.com/").unwrap()));
    /// assert!(!scope.permits(&Url::parse("https://ads.example.com/").unwrap()));
    /// assert!(!scope.permits(&Url::parse("https://other.org/").unwrap()));
    /// ```
    pub fn permits(&self, url: &Url) -> bool {
        if !is_web_url(url) {
            return false;
        }

        let domain = match extract_domain(url) {
            Some(d) => d,
            None => return false,
        };

        if self.deny.iter().any(|p| matches_wildcard(p, &domain)) {
            return false;
        }

        self.allow.is_empty() || self.allow.iter().any(|p| matches_wildcard(p, &domain))
    }

    pub fn is_unrestricted(&self) -> bool {
        self.allow.is_empty() && self.deny.is_empty()
    }
}
