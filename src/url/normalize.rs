//! Canonical URL form used for frontier bookkeeping
//!
//! Two links that load the same page should map to the same visited key,
//! while anything that can change the served document (scheme, `www.`,
//! path case, meaningful query parameters) is kept.

use crate::UrlError;
use url::Url;

/// Query parameters added by ad and analytics tooling
const TRACKING_KEYS: &[&str] = &["fbclid", "gclid", "msclkid", "mc_cid", "mc_eid", "_ga"];

/// Prefixes of tracking query parameters
const TRACKING_PREFIXES: &[&str] = &["utm_"];

/// Normalizes a URL for frontier bookkeeping
///
/// # Normalization Steps
///
/// 1. Parse the URL (hosts of web URLs come out lowercase)
/// 2. Require an HTTP or HTTPS scheme and a host
/// 3. Resolve `.` and `..` segments, collapse repeated slashes and drop a
///    trailing slash (the root path stays `/`)
/// 4. Drop the fragment
/// 5. Drop tracking parameters and sort the rest by key
///
/// # Examples
///
/// ```
/// use sumi_mirror::url::normalize_url;
///
/// let url = normalize_url("http://WWW.EXAMPLE.COM/page/#top").unwrap();
/// assert_eq!(url.as_str(), "http://www.example.com/page");
/// ```
pub fn normalize_url(raw: &str) -> Result<Url, UrlError> {
    let mut url = Url::parse(raw).map_err(|e| UrlError::Parse(e.to_string()))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(UrlError::InvalidScheme(url.scheme().to_string()));
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err(UrlError::MissingDomain);
    }

    let path = canonical_path(url.path());
    url.set_path(&path);
    url.set_fragment(None);
    retain_meaningful_query(&mut url);

    Ok(url)
}

/// Key under which a URL is tracked in the visited set
///
/// URLs that cannot be normalized are keyed as given.
pub fn visited_key(url: &Url) -> String {
    match normalize_url(url.as_str()) {
        Ok(normalized) => normalized.into(),
        Err(_) => url.to_string(),
    }
}

fn canonical_path(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    format!("/{}", segments.join("/"))
}

fn is_tracking_key(key: &str) -> bool {
    TRACKING_KEYS.contains(&key) || TRACKING_PREFIXES.iter().any(|p| key.starts_with(p))
}

fn retain_meaningful_query(url: &mut Url) {
    if url.query().is_none() {
        return;
    }

    let mut pairs: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| !is_tracking_key(key))
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();

    if pairs.is_empty() {
        url.set_query(None);
        return;
    }

    // Stable: repeated keys keep their relative order
    pairs.sort_by(|a, b| a.0.cmp(&b.0));
    url.query_pairs_mut().clear().extend_pairs(pairs);
}
