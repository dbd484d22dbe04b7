//! Deterministic on-disk layout for mirrored documents
//!
//! Every location is derived from the URL alone:
//! - pages: `<root>/<host>/<url dir>/<hash>_<basename|index.html>[.html]`
//! - partial captures: `<root>/<host>/partial/<hash>_partial.html`
//! - interactive elements: `<root>/<host>/interactive_elements/<hash>_interactive_elements.json`
//! - resources: next to the page as `<hash>_<basename>`
//!
//! `<hash>` is the first 8 hex characters of the SHA-256 of the URL.

use crate::storage::traits::{StorageError, StorageResult};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use url::Url;

/// Longest file name written, in bytes
const MAX_FILE_NAME_LEN: usize = 100;

/// Short hash identifying a URL in file names
pub fn url_hash(url: &str) -> String {
    let digest = hex::encode(Sha256::digest(url.as_bytes()));
    digest[..8].to_string()
}

/// Location of a fully saved page
pub fn page_path(root: &Path, url: &Url) -> StorageResult<PathBuf> {
    let mut dir = host_dir(root, url)?;
    let mut segments: Vec<&str> = url
        .path_segments()
        .map(|s| s.collect())
        .unwrap_or_default();
    let basename = segments.pop().unwrap_or_default();

    for segment in segments {
        if let Some(segment) = sanitize_segment(segment) {
            dir.push(segment);
        }
    }

    let basename = match sanitize_segment(basename) {
        Some(name) => shorten_file_name(&name),
        None => "index.html".to_string(),
    };

    let mut file_name = format!("{}_{}", url_hash(url.as_str()), basename);
    if Path::new(&file_name).extension().is_none() {
        file_name.push_str(".html");
    }

    Ok(dir.join(file_name))
}

/// Location of the partial capture of a failed page
pub fn partial_path(root: &Path, url: &Url) -> StorageResult<PathBuf> {
    Ok(host_dir(root, url)?
        .join("partial")
        .join(format!("{}_partial.html", url_hash(url.as_str()))))
}

/// Location of the interactive element dump of a page
pub fn interactive_elements_path(root: &Path, url: &Url) -> StorageResult<PathBuf> {
    Ok(host_dir(root, url)?
        .join("interactive_elements")
        .join(format!("{}_interactive_elements.json", url_hash(url.as_str()))))
}

/// Location of a downloaded resource inside the directory of its page
pub fn resource_path(page_dir: &Path, resource: &Url) -> PathBuf {
    let basename = resource
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .and_then(sanitize_segment)
        .map(|name| shorten_file_name(&name))
        .unwrap_or_else(|| "resource".to_string());

    page_dir.join(format!("{}_{}", url_hash(resource.as_str()), basename))
}

fn host_dir(root: &Path, url: &Url) -> StorageResult<PathBuf> {
    let host = url
        .host_str()
        .and_then(sanitize_segment)
        .ok_or_else(|| StorageError::InvalidTarget(url.to_string()))?;
    Ok(root.join(host.to_lowercase()))
}

/// Turns a URL path segment into a safe path component
///
/// Returns `None` for empty, `.` and `..` segments.
fn sanitize_segment(segment: &str) -> Option<String> {
    if segment.is_empty() || segment == "." || segment == ".." {
        return None;
    }

    let cleaned: String = segment
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    Some(cleaned)
}

/// Shortens long file names while keeping their extension
fn shorten_file_name(name: &str) -> String {
    if name.len() <= MAX_FILE_NAME_LEN {
        return name.to_string();
    }

    let (stem, extension) = match name.rfind('.') {
        Some(idx) if idx > 0 && name.len() - idx <= 10 => (&name[..idx], &name[idx..]),
        _ => (name, ""),
    };

    let mut end = MAX_FILE_NAME_LEN - extension.len() - 9;
    while !stem.is_char_boundary(end) {
        end -= 1;
    }

    format!("{}_{}{}", &stem[..end], url_hash(name), extension)
}
