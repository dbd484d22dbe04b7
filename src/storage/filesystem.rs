//! Filesystem content store
//!
//! Writes pages, partial captures and interactive element dumps under a
//! download root (see `paths` for the layout), optionally downloads page
//! resources next to each page, and records every written document in the
//! run manifest when one is attached.

use crate::driver::InteractiveElement;
use crate::storage::paths;
use crate::storage::traits::{ContentStore, StorageError, StorageResult, StoredDocument};
use crate::storage::{DocumentKind, Manifest};
use async_trait::async_trait;
use regex::{Captures, Regex};
use reqwest::Client;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock, Mutex};
use tokio::fs;
use tracing::{debug, info, warn};
use url::Url;

/// Matches `href`/`src` attributes with a quoted value
static REFERENCE_ATTR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)(\s)(href|src)\s*=\s*(?:"([^"]*)"|'([^']*)')"#)
        .expect("hardcoded reference attribute regex is valid")
});

/// Content store writing into a local directory tree
pub struct FsContentStore {
    root: PathBuf,
    client: Option<Client>,
    manifest: Option<(Arc<Mutex<Manifest>>, i64)>,
}

impl FsContentStore {
    /// Creates a store rooted at `root` that does not download resources
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            client: None,
            manifest: None,
        }
    }

    /// Downloads page resources with `client` on every save
    pub fn with_resource_client(mut self, client: Client) -> Self {
        self.client = Some(client);
        self
    }

    /// Records written documents under `run_id` in `manifest`
    pub fn with_manifest(mut self, manifest: Arc<Mutex<Manifest>>, run_id: i64) -> Self {
        self.manifest = Some((manifest, run_id));
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    async fn write_document(
        &self,
        url: &Url,
        kind: DocumentKind,
        path: &Path,
        content: &[u8],
    ) -> StorageResult<StoredDocument> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(path, content).await?;

        let document = StoredDocument {
            url: url.to_string(),
            kind,
            path: path.to_path_buf(),
            content_hash: hex::encode(Sha256::digest(content)),
            bytes: content.len() as u64,
        };
        self.record(&document);
        Ok(document)
    }

    /// Manifest failures never fail a save
    fn record(&self, document: &StoredDocument) {
        let Some((manifest, run_id)) = &self.manifest else {
            return;
        };

        match manifest.lock() {
            Ok(mut manifest) => {
                if let Err(e) = manifest.record_document(*run_id, document) {
                    warn!("Failed to record {} in manifest: {}", document.url, e);
                }
            }
            Err(_) => warn!("Manifest lock poisoned, {} not recorded", document.url),
        }
    }

    async fn download_resources(&self, client: &Client, page_dir: &Path, resources: &[String]) {
        for resource in resources {
            match download_resource(client, page_dir, resource).await {
                Ok(path) => debug!("Saved resource: {} to {}", resource, path.display()),
                Err(e) => warn!("Error saving resource {}: {}", resource, e),
            }
        }
    }
}

async fn download_resource(client: &Client, page_dir: &Path, resource: &str) -> StorageResult<PathBuf> {
    let url =
        Url::parse(resource).map_err(|_| StorageError::InvalidTarget(resource.to_string()))?;
    let target = paths::resource_path(page_dir, &url);

    let bytes = client
        .get(url)
        .send()
        .await?
        .error_for_status()?
        .bytes()
        .await?;

    fs::write(&target, &bytes).await?;
    Ok(target)
}

/// Rewrites relative `href`/`src` values to absolute URLs against `base`
///
/// Values that already carry a scheme, protocol-relative values and
/// fragment-only anchors are left untouched.
pub fn rewrite_references(html: &str, base: &Url) -> String {
    REFERENCE_ATTR
        .replace_all(html, |caps: &Captures<'_>| {
            let (value, quote) = match (caps.get(3), caps.get(4)) {
                (Some(v), _) => (v.as_str(), '"'),
                (None, Some(v)) => (v.as_str(), '\''),
                _ => return caps[0].to_string(),
            };

            match absolutize(value, base) {
                Some(absolute) => {
                    format!("{}{}={q}{}{q}", &caps[1], &caps[2], absolute, q = quote)
                }
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

fn absolutize(value: &str, base: &Url) -> Option<String> {
    let value = value.trim();
    if value.is_empty()
        || value.starts_with("//")
        || value.starts_with('#')
        || Url::parse(value).is_ok()
    {
        return None;
    }
    base.join(value).ok().map(String::from)
}

#[async_trait]
impl ContentStore for FsContentStore {
    async fn save(
        &self,
        url: &Url,
        content: &str,
        resources: &[String],
    ) -> StorageResult<StoredDocument> {
        let path = paths::page_path(&self.root, url)?;
        let html = rewrite_references(content, url);
        let document = self
            .write_document(url, DocumentKind::Page, &path, html.as_bytes())
            .await?;
        info!("Saved: {} to {}", url, path.display());

        if let (Some(client), Some(page_dir)) = (&self.client, path.parent()) {
            self.download_resources(client, page_dir, resources).await;
        }

        Ok(document)
    }

    async fn save_partial(&self, url: &Url, content: &str) -> StorageResult<StoredDocument> {
        let path = paths::partial_path(&self.root, url)?;
        let document = self
            .write_document(url, DocumentKind::Partial, &path, content.as_bytes())
            .await?;
        info!("Saved partial content for {} to {}", url, path.display());
        Ok(document)
    }

    async fn save_interactive_elements(
        &self,
        url: &Url,
        elements: &[InteractiveElement],
    ) -> StorageResult<PathBuf> {
        let path = paths::interactive_elements_path(&self.root, url)?;
        let json = serde_json::to_string_pretty(elements)?;
        self.write_document(url, DocumentKind::InteractiveElements, &path, json.as_bytes())
            .await?;
        debug!("Saved interactive elements for {} to {}", url, path.display());
        Ok(path)
    }
}
