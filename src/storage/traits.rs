//! Content store trait and error types
//!
//! The crawler persists pages only through [`ContentStore`], so storage
//! backends can be swapped without touching the crawl loop.

use crate::driver::InteractiveElement;
use crate::storage::DocumentKind;
use async_trait::async_trait;
use std::path::PathBuf;
use thiserror::Error;
use url::Url;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Cannot derive a storage location for {0}")]
    InvalidTarget(String),

    #[error("Manifest error: {0}")]
    Manifest(String),

    #[error("Resource download failed: {0}")]
    Download(#[from] reqwest::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// A document written by a content store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredDocument {
    /// URL the document was captured from
    pub url: String,

    pub kind: DocumentKind,

    /// Location of the written file
    pub path: PathBuf,

    /// Hex SHA-256 of the written bytes
    pub content_hash: String,

    /// Size of the written file in bytes
    pub bytes: u64,
}

/// Durable sink for page content
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Persists a fully loaded page together with its resources
    ///
    /// # Arguments
    ///
    /// * `url` - The page URL
    /// * `content` - Rendered markup of the page
    /// * `resources` - Absolute resource URLs referenced by the page
    async fn save(
        &self,
        url: &Url,
        content: &str,
        resources: &[String],
    ) -> StorageResult<StoredDocument>;

    /// Persists whatever markup was captured before a page failed
    async fn save_partial(&self, url: &Url, content: &str) -> StorageResult<StoredDocument>;

    /// Persists the interactive elements found on a page
    async fn save_interactive_elements(
        &self,
        url: &Url,
        elements: &[InteractiveElement],
    ) -> StorageResult<PathBuf>;
}
