//! Storage module for persisting mirrored content
//!
//! This module handles everything written to disk during a crawl:
//! - The [`ContentStore`] capability the crawler persists pages through
//! - A filesystem store with a deterministic, URL-derived layout
//! - The SQLite run manifest (runs and stored documents)

mod filesystem;
mod paths;
mod schema;
mod sqlite;
mod traits;

pub use filesystem::{rewrite_references, FsContentStore};
pub use paths::{interactive_elements_path, page_path, partial_path, resource_path, url_hash};
pub use sqlite::Manifest;
pub use traits::{ContentStore, StorageError, StorageResult, StoredDocument};

use crate::state::{CrawlCounters, SessionState};
use crate::MirrorError;
use std::path::Path;

/// Opens or creates the run manifest
///
/// # Arguments
///
/// * `path` - Path to the SQLite database file
///
/// # Returns
///
/// * `Ok(Manifest)` - Successfully initialized manifest
/// * `Err(MirrorError)` - Failed to initialize manifest
pub fn open_manifest(path: &Path) -> Result<Manifest, MirrorError> {
    Ok(Manifest::new(path)?)
}

/// Represents a crawl run in the manifest
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub id: i64,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub config_hash: String,
    pub seed_url: String,
    pub status: SessionState,
    pub counters: CrawlCounters,
}

/// Represents a stored document in the manifest
#[derive(Debug, Clone)]
pub struct DocumentRecord {
    pub id: i64,
    pub run_id: i64,
    pub url: String,
    pub kind: DocumentKind,
    pub path: String,
    pub content_hash: String,
    pub bytes: u64,
    pub stored_at: String,
}

/// What a stored document holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentKind {
    /// A fully loaded page
    Page,
    /// Markup captured before a page failed
    Partial,
    /// JSON dump of buttons, forms and modals
    InteractiveElements,
}

impl DocumentKind {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Page => "page",
            Self::Partial => "partial",
            Self::InteractiveElements => "interactive_elements",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "page" => Some(Self::Page),
            "partial" => Some(Self::Partial),
            "interactive_elements" => Some(Self::InteractiveElements),
            _ => None,
        }
    }
}
