//! Observer trait and crawl event types
//!
//! This module defines the sink interface progress notifications are
//! delivered to, and the serializable event records carried over it.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors an observer can report while delivering an event
#[derive(Debug, Error)]
pub enum ObserverError {
    #[error("Observer channel closed")]
    Closed,

    #[error("Observer channel full, event dropped")]
    Full,

    #[error("Failed to write event: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to serialize event: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for observer operations
pub type ObserverResult<T> = Result<T, ObserverError>;

/// Progress after one page attempt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressUpdate {
    /// The page that was just attempted
    pub url: String,
    pub pages_crawled: u32,
    pub successful_pages: u32,
    pub failed_pages: u32,
    pub skipped_pages: u32,

    /// `pages_crawled / max_pages * 100`
    pub progress_percent: f64,
}

/// A human-readable crawl error
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorNotice {
    /// The page the error belongs to, if any
    pub url: Option<String>,
    pub message: String,
}

/// Final counters of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionSummary {
    pub pages_crawled: u32,
    pub successful_pages: u32,
    pub failed_pages: u32,
    pub skipped_pages: u32,
}

/// Notification emitted by a crawl session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum CrawlEvent {
    #[serde(rename = "crawl_progress")]
    Progress(ProgressUpdate),

    #[serde(rename = "crawl_error")]
    Error(ErrorNotice),

    #[serde(rename = "crawl_complete")]
    Complete(CompletionSummary),
}

/// Sink receiving crawl notifications
///
/// Delivery happens on the crawl task, so implementations should return
/// quickly. Errors are reported back to the caller, which logs and drops them.
pub trait ProgressObserver: Send + Sync {
    fn on_progress(&self, update: &ProgressUpdate) -> ObserverResult<()>;

    fn on_error(&self, notice: &ErrorNotice) -> ObserverResult<()>;

    fn on_complete(&self, summary: &CompletionSummary) -> ObserverResult<()>;

    /// Routes an event to the matching callback
    fn deliver(&self, event: &CrawlEvent) -> ObserverResult<()> {
        match event {
            CrawlEvent::Progress(update) => self.on_progress(update),
            CrawlEvent::Error(notice) => self.on_error(notice),
            CrawlEvent::Complete(summary) => self.on_complete(summary),
        }
    }
}
