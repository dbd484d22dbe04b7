//! Single-page pipeline: load, settle, capture, persist, expand
//!
//! The processor never fails. Every per-page problem is folded into a
//! [`PageOutcome::Failure`] so the crawl loop can record it and move on.

use crate::config::{CrawlerConfig, ScopeConfig};
use crate::driver::PageDriver;
use crate::storage::{ContentStore, StoredDocument};
use crate::url::{normalize_url, visited_key, LinkScope};
use std::collections::HashSet;
use std::fmt;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// Why a page attempt failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureReason {
    /// The page could not be loaded
    Navigation,
    /// The page loaded but could not be stored
    Persistence,
    /// Content, resources or links could not be read from the page
    Extraction,
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Navigation => write!(f, "navigation"),
            Self::Persistence => write!(f, "persistence"),
            Self::Extraction => write!(f, "extraction"),
        }
    }
}

/// Why a popped frontier entry was not attempted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipCause {
    AlreadyVisited,
    DepthExceeded,
}

impl fmt::Display for SkipCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadyVisited => write!(f, "already visited"),
            Self::DepthExceeded => write!(f, "depth exceeded"),
        }
    }
}

/// Result of handling one frontier entry
#[derive(Debug, Clone)]
pub enum PageOutcome {
    Success {
        content: String,
        resources: Vec<String>,
        /// Normalized, in-scope links in first-seen order
        links: Vec<Url>,
        document: StoredDocument,
        /// Where the page was served from, when a redirect moved it
        landed_url: Option<Url>,
    },
    Failure {
        reason: FailureReason,
        message: String,
        /// Markup captured before the failure, if any
        partial_content: Option<String>,
    },
    Skipped {
        cause: SkipCause,
    },
}

impl PageOutcome {
    fn failure(reason: FailureReason, message: impl fmt::Display, partial: Option<String>) -> Self {
        Self::Failure {
            reason,
            message: message.to_string(),
            partial_content: partial,
        }
    }
}

/// Runs the page pipeline against a driver and a store
#[derive(Debug, Clone, Default)]
pub struct PageProcessor {
    settle_time: Duration,
    scope: LinkScope,
    capture_interactive: bool,
}

impl PageProcessor {
    /// Creates a processor that follows every web link and skips
    /// interactive element capture
    pub fn new(settle_time: Duration) -> Self {
        Self {
            settle_time,
            ..Self::default()
        }
    }

    pub fn from_config(crawler: &CrawlerConfig, scope: &ScopeConfig) -> Self {
        Self {
            settle_time: Duration::from_millis(crawler.settle_time),
            scope: LinkScope::from_config(scope),
            capture_interactive: crawler.capture_interactive,
        }
    }

    pub fn with_scope(mut self, scope: LinkScope) -> Self {
        self.scope = scope;
        self
    }

    pub fn with_interactive_capture(mut self, enabled: bool) -> Self {
        self.capture_interactive = enabled;
        self
    }

    pub fn settle_time(&self) -> Duration {
        self.settle_time
    }

    /// Handles one URL
    ///
    /// # Pipeline
    ///
    /// 1. Navigate (failure → `Navigation`)
    /// 2. Dismiss overlays (failures only logged)
    /// 3. Wait for the settle time
    /// 4. Read content and resources (failure → `Extraction`)
    /// 5. Save the page (failure → `Persistence`)
    /// 6. Read, normalize, scope-filter and de-duplicate links
    /// 7. Capture interactive elements (failures only logged)
    pub async fn process(
        &self,
        driver: &mut dyn PageDriver,
        store: &dyn ContentStore,
        url: &Url,
    ) -> PageOutcome {
        if let Err(e) = driver.navigate(url).await {
            let partial = driver.content().await.ok().filter(|c| !c.is_empty());
            return PageOutcome::failure(FailureReason::Navigation, e, partial);
        }

        if let Err(e) = driver.dismiss_overlays().await {
            warn!("Failed to dismiss overlays on {}: {}", url, e);
        }

        if !self.settle_time.is_zero() {
            tokio::time::sleep(self.settle_time).await;
        }

        let content = match driver.content().await {
            Ok(content) => content,
            Err(e) => return PageOutcome::failure(FailureReason::Extraction, e, None),
        };

        let resources = match driver.resources().await {
            Ok(resources) => resources,
            Err(e) => return PageOutcome::failure(FailureReason::Extraction, e, Some(content)),
        };

        let document = match store.save(url, &content, &resources).await {
            Ok(document) => document,
            Err(e) => return PageOutcome::failure(FailureReason::Persistence, e, Some(content)),
        };

        let raw_links = match driver.links().await {
            Ok(links) => links,
            Err(e) => return PageOutcome::failure(FailureReason::Extraction, e, Some(content)),
        };
        let links = self.filter_links(raw_links);
        let landed_url = driver
            .current_url()
            .filter(|landed| visited_key(landed) != visited_key(url));

        if self.capture_interactive {
            self.capture_interactive_elements(driver, store, url).await;
        }

        debug!(
            "Processed {}: {} resources, {} links",
            url,
            resources.len(),
            links.len()
        );

        PageOutcome::Success {
            content,
            resources,
            links,
            document,
            landed_url,
        }
    }

    /// Keeps normalized, in-scope HTTP(S) links, first occurrence wins
    fn filter_links(&self, raw_links: Vec<String>) -> Vec<Url> {
        let mut seen = HashSet::new();
        raw_links
            .iter()
            .filter_map(|link| normalize_url(link).ok())
            .filter(|link| self.scope.permits(link))
            .filter(|link| seen.insert(visited_key(link)))
            .collect()
    }

    async fn capture_interactive_elements(
        &self,
        driver: &mut dyn PageDriver,
        store: &dyn ContentStore,
        url: &Url,
    ) {
        let elements = match driver.interactive_elements().await {
            Ok(elements) => elements,
            Err(e) => {
                warn!("Failed to extract interactive elements from {}: {}", url, e);
                return;
            }
        };

        if elements.is_empty() {
            return;
        }

        if let Err(e) = store.save_interactive_elements(url, &elements).await {
            warn!("Failed to save interactive elements for {}: {}", url, e);
        }
    }
}
