//! Budget and counters for a single crawl session
use serde::{Deserialize, Serialize};

/// Limits bounding one crawl session; fixed once the session starts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrawlBudget {
    /// Maximum number of link hops from the seed URL
    pub max_depth: u32,

    /// Maximum number of pages attempted (successes plus failures)
    pub max_pages: u32,
}

impl CrawlBudget {
    pub fn new(max_depth: u32, max_pages: u32) -> Self {
        Self {
            max_depth,
            max_pages,
        }
    }

    /// Returns true once `pages_crawled` attempts have used up the page budget
    pub fn is_exhausted(&self, pages_crawled: u32) -> bool {
        pages_crawled >= self.max_pages
    }

    /// Returns true if an entry at `depth` lies within the depth budget
    pub fn allows_depth(&self, depth: u32) -> bool {
        depth <= self.max_depth
    }

    /// Share of the page budget used, in percent
    pub fn progress_percent(&self, pages_crawled: u32) -> f64 {
        if self.max_pages == 0 {
            return 100.0;
        }
        (pages_crawled as f64 / self.max_pages as f64) * 100.0
    }
}

/// Tallies of one crawl session
///
/// Only the coordinator mutates these and every field only ever grows.
/// `pages_crawled` counts attempts (successes plus failures); skips are
/// counted separately and never consume the page budget.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrawlCounters {
    pub pages_crawled: u32,
    pub successful_pages: u32,
    pub failed_pages: u32,
    pub skipped_pages: u32,
}

impl CrawlCounters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_success(&mut self) {
        self.pages_crawled += 1;
        self.successful_pages += 1;
    }

    pub fn record_failure(&mut self) {
        self.pages_crawled += 1;
        self.failed_pages += 1;
    }

    pub fn record_skip(&mut self) {
        self.skipped_pages += 1;
    }
}
