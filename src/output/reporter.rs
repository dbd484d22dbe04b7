//! Translation of crawl state into observer notifications

use crate::output::traits::{
    CompletionSummary, CrawlEvent, ErrorNotice, ProgressObserver, ProgressUpdate,
};
use crate::panic_message;
use crate::state::{CrawlBudget, CrawlCounters};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tracing::warn;

/// Fans crawl notifications out to every registered observer
///
/// Delivery failures are logged and swallowed, and so are observer panics;
/// reporting never fails a crawl.
#[derive(Clone, Default)]
pub struct ProgressReporter {
    observers: Vec<Arc<dyn ProgressObserver>>,
}

impl ProgressReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_observer(mut self, observer: Arc<dyn ProgressObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    pub fn add_observer(&mut self, observer: Arc<dyn ProgressObserver>) {
        self.observers.push(observer);
    }

    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }

    /// Builds the progress event for a page attempt
    pub fn progress_event(url: &str, counters: &CrawlCounters, budget: &CrawlBudget) -> CrawlEvent {
        CrawlEvent::Progress(ProgressUpdate {
            url: url.to_string(),
            pages_crawled: counters.pages_crawled,
            successful_pages: counters.successful_pages,
            failed_pages: counters.failed_pages,
            skipped_pages: counters.skipped_pages,
            progress_percent: budget.progress_percent(counters.pages_crawled),
        })
    }

    pub fn error_event(url: Option<&str>, message: impl Into<String>) -> CrawlEvent {
        CrawlEvent::Error(ErrorNotice {
            url: url.map(str::to_string),
            message: message.into(),
        })
    }

    pub fn complete_event(counters: &CrawlCounters) -> CrawlEvent {
        CrawlEvent::Complete(CompletionSummary {
            pages_crawled: counters.pages_crawled,
            successful_pages: counters.successful_pages,
            failed_pages: counters.failed_pages,
            skipped_pages: counters.skipped_pages,
        })
    }

    pub fn progress(&self, url: &str, counters: &CrawlCounters, budget: &CrawlBudget) {
        self.dispatch(&Self::progress_event(url, counters, budget));
    }

    pub fn error(&self, url: Option<&str>, message: impl Into<String>) {
        self.dispatch(&Self::error_event(url, message));
    }

    pub fn complete(&self, counters: &CrawlCounters) {
        self.dispatch(&Self::complete_event(counters));
    }

    fn dispatch(&self, event: &CrawlEvent) {
        for observer in &self.observers {
            match panic::catch_unwind(AssertUnwindSafe(|| observer.deliver(event))) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!("Failed to deliver crawl event: {}", e),
                Err(payload) => warn!(
                    "Observer panicked while handling a crawl event: {}",
                    panic_message(payload.as_ref())
                ),
            }
        }
    }
}
