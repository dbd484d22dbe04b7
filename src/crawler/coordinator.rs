//! Crawler coordinator - main crawl orchestration logic
//!
//! This module contains the main crawl loop that coordinates all aspects of
//! the crawling process, including:
//! - Seeding and draining the frontier breadth-first
//! - Enforcing the depth and page budget
//! - Folding page outcomes into counters and the frontier
//! - Honoring stop requests between pages
//! - Releasing the page driver and reporting completion on every exit path

use crate::crawler::frontier::{Frontier, FrontierEntry};
use crate::crawler::processor::{PageOutcome, PageProcessor, SkipCause};
use crate::crawler::session::{CrawlReport, StopHandle};
use crate::driver::{LoginCredentials, PageDriver};
use crate::output::ProgressReporter;
use crate::state::{CrawlBudget, CrawlCounters, SessionState};
use crate::storage::ContentStore;
use crate::{panic_message, MirrorError};
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};
use url::Url;

/// Main crawler coordinator structure
///
/// Owns the frontier, the counters and the page driver of one session.
/// [`Coordinator::run`] consumes it, so a session can only run once.
pub struct Coordinator {
    seed: Url,
    budget: CrawlBudget,
    driver: Box<dyn PageDriver>,
    store: Arc<dyn ContentStore>,
    reporter: ProgressReporter,
    processor: PageProcessor,
    login: Option<LoginCredentials>,
    frontier: Frontier,
    counters: CrawlCounters,
    state: SessionState,
    stop: StopHandle,
}

impl Coordinator {
    /// Creates a new coordinator instance
    ///
    /// # Arguments
    ///
    /// * `seed` - The URL the crawl starts from (depth 0)
    /// * `budget` - Depth and page limits for the session
    /// * `driver` - The page driver used for every page
    /// * `store` - Where pages are persisted
    /// * `reporter` - Receives progress, error and completion events
    pub fn new(
        seed: Url,
        budget: CrawlBudget,
        driver: Box<dyn PageDriver>,
        store: Arc<dyn ContentStore>,
        reporter: ProgressReporter,
    ) -> Self {
        Self {
            seed,
            budget,
            driver,
            store,
            reporter,
            processor: PageProcessor::default(),
            login: None,
            frontier: Frontier::new(),
            counters: CrawlCounters::new(),
            state: SessionState::Idle,
            stop: StopHandle::new(),
        }
    }

    pub fn with_processor(mut self, processor: PageProcessor) -> Self {
        self.processor = processor;
        self
    }

    /// Logs in with `credentials` before the first page
    pub fn with_login(mut self, credentials: LoginCredentials) -> Self {
        self.login = Some(credentials);
        self
    }

    /// Shares an existing stop handle instead of the coordinator's own
    pub fn with_stop_handle(mut self, stop: StopHandle) -> Self {
        self.stop = stop;
        self
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn counters(&self) -> CrawlCounters {
        self.counters
    }

    /// Runs the session to a terminal state
    ///
    /// Whatever happens inside the loop (including a panic in a driver or
    /// store), the driver is released and exactly one completion event is
    /// emitted before the report is returned.
    pub async fn run(mut self) -> CrawlReport {
        let start_time = Instant::now();
        self.transition(SessionState::Running);
        info!(
            "Starting crawl from {} (max depth {}, max pages {})",
            self.seed, self.budget.max_depth, self.budget.max_pages
        );

        let result = AssertUnwindSafe(self.drive()).catch_unwind().await;
        let final_state = match result {
            Ok(Ok(state)) => state,
            Ok(Err(e)) => {
                error!("Crawl failed: {}", e);
                self.reporter.error(None, format!("Crawl failed: {}", e));
                SessionState::Fatal
            }
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                error!("Crawl aborted by panic: {}", message);
                self.reporter
                    .error(None, format!("Crawl aborted: {}", message));
                SessionState::Fatal
            }
        };
        self.transition(final_state);

        match AssertUnwindSafe(self.driver.release()).catch_unwind().await {
            Ok(Ok(())) => debug!("Page driver released"),
            Ok(Err(e)) => warn!("Failed to release page driver: {}", e),
            Err(panic) => warn!(
                "Page driver panicked during release: {}",
                panic_message(panic.as_ref())
            ),
        }

        self.reporter.complete(&self.counters);

        info!(
            "Crawl {}: {} pages crawled ({} successful, {} failed, {} skipped) in {:?}",
            self.state,
            self.counters.pages_crawled,
            self.counters.successful_pages,
            self.counters.failed_pages,
            self.counters.skipped_pages,
            start_time.elapsed()
        );

        CrawlReport {
            seed: self.seed.to_string(),
            state: self.state,
            counters: self.counters,
            visited: self.frontier.visited_count(),
            frontier_remaining: self.frontier.len(),
            elapsed: start_time.elapsed(),
        }
    }

    /// The crawl loop; returns the terminal state it ended in
    async fn drive(&mut self) -> Result<SessionState, MirrorError> {
        if let Some(credentials) = &self.login {
            info!("Authenticating at {}", credentials.login_url);
            self.driver
                .authenticate(credentials)
                .await
                .map_err(|e| MirrorError::Authentication(e.to_string()))?;
        }

        self.frontier.seed(self.seed.clone());

        loop {
            if self.stop.is_stopped() {
                info!("Stop requested, ending crawl");
                return Ok(SessionState::Stopped);
            }

            if self.budget.is_exhausted(self.counters.pages_crawled) {
                info!("Page budget of {} reached", self.budget.max_pages);
                return Ok(SessionState::Completed);
            }

            let Some(entry) = self.frontier.pop_next() else {
                info!("Frontier is empty, crawl complete");
                return Ok(SessionState::Completed);
            };

            let outcome = match self.skip_cause(&entry) {
                Some(cause) => PageOutcome::Skipped { cause },
                None => {
                    debug!("Processing URL: {} (depth {})", entry.url, entry.depth);
                    self.processor
                        .process(self.driver.as_mut(), self.store.as_ref(), &entry.url)
                        .await
                }
            };

            self.apply_outcome(entry, outcome).await;
        }
    }

    fn skip_cause(&self, entry: &FrontierEntry) -> Option<SkipCause> {
        if self.frontier.is_visited(&entry.url) {
            Some(SkipCause::AlreadyVisited)
        } else if !self.budget.allows_depth(entry.depth) {
            Some(SkipCause::DepthExceeded)
        } else {
            None
        }
    }

    /// Folds one outcome into the frontier, the counters and the reporter
    async fn apply_outcome(&mut self, entry: FrontierEntry, outcome: PageOutcome) {
        match outcome {
            PageOutcome::Skipped { cause } => {
                self.counters.record_skip();
                debug!("Skipping {} at depth {}: {}", entry.url, entry.depth, cause);
            }

            PageOutcome::Success {
                links, landed_url, ..
            } => {
                self.frontier.mark_visited(&entry.url);
                if let Some(landed) = &landed_url {
                    debug!("{} was served from {}", entry.url, landed);
                    self.frontier.mark_visited(landed);
                }
                self.counters.record_success();

                let discovered = links.len();
                let queued = links
                    .into_iter()
                    .filter(|link| self.frontier.enqueue(link.clone(), entry.depth + 1))
                    .count();
                debug!(
                    "{}: {} links discovered, {} queued",
                    entry.url, discovered, queued
                );

                self.reporter
                    .progress(entry.url.as_str(), &self.counters, &self.budget);
            }

            PageOutcome::Failure {
                reason,
                message,
                partial_content,
            } => {
                self.frontier.mark_visited(&entry.url);
                self.counters.record_failure();

                warn!("Error crawling {} ({}): {}", entry.url, reason, message);
                self.reporter.error(
                    Some(entry.url.as_str()),
                    format!("Error crawling {}: {}", entry.url, message),
                );

                if let Some(content) = partial_content {
                    if let Err(e) = self.store.save_partial(&entry.url, &content).await {
                        warn!("Failed to save partial content for {}: {}", entry.url, e);
                    }
                }

                self.reporter
                    .progress(entry.url.as_str(), &self.counters, &self.budget);
            }
        }
    }

    fn transition(&mut self, next: SessionState) {
        if self.state.can_transition_to(next) {
            debug!("Session {} -> {}", self.state, next);
            self.state = next;
        } else {
            let e = MirrorError::InvalidTransition {
                from: self.state,
                to: next,
            };
            error!("{}", e);
        }
    }
}
