//! Crawler module for bounded breadth-first site mirroring
//!
//! This module contains the core crawling logic, including:
//! - The breadth-first frontier and visited set
//! - Per-page processing (navigate, settle, capture, persist, extract)
//! - Overall crawl coordination and session lifecycle
//! - Cooperative stop handles for running sessions

mod coordinator;
mod frontier;
mod processor;
mod session;

pub use coordinator::Coordinator;
pub use frontier::{Frontier, FrontierEntry};
pub use processor::{FailureReason, PageOutcome, PageProcessor, SkipCause};
pub use session::{CrawlReport, CrawlSession, StopHandle};

use crate::config::Config;
use crate::driver::{HttpDriver, LoginCredentials, PageDriver};
use crate::output::ProgressReporter;
use crate::state::CrawlBudget;
use crate::storage::ContentStore;
use crate::MirrorError;
use std::sync::Arc;
use url::Url;

/// Starts a crawl session on its own tokio task
///
/// This is the main entry point for running a crawl. The session:
/// 1. Seeds the frontier with `seed` at depth 0
/// 2. Processes pages breadth-first within `budget`
/// 3. Persists every page through `store`
/// 4. Reports progress, errors and completion through `reporter`
/// 5. Releases `driver` when it ends, whatever the reason
///
/// Must be called from within a tokio runtime.
///
/// # Arguments
///
/// * `seed` - The URL the crawl starts from
/// * `budget` - Depth and page limits
/// * `driver` - The page driver used for every page
/// * `store` - Where pages are persisted
/// * `reporter` - Event fan-out to observers
///
/// # Returns
///
/// A [`CrawlSession`] that can be stopped or awaited
pub fn start(
    seed: Url,
    budget: CrawlBudget,
    driver: Box<dyn PageDriver>,
    store: Arc<dyn ContentStore>,
    reporter: ProgressReporter,
) -> CrawlSession {
    CrawlSession::spawn(Coordinator::new(seed, budget, driver, store, reporter))
}

/// Builds a coordinator wired to an [`HttpDriver`] from a loaded config
///
/// Applies the settle time, link scope, interactive capture and login
/// settings of `config`.
///
/// # Returns
///
/// * `Ok(Coordinator)` - Ready to run or spawn
/// * `Err(MirrorError)` - The HTTP client or login settings were invalid
pub fn coordinator_from_config(
    config: &Config,
    seed: Url,
    budget: CrawlBudget,
    store: Arc<dyn ContentStore>,
    reporter: ProgressReporter,
) -> Result<Coordinator, MirrorError> {
    let driver = HttpDriver::from_config(config)?;
    let processor = PageProcessor::from_config(&config.crawler, &config.scope);

    let mut coordinator = Coordinator::new(seed, budget, Box::new(driver), store, reporter)
        .with_processor(processor);

    if let Some(login) = &config.login {
        coordinator = coordinator.with_login(LoginCredentials::from_config(login)?);
    }

    Ok(coordinator)
}
