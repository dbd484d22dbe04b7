//! Handles for a running crawl
//!
//! A [`CrawlSession`] owns the spawned crawl task. Stopping is cooperative:
//! the flag is checked before every frontier pop, so the page in flight
//! always finishes and is recorded.

use crate::crawler::coordinator::Coordinator;
use crate::state::{CrawlCounters, SessionState};
use crate::MirrorError;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Cloneable stop signal shared with a crawl
#[derive(Debug, Clone, Default)]
pub struct StopHandle {
    flag: Arc<AtomicBool>,
}

impl StopHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests the crawl to stop before its next page
    pub fn stop(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Final account of a crawl session
#[derive(Debug, Clone)]
pub struct CrawlReport {
    pub seed: String,
    pub state: SessionState,
    pub counters: CrawlCounters,

    /// URLs attempted during the session
    pub visited: usize,

    /// Entries still queued when the loop ended
    pub frontier_remaining: usize,
    pub elapsed: Duration,
}

/// A crawl running on its own tokio task
pub struct CrawlSession {
    stop: StopHandle,
    task: JoinHandle<CrawlReport>,
}

impl CrawlSession {
    /// Spawns `coordinator` onto the current tokio runtime
    pub fn spawn(coordinator: Coordinator) -> Self {
        let stop = coordinator.stop_handle();
        let task = tokio::spawn(coordinator.run());
        Self { stop, task }
    }

    /// Requests a cooperative stop
    pub fn stop(&self) {
        self.stop.stop();
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Waits for the crawl task and returns its report
    pub async fn wait(self) -> Result<CrawlReport, MirrorError> {
        Ok(self.task.await?)
    }
}
