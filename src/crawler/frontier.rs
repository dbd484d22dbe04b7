//! Breadth-first frontier with a visited set
//!
//! The queue is strict FIFO. Visited keys are normalized URLs (see
//! [`visited_key`]) and are added when a page is attempted, not when it is
//! queued, so a URL found on two pages before either is processed can sit in
//! the queue twice. The coordinator skips the second copy when it pops it.

use crate::url::visited_key;
use std::collections::{HashSet, VecDeque};
use url::Url;

/// A URL waiting to be crawled
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrontierEntry {
    pub url: Url,

    /// Link hops from the seed URL
    pub depth: u32,
}

/// FIFO queue of pending URLs plus the set of attempted ones
#[derive(Debug, Default)]
pub struct Frontier {
    queue: VecDeque<FrontierEntry>,
    visited: HashSet<String>,
}

impl Frontier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues the seed at depth 0 without consulting the visited set
    pub fn seed(&mut self, url: Url) {
        self.queue.push_back(FrontierEntry { url, depth: 0 });
    }

    /// Queues `url` unless it was already attempted
    ///
    /// # Returns
    ///
    /// `true` if the URL was queued
    pub fn enqueue(&mut self, url: Url, depth: u32) -> bool {
        if self.is_visited(&url) {
            return false;
        }
        self.queue.push_back(FrontierEntry { url, depth });
        true
    }

    pub fn pop_next(&mut self) -> Option<FrontierEntry> {
        self.queue.pop_front()
    }

    pub fn is_visited(&self, url: &Url) -> bool {
        self.visited.contains(&visited_key(url))
    }

    /// Records an attempt; returns `false` if the URL was already recorded
    pub fn mark_visited(&mut self, url: &Url) -> bool {
        self.visited.insert(visited_key(url))
    }

    /// Number of queued entries
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn visited_count(&self) -> usize {
        self.visited.len()
    }
}
