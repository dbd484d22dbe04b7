//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `CrawlBudget`: the immutable depth/page limits of a session
//! - `CrawlCounters`: the monotonically growing per-session tallies
//! - `SessionState`: the lifecycle of a single crawl session

mod counters;
mod session_state;

// Re-export main types
pub use counters::{CrawlBudget, CrawlCounters};
pub use session_state::SessionState;
