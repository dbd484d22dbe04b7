//! Output module for crawl notifications and reports
//!
//! This module handles:
//! - Translating crawl state into progress, error and completion events
//! - Delivering events to observers (logs, channels, JSON lines)
//! - Printing statistics from the run manifest

mod observers;
mod reporter;
pub mod stats;
mod traits;

pub use observers::{ChannelObserver, CollectingObserver, JsonLinesObserver, TracingObserver};
pub use reporter::ProgressReporter;
pub use stats::{load_statistics, print_statistics, MirrorStatistics};
pub use traits::{
    CompletionSummary, CrawlEvent, ErrorNotice, ObserverError, ObserverResult, ProgressObserver,
    ProgressUpdate,
};
