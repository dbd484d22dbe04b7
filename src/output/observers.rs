//! Ready-made progress observers
//!
//! - [`TracingObserver`] logs every event through `tracing`
//! - [`ChannelObserver`] forwards events into a tokio channel
//! - [`JsonLinesObserver`] writes one JSON object per event
//! - [`CollectingObserver`] keeps events in memory

use crate::output::traits::{
    CompletionSummary, CrawlEvent, ErrorNotice, ObserverError, ObserverResult, ProgressObserver,
    ProgressUpdate,
};
use std::io::{self, Write};
use std::sync::Mutex;
use tokio::sync::mpsc::{self, error::TrySendError, Receiver, Sender};
use tracing::{info, warn};

/// Logs crawl events at info (progress, completion) and warn (errors)
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl ProgressObserver for TracingObserver {
    fn on_progress(&self, update: &ProgressUpdate) -> ObserverResult<()> {
        info!(
            url = %update.url,
            successful = update.successful_pages,
            failed = update.failed_pages,
            skipped = update.skipped_pages,
            "Crawled {} pages ({:.1}%)",
            update.pages_crawled,
            update.progress_percent
        );
        Ok(())
    }

    fn on_error(&self, notice: &ErrorNotice) -> ObserverResult<()> {
        warn!("{}", notice.message);
        Ok(())
    }

    fn on_complete(&self, summary: &CompletionSummary) -> ObserverResult<()> {
        info!(
            "Crawl finished: {} pages crawled ({} successful, {} failed, {} skipped)",
            summary.pages_crawled,
            summary.successful_pages,
            summary.failed_pages,
            summary.skipped_pages
        );
        Ok(())
    }
}

/// Forwards events into a bounded tokio channel
///
/// Sending never waits. When the receiver falls `capacity` events behind,
/// further events are dropped and reported as [`ObserverError::Full`].
#[derive(Debug, Clone)]
pub struct ChannelObserver {
    sender: Sender<CrawlEvent>,
}

impl ChannelObserver {
    pub const DEFAULT_CAPACITY: usize = 1024;

    /// Creates an observer and the receiving end of its channel
    ///
    /// A zero capacity is raised to one.
    pub fn new(capacity: usize) -> (Self, Receiver<CrawlEvent>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (Self { sender }, receiver)
    }

    fn send(&self, event: CrawlEvent) -> ObserverResult<()> {
        self.sender.try_send(event).map_err(|e| match e {
            TrySendError::Full(_) => ObserverError::Full,
            TrySendError::Closed(_) => ObserverError::Closed,
        })
    }
}

impl ProgressObserver for ChannelObserver {
    fn on_progress(&self, update: &ProgressUpdate) -> ObserverResult<()> {
        self.send(CrawlEvent::Progress(update.clone()))
    }

    fn on_error(&self, notice: &ErrorNotice) -> ObserverResult<()> {
        self.send(CrawlEvent::Error(notice.clone()))
    }

    fn on_complete(&self, summary: &CompletionSummary) -> ObserverResult<()> {
        self.send(CrawlEvent::Complete(*summary))
    }
}

/// Writes each event as a single JSON line
pub struct JsonLinesObserver<W: Write + Send> {
    writer: Mutex<W>,
}

impl JsonLinesObserver<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write + Send> JsonLinesObserver<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    /// Returns the underlying writer
    pub fn into_inner(self) -> W {
        match self.writer.into_inner() {
            Ok(writer) => writer,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn write_event(&self, event: &CrawlEvent) -> ObserverResult<()> {
        let line = serde_json::to_string(event)?;
        let mut writer = self
            .writer
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "event writer lock poisoned"))?;
        writeln!(writer, "{}", line)?;
        writer.flush()?;
        Ok(())
    }
}

impl<W: Write + Send> ProgressObserver for JsonLinesObserver<W> {
    fn on_progress(&self, update: &ProgressUpdate) -> ObserverResult<()> {
        self.write_event(&CrawlEvent::Progress(update.clone()))
    }

    fn on_error(&self, notice: &ErrorNotice) -> ObserverResult<()> {
        self.write_event(&CrawlEvent::Error(notice.clone()))
    }

    fn on_complete(&self, summary: &CompletionSummary) -> ObserverResult<()> {
        self.write_event(&CrawlEvent::Complete(*summary))
    }
}

/// Keeps every received event in memory
#[derive(Debug, Default)]
pub struct CollectingObserver {
    events: Mutex<Vec<CrawlEvent>>,
}

impl CollectingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all collected events
    pub fn events(&self) -> Vec<CrawlEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.events.lock().map(|events| events.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn push(&self, event: CrawlEvent) -> ObserverResult<()> {
        self.events
            .lock()
            .map_err(|_| ObserverError::Closed)?
            .push(event);
        Ok(())
    }
}

impl ProgressObserver for CollectingObserver {
    fn on_progress(&self, update: &ProgressUpdate) -> ObserverResult<()> {
        self.push(CrawlEvent::Progress(update.clone()))
    }

    fn on_error(&self, notice: &ErrorNotice) -> ObserverResult<()> {
        self.push(CrawlEvent::Error(notice.clone()))
    }

    fn on_complete(&self, summary: &CompletionSummary) -> ObserverResult<()> {
        self.push(CrawlEvent::Complete(*summary))
    }
}
