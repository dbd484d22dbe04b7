//! Scripted fakes for crawling without a network
//!
//! `ScriptedDriver` serves pages from an in-memory site map and records every
//! call the crawler makes; `MemoryStore` keeps saved pages in memory and can
//! be told to fail for chosen URLs.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use sumi_mirror::driver::{
    DriverError, DriverResult, InteractiveElement, LoginCredentials, PageDriver,
};
use sumi_mirror::output::{
    CollectingObserver, CompletionSummary, CrawlEvent, ErrorNotice, ObserverResult,
    ProgressObserver, ProgressReporter, ProgressUpdate,
};
use sumi_mirror::storage::{ContentStore, DocumentKind, StorageError, StorageResult, StoredDocument};
use sumi_mirror::StopHandle;
use url::Url;

// ===== Site map =====

/// One page of a scripted site
#[derive(Debug, Clone)]
pub struct Page {
    pub content: String,
    pub links: Vec<String>,
    pub resources: Vec<String>,
}

/// Builds a site where every page links to the given URLs
pub fn site(pages: &[(&str, &[&str])]) -> HashMap<String, Page> {
    pages
        .iter()
        .map(|(url, links)| {
            (
                url.to_string(),
                Page {
                    content: format!("<html><body>{}</body></html>", url),
                    links: links.iter().map(|l| l.to_string()).collect(),
                    resources: Vec::new(),
                },
            )
        })
        .collect()
}

pub fn url(s: &str) -> Url {
    Url::parse(s).unwrap()
}

// ===== Driver =====

/// Everything a `ScriptedDriver` was asked to do
#[derive(Debug, Default)]
pub struct DriverLog {
    pub navigations: Vec<String>,
    pub authenticated: bool,
    pub releases: u32,
}

pub struct ScriptedDriver {
    pages: HashMap<String, Page>,
    current: Option<String>,
    log: Arc<Mutex<DriverLog>>,
    redirects: HashMap<String, String>,
    stop_on: Option<(String, StopHandle)>,
    panic_on: Option<String>,
    reject_login: bool,
}

impl ScriptedDriver {
    pub fn new(pages: HashMap<String, Page>) -> Self {
        Self {
            pages,
            current: None,
            log: Arc::new(Mutex::new(DriverLog::default())),
            redirects: HashMap::new(),
            stop_on: None,
            panic_on: None,
            reject_login: false,
        }
    }

    /// Serves the page at `to` whenever `from` is requested
    pub fn redirect(mut self, from: &str, to: &str) -> Self {
        self.redirects.insert(from.to_string(), to.to_string());
        self
    }

    /// Requests a stop while `url` is being loaded
    pub fn stop_on(mut self, url: &str, handle: StopHandle) -> Self {
        self.stop_on = Some((url.to_string(), handle));
        self
    }

    /// Panics when navigating to `url`
    pub fn panic_on(mut self, url: &str) -> Self {
        self.panic_on = Some(url.to_string());
        self
    }

    pub fn reject_login(mut self) -> Self {
        self.reject_login = true;
        self
    }

    pub fn log(&self) -> Arc<Mutex<DriverLog>> {
        Arc::clone(&self.log)
    }

    fn page(&self) -> DriverResult<&Page> {
        self.current
            .as_ref()
            .and_then(|url| self.pages.get(url))
            .ok_or(DriverError::NoPage)
    }
}

#[async_trait]
impl PageDriver for ScriptedDriver {
    async fn authenticate(&mut self, _credentials: &LoginCredentials) -> DriverResult<()> {
        if self.reject_login {
            return Err(DriverError::Authentication("bad credentials".to_string()));
        }
        self.log.lock().unwrap().authenticated = true;
        Ok(())
    }

    async fn navigate(&mut self, url: &Url) -> DriverResult<()> {
        let key = url.to_string();
        self.log.lock().unwrap().navigations.push(key.clone());
        self.current = None;

        if self.panic_on.as_deref() == Some(key.as_str()) {
            panic!("scripted panic on {}", key);
        }
        if let Some((stop_url, handle)) = &self.stop_on {
            if *stop_url == key {
                handle.stop();
            }
        }

        let served = self.redirects.get(&key).cloned().unwrap_or_else(|| key.clone());
        if self.pages.contains_key(&served) {
            self.current = Some(served);
            Ok(())
        } else {
            Err(DriverError::Status {
                url: key,
                status: 404,
            })
        }
    }

    async fn dismiss_overlays(&mut self) -> DriverResult<()> {
        Ok(())
    }

    async fn content(&mut self) -> DriverResult<String> {
        Ok(self.page()?.content.clone())
    }

    async fn resources(&mut self) -> DriverResult<Vec<String>> {
        Ok(self.page()?.resources.clone())
    }

    async fn links(&mut self) -> DriverResult<Vec<String>> {
        Ok(self.page()?.links.clone())
    }

    async fn interactive_elements(&mut self) -> DriverResult<Vec<InteractiveElement>> {
        Ok(Vec::new())
    }

    fn current_url(&self) -> Option<Url> {
        self.current.as_deref().and_then(|url| Url::parse(url).ok())
    }

    async fn release(&mut self) -> DriverResult<()> {
        self.current = None;
        self.log.lock().unwrap().releases += 1;
        Ok(())
    }
}

// ===== Store =====

#[derive(Default)]
pub struct MemoryStore {
    failing: HashSet<String>,
    pub saved: Mutex<Vec<String>>,
    pub partials: Mutex<Vec<(String, String)>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes `save` fail for `url`
    pub fn failing_on(mut self, url: &str) -> Self {
        self.failing.insert(url.to_string());
        self
    }

    pub fn saved(&self) -> Vec<String> {
        self.saved.lock().unwrap().clone()
    }

    pub fn partials(&self) -> Vec<(String, String)> {
        self.partials.lock().unwrap().clone()
    }

    fn document(url: &Url, kind: DocumentKind, content: &str) -> StoredDocument {
        StoredDocument {
            url: url.to_string(),
            kind,
            path: PathBuf::from(url.path()),
            content_hash: String::new(),
            bytes: content.len() as u64,
        }
    }
}

#[async_trait]
impl ContentStore for MemoryStore {
    async fn save(
        &self,
        url: &Url,
        content: &str,
        _resources: &[String],
    ) -> StorageResult<StoredDocument> {
        if self.failing.contains(url.as_str()) {
            return Err(StorageError::InvalidTarget(url.to_string()));
        }
        self.saved.lock().unwrap().push(url.to_string());
        Ok(Self::document(url, DocumentKind::Page, content))
    }

    async fn save_partial(&self, url: &Url, content: &str) -> StorageResult<StoredDocument> {
        self.partials
            .lock()
            .unwrap()
            .push((url.to_string(), content.to_string()));
        Ok(Self::document(url, DocumentKind::Partial, content))
    }

    async fn save_interactive_elements(
        &self,
        url: &Url,
        _elements: &[InteractiveElement],
    ) -> StorageResult<PathBuf> {
        Ok(PathBuf::from(url.path()))
    }
}

// ===== Events =====

/// A reporter feeding a fresh collecting observer
pub fn collecting_reporter() -> (ProgressReporter, Arc<CollectingObserver>) {
    let observer = Arc::new(CollectingObserver::new());
    let reporter = ProgressReporter::new().with_observer(observer.clone());
    (reporter, observer)
}

/// Observer that panics on every event
pub struct PanickingObserver;

impl ProgressObserver for PanickingObserver {
    fn on_progress(&self, _update: &ProgressUpdate) -> ObserverResult<()> {
        panic!("observer failed on progress");
    }

    fn on_error(&self, _notice: &ErrorNotice) -> ObserverResult<()> {
        panic!("observer failed on error");
    }

    fn on_complete(&self, _summary: &CompletionSummary) -> ObserverResult<()> {
        panic!("observer failed on completion");
    }
}

/// Event counts as (progress, error, complete)
pub fn event_counts(events: &[CrawlEvent]) -> (usize, usize, usize) {
    events.iter().fold((0, 0, 0), |(p, e, c), event| match event {
        CrawlEvent::Progress(_) => (p + 1, e, c),
        CrawlEvent::Error(_) => (p, e + 1, c),
        CrawlEvent::Complete(_) => (p, e, c + 1),
    })
}
