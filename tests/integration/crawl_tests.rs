//! Crawl loop tests against scripted drivers and stores
//!
//! These tests run whole sessions end-to-end without a network and check the
//! bounds, ordering, stop and failure behavior of the crawl loop.

use crate::support::{
    collecting_reporter, event_counts, site, url, MemoryStore, PanickingObserver, ScriptedDriver,
};
use std::sync::Arc;
use sumi_mirror::driver::LoginCredentials;
use sumi_mirror::output::CrawlEvent;
use sumi_mirror::{start, Coordinator, CrawlBudget, CrawlCounters, SessionState, StopHandle};

const A: &str = "https://x.test/";
const B: &str = "https://x.test/b";
const C: &str = "https://x.test/c";
const D: &str = "https://x.test/d";

fn counters(crawled: u32, ok: u32, failed: u32, skipped: u32) -> CrawlCounters {
    CrawlCounters {
        pages_crawled: crawled,
        successful_pages: ok,
        failed_pages: failed,
        skipped_pages: skipped,
    }
}

fn credentials() -> LoginCredentials {
    LoginCredentials {
        login_url: url("https://x.test/login"),
        username: "alice".to_string(),
        password: "secret".to_string(),
        username_field: "username".to_string(),
        password_field: "password".to_string(),
    }
}

#[tokio::test]
async fn test_two_leaf_links_end_to_end() {
    let driver = ScriptedDriver::new(site(&[(A, &[B, C]), (B, &[]), (C, &[])]));
    let log = driver.log();
    let store = Arc::new(MemoryStore::new());
    let (reporter, observer) = collecting_reporter();

    let session = start(
        url(A),
        CrawlBudget::new(1, 10),
        Box::new(driver),
        store.clone(),
        reporter,
    );
    let report = session.wait().await.unwrap();

    assert_eq!(report.state, SessionState::Completed);
    assert_eq!(report.counters, counters(3, 3, 0, 0));
    assert_eq!(report.visited, 3);
    assert_eq!(report.frontier_remaining, 0);
    assert_eq!(store.saved(), vec![A, B, C]);
    assert_eq!(log.lock().unwrap().releases, 1);

    let events = observer.events();
    assert_eq!(event_counts(&events), (3, 0, 1));
    match events.last() {
        Some(CrawlEvent::Complete(summary)) => {
            assert_eq!(summary.pages_crawled, 3);
            assert_eq!(summary.successful_pages, 3);
        }
        other => panic!("expected completion last, got {:?}", other),
    }
}

#[tokio::test]
async fn test_breadth_first_order() {
    let driver = ScriptedDriver::new(site(&[(A, &[B, C]), (B, &[D]), (C, &[]), (D, &[])]));
    let log = driver.log();
    let (reporter, _observer) = collecting_reporter();

    let report = Coordinator::new(
        url(A),
        CrawlBudget::new(5, 10),
        Box::new(driver),
        Arc::new(MemoryStore::new()),
        reporter,
    )
    .run()
    .await;

    assert_eq!(report.state, SessionState::Completed);
    assert_eq!(log.lock().unwrap().navigations, vec![A, B, C, D]);
}

#[tokio::test]
async fn test_depth_bound() {
    let driver = ScriptedDriver::new(site(&[(A, &[B]), (B, &[C]), (C, &[D]), (D, &[])]));
    let log = driver.log();
    let (reporter, observer) = collecting_reporter();

    let report = Coordinator::new(
        url(A),
        CrawlBudget::new(1, 10),
        Box::new(driver),
        Arc::new(MemoryStore::new()),
        reporter,
    )
    .run()
    .await;

    // C sits at depth 2: queued, then skipped without navigation
    assert_eq!(log.lock().unwrap().navigations, vec![A, B]);
    assert_eq!(report.counters, counters(2, 2, 0, 1));
    assert_eq!(event_counts(&observer.events()), (2, 0, 1));
}

#[tokio::test]
async fn test_page_bound() {
    let links = [
        "https://x.test/1",
        "https://x.test/2",
        "https://x.test/3",
        "https://x.test/4",
        "https://x.test/5",
    ];
    let mut pages: Vec<(&str, &[&str])> = vec![(A, &links[..])];
    pages.extend(links.iter().map(|l| (*l, &[] as &[&str])));
    let driver = ScriptedDriver::new(site(&pages));
    let log = driver.log();
    let (reporter, _observer) = collecting_reporter();

    let report = Coordinator::new(
        url(A),
        CrawlBudget::new(3, 3),
        Box::new(driver),
        Arc::new(MemoryStore::new()),
        reporter,
    )
    .run()
    .await;

    assert_eq!(report.state, SessionState::Completed);
    assert_eq!(report.counters.pages_crawled, 3);
    assert_eq!(
        log.lock().unwrap().navigations,
        vec![A, "https://x.test/1", "https://x.test/2"]
    );
    assert_eq!(report.frontier_remaining, 3);
}

#[tokio::test]
async fn test_no_url_is_attempted_twice() {
    // C is discovered by A and again by B before it is attempted
    let driver = ScriptedDriver::new(site(&[
        (A, &[B, C]),
        (B, &[A, C]),
        (C, &[B, "https://x.test/c/"]),
    ]));
    let log = driver.log();
    let (reporter, observer) = collecting_reporter();

    let report = Coordinator::new(
        url(A),
        CrawlBudget::new(5, 10),
        Box::new(driver),
        Arc::new(MemoryStore::new()),
        reporter,
    )
    .run()
    .await;

    assert_eq!(log.lock().unwrap().navigations, vec![A, B, C]);
    assert_eq!(report.counters, counters(3, 3, 0, 1));
    // Skips produce no events
    assert_eq!(event_counts(&observer.events()), (3, 0, 1));
}

#[tokio::test]
async fn test_navigation_failure_is_recorded_and_not_retried() {
    let missing = "https://x.test/missing";
    let driver = ScriptedDriver::new(site(&[(A, &[missing, B]), (B, &[missing])]));
    let log = driver.log();
    let store = Arc::new(MemoryStore::new());
    let (reporter, observer) = collecting_reporter();

    let report = Coordinator::new(
        url(A),
        CrawlBudget::new(3, 10),
        Box::new(driver),
        store.clone(),
        reporter,
    )
    .run()
    .await;

    assert_eq!(report.state, SessionState::Completed);
    assert_eq!(report.counters, counters(3, 2, 1, 0));
    assert_eq!(log.lock().unwrap().navigations, vec![A, missing, B]);
    assert!(store.partials().is_empty());

    let events = observer.events();
    assert_eq!(event_counts(&events), (3, 1, 1));

    let error_index = events
        .iter()
        .position(|e| matches!(e, CrawlEvent::Error(_)))
        .unwrap();
    match (&events[error_index], &events[error_index + 1]) {
        (CrawlEvent::Error(notice), CrawlEvent::Progress(update)) => {
            assert_eq!(notice.url.as_deref(), Some(missing));
            assert!(notice.message.contains(missing));
            assert_eq!(update.url, missing);
            assert_eq!(update.failed_pages, 1);
        }
        other => panic!("expected error then progress, got {:?}", other),
    }
}

#[tokio::test]
async fn test_persistence_failure_saves_partial_content() {
    let driver = ScriptedDriver::new(site(&[(A, &[B]), (B, &[C]), (C, &[])]));
    let log = driver.log();
    let store = Arc::new(MemoryStore::new().failing_on(B));
    let (reporter, observer) = collecting_reporter();

    let report = Coordinator::new(
        url(A),
        CrawlBudget::new(3, 10),
        Box::new(driver),
        store.clone(),
        reporter,
    )
    .run()
    .await;

    assert_eq!(report.counters, counters(2, 1, 1, 0));
    assert_eq!(
        store.partials(),
        vec![(B.to_string(), format!("<html><body>{}</body></html>", B))]
    );
    // Links of a failed page are never followed
    assert_eq!(log.lock().unwrap().navigations, vec![A, B]);
    assert_eq!(event_counts(&observer.events()), (2, 1, 1));
}

#[tokio::test]
async fn test_stop_finishes_current_page_only() {
    let stop = StopHandle::new();
    let driver = ScriptedDriver::new(site(&[(A, &[B, C]), (B, &[D]), (C, &[]), (D, &[])]))
        .stop_on(B, stop.clone());
    let log = driver.log();
    let store = Arc::new(MemoryStore::new());
    let (reporter, observer) = collecting_reporter();

    let report = Coordinator::new(
        url(A),
        CrawlBudget::new(5, 10),
        Box::new(driver),
        store.clone(),
        reporter,
    )
    .with_stop_handle(stop)
    .run()
    .await;

    assert_eq!(report.state, SessionState::Stopped);
    assert_eq!(report.counters, counters(2, 2, 0, 0));
    assert_eq!(store.saved(), vec![A, B]);

    let log = log.lock().unwrap();
    assert_eq!(log.navigations, vec![A, B]);
    assert_eq!(log.releases, 1);

    let events = observer.events();
    assert_eq!(event_counts(&events), (2, 0, 1));
    assert!(matches!(events.last(), Some(CrawlEvent::Complete(_))));
}

#[tokio::test]
async fn test_stop_before_start() {
    let driver = ScriptedDriver::new(site(&[(A, &[])]));
    let log = driver.log();
    let (reporter, observer) = collecting_reporter();

    let coordinator = Coordinator::new(
        url(A),
        CrawlBudget::new(1, 10),
        Box::new(driver),
        Arc::new(MemoryStore::new()),
        reporter,
    );
    coordinator.stop_handle().stop();
    let report = coordinator.run().await;

    assert_eq!(report.state, SessionState::Stopped);
    assert_eq!(report.counters, CrawlCounters::default());
    assert!(log.lock().unwrap().navigations.is_empty());
    assert_eq!(log.lock().unwrap().releases, 1);
    assert_eq!(event_counts(&observer.events()), (0, 0, 1));
}

#[tokio::test]
async fn test_panic_is_fatal_and_cleaned_up() {
    let driver = ScriptedDriver::new(site(&[(A, &[B, C]), (B, &[]), (C, &[])])).panic_on(B);
    let log = driver.log();
    let (reporter, observer) = collecting_reporter();

    let report = Coordinator::new(
        url(A),
        CrawlBudget::new(3, 10),
        Box::new(driver),
        Arc::new(MemoryStore::new()),
        reporter,
    )
    .run()
    .await;

    assert_eq!(report.state, SessionState::Fatal);
    assert_eq!(report.counters, counters(1, 1, 0, 0));

    let log = log.lock().unwrap();
    assert_eq!(log.navigations, vec![A, B]);
    assert_eq!(log.releases, 1);

    let events = observer.events();
    assert_eq!(event_counts(&events), (1, 1, 1));
    match &events[1] {
        CrawlEvent::Error(notice) => {
            assert!(notice.url.is_none());
            assert!(notice.message.contains("scripted panic"));
        }
        other => panic!("expected fatal error event, got {:?}", other),
    }
    assert!(matches!(events.last(), Some(CrawlEvent::Complete(_))));
}

#[tokio::test]
async fn test_rejected_login_is_fatal() {
    let driver = ScriptedDriver::new(site(&[(A, &[])])).reject_login();
    let log = driver.log();
    let (reporter, observer) = collecting_reporter();

    let report = Coordinator::new(
        url(A),
        CrawlBudget::new(1, 10),
        Box::new(driver),
        Arc::new(MemoryStore::new()),
        reporter,
    )
    .with_login(credentials())
    .run()
    .await;

    assert_eq!(report.state, SessionState::Fatal);
    assert_eq!(report.counters, CrawlCounters::default());

    let log = log.lock().unwrap();
    assert!(log.navigations.is_empty());
    assert_eq!(log.releases, 1);
    assert_eq!(event_counts(&observer.events()), (0, 1, 1));
}

#[tokio::test]
async fn test_login_happens_before_crawl() {
    let driver = ScriptedDriver::new(site(&[(A, &[])]));
    let log = driver.log();
    let (reporter, _observer) = collecting_reporter();

    let report = Coordinator::new(
        url(A),
        CrawlBudget::new(1, 10),
        Box::new(driver),
        Arc::new(MemoryStore::new()),
        reporter,
    )
    .with_login(credentials())
    .run()
    .await;

    assert_eq!(report.state, SessionState::Completed);
    let log = log.lock().unwrap();
    assert!(log.authenticated);
    assert_eq!(log.navigations, vec![A]);
}

#[tokio::test]
async fn test_session_stop_from_outside() {
    let driver = ScriptedDriver::new(site(&[(A, &[])]));
    let (reporter, observer) = collecting_reporter();

    let session = start(
        url(A),
        CrawlBudget::new(1, 10),
        Box::new(driver),
        Arc::new(MemoryStore::new()),
        reporter,
    );
    session.stop();
    let report = session.wait().await.unwrap();

    // The stop may land before or after the only page
    assert!(matches!(
        report.state,
        SessionState::Stopped | SessionState::Completed
    ));
    assert!(report.counters.pages_crawled <= 1);
    assert_eq!(event_counts(&observer.events()).2, 1);
}

#[tokio::test]
async fn test_redirect_target_is_not_crawled_again() {
    // B is served from C, which A also links to
    let driver = ScriptedDriver::new(site(&[(A, &[B, C]), (C, &[])])).redirect(B, C);
    let log = driver.log();
    let store = Arc::new(MemoryStore::new());
    let (reporter, _observer) = collecting_reporter();

    let report = Coordinator::new(
        url(A),
        CrawlBudget::new(3, 10),
        Box::new(driver),
        store.clone(),
        reporter,
    )
    .run()
    .await;

    assert_eq!(report.state, SessionState::Completed);
    assert_eq!(log.lock().unwrap().navigations, vec![A, B]);
    assert_eq!(store.saved(), vec![A, B]);
    assert_eq!(report.counters, counters(2, 2, 0, 1));
}

#[tokio::test]
async fn test_panicking_observer_does_not_disturb_crawl() {
    let driver = ScriptedDriver::new(site(&[(A, &[B, C]), (B, &[]), (C, &[])]));
    let log = driver.log();
    let (mut reporter, observer) = collecting_reporter();
    reporter.add_observer(Arc::new(PanickingObserver));

    let session = start(
        url(A),
        CrawlBudget::new(1, 10),
        Box::new(driver),
        Arc::new(MemoryStore::new()),
        reporter,
    );
    let report = session.wait().await.unwrap();

    assert_eq!(report.state, SessionState::Completed);
    assert_eq!(report.counters, counters(3, 3, 0, 0));
    assert_eq!(log.lock().unwrap().navigations, vec![A, B, C]);
    assert_eq!(event_counts(&observer.events()), (3, 0, 1));
}
