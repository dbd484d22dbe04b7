//! Statistics generation from the run manifest
//!
//! This module provides functionality for extracting and displaying
//! mirror statistics from the storage layer.

use crate::state::SessionState;
use crate::storage::{DocumentKind, Manifest, RunRecord};
use crate::MirrorError;
use std::collections::HashMap;

/// Manifest statistics summary
#[derive(Debug, Clone)]
pub struct MirrorStatistics {
    /// Total number of recorded runs
    pub total_runs: u64,

    /// Count of runs by terminal state
    pub runs_by_status: HashMap<SessionState, u64>,

    /// Count of stored documents by kind
    pub documents_by_kind: HashMap<DocumentKind, u64>,

    /// Number of distinct URLs with at least one stored document
    pub unique_urls: u64,

    /// Size of all stored documents in bytes
    pub total_bytes: u64,

    /// The most recent run
    pub latest_run: Option<RunRecord>,
}

impl MirrorStatistics {
    pub fn total_documents(&self) -> u64 {
        self.documents_by_kind.values().sum()
    }
}

/// Loads statistics from the manifest
///
/// # Arguments
///
/// * `manifest` - The manifest to query
///
/// # Returns
///
/// * `Ok(MirrorStatistics)` - Successfully loaded statistics
/// * `Err(MirrorError)` - Failed to query statistics
pub fn load_statistics(manifest: &Manifest) -> Result<MirrorStatistics, MirrorError> {
    let runs = manifest.list_runs()?;

    let mut runs_by_status = HashMap::new();
    for run in &runs {
        *runs_by_status.entry(run.status).or_insert(0) += 1;
    }

    let mut documents_by_kind = HashMap::new();
    for kind in [
        DocumentKind::Page,
        DocumentKind::Partial,
        DocumentKind::InteractiveElements,
    ] {
        let count = manifest.count_documents(Some(kind))?;
        if count > 0 {
            documents_by_kind.insert(kind, count);
        }
    }

    Ok(MirrorStatistics {
        total_runs: runs.len() as u64,
        runs_by_status,
        documents_by_kind,
        unique_urls: manifest.count_unique_urls()?,
        total_bytes: manifest.total_bytes()?,
        latest_run: runs.into_iter().next(),
    })
}

/// Prints statistics to stdout in a formatted manner
///
/// # Arguments
///
/// * `stats` - The statistics to display
pub fn print_statistics(stats: &MirrorStatistics) {
    println!("=== Mirror Statistics ===\n");

    println!("Overview:");
    println!("  Runs recorded: {}", stats.total_runs);
    println!("  Documents stored: {}", stats.total_documents());
    println!("  Unique URLs: {}", stats.unique_urls);
    println!("  Bytes written: {}", stats.total_bytes);
    println!();

    if !stats.runs_by_status.is_empty() {
        println!("Runs by State:");
        let mut state_counts: Vec<_> = stats.runs_by_status.iter().collect();
        state_counts.sort_by(|a, b| b.1.cmp(a.1));

        for (state, count) in state_counts {
            println!("  {}: {}", state, count);
        }
        println!();
    }

    if !stats.documents_by_kind.is_empty() {
        println!("Documents by Kind:");
        let mut kind_counts: Vec<_> = stats.documents_by_kind.iter().collect();
        kind_counts.sort_by(|a, b| b.1.cmp(a.1));

        for (kind, count) in kind_counts {
            println!("  {}: {}", kind.to_db_string(), count);
        }
        println!();
    }

    if let Some(run) = &stats.latest_run {
        println!("Latest Run (#{}):", run.id);
        println!("  Seed: {}", run.seed_url);
        println!("  Started: {}", run.started_at);
        if let Some(finished) = &run.finished_at {
            println!("  Finished: {}", finished);
        }
        println!("  State: {}", run.status);
        println!(
            "  Pages: {} crawled, {} successful, {} failed, {} skipped",
            run.counters.pages_crawled,
            run.counters.successful_pages,
            run.counters.failed_pages,
            run.counters.skipped_pages
        );
    }
}
