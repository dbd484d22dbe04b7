//! Sumi-Mirror main entry point
//!
//! This is the command-line interface for the Sumi-Mirror site mirroring crawler.

use anyhow::{anyhow, bail, Context};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use sumi_mirror::config::{load_config_with_hash, validate_seed_url, Config};
use sumi_mirror::crawler::{coordinator_from_config, CrawlSession};
use sumi_mirror::driver::build_http_client;
use sumi_mirror::output::{JsonLinesObserver, ProgressReporter, TracingObserver};
use sumi_mirror::storage::{open_manifest, FsContentStore};
use sumi_mirror::{normalize_url, CrawlBudget, CrawlReport, SessionState};
use tracing_subscriber::EnvFilter;
use url::Url;

/// Sumi-Mirror: a bounded site mirroring crawler
///
/// Sumi-Mirror crawls a website breadth-first from a seed URL, bounded by a
/// link depth and a page budget, and writes every page it visits (plus its
/// images, scripts and stylesheets) to a local mirror.
#[derive(Parser, Debug)]
#[command(name = "sumi-mirror")]
#[command(version = "1.0.0")]
#[command(about = "A bounded site mirroring crawler", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Seed URL (overrides crawler.seed-url)
    #[arg(long, value_name = "URL")]
    url: Option<String>,

    /// Maximum link depth (overrides crawler.max-depth)
    #[arg(long, value_name = "N")]
    max_depth: Option<u32>,

    /// Maximum pages attempted (overrides crawler.max-pages)
    #[arg(long, value_name = "N")]
    max_pages: Option<u32>,

    /// Print every crawl event as a JSON line on stdout
    #[arg(long)]
    events: bool,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show what would be crawled without actually crawling
    #[arg(long, conflicts_with = "stats")]
    dry_run: bool,

    /// Show statistics from the run manifest and exit
    #[arg(long, conflicts_with = "dry_run")]
    stats: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load configuration {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if cli.stats {
        return handle_stats(&config);
    }

    let seed = resolve_seed(&cli, &config)?;
    let budget = CrawlBudget::new(
        cli.max_depth.unwrap_or(config.crawler.max_depth),
        cli.max_pages.unwrap_or(config.crawler.max_pages),
    );
    if budget.max_pages < 1 {
        bail!("--max-pages must be >= 1");
    }

    if cli.dry_run {
        handle_dry_run(&config, &seed, &budget);
        return Ok(());
    }

    let report = handle_crawl(&config, &config_hash, seed, budget, cli.events).await?;
    print_report(&report);

    if report.state == SessionState::Fatal {
        bail!("Crawl ended with a fatal error");
    }
    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("sumi_mirror=info,warn"),
            1 => EnvFilter::new("sumi_mirror=debug,info"),
            2 => EnvFilter::new("sumi_mirror=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    // Events go to stdout with --events, so logs stay on stderr
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Picks the seed from `--url` or the config and normalizes it
fn resolve_seed(cli: &Cli, config: &Config) -> anyhow::Result<Url> {
    let raw = cli
        .url
        .as_deref()
        .or(config.crawler.seed_url.as_deref())
        .ok_or_else(|| anyhow!("No seed URL: pass --url or set crawler.seed-url"))?;

    validate_seed_url(raw)?;
    Ok(normalize_url(raw)?)
}

/// Handles the --dry-run mode: shows what would be crawled
fn handle_dry_run(config: &Config, seed: &Url, budget: &CrawlBudget) {
    println!("=== Sumi-Mirror Dry Run ===\n");

    println!("Crawl:");
    println!("  Seed URL: {}", seed);
    println!("  Max depth: {}", budget.max_depth);
    println!("  Max pages: {}", budget.max_pages);
    println!("  Settle time: {}ms", config.crawler.settle_time);
    println!("  Request timeout: {}s", config.crawler.request_timeout);
    println!(
        "  Interactive capture: {}",
        if config.crawler.capture_interactive { "on" } else { "off" }
    );

    println!("\nUser Agent:");
    println!("  {}", config.user_agent.header_value());

    println!("\nOutput:");
    println!("  Downloads: {}", config.output.downloads_dir);
    println!("  Manifest: {}", config.output.manifest_path);
    println!(
        "  Resource downloads: {}",
        if config.output.download_resources { "on" } else { "off" }
    );

    println!("\nScope:");
    if config.scope.allow.is_empty() {
        println!("  Allow: any host");
    } else {
        for pattern in &config.scope.allow {
            println!("  Allow: {}", pattern);
        }
    }
    for pattern in &config.scope.deny {
        println!("  Deny: {}", pattern);
    }

    if let Some(login) = &config.login {
        println!("\nLogin: {} as {}", login.login_url, login.username);
    }
    if let Some(proxy) = &config.proxy {
        println!("\nProxy: {}", proxy.address());
    }

    println!("\n✓ Configuration is valid");
}

/// Handles the --stats mode: shows statistics from the manifest
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    use sumi_mirror::output::{load_statistics, print_statistics};

    println!("Manifest: {}\n", config.output.manifest_path);

    let manifest = open_manifest(Path::new(&config.output.manifest_path))?;
    let stats = load_statistics(&manifest)?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(
    config: &Config,
    config_hash: &str,
    seed: Url,
    budget: CrawlBudget,
    events: bool,
) -> anyhow::Result<CrawlReport> {
    let mut manifest = open_manifest(Path::new(&config.output.manifest_path))
        .context("Failed to open run manifest")?;
    let run_id = manifest.create_run(config_hash, seed.as_str())?;
    let manifest = Arc::new(Mutex::new(manifest));
    tracing::info!("Recording run #{} in {}", run_id, config.output.manifest_path);

    let mut store = FsContentStore::new(&config.output.downloads_dir)
        .with_manifest(Arc::clone(&manifest), run_id);
    if config.output.download_resources {
        let client = build_http_client(
            &config.user_agent,
            config.crawler.request_timeout,
            config.proxy.as_ref(),
        )
        .context("Failed to build resource download client")?;
        store = store.with_resource_client(client);
    }

    let mut reporter = ProgressReporter::new().with_observer(Arc::new(TracingObserver));
    if events {
        reporter.add_observer(Arc::new(JsonLinesObserver::stdout()));
    }

    let coordinator = coordinator_from_config(config, seed, budget, Arc::new(store), reporter)?;
    let session = CrawlSession::spawn(coordinator);

    let stop = session.stop_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, stopping after the current page");
            stop.stop();
        }
    });

    let report = session.wait().await?;

    manifest
        .lock()
        .map_err(|_| anyhow!("Run manifest lock poisoned"))?
        .finish_run(run_id, report.state, &report.counters)?;

    Ok(report)
}

fn print_report(report: &CrawlReport) {
    println!("\n=== Crawl {} ===", report.state);
    println!("  Seed: {}", report.seed);
    println!("  Pages crawled: {}", report.counters.pages_crawled);
    println!("  Successful: {}", report.counters.successful_pages);
    println!("  Failed: {}", report.counters.failed_pages);
    println!("  Skipped: {}", report.counters.skipped_pages);
    println!("  Still queued: {}", report.frontier_remaining);
    println!("  Elapsed: {:.1}s", report.elapsed.as_secs_f64());
}
