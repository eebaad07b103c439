//! timeline-harvest main entry point
//!
//! This is the command-line interface for the resumable timeline crawler.

use anyhow::Context;
use chrono::Local;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use timeline_harvest::browser::{BrowserSession, WebDriverEngine};
use timeline_harvest::config::{load_config_with_hash, Config};
use timeline_harvest::crawler::{
    date_ranges, parse_date_or_relative, CrawlOptions, CrawlOrchestrator, CrawlReport, ItemFilter,
    RangeChunk,
};
use timeline_harvest::output::{load_statistics, print_crawl_summary, print_statistics};
use timeline_harvest::storage::JsonCheckpointStore;
use timeline_harvest::url::SearchMode;
use tracing_subscriber::EnvFilter;

/// timeline-harvest: a resumable timeline crawler
///
/// Drives a logged-in browser session over a profile timeline or a search,
/// rebuilds items from the page's network responses and keeps a per-target
/// checkpoint so an interrupted crawl resumes where it stopped.
#[derive(Parser, Debug)]
#[command(name = "timeline-harvest")]
#[command(version = "1.0.0")]
#[command(about = "A resumable timeline crawler", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose", global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Crawl a profile timeline with checkpointing
    User {
        /// Profile handle, with or without @
        handle: String,

        /// Continue from the stored checkpoint
        #[arg(long)]
        resume: bool,

        /// Items per session before stopping (0 = unlimited)
        #[arg(long, value_name = "N")]
        session_limit: Option<usize>,
    },

    /// Collect items from a keyword search
    Search {
        query: String,

        /// Result ordering: latest, top or media
        #[arg(long, default_value = "latest")]
        mode: SearchMode,

        /// Stop after this many items (0 = unlimited)
        #[arg(long, value_name = "N")]
        limit: Option<usize>,
    },

    /// Collect a profile's history through date-bounded searches
    History {
        handle: String,

        /// Start date (YYYY-MM-DD) or a relative span such as 6months, 2years or 30days
        #[arg(long)]
        since: String,

        /// End date (YYYY-MM-DD), defaults to today
        #[arg(long)]
        until: Option<String>,

        /// Range size: weekly, monthly or quarterly
        #[arg(long)]
        chunk: Option<RangeChunk>,

        /// Items per range (0 = unlimited)
        #[arg(long, value_name = "N")]
        max_per_range: Option<usize>,
    },

    /// Log in and refresh the saved cookie session
    Login,

    /// Show checkpoint and archive statistics for a profile
    Stats { handle: String },

    /// Validate the configuration and print the effective settings
    CheckConfig,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    match cli.command {
        Command::CheckConfig => {
            handle_check_config(&config);
            Ok(())
        }
        Command::Stats { handle } => handle_stats(&config, &handle),
        command => handle_browser_command(&config, command).await,
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("timeline_harvest=info,warn"),
            1 => EnvFilter::new("timeline_harvest=debug,info"),
            2 => EnvFilter::new("timeline_harvest=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles check-config: prints the effective configuration
fn handle_check_config(config: &Config) {
    println!("=== timeline-harvest Configuration ===\n");

    println!("Browser:");
    println!("  WebDriver: {}", config.browser.webdriver_url);
    println!("  Site: {}", config.browser.base_url);
    println!("  Headless: {}", config.browser.headless);
    println!(
        "  Viewport: {}x{}",
        config.browser.viewport_width, config.browser.viewport_height
    );
    println!("  Cookies: {}", config.browser.cookies_path);
    if let Some(proxy) = &config.browser.proxy_server {
        println!("  Proxy: {}", proxy);
    }

    println!("\nScraping:");
    println!(
        "  Scroll delay: {}-{}ms",
        config.scraping.scroll_delay_min_ms, config.scraping.scroll_delay_max_ms
    );
    println!("  Max scroll attempts: {}", config.scraping.max_scroll_attempts);
    println!(
        "  Max attempts without new: {}",
        config.scraping.max_attempts_without_new
    );
    match config.scraping.session_cap() {
        Some(cap) => println!("  Session cap: {} items", cap),
        None => println!("  Session cap: unlimited"),
    }
    println!("  Overlap threshold: {}", config.scraping.overlap_threshold);
    println!("  Stall timeout: {}s", config.scraping.stall_timeout_secs);
    println!("  Rate limit wait: {}s", config.scraping.rate_limit_wait_secs);

    println!("\nRetry:");
    println!("  Max attempts: {}", config.retry.max_attempts);
    println!(
        "  Delay: {}ms x{} (max {}ms)",
        config.retry.base_delay_ms, config.retry.backoff_multiplier, config.retry.max_delay_ms
    );

    println!("\nOutput:");
    println!("  Data directory: {}", config.output.data_dir);

    println!("\nSearch:");
    println!("  Chunk: {}", config.search.chunk);
    println!("  Max items per range: {}", config.search.max_items_per_range);

    println!("\n✓ Configuration is valid");
    if config.credentials.username.is_empty() {
        println!("! No credentials set, a saved cookie session is required");
    }
}

/// Handles stats: prints checkpoint and archive statistics
fn handle_stats(config: &Config, handle: &str) -> anyhow::Result<()> {
    println!("Data directory: {}\n", config.output.data_dir);

    let store = JsonCheckpointStore::new(&config.output.data_dir);
    let target = handle.trim().trim_start_matches('@');
    let stats = load_statistics(&store, target)?;
    print_statistics(&stats);

    Ok(())
}

/// Opens a browser session, runs the command and always closes the browser
async fn handle_browser_command(config: &Config, command: Command) -> anyhow::Result<()> {
    let engine = WebDriverEngine::new(&config.browser.webdriver_url)?;
    let mut session = BrowserSession::new(Box::new(engine), config)?;

    let result = run_in_session(&mut session, config, command).await;
    session.cleanup().await;

    if let Err(e) = &result {
        tracing::error!("Command failed: {:#}", e);
    }
    result
}

async fn run_in_session(
    session: &mut BrowserSession,
    config: &Config,
    command: Command,
) -> anyhow::Result<()> {
    session.initialize().await?;
    session.login().await?;

    let filter = ItemFilter::from_config(&config.filters);
    let store = JsonCheckpointStore::new(&config.output.data_dir);

    let report = match command {
        Command::User {
            handle,
            resume,
            session_limit,
        } => {
            let options = CrawlOptions {
                resume,
                max_items_per_session: session_limit,
            };
            let mut orchestrator = CrawlOrchestrator::new(store, config);
            orchestrator.crawl(session, &handle, options).await
        }
        Command::Search { query, mode, limit } => {
            let orchestrator = CrawlOrchestrator::new(store, config);
            orchestrator.search(session, &query, mode, limit).await
        }
        Command::History {
            handle,
            since,
            until,
            chunk,
            max_per_range,
        } => {
            let today = Local::now().date_naive();
            let since = parse_date_or_relative(&since, today).map_err(anyhow::Error::msg)?;
            let until = match until {
                Some(until) => parse_date_or_relative(&until, today).map_err(anyhow::Error::msg)?,
                None => today,
            };
            let chunk = match chunk {
                Some(chunk) => chunk,
                None => config
                    .search
                    .chunk
                    .parse()
                    .map_err(anyhow::Error::msg)?,
            };
            let ranges = date_ranges(since, until, chunk);
            if ranges.is_empty() {
                anyhow::bail!("no date ranges between {} and {}", since, until);
            }

            let limit = max_per_range
                .unwrap_or(config.search.max_items_per_range);
            let orchestrator = CrawlOrchestrator::new(store, config);
            orchestrator
                .crawl_history(session, &handle, &ranges, (limit > 0).then_some(limit))
                .await
        }
        Command::Login => {
            session.save_cookies().await?;
            println!("✓ Logged in, cookie session saved to {}", config.browser.cookies_path);
            return Ok(());
        }
        Command::Stats { .. } | Command::CheckConfig => return Ok(()),
    };

    finish(report, &filter)
}

/// Prints the report; a report carrying an error fails the command
fn finish(report: CrawlReport, filter: &ItemFilter) -> anyhow::Result<()> {
    print_crawl_summary(&report, filter);
    match report.error {
        Some(e) => Err(e.into()),
        None => Ok(()),
    }
}
