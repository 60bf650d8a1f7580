//! seoscan main entry point
//!
//! This is the command-line interface for the seoscan crawl engine.

use anyhow::Context;
use clap::Parser;
use seoscan::config::{load_config_with_hash, validate, Config, StateBackend};
use seoscan::output::print_statistics;
use seoscan::persistence::{ScanRecorder, SqliteRecorder};
use seoscan::state::RedisStateStore;
use seoscan::{CrawlJob, Crawler};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// seoscan: an SEO crawl engine
///
/// Crawls a website from a seed URL, respecting robots.txt and per-domain
/// politeness, and reports the SEO signals of every page it reaches.
#[derive(Parser, Debug)]
#[command(name = "seoscan")]
#[command(version = "1.0.0")]
#[command(about = "An SEO crawl engine", long_about = None)]
struct Cli {
    /// URL to start crawling from
    #[arg(value_name = "SEED_URL")]
    seed_url: String,

    /// Path to TOML configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Page budget for this crawl
    #[arg(long, value_name = "N")]
    max_pages: Option<usize>,

    /// Maximum link depth from the seed
    #[arg(long, value_name = "N")]
    max_depth: Option<u32>,

    /// Render every page in the headless browser
    #[arg(long)]
    headless: bool,

    /// WebDriver endpoint used for headless rendering
    #[arg(long, value_name = "URL")]
    webdriver_url: Option<String>,

    /// Keep crawl state in Redis
    #[arg(long, value_name = "URL")]
    redis_url: Option<String>,

    /// SQLite database for scan results
    #[arg(long, value_name = "PATH")]
    database: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    let (mut config, config_hash) = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            let (config, hash) = load_config_with_hash(path)
                .with_context(|| format!("Failed to load configuration from {}", path.display()))?;
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            (config, Some(hash))
        }
        None => (Config::default(), None),
    };

    apply_overrides(&mut config, &cli);
    validate(&config).context("Invalid configuration")?;

    let job = CrawlJob::new(cli.seed_url.clone(), config.crawl.clone());
    tracing::info!("Starting scan {} of {}", job.scan_id, job.seed_url);

    let mut crawler = Crawler::new(job.clone()).with_headless_config(config.headless.clone());
    if let Some(hash) = config_hash {
        crawler = crawler.with_config_hash(hash);
    }

    if let Some(path) = &config.output.database_path {
        let recorder = SqliteRecorder::new(Path::new(path))
            .with_context(|| format!("Failed to open database {}", path))?;
        tracing::info!("Recording results to {}", path);
        crawler = crawler.with_recorder(Arc::new(recorder) as Arc<dyn ScanRecorder>);
    }

    if config.state.backend == StateBackend::Redis {
        let redis_url = config
            .state
            .redis_url
            .as_deref()
            .context("Redis backend selected without a redis-url")?;
        let store = RedisStateStore::connect(redis_url, &job.scan_id)
            .await
            .context("Failed to connect to Redis")?;
        crawler = crawler.with_state_store(Arc::new(store));
    }

    let outcome = crawler.run().await?;

    if !cli.quiet {
        print_statistics(&outcome.stats);
    }
    if outcome.timed_out() {
        tracing::warn!("Crawl stopped at its deadline; results are partial");
    }

    Ok(())
}

/// Applies command-line flags on top of the file configuration
fn apply_overrides(config: &mut Config, cli: &Cli) {
    if let Some(max_pages) = cli.max_pages {
        config.crawl.max_pages = max_pages;
    }
    if let Some(max_depth) = cli.max_depth {
        config.crawl.max_depth = max_depth;
    }
    if cli.headless {
        config.crawl.use_headless_browser = true;
    }
    if let Some(url) = &cli.webdriver_url {
        config.headless.webdriver_url = Some(url.clone());
    }
    if let Some(url) = &cli.redis_url {
        config.state.backend = StateBackend::Redis;
        config.state.redis_url = Some(url.clone());
    }
    if let Some(path) = &cli.database {
        config.output.database_path = Some(path.display().to_string());
    }
}

/// Sets up logging based on verbosity flags
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("seoscan=info,warn"),
            1 => EnvFilter::new("seoscan=debug,info"),
            2 => EnvFilter::new("seoscan=trace,debug"),
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
