//! Shop-Scraper main entry point
//!
//! This is the command-line interface for the shop listing scraper.

use anyhow::Context;
use clap::Parser;
use shop_scraper::config::{hash_content, load_config_with_hash, validate, Config};
use shop_scraper::output::print_report;
use shop_scraper::pipeline::{Orchestrator, ScrapeRequest};
use shop_scraper::storage::{open_store, RecordStore, RunBatch};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Shop-Scraper: a concurrent product-listing scraper
///
/// Fetches the listing pages of a shop, extracts product titles, prices and
/// images, and stores the products that are new or whose price changed.
#[derive(Parser, Debug)]
#[command(name = "shop-scraper")]
#[command(version = "1.0.0")]
#[command(about = "A concurrent product-listing scraper", long_about = None)]
struct Cli {
    /// Path to TOML configuration file (defaults apply when omitted)
    #[arg(short, long, value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Number of listing pages to scrape; scrapes until the listing ends when omitted
    #[arg(short = 'n', long, value_name = "N", value_parser = clap::value_parser!(u32).range(1..))]
    max_pages: Option<u32>,

    /// Proxy URL used for every request of a run
    #[arg(long, value_name = "URL")]
    proxy: Option<String>,

    /// Listing root URL, overriding the configuration file
    #[arg(long, env = "BASE_URL", value_name = "URL")]
    base_url: Option<String>,

    /// Print the stored products and exit
    #[arg(long, conflicts_with_all = ["max_pages", "proxy", "every", "runs"])]
    list: bool,

    /// Repeat the scrape every SECS seconds, sharing the dedup cache between runs
    #[arg(long, value_name = "SECS", value_parser = clap::value_parser!(u64).range(1..))]
    every: Option<u64>,

    /// Number of runs in repeat mode; runs until interrupted when omitted
    #[arg(long, value_name = "N", requires = "every", value_parser = clap::value_parser!(u32).range(1..))]
    runs: Option<u32>,

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

    let (config, config_hash) = load_configuration(&cli)?;

    if cli.list {
        handle_list(&config)
    } else {
        handle_scrape(&cli, config, config_hash).await
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("shop_scraper=info,warn"),
            1 => EnvFilter::new("shop_scraper=debug,info"),
            2 => EnvFilter::new("shop_scraper=trace,debug"),
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

/// Loads the configuration file (or defaults) and applies CLI overrides
fn load_configuration(cli: &Cli) -> anyhow::Result<(Config, String)> {
    let (mut config, hash) = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            load_config_with_hash(path)
                .with_context(|| format!("failed to load {}", path.display()))?
        }
        None => {
            tracing::debug!("No configuration file given, using defaults");
            (Config::default(), hash_content(""))
        }
    };

    if let Some(base_url) = &cli.base_url {
        tracing::info!("Listing root overridden: {}", base_url);
        config.scraper.base_url = base_url.clone();
        validate(&config).context("invalid --base-url / BASE_URL")?;
    }

    tracing::debug!("Configuration hash: {}", hash);
    Ok((config, hash))
}

/// Handles the --list mode: prints the stored products
fn handle_list(config: &Config) -> anyhow::Result<()> {
    let store = open_store(&config.output)
        .with_context(|| format!("failed to open {}", config.output.path))?;
    let listing = store.listing()?;
    println!("{}", listing);
    Ok(())
}

/// Handles the main scrape operation, once or in repeat mode
async fn handle_scrape(cli: &Cli, config: Config, config_hash: String) -> anyhow::Result<()> {
    let request = ScrapeRequest {
        max_pages: cli.max_pages,
        proxy: cli.proxy.clone(),
    };
    let mut store = open_store(&config.output)
        .with_context(|| format!("failed to open {}", config.output.path))?;
    let orchestrator = Orchestrator::new(config);

    let Some(every) = cli.every else {
        return scrape_once(&orchestrator, &request, store.as_mut(), &config_hash).await;
    };

    let interval = Duration::from_secs(every);
    let mut run = 1u32;
    loop {
        tracing::info!("Starting run {}", run);
        if let Err(e) = scrape_once(&orchestrator, &request, store.as_mut(), &config_hash).await {
            tracing::error!("Run {} failed: {:#}", run, e);
        }

        if cli.runs.is_some_and(|runs| run >= runs) {
            break;
        }
        run += 1;

        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Interrupted, stopping after {} run(s)", run - 1);
                break;
            }
        }
    }

    Ok(())
}

/// Runs one scrape, stores its batch and prints the report
async fn scrape_once(
    orchestrator: &Orchestrator,
    request: &ScrapeRequest,
    store: &mut dyn RecordStore,
    config_hash: &str,
) -> anyhow::Result<()> {
    let result = orchestrator.run(request).await.context("scrape failed")?;

    if result.report.all_pages_failed() {
        tracing::error!("Every page failed: {}", result.report.failure_summary());
    }

    store
        .persist(&RunBatch {
            records: &result.records,
            report: &result.report,
            config_hash,
        })
        .context("failed to store products")?;

    print_report(&result.report);
    Ok(())
}
