//! Sitegraph main entry point
//!
//! This is the command-line interface for the Sitegraph site mapper.

use anyhow::{bail, Context};
use clap::Parser;
use sitegraph::config::{load_config_with_hash, validate, Config};
use sitegraph::crawler::{Coordinator, CrawlReport};
use sitegraph::output::{print_statistics, write_outputs, CrawlStatistics};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Sitegraph: a same-domain site structure mapper
///
/// Sitegraph crawls a website from a start URL, follows only links that stay
/// on the same host, and writes the resulting link graph to JSON, markdown
/// and optionally SQLite.
#[derive(Parser, Debug)]
#[command(name = "sitegraph")]
#[command(version)]
#[command(about = "A same-domain site structure mapper", long_about = None)]
struct Cli {
    /// Start URL; `https://` is assumed when no scheme is given
    #[arg(value_name = "URL")]
    url: Option<String>,

    /// Path to TOML configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Number of concurrent fetch workers
    #[arg(short, long)]
    workers: Option<usize>,

    /// Minimum seconds between fetch starts, across all workers
    #[arg(long, value_name = "SECS")]
    rate_limit: Option<f64>,

    /// Retries per URL for transient failures
    #[arg(long)]
    max_retries: Option<u32>,

    /// Per-request timeout in seconds
    #[arg(long, value_name = "SECS")]
    timeout: Option<u64>,

    /// Stop the whole crawl after this many seconds (0 = never)
    #[arg(long, value_name = "SECS")]
    crawl_timeout: Option<u64>,

    /// Directory for output files
    #[arg(short, long, value_name = "DIR")]
    output_dir: Option<String>,

    /// Also export the graph to a SQLite database
    #[arg(long)]
    database: bool,

    /// Skip the markdown summary
    #[arg(long)]
    no_summary: bool,

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

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    let Some(raw_url) = cli.url.as_deref() else {
        bail!("No start URL given (try `sitegraph https://example.com`)");
    };
    let start_url = with_default_scheme(raw_url);

    let (config, config_hash) = load_configuration(&cli)?;

    let coordinator = Coordinator::new(&config, &start_url)
        .with_context(|| format!("Cannot start crawl from '{}'", start_url))?;

    // Ctrl-C stops the crawl; the partial graph is still written
    let cancel = coordinator.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, finishing in-flight work");
            cancel.cancel();
        }
    });

    let report = coordinator.run().await.context("Crawl failed")?;

    handle_outputs(&report, &config, config_hash.as_deref())?;

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
///
/// `RUST_LOG` wins over the flags when it is set.
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if quiet {
            // Only show errors
            EnvFilter::new("error")
        } else {
            match verbose {
                0 => EnvFilter::new("sitegraph=info,warn"),
                1 => EnvFilter::new("sitegraph=debug,info"),
                2 => EnvFilter::new("sitegraph=trace,debug"),
                _ => EnvFilter::new("trace"),
            }
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

fn with_default_scheme(raw: &str) -> String {
    let raw = raw.trim();
    if raw.contains("://") {
        raw.to_string()
    } else {
        format!("https://{}", raw)
    }
}

/// Loads the config file (if any), applies CLI overrides and validates
fn load_configuration(cli: &Cli) -> anyhow::Result<(Config, Option<String>)> {
    let (mut config, hash) = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            let (config, hash) = load_config_with_hash(path)
                .with_context(|| format!("Failed to load {}", path.display()))?;
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            (config, Some(hash))
        }
        None => (Config::default(), None),
    };

    let crawler = &mut config.crawler;
    if let Some(workers) = cli.workers {
        crawler.max_workers = workers;
    }
    if let Some(rate_limit) = cli.rate_limit {
        crawler.rate_limit = rate_limit;
    }
    if let Some(retries) = cli.max_retries {
        crawler.max_retries = retries;
    }
    if let Some(timeout) = cli.timeout {
        crawler.request_timeout = timeout;
    }
    if let Some(timeout) = cli.crawl_timeout {
        crawler.crawl_timeout = timeout;
    }

    if let Some(dir) = &cli.output_dir {
        config.output.directory = dir.clone();
    }
    if cli.database {
        config.output.database = true;
    }
    if cli.no_summary {
        config.output.summary = false;
    }

    validate(&config).context("Invalid configuration")?;
    Ok((config, hash))
}

/// Writes every enabled output and prints statistics
fn handle_outputs(
    report: &CrawlReport,
    config: &Config,
    config_hash: Option<&str>,
) -> anyhow::Result<()> {
    if !report.is_complete() {
        tracing::warn!("Crawl was stopped early; writing the partial graph");
    }

    let written = write_outputs(report, &config.output, config_hash)
        .with_context(|| format!("Failed to write outputs to {}", config.output.directory))?;

    let stats = CrawlStatistics::from_graph(&report.graph, &report.start_url);
    println!();
    print_statistics(&stats);

    println!("\nCrawl {} in {:.1}s", report.outcome, duration_secs(report));
    for path in &written {
        println!("✓ {}", path.display());
    }

    Ok(())
}

fn duration_secs(report: &CrawlReport) -> f64 {
    report.duration().num_milliseconds() as f64 / 1000.0
}
