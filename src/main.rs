//! Site-Harvest main entry point
//!
//! This is the command-line interface for the Site-Harvest content harvester.

use anyhow::Context;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use site_harvest::config::{hash_config_content, load_config_with_hash, parse_config, validate, Config};
use site_harvest::output::{
    content_sample, default_bundle_name, print_sample, print_statistics, write_bundle_file,
    CrawlStatistics,
};
use site_harvest::storage::{RunStatus, SqliteStorage, Storage};
use site_harvest::{CancelFlag, Crawler};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Site-Harvest: a same-domain website content harvester
///
/// Site-Harvest crawls a website breadth-first from one seed URL, never
/// leaving the seed's host, and packages every page's title, headings,
/// paragraphs, links and images into a ZIP bundle.
#[derive(Parser, Debug)]
#[command(name = "site-harvest")]
#[command(version = "1.0.0")]
#[command(about = "A same-domain website content harvester", long_about = None)]
struct Cli {
    /// Absolute http(s) URL to start crawling from
    #[arg(value_name = "SEED_URL")]
    seed_url: String,

    /// Path to TOML configuration file
    #[arg(short, long, value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Where to write the ZIP bundle
    #[arg(short, long, value_name = "OUTPUT")]
    output: Option<PathBuf>,

    /// Also save results to this SQLite database
    #[arg(long, value_name = "PATH")]
    db: Option<PathBuf>,

    /// Skip downloading images
    #[arg(long)]
    no_images: bool,

    /// Stop after this many pages
    #[arg(long, value_name = "N")]
    max_pages: Option<u32>,

    /// Pause between requests in milliseconds
    #[arg(long, value_name = "MS")]
    delay_ms: Option<u64>,

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

    let (mut config, config_hash) = load_configuration(cli.config.as_deref())?;
    apply_overrides(&mut config, &cli);
    validate(&config).context("Invalid command-line override")?;

    let mut crawler = Crawler::new(&config)?;
    spawn_interrupt_handler(crawler.cancel_flag());

    let mut run = match &config.output.database_path {
        Some(database_path) => Some(open_run(Path::new(database_path), &cli.seed_url, &config_hash)?),
        None => None,
    };

    let progress = progress_indicator(cli.quiet)?;
    let outcome = crawler
        .crawl(&cli.seed_url, |processed, url| {
            progress.set_position(processed as u64);
            progress.set_message(url.to_string());
        })
        .await;
    progress.finish_and_clear();

    let results = match outcome {
        Ok(results) => results,
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            if let Some((storage, run_id)) = run.as_mut() {
                storage.update_run_status(*run_id, RunStatus::Failed)?;
            }
            return Err(e.into());
        }
    };

    if let Some((storage, run_id)) = run.as_mut() {
        storage.save_results(*run_id, &results)?;
        tracing::info!("Saved run {}", run_id);
    }

    if results.pages.is_empty() {
        tracing::warn!("No content was found. Please check the URL and try again.");
        return Ok(());
    }

    let bundle_path = config
        .output
        .bundle_path
        .as_ref()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(default_bundle_name(&chrono::Local::now())));
    write_bundle_file(&results, &bundle_path)
        .with_context(|| format!("Failed to write bundle to {}", bundle_path.display()))?;

    if !cli.quiet {
        print_statistics(&CrawlStatistics::from_results(&results));
        if let Some(sample) = content_sample(&results) {
            print_sample(&sample);
        }
        println!("\n✓ Bundle written to: {}", bundle_path.display());
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("site_harvest=info,warn"),
            1 => EnvFilter::new("site_harvest=debug,info"),
            2 => EnvFilter::new("site_harvest=trace,debug"),
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

/// Loads the config file, or the defaults when none is given
fn load_configuration(path: Option<&Path>) -> anyhow::Result<(Config, String)> {
    match path {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            let (config, hash) = load_config_with_hash(path)
                .with_context(|| format!("Failed to load configuration from {}", path.display()))?;
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            Ok((config, hash))
        }
        None => Ok((parse_config("")?, hash_config_content(""))),
    }
}

fn apply_overrides(config: &mut Config, cli: &Cli) {
    if let Some(output) = &cli.output {
        config.output.bundle_path = Some(output.display().to_string());
    }
    if let Some(db) = &cli.db {
        config.output.database_path = Some(db.display().to_string());
    }
    if cli.no_images {
        config.fetch.download_images = false;
    }
    if let Some(max_pages) = cli.max_pages {
        config.crawler.max_pages = Some(max_pages);
    }
    if let Some(delay_ms) = cli.delay_ms {
        config.crawler.request_delay_ms = delay_ms;
    }
}

/// Cancels the crawl on the first Ctrl-C
fn spawn_interrupt_handler(cancel: CancelFlag) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, stopping after the current page");
            cancel.cancel();
        }
    });
}

fn progress_indicator(quiet: bool) -> anyhow::Result<ProgressBar> {
    if quiet {
        return Ok(ProgressBar::hidden());
    }

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner().template("{spinner} [{elapsed_precise}] {pos} pages {wide_msg}")?,
    );
    spinner.enable_steady_tick(Duration::from_millis(120));
    Ok(spinner)
}

/// Opens the database and records a `running` run for this crawl
fn open_run(path: &Path, seed_url: &str, config_hash: &str) -> anyhow::Result<(SqliteStorage, i64)> {
    let mut storage = SqliteStorage::new(path)
        .with_context(|| format!("Failed to open database {}", path.display()))?;
    let run_id = storage.create_run(seed_url, config_hash)?;
    Ok((storage, run_id))
}
