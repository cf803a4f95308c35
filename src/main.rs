//! Cite-Ripple main entry point
//!
//! This is the command-line interface for the Cite-Ripple citation crawler.

use anyhow::Context;
use cite_ripple::config::{load_config_with_hash, Config};
use cite_ripple::crawler::CrawlEngine;
use cite_ripple::review::Review;
use cite_ripple::storage::{RunStatus, SqliteStorage, Storage};
use clap::Parser;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Cite-Ripple: a polite citation graph crawler
///
/// Cite-Ripple starts from a few seed works, enriches each one from the
/// Crossref API or the publisher's page, and follows their references wave
/// by wave. The growing review is kept in a SQLite database, so later runs
/// extend the same citation graph.
#[derive(Parser, Debug)]
#[command(name = "cite-ripple")]
#[command(version)]
#[command(about = "A polite citation graph crawler", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Start a new review, ignoring works already in the database
    #[arg(long)]
    fresh: bool,

    /// Validate config and show the seeds without crawling
    #[arg(long, conflicts_with = "stats")]
    dry_run: bool,

    /// Show statistics from the database and exit
    #[arg(long, conflicts_with = "dry_run")]
    stats: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    run(&cli)
        .await
        .with_context(|| format!("cite-ripple failed with {}", cli.config.display()))
}

async fn run(cli: &Cli) -> cite_ripple::Result<()> {
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if cli.dry_run {
        handle_dry_run(&config);
    } else if cli.stats {
        handle_stats(&config)?;
    } else {
        handle_crawl(config, config_hash, cli.fresh).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("cite_ripple=info,warn"),
            1 => EnvFilter::new("cite_ripple=debug,info"),
            2 => EnvFilter::new("cite_ripple=trace,debug"),
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

/// Handles the --dry-run mode: shows the effective settings and seeds
fn handle_dry_run(config: &Config) {
    println!("=== Cite-Ripple Dry Run ===\n");

    println!("Crawl Configuration:");
    println!("  Use API: {}", config.crawl.use_api);
    println!("  Crawl limit: {}", config.crawl.crawl_limit);
    println!(
        "  Depth limit: {} ({:?})",
        config.crawl.depth_limit, config.crawl.depth_mode
    );
    println!("  Polite: {}", config.crawl.be_polite);
    println!("  Rate limit: {}ms", config.crawl.rate_limit_ms);
    println!("  Resolve references: {}", config.crawl.resolve_references);

    println!("\nUser Agent:");
    println!("  {}", config.user_agent.header_value());

    println!("\nSources:");
    println!("  API: {}", config.api.base_url);
    println!("  Meta-tag sites: {}", config.scrapers.sites.join(", "));

    println!("\nOutput:");
    println!("  Database: {}", config.output.database_path);

    println!("\nSeeds ({}):", config.seed.len());
    for seed in &config.seed {
        let label = seed
            .doi
            .as_deref()
            .or(seed.link.as_deref())
            .or(seed.title.as_deref())
            .unwrap_or("(untitled)");
        println!("  - {}", label);
    }

    println!("\n✓ Configuration is valid");
}

/// Handles the --stats mode: shows statistics from the database
fn handle_stats(config: &Config) -> cite_ripple::Result<()> {
    println!("Database: {}\n", config.output.database_path);

    let storage = SqliteStorage::new(Path::new(&config.output.database_path))?;

    match storage.get_latest_run()? {
        Some(run) => {
            println!("Latest run #{} ({:?})", run.id, run.status);
            println!("  Started:  {}", run.started_at);
            if let Some(finished) = &run.finished_at {
                println!("  Finished: {}", finished);
            }
            if let Some(state) = &run.crawl_state {
                println!("  State:    {}", state);
            }
            println!("  Visited:  {}", run.visited);
            println!("  Discovered: {}", run.discovered);
        }
        None => println!("No runs recorded"),
    }

    let review = storage.load_review()?;
    println!("\nReview '{}':", review.name);
    println!("  Works:        {}", storage.count_works()?);
    println!("  Citations:    {}", storage.count_citations()?);
    println!("  Authors:      {}", review.authors.len());
    println!("  Funders:      {}", review.funders.len());
    println!("  Affiliations: {}", review.affiliations.len());

    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(config: Config, config_hash: String, fresh: bool) -> cite_ripple::Result<()> {
    let db_path = Path::new(&config.output.database_path);
    let mut storage = SqliteStorage::new(db_path)?;

    if let Some(run) = storage.get_latest_run()? {
        if run.status == RunStatus::Running {
            tracing::warn!("Run #{} did not finish, marking it interrupted", run.id);
            storage.update_run_status(run.id, RunStatus::Interrupted)?;
        }
    }

    let mut review = if fresh {
        tracing::info!("Starting a fresh review");
        Review::default()
    } else {
        storage.load_review()?
    };
    if review.name.is_empty() {
        review.name = db_path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| "review".to_string());
    }

    let resumed = review.works.len();
    let added = review.add_seeds(&config.seed);
    tracing::info!(
        "Review '{}': {} stored works, {} new seeds",
        review.name,
        resumed,
        added
    );

    let mut engine = CrawlEngine::from_config(&config)?;
    let run_id = storage.create_run(&config_hash)?;

    let report = review.crawl(&mut engine).await;

    if let Err(e) = storage.save_review(&review) {
        tracing::error!("Failed to save review: {}", e);
        storage.update_run_status(run_id, RunStatus::Failed)?;
        return Err(e.into());
    }
    storage.complete_run(run_id, &report)?;

    tracing::info!("Crawl finished: {}", report.state);
    println!("{}", report);

    Ok(())
}
