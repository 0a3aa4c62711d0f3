//! Note-Harvester main entry point
//!
//! This is the command-line interface for the incremental note harvester.

use anyhow::Context;
use clap::Parser;
use note_harvester::config::{load_config_with_hash, resolve_cutoff, Config, CrawlMode};
use note_harvester::crawler::{run_harvest, Collaborators, CrawlStatus, RunReport};
use note_harvester::item::read_owner_list;
use note_harvester::output::{
    collect_range_entries, export_csv, load_statistics, parse_range_bound, print_statistics,
    read_recipients, ChatSummarizer, DigestBuilder, DigestOutcome, WebhookNotifier,
};
use note_harvester::provider::{
    build_http_client, CommandSigner, CookieSigner, RequestSigner, WebApiSource,
};
use note_harvester::sink::{CommandExtractor, DisabledExtractor, MediaDownloader, TextExtractor};
use note_harvester::storage::open_storage;
use note_harvester::HarvestError;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Note-Harvester: an incremental note feed archiver
///
/// Walks each listed owner's notes, fetches the ones not captured yet,
/// archives them with their media and builds a digest of the new ones.
#[derive(Parser, Debug)]
#[command(name = "note-harvester")]
#[command(version = "1.0.0")]
#[command(about = "An incremental note feed archiver", long_about = None)]
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

    /// Rebuild each owner's records instead of merging into them
    #[arg(long)]
    fresh: bool,

    /// Override the crawl mode (first-page or exhaustive)
    #[arg(long, value_name = "MODE")]
    mode: Option<String>,

    /// Override the cutoff interval (all, 1day, 1week, 7d, YYYY-MM-DD, ...)
    #[arg(long, value_name = "INTERVAL")]
    since: Option<String>,

    /// Enable on-image text extraction for this run
    #[arg(long)]
    ocr: bool,

    /// Validate config and show what would be crawled without crawling
    #[arg(long, conflicts_with_all = ["stats", "export", "digest_range"])]
    dry_run: bool,

    /// Show statistics from the database and exit
    #[arg(long, conflicts_with_all = ["dry_run", "export", "digest_range"])]
    stats: bool,

    /// Export stored records to one CSV file per owner and exit
    #[arg(long, value_name = "DIR", conflicts_with_all = ["dry_run", "stats", "digest_range"])]
    export: Option<PathBuf>,

    /// Build a digest of stored notes uploaded between two YYYYMMDDHHMM bounds and exit
    #[arg(long, num_args = 2, value_names = ["START", "END"], conflicts_with_all = ["dry_run", "stats", "export"])]
    digest_range: Option<Vec<String>>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (mut config, config_hash) = match load_config_with_hash(&cli.config) {
        Ok((cfg, hash)) => {
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            (cfg, hash)
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };
    apply_overrides(&mut config, &cli)?;

    // Handle different modes
    if cli.dry_run {
        handle_dry_run(&config)?;
    } else if cli.stats {
        handle_stats(&config)?;
    } else if let Some(dir) = &cli.export {
        handle_export(&config, dir)?;
    } else if let Some(bounds) = &cli.digest_range {
        handle_digest_range(&config, &bounds[0], &bounds[1]).await?;
    } else {
        handle_harvest(&config, &config_hash).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("note_harvester=info,warn"),
            1 => EnvFilter::new("note_harvester=debug,info"),
            2 => EnvFilter::new("note_harvester=trace,debug"),
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

/// Applies command-line overrides on top of the loaded configuration
fn apply_overrides(config: &mut Config, cli: &Cli) -> anyhow::Result<()> {
    if cli.fresh {
        config.crawler.update = false;
    }
    if let Some(mode) = &cli.mode {
        config.crawler.mode = CrawlMode::parse(mode)
            .with_context(|| format!("unknown crawl mode: {}", mode))?;
    }
    if let Some(interval) = &cli.since {
        config.crawler.interval = interval.clone();
    }
    if cli.ocr {
        config.ocr.enabled = true;
    }
    Ok(())
}

/// Handles the --dry-run mode: validates config and shows what would be crawled
fn handle_dry_run(config: &Config) -> anyhow::Result<()> {
    println!("=== Note-Harvester Dry Run ===\n");

    let now = chrono::Local::now().naive_local();
    println!("Crawler Configuration:");
    println!("  Mode: {:?}", config.crawler.mode);
    println!("  Interval: {}", config.crawler.interval);
    match resolve_cutoff(&config.crawler.interval, now) {
        Some(cutoff) => println!("  Cutoff: {}", cutoff.format("%Y-%m-%d %H:%M:%S")),
        None => println!("  Cutoff: none"),
    }
    println!("  Update existing records: {}", config.crawler.update);
    println!("  Stale tolerance: {}", config.crawler.stale_tolerance);
    if let Some(max) = config.crawler.max_items {
        println!("  Max notes per owner: {}", max);
    }
    println!("  Item delay: {}s", config.crawler.item_delay_secs);

    println!("\nProvider:");
    println!("  API: {}", config.provider.base_url);
    println!("  Cookies from: ${}", config.provider.cookies_env);
    if config.provider.signer_command.is_empty() {
        println!("  Signer: cookies only");
    } else {
        println!("  Signer: {}", config.provider.signer_command.join(" "));
    }

    println!("\nOutput:");
    println!("  Database: {}", config.output.database_path);
    println!("  Media root: {}", config.output.media_root);
    println!("  Media: {:?}", config.output.media);
    println!("  OCR: {}", config.ocr.enabled);
    println!("  Digest: {}", config.digest.enabled);

    let owners = read_owner_list(Path::new(&config.input.owners_file))?;
    println!("\nOwners ({}):", owners.len());
    for owner in &owners {
        println!("  - {}", owner.owner_id);
    }

    println!("\n✓ Configuration is valid");
    Ok(())
}

/// Handles the --stats mode: shows statistics from the database
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    println!("Database: {}\n", config.output.database_path);

    let storage = open_storage(Path::new(&config.output.database_path))?;
    let stats = load_statistics(&storage)?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the --export mode: writes one CSV per owner
fn handle_export(config: &Config, dir: &Path) -> anyhow::Result<()> {
    let storage = open_storage(Path::new(&config.output.database_path))?;
    let files = export_csv(&storage, dir)?;

    println!("✓ Exported {} owner file(s) to {}", files.len(), dir.display());
    Ok(())
}

/// Handles the --digest-range mode: digests stored notes within a time range
async fn handle_digest_range(config: &Config, start: &str, end: &str) -> anyhow::Result<()> {
    let start_at = parse_range_bound(start)?;
    let end_at = parse_range_bound(end)?;

    let storage = open_storage(Path::new(&config.output.database_path))?;
    let entries = collect_range_entries(&storage, start_at, end_at)?;
    tracing::info!("{} stored notes uploaded between {} and {}", entries.len(), start, end);

    let client = build_http_client(&config.provider)?;
    let builder = build_digest(config, &client)?;
    let outcome = builder.run(&format!("{}_to_{}", start, end), &entries).await?;
    print_digest(&outcome);

    Ok(())
}

/// Handles the main harvest operation
async fn handle_harvest(config: &Config, config_hash: &str) -> anyhow::Result<()> {
    if config.crawler.update {
        tracing::info!("Starting incremental run (known notes are skipped)");
    } else {
        tracing::info!("Starting fresh run (owner records are rebuilt)");
    }

    let collaborators = build_collaborators(config)?;

    match run_harvest(config, config_hash, collaborators).await {
        Ok(report) => {
            print_report(&report);
            Ok(())
        }
        Err(e) => {
            tracing::error!("Run failed: {}", e);
            Err(e.into())
        }
    }
}

/// Builds the long-lived collaborators of a run
fn build_collaborators(config: &Config) -> Result<Collaborators, HarvestError> {
    let cookies = std::env::var(&config.provider.cookies_env)
        .map_err(|_| HarvestError::MissingEnv(config.provider.cookies_env.clone()))?;
    let client = build_http_client(&config.provider)?;

    let cookie_signer = CookieSigner::new(&cookies, config.provider.web_url.clone());
    let signer: Arc<dyn RequestSigner> = if config.provider.signer_command.is_empty() {
        Arc::new(cookie_signer)
    } else {
        Arc::new(CommandSigner::new(
            cookie_signer,
            &config.provider.signer_command,
        )?)
    };

    let source = Arc::new(WebApiSource::new(
        client.clone(),
        signer,
        config.provider.base_url.clone(),
        config.crawler.page_size,
    ));

    let extractor: Arc<dyn TextExtractor> = if config.ocr.enabled {
        match CommandExtractor::detect(&config.ocr.command, &config.ocr.args) {
            Some(extractor) => Arc::new(extractor),
            None => {
                tracing::warn!(
                    "OCR program {} not found, text extraction disabled",
                    config.ocr.command
                );
                Arc::new(DisabledExtractor)
            }
        }
    } else {
        Arc::new(DisabledExtractor)
    };

    let digest = if config.digest.enabled {
        Some(build_digest(config, &client)?)
    } else {
        None
    };

    Ok(Collaborators {
        source,
        downloader: MediaDownloader::new(client),
        extractor,
        digest,
    })
}

/// Builds the digest builder with its summarizer and notifier
fn build_digest(config: &Config, client: &reqwest::Client) -> Result<DigestBuilder, HarvestError> {
    let summarizer = ChatSummarizer::new(
        client.clone(),
        config.summarizer.base_url.clone(),
        config.summarizer.model.clone(),
        config.summarizer.system_prompt.clone(),
        config.summarizer.api_key_env.clone(),
    );

    let recipients = config
        .digest
        .recipients_file
        .as_deref()
        .map(|path| read_recipients(Path::new(path)))
        .unwrap_or_default();

    let app_token = if recipients.is_empty() {
        String::new()
    } else {
        std::env::var(&config.notifier.app_token_env)
            .map_err(|_| HarvestError::MissingEnv(config.notifier.app_token_env.clone()))?
    };
    let notifier = WebhookNotifier::new(client.clone(), config.notifier.endpoint.clone(), app_token);

    Ok(DigestBuilder::new(
        Arc::new(summarizer),
        Arc::new(notifier),
        recipients,
        config.digest.output_dir.clone(),
    ))
}

fn print_report(report: &RunReport) {
    println!("\n=== Run {} ===\n", report.run_id);
    for owner in &report.owners {
        let status = match owner.status {
            CrawlStatus::Success => "ok",
            CrawlStatus::Failed => "FAILED",
        };
        println!(
            "  {}: {} new, {} stale, stopped on {:?} [{}] {}",
            owner.owner_id, owner.new_items, owner.stale_items, owner.halt, status, owner.message
        );
    }
    println!("\nTotal new notes: {}", report.total_new);
    if let Some(outcome) = &report.digest {
        print_digest(outcome);
    }
}

fn print_digest(outcome: &DigestOutcome) {
    match outcome {
        DigestOutcome::Skipped => println!("Digest: nothing new"),
        DigestOutcome::Summarized {
            summary_path,
            notified,
            ..
        } => println!(
            "Digest: {} (sent to {} recipient(s))",
            summary_path.display(),
            notified
        ),
    }
}
