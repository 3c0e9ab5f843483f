use anyhow::Result;
use listing_bidder::config::Config;
use listing_bidder::engine::message::load_templates;
use listing_bidder::engine::DedupLedger;
use listing_bidder::execution::{DryRunSubmitter, FormSubmitter, SubmissionPort};
use listing_bidder::feed::rss::RssFeed;
use listing_bidder::feed::ListingFeed;
use listing_bidder::pipeline::DispatchPipeline;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

const LOG_FILE: &str = "listing-bidder.log";

fn config_path() -> PathBuf {
    let args: Vec<String> = std::env::args().collect();
    args.iter()
        .position(|a| a == "--config")
        .and_then(|i| args.get(i + 1))
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("config.toml"))
}

#[tokio::main]
async fn main() -> Result<()> {
    let log_file = std::fs::File::create(LOG_FILE)?;
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("listing_bidder=info")),
        )
        .with_writer(log_file)
        .with_ansi(false)
        .init();

    let config = Config::load(&config_path())?;
    let dry_run = config.submission.dry_run || std::env::args().any(|arg| arg == "--dry-run");

    // Load saved credentials from .env (real env vars take precedence)
    Config::load_env_file();

    println!();
    println!("  Listing Bidder v{}", env!("CARGO_PKG_VERSION"));
    println!("  ===================");
    println!();
    if dry_run {
        println!("  ** DRY RUN ** (offers are logged, nothing is posted or recorded)");
        println!();
    }

    let mut port: Box<dyn SubmissionPort> = if dry_run {
        Box::new(DryRunSubmitter::new())
    } else {
        let credentials = Config::credentials()?;
        Box::new(FormSubmitter::new(
            &config.submission.base_url,
            &config.submission.sign_in_path,
            config.submission.request_timeout_ms,
            credentials,
        )?)
    };

    let ledger = DedupLedger::load(&config.ledger.path)?;
    let templates = load_templates(&config.messages.directory);
    println!(
        "  Ledger: {} listings already handled. Templates: {}.",
        ledger.len(),
        templates.len()
    );

    let feed = RssFeed::new(&config.feed.url, config.feed.request_timeout_ms)?;
    let entries = feed.fetch_listings().await?;
    println!("  Feed: {} listings.", entries.len());
    println!();

    let mut pipeline = DispatchPipeline::new(
        ledger,
        templates,
        config.filter.criteria(),
        StdRng::from_entropy(),
    );
    let summary = pipeline
        .run(&entries, port.as_mut(), chrono::Utc::now)
        .await?;

    for outcome in &summary.outcomes {
        println!("  {}", outcome.status_line());
    }
    println!();
    println!(
        "  Done: {} submitted, {} failed, {} skipped.",
        summary.submitted(),
        summary.failed(),
        summary.skipped()
    );

    tracing::debug!("shutting down");
    Ok(())
}
