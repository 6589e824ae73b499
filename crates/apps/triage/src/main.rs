//! triage - Automated email classification for Gmail
//!
//! Scans the inbox for new messages, classifies them with an LLM, and
//! applies classification labels back to Gmail.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use log::{info, warn};

use mail::classify::{OpenAiClassifier, RunOptions, classify_batch};
use mail::config::{ClassifierConfig, GmailCredentials};
use mail::gmail::{GmailAuth, GmailClient, LabelCatalog, ListSelector, MessageFormat};
use mail::scan::GmailSource;
use mail::seen::{SeenStore, SqliteSeenStore};

mod report;

/// Filename of the seen-message database inside the config directory
const SEEN_DB_FILE: &str = "seen.sqlite";

#[derive(Parser)]
#[command(name = "triage")]
#[command(about = "Classify new Gmail messages with an LLM and label them")]
#[command(version)]
struct Args {
    /// Maximum number of emails to classify (default: all unclassified)
    #[arg(short = 'n', long)]
    limit: Option<usize>,

    /// Stop scanning after this many emails, classified or not
    #[arg(long)]
    scan_limit: Option<usize>,

    /// Classify but don't apply labels
    #[arg(long)]
    dry_run: bool,

    /// Show all classification results (not just requires_action)
    #[arg(short, long)]
    verbose: bool,

    /// Continuously watch for new emails
    #[arg(short, long)]
    watch: bool,

    /// Seconds between checks in watch mode
    #[arg(long, default_value_t = 30)]
    interval: u64,

    /// Max parallel classification requests
    #[arg(short, long, default_value_t = 10)]
    concurrency: usize,

    /// Sweep the whole mailbox instead of stopping at the first seen message
    #[arg(long)]
    all: bool,

    /// Forget all seen messages and exit
    #[arg(long)]
    clear_seen: bool,

    /// List Gmail labels and exit
    #[arg(long)]
    list_labels: bool,

    /// Path of the seen-message database (default: inside the config dir)
    #[arg(long)]
    seen_db: Option<PathBuf>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .format_timestamp_millis()
        .init();

    let args = Args::parse();

    config::init().context("Failed to initialize config directory")?;

    let seen_db_path = match &args.seen_db {
        Some(path) => path.clone(),
        None => config::data_path(SEEN_DB_FILE)?,
    };

    if args.clear_seen {
        let seen = SqliteSeenStore::open(&seen_db_path)?;
        let count = seen.count()?;
        seen.clear()?;
        println!("Cleared {} seen message(s) from {}", count, seen_db_path.display());
        return Ok(());
    }

    let credentials = GmailCredentials::load().context(
        "Gmail credentials not found. Place your Google OAuth credentials in the config \
         directory or set GMAIL_CLIENT_ID / GMAIL_CLIENT_SECRET.",
    )?;
    let auth = GmailAuth::new(credentials.client_id, credentials.client_secret)?;
    let client = GmailClient::new(auth);

    if args.list_labels {
        let labels = client.list_labels()?;
        report::print_labels(&labels);
        return Ok(());
    }

    let classifier = OpenAiClassifier::new(
        ClassifierConfig::load().context(
            "Classifier settings not found. Set OPENAI_API_KEY or create classifier.json \
             in the config directory.",
        )?,
    );

    let seen = SqliteSeenStore::open(&seen_db_path)?;
    let opts = RunOptions {
        limit: args.limit,
        scan_limit: args.scan_limit,
        dry_run: args.dry_run,
        ignore_seen: args.all,
        concurrency: args.concurrency,
    };

    if args.watch {
        watch(&client, &classifier, &seen, &opts, &args)
    } else {
        run_once(&client, &classifier, &seen, &opts, args.verbose)
    }
}

/// Run one scan-classify-label batch and print the results
fn run_once(
    client: &GmailClient,
    classifier: &OpenAiClassifier,
    seen: &SqliteSeenStore,
    opts: &RunOptions,
    verbose: bool,
) -> Result<()> {
    if opts.dry_run {
        println!("DRY RUN - labels will not be applied");
    }

    let scanner = GmailSource::new(client, ListSelector::default(), MessageFormat::Metadata);
    let detail = GmailSource::new(client, ListSelector::default(), MessageFormat::Full);
    let mut catalog = LabelCatalog::new(client);

    let summary = classify_batch(&scanner, &detail, seen, classifier, &mut catalog, opts)?;

    report::print_outcomes(&summary, verbose);
    report::print_summary(&summary, opts.dry_run);

    Ok(())
}

/// Poll for new messages until interrupted
fn watch(
    client: &GmailClient,
    classifier: &OpenAiClassifier,
    seen: &SqliteSeenStore,
    opts: &RunOptions,
    args: &Args,
) -> Result<()> {
    println!(
        "Watching for new emails every {}s (concurrency: {}). Press Ctrl+C to stop.",
        args.interval, opts.concurrency
    );

    loop {
        // A failed cycle shouldn't kill the watch; the next poll retries.
        if let Err(e) = run_once(client, classifier, seen, opts, args.verbose) {
            warn!("Run failed: {:#}", e);
        }

        info!("Next check in {}s", args.interval);
        std::thread::sleep(Duration::from_secs(args.interval));
    }
}
