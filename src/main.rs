use crate::batch::{discover_batch_files, BatchWriter};
use crate::config::AppConfig;
use crate::db::connection::{init_db, Database};
use crate::db::scrapes::{end_scrape_run, start_scrape_run, RunTotals};
use crate::responses::error_to_response;
use crate::router::handle;
use crate::scraper::{HttpFetcher, NextDataExtractor, PartitionScheduler, RandomPacer};
use anyhow::Context;
use astra::Server;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{error, info, warn};

mod batch;
mod config;
mod db;
mod domain;
mod errors;
mod ingest;
mod responses;
mod router;
mod scraper;
mod spreadsheets;
mod telemetry;
mod templates;

#[cfg(test)]
mod tests;

#[derive(Parser, Debug)]
#[command(
    name = "warsaw_flats",
    about = "Crawl Warsaw flat listings, load them into SQLite and browse the market",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Crawl district partitions into this month's batch file
    Scrape(ScrapeArgs),
    /// Load batch files into the store, skipping offers already stored
    Load(LoadArgs),
    /// Start the market view HTTP server (default command)
    Serve(ServeArgs),
}

#[derive(Args, Debug, Default)]
struct ScrapeArgs {
    /// Only crawl these districts (repeatable); defaults to the configured list
    #[arg(long)]
    district: Vec<String>,
}

#[derive(Args, Debug, Default)]
struct LoadArgs {
    /// Directory searched for `flats_YYYY-MM.csv` when no files are given
    #[arg(long)]
    dir: Option<PathBuf>,
    /// Batch files to load
    files: Vec<PathBuf>,
}

#[derive(Args, Debug, Default)]
struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    port: Option<u16>,
}

fn main() {
    if let Err(err) = run_cli() {
        eprintln!("application error: {err:#}");
        std::process::exit(1);
    }
}

fn run_cli() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::load().context("loading configuration")?;
    telemetry::init(&config.telemetry)?;

    let db = Database::new(config.store.db_path.to_string_lossy().into_owned());
    init_db(&db).context("initializing the store")?;

    match cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()))
    {
        Command::Scrape(args) => run_scrape(&config, &db, args),
        Command::Load(args) => run_load(&config, &db, args),
        Command::Serve(args) => run_server(config, db, args),
    }
}

fn now_unix() -> i64 {
    chrono::Utc::now().timestamp()
}

/// Ctrl-C sets the flag; the scheduler checks it before each partition.
fn install_stop_flag() -> Arc<AtomicBool> {
    let stop = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&stop);

    std::thread::spawn(move || {
        let runtime = match tokio::runtime::Builder::new_current_thread()
            .enable_io()
            .build()
        {
            Ok(rt) => rt,
            Err(e) => {
                warn!(error = %e, "interrupt handler unavailable");
                return;
            }
        };
        if runtime.block_on(tokio::signal::ctrl_c()).is_ok() {
            warn!("interrupt received, stopping after the current partition");
            flag.store(true, Ordering::SeqCst);
        }
    });

    stop
}

fn run_scrape(config: &AppConfig, db: &Database, args: ScrapeArgs) -> anyhow::Result<()> {
    let districts = if args.district.is_empty() {
        config.crawl.districts.clone()
    } else {
        args.district
    };

    let writer = BatchWriter::current_month(&config.store.data_dir);
    let batch_file = writer.path().display().to_string();
    let fetcher = HttpFetcher::new(&config.crawl.client_config(), config.crawl.browser_settings())
        .context("building the HTTP client")?;

    let run_id = db.with_conn(|conn| start_scrape_run(conn, &batch_file, now_unix()))?;

    let mut scheduler = PartitionScheduler::new(
        fetcher,
        NextDataExtractor,
        RandomPacer::new(config.crawl.pacing),
        writer,
        config.crawl.crawl_settings(),
    )
    .with_stop_flag(install_stop_flag());
    let summary = scheduler.run(&districts);

    let failed = summary.failed();
    let totals = RunTotals {
        partitions_done: summary.outcomes.len() - failed.len(),
        partitions_failed: failed.len(),
        pages: summary.pages(),
        records: summary.records(),
    };
    let error_message = if summary.interrupted {
        Some("interrupted".to_string())
    } else if !failed.is_empty() {
        Some(format!("failed partitions: {}", failed.join(", ")))
    } else {
        None
    };
    let success = error_message.is_none();

    db.with_conn(|conn| end_scrape_run(conn, run_id, now_unix(), &totals, success, error_message))?;
    info!(
        file = %batch_file,
        records = totals.records,
        failed = totals.partitions_failed,
        "scrape recorded"
    );
    Ok(())
}

fn run_load(config: &AppConfig, db: &Database, args: LoadArgs) -> anyhow::Result<()> {
    let files = if args.files.is_empty() {
        let dir = args.dir.unwrap_or_else(|| config.store.data_dir.clone());
        discover_batch_files(&dir).with_context(|| format!("listing {}", dir.display()))?
    } else {
        args.files
    };

    if files.is_empty() {
        warn!("no batch files to load");
        return Ok(());
    }

    let summary = ingest::load(db, &files).context("loading batch files")?;
    report_failed_files(&summary);
    Ok(())
}

fn report_failed_files(summary: &ingest::LoadSummary) {
    let failed = summary.failed_paths();
    if failed.is_empty() {
        return;
    }
    let files: Vec<String> = failed.iter().map(|p| p.display().to_string()).collect();
    error!(failed_files = failed.len(), ?files, "some files were not loaded");
}

fn run_server(mut config: AppConfig, db: Database, args: ServeArgs) -> anyhow::Result<()> {
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }

    let addr = config.server.socket_addr()?;
    info!(%addr, "starting server");

    let server = Server::bind(addr).max_workers(8);

    server
        .serve(move |req, _info| match handle(req, &db) {
            Ok(resp) => resp,
            Err(err) => error_to_response(err),
        })
        .context("server ended with error")?;

    info!("server shut down cleanly");
    Ok(())
}
