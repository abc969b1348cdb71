//! # fandom_harvest
//!
//! Scrapes listings from fan wikis and an image gallery, and downloads the
//! media they link to.
//!
//! ## Tools
//!
//! - `characters`: student pages from the Blue Archive wiki category table
//! - `soundtrack`: tracks of the Blue Archive soundtrack table, optionally
//!   downloaded
//! - `songs`: every song on the Project SEKAI song list, with each song's
//!   audio previews saved per kind, artist and title
//! - `gallery`: every image on a pixiv tag or gallery page
//!
//! ## Usage
//!
//! ```sh
//! fandom_harvest -o ./out --manifest ./out/songs.json songs
//! ```
//!
//! ## Architecture
//!
//! Every downloading tool runs the same pipeline:
//! 1. **Setup**: Reset the tool's output directory
//! 2. **Indexing**: Fetch the listing page and turn its table rows into items
//! 3. **Fetching**: Fan the items out concurrently (bounded by
//!    `--concurrency`); each item fetches its own page and streams its media
//!    to disk, and a failing item is recorded without stopping the rest
//! 4. **Report**: Log the aggregate counts and optionally write a JSON
//!    manifest

use clap::Parser;
use std::error::Error;
use std::time::Duration;
use tracing::{debug, error, info};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod cli;
mod error;
mod harvest;
mod http;
mod models;
mod monitor;
mod outputs;
mod scrapers;
mod utils;

use cli::{Cli, Command};
use http::Fetcher;
use models::DownloadReport;
use monitor::{ResourceMonitor, SAMPLE_INTERVAL};
use outputs::manifest;
use scrapers::{characters, gallery, songs, soundtrack};
use utils::ensure_writable_dir;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    let args = Cli::parse();
    debug!(?args, "Parsed CLI arguments");

    let monitor = args.monitor.then(|| ResourceMonitor::start(SAMPLE_INTERVAL));

    let result = run(&args).await;

    if let Some(monitor) = monitor {
        let usage = monitor.stop();
        info!(
            peak_memory_mib = %format!("{:.2}", usage.peak_memory_mib()),
            peak_cpu_percent = %format!("{:.2}", usage.peak_cpu_percent),
            samples = usage.samples,
            "Resource usage: {usage}"
        );
    }

    let report = match result {
        Ok(report) => report,
        Err(e) => {
            error!(error = %e, "Run failed");
            return Err(e.into());
        }
    };

    if let (Some(report), Some(path)) = (&report, &args.manifest) {
        if let Err(e) = manifest::write_manifest(report, path).await {
            error!(path = %path.display(), error = %e, "Failed to write manifest");
        }
    }

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        "Execution complete"
    );
    Ok(())
}

/// Run the selected tool. Listing-only tools return no report.
async fn run(args: &Cli) -> error::Result<Option<DownloadReport>> {
    let timeout = Duration::from_secs(args.timeout_secs);

    match &args.command {
        Command::Characters { url } => {
            let fetcher = Fetcher::new(timeout)?;
            for link in characters::index_characters(&fetcher, url).await? {
                debug!(url = %link.url, "Character page");
                println!("{}", link.href);
            }
            Ok(None)
        }

        Command::Soundtrack { url, download } => {
            let fetcher = Fetcher::new(timeout)?;
            let tracks = soundtrack::index_tracks(&fetcher, url).await?;
            for track in &tracks {
                println!("{}\t{}", track.name, track.audio_url);
            }
            if !*download {
                return Ok(None);
            }
            ensure_writable_dir(&args.output_dir).await?;
            let dir = args.output_dir.join(soundtrack::SOUNDTRACK_DIR);
            let report = soundtrack::download_tracks(&fetcher, tracks, &dir, args.concurrency).await?;
            Ok(Some(report))
        }

        Command::Songs { site } => {
            ensure_writable_dir(&args.output_dir).await?;
            let fetcher = Fetcher::new(timeout)?;
            let report = songs::harvest_songs(&fetcher, site, &args.output_dir, args.concurrency).await?;
            Ok(Some(report))
        }

        Command::Gallery { tag, page } => {
            ensure_writable_dir(&args.output_dir).await?;
            let fetcher = Fetcher::with_headers(timeout, gallery::gallery_headers())?;
            let page_url = gallery::page_url(tag.as_deref(), page.as_deref());
            let report =
                gallery::harvest_gallery(&fetcher, &page_url, &args.output_dir, args.concurrency).await?;
            Ok(Some(report))
        }
    }
}
