//! Concurrent fan-out over work items with per-item failure isolation.
//!
//! Every scraper ends the same way: a list of items (song pages, tracks,
//! images), each needing one or more requests and file writes. [`run_all`]
//! drives them through `buffer_unordered`, never lets one item's error stop
//! the others, and tallies the outcomes into a [`DownloadReport`].

use crate::error::Result;
use crate::models::{DownloadReport, Harvested, ItemOutcome, OutcomeStatus};
use chrono::Local;
use futures::stream::{self, StreamExt};
use std::fmt::Display;
use std::future::Future;
use std::time::Instant;
use tracing::{error, info, warn};

/// Run `task` for every item with at most `concurrency` in flight.
///
/// Outcomes appear in the report in completion order. A `concurrency` of
/// zero is treated as one.
pub async fn run_all<I, F, Fut>(items: Vec<I>, concurrency: usize, task: F) -> DownloadReport
where
    I: Display,
    F: Fn(I) -> Fut,
    Fut: Future<Output = Result<Harvested>>,
{
    let started_at = Local::now().to_rfc3339();
    let t0 = Instant::now();
    let total = items.len();
    let concurrency = concurrency.max(1);
    info!(total, concurrency, "Starting batch");

    let task = &task;
    let outcomes: Vec<ItemOutcome> = stream::iter(items.into_iter().enumerate())
        .map(|(index, item)| async move {
            let label = item.to_string();
            info!(index, item = %label, "Fetching");
            let item_t0 = Instant::now();

            let status = match task(item).await {
                Ok(Harvested::Files { files, bytes }) => {
                    OutcomeStatus::Fetched { files, bytes }
                }
                Ok(Harvested::Skipped(reason)) => {
                    warn!(index, item = %label, %reason, "Skipped");
                    OutcomeStatus::Skipped { reason }
                }
                Err(e) => {
                    error!(index, item = %label, error = %e, "Item failed");
                    OutcomeStatus::Failed {
                        error: e.to_string(),
                    }
                }
            };

            let elapsed = item_t0.elapsed();
            info!(
                index,
                item = %label,
                secs = %format!("{:.2}", elapsed.as_secs_f64()),
                "Finished"
            );
            ItemOutcome {
                item: label,
                status,
                elapsed_ms: elapsed.as_millis() as u64,
            }
        })
        .buffer_unordered(concurrency)
        .collect()
        .await;

    let report = DownloadReport::from_outcomes(started_at, outcomes, t0.elapsed());
    info!(
        total = report.total(),
        fetched = report.fetched,
        skipped = report.skipped,
        failed = report.failed,
        files = report.files,
        bytes = report.bytes,
        elapsed_ms = report.elapsed_ms,
        "Batch complete"
    );
    report
}
