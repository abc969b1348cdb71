//! JSON manifest of a download run.
//!
//! The manifest is the serialised [`DownloadReport`]: counts at the top and
//! one entry per item with its status, file count and elapsed time.

use crate::error::{Result, ScrapeError};
use crate::models::DownloadReport;
use std::path::Path;
use tokio::fs;
use tracing::{info, instrument};

/// Write `report` as pretty-printed JSON to `path`, creating parent
/// directories as needed.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn write_manifest(report: &DownloadReport, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(report)?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).await.map_err(ScrapeError::io(parent))?;
    }

    fs::write(path, json).await.map_err(ScrapeError::io(path))?;
    info!(items = report.total(), "Wrote manifest");
    Ok(())
}
