//! Blue Archive soundtrack listing.
//!
//! The soundtrack `wikitable` groups variants of one theme with `rowspan`
//! cells, so a continuation row is missing the track number (and sometimes
//! the artist) of the row above it. Both are carried forward while walking
//! the table.
//!
//! Row layout, after the two header rows:
//!
//! ```text
//! | track no. | title | artist | ... | <audio src> |
//! ```

use super::{element_text, own_text, selector};
use crate::error::{Result, ScrapeError};
use crate::harvest::run_all;
use crate::http::Fetcher;
use crate::models::{DownloadReport, Harvested, Track};
use crate::utils::{PathClaims, media_extension, reset_dir, sanitize_file_name};
use scraper::Html;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument};

/// Soundtrack page.
pub const SOUNDTRACK_URL: &str = "https://bluearchive.fandom.com/wiki/Soundtrack";

/// Output directory name under the output root.
pub const SOUNDTRACK_DIR: &str = "soundtrack";

const HEADER_ROWS: usize = 2;

/// Extract every playable track from the soundtrack page.
///
/// # Errors
///
/// Returns [`ScrapeError::MissingElement`] if the page has no
/// `table.wikitable`.
pub fn parse_soundtrack(html: &str, page_url: &str) -> Result<Vec<Track>> {
    let document = Html::parse_document(html);
    let table_sel = selector("table.wikitable")?;
    let row_sel = selector("tr")?;
    let cell_sel = selector("td")?;
    let audio_sel = selector("audio[src]")?;

    let table = document
        .select(&table_sel)
        .next()
        .ok_or_else(|| ScrapeError::MissingElement {
            what: "table.wikitable",
            url: page_url.to_string(),
        })?;

    let mut tracks = Vec::new();
    let mut track_no: i64 = 0;
    let mut artist = String::new();

    for (index, row) in table.select(&row_sel).enumerate().skip(HEADER_ROWS) {
        let cells: Vec<_> = row.select(&cell_sel).collect();
        let Some((last, leading)) = cells.split_last() else {
            continue;
        };
        let Some(audio_url) = last
            .select(&audio_sel)
            .next()
            .and_then(|audio| audio.value().attr("src"))
        else {
            debug!(row = index, "Row has no audio");
            continue;
        };

        let has_track_info = match element_text(cells[0]).parse::<i64>() {
            Ok(n) => {
                track_no = n;
                true
            }
            Err(_) => false,
        };

        if cells.len() > 2 {
            artist = element_text(cells[2]);
        }

        let parts = leading.iter().map(|cell| own_text(*cell));
        let name = if has_track_info {
            parts.collect::<Vec<_>>().join(" - ")
        } else {
            std::iter::once(track_no.to_string())
                .chain(parts)
                .chain(std::iter::once(artist.clone()))
                .collect::<Vec<_>>()
                .join(" - ")
        };

        tracks.push(Track {
            name,
            audio_url: audio_url.to_string(),
        });
    }
    Ok(tracks)
}

/// Fetch the soundtrack page and list its tracks.
#[instrument(level = "info", skip(fetcher))]
pub async fn index_tracks(fetcher: &Fetcher, page_url: &str) -> Result<Vec<Track>> {
    let html = fetcher.get_text(page_url).await?;
    let tracks = parse_soundtrack(&html, page_url)?;
    info!(count = tracks.len(), source = page_url, "Indexed soundtrack");
    Ok(tracks)
}

/// Path a track is saved to inside `dir`.
pub fn track_path(dir: &Path, track: &Track) -> PathBuf {
    let ext = media_extension(&track.audio_url, "mp3");
    dir.join(format!("{}.{}", sanitize_file_name(&track.name), ext))
}

/// A track paired with the file it will be written to.
struct PlannedTrack {
    track: Track,
    path: PathBuf,
}

impl fmt::Display for PlannedTrack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.track, f)
    }
}

async fn save_track(fetcher: &Fetcher, planned: PlannedTrack) -> Result<Harvested> {
    let bytes = fetcher.download_to(&planned.track.audio_url, &planned.path).await?;
    Ok(Harvested::Files { files: 1, bytes })
}

/// Reset `dir` and download every track into it concurrently.
///
/// Rowspan variants can share a name, so every track gets its own path
/// before the downloads start; repeats are numbered ` (2)`, ` (3)`, ...
#[instrument(level = "info", skip_all, fields(dir = %dir.display(), count = tracks.len()))]
pub async fn download_tracks(
    fetcher: &Fetcher,
    tracks: Vec<Track>,
    dir: &Path,
    concurrency: usize,
) -> Result<DownloadReport> {
    reset_dir(dir).await?;

    let claims = PathClaims::default();
    let planned: Vec<_> = tracks
        .into_iter()
        .map(|track| {
            let path = claims.claim(track_path(dir, &track));
            PlannedTrack { track, path }
        })
        .collect();

    let report = run_all(planned, concurrency, |planned| save_track(fetcher, planned)).await;

    info!(fetched = report.fetched, failed = report.failed, "Soundtrack download finished");
    Ok(report)
}
