//! Project SEKAI song list scraper.
//!
//! The song list page has four `wikitable`s (pre-existing, cover,
//! commissioned, contest). Every row links to a song page whose infobox
//! names the song and its unit, and whose `article-table`s list the game
//! versions with an `<audio>` preview in the last column.
//!
//! Songs are fetched concurrently; the tracks of one song are saved one
//! after another into `songs/<kind>/<artist> - <title>/`. A track that fails
//! to download does not stop the rest of its song.

use super::{element_text, selector};
use crate::error::{Result, ScrapeError};
use crate::harvest::run_all;
use crate::http::Fetcher;
use crate::models::{DownloadReport, Harvested, SongKind, SongRef, SongTrack};
use crate::utils::{PathClaims, provision_dirs, sanitize_file_name};
use itertools::Itertools;
use scraper::Html;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tokio::fs;
use tracing::{debug, info, instrument, warn};

/// Wiki root; song hrefs on the list are site-relative.
pub const SITE_URL: &str = "https://projectsekai.fandom.com";

/// Path of the song list on the wiki.
pub const SONG_LIST_PATH: &str = "/wiki/Song_List";

/// Output directory name under the output root.
pub const SONGS_DIR: &str = "songs";

/// Saved audio is always named `.mp3`.
const AUDIO_EXTENSION: &str = "mp3";

/// Title, artist and track rows pulled from one song page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SongPage {
    pub title: String,
    pub artist: String,
    pub tracks: Vec<SongTrack>,
}

impl SongPage {
    /// `<artist> - <title>`, safe to use as a directory name.
    pub fn dir_name(&self) -> String {
        sanitize_file_name(&format!("{} - {}", self.artist, self.title))
    }
}

/// Build the song list URL for a wiki root.
pub fn song_list_url(site: &str) -> String {
    format!("{}{}", site.trim_end_matches('/'), SONG_LIST_PATH)
}

/// Collect every song page linked from the song list.
///
/// Tables are matched to [`SongKind::ALL`] in page order. Missing tables
/// are logged and the rest are still used. A song listed twice in the same
/// table is kept once.
pub fn parse_song_list(html: &str, site: &str) -> Result<Vec<SongRef>> {
    let document = Html::parse_document(html);
    let table_sel = selector("table.wikitable")?;
    let row_sel = selector("tr")?;
    let cell_sel = selector("td")?;
    let link_sel = selector("a[href]")?;
    let site = site.trim_end_matches('/');

    let tables: Vec<_> = document.select(&table_sel).collect();
    if tables.len() < SongKind::ALL.len() {
        warn!(
            found = tables.len(),
            expected = SongKind::ALL.len(),
            "Song list has fewer tables than song kinds"
        );
    }

    let mut songs = Vec::new();
    for (kind, table) in SongKind::ALL.into_iter().zip(tables) {
        let before = songs.len();
        for row in table.select(&row_sel).skip(1) {
            let href = row
                .select(&cell_sel)
                .next()
                .and_then(|cell| cell.select(&link_sel).next())
                .and_then(|a| a.value().attr("href"));
            match href {
                Some(href) => songs.push(SongRef {
                    kind,
                    url: format!("{site}{href}"),
                }),
                None => warn!(%kind, "Song row without a link"),
            }
        }
        info!(%kind, count = songs.len() - before, "Indexed song table");
    }

    let listed = songs.len();
    let songs: Vec<_> = songs.into_iter().unique().collect();
    if songs.len() < listed {
        debug!(dropped = listed - songs.len(), "Dropped repeated song rows");
    }
    Ok(songs)
}

/// Pull the title, artist and track rows out of a song page.
///
/// Returns `Ok(None)` when the artist cannot be determined; the page is
/// then skipped rather than failed.
///
/// # Errors
///
/// Returns [`ScrapeError::MissingElement`] if the infobox title is absent.
pub fn parse_song_page(html: &str, page_url: &str) -> Result<Option<SongPage>> {
    let document = Html::parse_document(html);
    let title_sel = selector("h2.pi-title")?;
    let table_sel = selector("table.article-table")?;
    let row_sel = selector("tr")?;
    let cell_sel = selector("td")?;
    let audio_sel = selector("audio[src]")?;

    let title = document
        .select(&title_sel)
        .next()
        .map(element_text)
        .ok_or_else(|| ScrapeError::MissingElement {
            what: "h2.pi-title",
            url: page_url.to_string(),
        })?;

    let Some(artist) = find_artist(&document)? else {
        return Ok(None);
    };

    let mut tracks = Vec::new();
    for table in document.select(&table_sel) {
        for row in table.select(&row_sel).skip(1) {
            let cells: Vec<_> = row.select(&cell_sel).collect();
            let [first, second, ..] = cells.as_slice() else {
                if !cells.is_empty() {
                    warn!(url = page_url, "Track row without a title cell");
                }
                continue;
            };
            let number = element_text(*first);
            let title = element_text(*second);
            let audio_url = cells
                .last()
                .and_then(|cell| cell.select(&audio_sel).next())
                .and_then(|audio| audio.value().attr("src"))
                .map(str::to_string);
            tracks.push(SongTrack {
                number,
                title,
                audio_url,
            });
        }
    }

    Ok(Some(SongPage {
        title,
        artist,
        tracks,
    }))
}

/// The unit link in bold if there is one, otherwise the composer.
fn find_artist(document: &Html) -> Result<Option<String>> {
    let unit_sel = selector(r#"div[data-source="unit"]"#)?;
    let composer_sel = selector(r#"div[data-source="composer"]"#)?;
    let bold_sel = selector("b")?;
    let link_sel = selector("a")?;
    let inner_div_sel = selector("div")?;

    let Some(unit) = document.select(&unit_sel).next() else {
        return Ok(None);
    };

    if let Some(bold) = unit.select(&bold_sel).next() {
        return Ok(bold.select(&link_sel).next().map(element_text));
    }

    Ok(document
        .select(&composer_sel)
        .next()
        .and_then(|composer| composer.select(&inner_div_sel).next())
        .map(element_text))
}

/// File path for one track inside the song directory.
pub fn song_track_path(dir: &Path, track: &SongTrack) -> PathBuf {
    let name = sanitize_file_name(&format!("{} - {}", track.number, track.title));
    dir.join(format!("{name}.{AUDIO_EXTENSION}"))
}

/// Fetch one song page and save each of its audio tracks.
///
/// Tracks are saved one by one. A failed track is logged and the next one
/// is tried; the song only fails when none of its tracks could be saved.
/// Output paths are taken from `claims`, so songs or tracks that sanitise to
/// the same name do not overwrite each other.
#[instrument(level = "info", skip(fetcher, root, claims, song), fields(url = %song.url, kind = %song.kind))]
pub async fn fetch_song(
    fetcher: &Fetcher,
    root: &Path,
    claims: &PathClaims,
    song: SongRef,
) -> Result<Harvested> {
    let t0 = Instant::now();
    let html = fetcher.get_text(&song.url).await?;
    let Some(page) = parse_song_page(&html, &song.url)? else {
        warn!(url = %song.url, "Artist not found");
        return Ok(Harvested::Skipped("artist not found".to_string()));
    };
    if page.tracks.is_empty() {
        return Ok(Harvested::Skipped("no track rows".to_string()));
    }

    let dir = claims.claim_dir(root.join(song.kind.dir_name()).join(page.dir_name()));
    fs::create_dir_all(&dir).await.map_err(ScrapeError::io(&dir))?;

    let mut files = 0;
    let mut bytes = 0;
    let mut failed = 0;
    let mut last_error = None;
    for track in &page.tracks {
        let Some(audio_url) = &track.audio_url else {
            warn!(url = %song.url, no = %track.number, title = %track.title, "Audio not found");
            continue;
        };
        let path = claims.claim(song_track_path(&dir, track));
        match fetcher.download_to(audio_url, &path).await {
            Ok(written) => {
                bytes += written;
                files += 1;
            }
            Err(e) => {
                warn!(url = %song.url, no = %track.number, title = %track.title, error = %e, "Track download failed");
                failed += 1;
                last_error = Some(e);
            }
        }
    }

    if files == 0 {
        if let Some(e) = last_error {
            return Err(e);
        }
    }

    info!(
        title = %page.title,
        artist = %page.artist,
        files,
        failed,
        secs = %format!("{:.2}", t0.elapsed().as_secs_f64()),
        "Fetched song"
    );
    Ok(Harvested::Files { files, bytes })
}

/// Reset the songs directory, index the song list and fetch every song.
#[instrument(level = "info", skip(fetcher, output_dir))]
pub async fn harvest_songs(
    fetcher: &Fetcher,
    site: &str,
    output_dir: &Path,
    concurrency: usize,
) -> Result<DownloadReport> {
    let root = output_dir.join(SONGS_DIR);
    let kinds: Vec<&str> = SongKind::ALL.iter().map(|k| k.dir_name()).collect();
    provision_dirs(&root, &kinds).await?;

    let list_url = song_list_url(site);
    let html = fetcher.get_text(&list_url).await?;
    let songs = parse_song_list(&html, site)?;
    info!(count = songs.len(), "Indexed songs");

    let root = root.as_path();
    let claims = PathClaims::default();
    let claims = &claims;
    let report = run_all(songs, concurrency, |song| fetch_song(fetcher, root, claims, song)).await;
    info!(fetched = report.fetched, failed = report.failed, "Song download finished");
    Ok(report)
}
