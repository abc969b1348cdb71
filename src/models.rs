//! Data models for scraped listings and batch download results.
//!
//! - [`CharacterLink`], [`Track`], [`SongRef`], [`SongTrack`]: rows pulled out
//!   of wiki tables
//! - [`ItemOutcome`] and [`DownloadReport`]: what a concurrent batch produced,
//!   serialised to the JSON manifest

use serde::Serialize;
use std::fmt;
use std::time::Duration;

/// A character page linked from the student category table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CharacterLink {
    /// The href exactly as it appears in the table.
    pub href: String,
    /// The href resolved against the category page.
    pub url: String,
}

/// One playable row of the soundtrack table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Track {
    /// Display name assembled from the row's cells.
    pub name: String,
    /// The `src` of the row's `<audio>` element.
    pub audio_url: String,
}

impl fmt::Display for Track {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// The four song tables of the song list, in page order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SongKind {
    PreExisting,
    Cover,
    Commissioned,
    Contest,
}

impl SongKind {
    /// Kinds in the order their tables appear on the song list.
    pub const ALL: [SongKind; 4] = [
        SongKind::PreExisting,
        SongKind::Cover,
        SongKind::Commissioned,
        SongKind::Contest,
    ];

    /// Directory name under the songs root.
    pub fn dir_name(self) -> &'static str {
        match self {
            SongKind::PreExisting => "pre-existing_songs",
            SongKind::Cover => "cover_songs",
            SongKind::Commissioned => "commissioned_songs",
            SongKind::Contest => "contest_songs",
        }
    }
}

impl fmt::Display for SongKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir_name())
    }
}

/// A song page discovered on the song list.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SongRef {
    pub kind: SongKind,
    pub url: String,
}

impl fmt::Display for SongRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.url)
    }
}

/// One row of a song page's audio table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SongTrack {
    pub number: String,
    pub title: String,
    /// `None` when the row carries no `<audio>` element.
    pub audio_url: Option<String>,
}

/// What a single item task produced when it did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Harvested {
    /// Files were written to disk.
    Files { files: usize, bytes: u64 },
    /// The page was reachable but had nothing usable.
    Skipped(String),
}

/// Final state of one item in a batch.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum OutcomeStatus {
    Fetched { files: usize, bytes: u64 },
    Skipped { reason: String },
    Failed { error: String },
}

/// The result of one item, labelled for the report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemOutcome {
    pub item: String,
    #[serde(flatten)]
    pub status: OutcomeStatus,
    pub elapsed_ms: u64,
}

/// Aggregate result of a concurrent batch.
///
/// `fetched + skipped + failed` always equals `items.len()`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DownloadReport {
    /// RFC 3339 local time at which the batch started.
    pub started_at: String,
    pub fetched: usize,
    pub skipped: usize,
    pub failed: usize,
    /// Total files written across all items.
    pub files: usize,
    /// Total bytes written across all items.
    pub bytes: u64,
    pub elapsed_ms: u64,
    pub items: Vec<ItemOutcome>,
}

impl DownloadReport {
    /// Tally a finished batch.
    pub fn from_outcomes(started_at: String, outcomes: Vec<ItemOutcome>, elapsed: Duration) -> Self {
        let mut report = DownloadReport {
            started_at,
            elapsed_ms: elapsed.as_millis() as u64,
            ..Default::default()
        };
        for outcome in &outcomes {
            match &outcome.status {
                OutcomeStatus::Fetched { files, bytes } => {
                    report.fetched += 1;
                    report.files += files;
                    report.bytes += bytes;
                }
                OutcomeStatus::Skipped { .. } => report.skipped += 1,
                OutcomeStatus::Failed { .. } => report.failed += 1,
            }
        }
        report.items = outcomes;
        report
    }

    /// Total number of items in the batch.
    pub fn total(&self) -> usize {
        self.items.len()
    }
}
