//! Command-line interface definitions for fandom_harvest.
//!
//! This module defines the CLI arguments and options using the `clap` crate.
//! Global options can also be provided through environment variables.

use crate::scrapers::{characters, songs, soundtrack};
use clap::builder::RangedU64ValueParser;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Command-line arguments for fandom_harvest.
///
/// # Examples
///
/// ```sh
/// # List student pages
/// fandom_harvest characters
///
/// # Download every song preview, 16 songs at a time
/// fandom_harvest -o ./out -c 16 songs --manifest ./out/songs.json
///
/// # Download images from a tag page with resource usage reporting
/// fandom_harvest --monitor gallery --tag "ブルーアーカイブ"
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Root directory for downloaded media
    #[arg(short, long, env = "HARVEST_OUTPUT_DIR", default_value = ".", global = true)]
    pub output_dir: PathBuf,

    /// Maximum number of items fetched at the same time
    #[arg(
        short,
        long,
        env = "HARVEST_CONCURRENCY",
        default_value_t = 8,
        value_parser = RangedU64ValueParser::<usize>::new().range(1..),
        global = true
    )]
    pub concurrency: usize,

    /// Per-request timeout in seconds
    #[arg(long, env = "HARVEST_TIMEOUT_SECS", default_value_t = 30, global = true)]
    pub timeout_secs: u64,

    /// Sample memory and CPU usage in the background and log the peaks
    #[arg(long, global = true)]
    pub monitor: bool,

    /// Write the download report as JSON to this path
    #[arg(long, global = true)]
    pub manifest: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Command {
    /// List character pages from the student category table
    Characters {
        /// Category page to read
        #[arg(long, default_value = characters::CATEGORY_URL)]
        url: String,
    },

    /// List soundtrack tracks, optionally downloading them
    Soundtrack {
        /// Soundtrack page to read
        #[arg(long, default_value = soundtrack::SOUNDTRACK_URL)]
        url: String,

        /// Download every track into <output-dir>/soundtrack
        #[arg(long)]
        download: bool,
    },

    /// Download every song's audio from the song list into <output-dir>/songs
    Songs {
        /// Wiki root the song list and song links belong to
        #[arg(long, default_value = songs::SITE_URL)]
        site: String,
    },

    /// Download every image on a gallery page into <output-dir>/image
    ///
    /// Without `--tag` or `--page` the pixiv front page is read.
    Gallery {
        /// Tag to search for
        #[arg(long, conflicts_with = "page")]
        tag: Option<String>,

        /// Gallery page URL to read instead of a tag search
        #[arg(long)]
        page: Option<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::parse_from(["fandom_harvest", "characters"]);

        assert_eq!(cli.output_dir, PathBuf::from("."));
        assert_eq!(cli.concurrency, 8);
        assert_eq!(cli.timeout_secs, 30);
        assert!(!cli.monitor);
        assert_eq!(cli.manifest, None);
        assert_eq!(
            cli.command,
            Command::Characters {
                url: characters::CATEGORY_URL.to_string()
            }
        );
    }

    #[test]
    fn test_cli_global_flags_after_subcommand() {
        let cli = Cli::parse_from([
            "fandom_harvest",
            "songs",
            "-o",
            "/tmp/out",
            "-c",
            "3",
            "--monitor",
            "--manifest",
            "/tmp/out/songs.json",
        ]);

        assert_eq!(cli.output_dir, PathBuf::from("/tmp/out"));
        assert_eq!(cli.concurrency, 3);
        assert!(cli.monitor);
        assert_eq!(cli.manifest, Some(PathBuf::from("/tmp/out/songs.json")));
        assert_eq!(
            cli.command,
            Command::Songs {
                site: songs::SITE_URL.to_string()
            }
        );
    }

    #[test]
    fn test_cli_rejects_zero_concurrency() {
        assert!(Cli::try_parse_from(["fandom_harvest", "-c", "0", "songs"]).is_err());
    }

    #[test]
    fn test_soundtrack_download_flag() {
        let cli = Cli::parse_from(["fandom_harvest", "soundtrack", "--download"]);
        assert_eq!(
            cli.command,
            Command::Soundtrack {
                url: soundtrack::SOUNDTRACK_URL.to_string(),
                download: true,
            }
        );
    }

    #[test]
    fn test_gallery_tag_and_page() {
        let cli = Cli::parse_from(["fandom_harvest", "gallery"]);
        assert_eq!(cli.command, Command::Gallery { tag: None, page: None });
        assert!(
            Cli::try_parse_from(["fandom_harvest", "gallery", "--tag", "a", "--page", "b"]).is_err()
        );
        let cli = Cli::parse_from(["fandom_harvest", "gallery", "--tag", "blue archive"]);
        assert_eq!(
            cli.command,
            Command::Gallery {
                tag: Some("blue archive".to_string()),
                page: None
            }
        );
    }
}
