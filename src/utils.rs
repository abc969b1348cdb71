//! Utility functions for file naming and output directory provisioning.
//!
//! - Filename sanitisation for titles scraped from wiki pages
//! - Extension inference from media URLs
//! - Collision-free output paths for items that share a name
//! - Directory reset/provisioning performed before each download run
//! - Writability check for the output root

use crate::error::{Result, ScrapeError};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;
use std::fs as stdfs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use tokio::fs;
use tracing::{debug, info, instrument};
use url::Url;

static FORBIDDEN_FILENAME_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"[\\/*?:"<>|]"#).expect("static regex"));

/// Replace characters that are not allowed in file names with `-`.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(sanitize_file_name("Tell Your World / 25-ji"), "Tell Your World - 25-ji");
/// ```
pub fn sanitize_file_name(name: &str) -> String {
    FORBIDDEN_FILENAME_CHARS.replace_all(name, "-").into_owned()
}

/// Infer a media file extension from its URL.
///
/// Wiki media URLs often end in `/revision/latest?cb=...`, so the path is
/// walked backwards until a segment with an extension is found. The query
/// string and fragment are ignored. Returns `fallback` when nothing matches.
pub fn media_extension(url: &str, fallback: &str) -> String {
    let path = match Url::parse(url) {
        Ok(parsed) => parsed.path().to_string(),
        Err(_) => url.split(['?', '#']).next().unwrap_or_default().to_string(),
    };

    path.rsplit('/')
        .filter_map(|segment| segment.rsplit_once('.').map(|(_, ext)| ext))
        .find(|ext| !ext.is_empty() && ext.len() <= 5 && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|ext| ext.to_ascii_lowercase())
        .unwrap_or_else(|| fallback.to_string())
}

/// Hands out output paths so that no two items of one run write to the same
/// file or directory.
///
/// The first claim of a path gets it unchanged; later claims get ` (2)`,
/// ` (3)`, ... appended to the name. Shared by reference between concurrent
/// tasks.
#[derive(Debug, Default)]
pub struct PathClaims {
    claimed: Mutex<HashSet<PathBuf>>,
}

impl PathClaims {
    /// Claim a file path; the counter goes before the extension.
    pub fn claim(&self, path: PathBuf) -> PathBuf {
        self.claim_with(path, true)
    }

    /// Claim a directory path; dots in the name are kept as they are.
    pub fn claim_dir(&self, path: PathBuf) -> PathBuf {
        self.claim_with(path, false)
    }

    fn claim_with(&self, path: PathBuf, split_extension: bool) -> PathBuf {
        let mut claimed = self.claimed.lock().unwrap_or_else(PoisonError::into_inner);
        if claimed.insert(path.clone()) {
            return path;
        }

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let (stem, ext) = match name.rsplit_once('.') {
            Some((stem, ext)) if split_extension && !stem.is_empty() => (stem.to_string(), Some(ext.to_string())),
            _ => (name.clone(), None),
        };

        let mut n = 2;
        loop {
            let candidate = match &ext {
                Some(ext) => path.with_file_name(format!("{stem} ({n}).{ext}")),
                None => path.with_file_name(format!("{stem} ({n})")),
            };
            if claimed.insert(candidate.clone()) {
                debug!(from = %path.display(), to = %candidate.display(), "Renamed duplicate output path");
                return candidate;
            }
            n += 1;
        }
    }
}

/// Remove `path` if it exists, then create it empty.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn reset_dir(path: &Path) -> Result<()> {
    if fs::try_exists(path).await.map_err(ScrapeError::io(path))? {
        info!("Removing existing directory");
        fs::remove_dir_all(path).await.map_err(ScrapeError::io(path))?;
    }
    info!("Creating directory");
    fs::create_dir_all(path).await.map_err(ScrapeError::io(path))
}

/// Reset `root` and create one empty subdirectory per entry in `subdirs`.
///
/// Returns the created subdirectory paths in the order given.
pub async fn provision_dirs(root: &Path, subdirs: &[&str]) -> Result<Vec<PathBuf>> {
    reset_dir(root).await?;
    let mut created = Vec::with_capacity(subdirs.len());
    for sub in subdirs {
        let dir = root.join(sub);
        info!(path = %dir.display(), "Creating directory");
        fs::create_dir(&dir).await.map_err(ScrapeError::io(&dir))?;
        created.push(dir);
    }
    info!(root = %root.display(), count = created.len(), "Setup complete");
    Ok(created)
}

/// Ensure a directory exists and is writable.
///
/// This function creates the directory if it doesn't exist, then performs
/// a write test by creating and immediately deleting a probe file.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn ensure_writable_dir(path: &Path) -> Result<()> {
    fs::create_dir_all(path).await.map_err(ScrapeError::io(path))?;
    // Try a small sync write using std fs (simpler error surface)
    let probe_path = path.join("..__probe_write__");
    stdfs::File::create(&probe_path).map_err(ScrapeError::io(&probe_path))?;
    let _ = stdfs::remove_file(&probe_path);
    info!("Output directory is writable");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_file_name() {
        assert_eq!(sanitize_file_name("Tell Your World"), "Tell Your World");
        assert_eq!(sanitize_file_name("a/b\\c"), "a-b-c");
        assert_eq!(sanitize_file_name(r#"What?*:"<>|"#), "What-------");
        assert_eq!(sanitize_file_name("1 - Ready Steady"), "1 - Ready Steady");
    }

    #[test]
    fn test_media_extension_from_wiki_revision_url() {
        let url = "https://static.wikia.nocookie.net/projectsekai/images/a/ab/Song.ogg/revision/latest?cb=20201001";
        assert_eq!(media_extension(url, "mp3"), "ogg");
    }

    #[test]
    fn test_media_extension_plain_and_fallback() {
        assert_eq!(media_extension("https://i.pximg.net/img/123_p0.JPG", "png"), "jpg");
        assert_eq!(media_extension("https://example.com/media/latest", "mp3"), "mp3");
        assert_eq!(media_extension("https://example.com/", "mp3"), "mp3");
        assert_eq!(media_extension("relative/clip.wav?x=1", "mp3"), "wav");
    }

    #[test]
    fn test_media_extension_ignores_hostname() {
        assert_eq!(media_extension("https://cdn.example.com", "ogg"), "ogg");
    }

    #[test]
    fn test_path_claims_number_repeated_files() {
        let claims = PathClaims::default();
        let dir = Path::new("soundtrack");
        let name = "1 - Constant Moderato - Mitsukiyo.ogg";

        assert_eq!(claims.claim(dir.join(name)), dir.join(name));
        assert_eq!(
            claims.claim(dir.join(name)),
            dir.join("1 - Constant Moderato - Mitsukiyo (2).ogg")
        );
        assert_eq!(
            claims.claim(dir.join(name)),
            dir.join("1 - Constant Moderato - Mitsukiyo (3).ogg")
        );
        assert_eq!(claims.claim(dir.join("2 - Other.ogg")), dir.join("2 - Other.ogg"));
    }

    #[test]
    fn test_path_claims_skip_names_already_taken() {
        let claims = PathClaims::default();
        let dir = Path::new("out");

        claims.claim(dir.join("a (2).mp3"));
        claims.claim(dir.join("a.mp3"));

        assert_eq!(claims.claim(dir.join("a.mp3")), dir.join("a (3).mp3"));
    }

    #[test]
    fn test_path_claims_dir_keeps_dots() {
        let claims = PathClaims::default();
        let dir = Path::new("songs/cover_songs").join("Mr. Kid - Ver. 2");

        assert_eq!(claims.claim_dir(dir.clone()), dir);
        assert_eq!(
            claims.claim_dir(dir.clone()),
            Path::new("songs/cover_songs").join("Mr. Kid - Ver. 2 (2)")
        );
    }

    #[tokio::test]
    async fn test_reset_dir_clears_previous_contents() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("image");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("old.jpg"), b"stale").unwrap();

        reset_dir(&dir).await.unwrap();

        assert!(dir.is_dir());
        assert_eq!(std::fs::read_dir(&dir).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_provision_dirs_creates_subdirs() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("songs");

        let created = provision_dirs(&root, &["cover_songs", "contest_songs"]).await.unwrap();

        assert_eq!(created, vec![root.join("cover_songs"), root.join("contest_songs")]);
        assert!(root.join("cover_songs").is_dir());
        assert!(root.join("contest_songs").is_dir());
    }

    #[tokio::test]
    async fn test_ensure_writable_dir_creates_missing() {
        let tmp = tempfile::tempdir().unwrap();
        let out = tmp.path().join("nested/out");
        ensure_writable_dir(&out).await.unwrap();
        assert!(out.is_dir());
        assert!(!out.join("..__probe_write__").exists());
    }
}
