//! pixiv gallery scraper.
//!
//! pixiv rejects requests without a browser `User-Agent` and an accounts
//! `Referer`, so the gallery uses its own [`Fetcher`] built from
//! [`gallery_headers`]. Every `<img src>` on the page is saved into
//! `image/` under its position on the page.

use super::selector;
use crate::error::{Result, ScrapeError};
use crate::harvest::run_all;
use crate::http::Fetcher;
use crate::models::{DownloadReport, Harvested};
use crate::utils::{media_extension, reset_dir};
use itertools::Itertools;
use reqwest::header::{HeaderMap, HeaderValue, REFERER, USER_AGENT};
use scraper::Html;
use std::fmt;
use std::path::Path;
use tracing::{info, instrument, warn};
use url::Url;

/// Page read when neither a tag nor a page is given.
pub const SITE_URL: &str = "https://www.pixiv.net/";

/// Tag search prefix; the tag is appended URL-encoded.
pub const TAG_SEARCH_URL: &str = "https://www.pixiv.net/en/tags/";

/// Output directory name under the output root.
pub const IMAGE_DIR: &str = "image";

const REFERER_VALUE: &str = "https://accounts.pixiv.net/";
const USER_AGENT_VALUE: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/58.0.3029.110 Safari/537.3";

/// Headers pixiv expects on every request.
pub fn gallery_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(REFERER, HeaderValue::from_static(REFERER_VALUE));
    headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_VALUE));
    headers
}

pub fn tag_url(tag: &str) -> String {
    format!("{TAG_SEARCH_URL}{}", urlencoding::encode(tag))
}

/// The page to scrape: an explicit page, else the tag search, else the
/// site front page.
pub fn page_url(tag: Option<&str>, page: Option<&str>) -> String {
    match (tag, page) {
        (_, Some(page)) => page.to_string(),
        (Some(tag), None) => tag_url(tag),
        (None, None) => SITE_URL.to_string(),
    }
}

/// One image found on the gallery page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GalleryImage {
    /// Position on the page, starting at 1.
    pub index: usize,
    pub url: String,
}

impl fmt::Display for GalleryImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.url)
    }
}

/// Collect image URLs from a page, resolved against `page_url`.
///
/// Inline `data:` images are ignored and repeated URLs are kept once, in
/// order of first appearance.
pub fn parse_image_urls(html: &str, page_url: &str) -> Result<Vec<GalleryImage>> {
    let base = Url::parse(page_url).map_err(|source| ScrapeError::Url {
        url: page_url.to_string(),
        source,
    })?;
    let document = Html::parse_document(html);
    let img_sel = selector("img[src]")?;

    let images = document
        .select(&img_sel)
        .filter_map(|img| img.value().attr("src"))
        .filter(|src| !src.starts_with("data:"))
        .filter_map(|src| match base.join(src) {
            Ok(url) => Some(url.to_string()),
            Err(e) => {
                warn!(%src, error = %e, "Unresolvable image source");
                None
            }
        })
        .unique()
        .enumerate()
        .map(|(i, url)| GalleryImage { index: i + 1, url })
        .collect();
    Ok(images)
}

async fn save_image(fetcher: &Fetcher, dir: &Path, image: GalleryImage) -> Result<Harvested> {
    let ext = media_extension(&image.url, "jpg");
    let path = dir.join(format!("{:04}.{ext}", image.index));
    let bytes = fetcher.download_to(&image.url, &path).await?;
    Ok(Harvested::Files { files: 1, bytes })
}

/// Reset the image directory and download every image on `page_url`.
///
/// A gallery page that cannot be fetched is logged and produces an empty
/// report instead of an error.
#[instrument(level = "info", skip(fetcher, output_dir))]
pub async fn harvest_gallery(
    fetcher: &Fetcher,
    page_url: &str,
    output_dir: &Path,
    concurrency: usize,
) -> Result<DownloadReport> {
    let dir = output_dir.join(IMAGE_DIR);
    reset_dir(&dir).await?;

    let html = match fetcher.get_text(page_url).await {
        Ok(html) => html,
        Err(e) if e.is_status() => {
            warn!(url = page_url, error = %e, "Failed to get {page_url}");
            return Ok(DownloadReport::default());
        }
        Err(e) => return Err(e),
    };

    let images = parse_image_urls(&html, page_url)?;
    info!(count = images.len(), "Found gallery images");

    let dir = dir.as_path();
    Ok(run_all(images, concurrency, |image| save_image(fetcher, dir, image)).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::test_server::serve;
    use std::time::Duration;

    #[test]
    fn test_tag_url_encodes() {
        assert_eq!(tag_url("ブルーアーカイブ"), format!("{TAG_SEARCH_URL}%E3%83%96%E3%83%AB%E3%83%BC%E3%82%A2%E3%83%BC%E3%82%AB%E3%82%A4%E3%83%96"));
        assert_eq!(tag_url("blue archive"), "https://www.pixiv.net/en/tags/blue%20archive");
    }

    #[test]
    fn test_page_url_prefers_page_then_tag() {
        assert_eq!(page_url(None, Some("https://www.pixiv.net/ranking.php")), "https://www.pixiv.net/ranking.php");
        assert_eq!(page_url(Some("a b"), None), "https://www.pixiv.net/en/tags/a%20b");
        assert_eq!(page_url(None, None), SITE_URL);
    }

    #[test]
    fn test_gallery_headers() {
        let headers = gallery_headers();
        assert_eq!(headers[REFERER], "https://accounts.pixiv.net/");
        assert!(headers[USER_AGENT].to_str().unwrap().starts_with("Mozilla/5.0"));
    }

    #[test]
    fn test_parse_image_urls_resolves_and_dedupes() {
        let html = r#"<html><body>
            <img src="/img/a.jpg">
            <img src="https://i.pximg.net/b.png">
            <img src="data:image/gif;base64,R0lGOD">
            <img src="/img/a.jpg">
            <img alt="no src">
        </body></html>"#;
        let images = parse_image_urls(html, SITE_URL).unwrap();
        assert_eq!(
            images,
            vec![
                GalleryImage { index: 1, url: "https://www.pixiv.net/img/a.jpg".into() },
                GalleryImage { index: 2, url: "https://i.pximg.net/b.png".into() },
            ]
        );
    }

    #[tokio::test]
    async fn test_harvest_gallery_downloads_images() {
        let page = r#"<html><body><img src="/p/1.png"><img src="/p/missing.jpg"></body></html>"#;
        let server = serve(vec![
            ("/en/tags/x", 200, page.as_bytes().to_vec()),
            ("/p/1.png", 200, b"PNG".to_vec()),
        ])
        .await;
        let base = server.uri();
        let tmp = tempfile::tempdir().unwrap();
        let fetcher = Fetcher::with_headers(Duration::from_secs(5), gallery_headers()).unwrap();

        let report = harvest_gallery(&fetcher, &format!("{base}/en/tags/x"), tmp.path(), 2)
            .await
            .unwrap();

        assert_eq!(report.fetched, 1);
        assert_eq!(report.failed, 1);
        assert_eq!(std::fs::read(tmp.path().join("image/0001.png")).unwrap(), b"PNG");
    }

    #[tokio::test]
    async fn test_harvest_gallery_page_error_is_empty_report() {
        let server = serve(vec![]).await;
        let base = server.uri();
        let tmp = tempfile::tempdir().unwrap();
        let fetcher = Fetcher::new(Duration::from_secs(5)).unwrap();

        let report = harvest_gallery(&fetcher, &format!("{base}/en/tags/none"), tmp.path(), 2)
            .await
            .unwrap();

        assert_eq!(report.total(), 0);
        assert!(tmp.path().join(IMAGE_DIR).is_dir());
    }
}
