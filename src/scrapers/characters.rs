//! Blue Archive student listing.
//!
//! The student category page carries a single `article-table`; every row
//! after the header links to a character page from its first cell.

use super::selector;
use crate::error::{Result, ScrapeError};
use crate::http::Fetcher;
use crate::models::CharacterLink;
use scraper::Html;
use tracing::{debug, info, instrument, warn};
use url::Url;

/// Category page listing every playable student.
pub const CATEGORY_URL: &str = "https://bluearchive.fandom.com/wiki/Category:Students";

/// Extract character links from the category page.
///
/// # Errors
///
/// Returns [`ScrapeError::MissingElement`] if the page has no
/// `table.article-table`.
pub fn parse_character_links(html: &str, page_url: &str) -> Result<Vec<CharacterLink>> {
    let base = Url::parse(page_url).map_err(|source| ScrapeError::Url {
        url: page_url.to_string(),
        source,
    })?;
    let document = Html::parse_document(html);
    let table_sel = selector("table.article-table")?;
    let row_sel = selector("tr")?;
    let cell_sel = selector("td")?;
    let link_sel = selector("a[href]")?;

    let table = document
        .select(&table_sel)
        .next()
        .ok_or_else(|| ScrapeError::MissingElement {
            what: "table.article-table",
            url: page_url.to_string(),
        })?;

    let mut links = Vec::new();
    for (index, row) in table.select(&row_sel).enumerate().skip(1) {
        let href = row
            .select(&cell_sel)
            .next()
            .and_then(|cell| cell.select(&link_sel).next())
            .and_then(|a| a.value().attr("href"));
        let Some(href) = href else {
            debug!(row = index, "Row has no character link");
            continue;
        };
        match base.join(href) {
            Ok(url) => links.push(CharacterLink {
                href: href.to_string(),
                url: url.to_string(),
            }),
            Err(e) => warn!(row = index, %href, error = %e, "Unresolvable character link"),
        }
    }
    Ok(links)
}

/// Fetch the category page and list every character link on it.
#[instrument(level = "info", skip(fetcher))]
pub async fn index_characters(fetcher: &Fetcher, category_url: &str) -> Result<Vec<CharacterLink>> {
    let html = fetcher.get_text(category_url).await?;
    let links = parse_character_links(&html, category_url)?;
    info!(count = links.len(), source = category_url, "Indexed character pages");
    Ok(links)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::test_server::serve;
    use std::time::Duration;

    const CATEGORY: &str = r#"
        <html><body>
        <table class="article-table sortable">
          <tr><th>Name</th><th>School</th></tr>
          <tr><td><a href="/wiki/Aru">Aru</a></td><td>Gehenna</td></tr>
          <tr><td><span>no link</span></td><td>?</td></tr>
          <tr><td><a href="/wiki/Hoshino">Hoshino</a> <a href="/wiki/Other">x</a></td><td>Abydos</td></tr>
        </table>
        </body></html>"#;

    #[test]
    fn test_parse_character_links() {
        let links = parse_character_links(CATEGORY, CATEGORY_URL).unwrap();
        assert_eq!(
            links,
            vec![
                CharacterLink {
                    href: "/wiki/Aru".to_string(),
                    url: "https://bluearchive.fandom.com/wiki/Aru".to_string(),
                },
                CharacterLink {
                    href: "/wiki/Hoshino".to_string(),
                    url: "https://bluearchive.fandom.com/wiki/Hoshino".to_string(),
                },
            ]
        );
    }

    #[test]
    fn test_missing_table_is_error() {
        let err = parse_character_links("<html><body><p>nothing</p></body></html>", CATEGORY_URL)
            .unwrap_err();
        assert!(matches!(err, ScrapeError::MissingElement { what: "table.article-table", .. }));
    }

    #[test]
    fn test_invalid_page_url() {
        let err = parse_character_links(CATEGORY, "not a url").unwrap_err();
        assert!(matches!(err, ScrapeError::Url { .. }));
    }

    #[tokio::test]
    async fn test_index_characters_over_http() {
        let server = serve(vec![("/wiki/Category:Students", 200, CATEGORY.as_bytes().to_vec())]).await;
        let base = server.uri();
        let fetcher = Fetcher::new(Duration::from_secs(5)).unwrap();
        let url = format!("{base}/wiki/Category:Students");

        let links = index_characters(&fetcher, &url).await.unwrap();

        assert_eq!(links.len(), 2);
        assert_eq!(links[0].url, format!("{base}/wiki/Aru"));
    }
}
