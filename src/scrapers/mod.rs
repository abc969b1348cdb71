//! Site scrapers.
//!
//! Each module covers one listing and follows the same split:
//!
//! 1. **Parsing**: pure functions turning page HTML into owned rows
//!    (`parse_*`). `scraper::Html` is not `Send`, so documents never live
//!    across an await point.
//! 2. **Fetching**: async functions that GET the listing, parse it and, where
//!    the tool downloads media, hand the rows to [`crate::harvest::run_all`].
//!
//! | Tool | Module | Site | Downloads |
//! |------|--------|------|-----------|
//! | Students | [`characters`] | Blue Archive wiki | no |
//! | Soundtrack | [`soundtrack`] | Blue Archive wiki | optional |
//! | Song list | [`songs`] | Project SEKAI wiki | yes |
//! | Gallery | [`gallery`] | pixiv | yes |

use crate::error::{Result, ScrapeError};
use scraper::{ElementRef, Selector};

pub mod characters;
pub mod gallery;
pub mod songs;
pub mod soundtrack;

/// Parse a CSS selector, keeping the failing text in the error.
pub(crate) fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| ScrapeError::Selector {
        selector: css.to_string(),
        message: e.to_string(),
    })
}

/// All text under `element`, concatenated and trimmed.
pub(crate) fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

/// The first text node that is a direct child of `element`, trimmed.
///
/// Text inside nested tags such as `<a>` or `<small>` is not considered.
/// Returns an empty string when the element has no direct text.
pub(crate) fn own_text(element: ElementRef<'_>) -> String {
    element
        .children()
        .find_map(|node| node.value().as_text().map(|t| t.trim().to_string()))
        .unwrap_or_default()
}
