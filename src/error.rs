//! Error type shared by the fetcher, the parsers and the filesystem helpers.
//!
//! Every operation that can fail returns [`Result`]. Inside a batch the error
//! of a single item is rendered to a string and recorded in its
//! [`ItemOutcome`](crate::models::ItemOutcome); it never aborts the batch.

use std::path::PathBuf;

/// Errors that can occur while fetching, parsing or saving.
#[derive(Debug, thiserror::Error)]
pub enum ScrapeError {
    /// The shared HTTP client could not be constructed.
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    /// The request could not be sent or the body could not be read.
    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The server answered with anything other than `200 OK`.
    #[error("failed to fetch {url}: status {status}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },

    /// A page did not contain an element the parser relies on.
    #[error("{what} not found on {url}")]
    MissingElement { what: &'static str, url: String },

    #[error("invalid CSS selector '{selector}': {message}")]
    Selector { selector: String, message: String },

    #[error("invalid URL '{url}': {source}")]
    Url {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl ScrapeError {
    /// Closure adapter for `map_err` on filesystem calls.
    pub fn io(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.into();
        move |source| ScrapeError::Io { path, source }
    }

    /// Closure adapter for `map_err` on reqwest calls.
    pub fn http(url: &str) -> impl FnOnce(reqwest::Error) -> Self {
        let url = url.to_string();
        move |source| ScrapeError::Http { url, source }
    }

    /// True when the server answered but refused the request.
    pub fn is_status(&self) -> bool {
        matches!(self, ScrapeError::Status { .. })
    }
}

pub type Result<T> = std::result::Result<T, ScrapeError>;
