//! Shared HTTP fetcher.
//!
//! One [`Fetcher`] is built per run and cloned into every concurrent task so
//! all requests reuse the same connection pool. Any status other than
//! `200 OK` is treated as a failure.

use crate::error::{Result, ScrapeError};
use futures::StreamExt;
use reqwest::header::HeaderMap;
use reqwest::{Client, Response, StatusCode};
use std::path::Path;
use std::time::Duration;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, instrument, warn};

/// Thin wrapper around a configured `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
}

impl Fetcher {
    /// Build a fetcher with a per-request timeout and no extra headers.
    pub fn new(timeout: Duration) -> Result<Self> {
        Self::with_headers(timeout, HeaderMap::new())
    }

    /// Build a fetcher that sends `headers` with every request.
    pub fn with_headers(timeout: Duration, headers: HeaderMap) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()
            .map_err(ScrapeError::Client)?;
        Ok(Self { client })
    }

    async fn get_ok(&self, url: &str) -> Result<Response> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(ScrapeError::http(url))?;
        let status = response.status();
        if status != StatusCode::OK {
            return Err(ScrapeError::Status {
                url: url.to_string(),
                status,
            });
        }
        Ok(response)
    }

    /// GET a page and return its body as text.
    #[instrument(level = "debug", skip(self))]
    pub async fn get_text(&self, url: &str) -> Result<String> {
        let body = self
            .get_ok(url)
            .await?
            .text()
            .await
            .map_err(ScrapeError::http(url))?;
        debug!(bytes = body.len(), "Fetched page");
        Ok(body)
    }

    /// GET `url` and stream the body into a new file at `path`.
    ///
    /// Returns the number of bytes written. If the transfer fails midway the
    /// partial file is removed.
    #[instrument(level = "debug", skip(self, path), fields(path = %path.display()))]
    pub async fn download_to(&self, url: &str, path: &Path) -> Result<u64> {
        let response = self.get_ok(url).await?;
        let mut file = fs::File::create(path).await.map_err(ScrapeError::io(path))?;

        match stream_body(response, &mut file, url, path).await {
            Ok(written) => {
                debug!(bytes = written, "Saved file");
                Ok(written)
            }
            Err(e) => {
                drop(file);
                if let Err(rm) = fs::remove_file(path).await {
                    warn!(error = %rm, "Could not remove partial file");
                }
                Err(e)
            }
        }
    }
}

async fn stream_body(response: Response, file: &mut fs::File, url: &str, path: &Path) -> Result<u64> {
    let mut stream = response.bytes_stream();
    let mut written = 0u64;
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(ScrapeError::http(url))?;
        file.write_all(&chunk).await.map_err(ScrapeError::io(path))?;
        written += chunk.len() as u64;
    }
    file.flush().await.map_err(ScrapeError::io(path))?;
    Ok(written)
}
