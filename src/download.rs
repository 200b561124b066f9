//! Downloading generated images to disk.

use crate::error::Result;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Raw result of fetching a URL.
#[derive(Debug, Clone)]
pub struct FetchedResource {
    /// HTTP status code.
    pub status: u16,
    /// Response body.
    pub bytes: Vec<u8>,
}

/// Fetches resources by URL.
#[async_trait]
pub trait ImageFetcher: Send + Sync {
    /// Performs a GET and returns status and body.
    async fn fetch(&self, url: &str) -> Result<FetchedResource>;
}

/// [`ImageFetcher`] backed by a shared `reqwest::Client`.
#[derive(Debug, Clone, Default)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    /// Creates a fetcher using the given client.
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ImageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedResource> {
        let response = self.client.get(url).send().await?;
        let status = response.status().as_u16();
        let bytes = if status == 200 {
            response.bytes().await?.to_vec()
        } else {
            Vec::new()
        };
        Ok(FetchedResource { status, bytes })
    }
}

/// Result of a download attempt that reached the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadOutcome {
    /// Bytes were written to this path.
    Saved(PathBuf),
    /// The server answered with a non-200 status; nothing was written.
    Rejected { status: u16 },
}

/// Downloads `url` and writes the body verbatim to `path`, replacing any
/// existing file.
///
/// The parent directory must already exist.
pub async fn download_image(
    fetcher: &dyn ImageFetcher,
    url: &str,
    path: &Path,
) -> Result<DownloadOutcome> {
    let resource = fetcher.fetch(url).await?;
    if resource.status != 200 {
        tracing::warn!(url, status = resource.status, "failed to download image");
        return Ok(DownloadOutcome::Rejected {
            status: resource.status,
        });
    }

    tokio::fs::write(path, &resource.bytes).await?;
    tracing::info!(path = %path.display(), size_bytes = resource.bytes.len(), "saved image");
    Ok(DownloadOutcome::Saved(path.to_path_buf()))
}
