//! HTTP and local-file fetching.
//!
//! A thin wrapper over a shared [`reqwest::Client`]. `file://` URLs are
//! served straight from disk so runtime sources can point at local archives,
//! mirrors, or test fixtures.

use crate::error::{Error, FsContext, Result};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use url::Url;

/// Shared fetch client used by the runtime provisioner.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: reqwest::Client,
}

impl HttpClient {
    /// Builds a client, optionally bounding each request with a total timeout.
    pub fn new(timeout: Option<Duration>) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| Error::config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }

    /// Fetches the body of `url` as text.
    ///
    /// The body is returned verbatim, trailing whitespace included.
    pub async fn fetch_text(&self, url: &str) -> Result<String> {
        let parsed = parse_url(url)?;
        if parsed.scheme() == "file" {
            let path = file_url_path(&parsed)?;
            return tokio::fs::read_to_string(&path)
                .await
                .map_err(|e| Error::network(url, e));
        }

        let response = self.get(url).await?;
        response.text().await.map_err(|e| Error::network(url, e))
    }

    /// Downloads `url` to `dest`, streaming the body to disk.
    ///
    /// Parent directories of `dest` are created as necessary. Any existing
    /// file at `dest` is replaced.
    pub async fn download_to(&self, url: &str, dest: &Path) -> Result<()> {
        let parsed = parse_url(url)?;
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .fs_context("creating", parent)?;
        }

        if parsed.scheme() == "file" {
            let path = file_url_path(&parsed)?;
            tokio::fs::copy(&path, dest)
                .await
                .map_err(|e| Error::network(url, e))?;
            return Ok(());
        }

        log::info!("downloading {url}");
        let mut response = self.get(url).await?;
        let mut file = tokio::fs::File::create(dest)
            .await
            .fs_context("creating", dest)?;
        let mut written = 0u64;
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| Error::network(url, e))?
        {
            file.write_all(&chunk).await.fs_context("writing", dest)?;
            written += chunk.len() as u64;
        }
        file.flush().await.fs_context("writing", dest)?;
        log::debug!("downloaded {written} bytes from {url}");
        Ok(())
    }

    async fn get(&self, url: &str) -> Result<reqwest::Response> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| Error::network(url, e))?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::network(url, format!("unexpected status {status}")));
        }
        Ok(response)
    }
}

fn parse_url(url: &str) -> Result<Url> {
    Url::parse(url).map_err(|e| Error::config(format!("invalid URL {url}: {e}")))
}

/// Converts a `file://` URL into a local path.
pub fn file_url_path(url: &Url) -> Result<PathBuf> {
    url.to_file_path()
        .map_err(|()| Error::config(format!("file URL {url} has no local path")))
}
