use crate::extract::ImageDescriptor;
use crate::{HarvestError, Result};
use futures_util::StreamExt;
use reqwest::Client;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

/// Downloads images to disk with a streaming GET
#[derive(Debug, Clone)]
pub struct ImageFetcher {
    client: Client,
}

/// Outcome of one image download attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadStatus {
    Downloaded { bytes: u64 },
    Failed { error: String },
}

/// Result of attempting one image of a product
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadOutcome {
    pub url: String,
    pub path: PathBuf,
    pub status: DownloadStatus,
}

impl DownloadOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self.status, DownloadStatus::Downloaded { .. })
    }
}

impl ImageFetcher {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Streams `url` into `destination`, creating parent directories as needed
    ///
    /// Any non-2xx response, request error or write error is a failure. A
    /// partially written file is removed before the error is returned.
    ///
    /// # Returns
    ///
    /// * `Ok(u64)` - Number of bytes written
    /// * `Err(HarvestError)` - The download failed
    pub async fn fetch(&self, url: &str, destination: &Path) -> Result<u64> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|source| HarvestError::Http {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(HarvestError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        if let Some(parent) = destination.parent() {
            // create_dir_all succeeds when the directory already exists,
            // including when a concurrent caller created it first
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| file_error(parent, source))?;
        }

        let result = write_body(url, response, destination).await;
        if result.is_err() {
            let _ = tokio::fs::remove_file(destination).await;
        }
        result
    }
}

async fn write_body(url: &str, response: reqwest::Response, destination: &Path) -> Result<u64> {
    let mut file = tokio::fs::File::create(destination)
        .await
        .map_err(|source| file_error(destination, source))?;

    let mut written = 0u64;
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|source| HarvestError::Http {
            url: url.to_string(),
            source,
        })?;
        file.write_all(&chunk)
            .await
            .map_err(|source| file_error(destination, source))?;
        written += chunk.len() as u64;
    }

    file.flush()
        .await
        .map_err(|source| file_error(destination, source))?;

    Ok(written)
}

fn file_error(path: &Path, source: std::io::Error) -> HarvestError {
    HarvestError::FileIo {
        path: path.display().to_string(),
        source,
    }
}

/// Downloads a product's images one at a time into `output_dir`
///
/// Each download completes or fails before the next one starts. A failure
/// is logged and recorded in its outcome; the loop never stops early.
pub async fn download_sequentially(
    fetcher: &ImageFetcher,
    images: &[ImageDescriptor],
    output_dir: &Path,
) -> Vec<DownloadOutcome> {
    let mut outcomes = Vec::with_capacity(images.len());

    for image in images {
        let path = output_dir.join(&image.filename);
        let status = match fetcher.fetch(&image.url, &path).await {
            Ok(bytes) => {
                tracing::debug!("Downloaded {} ({} bytes)", path.display(), bytes);
                DownloadStatus::Downloaded { bytes }
            }
            Err(e) => {
                tracing::warn!("Failed to download image {}: {}", image.url, e);
                DownloadStatus::Failed {
                    error: e.to_string(),
                }
            }
        };

        outcomes.push(DownloadOutcome {
            url: image.url.clone(),
            path,
            status,
        });
    }

    outcomes
}
