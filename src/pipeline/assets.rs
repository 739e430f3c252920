//! Product image downloader
//!
//! Streams an image into `{directory}/{title}.{extension}`. Download failures
//! are reported as `AssetError` and are never fatal for the record; only a
//! directory that cannot be created aborts the run, before any page is scraped.

use crate::config::AssetsConfig;
use crate::url::asset_path;
use crate::ScrapeError;
use reqwest::Client;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::io::AsyncWriteExt;

/// Failure to download one image
#[derive(Debug, Error)]
pub enum AssetError {
    #[error("HTTP {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("request for {url} failed: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("cannot write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Downloads product images into the assets directory
#[derive(Debug, Clone)]
pub struct AssetFetcher {
    client: Client,
    directory: PathBuf,
    extension: String,
}

impl AssetFetcher {
    /// Creates a fetcher sharing the run's HTTP client
    pub fn new(client: Client, config: &AssetsConfig) -> Self {
        Self {
            client,
            directory: PathBuf::from(&config.directory),
            extension: config.extension.clone(),
        }
    }

    /// Directory images are written to
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Creates the assets directory if it does not exist yet
    ///
    /// # Returns
    ///
    /// * `Ok(())` - Directory exists
    /// * `Err(ScrapeError::AssetsDir)` - Directory cannot be created; the run cannot store images
    pub async fn ensure_directory(&self) -> Result<(), ScrapeError> {
        tokio::fs::create_dir_all(&self.directory)
            .await
            .map_err(|source| ScrapeError::AssetsDir {
                path: self.directory.clone(),
                source,
            })
    }

    /// Downloads the image at `url` for the product `title`
    ///
    /// The body is streamed chunk by chunk into `{file}.part`, which replaces
    /// the final file only once the download completed. A failed download
    /// leaves any image stored by an earlier run in place.
    ///
    /// The directory must have been prepared with `ensure_directory`; a
    /// directory that vanished mid-run is reported as `AssetError::Io`.
    ///
    /// # Returns
    ///
    /// * `Ok(path)` - Image stored at `path`
    /// * `Err(AssetError)` - Download failed; the record should be kept without an image
    pub async fn fetch_asset(&self, url: &str, title: &str) -> Result<String, AssetError> {
        let path = asset_path(&self.directory, title, &self.extension);
        let partial = partial_path(&path);

        if let Err(e) = self.download(url, &partial).await {
            // best effort; the file may never have been created
            let _ = tokio::fs::remove_file(&partial).await;
            return Err(e);
        }

        tokio::fs::rename(&partial, &path)
            .await
            .map_err(|source| AssetError::Io {
                path: path.clone(),
                source,
            })?;

        Ok(path.to_string_lossy().into_owned())
    }

    async fn download(&self, url: &str, path: &Path) -> Result<(), AssetError> {
        let network = |source| AssetError::Network {
            url: url.to_string(),
            source,
        };
        let io = |source| AssetError::Io {
            path: path.to_path_buf(),
            source,
        };

        let mut response = self.client.get(url).send().await.map_err(network)?;

        let status = response.status();
        if !status.is_success() {
            return Err(AssetError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let mut file = tokio::fs::File::create(path).await.map_err(io)?;
        let mut written = 0usize;
        while let Some(chunk) = response.chunk().await.map_err(network)? {
            file.write_all(&chunk).await.map_err(io)?;
            written += chunk.len();
        }
        file.flush().await.map_err(io)?;

        tracing::debug!("Stored {} bytes from {} at {}", written, url, path.display());
        Ok(())
    }
}

/// Sibling path a download is streamed into before it replaces `path`
fn partial_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".part");
    PathBuf::from(name)
}
