//! Media download: fetch the bytes, write the file.
//!
//! Video CDNs answer with `video/mp4` or `application/octet-stream`, so the
//! content type is never checked. The body size is capped instead.

use crate::config::DEFAULT_MAX_BODY_BYTES;
use crate::error::ItemError;
use crate::utils::MEDIA_EXTENSION;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;
use tracing::{debug, info, instrument};
use url::Url;

/// Fetches a media body.
pub trait MediaFetcher {
    async fn fetch(&self, url: &Url) -> Result<Vec<u8>, ItemError>;
}

#[derive(Debug, Clone)]
pub struct FetchSettings {
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub max_body_bytes: u64,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(300),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

/// [`MediaFetcher`] over `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    max_body_bytes: u64,
}

impl HttpFetcher {
    pub fn new(settings: FetchSettings) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .build()?;
        Ok(Self {
            client,
            max_body_bytes: settings.max_body_bytes,
        })
    }

    fn too_large(&self, actual: u64) -> ItemError {
        ItemError::TooLarge {
            max_bytes: self.max_body_bytes,
            actual,
        }
    }
}

impl MediaFetcher for HttpFetcher {
    #[instrument(level = "info", skip_all, fields(%url))]
    async fn fetch(&self, url: &Url) -> Result<Vec<u8>, ItemError> {
        let transport = |e: reqwest::Error| ItemError::Transport(e.to_string());

        let mut response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(ItemError::Transport(format!("status {status}")));
        }

        if let Some(len) = response.content_length() {
            if len > self.max_body_bytes {
                return Err(self.too_large(len));
            }
        }

        let mut body = Vec::new();
        while let Some(chunk) = response.chunk().await.map_err(transport)? {
            let next_len = (body.len() + chunk.len()) as u64;
            if next_len > self.max_body_bytes {
                return Err(self.too_large(next_len));
            }
            body.extend_from_slice(&chunk);
        }

        debug!(bytes = body.len(), "Fetched media body");
        Ok(body)
    }
}

/// Write `bytes` to `<dir>/<stem>.mp4` and return the path.
///
/// An existing file of the same name is replaced. Stems from
/// [`file_stem`](crate::utils::file_stem) always fit the file name limit.
#[instrument(level = "info", skip(bytes), fields(bytes = bytes.len()))]
pub async fn save_media(dir: &Path, stem: &str, bytes: &[u8]) -> Result<PathBuf, ItemError> {
    let path = dir.join(format!("{stem}.{MEDIA_EXTENSION}"));
    fs::write(&path, bytes).await.map_err(|source| ItemError::Io {
        path: path.display().to_string(),
        source,
    })?;
    info!(path = %path.display(), "Saved media");
    Ok(path)
}
