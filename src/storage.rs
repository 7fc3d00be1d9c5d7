//! Image retrieval and pinning to the content-addressed store.

use crate::error::StorageError;

use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

/// Content type assumed when the image host does not send one.
pub const DEFAULT_CONTENT_TYPE: &str = "image/png";

/// Filename attached to pinned uploads.
const PIN_FILENAME: &str = "token-image.png";

/// Raw image bytes plus the content type the source reported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedImage {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

#[async_trait]
pub trait ImageFetcher: Send + Sync + 'static {
    async fn fetch(&self, url: &str) -> Result<FetchedImage, StorageError>;
}

/// Pinning service. Returns the content hash of the stored bytes.
#[async_trait]
pub trait PinStore: Send + Sync + 'static {
    async fn pin(&self, bytes: Vec<u8>, content_type: &str) -> Result<String, StorageError>;
}

/// Fetch-then-pin composition handed to the orchestrator.
#[derive(Clone)]
pub struct StorageUploader {
    fetcher: Arc<dyn ImageFetcher>,
    pins: Arc<dyn PinStore>,
}

impl std::fmt::Debug for StorageUploader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageUploader").finish_non_exhaustive()
    }
}

impl StorageUploader {
    pub fn new(fetcher: Arc<dyn ImageFetcher>, pins: Arc<dyn PinStore>) -> Self {
        Self { fetcher, pins }
    }

    /// Fetch `url` and pin it, returning an `ipfs://<hash>` content URI.
    pub async fn upload(&self, url: &str) -> Result<String, StorageError> {
        tracing::debug!(%url, "fetching image");
        let image = self.fetcher.fetch(url).await?;
        tracing::debug!(
            %url,
            size_kb = image.bytes.len() / 1024,
            content_type = %image.content_type,
            "image downloaded, pinning"
        );

        let hash = self.pins.pin(image.bytes, &image.content_type).await?;
        let uri = format!("ipfs://{hash}");
        tracing::info!(%url, %uri, "image pinned");
        Ok(uri)
    }
}

fn content_type_or_default(header: Option<&str>) -> String {
    header
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .unwrap_or(DEFAULT_CONTENT_TYPE)
        .to_string()
}

/// Plain HTTP GET with a hard timeout and a body size cap.
#[derive(Debug, Clone)]
pub struct HttpImageFetcher {
    http: reqwest::Client,
    timeout: Duration,
    max_bytes: u64,
}

impl HttpImageFetcher {
    pub fn new(http: reqwest::Client, timeout: Duration, max_bytes: u64) -> Self {
        Self {
            http,
            timeout,
            max_bytes,
        }
    }
}

fn too_large(max_bytes: u64) -> String {
    format!("image exceeds {max_bytes} bytes")
}

#[async_trait]
impl ImageFetcher for HttpImageFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedImage, StorageError> {
        let fetch_error = |reason: String| StorageError::Fetch {
            url: url.to_string(),
            reason,
        };

        let response = self
            .http
            .get(url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|error| fetch_error(error.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(fetch_error(format!("status {status}")));
        }

        let content_type = content_type_or_default(
            response
                .headers()
                .get(reqwest::header::CONTENT_TYPE)
                .and_then(|value| value.to_str().ok()),
        );

        if response
            .content_length()
            .is_some_and(|length| length > self.max_bytes)
        {
            return Err(fetch_error(too_large(self.max_bytes)));
        }

        // Content-Length may be absent or wrong, so the cap is enforced per chunk.
        let mut response = response;
        let mut bytes = Vec::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|error| fetch_error(error.to_string()))?
        {
            if (bytes.len() + chunk.len()) as u64 > self.max_bytes {
                return Err(fetch_error(too_large(self.max_bytes)));
            }
            bytes.extend_from_slice(&chunk);
        }

        Ok(FetchedImage {
            bytes,
            content_type,
        })
    }
}

/// Pinata `pinFileToIPFS` client.
#[derive(Clone)]
pub struct PinataClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: Arc<str>,
    api_secret: Arc<str>,
}

impl std::fmt::Debug for PinataClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PinataClient")
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

#[derive(Deserialize)]
struct PinResponse {
    #[serde(rename = "IpfsHash")]
    ipfs_hash: String,
}

impl PinataClient {
    pub fn new(
        http: reqwest::Client,
        endpoint: impl Into<String>,
        api_key: Arc<str>,
        api_secret: Arc<str>,
    ) -> Self {
        Self {
            http,
            endpoint: endpoint.into(),
            api_key,
            api_secret,
        }
    }
}

#[async_trait]
impl PinStore for PinataClient {
    async fn pin(&self, bytes: Vec<u8>, content_type: &str) -> Result<String, StorageError> {
        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name(PIN_FILENAME)
            .mime_str(content_type)
            .map_err(|error| StorageError::Pin(format!("invalid content type: {error}")))?;
        let form = reqwest::multipart::Form::new().part("file", part);

        let response = self
            .http
            .post(&self.endpoint)
            .header("pinata_api_key", &*self.api_key)
            .header("pinata_secret_api_key", &*self.api_secret)
            .multipart(form)
            .send()
            .await
            .map_err(|error| StorageError::Pin(error.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StorageError::Pin(format!("status {status}: {body}")));
        }

        let pinned: PinResponse = response
            .json()
            .await
            .map_err(|error| StorageError::Pin(error.to_string()))?;
        Ok(pinned.ipfs_hash)
    }
}
