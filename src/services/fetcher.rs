/// Cover image retrieval
///
/// Fetchers turn an image reference (HTTP(S) URL, `file://` URL or bare path)
/// into a [`NormalizedImage`]. Every image that reaches feature extraction has
/// been resized to the same [`Resolution`], so vectors stay comparable.
use std::time::Duration;

use image::{imageops::FilterType, DynamicImage};
use reqwest::{Client as HttpClient, StatusCode};

use crate::{
    config::Config,
    error::{AppResult, FetchError},
    models::{NormalizedImage, Resolution},
};

/// Source of normalized cover images
#[async_trait::async_trait]
pub trait ImageFetcher: Send + Sync {
    /// Retrieve and normalize the image behind `reference`
    ///
    /// May return [`NormalizedImage::Empty`] when the bytes decode to an image
    /// with no pixels; callers must not score that sentinel.
    async fn fetch(&self, reference: &str) -> Result<NormalizedImage, FetchError>;
}

/// Timeouts, retries and normalization target for [`HttpImageFetcher`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchOptions {
    /// Deadline for one attempt, body download included
    pub timeout: Duration,
    /// Extra attempts after a transient failure
    pub retries: u32,
    /// Delay before the first retry; doubles on each further retry
    pub retry_backoff: Duration,
    pub resolution: Resolution,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            retries: 2,
            retry_backoff: Duration::from_millis(200),
            resolution: Resolution::POSTER,
        }
    }
}

impl FetchOptions {
    pub fn from_config(config: &Config) -> AppResult<Self> {
        Ok(Self {
            timeout: config.fetch_timeout(),
            retries: config.fetch_retries,
            retry_backoff: config.retry_backoff(),
            resolution: config.target_resolution()?,
        })
    }
}

/// Outcome of a single failed attempt
struct AttemptFailure {
    error: FetchError,
    transient: bool,
}

impl AttemptFailure {
    fn transient(error: FetchError) -> Self {
        Self {
            error,
            transient: true,
        }
    }

    fn permanent(error: FetchError) -> Self {
        Self {
            error,
            transient: false,
        }
    }
}

/// Fetches covers over HTTP(S) or from the local filesystem
#[derive(Clone)]
pub struct HttpImageFetcher {
    http_client: HttpClient,
    options: FetchOptions,
}

impl HttpImageFetcher {
    pub fn new(options: FetchOptions) -> AppResult<Self> {
        let http_client = HttpClient::builder()
            .user_agent(concat!("cover-match/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http_client,
            options,
        })
    }

    pub fn options(&self) -> &FetchOptions {
        &self.options
    }

    /// Reads the raw bytes, retrying transient failures with backoff
    async fn read_with_retries(&self, reference: &str) -> Result<Vec<u8>, FetchError> {
        let mut attempt = 0;
        let mut backoff = self.options.retry_backoff;

        loop {
            match self.read_with_deadline(reference).await {
                Ok(bytes) => return Ok(bytes),
                Err(failure) if failure.transient && attempt < self.options.retries => {
                    attempt += 1;
                    tracing::debug!(
                        reference = %reference,
                        attempt,
                        error = %failure.error,
                        "Retrying image fetch"
                    );
                    tokio::time::sleep(backoff).await;
                    backoff = backoff.saturating_mul(2);
                }
                Err(failure) => return Err(failure.error),
            }
        }
    }

    async fn read_with_deadline(&self, reference: &str) -> Result<Vec<u8>, AttemptFailure> {
        match tokio::time::timeout(self.options.timeout, self.read_once(reference)).await {
            Ok(result) => result,
            Err(_) => Err(AttemptFailure::transient(FetchError::Timeout(
                self.options.timeout,
            ))),
        }
    }

    async fn read_once(&self, reference: &str) -> Result<Vec<u8>, AttemptFailure> {
        if is_remote(reference) {
            self.read_remote(reference).await
        } else {
            read_local(reference).await
        }
    }

    async fn read_remote(&self, url: &str) -> Result<Vec<u8>, AttemptFailure> {
        let response = self.http_client.get(url).send().await.map_err(|e| {
            let error = if e.is_timeout() {
                FetchError::Timeout(self.options.timeout)
            } else {
                FetchError::Unreachable(e.to_string())
            };
            AttemptFailure::transient(error)
        })?;

        let status = response.status();
        if !status.is_success() {
            let error = FetchError::Unreachable(format!("HTTP status {}", status));
            return if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
                Err(AttemptFailure::transient(error))
            } else {
                Err(AttemptFailure::permanent(error))
            };
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| AttemptFailure::transient(FetchError::Unreachable(e.to_string())))?;

        Ok(bytes.to_vec())
    }
}

#[async_trait::async_trait]
impl ImageFetcher for HttpImageFetcher {
    async fn fetch(&self, reference: &str) -> Result<NormalizedImage, FetchError> {
        let reference = reference.trim();
        if reference.is_empty() {
            return Err(FetchError::InvalidReference);
        }

        let bytes = self.read_with_retries(reference).await?;

        tracing::debug!(reference = %reference, bytes = bytes.len(), "Fetched image");

        let resolution = self.options.resolution;
        tokio::task::spawn_blocking(move || decode_and_normalize(&bytes, resolution))
            .await
            .map_err(|e| FetchError::DecodeFailed(format!("decoder task failed: {}", e)))?
    }
}

fn is_remote(reference: &str) -> bool {
    let lower = reference.to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

async fn read_local(reference: &str) -> Result<Vec<u8>, AttemptFailure> {
    let path = reference.strip_prefix("file://").unwrap_or(reference);
    tokio::fs::read(path)
        .await
        .map_err(|e| AttemptFailure::permanent(FetchError::Unreachable(format!("{}: {}", path, e))))
}

/// Decodes raw bytes and resizes the result to `resolution`
pub fn decode_and_normalize(
    bytes: &[u8],
    resolution: Resolution,
) -> Result<NormalizedImage, FetchError> {
    if bytes.is_empty() {
        return Err(FetchError::Empty);
    }

    let decoded =
        image::load_from_memory(bytes).map_err(|e| FetchError::DecodeFailed(e.to_string()))?;

    Ok(normalize(Some(&decoded), resolution))
}

/// Converts to 8-bit RGB and resizes with bilinear filtering
///
/// A missing or zero-sized image becomes [`NormalizedImage::Empty`].
pub fn normalize(image: Option<&DynamicImage>, resolution: Resolution) -> NormalizedImage {
    match image {
        Some(image) if image.width() > 0 && image.height() > 0 => {
            let rgb = image.to_rgb8();
            NormalizedImage::Pixels(image::imageops::resize(
                &rgb,
                resolution.width,
                resolution.height,
                FilterType::Triangle,
            ))
        }
        _ => NormalizedImage::Empty,
    }
}
