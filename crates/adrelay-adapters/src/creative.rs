//! Remote creative download.
//!
//! Images referenced by URL are fetched, size-checked and handed to the
//! platform inline as base64. Downloads are reads, so they are retried with
//! jittered exponential backoff; nothing else in this crate retries.

use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use bytes::{Bytes, BytesMut};
use rand::Rng;
use reqwest::header::CONTENT_TYPE;
use reqwest::StatusCode;
use tracing::{debug, warn};
use url::Url;

use adrelay_core::AdapterError;

use crate::config::HttpSettings;

/// Image formats accepted by every platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageMime {
    Png,
    Jpeg,
    Gif,
}

impl ImageMime {
    pub fn from_content_type(raw: &str) -> Option<Self> {
        let essence = raw.split(';').next().unwrap_or_default().trim();
        match essence.to_ascii_lowercase().as_str() {
            "image/png" => Some(ImageMime::Png),
            "image/jpeg" | "image/jpg" | "image/pjpeg" => Some(ImageMime::Jpeg),
            "image/gif" => Some(ImageMime::Gif),
            _ => None,
        }
    }

    pub fn from_path(path: &str) -> Option<Self> {
        let ext = path.rsplit_once('.')?.1.to_ascii_lowercase();
        match ext.as_str() {
            "png" => Some(ImageMime::Png),
            "jpg" | "jpeg" => Some(ImageMime::Jpeg),
            "gif" => Some(ImageMime::Gif),
            _ => None,
        }
    }

    /// Enum value of the mutate-style ads API.
    pub fn ads_mime_type(&self) -> &'static str {
        match self {
            ImageMime::Png => "IMAGE_PNG",
            ImageMime::Jpeg => "IMAGE_JPEG",
            ImageMime::Gif => "IMAGE_GIF",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ImageMime::Png => "png",
            ImageMime::Jpeg => "jpg",
            ImageMime::Gif => "gif",
        }
    }
}

/// A downloaded image.
#[derive(Debug, Clone)]
pub struct FetchedImage {
    pub bytes: Bytes,
    pub mime: ImageMime,
}

impl FetchedImage {
    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.bytes)
    }
}

enum Attempt {
    Retry(String),
    Fatal(String),
}

/// Downloads creatives with bounded retry.
#[derive(Clone)]
pub struct ImageFetcher {
    client: reqwest::Client,
    attempts: u32,
    base_delay: Duration,
    max_bytes: usize,
}

impl ImageFetcher {
    pub fn new(client: reqwest::Client, settings: &HttpSettings) -> Self {
        Self {
            client,
            attempts: settings.fetch_retries.max(1),
            base_delay: Duration::from_millis(settings.retry_base_delay_ms),
            max_bytes: settings.max_image_bytes,
        }
    }

    pub async fn fetch(&self, url: &str) -> Result<FetchedImage, AdapterError> {
        let mut last = String::new();
        for attempt in 1..=self.attempts {
            match self.fetch_once(url).await {
                Ok(image) => {
                    debug!(url, bytes = image.bytes.len(), attempt, "Fetched creative image");
                    return Ok(image);
                }
                Err(Attempt::Fatal(message)) => return Err(fetch_error(url, message)),
                Err(Attempt::Retry(message)) => {
                    warn!(url, attempt, error = %message, "Creative fetch failed");
                    last = message;
                    if attempt < self.attempts {
                        tokio::time::sleep(self.backoff(attempt)).await;
                    }
                }
            }
        }
        Err(fetch_error(
            url,
            format!("giving up after {} attempts: {}", self.attempts, last),
        ))
    }

    fn backoff(&self, attempt: u32) -> Duration {
        let base = self.base_delay.as_millis() as u64;
        let exp = base.saturating_mul(1u64 << (attempt - 1).min(6));
        let jitter = if base == 0 {
            0
        } else {
            rand::thread_rng().gen_range(0..=base)
        };
        Duration::from_millis(exp + jitter)
    }

    async fn fetch_once(&self, url: &str) -> Result<FetchedImage, Attempt> {
        let parsed = Url::parse(url).map_err(|e| Attempt::Fatal(e.to_string()))?;

        let mut response = self
            .client
            .get(parsed.clone())
            .send()
            .await
            .map_err(|e| Attempt::Retry(e.to_string()))?;

        let status = response.status();
        if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
            return Err(Attempt::Retry(format!("status {}", status)));
        }
        if !status.is_success() {
            return Err(Attempt::Fatal(format!("status {}", status)));
        }

        if let Some(len) = response.content_length() {
            if len as usize > self.max_bytes {
                return Err(Attempt::Fatal(self.too_large(len as usize)));
            }
        }

        let mime = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .and_then(ImageMime::from_content_type)
            .or_else(|| ImageMime::from_path(parsed.path()))
            .ok_or_else(|| Attempt::Fatal("unsupported image type".to_string()))?;

        let mut buf = BytesMut::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| Attempt::Retry(e.to_string()))?
        {
            if buf.len() + chunk.len() > self.max_bytes {
                return Err(Attempt::Fatal(self.too_large(buf.len() + chunk.len())));
            }
            buf.extend_from_slice(&chunk);
        }
        if buf.is_empty() {
            return Err(Attempt::Fatal("empty body".to_string()));
        }

        Ok(FetchedImage {
            bytes: buf.freeze(),
            mime,
        })
    }

    fn too_large(&self, size: usize) -> String {
        format!("image is {} bytes, limit is {}", size, self.max_bytes)
    }
}

fn fetch_error(url: &str, message: String) -> AdapterError {
    AdapterError::CreativeFetch {
        url: url.to_string(),
        message,
    }
}
